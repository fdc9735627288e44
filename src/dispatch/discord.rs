//! Discord REST dispatcher.
//!
//! Posts one embed per article to a channel using a bot token:
//!
//! - `GET  {api}/channels/{id}` resolves the channel before a batch
//! - `POST {api}/channels/{id}/messages` sends an embed
//!
//! A 403 or 404 from either call means the bot cannot see the channel and is
//! reported as [`DispatchError::ChannelNotFound`]. Nothing is retried here;
//! the next cycle is the retry.

use super::{DispatchError, Dispatcher};
use crate::models::Notification;
use crate::utils::truncate_for_log;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Dispatcher bound to a single Discord channel.
#[derive(Clone)]
pub struct DiscordDispatcher {
    client: Client,
    token: String,
    channel_id: String,
    api_base: String,
}

impl DiscordDispatcher {
    pub fn new(token: String, channel_id: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!(
                "DiscordBot (",
                env!("CARGO_PKG_NAME"),
                ", ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            token,
            channel_id,
            api_base: DISCORD_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn channel_url(&self) -> String {
        format!("{}/channels/{}", self.api_base, self.channel_id)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }
}

impl fmt::Debug for DiscordDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordDispatcher")
            .field("channel_id", &self.channel_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Dispatcher for DiscordDispatcher {
    #[instrument(level = "info", skip_all, fields(channel_id = %self.channel_id))]
    async fn ensure_channel(&self) -> Result<(), DispatchError> {
        let rsp = self
            .client
            .get(self.channel_url())
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .send()
            .await?;
        check_status(rsp, &self.channel_id).await
    }

    #[instrument(level = "info", skip_all, fields(channel_id = %self.channel_id, url = %notification.url))]
    async fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        let payload = DiscordMessagePayload::embed(notification, &Utc::now().to_rfc3339());
        let rsp = self
            .client
            .post(format!("{}/messages", self.channel_url()))
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&payload)
            .send()
            .await?;
        check_status(rsp, &self.channel_id).await?;
        debug!("Posted notification");
        Ok(())
    }
}

async fn check_status(rsp: reqwest::Response, channel_id: &str) -> Result<(), DispatchError> {
    let status = rsp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = rsp.text().await.unwrap_or_default();
    warn!(%status, body = %truncate_for_log(&body, 300), "Discord rejected request");
    Err(classify_status(status, channel_id, &body))
}

/// Map a non-success Discord status to a [`DispatchError`].
fn classify_status(status: StatusCode, channel_id: &str, body: &str) -> DispatchError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => {
            DispatchError::ChannelNotFound(channel_id.to_string())
        }
        _ => DispatchError::Transport(format!("HTTP {status}: {}", truncate_for_log(body, 200))),
    }
}

/// Discord caps embed titles at 256 characters.
const MAX_TITLE_CHARS: usize = 256;

#[derive(Debug, Serialize)]
struct DiscordImage {
    url: String,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    url: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<DiscordImage>,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct DiscordMessagePayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordMessagePayload {
    fn embed(notification: &Notification, timestamp: &str) -> Self {
        let image = (!notification.image_url.is_empty()).then(|| DiscordImage {
            url: notification.image_url.clone(),
        });
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: crate::utils::truncate_chars(&notification.title, MAX_TITLE_CHARS - 1),
                url: notification.url.clone(),
                description: notification.description.clone(),
                image,
                timestamp: timestamp.to_string(),
            }],
        }
    }
}
