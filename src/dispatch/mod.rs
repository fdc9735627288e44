//! Delivery of notifications to the chat channel.
//!
//! The ingestion cycle talks to the channel through the [`Dispatcher`]
//! trait. [`discord::DiscordDispatcher`] posts embeds through Discord's REST
//! API; tests substitute recording implementations.

pub mod discord;

use crate::models::Notification;
use std::error::Error;
use std::fmt;
use std::future::Future;

/// Why a dispatch did not go through.
#[derive(Debug)]
pub enum DispatchError {
    /// The destination channel could not be resolved (unknown id, no access).
    ChannelNotFound(String),
    /// The request failed or the platform rejected it.
    Transport(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::ChannelNotFound(id) => write!(f, "channel {id} not found"),
            DispatchError::Transport(msg) => write!(f, "dispatch failed: {msg}"),
        }
    }
}

impl Error for DispatchError {}

impl From<reqwest::Error> for DispatchError {
    fn from(e: reqwest::Error) -> Self {
        DispatchError::Transport(e.to_string())
    }
}

/// Sink for notifications, one call per article, awaited in order.
pub trait Dispatcher: Send + Sync {
    /// Resolve the destination before a batch is sent.
    fn ensure_channel(&self) -> impl Future<Output = Result<(), DispatchError>> + Send;

    /// Send one notification.
    fn dispatch(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}
