//! In-memory fetchers and dispatchers for unit tests.

use crate::BoxError;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::models::Notification;
use crate::scrapers::PageFetcher;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Serves fixed markup per URL; unknown URLs fail like a 404.
#[derive(Default)]
pub struct StaticPages {
    pages: Mutex<HashMap<String, String>>,
    pub fetches: AtomicUsize,
}

impl StaticPages {
    pub fn with(mut self, url: &str, markup: &str) -> Self {
        self.pages
            .get_mut()
            .unwrap()
            .insert(url.to_string(), markup.to_string());
        self
    }

    pub fn set(&self, url: &str, markup: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), markup.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl PageFetcher for StaticPages {
    async fn fetch(&self, url: &str) -> Result<String, BoxError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let page = self.pages.lock().unwrap().get(url).cloned();
        page.ok_or_else(|| format!("404 Not Found: {url}").into())
    }
}

/// How a [`RecordingDispatcher`] behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Accept,
    /// `ensure_channel` reports the channel as missing.
    ChannelMissing,
    /// Accept this many notifications, then fail every send.
    FailAfter(usize),
}

/// Records every notification it accepts.
pub struct RecordingDispatcher {
    mode: Mode,
    pub sent: Mutex<Vec<Notification>>,
    /// When set, each send signals `entered` and waits on `release`.
    gate: Option<Arc<Gate>>,
}

#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

impl RecordingDispatcher {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            sent: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            mode: Mode::Accept,
            sent: Mutex::new(Vec::new()),
            gate: Some(gate),
        }
    }

    pub fn sent_urls(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.url.clone())
            .collect()
    }
}

impl Dispatcher for RecordingDispatcher {
    async fn ensure_channel(&self) -> Result<(), DispatchError> {
        match self.mode {
            Mode::ChannelMissing => Err(DispatchError::ChannelNotFound("42".to_string())),
            _ => Ok(()),
        }
    }

    async fn dispatch(&self, notification: &Notification) -> Result<(), DispatchError> {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let mut sent = self.sent.lock().unwrap();
        if let Mode::FailAfter(n) = self.mode {
            if sent.len() >= n {
                return Err(DispatchError::Transport("HTTP 503".to_string()));
            }
        }
        sent.push(notification.clone());
        Ok(())
    }
}

/// One article card in `article-preview` markup.
pub fn card(title: &str, href: &str, img: &str) -> String {
    format!(
        r#"<article class="article-preview"><a href="{href}"><img src="{img}"></a><h3>{title}</h3></article>"#
    )
}

/// A listing page made of `cards`.
pub fn page(cards: &[String]) -> String {
    format!("<html><body>{}</body></html>", cards.concat())
}
