//! One poll pass over every configured source.
//!
//! A cycle runs in four steps:
//!
//! 0. **Resolve**: confirm the destination channel exists; if not, stop
//!    without touching the ledger
//! 1. **Collect**: fetch each source in declared order and extract its cards,
//!    keeping page order
//! 2. **Filter**: every link not yet in the ledger is marked seen at once and
//!    queued; known links are dropped
//! 3. **Persist**: save the ledger if anything was queued
//! 4. **Dispatch**: for each queued article, in queue order, fetch its
//!    summary and send it, awaiting each send before the next
//!
//! # Delivery policy
//!
//! Links are marked seen and written to disk *before* their notification is
//! sent. If the channel becomes unreachable mid-batch, or the process dies
//! mid-batch, the rest of the batch is dropped and not retried: a missed
//! post is preferred over a duplicate one.
//!
//! Delivery order is natural page order: sources in the order they are
//! configured, cards top to bottom within a source. Nothing is reversed.
//!
//! # Exclusion
//!
//! The ledger lives behind a single async mutex owned by the cycle, held
//! for the whole pass. [`IngestionCycle::run`] waits for it;
//! [`IngestionCycle::try_run`] gives up if another pass holds it. Two passes
//! never read or write the ledger at the same time.

use crate::config::SourceConfig;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::ledger::DedupStore;
use crate::models::{Article, Notification};
use crate::scrapers::{self, PageFetcher, detail};
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};

/// Outcome of one pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Articles actually delivered, in delivery order.
    pub dispatched: Vec<Article>,
    /// New links found (and marked seen) this pass.
    pub new_links: usize,
    /// The destination channel could not be resolved.
    pub channel_missing: bool,
    /// Dispatch stopped early; the remaining new articles were dropped.
    pub aborted: bool,
}

/// The poll/filter/dispatch pipeline and the ledger it owns.
pub struct IngestionCycle<F, D> {
    fetcher: F,
    dispatcher: D,
    sources: Vec<SourceConfig>,
    store: Mutex<DedupStore>,
}

impl<F: PageFetcher, D: Dispatcher> IngestionCycle<F, D> {
    pub fn new(fetcher: F, dispatcher: D, sources: Vec<SourceConfig>, store: DedupStore) -> Self {
        Self {
            fetcher,
            dispatcher,
            sources,
            store: Mutex::new(store),
        }
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    #[cfg(test)]
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Whether the ledger had no file behind it when loaded.
    pub async fn ledger_is_cold(&self) -> bool {
        self.store.lock().await.is_cold()
    }

    /// Wait for any pass in flight, then hold the ledger so no new one starts.
    pub async fn quiesce(&self) -> MutexGuard<'_, DedupStore> {
        self.store.lock().await
    }

    /// Run one pass, waiting for any pass already in flight to finish first.
    pub async fn run(&self) -> CycleReport {
        let mut store = self.store.lock().await;
        self.run_locked(&mut store).await
    }

    /// Run one pass unless another is in flight, in which case return `None`.
    pub async fn try_run(&self) -> Option<CycleReport> {
        let Ok(mut store) = self.store.try_lock() else {
            debug!("Cycle already in flight");
            return None;
        };
        Some(self.run_locked(&mut store).await)
    }

    /// Record every currently listed link as seen without dispatching anything.
    ///
    /// Used at startup so articles published before the relay existed are
    /// never posted. Returns the number of links added.
    #[instrument(level = "info", skip_all)]
    pub async fn bootstrap(&self) -> usize {
        let mut store = self.store.lock().await;
        let candidates = self.collect().await;

        let added = candidates
            .into_iter()
            .filter(|article| store.add(article.link.clone()))
            .count();

        if added > 0 {
            if let Err(e) = store.save().await {
                error!(error = %e, "Failed to save ledger after bootstrap");
            }
        }
        info!(added, total = store.len(), "Bootstrap recorded listed articles as seen");
        added
    }

    #[instrument(level = "info", skip_all)]
    async fn run_locked(&self, store: &mut DedupStore) -> CycleReport {
        let t0 = Instant::now();

        // Nothing is marked while the destination is unreachable.
        if let Err(e) = self.dispatcher.ensure_channel().await {
            error!(error = %e, "Destination unavailable; skipping this check");
            return CycleReport {
                channel_missing: matches!(e, DispatchError::ChannelNotFound(_)),
                aborted: true,
                ..CycleReport::default()
            };
        }

        let candidates = self.collect().await;
        let candidate_count = candidates.len();

        let pending: Vec<Article> = candidates
            .into_iter()
            .filter(|article| {
                if store.contains(&article.link) {
                    false
                } else {
                    store.add(article.link.clone());
                    true
                }
            })
            .collect();

        let mut report = CycleReport {
            new_links: pending.len(),
            ..CycleReport::default()
        };

        if pending.is_empty() {
            info!(candidates = candidate_count, "No new articles found");
            return report;
        }

        // Persist the markings before the first send so a crash mid-batch
        // can only skip articles, never repeat them.
        if let Err(e) = store.save().await {
            error!(
                error = %e,
                path = %store.path().display(),
                "Failed to save ledger; previous file left in place"
            );
        }

        info!(new = pending.len(), candidates = candidate_count, "Posting new articles");
        self.dispatch_all(pending, &mut report).await;

        info!(
            dispatched = report.dispatched.len(),
            new = report.new_links,
            aborted = report.aborted,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Cycle complete"
        );
        report
    }

    /// Fetch and extract every source in declared order. A failing source is
    /// logged and contributes nothing.
    async fn collect(&self) -> Vec<Article> {
        let mut all = Vec::new();
        for source in &self.sources {
            match self.fetcher.fetch(&source.url).await {
                Ok(markup) => {
                    let articles = scrapers::extract(&markup, source.kind, &source.url);
                    if articles.is_empty() {
                        warn!(url = %source.url, kind = ?source.kind, "Source yielded no article cards");
                    } else {
                        debug!(url = %source.url, count = articles.len(), "Source scraped");
                    }
                    all.extend(articles);
                }
                Err(e) => {
                    error!(url = %source.url, error = %e, "Source fetch failed; skipping");
                }
            }
        }
        all
    }

    async fn dispatch_all(&self, pending: Vec<Article>, report: &mut CycleReport) {
        let total = pending.len();

        for (i, mut article) in pending.into_iter().enumerate() {
            article.summary = detail::fetch_summary(&self.fetcher, &article.link).await;
            let notification = Notification::from_article(&article);

            match self.dispatcher.dispatch(&notification).await {
                Ok(()) => {
                    info!(link = %article.link, title = %article.title, "Posted article");
                    report.dispatched.push(article);
                }
                Err(e) => {
                    report.channel_missing = matches!(e, DispatchError::ChannelNotFound(_));
                    report.aborted = true;
                    error!(
                        error = %e,
                        link = %article.link,
                        dropped = total - i,
                        "Dispatch failed; abandoning the rest of this batch"
                    );
                    return;
                }
            }
        }
    }
}
