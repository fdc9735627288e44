//! Drives the ingestion cycle on a timer and on manual request.
//!
//! Both entry points funnel through the same [`IngestionCycle`], whose ledger
//! lock serializes them:
//!
//! - **Timer**: fires every `interval` and waits its turn if a manual pass
//!   is running
//! - **Manual trigger**: acknowledges at once, then runs a pass unless one is
//!   already in flight, and reports the outcome

use crate::cli::BootstrapMode;
use crate::cycle::{CycleReport, IngestionCycle};
use crate::dispatch::Dispatcher;
use crate::scrapers::PageFetcher;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, instrument, warn};

pub const ACK_MESSAGE: &str = "Checking for new articles... ⏳";

/// Where manual trigger replies go: an immediate acknowledgement followed by
/// one deferred result message.
pub trait Responder: Send + Sync {
    fn ack(&self, message: &str) -> impl Future<Output = ()> + Send;
    fn follow_up(&self, message: &str) -> impl Future<Output = ()> + Send;
}

/// Result of a manual trigger as reported back to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Posted(usize),
    NothingNew,
    ChannelMissing,
    /// Posting broke off after this many articles; the rest were skipped.
    DeliveryFailed(usize),
    /// Another pass held the ledger.
    Busy,
}

impl TriggerOutcome {
    pub fn from_report(report: &CycleReport) -> Self {
        let posted = report.dispatched.len();
        if report.channel_missing {
            TriggerOutcome::ChannelMissing
        } else if report.aborted {
            TriggerOutcome::DeliveryFailed(posted)
        } else if posted > 0 {
            TriggerOutcome::Posted(posted)
        } else {
            TriggerOutcome::NothingNew
        }
    }

    pub fn message(&self) -> String {
        match self {
            TriggerOutcome::Posted(n) => format!("Posted {n} new article(s). ✅"),
            TriggerOutcome::NothingNew => "No new articles found. ✅".to_string(),
            TriggerOutcome::ChannelMissing => {
                "Channel not found. Check your CHANNEL_ID.".to_string()
            }
            TriggerOutcome::DeliveryFailed(n) => {
                format!("Posting failed after {n} article(s); the rest were skipped. ⚠️")
            }
            TriggerOutcome::Busy => "A check is already in progress. ⏳".to_string(),
        }
    }
}

/// Decide whether the silent bootstrap pass should run.
pub fn should_bootstrap(mode: BootstrapMode, ledger_was_cold: bool) -> bool {
    match mode {
        BootstrapMode::Always => true,
        BootstrapMode::Never => false,
        BootstrapMode::Auto => ledger_was_cold,
    }
}

/// Owns the timer and hands out manual passes over a shared cycle.
pub struct Scheduler<F, D> {
    cycle: Arc<IngestionCycle<F, D>>,
    interval: Duration,
}

impl<F, D> Clone for Scheduler<F, D> {
    fn clone(&self) -> Self {
        Self {
            cycle: Arc::clone(&self.cycle),
            interval: self.interval,
        }
    }
}

impl<F, D> Scheduler<F, D>
where
    F: PageFetcher + 'static,
    D: Dispatcher + 'static,
{
    pub fn new(cycle: IngestionCycle<F, D>, interval: Duration) -> Self {
        Self {
            cycle: Arc::new(cycle),
            interval,
        }
    }

    pub fn cycle(&self) -> &IngestionCycle<F, D> {
        &self.cycle
    }

    /// State initialization before the timer is armed: optionally record the
    /// current listings as seen. Returns the number of links bootstrapped.
    #[instrument(level = "info", skip(self))]
    pub async fn initialize(&self, mode: BootstrapMode) -> usize {
        let cold = self.cycle.ledger_is_cold().await;
        if should_bootstrap(mode, cold) {
            info!(cold, "Running silent bootstrap");
            self.cycle.bootstrap().await
        } else {
            info!(cold, "Skipping bootstrap");
            0
        }
    }

    /// Arm the fixed-interval timer. The first tick fires one interval from
    /// now; late ticks are delayed rather than bunched up.
    pub fn spawn_timer(&self) -> JoinHandle<()> {
        let cycle = Arc::clone(&self.cycle);
        let period = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = period.as_secs(), "Timer armed");
            loop {
                ticker.tick().await;
                info!("Scheduled check for new articles");
                let report = cycle.run().await;
                if report.channel_missing {
                    warn!("Channel not found during scheduled check");
                }
            }
        })
    }

    /// Handle one manual trigger: acknowledge, run (unless busy), report.
    #[instrument(level = "info", skip_all)]
    pub async fn trigger<R: Responder>(&self, responder: &R) -> TriggerOutcome {
        responder.ack(ACK_MESSAGE).await;
        let outcome = match self.cycle.try_run().await {
            Some(report) => TriggerOutcome::from_report(&report),
            None => TriggerOutcome::Busy,
        };
        info!(?outcome, "Manual check finished");
        responder.follow_up(&outcome.message()).await;
        outcome
    }
}
