//! # Pocket News
//!
//! Watches one or more news pages for newly published articles and relays
//! each new article, exactly once, to a Discord channel. Articles already
//! relayed are remembered in a JSON ledger so restarts never re-post them.
//!
//! ## Usage
//!
//! ```sh
//! DISCORD_BOT_TOKEN=... DISCORD_CHANNEL_ID=... pocket_news -c pocket_news.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Scraping**: fetch each source page and extract its article cards
//! 2. **Filtering**: drop links already in the ledger, mark the rest seen
//! 3. **Persistence**: atomically rewrite the ledger
//! 4. **Dispatch**: fetch a summary for each new article and post it
//!
//! A timer runs the cycle every interval (hourly by default); typing
//! `pocketnews` on stdin runs it on demand. Both go through the same lock,
//! so two passes never overlap.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod console;
mod cycle;
mod dispatch;
mod ledger;
mod models;
mod scheduler;
mod scrapers;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use config::Settings;
use cycle::IngestionCycle;
use dispatch::discord::DiscordDispatcher;
use ledger::DedupStore;
use scheduler::Scheduler;
use scrapers::HttpFetcher;
use utils::ensure_writable_dir;

/// Error type shared across the crate.
pub type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), BoxError> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("pocket_news starting up");

    // .env may carry the bot token; absence is fine
    if let Err(e) = dotenvy::dotenv() {
        debug!(error = %e, "No .env file loaded");
    }

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = Settings::load(&args).await?;
    info!(
        sources = settings.sources.len(),
        channel_id = %settings.channel_id,
        interval_secs = settings.interval.as_secs(),
        ledger = %settings.ledger_path.display(),
        "Settings resolved"
    );

    // Early check: the ledger must be writable or nothing can be remembered
    let ledger_dir = settings.ledger_path.parent().unwrap_or(Path::new(""));
    if let Err(e) = ensure_writable_dir(ledger_dir).await {
        error!(
            path = %ledger_dir.display(),
            error = %e,
            "Ledger directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let store = DedupStore::load(&settings.ledger_path).await?;
    let fetcher = HttpFetcher::new()?;
    let dispatcher = DiscordDispatcher::new(args.token.clone(), settings.channel_id.clone())?
        .with_api_base(&args.discord_api_base);
    let cycle = IngestionCycle::new(fetcher, dispatcher, settings.sources.clone(), store);
    let scheduler = Scheduler::new(cycle, settings.interval);

    scheduler.initialize(args.bootstrap).await;

    if args.once {
        let report = scheduler.cycle().run().await;
        info!(
            dispatched = report.dispatched.len(),
            channel_missing = report.channel_missing,
            "Single check complete"
        );
        return Ok(());
    }

    let timer = scheduler.spawn_timer();
    let console = if args.no_console {
        None
    } else {
        Some(console::spawn_stdin(scheduler.clone()))
    };
    info!("Startup complete. Background task running");

    shutdown_signal().await?;
    info!("Shutdown requested; waiting for any check in flight");

    // Holding the ledger lock keeps a half-finished pass from being cut off
    // and stops new ones from starting.
    let store = scheduler.cycle().quiesce().await;
    timer.abort();
    if let Some(console) = console {
        console.abort();
    }
    info!(links = store.len(), "pocket_news stopped");

    // A blocking stdin read would otherwise hold the runtime open.
    std::process::exit(0);
}

/// Resolve on Ctrl-C, or on SIGTERM where the platform has it.
async fn shutdown_signal() -> Result<(), BoxError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = term.recv() => debug!("SIGTERM received"),
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;
    Ok(())
}
