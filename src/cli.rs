//! Command-line interface definitions for Pocket News.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every argument can be provided via command-line flag or environment
//! variable; a `.env` file is loaded before parsing.

use clap::{Parser, ValueEnum};
use std::fmt;

/// When to run the silent bootstrap pass at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BootstrapMode {
    /// Only when no ledger file existed yet.
    Auto,
    /// On every start.
    Always,
    /// Never; every unseen article is posted on the first cycle.
    Never,
}

/// Command-line arguments for the Pocket News relay.
///
/// # Examples
///
/// ```sh
/// # Token and channel from the environment (or .env)
/// pocket_news
///
/// # Explicit settings file and ledger location
/// pocket_news -c ./pocket_news.yaml -l /var/lib/pocket_news/posted.json
///
/// # One cycle, then exit
/// pocket_news --once
/// ```
#[derive(Parser, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, env = "POCKET_NEWS_CONFIG")]
    pub config: Option<String>,

    /// Path of the JSON ledger of already-posted links
    #[arg(short, long, env = "POCKET_NEWS_LEDGER")]
    pub ledger: Option<String>,

    /// Discord channel that receives the notifications
    #[arg(long, env = "DISCORD_CHANNEL_ID")]
    pub channel_id: Option<String>,

    /// Discord bot token
    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Base URL of the Discord REST API
    #[arg(long, env = "DISCORD_API_BASE", default_value = crate::dispatch::discord::DISCORD_API_BASE)]
    pub discord_api_base: String,

    /// Seconds between scheduled checks
    #[arg(long, env = "POCKET_NEWS_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// When to mark the currently listed articles as seen without posting them
    #[arg(long, value_enum, default_value_t = BootstrapMode::Auto)]
    pub bootstrap: BootstrapMode,

    /// Run a single check and exit
    #[arg(long)]
    pub once: bool,

    /// Do not read manual trigger commands from stdin
    #[arg(long)]
    pub no_console: bool,
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("config", &self.config)
            .field("ledger", &self.ledger)
            .field("channel_id", &self.channel_id)
            .field("token", &"<redacted>")
            .field("discord_api_base", &self.discord_api_base)
            .field("interval_secs", &self.interval_secs)
            .field("bootstrap", &self.bootstrap)
            .field("once", &self.once)
            .field("no_console", &self.no_console)
            .finish()
    }
}
