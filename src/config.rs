//! Settings for the relay: which pages to watch and where to post.
//!
//! Settings come from three layers, highest priority first:
//! 1. CLI flags / environment variables ([`crate::cli::Cli`])
//! 2. An optional YAML file (`--config`)
//! 3. Built-in defaults
//!
//! ```yaml
//! channel_id: "1303516169810083850"
//! interval_secs: 3600
//! ledger_path: posted_articles.json
//! sources:
//!   - url: https://www.pokemon-zone.com/articles/
//!     kind: article_list
//!   - url: https://www.pokemon-zone.com/events/
//!     kind: featured_list
//! ```

use crate::BoxError;
use crate::cli::Cli;
use itertools::Itertools;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const DEFAULT_SOURCE_URL: &str = "https://www.pokemon-zone.com/articles/";
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_LEDGER_PATH: &str = "posted_articles.json";

/// Extraction rule-set applied to a source's markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// Regular article index: `article.article-preview` cards.
    ArticleList,
    /// Featured/event strip: `div.featured-card` cards.
    FeaturedList,
}

/// One watched page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    pub kind: AdapterKind,
}

impl SourceConfig {
    pub fn new(url: impl Into<String>, kind: AdapterKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

/// Contents of the optional YAML settings file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub sources: Option<Vec<SourceConfig>>,
    pub channel_id: Option<String>,
    pub interval_secs: Option<u64>,
    pub ledger_path: Option<String>,
}

impl FileSettings {
    pub fn from_yaml(s: &str) -> Result<Self, BoxError> {
        Ok(serde_yaml::from_str(s)?)
    }
}

/// Fully resolved settings the rest of the program runs on.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: Vec<SourceConfig>,
    pub channel_id: String,
    pub interval: Duration,
    pub ledger_path: PathBuf,
}

impl Settings {
    /// Load the YAML file named by `--config` (if any) and layer the CLI on top.
    #[instrument(level = "info", skip_all)]
    pub async fn load(cli: &Cli) -> Result<Self, BoxError> {
        let file = match &cli.config {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| format!("reading settings file {path}: {e}"))?;
                info!(%path, "Loaded settings file");
                FileSettings::from_yaml(&raw)
                    .map_err(|e| format!("parsing settings file {path}: {e}"))?
            }
            None => FileSettings::default(),
        };
        Self::merge(cli, file)
    }

    /// Combine CLI values, file values and defaults, then validate.
    pub fn merge(cli: &Cli, file: FileSettings) -> Result<Self, BoxError> {
        let sources = file
            .sources
            .unwrap_or_else(|| vec![SourceConfig::new(DEFAULT_SOURCE_URL, AdapterKind::ArticleList)]);
        if sources.is_empty() {
            return Err("no sources configured".into());
        }
        for source in &sources {
            url::Url::parse(&source.url)
                .map_err(|e| format!("invalid source url {}: {e}", source.url))?;
        }
        for dup in sources.iter().map(|s| s.url.as_str()).duplicates() {
            warn!(url = %dup, "Source listed more than once");
        }

        let channel_id = cli
            .channel_id
            .clone()
            .or(file.channel_id)
            .filter(|id| !id.trim().is_empty())
            .ok_or("no channel id configured (set --channel-id or DISCORD_CHANNEL_ID)")?;

        let interval_secs = cli
            .interval_secs
            .or(file.interval_secs)
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err("interval_secs must be greater than zero".into());
        }

        let ledger_path = cli
            .ledger
            .clone()
            .or(file.ledger_path)
            .unwrap_or_else(|| DEFAULT_LEDGER_PATH.to_string());

        Ok(Self {
            sources,
            channel_id,
            interval: Duration::from_secs(interval_secs),
            ledger_path: PathBuf::from(ledger_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["pocket_news", "--token", "t"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
channel_id: "42"
interval_secs: 600
sources:
  - url: https://site/articles/
    kind: article_list
  - url: https://site/events/
    kind: featured_list
"#;
        let file = FileSettings::from_yaml(yaml).unwrap();
        let sources = file.sources.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].kind, AdapterKind::ArticleList);
        assert_eq!(sources[1].kind, AdapterKind::FeaturedList);
        assert_eq!(file.channel_id.as_deref(), Some("42"));
        assert_eq!(file.interval_secs, Some(600));
    }

    #[test]
    fn test_yaml_rejects_unknown_kind() {
        let yaml = "sources:\n  - url: https://site/\n    kind: rss\n";
        assert!(FileSettings::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_defaults_apply() {
        let settings = Settings::merge(&cli(&["--channel-id", "7"]), FileSettings::default()).unwrap();
        assert_eq!(
            settings.sources,
            vec![SourceConfig::new(DEFAULT_SOURCE_URL, AdapterKind::ArticleList)]
        );
        assert_eq!(settings.interval, Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert_eq!(settings.ledger_path, PathBuf::from(DEFAULT_LEDGER_PATH));
        assert_eq!(settings.channel_id, "7");
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileSettings {
            sources: None,
            channel_id: Some("from-file".to_string()),
            interval_secs: Some(100),
            ledger_path: Some("file.json".to_string()),
        };
        let settings = Settings::merge(
            &cli(&["--channel-id", "from-cli", "--interval-secs", "5", "-l", "cli.json"]),
            file,
        )
        .unwrap();
        assert_eq!(settings.channel_id, "from-cli");
        assert_eq!(settings.interval, Duration::from_secs(5));
        assert_eq!(settings.ledger_path, PathBuf::from("cli.json"));
    }

    #[test]
    fn test_empty_sources_rejected() {
        let file = FileSettings {
            sources: Some(vec![]),
            channel_id: Some("1".to_string()),
            ..Default::default()
        };
        assert!(Settings::merge(&cli(&[]), file).is_err());
    }

    #[test]
    fn test_missing_channel_rejected() {
        let file = FileSettings::default();
        let c = Cli {
            channel_id: None,
            ..cli(&[])
        };
        assert!(Settings::merge(&c, file).is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let file = FileSettings {
            channel_id: Some("1".to_string()),
            interval_secs: Some(0),
            ..Default::default()
        };
        let c = Cli {
            interval_secs: None,
            ..cli(&[])
        };
        assert!(Settings::merge(&c, file).is_err());
    }
}
