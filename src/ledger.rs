//! Persistent ledger of links that have already been relayed.
//!
//! The ledger is a single JSON file holding an array of link strings:
//!
//! ```json
//! [
//!   "https://www.pokemon-zone.com/articles/set-release/",
//!   "https://www.pokemon-zone.com/articles/event-schedule/"
//! ]
//! ```
//!
//! It is read in full at startup and overwritten in full after every cycle
//! that found something new. Writes go to a temporary file in the same
//! directory which is synced and then renamed over the ledger, so a reader
//! sees either the previous file or the new one, never a partial write.
//!
//! There is no eviction. The set grows for the lifetime of the deployment.

use crate::BoxError;
use std::collections::BTreeSet;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Read the persisted link set. A missing file is a cold start, not an error.
///
/// Returns `Ok(None)` when the file does not exist.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_links(path: &Path) -> Result<Option<BTreeSet<String>>, BoxError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No ledger file; starting cold");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let links: Vec<String> = serde_json::from_str(&raw)
        .map_err(|e| format!("ledger {} is not a JSON array of strings: {e}", path.display()))?;
    let set: BTreeSet<String> = links.into_iter().collect();
    info!(count = set.len(), "Loaded ledger");
    Ok(Some(set))
}

/// Atomically replace the persisted link set with `links`.
///
/// On failure the previous file is left untouched.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = links.len()))]
pub async fn save_links(path: &Path, links: &BTreeSet<String>) -> Result<(), BoxError> {
    let json = serde_json::to_vec_pretty(links)?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&path, &json)).await??;
    debug!("Saved ledger");
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BoxError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// In-memory view of the ledger, bound to its file.
#[derive(Debug)]
pub struct DedupStore {
    path: PathBuf,
    links: BTreeSet<String>,
    cold: bool,
}

impl DedupStore {
    /// Load the ledger at `path`, or start empty when there is no file yet.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, BoxError> {
        let path = path.into();
        let (links, cold) = match load_links(&path).await? {
            Some(links) => (links, false),
            None => (BTreeSet::new(), true),
        };
        Ok(Self { path, links, cold })
    }

    /// An empty, unsaved ledger that will be written to `path`.
    #[cfg(test)]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            links: BTreeSet::new(),
            cold: true,
        }
    }

    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    /// Record `link` as seen. Returns `false` if it already was.
    pub fn add(&mut self, link: impl Into<String>) -> bool {
        self.links.insert(link.into())
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no ledger file existed when this store was loaded.
    pub fn is_cold(&self) -> bool {
        self.cold
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the ledger file with the full current set.
    pub async fn save(&mut self) -> Result<(), BoxError> {
        save_links(&self.path, &self.links).await?;
        self.cold = false;
        Ok(())
    }
}
