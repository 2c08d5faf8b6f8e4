//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml           # Crawler configuration
//! ├── ids.txt               # Probe output
//! └── olympiads.json        # Listings artifact
//! ```
//!
//! Every file is replaced with write-to-temp-then-rename, so readers only
//! ever see a complete document. Listings are held in memory and the whole
//! map is snapshotted every `checkpoint_every` writes and on commit.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{CandidateId, Config, CrawlerConfig, ListingEntry, ListingRecord, PathsConfig};
use crate::storage::{ListingSink, Listings};

#[derive(Default)]
struct SinkState {
    listings: Listings,
    /// Writes since the last snapshot
    pending: usize,
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    ids_file: String,
    output_file: String,
    checkpoint_every: usize,
    state: Mutex<SinkState>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory, with default
    /// file names.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let paths = PathsConfig::default();
        Self {
            root_dir: root_dir.into(),
            ids_file: paths.ids_file,
            output_file: paths.output_file,
            checkpoint_every: CrawlerConfig::default().checkpoint_every,
            state: Mutex::new(SinkState::default()),
        }
    }

    /// Create a LocalStorage using the configured file names and checkpoint
    /// interval.
    pub fn from_config(root_dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            root_dir: root_dir.into(),
            ids_file: config.paths.ids_file.clone(),
            output_file: config.paths.output_file.clone(),
            checkpoint_every: config.crawler.checkpoint_every.max(1),
            state: Mutex::new(SinkState::default()),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    pub fn output_path(&self) -> PathBuf {
        self.path(&self.output_file)
    }

    pub fn ids_path(&self) -> PathBuf {
        self.path(&self.ids_file)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Replace the id list with `ids`, one per line.
    pub async fn save_ids(&self, ids: &[CandidateId]) -> Result<()> {
        let mut text = String::with_capacity(ids.len() * 6);
        for id in ids {
            text.push_str(&id.to_string());
            text.push('\n');
        }
        self.write_bytes(&self.ids_file, text.as_bytes()).await?;
        log::info!("Saved {} ids to {}", ids.len(), self.ids_path().display());
        Ok(())
    }

    /// Load the id list written by the last probe.
    pub async fn load_ids(&self) -> Result<Vec<CandidateId>> {
        match self.read_bytes(&self.ids_file).await? {
            Some(bytes) => Self::parse_ids(&String::from_utf8_lossy(&bytes)),
            None => Err(AppError::config(format!(
                "Id list not found at {}. Run 'probe' first.",
                self.ids_path().display()
            ))),
        }
    }

    /// Load an id list from an arbitrary file.
    pub async fn load_ids_from(path: &Path) -> Result<Vec<CandidateId>> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::parse_ids(&text)
    }

    /// Parse a newline-separated id list; blank lines are ignored.
    pub fn parse_ids(text: &str) -> Result<Vec<CandidateId>> {
        text.lines()
            .enumerate()
            .map(|(n, line)| (n, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .map(|(n, line)| {
                line.parse().map_err(|_| {
                    AppError::validation(format!("line {}: invalid id {:?}", n + 1, line))
                })
            })
            .collect()
    }

    /// Listings currently on disk; empty when no artifact exists yet.
    pub async fn load_listings(&self) -> Result<Listings> {
        Ok(self.read_json(&self.output_file).await?.unwrap_or_default())
    }

    async fn snapshot(&self, state: &mut SinkState) -> Result<()> {
        self.write_json(&self.output_file, &state.listings).await?;
        state.pending = 0;
        log::debug!(
            "Checkpoint: {} listings written to {}",
            state.listings.len(),
            self.output_file
        );
        Ok(())
    }
}

#[async_trait]
impl ListingSink for LocalStorage {
    async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.listings.clear();
        self.snapshot(&mut state).await?;
        log::info!("Cleared {}", self.output_path().display());
        Ok(())
    }

    async fn write(&self, record: &ListingRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        state.listings.insert(record.id, ListingEntry::from(record));
        state.pending += 1;

        if state.pending >= self.checkpoint_every {
            // The record is held in memory; the next checkpoint or the commit
            // persists it.
            if let Err(e) = self.snapshot(&mut state).await {
                log::warn!("Checkpoint of {} failed: {}", self.output_file, e);
            }
        }
        Ok(())
    }

    async fn commit(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        self.snapshot(&mut state).await?;
        log::info!(
            "{} listings written to {}",
            state.listings.len(),
            self.output_path().display()
        );
        Ok(state.listings.len())
    }
}
