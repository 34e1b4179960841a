//! Per-day record of sites already alerted on, persisted as a JSON document.
//!
//! The file maps `dd-MM-yyyy` day keys to the list of site identifiers that
//! were alerted on that day:
//!
//! ```json
//! {
//!   "04-03-2024": ["https://a.example", "https://b.example"]
//! }
//! ```
//!
//! Reads never fail: a missing or corrupt file degrades to an empty state.
//! Days are never pruned.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::model::DayKey;

pub type AlertedSites = BTreeSet<String>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory view of the cache file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheState {
    days: BTreeMap<DayKey, AlertedSites>,
}

impl CacheState {
    /// Make sure `day` has an entry, leaving every other day untouched.
    pub fn ensure_day(&mut self, day: &DayKey) -> &mut AlertedSites {
        self.days.entry(day.clone()).or_default()
    }

    pub fn alerted(&self, day: &DayKey) -> Option<&AlertedSites> {
        self.days.get(day)
    }

    /// Union `sites` into the set for `day`. Returns how many were new.
    pub fn commit<S: AsRef<str>>(&mut self, day: &DayKey, sites: &[S]) -> usize {
        let set = self.ensure_day(day);
        let mut added = 0;
        for site in sites {
            let site: &str = site.as_ref();
            if set.insert(site.to_string()) {
                added += 1;
            }
        }
        added
    }

    pub fn days(&self) -> impl Iterator<Item = &DayKey> {
        self.days.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// File-backed store for [`CacheState`].
#[derive(Debug, Clone)]
pub struct DailyCache {
    path: PathBuf,
}

impl DailyCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted state, degrading to an empty state on any failure.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> CacheState {
        match self.try_load().await {
            Ok(state) => state,
            Err(err) => {
                warn!(%err, "failed to read cache; starting from empty state");
                CacheState::default()
            }
        }
    }

    /// Like [`load`](Self::load) but surfaces read/parse errors.
    /// A file that does not exist is not an error.
    pub async fn try_load(&self) -> Result<CacheState, CacheError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("cache file absent");
                return Ok(CacheState::default());
            }
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(CacheState::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// Persist `state`, logging failures. Returns whether the write succeeded.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn save(&self, state: &CacheState) -> bool {
        match self.try_save(state).await {
            Ok(()) => {
                info!("cache updated");
                true
            }
            Err(err) => {
                warn!(%err, "failed to save cache");
                false
            }
        }
    }

    /// Write the whole document to a sibling temp file, then rename it over
    /// the cache so readers never observe a half-written file.
    pub async fn try_save(&self, state: &CacheState) -> Result<(), CacheError> {
        let body = serde_json::to_string_pretty(state)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, body).await?;
        if let Err(err) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cache".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
