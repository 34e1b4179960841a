use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the status page as observed during a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteStatus {
    pub site: String,
    pub status_text: Option<String>,
}

impl SiteStatus {
    pub fn new(site: impl Into<String>, status_text: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            status_text: Some(status_text.into()),
        }
    }

    pub fn without_status(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            status_text: None,
        }
    }
}

/// Calendar day in the monitor's timezone, rendered as `dd-MM-yyyy`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    pub const FORMAT: &'static str = "%d-%m-%Y";

    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(at.format(Self::FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DayKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// States a check cycle moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Start,
    CacheLoaded,
    Queried,
    Detected,
    NoNewOffline,
    Alerted,
    CachePersisted,
    Done,
    Failed,
}

impl CycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::Start => "start",
            CycleState::CacheLoaded => "cache_loaded",
            CycleState::Queried => "queried",
            CycleState::Detected => "detected",
            CycleState::NoNewOffline => "no_new_offline",
            CycleState::Alerted => "alerted",
            CycleState::CachePersisted => "cache_persisted",
            CycleState::Done => "done",
            CycleState::Failed => "failed",
        }
    }
}

/// Successful end of a check cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NoNewOffline,
    Alerted {
        sites: Vec<String>,
        /// False when the alert went out but the cache write failed.
        persisted: bool,
    },
}

impl CycleOutcome {
    pub fn terminal_state(&self) -> CycleState {
        match self {
            CycleOutcome::NoNewOffline => CycleState::NoNewOffline,
            CycleOutcome::Alerted { .. } => CycleState::Done,
        }
    }
}
