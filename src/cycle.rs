//! One check of the status page: load cache, query, detect, alert, persist.
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn, Span};
use uuid::Uuid;

use crate::cache::{AlertedSites, DailyCache};
use crate::config::{ConfigError, Monitor};
use crate::detector::detect_new_offline;
use crate::model::{CycleOutcome, CycleState, DayKey};
use crate::notify::{NotificationSink, NotifyError};
use crate::source::{SourceError, StatusSource};

pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// A cycle that ended in the `Failed` state.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("status acquisition failed: {0}")]
    Acquisition(#[source] SourceError),
    #[error("alert delivery failed for {} site(s): {source}", .sites.len())]
    Delivery {
        sites: Vec<String>,
        #[source]
        source: NotifyError,
    },
}

impl CycleError {
    pub fn state(&self) -> CycleState {
        CycleState::Failed
    }
}

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub target_url: String,
    pub timezone: Tz,
    pub fetch_timeout: Duration,
    pub send_timeout: Duration,
}

impl CycleSettings {
    pub fn from_config(monitor: &Monitor) -> Result<Self, ConfigError> {
        Ok(Self {
            target_url: monitor.target_url.trim().to_string(),
            timezone: monitor.tz()?,
            fetch_timeout: monitor.fetch_timeout(),
            send_timeout: monitor.send_timeout(),
        })
    }
}

pub struct CheckCycle {
    cache: DailyCache,
    source: Box<dyn StatusSource>,
    sink: Box<dyn NotificationSink>,
    settings: CycleSettings,
}

impl CheckCycle {
    pub fn new(
        cache: DailyCache,
        source: Box<dyn StatusSource>,
        sink: Box<dyn NotificationSink>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            cache,
            source,
            sink,
            settings,
        }
    }

    pub async fn run(&self) -> Result<CycleOutcome, CycleError> {
        self.run_at(Utc::now()).await
    }

    /// Run a cycle as if the wall clock read `now`.
    #[instrument(skip_all, fields(cycle_id = %Uuid::new_v4(), day = tracing::field::Empty))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<CycleOutcome, CycleError> {
        let local = now.with_timezone(&self.settings.timezone);
        let day = DayKey::from_datetime(&local);
        Span::current().record("day", day.as_str());
        info!(at = %local.format(TIMESTAMP_FORMAT), "starting check");

        let mut cache = self.cache.load().await;
        cache.ensure_day(&day);
        debug!(state = CycleState::CacheLoaded.as_str());

        let statuses = match timeout(
            self.settings.fetch_timeout,
            self.source.fetch(&self.settings.target_url),
        )
        .await
        {
            Ok(Ok(rows)) => rows,
            Ok(Err(err)) => return Err(self.fail_acquisition(err)),
            Err(_) => return Err(self.fail_acquisition(SourceError::Timeout(self.settings.fetch_timeout))),
        };
        debug!(state = CycleState::Queried.as_str(), rows = statuses.len());

        let no_sites = AlertedSites::new();
        let batch = detect_new_offline(&statuses, cache.alerted(&day).unwrap_or(&no_sites));
        debug!(state = CycleState::Detected.as_str(), new_offline = batch.len());

        if batch.is_empty() {
            info!(state = CycleState::NoNewOffline.as_str(), "no new offline sites today");
            return Ok(CycleOutcome::NoNewOffline);
        }

        warn!(sites = %batch.join(", "), "offline sites detected");
        let message = compose_alert(&local.format(TIMESTAMP_FORMAT).to_string(), &batch);
        let delivered = match timeout(self.settings.send_timeout, self.sink.send(&message)).await {
            Ok(res) => res,
            Err(_) => Err(NotifyError::Timeout(self.settings.send_timeout)),
        };
        if let Err(err) = delivered {
            warn!(%err, state = CycleState::Failed.as_str(), "alert delivery failed; sites stay eligible");
            return Err(CycleError::Delivery {
                sites: batch,
                source: err,
            });
        }
        debug!(state = CycleState::Alerted.as_str());

        cache.commit(&day, batch.as_slice());
        let persisted = self.cache.save(&cache).await;
        if persisted {
            debug!(state = CycleState::CachePersisted.as_str());
        }
        info!(state = CycleState::Done.as_str(), alerted = batch.len(), persisted, "check finished");
        Ok(CycleOutcome::Alerted {
            sites: batch,
            persisted,
        })
    }

    fn fail_acquisition(&self, err: SourceError) -> CycleError {
        warn!(%err, url = %self.settings.target_url, state = CycleState::Failed.as_str(), "status acquisition failed");
        CycleError::Acquisition(err)
    }
}

/// Alert body: header line with count and timestamp, then one site per line.
pub fn compose_alert(timestamp: &str, sites: &[String]) -> String {
    format!(
        "ALERT - {} site(s) offline at {}:\n{}",
        sites.len(),
        timestamp,
        sites.join("\n")
    )
}
