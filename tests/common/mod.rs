#![allow(dead_code)]

use reqwest::StatusCode;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use site_watch::cache::DailyCache;
use site_watch::cycle::{CheckCycle, CycleSettings};
use site_watch::model::SiteStatus;
use site_watch::notify::{NotificationSink, NotifyError};
use site_watch::source::{SourceError, StatusSource};

pub const TARGET: &str = "https://status.example/";

/// Scripted behaviour for one `fetch` call.
#[derive(Debug, Clone)]
pub enum SourceStep {
    Rows(Vec<SiteStatus>),
    Fail,
    Panic,
    Hang,
}

#[derive(Clone, Default)]
pub struct RecordingSource {
    steps: Arc<Mutex<VecDeque<SourceStep>>>,
    calls: Arc<Mutex<Vec<Instant>>>,
    latency: Option<Duration>,
}

impl RecordingSource {
    pub fn with_steps(steps: Vec<SourceStep>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(VecDeque::from(steps))),
            ..Default::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn calls(&self) -> Vec<Instant> {
        self.calls.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl StatusSource for RecordingSource {
    async fn fetch(&self, target_url: &str) -> Result<Vec<SiteStatus>, SourceError> {
        assert_eq!(target_url, TARGET);
        self.calls.lock().await.push(Instant::now());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        // An exhausted script reports an all-online page.
        let step = self
            .steps
            .lock()
            .await
            .pop_front()
            .unwrap_or(SourceStep::Rows(Vec::new()));
        match step {
            SourceStep::Rows(rows) => Ok(rows),
            SourceStep::Fail => Err(SourceError::Empty(target_url.to_string())),
            SourceStep::Panic => panic!("scripted source panic"),
            SourceStep::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Scripted behaviour for one `send` call.
#[derive(Debug, Clone, Copy)]
pub enum SinkStep {
    Deliver,
    Reject,
    Hang,
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    steps: Arc<Mutex<VecDeque<SinkStep>>>,
    attempts: Arc<Mutex<Vec<String>>>,
    delivered: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn with_steps(steps: Vec<SinkStep>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(VecDeque::from(steps))),
            ..Default::default()
        }
    }

    pub async fn attempts(&self) -> Vec<String> {
        self.attempts.lock().await.clone()
    }

    pub async fn delivered(&self) -> Vec<String> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, body: &str) -> Result<(), NotifyError> {
        self.attempts.lock().await.push(body.to_string());
        let step = self
            .steps
            .lock()
            .await
            .pop_front()
            .unwrap_or(SinkStep::Deliver);
        match step {
            SinkStep::Deliver => {
                self.delivered.lock().await.push(body.to_string());
                Ok(())
            }
            SinkStep::Reject => Err(NotifyError::Rejected {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "scripted failure".into(),
            }),
            SinkStep::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

pub fn settings() -> CycleSettings {
    CycleSettings {
        target_url: TARGET.into(),
        timezone: chrono_tz::America::Sao_Paulo,
        fetch_timeout: Duration::from_secs(30),
        send_timeout: Duration::from_secs(15),
    }
}

pub fn build_cycle(cache_path: &Path, source: &RecordingSource, sink: &RecordingSink) -> CheckCycle {
    CheckCycle::new(
        DailyCache::new(cache_path),
        Box::new(source.clone()),
        Box::new(sink.clone()),
        settings(),
    )
}

pub fn scenario_rows() -> Vec<SiteStatus> {
    vec![
        SiteStatus::new("A", "Online"),
        SiteStatus::new("B", "Offline"),
        SiteStatus::new("C", "OFFLINE - timeout"),
    ]
}
