use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Twilio;

const TWILIO_API_BASE: &str = "https://api.twilio.com/";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to reach notification service: {0}")]
    Http(#[from] reqwest::Error),
    #[error("notification rejected with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("notification not acknowledged within {0:?}")]
    Timeout(Duration),
    #[error("invalid notification endpoint: {0}")]
    Endpoint(String),
}

/// Delivers a message body to the one configured recipient.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, body: &str) -> Result<(), NotifyError>;
}

/// Twilio Programmable Messaging client sending SMS.
#[derive(Clone)]
pub struct TwilioClient {
    http: Client,
    base_url: Url,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
    timeout: Duration,
}

impl fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioClient")
            .field("base_url", &self.base_url)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct MessageResponse {
    sid: String,
}

impl TwilioClient {
    pub fn from_config(cfg: &Twilio, timeout: Duration) -> Result<Self, NotifyError> {
        let base_url = Url::parse(TWILIO_API_BASE).expect("valid default Twilio URL");
        Self::with_base_url(cfg, timeout, base_url)
    }

    pub fn with_base_url(cfg: &Twilio, timeout: Duration, base_url: Url) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .user_agent(concat!("site-watch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            account_sid: cfg.account_sid.clone(),
            auth_token: cfg.auth_token.clone(),
            from: cfg.from.clone(),
            to: cfg.to.clone(),
            timeout,
        })
    }

    pub fn build_request(&self, body: &str) -> Result<reqwest::Request, NotifyError> {
        let endpoint = self
            .base_url
            .join(&format!("2010-04-01/Accounts/{}/Messages.json", self.account_sid))
            .map_err(|err| NotifyError::Endpoint(err.to_string()))?;
        let form = [("To", self.to.as_str()), ("From", self.from.as_str()), ("Body", body)];
        Ok(self
            .http
            .post(endpoint)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .build()?)
    }
}

#[async_trait]
impl NotificationSink for TwilioClient {
    async fn send(&self, body: &str) -> Result<(), NotifyError> {
        let request = self.build_request(body)?;
        debug!(url = %request.url(), chars = body.chars().count(), "sending sms");
        let res = self.http.execute(request).await.map_err(|err| {
            if err.is_timeout() {
                NotifyError::Timeout(self.timeout)
            } else {
                NotifyError::Http(err)
            }
        })?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }

        match res.json::<MessageResponse>().await {
            Ok(msg) => info!(sid = %msg.sid, to = %self.to, "sms sent"),
            Err(_) => info!(to = %self.to, "sms sent"),
        }
        Ok(())
    }
}
