//! Configuration loader and validator for the availability monitor.
use chrono_tz::Tz;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub monitor: Monitor,
    pub twilio: Twilio,
}

/// Polling and persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Monitor {
    pub target_url: String,
    pub poll_interval_seconds: u64,
    pub timezone: String,
    pub cache_path: String,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,
}

/// Twilio SMS credentials and the fixed sender/recipient pair.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Twilio {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    pub to: String,
}

impl std::fmt::Debug for Twilio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Twilio")
            .field("account_sid", &self.account_sid)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_send_timeout() -> u64 {
    15
}

impl Monitor {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_seconds)
    }

    /// Cache file location with a leading `~/` expanded to `$HOME`.
    pub fn cache_path(&self) -> PathBuf {
        let raw = self.cache_path.trim();
        if let Some(rest) = raw.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return Path::new(&home).join(rest);
            }
        }
        PathBuf::from(raw)
    }

    /// Parsed IANA zone. Only fails on configs that skipped `validate`.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid("monitor.timezone must be a known IANA zone"))
    }
}

impl Config {
    /// Overlay Twilio credentials from the environment, if present.
    ///
    /// Recognised variables: `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`,
    /// `TWILIO_PHONE` (sender) and `MY_PHONE` (recipient).
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut String); 4] = [
            ("TWILIO_ACCOUNT_SID", &mut self.twilio.account_sid),
            ("TWILIO_AUTH_TOKEN", &mut self.twilio.auth_token),
            ("TWILIO_PHONE", &mut self.twilio.from),
            ("MY_PHONE", &mut self.twilio.to),
        ];
        for (key, slot) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }
    }

    /// Ensure the directory holding the cache file exists.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        match self.monitor.cache_path().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env_overrides();
    validate(&cfg)?;
    Ok(cfg)
}

/// Load and validate only the `monitor` section. Tools that never send an
/// alert use this so missing Twilio credentials do not stop them.
pub fn load_monitor(path: Option<&Path>) -> Result<Monitor, ConfigError> {
    #[derive(Deserialize)]
    struct MonitorSection {
        monitor: Monitor,
    }

    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let section: MonitorSection = serde_yaml::from_str(&content)?;
    validate_monitor(&section.monitor)?;
    Ok(section.monitor)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    validate_monitor(&cfg.monitor)?;

    let t = &cfg.twilio;
    if t.account_sid.trim().is_empty() {
        return Err(ConfigError::Invalid("twilio.account_sid must be non-empty"));
    }
    if t.auth_token.trim().is_empty() {
        return Err(ConfigError::Invalid("twilio.auth_token must be non-empty"));
    }
    if t.from.trim().is_empty() {
        return Err(ConfigError::Invalid("twilio.from must be non-empty"));
    }
    if t.to.trim().is_empty() {
        return Err(ConfigError::Invalid("twilio.to must be non-empty"));
    }

    Ok(())
}

pub fn validate_monitor(m: &Monitor) -> Result<(), ConfigError> {
    if m.target_url.trim().is_empty() {
        return Err(ConfigError::Invalid("monitor.target_url must be non-empty"));
    }
    match Url::parse(m.target_url.trim()) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        _ => {
            return Err(ConfigError::Invalid(
                "monitor.target_url must be an http(s) URL",
            ))
        }
    }
    if m.poll_interval_seconds == 0 {
        return Err(ConfigError::Invalid("monitor.poll_interval_seconds must be > 0"));
    }
    m.tz()?;
    if m.cache_path.trim().is_empty() {
        return Err(ConfigError::Invalid("monitor.cache_path must be non-empty"));
    }
    if m.fetch_timeout_seconds == 0 {
        return Err(ConfigError::Invalid("monitor.fetch_timeout_seconds must be > 0"));
    }
    if m.send_timeout_seconds == 0 {
        return Err(ConfigError::Invalid("monitor.send_timeout_seconds must be > 0"));
    }
    Ok(())
}

/// Returns a complete example configuration document.
pub fn example() -> &'static str {
    r#"monitor:
  target_url: "https://htmleiene.github.io/monitoramento_urls/"
  poll_interval_seconds: 15
  timezone: "America/Sao_Paulo"
  cache_path: "./offline_cache.json"
  fetch_timeout_seconds: 30
  send_timeout_seconds: 15

twilio:
  account_sid: "ACXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX"
  auth_token: "YOUR_TWILIO_AUTH_TOKEN"
  from: "+15550000000"
  to: "+15551111111"
"#
}
