//! Status page acquisition.
//!
//! The page lists monitored sites in a `#tabelaUrls` table, one `<tr>` per
//! site, with the identifier in `<a class="url">` and the state in
//! `<span class="status">`.
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::SiteStatus;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to reach status page: {0}")]
    Http(#[from] reqwest::Error),
    #[error("status page {url} answered {status}")]
    Status { url: String, status: StatusCode },
    #[error("status page did not answer within {0:?}")]
    Timeout(Duration),
    #[error("status page {0} contained no site rows")]
    Empty(String),
}

#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Full snapshot of `(site, status)` rows currently shown at `target_url`.
    async fn fetch(&self, target_url: &str) -> Result<Vec<SiteStatus>, SourceError>;
}

static TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<table\b[^>]*\bid\s*=\s*["']tabelaUrls["'][^>]*>(.*?)</table>"#)
        .expect("valid table regex")
});
static TBODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tbody\b[^>]*>(.*?)</tbody>").expect("valid tbody regex"));
static ROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("valid row regex"));
// Opening tags whose class list holds `url` / `status` as a whole token.
static URL_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\sclass\s*=\s*["'](?:[^"']*\s)?url(?:\s[^"']*)?["'][^>]*>"#)
        .expect("valid url regex")
});
static STATUS_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<span\b[^>]*?\sclass\s*=\s*["'](?:[^"']*\s)?status(?:\s[^"']*)?["'][^>]*>"#,
    )
    .expect("valid status regex")
});
static ELEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(/?)([A-Za-z][A-Za-z0-9]*)[^>]*>").expect("valid element regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// Fetches the status page over HTTP and scrapes its table.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    http: Client,
    timeout: Duration,
}

impl HttpStatusSource {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let http = Client::builder()
            .user_agent(concat!("site-watch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, timeout })
    }

    /// The client timeout covers the body too, so both the send and the read
    /// can expire.
    fn classify(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Http(err)
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self, target_url: &str) -> Result<Vec<SiteStatus>, SourceError> {
        let res = self
            .http
            .get(target_url)
            .send()
            .await
            .map_err(|err| self.classify(err))?;
        let status = res.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: target_url.to_string(),
                status,
            });
        }
        let html = res.text().await.map_err(|err| self.classify(err))?;
        debug!(bytes = html.len(), "status page downloaded");

        let rows = parse_status_table(&html);
        if rows.is_empty() {
            return Err(SourceError::Empty(target_url.to_string()));
        }
        Ok(rows)
    }
}

/// Extract rows from the `#tabelaUrls` table body. Rows without a site link
/// are skipped; rows without a status keep `status_text = None`.
pub fn parse_status_table(html: &str) -> Vec<SiteStatus> {
    let Some(table) = TABLE_RE.captures(html).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    let body = TBODY_RE
        .captures(table.as_str())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or_else(|| table.as_str());

    let mut rows = Vec::new();
    for (idx, row) in ROW_RE.captures_iter(body).enumerate() {
        let cells = &row[1];
        let site = element_inner(cells, &URL_OPEN_RE, "a")
            .map(inner_text)
            .filter(|s| !s.is_empty());
        let Some(site) = site else {
            // Header rows inside tbody land here too.
            if !cells.trim().is_empty() && !cells.to_ascii_lowercase().contains("<th") {
                warn!(row = idx, "skipping status row without a site link");
            }
            continue;
        };
        let status_text = element_inner(cells, &STATUS_OPEN_RE, "span")
            .map(inner_text)
            .filter(|s| !s.is_empty());
        rows.push(SiteStatus { site, status_text });
    }
    rows
}

/// Content of the first element opened by `open`, up to its matching end tag.
/// Nested elements of the same name are balanced; an unclosed element runs to
/// the end of `html`.
fn element_inner<'h>(html: &'h str, open: &Regex, name: &str) -> Option<&'h str> {
    let start = open.find(html)?.end();
    let rest = &html[start..];
    let mut depth = 0usize;
    for caps in ELEMENT_RE.captures_iter(rest) {
        if !caps[2].eq_ignore_ascii_case(name) {
            continue;
        }
        let tag = caps.get(0)?;
        if caps[1].is_empty() {
            if !tag.as_str().ends_with("/>") {
                depth += 1;
            }
        } else if depth == 0 {
            return Some(&rest[..tag.start()]);
        } else {
            depth -= 1;
        }
    }
    Some(rest)
}

fn inner_text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
