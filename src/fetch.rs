use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.9";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
    #[error("giving up on {url} after {attempts} attempts: {reason}")]
    Exhausted {
        url: String,
        attempts: u32,
        reason: String,
    },
}

/// Anything that can hand back the HTML of a page.
pub trait PageSource {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    /// Retry `k` (0-based) waits `backoff^k` seconds.
    pub backoff: f64,
    /// Pause after every successful fetch.
    pub pacing: Duration,
    pub user_agent: String,
    /// Extra headers; these win over the defaults.
    pub headers: Vec<(String, String)>,
}

impl TryFrom<&Settings> for FetchOptions {
    type Error = FetchError;

    fn try_from(s: &Settings) -> Result<Self, FetchError> {
        let timeout = s.timeout().map_err(|e| FetchError::InvalidSetting {
            name: "timeout_secs",
            reason: e.to_string(),
        })?;
        Ok(Self {
            timeout,
            max_retries: s.max_retries,
            backoff: s.backoff,
            pacing: s.pacing(),
            user_agent: s.user_agent.clone(),
            headers: Vec::new(),
        })
    }
}

impl FetchOptions {
    pub fn backoff_delay(&self, attempt: u32) -> Result<Duration, FetchError> {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        Duration::try_from_secs_f64(self.backoff.powi(exp)).map_err(|e| {
            FetchError::InvalidSetting {
                name: "backoff",
                reason: e.to_string(),
            }
        })
    }

    fn header_map(&self) -> Result<HeaderMap, FetchError> {
        let invalid = |name: &str, reason: String| FetchError::InvalidHeader {
            name: name.to_string(),
            reason,
        };
        let mut headers = HeaderMap::new();
        let ua = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| invalid("User-Agent", e.to_string()))?;
        headers.insert(USER_AGENT, ua);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_EN));
        for (name, value) in &self.headers {
            let key = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| invalid(name, e.to_string()))?;
            let value = HeaderValue::from_str(value).map_err(|e| invalid(name, e.to_string()))?;
            headers.insert(key, value);
        }
        Ok(headers)
    }
}

/// Polite HTTP fetcher: bounded retries with exponential backoff and a fixed
/// pause after each success.
pub struct HttpFetcher {
    client: reqwest::Client,
    options: FetchOptions,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .default_headers(options.header_map()?)
            .timeout(options.timeout)
            .build()?;
        Ok(Self { client, options })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, String> {
        let resp = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let resp = resp.error_for_status().map_err(|e| e.to_string())?;
        resp.text().await.map_err(|e| e.to_string())
    }
}

impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let attempts = self.options.max_retries + 1;
        let mut reason = String::new();
        for attempt in 0..attempts {
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!("Fetched {} ({} bytes)", url, body.len());
                    tokio::time::sleep(self.options.pacing).await;
                    return Ok(body);
                }
                Err(e) => reason = e,
            }
            if attempt + 1 < attempts {
                let wait = self.options.backoff_delay(attempt)?;
                warn!(
                    "Fetch of {} failed (attempt {}/{}): {}; retrying in {:.1}s",
                    url,
                    attempt + 1,
                    attempts,
                    reason,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
            }
        }
        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            reason,
        })
    }
}
