//! Document fetching with exponential backoff retry logic.
//!
//! The rest of the crate only sees [`FetchDocument`]: give it a URL, get the
//! document body back as text or a [`FetchError`].
//!
//! - [`HttpFetcher`]: `reqwest` client with a timeout and user agent
//! - [`RetryFetch`]: decorator that retries transient failures of any
//!   [`FetchDocument`] implementation
//!
//! # Retry Strategy
//!
//! - Transport errors, `429` and `5xx` are retried; other statuses are final
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::error::FetchError;
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Something that can turn a URL into a document body.
///
/// Returned futures are `Send` so fetches can run on spawned tasks.
pub trait FetchDocument {
    /// Fetch the document at `url` and return its body as text.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Fetches documents over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client with the given per-request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

/// Reject responses that cannot be a text document, such as images or PDFs.
///
/// # Arguments
///
/// * `url` - The requested URL, for the error message
/// * `content_type` - The raw `Content-Type` header, if the server sent one
///
/// # Returns
///
/// `Ok(())` for a missing header, any `text/*` type, and HTML or XML types
/// (`application/xhtml+xml`, `application/rss+xml`, ...); otherwise
/// [`FetchError::Parse`].
fn check_content_type(url: &str, content_type: Option<&str>) -> Result<(), FetchError> {
    let Some(raw) = content_type else {
        return Ok(());
    };
    let mime = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if mime.is_empty() || mime.starts_with("text/") || mime.contains("html") || mime.contains("xml") {
        return Ok(());
    }
    Err(FetchError::Parse {
        url: url.to_string(),
        message: format!("unexpected content type {mime}"),
    })
}

impl FetchDocument for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        check_content_type(url, content_type)?;
        let body = response.text().await.map_err(transport)?;

        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched document"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FetchDocument`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher.
    inner: T,
    /// Retries after the first attempt before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap.
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: FetchDocument,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchDocument for RetryFetch<T>
where
    T: FetchDocument + Sync,
{
    #[instrument(level = "debug", skip(self), fields(url = %truncate_for_log(url, 120)))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
