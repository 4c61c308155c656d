//! HTTP retry helper for rate-limited provider requests.
//!
//! Provider calls go through [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly. Only HTTP 429 is retried;
//! transport errors, timeouts and every other non-success status fail
//! immediately so the caller can degrade that slice and move on.
//!
//! # Usage
//!
//! ```ignore
//! let policy = settings.retry_policy();
//! let body = retry::send_json(|| client.get(&url).query(&params), &policy).await?;
//! ```

use std::time::Duration;

use crate::ProviderError;

/// Linear backoff for rate-limited requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Retry `n` sleeps `n * backoff_step`.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_step: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    /// Total requests sent before giving up.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Sends a request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`. The attempt counter is local to this call.
///
/// # Errors
///
/// * [`ProviderError::RateLimited`] once every attempt got HTTP 429.
/// * [`ProviderError::Status`] for any other non-success status.
/// * [`ProviderError::Http`] for transport errors, timeouts and bodies that
///   are not JSON.
pub async fn send_json<F>(
    build_request: F,
    policy: &RetryPolicy,
) -> Result<serde_json::Value, ProviderError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            log::debug!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }

        let response = build_request().send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            log::warn!("  HTTP 429 (rate limited) from {}", redacted_url(&response));
            continue;
        }

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        return Ok(response.json().await?);
    }

    Err(ProviderError::RateLimited {
        attempts: policy.max_attempts(),
    })
}

/// Response URL without its query string, which carries the access token.
fn redacted_url(response: &reqwest::Response) -> String {
    let url = response.url();
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}
