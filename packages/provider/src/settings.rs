//! Compile-time embedded provider settings.
//!
//! The bundled provider is configured by `services/mapbox.toml`. Values can
//! be overridden programmatically (tests point `base_url` at a local
//! server) or, for the base URL, through `MAPBOX_BASE_URL`.

use std::time::Duration;

use serde::Deserialize;

use crate::ProviderError;
use crate::retry::RetryPolicy;

const MAPBOX_TOML: &str = include_str!("../services/mapbox.toml");

/// Settings for a search provider loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Unique identifier (e.g., `"mapbox"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// Results requested per category search.
    #[serde(default = "default_poi_limit")]
    pub poi_limit: u32,
    /// Results requested per forward geocode.
    #[serde(default = "default_forward_limit")]
    pub forward_limit: u32,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Retries after an HTTP 429 before giving up.
    #[serde(default = "default_max_retries")]
    pub max_rate_limit_retries: u32,
    /// Backoff unit; retry `n` sleeps `n * backoff_step_ms`.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
    /// Simultaneous in-flight category searches.
    #[serde(default = "default_concurrent")]
    pub concurrent_requests: usize,
}

const fn default_poi_limit() -> u32 {
    25
}

const fn default_forward_limit() -> u32 {
    5
}

const fn default_timeout_ms() -> u64 {
    5_000
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_backoff_step_ms() -> u64 {
    200
}

const fn default_concurrent() -> usize {
    4
}

impl ProviderSettings {
    /// Settings embedded in the crate (`services/mapbox.toml`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the embedded TOML is malformed.
    pub fn bundled() -> Result<Self, ProviderError> {
        Self::from_toml_str(MAPBOX_TOML)
    }

    /// Parses settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the TOML is malformed or a value
    /// is out of range.
    pub fn from_toml_str(s: &str) -> Result<Self, ProviderError> {
        let mut settings: Self = toml::de::from_str(s).map_err(|e| ProviderError::Config {
            message: format!("Failed to parse provider settings: {e}"),
        })?;
        if settings.concurrent_requests == 0 {
            return Err(ProviderError::Config {
                message: "concurrent_requests must be at least 1".to_string(),
            });
        }
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        Ok(settings)
    }

    /// Applies `MAPBOX_BASE_URL` when it is set and non-empty.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("MAPBOX_BASE_URL")
            && !url.trim().is_empty()
        {
            self.base_url = url.trim().trim_end_matches('/').to_string();
        }
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Retry policy for rate-limited requests.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_rate_limit_retries,
            backoff_step: Duration::from_millis(self.backoff_step_ms),
        }
    }
}
