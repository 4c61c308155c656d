#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location provider for amenity lookups.
//!
//! Wraps an external search API behind the [`LocationProvider`] trait:
//!
//! 1. **Category POI search**: one request per (provider category id,
//!    radius), scoped by proximity and a bounding box. HTTP 429 responses
//!    are retried with linear backoff; every other failure degrades the
//!    slice to an empty [`CategoryFetch`] instead of failing the caller.
//! 2. **Forward geocoding**: free-text address search.
//! 3. **Reverse geocoding**: coordinate to address, falling back to a
//!    formatted `"lat, lng"` string.
//!
//! The bundled implementation is [`mapbox::MapboxClient`]. Its settings and
//! category mapping are embedded TOML files under `services/` and
//! `categories/`.

pub mod categories;
pub mod mapbox;
pub mod retry;
pub mod settings;

use amenity_map_amenity_models::{Amenity, Category, GeoResult};
use amenity_map_geo::Coordinate;
use async_trait::async_trait;
use thiserror::Error;

pub use categories::{CategoryMap, CategoryTask};
pub use settings::ProviderSettings;

/// Errors from provider operations.
///
/// These never escape a [`LocationProvider`] POI search; they are recorded
/// as the reason of a degraded [`CategoryFetch`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed (connection, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("Provider returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// Provider kept answering 429 after every retry.
    #[error("Rate limited after {attempts} attempts")]
    RateLimited {
        /// Total number of requests sent.
        attempts: u32,
    },

    /// Response body did not have the expected shape.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Missing or malformed configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is misconfigured.
        message: String,
    },
}

/// A single category search around a center point.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryQuery {
    /// Search center.
    pub center: Coordinate,
    /// Search radius in miles.
    pub radius_mi: f64,
    /// Internal category results are tagged with.
    pub category: Category,
    /// Provider-specific category identifier to query.
    pub provider_id: String,
}

/// Whether a category search produced data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// The provider answered successfully (possibly with zero results).
    Ok,
    /// The search failed and contributes no amenities.
    Degraded {
        /// Why the search failed.
        reason: String,
    },
}

/// Tagged result of one category search.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFetch {
    /// Internal category searched.
    pub category: Category,
    /// Provider category identifier searched.
    pub provider_id: String,
    /// Search radius in miles.
    pub radius_mi: f64,
    /// Normalized results; empty when degraded.
    pub amenities: Vec<Amenity>,
    /// Outcome of the search.
    pub status: FetchStatus,
}

impl CategoryFetch {
    /// A successful search.
    #[must_use]
    pub fn ok(query: &CategoryQuery, amenities: Vec<Amenity>) -> Self {
        Self {
            category: query.category,
            provider_id: query.provider_id.clone(),
            radius_mi: query.radius_mi,
            amenities,
            status: FetchStatus::Ok,
        }
    }

    /// A failed search, recorded with its reason.
    #[must_use]
    pub fn degraded(query: &CategoryQuery, reason: impl Into<String>) -> Self {
        Self {
            category: query.category,
            provider_id: query.provider_id.clone(),
            radius_mi: query.radius_mi,
            amenities: Vec::new(),
            status: FetchStatus::Degraded {
                reason: reason.into(),
            },
        }
    }

    /// Returns `true` if the provider answered successfully.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, FetchStatus::Ok)
    }

    /// Drops the tag, keeping only the amenities.
    #[must_use]
    pub fn into_amenities(self) -> Vec<Amenity> {
        self.amenities
    }
}

/// External search API used by the amenity pipeline.
///
/// None of these operations fail: POI searches degrade to an empty
/// [`CategoryFetch`], forward geocoding to an empty list, and reverse
/// geocoding to a formatted coordinate string.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Internal category to provider category id mapping.
    fn category_map(&self) -> &CategoryMap;

    /// Searches one provider category around `query.center`.
    async fn fetch_category(&self, query: &CategoryQuery) -> CategoryFetch;

    /// Free-text address search.
    async fn forward_geocode(&self, query: &str) -> Vec<GeoResult>;

    /// Address for a coordinate, or `"lat, lng"` when none is found.
    async fn reverse_geocode(&self, at: Coordinate) -> String;
}

/// Fallback address used when reverse geocoding finds nothing.
#[must_use]
pub fn fallback_address(at: Coordinate) -> String {
    format!("{}, {}", at.latitude, at.longitude)
}
