#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the amenity map server.
//!
//! These types are serialized to JSON for the REST API. They are kept
//! separate from the pipeline types so the API contract can evolve
//! independently.

use amenity_map_amenity_models::{Amenity, Category, GeoResult};
use amenity_map_scoring::CategoryWeight;
use serde::{Deserialize, Serialize};

/// Query parameters carrying a coordinate.
///
/// Kept as raw strings so unparseable values surface as a 400 with a JSON
/// body instead of a framework-level rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoordinateParams {
    /// Latitude in degrees.
    pub lat: Option<String>,
    /// Longitude in degrees.
    pub lng: Option<String>,
}

/// Query parameters for forward geocoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodeParams {
    /// Free-text address query.
    pub q: Option<String>,
}

/// `GET /api/amenities` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAmenities {
    /// Amenities within one mile.
    pub walking: Vec<Amenity>,
    /// Amenities within five miles.
    pub driving: Vec<Amenity>,
}

/// `GET /api/geocode` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiGeocodeResults {
    /// Matches, best first.
    pub results: Vec<GeoResult>,
}

/// `GET /api/reverse-geocode` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAddress {
    /// Full address, or `"lat, lng"` when nothing matched.
    pub address: String,
}

/// Error body for client errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// What was wrong with the request.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Crate version.
    pub version: String,
}

/// A scored category with the provider ids searched for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCategory {
    /// Category key.
    pub category: Category,
    /// Display label.
    pub label: String,
    /// Ideal walking count.
    pub ideal: u32,
    /// Maximum points.
    pub weight: f64,
    /// Provider category ids searched.
    pub provider_ids: Vec<String>,
}

impl ApiCategory {
    /// Builds a listing entry from a weight table row.
    #[must_use]
    pub fn new(weight: &CategoryWeight, provider_ids: &[String]) -> Self {
        Self {
            category: weight.category,
            label: weight.category.label().to_string(),
            ideal: weight.ideal,
            weight: weight.weight,
            provider_ids: provider_ids.to_vec(),
        }
    }
}
