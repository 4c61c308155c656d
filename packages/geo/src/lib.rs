#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic math for amenity lookups.
//!
//! Provides the [`Coordinate`] type passed through the whole pipeline, a
//! haversine [`distance`] in miles, and an approximate square
//! [`bounding_box`] used to scope provider queries. The bounding box only
//! narrows the candidate set; true filtering always goes through
//! [`distance`].

use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MI: f64 = 3958.8;

/// Miles per degree of latitude used by the bounding box approximation.
pub const MILES_PER_DEGREE_LAT: f64 = 69.0;

/// Errors from coordinate construction.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    /// Latitude is not finite or outside `[-90, 90]`.
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),

    /// Longitude is not finite or outside `[-180, 180]`.
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
}

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    #[serde(rename = "lat")]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if either component is non-finite or out of
    /// range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Formats the coordinate as `"lng,lat"`, the order providers expect
    /// for proximity hints.
    #[must_use]
    pub fn to_lng_lat_string(self) -> String {
        format!("{},{}", self.longitude, self.latitude)
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Self {
            x: c.longitude,
            y: c.latitude,
        }
    }
}

/// Great-circle distance between two points in miles (haversine).
#[must_use]
pub fn distance(center: Coordinate, point: Coordinate) -> f64 {
    let d_lat = (point.latitude - center.latitude).to_radians();
    let d_lng = (point.longitude - center.longitude).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + center.latitude.to_radians().cos()
            * point.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2);
    EARTH_RADIUS_MI * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Approximate square bounding box of `radius_mi` around `center`.
///
/// Uses 69 miles per degree of latitude and scales the longitude delta by
/// the cosine of the center latitude. `x` is longitude and `y` latitude.
#[must_use]
pub fn bounding_box(center: Coordinate, radius_mi: f64) -> Rect<f64> {
    let lat_delta = radius_mi / MILES_PER_DEGREE_LAT;
    let lng_delta = radius_mi / (MILES_PER_DEGREE_LAT * center.latitude.to_radians().cos());
    let c: Coord = center.into();
    Rect::new(
        Coord {
            x: c.x - lng_delta,
            y: c.y - lat_delta,
        },
        Coord {
            x: c.x + lng_delta,
            y: c.y + lat_delta,
        },
    )
}

/// Formats a bounding box as `"minLng,minLat,maxLng,maxLat"`.
#[must_use]
pub fn bbox_param(rect: &Rect<f64>) -> String {
    let min = rect.min();
    let max = rect.max();
    format!("{},{},{},{}", min.x, min.y, max.x, max.y)
}

/// Rounds `value` to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
