//! Urban density classification.
//!
//! Density is the walking-radius amenity count divided by the area of a
//! 1-mile-radius disc (π square miles).

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Minimum density for [`UrbanLabel::Urban`].
pub const URBAN_MIN_DENSITY: f64 = 30.0;
/// Minimum density for [`UrbanLabel::DenseSuburban`].
pub const DENSE_SUBURBAN_MIN_DENSITY: f64 = 15.0;
/// Minimum density for [`UrbanLabel::Suburban`].
pub const SUBURBAN_MIN_DENSITY: f64 = 6.0;

/// Four-tier density classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum UrbanLabel {
    /// Density of at least 30 amenities per square mile.
    Urban,
    /// Density in `[15, 30)`.
    #[serde(rename = "Dense Suburban")]
    #[strum(serialize = "Dense Suburban")]
    DenseSuburban,
    /// Density in `[6, 15)`.
    Suburban,
    /// Density below 6.
    Rural,
}

impl UrbanLabel {
    /// Classifies a density; each tier's lower bound is inclusive.
    #[must_use]
    pub fn from_density(density: f64) -> Self {
        if density >= URBAN_MIN_DENSITY {
            Self::Urban
        } else if density >= DENSE_SUBURBAN_MIN_DENSITY {
            Self::DenseSuburban
        } else if density >= SUBURBAN_MIN_DENSITY {
            Self::Suburban
        } else {
            Self::Rural
        }
    }
}

/// Density classification of a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrbanIndex {
    /// Tier.
    pub label: UrbanLabel,
    /// Amenities per square mile, rounded to one decimal.
    pub density: f64,
}

/// Classifies `walking_count` amenities found within one mile.
///
/// The label is decided on the unrounded density.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn urban_index(walking_count: usize) -> UrbanIndex {
    let density = walking_count as f64 / std::f64::consts::PI;
    UrbanIndex {
        label: UrbanLabel::from_density(density),
        density: amenity_map_geo::round_to(density, 1),
    }
}
