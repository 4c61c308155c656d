#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Amenity scoring.
//!
//! Turns the walking-radius and driving-radius amenity sets into:
//!
//! - a **walking score** (count-based): each category earns
//!   `min(count / ideal, 1) * weight`;
//! - a **driving score** (distance decay): each category earns
//!   `max(0, 1 - nearest / radius) * weight` with a 5 mile radius;
//! - an **urban index** from walking-radius density.
//!
//! Both scores sum per-category contributions, round once at the end and
//! clamp to `[0, 100]`. Categories missing from the [`WeightTable`] are
//! ignored.

pub mod urban;
pub mod weights;

use std::collections::BTreeMap;

use amenity_map_amenity_models::{Amenity, Category};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use urban::{UrbanIndex, UrbanLabel, urban_index};
pub use weights::{CategoryWeight, WeightTable};

/// Distance at which a driving-score contribution reaches zero.
pub const DEFAULT_DRIVING_RADIUS_MI: f64 = 5.0;

/// Errors from scoring configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// Weight table failed validation.
    #[error("Invalid weight table: {message}")]
    InvalidWeights {
        /// What is wrong with the table.
        message: String,
    },

    /// Driving decay radius is not a positive finite distance.
    #[error("Invalid driving radius: {radius_mi} mi")]
    InvalidRadius {
        /// Rejected radius in miles.
        radius_mi: f64,
    },
}

/// Scores for one location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// Walking score, 0-100.
    pub walking_score: u8,
    /// Driving score, 0-100.
    pub driving_score: u8,
    /// Density tier.
    pub urban_label: UrbanLabel,
    /// Walking-radius amenities per square mile, one decimal.
    pub density: f64,
}

/// Per-category contribution to both scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    /// Category.
    pub category: Category,
    /// Display label.
    pub label: String,
    /// Maximum points.
    pub weight: f64,
    /// Ideal walking count.
    pub ideal: u32,
    /// Amenities within walking radius.
    pub walking_count: usize,
    /// Walking points earned, one decimal.
    pub walking_points: f64,
    /// Nearest amenity within driving radius, if any.
    pub nearest_mi: Option<f64>,
    /// Driving points earned, one decimal.
    pub driving_points: f64,
}

/// Computes scores against an injected [`WeightTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Scorer {
    weights: WeightTable,
    driving_radius_mi: f64,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(WeightTable::canonical())
    }
}

impl Scorer {
    /// Creates a scorer with the default 5 mile driving radius.
    #[must_use]
    pub const fn new(weights: WeightTable) -> Self {
        Self {
            weights,
            driving_radius_mi: DEFAULT_DRIVING_RADIUS_MI,
        }
    }

    /// Overrides the distance at which driving contributions reach zero.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidRadius`] unless `radius_mi` is finite
    /// and positive.
    pub fn with_driving_radius(mut self, radius_mi: f64) -> Result<Self, ScoringError> {
        if !radius_mi.is_finite() || radius_mi <= 0.0 {
            return Err(ScoringError::InvalidRadius { radius_mi });
        }
        self.driving_radius_mi = radius_mi;
        Ok(self)
    }

    /// Weight table in use.
    #[must_use]
    pub const fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Count-based walking score.
    #[must_use]
    pub fn walking_score(&self, amenities: &[Amenity]) -> u8 {
        let counts = counts_by_category(amenities);
        let total: f64 = self
            .weights
            .entries()
            .iter()
            .map(|w| walking_points(w, counts.get(&w.category).copied().unwrap_or(0)))
            .sum();
        finalize(total)
    }

    /// Nearest-distance driving score.
    #[must_use]
    pub fn driving_score(&self, amenities: &[Amenity]) -> u8 {
        let nearest = nearest_by_category(amenities);
        let total: f64 = self
            .weights
            .entries()
            .iter()
            .filter_map(|w| {
                nearest
                    .get(&w.category)
                    .map(|d| self.driving_points(w, *d))
            })
            .sum();
        finalize(total)
    }

    /// Density classification of the walking set.
    #[must_use]
    pub fn urban_index(&self, walking: &[Amenity]) -> UrbanIndex {
        urban_index(walking.len())
    }

    /// All three metrics at once.
    #[must_use]
    pub fn score(&self, walking: &[Amenity], driving: &[Amenity]) -> ScoreResult {
        let urban = self.urban_index(walking);
        ScoreResult {
            walking_score: self.walking_score(walking),
            driving_score: self.driving_score(driving),
            urban_label: urban.label,
            density: urban.density,
        }
    }

    /// Per-category contributions, heaviest categories first.
    #[must_use]
    pub fn breakdown(&self, walking: &[Amenity], driving: &[Amenity]) -> Vec<CategoryBreakdown> {
        let counts = counts_by_category(walking);
        let nearest = nearest_by_category(driving);

        let mut rows: Vec<CategoryBreakdown> = self
            .weights
            .entries()
            .iter()
            .map(|w| {
                let walking_count = counts.get(&w.category).copied().unwrap_or(0);
                let nearest_mi = nearest.get(&w.category).copied();
                CategoryBreakdown {
                    category: w.category,
                    label: w.category.label().to_string(),
                    weight: w.weight,
                    ideal: w.ideal,
                    walking_count,
                    walking_points: amenity_map_geo::round_to(walking_points(w, walking_count), 1),
                    nearest_mi,
                    driving_points: nearest_mi.map_or(0.0, |d| {
                        amenity_map_geo::round_to(self.driving_points(w, d), 1)
                    }),
                }
            })
            .collect();

        rows.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        rows
    }

    fn driving_points(&self, weight: &CategoryWeight, nearest_mi: f64) -> f64 {
        (1.0 - nearest_mi / self.driving_radius_mi).max(0.0) * weight.weight
    }
}

#[allow(clippy::cast_precision_loss)]
fn walking_points(weight: &CategoryWeight, count: usize) -> f64 {
    (count as f64 / f64::from(weight.ideal)).min(1.0) * weight.weight
}

fn counts_by_category(amenities: &[Amenity]) -> BTreeMap<Category, usize> {
    let mut counts = BTreeMap::new();
    for a in amenities {
        *counts.entry(a.category).or_insert(0) += 1;
    }
    counts
}

fn nearest_by_category(amenities: &[Amenity]) -> BTreeMap<Category, f64> {
    let mut nearest: BTreeMap<Category, f64> = BTreeMap::new();
    for a in amenities {
        nearest
            .entry(a.category)
            .and_modify(|d| *d = d.min(a.distance_mi))
            .or_insert(a.distance_mi);
    }
    nearest
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn finalize(total: f64) -> u8 {
    total.round().clamp(0.0, 100.0) as u8
}
