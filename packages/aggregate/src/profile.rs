//! Aggregation and scoring in one call.

use amenity_map_amenity_models::Amenity;
use amenity_map_geo::Coordinate;
use amenity_map_provider::LocationProvider;
use amenity_map_scoring::{CategoryBreakdown, ScoreResult, Scorer};
use serde::{Deserialize, Serialize};

use crate::{AggregateOptions, aggregate};

/// Amenities and scores for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationProfile {
    /// Query center.
    pub center: Coordinate,
    /// Amenities within the walking radius.
    pub walking: Vec<Amenity>,
    /// Amenities within the driving radius.
    pub driving: Vec<Amenity>,
    /// Walking score, driving score and urban index.
    pub scores: ScoreResult,
    /// Per-category contributions.
    pub breakdown: Vec<CategoryBreakdown>,
}

/// Aggregates amenities around `center` and scores them.
pub async fn profile(
    provider: &dyn LocationProvider,
    center: Coordinate,
    options: &AggregateOptions,
    scorer: &Scorer,
) -> LocationProfile {
    let sets = aggregate(provider, center, options).await;
    let scores = scorer.score(&sets.walking, &sets.driving);
    let breakdown = scorer.breakdown(&sets.walking, &sets.driving);
    log::debug!(
        "Scored ({}, {}): walking {}, driving {}, {}",
        center.latitude,
        center.longitude,
        scores.walking_score,
        scores.driving_score,
        scores.urban_label,
    );
    LocationProfile {
        center,
        walking: sets.walking,
        driving: sets.driving,
        scores,
        breakdown,
    }
}
