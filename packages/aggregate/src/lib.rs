#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Amenity aggregation around a location.
//!
//! Resolves the provider's category map once into a flat list of searches,
//! runs that list for the walking (1 mi) and driving (5 mi) radii as a
//! single stream with a fixed number of requests in flight, then filters
//! each set by true distance and removes exact duplicates.
//!
//! Individual searches that fail, get rate limited or time out contribute
//! nothing; aggregation itself never fails.

pub mod profile;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use std::collections::BTreeSet;
use std::time::Duration;

use amenity_map_amenity_models::Amenity;
use amenity_map_geo::Coordinate;
use amenity_map_provider::{CategoryFetch, CategoryQuery, LocationProvider, ProviderSettings};
use futures::{StreamExt as _, stream};
use serde::{Deserialize, Serialize};

pub use profile::{LocationProfile, profile};

/// Radius of the walking set in miles.
pub const WALKING_RADIUS_MI: f64 = 1.0;

/// Radius of the driving set in miles.
pub const DRIVING_RADIUS_MI: f64 = 5.0;

/// Knobs for one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    /// Walking search and filter radius.
    pub walking_radius_mi: f64,
    /// Driving search and filter radius.
    pub driving_radius_mi: f64,
    /// Maximum searches in flight at once.
    pub concurrent_requests: usize,
    /// Upper bound on a single search, retries included.
    pub fetch_timeout: Duration,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            walking_radius_mi: WALKING_RADIUS_MI,
            driving_radius_mi: DRIVING_RADIUS_MI,
            concurrent_requests: 4,
            fetch_timeout: Duration::from_secs(8),
        }
    }
}

impl AggregateOptions {
    /// Defaults with the concurrency width taken from provider settings.
    #[must_use]
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            concurrent_requests: settings.concurrent_requests.max(1),
            ..Self::default()
        }
    }
}

/// Which radius a search belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Walking radius.
    Walking,
    /// Driving radius.
    Driving,
}

/// Deduplicated amenities within each radius.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmenitySets {
    /// Amenities within the walking radius.
    pub walking: Vec<Amenity>,
    /// Amenities within the driving radius.
    pub driving: Vec<Amenity>,
}

/// Counters from one aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Searches issued (both radii).
    pub searches: usize,
    /// Searches that failed or timed out.
    pub degraded: usize,
    /// Results dropped by the distance filter.
    pub out_of_range: usize,
    /// Results dropped as exact duplicates.
    pub duplicates: usize,
}

/// Fetches and merges amenities around `center`.
pub async fn aggregate(
    provider: &dyn LocationProvider,
    center: Coordinate,
    options: &AggregateOptions,
) -> AmenitySets {
    aggregate_with_stats(provider, center, options).await.0
}

/// Like [`aggregate`], also returning counters for logging and tests.
pub async fn aggregate_with_stats(
    provider: &dyn LocationProvider,
    center: Coordinate,
    options: &AggregateOptions,
) -> (AmenitySets, AggregateStats) {
    let tasks = provider.category_map().tasks();
    let queries: Vec<(Pass, CategoryQuery)> = [
        (Pass::Walking, options.walking_radius_mi),
        (Pass::Driving, options.driving_radius_mi),
    ]
    .into_iter()
    .flat_map(|(pass, radius_mi)| {
        tasks.iter().map(move |task| {
            (
                pass,
                CategoryQuery {
                    center,
                    radius_mi,
                    category: task.category,
                    provider_id: task.provider_id.clone(),
                },
            )
        })
    })
    .collect();

    let mut stats = AggregateStats {
        searches: queries.len(),
        ..AggregateStats::default()
    };

    let fetches: Vec<(Pass, CategoryFetch)> = stream::iter(queries.into_iter().map(
        |(pass, query)| async move { (pass, fetch_with_timeout(provider, &query, options).await) },
    ))
    .buffer_unordered(options.concurrent_requests.max(1))
    .collect()
    .await;

    let mut walking = Vec::new();
    let mut driving = Vec::new();
    for (pass, fetch) in fetches {
        if !fetch.is_ok() {
            stats.degraded += 1;
        }
        match pass {
            Pass::Walking => walking.extend(fetch.into_amenities()),
            Pass::Driving => driving.extend(fetch.into_amenities()),
        }
    }

    let walking = within(walking, options.walking_radius_mi, &mut stats);
    let driving = within(driving, options.driving_radius_mi, &mut stats);
    let walking = dedup(walking, &mut stats);
    let driving = dedup(driving, &mut stats);

    log::info!(
        "Aggregated ({}, {}): {} walking, {} driving, {}/{} searches degraded",
        center.latitude,
        center.longitude,
        walking.len(),
        driving.len(),
        stats.degraded,
        stats.searches,
    );

    (AmenitySets { walking, driving }, stats)
}

async fn fetch_with_timeout(
    provider: &dyn LocationProvider,
    query: &CategoryQuery,
    options: &AggregateOptions,
) -> CategoryFetch {
    let fetch = provider.fetch_category(query);
    match tokio::time::timeout(options.fetch_timeout, fetch).await {
        Ok(fetch) => fetch,
        Err(_) => {
            log::warn!(
                "{} ({}) within {} mi timed out after {:?}",
                query.category,
                query.provider_id,
                query.radius_mi,
                options.fetch_timeout
            );
            CategoryFetch::degraded(query, format!("timed out after {:?}", options.fetch_timeout))
        }
    }
}

/// Keeps amenities no farther than `radius_mi` from the center.
fn within(amenities: Vec<Amenity>, radius_mi: f64, stats: &mut AggregateStats) -> Vec<Amenity> {
    let before = amenities.len();
    let kept: Vec<Amenity> = amenities
        .into_iter()
        .filter(|a| a.distance_mi <= radius_mi)
        .collect();
    stats.out_of_range += before - kept.len();
    kept
}

/// Removes exact (name, category, lat, lng) duplicates; first one wins.
fn dedup(amenities: Vec<Amenity>, stats: &mut AggregateStats) -> Vec<Amenity> {
    let before = amenities.len();
    let mut seen = BTreeSet::new();
    let kept: Vec<Amenity> = amenities
        .into_iter()
        .filter(|a| seen.insert(a.dedup_key()))
        .collect();
    stats.duplicates += before - kept.len();
    kept
}
