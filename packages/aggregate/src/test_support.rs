//! In-memory [`LocationProvider`] for tests.
//!
//! [`StubProvider`] answers category searches from canned results keyed by
//! provider id, records what it was asked, and can be told to fail, stall
//! or add latency per id.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use amenity_map_amenity_models::{Amenity, GeoResult};
use amenity_map_geo::{Coordinate, EARTH_RADIUS_MI};
use amenity_map_provider::{
    CategoryFetch, CategoryMap, CategoryQuery, LocationProvider, fallback_address,
};
use async_trait::async_trait;

/// The test center used throughout the suite.
///
/// # Panics
///
/// Never; the literal is in range.
#[must_use]
pub fn center() -> Coordinate {
    Coordinate::new(40.0, -74.0).expect("valid test center")
}

/// A point `miles` due north of `from`, so its haversine distance from
/// `from` is exactly `miles` up to float error.
///
/// # Panics
///
/// Panics if the result leaves the valid latitude range.
#[must_use]
pub fn north_of(from: Coordinate, miles: f64) -> Coordinate {
    let degrees = (miles / EARTH_RADIUS_MI).to_degrees();
    Coordinate::new(from.latitude + degrees, from.longitude).expect("latitude in range")
}

/// Canned provider.
pub struct StubProvider {
    categories: CategoryMap,
    results: BTreeMap<String, Vec<(String, Coordinate)>>,
    failing: BTreeSet<String>,
    slow: BTreeMap<String, Duration>,
    latency: Duration,
    geocode_results: Vec<GeoResult>,
    address: Option<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    radii: Mutex<Vec<(String, f64)>>,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StubProvider {
    /// A provider using the bundled category map and returning nothing.
    ///
    /// # Panics
    ///
    /// Panics if the bundled category map is malformed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            categories: CategoryMap::bundled().expect("bundled category map"),
            results: BTreeMap::new(),
            failing: BTreeSet::new(),
            slow: BTreeMap::new(),
            latency: Duration::ZERO,
            geocode_results: Vec::new(),
            address: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            radii: Mutex::new(Vec::new()),
        }
    }

    /// Adds a result returned for searches of `provider_id`, whatever the
    /// radius.
    #[must_use]
    pub fn with_result(mut self, provider_id: &str, name: &str, at: Coordinate) -> Self {
        self.results
            .entry(provider_id.to_string())
            .or_default()
            .push((name.to_string(), at));
        self
    }

    /// Makes searches of `provider_id` fail.
    #[must_use]
    pub fn failing(mut self, provider_id: &str) -> Self {
        self.failing.insert(provider_id.to_string());
        self
    }

    /// Makes searches of `provider_id` take `delay`.
    #[must_use]
    pub fn slow(mut self, provider_id: &str, delay: Duration) -> Self {
        self.slow.insert(provider_id.to_string(), delay);
        self
    }

    /// Adds `latency` to every search.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sets the forward geocoding answer.
    #[must_use]
    pub fn with_geocode_results(mut self, results: Vec<GeoResult>) -> Self {
        self.geocode_results = results;
        self
    }

    /// Sets the reverse geocoding answer.
    #[must_use]
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Searches per radius the category map expands to.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.categories.tasks().len()
    }

    /// Searches received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of searches observed running at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Searches currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Radii `provider_id` was searched with.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn radii_for(&self, provider_id: &str) -> Vec<f64> {
        self.radii
            .lock()
            .expect("radii mutex poisoned")
            .iter()
            .filter(|(id, _)| id == provider_id)
            .map(|(_, r)| *r)
            .collect()
    }
}

/// Releases an in-flight slot when a search finishes or is cancelled.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocationProvider for StubProvider {
    fn category_map(&self) -> &CategoryMap {
        &self.categories
    }

    async fn fetch_category(&self, query: &CategoryQuery) -> CategoryFetch {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.radii
            .lock()
            .expect("radii mutex poisoned")
            .push((query.provider_id.clone(), query.radius_mi));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlightGuard(&self.in_flight);

        let delay = self.latency + self.slow.get(&query.provider_id).copied().unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        drop(guard);

        if self.failing.contains(&query.provider_id) {
            return CategoryFetch::degraded(query, "Provider returned status 503");
        }

        let amenities = self
            .results
            .get(&query.provider_id)
            .map(|found| {
                found
                    .iter()
                    .map(|(name, at)| {
                        Amenity::located(name.as_str(), query.category, *at, query.center)
                    })
                    .collect()
            })
            .unwrap_or_default();
        CategoryFetch::ok(query, amenities)
    }

    async fn forward_geocode(&self, _query: &str) -> Vec<GeoResult> {
        self.geocode_results.clone()
    }

    async fn reverse_geocode(&self, at: Coordinate) -> String {
        self.address.clone().unwrap_or_else(|| fallback_address(at))
    }
}
