#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Amenity category taxonomy and point-of-interest types.
//!
//! This crate defines the closed set of amenity categories used across the
//! amenity-map system. Provider results are normalized into [`Amenity`]
//! values tagged with one of these categories, regardless of which
//! provider-specific category identifier produced them.

use amenity_map_geo::Coordinate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Amenity categories searched around a location.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    /// Supermarkets and grocery stores
    Grocery,
    /// Restaurants
    Restaurant,
    /// Cafes and coffee shops
    Cafe,
    /// Bus stops, stations and rail
    Transit,
    /// Parks
    Park,
    /// Schools
    School,
    /// Pharmacies
    Pharmacy,
    /// General shopping
    Shopping,
    /// Gyms and fitness centers
    Gym,
    /// Banks and ATMs
    Bank,
    /// Cinemas and theatres
    Entertainment,
    /// Hospitals and clinics
    Medical,
    /// Bars and nightlife
    Bar,
}

impl Category {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Grocery,
            Self::Restaurant,
            Self::Cafe,
            Self::Transit,
            Self::Park,
            Self::School,
            Self::Pharmacy,
            Self::Shopping,
            Self::Gym,
            Self::Bank,
            Self::Entertainment,
            Self::Medical,
            Self::Bar,
        ]
    }

    /// Human-readable label for listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Grocery => "Grocery",
            Self::Restaurant => "Restaurants",
            Self::Cafe => "Cafes & Coffee",
            Self::Transit => "Transit",
            Self::Park => "Parks",
            Self::School => "Schools",
            Self::Pharmacy => "Pharmacy",
            Self::Shopping => "Shopping",
            Self::Gym => "Gyms",
            Self::Bank => "Banks & ATMs",
            Self::Entertainment => "Entertainment",
            Self::Medical => "Medical",
            Self::Bar => "Bars & Nightlife",
        }
    }
}

/// A named, categorized point of interest near a query center.
///
/// `distance_mi` is always computed from the query center, never taken from
/// the provider, and is rounded to two decimal places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    /// Display name ("Unknown" when the provider omits one).
    pub name: String,
    /// Internal category the amenity was searched under.
    pub category: Category,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Distance from the query center in miles.
    pub distance_mi: f64,
}

impl Amenity {
    /// Builds an amenity at `position`, measuring its distance from
    /// `center`.
    #[must_use]
    pub fn located(
        name: impl Into<String>,
        category: Category,
        position: Coordinate,
        center: Coordinate,
    ) -> Self {
        let distance = amenity_map_geo::distance(center, position);
        Self {
            name: name.into(),
            category,
            lat: position.latitude,
            lng: position.longitude,
            distance_mi: amenity_map_geo::round_to(distance, 2),
        }
    }

    /// Exact identity used for deduplication: name, category and the bit
    /// patterns of both coordinates.
    #[must_use]
    pub fn dedup_key(&self) -> (String, Category, u64, u64) {
        (
            self.name.clone(),
            self.category,
            self.lat.to_bits(),
            self.lng.to_bits(),
        )
    }
}

/// A forward-geocoding match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResult {
    /// Full address or place name.
    pub place_name: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}
