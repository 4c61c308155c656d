//! Internal category to provider category id mapping.
//!
//! The mapping is one-to-many: `transit` searches bus stops, stations and
//! rail separately. [`CategoryMap::tasks`] flattens it once into the list
//! of searches to run, each tagged with its single internal category.

use std::collections::BTreeSet;

use amenity_map_amenity_models::Category;
use serde::Deserialize;

use crate::ProviderError;

const MAPBOX_CATEGORIES_TOML: &str = include_str!("../categories/mapbox.toml");

/// Provider ids searched for one internal category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryEntry {
    /// Internal category.
    pub category: Category,
    /// Provider category identifiers.
    pub ids: Vec<String>,
}

/// One search to run: a provider id tagged with its internal category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTask {
    /// Internal category results are tagged with.
    pub category: Category,
    /// Provider category identifier.
    pub provider_id: String,
}

/// Ordered mapping of internal categories to provider ids.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryMap {
    categories: Vec<CategoryEntry>,
}

impl CategoryMap {
    /// The Mapbox mapping embedded in the crate.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the embedded TOML is malformed.
    pub fn bundled() -> Result<Self, ProviderError> {
        Self::from_toml_str(MAPBOX_CATEGORIES_TOML)
    }

    /// Parses a mapping from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if the TOML is malformed, a category
    /// appears twice, or a category lists no ids.
    pub fn from_toml_str(s: &str) -> Result<Self, ProviderError> {
        let map: Self = toml::de::from_str(s).map_err(|e| ProviderError::Config {
            message: format!("Failed to parse category map: {e}"),
        })?;
        Self::new(map.categories)
    }

    /// Builds a mapping from entries.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] if a category appears twice or
    /// lists no ids.
    pub fn new(categories: Vec<CategoryEntry>) -> Result<Self, ProviderError> {
        let mut seen = BTreeSet::new();
        for entry in &categories {
            if !seen.insert(entry.category) {
                return Err(ProviderError::Config {
                    message: format!("Duplicate category mapping: {}", entry.category),
                });
            }
            if entry.ids.is_empty() || entry.ids.iter().any(|id| id.trim().is_empty()) {
                return Err(ProviderError::Config {
                    message: format!("Category {} has an empty provider id", entry.category),
                });
            }
        }
        Ok(Self { categories })
    }

    /// Entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[CategoryEntry] {
        &self.categories
    }

    /// Provider ids for `category`, empty when unmapped.
    #[must_use]
    pub fn ids_for(&self, category: Category) -> &[String] {
        self.categories
            .iter()
            .find(|e| e.category == category)
            .map(|e| e.ids.as_slice())
            .unwrap_or_default()
    }

    /// Flattens the mapping into one task per (category, provider id).
    #[must_use]
    pub fn tasks(&self) -> Vec<CategoryTask> {
        self.categories
            .iter()
            .flat_map(|entry| {
                entry.ids.iter().map(|id| CategoryTask {
                    category: entry.category,
                    provider_id: id.clone(),
                })
            })
            .collect()
    }
}
