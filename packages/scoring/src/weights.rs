//! Category weight tables.
//!
//! A [`WeightTable`] lists, per category, the ideal walking-radius count and
//! the points the category contributes at full coverage. The canonical table
//! sums to 100; alternate tables may be built for tests or loaded from TOML.

use std::collections::BTreeSet;

use amenity_map_amenity_models::Category;
use serde::{Deserialize, Serialize};

use crate::ScoringError;

/// Scoring parameters for one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeight {
    /// Category scored.
    pub category: Category,
    /// Count within walking radius considered fully sufficient.
    pub ideal: u32,
    /// Points contributed at full coverage.
    pub weight: f64,
}

const fn entry(category: Category, ideal: u32, weight: f64) -> CategoryWeight {
    CategoryWeight {
        category,
        ideal,
        weight,
    }
}

const CANONICAL: [CategoryWeight; 13] = [
    entry(Category::Grocery, 2, 15.0),
    entry(Category::Restaurant, 4, 12.0),
    entry(Category::Cafe, 2, 8.0),
    entry(Category::Transit, 3, 15.0),
    entry(Category::Park, 2, 8.0),
    entry(Category::School, 1, 6.0),
    entry(Category::Pharmacy, 1, 6.0),
    entry(Category::Shopping, 2, 6.0),
    entry(Category::Gym, 1, 5.0),
    entry(Category::Bank, 1, 5.0),
    entry(Category::Entertainment, 1, 4.0),
    entry(Category::Medical, 1, 5.0),
    entry(Category::Bar, 2, 5.0),
];

/// Immutable per-category weights and ideals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    weights: Vec<CategoryWeight>,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::canonical()
    }
}

impl WeightTable {
    /// The canonical 13-category table.
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            weights: CANONICAL.to_vec(),
        }
    }

    /// Builds a table from entries.
    ///
    /// Weights are not required to sum to 100; scores are clamped instead.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidWeights`] if a category repeats, an
    /// ideal is zero, or a weight is negative or non-finite.
    pub fn new(weights: Vec<CategoryWeight>) -> Result<Self, ScoringError> {
        let mut seen = BTreeSet::new();
        for w in &weights {
            if !seen.insert(w.category) {
                return Err(ScoringError::InvalidWeights {
                    message: format!("duplicate category {}", w.category),
                });
            }
            if w.ideal == 0 {
                return Err(ScoringError::InvalidWeights {
                    message: format!("{} has an ideal count of zero", w.category),
                });
            }
            if !w.weight.is_finite() || w.weight < 0.0 {
                return Err(ScoringError::InvalidWeights {
                    message: format!("{} has invalid weight {}", w.category, w.weight),
                });
            }
        }
        Ok(Self { weights })
    }

    /// Parses a table from TOML `[[weights]]` entries.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError`] if the TOML is malformed or fails
    /// validation.
    pub fn from_toml_str(s: &str) -> Result<Self, ScoringError> {
        let table: Self = toml::de::from_str(s).map_err(|e| ScoringError::InvalidWeights {
            message: format!("failed to parse weight table: {e}"),
        })?;
        Self::new(table.weights)
    }

    /// Entries in table order.
    #[must_use]
    pub fn entries(&self) -> &[CategoryWeight] {
        &self.weights
    }

    /// Entry for `category`, if it is scored.
    #[must_use]
    pub fn get(&self, category: Category) -> Option<&CategoryWeight> {
        self.weights.iter().find(|w| w.category == category)
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().map(|w| w.weight).sum()
    }
}
