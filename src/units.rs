//! Kitchen unit to gram conversion.
//!
//! Volume units are treated as water-dense (1 ml = 1 g) unless an ingredient
//! carries its own grams-per-unit figure. Count units (slice, piece, clove, ...)
//! use one canonical average weight each.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{MacroError, MacroResult};

/// Factor used for any unit the table does not know: the amount is taken as grams.
pub const DEFAULT_GRAMS_PER_UNIT: f64 = 1.0;

const GRAMS_PER_OZ: f64 = 28.35;
const GRAMS_PER_LB: f64 = 453.6;
const GRAMS_PER_KG: f64 = 1000.0;
const ML_PER_CUP: f64 = 240.0;
const ML_PER_TBSP: f64 = 15.0;
const ML_PER_TSP: f64 = 5.0;

/// Canonical unit symbols offered to users, with grams per unit.
pub const CANONICAL_UNITS: &[(&str, f64)] = &[
    ("g", 1.0),
    ("oz", GRAMS_PER_OZ),
    ("ml", 1.0),
    ("cup", ML_PER_CUP),
    ("tbsp", ML_PER_TBSP),
    ("tsp", ML_PER_TSP),
    ("slice", 28.0),
    ("piece", 50.0),
    ("clove", 5.0),
    ("leaf", 1.0),
    ("pinch", 0.3),
    ("sprig", 1.0),
    ("bunch", 50.0),
];

// Spellings accepted in addition to the canonical symbols.
const ALIASES: &[(&str, &str)] = &[
    ("gram", "g"),
    ("grams", "g"),
    ("gr", "g"),
    ("ounce", "oz"),
    ("ounces", "oz"),
    ("milliliter", "ml"),
    ("milliliters", "ml"),
    ("millilitre", "ml"),
    ("cups", "cup"),
    ("tablespoon", "tbsp"),
    ("tablespoons", "tbsp"),
    ("teaspoon", "tsp"),
    ("teaspoons", "tsp"),
    ("slices", "slice"),
    ("pieces", "piece"),
    ("pc", "piece"),
    ("cloves", "clove"),
    ("leaves", "leaf"),
    ("pinches", "pinch"),
    ("sprigs", "sprig"),
    ("bunches", "bunch"),
];

/// Grams-per-unit lookup table.
///
/// Symbols are matched case-insensitively after trimming. Lookups never
/// mutate the table; extending it produces a new value via [`UnitTable::with_factor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTable {
    factors: HashMap<String, f64>,
}

impl Default for UnitTable {
    fn default() -> Self {
        let mut factors: HashMap<String, f64> = CANONICAL_UNITS
            .iter()
            .map(|(unit, grams)| (unit.to_string(), *grams))
            .collect();

        factors.insert("kg".to_string(), GRAMS_PER_KG);
        factors.insert("lb".to_string(), GRAMS_PER_LB);
        factors.insert("l".to_string(), 1000.0);

        for (alias, canonical) in ALIASES {
            if let Some(grams) = factors.get(*canonical).copied() {
                factors.insert(alias.to_string(), grams);
            }
        }

        Self { factors }
    }
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy of this table with `unit` mapped to `grams_per_unit`.
    pub fn with_factor(mut self, unit: &str, grams_per_unit: f64) -> MacroResult<Self> {
        let key = normalize_unit(unit);
        if !is_well_formed(&key) {
            return Err(MacroError::invalid(format!("malformed unit '{}'", unit)));
        }
        if !(grams_per_unit.is_finite() && grams_per_unit > 0.0) {
            return Err(MacroError::invalid(format!(
                "grams per unit for '{}' must be a positive number, got {}",
                unit, grams_per_unit
            )));
        }
        self.factors.insert(key, grams_per_unit);
        Ok(self)
    }

    /// Grams per one `unit`, if the table knows it.
    pub fn factor(&self, unit: &str) -> Option<f64> {
        self.factors.get(&normalize_unit(unit)).copied()
    }

    pub fn is_known(&self, unit: &str) -> bool {
        self.factor(unit).is_some()
    }

    /// Convert `amount` of `unit` to grams.
    ///
    /// A positive `override_grams_per_unit` wins over the table. Unknown units
    /// fall back to [`DEFAULT_GRAMS_PER_UNIT`]. Negative or non-finite amounts
    /// and malformed unit strings (without an override) are rejected.
    pub fn grams(
        &self,
        amount: f64,
        unit: &str,
        override_grams_per_unit: Option<f64>,
    ) -> MacroResult<f64> {
        if !amount.is_finite() {
            return Err(MacroError::invalid(format!("amount must be a finite number, got {}", amount)));
        }
        if amount < 0.0 {
            return Err(MacroError::invalid(format!("amount must not be negative, got {}", amount)));
        }

        if let Some(grams_per_unit) = override_grams_per_unit.filter(|g| g.is_finite() && *g > 0.0) {
            return Ok(amount * grams_per_unit);
        }

        let key = normalize_unit(unit);
        if !is_well_formed(&key) {
            return Err(MacroError::invalid(format!("malformed unit '{}'", unit)));
        }

        let grams_per_unit = self.factors.get(&key).copied().unwrap_or(DEFAULT_GRAMS_PER_UNIT);
        Ok(amount * grams_per_unit)
    }
}

pub fn normalize_unit(unit: &str) -> String {
    unit.trim().to_lowercase()
}

/// A unit symbol is usable when it is non-empty and made of letters,
/// spaces, dots and hyphens ("fl. oz", "half-cup").
fn is_well_formed(normalized: &str) -> bool {
    !normalized.is_empty()
        && normalized
            .chars()
            .all(|c| c.is_alphabetic() || c == ' ' || c == '.' || c == '-')
}
