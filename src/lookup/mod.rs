//! Sources of per-100g nutrient data for ingredients that are neither in the
//! custom store nor filled in by the user.
//!
//! Every source is best-effort. The resolver turns any [`LookupError`] into an
//! unresolved ingredient instead of failing the computation.

pub mod endpoints;
pub mod local_table;
pub mod usda;

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

use crate::nutrition::NutrientProfile;

pub use local_table::LocalNutritionTable;
pub use usda::UsdaClient;

/// Raw answer of a lookup, before validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LookupRecord {
    /// Where the numbers came from, e.g. the matched database description.
    pub source: String,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub calories: Option<f64>,
}

impl LookupRecord {
    /// Validate the record into a profile. Missing macros or negative /
    /// non-finite numbers are reported as [`LookupError::Malformed`].
    pub fn into_profile(self) -> Result<NutrientProfile, LookupError> {
        let require = |field: &str, value: Option<f64>| {
            value.ok_or_else(|| LookupError::Malformed(format!("'{}' has no {} value", self.source, field)))
        };
        let profile = NutrientProfile {
            protein_per_100g: require("protein", self.protein)?,
            carbs_per_100g: require("carbohydrate", self.carbs)?,
            fat_per_100g: require("fat", self.fat)?,
            fiber_per_100g: self.fiber.unwrap_or(0.0),
            stated_calories_per_100g: self.calories,
        };
        profile
            .validate()
            .map_err(|e| LookupError::Malformed(format!("'{}': {}", self.source, e)))?;
        Ok(profile)
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no match for '{0}'")]
    NoMatch(String),
    #[error("rate limited by nutrition source")]
    RateLimited,
    #[error("API key not configured: {0}")]
    MissingApiKey(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("nutrition source returned {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("malformed nutrition data: {0}")]
    Malformed(String),
    #[error("lookups are disabled (offline)")]
    Offline,
}

impl LookupError {
    /// A definitive "this source does not know the ingredient", as opposed to
    /// the source being unreachable or returning garbage.
    pub fn is_no_match(&self) -> bool {
        matches!(self, LookupError::NoMatch(_))
    }
}

/// External nutrition lookup injected into the resolver.
pub trait NutritionLookup {
    fn lookup(&self, name: &str) -> impl Future<Output = Result<LookupRecord, LookupError>>;
}

/// Lookup that never answers. Used when running without network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLookup;

impl NutritionLookup for OfflineLookup {
    async fn lookup(&self, _name: &str) -> Result<LookupRecord, LookupError> {
        Err(LookupError::Offline)
    }
}

/// Ask `primary` first and fall through to `secondary` whenever it fails.
#[derive(Debug, Clone)]
pub struct ChainedLookup<A, B> {
    primary: A,
    secondary: B,
}

impl<A, B> ChainedLookup<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: NutritionLookup, B: NutritionLookup> NutritionLookup for ChainedLookup<A, B> {
    async fn lookup(&self, name: &str) -> Result<LookupRecord, LookupError> {
        match self.primary.lookup(name).await {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::debug!(ingredient = name, error = %e, "primary lookup failed, trying secondary");
                self.secondary.lookup(name).await
            }
        }
    }
}
