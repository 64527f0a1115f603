//! Ingredient nutrient resolution.
//!
//! Precedence for each line:
//! 1. the custom-ingredient store (always wins, even over values typed on the line),
//! 2. nutrient values supplied on the line, if any macro is non-zero,
//! 3. the injected [`NutritionLookup`], at most once per distinct name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::lookup::{LookupError, NutritionLookup};
use crate::nutrition::{normalize_name, CustomIngredients, NutrientProfile};
use crate::recipe::IngredientLine;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProfileSource {
    Custom,
    Supplied,
    Lookup(String),
}

/// Why an ingredient has no nutrient profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Unresolved {
    /// No source knows the ingredient.
    UnresolvedIngredient(String),
    /// The lookup errored, timed out, was rate limited or returned bad data.
    LookupUnavailable(String),
}

impl Unresolved {
    pub fn reason(&self) -> &str {
        match self {
            Unresolved::UnresolvedIngredient(reason) | Unresolved::LookupUnavailable(reason) => reason,
        }
    }
}

impl From<&LookupError> for Unresolved {
    fn from(err: &LookupError) -> Self {
        if err.is_no_match() {
            Unresolved::UnresolvedIngredient(err.to_string())
        } else {
            Unresolved::LookupUnavailable(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { profile: NutrientProfile, source: ProfileSource },
    Unresolved(Unresolved),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

type CachedLookup = Result<(NutrientProfile, String), Unresolved>;

/// Resolves the lines of one computation.
///
/// Holds the lookup memo for that computation only; build a fresh resolver
/// per call so nothing leaks between recipes.
pub struct IngredientResolver<'a, L> {
    custom: &'a CustomIngredients,
    lookup: &'a L,
    cache: HashMap<String, CachedLookup>,
    lookup_calls: usize,
}

impl<'a, L: NutritionLookup> IngredientResolver<'a, L> {
    pub fn new(custom: &'a CustomIngredients, lookup: &'a L) -> Self {
        Self {
            custom,
            lookup,
            cache: HashMap::new(),
            lookup_calls: 0,
        }
    }

    /// Number of times the external lookup has actually been called.
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls
    }

    pub async fn resolve(&mut self, line: &IngredientLine) -> Resolution {
        if let Some(custom) = self.custom.get(&line.name) {
            if let Err(e) = custom.validate() {
                tracing::warn!(ingredient = %line.name, error = %e, "ignoring invalid custom ingredient");
                return Resolution::Unresolved(Unresolved::UnresolvedIngredient(format!(
                    "custom ingredient '{}' is invalid: {}",
                    custom.name, e
                )));
            }
            tracing::debug!(ingredient = %line.name, "using custom ingredient profile");
            return Resolution::Resolved {
                profile: custom.profile,
                source: ProfileSource::Custom,
            };
        }

        if let Some(profile) = line.profile.filter(NutrientProfile::has_macros) {
            return Resolution::Resolved {
                profile,
                source: ProfileSource::Supplied,
            };
        }

        match self.lookup_cached(&line.name).await {
            Ok((profile, source)) => Resolution::Resolved {
                profile,
                source: ProfileSource::Lookup(source),
            },
            Err(unresolved) => Resolution::Unresolved(unresolved),
        }
    }

    async fn lookup_cached(&mut self, name: &str) -> CachedLookup {
        let key = normalize_name(name);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(ingredient = name, "lookup cache hit");
            return hit.clone();
        }

        self.lookup_calls += 1;
        let outcome = match self.lookup.lookup(name.trim()).await {
            Ok(record) => {
                let source = record.source.clone();
                record.into_profile().map(|profile| (profile, source)).map_err(|e| {
                    tracing::warn!(ingredient = name, error = %e, "discarding malformed lookup result");
                    Unresolved::from(&e)
                })
            }
            Err(e) => {
                tracing::warn!(ingredient = name, error = %e, "nutrition lookup failed");
                Err(Unresolved::from(&e))
            }
        };

        self.cache.insert(key, outcome.clone());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::{LookupRecord, OfflineLookup};
    use crate::nutrition::CustomIngredient;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLookup {
        calls: AtomicUsize,
    }

    impl NutritionLookup for CountingLookup {
        async fn lookup(&self, name: &str) -> Result<LookupRecord, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match name {
                "rice" | "Rice" => Ok(LookupRecord {
                    source: "rice, white".to_string(),
                    protein: Some(7.0),
                    carbs: Some(80.0),
                    fat: Some(0.6),
                    fiber: Some(1.3),
                    calories: None,
                }),
                "garbage" => Ok(LookupRecord {
                    source: "garbage".to_string(),
                    protein: Some(f64::NAN),
                    ..LookupRecord::default()
                }),
                "throttled" => Err(LookupError::RateLimited),
                _ => Err(LookupError::NoMatch(name.to_string())),
            }
        }
    }

    fn counting() -> CountingLookup {
        CountingLookup { calls: AtomicUsize::new(0) }
    }

    #[tokio::test]
    async fn test_custom_wins_over_supplied_values() {
        let customs: CustomIngredients = vec![
            CustomIngredient::new("Protein Bread", NutrientProfile::new(20.0, 30.0, 5.0)).with_density("slice", 35.0),
        ]
        .into_iter()
        .collect();
        let lookup = counting();
        let mut resolver = IngredientResolver::new(&customs, &lookup);

        let line = IngredientLine::new("protein bread", 2.0, "slice").with_profile(NutrientProfile::new(1.0, 1.0, 1.0));
        let resolution = resolver.resolve(&line).await;

        assert_eq!(
            resolution,
            Resolution::Resolved {
                profile: NutrientProfile::new(20.0, 30.0, 5.0),
                source: ProfileSource::Custom,
            }
        );
        assert_eq!(resolver.lookup_calls(), 0);
    }

    #[tokio::test]
    async fn test_supplied_values_skip_lookup() {
        let customs = CustomIngredients::new();
        let lookup = counting();
        let mut resolver = IngredientResolver::new(&customs, &lookup);

        let line = IngredientLine::new("chicken breast", 200.0, "g").with_profile(NutrientProfile::new(31.0, 0.0, 3.6));
        let resolution = resolver.resolve(&line).await;
        assert!(matches!(resolution, Resolution::Resolved { source: ProfileSource::Supplied, .. }));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_zero_supplied_values_fall_back_to_lookup() {
        let customs = CustomIngredients::new();
        let lookup = counting();
        let mut resolver = IngredientResolver::new(&customs, &lookup);

        let line = IngredientLine::new("rice", 1.0, "cup").with_profile(NutrientProfile::default());
        let resolution = resolver.resolve(&line).await;
        match resolution {
            Resolution::Resolved { profile, source, .. } => {
                assert_eq!(profile.carbs_per_100g, 80.0);
                assert_eq!(source, ProfileSource::Lookup("rice, white".to_string()));
            }
            other => panic!("expected resolved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_memoized_per_name() {
        let customs = CustomIngredients::new();
        let lookup = counting();
        let mut resolver = IngredientResolver::new(&customs, &lookup);

        resolver.resolve(&IngredientLine::new("rice", 1.0, "cup")).await;
        resolver.resolve(&IngredientLine::new(" Rice ", 2.0, "g")).await;
        resolver.resolve(&IngredientLine::new("kale", 2.0, "g")).await;
        resolver.resolve(&IngredientLine::new("KALE", 2.0, "g")).await;

        assert_eq!(resolver.lookup_calls(), 2);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_map_to_unresolved_kinds() {
        let customs = CustomIngredients::new();
        let lookup = counting();
        let mut resolver = IngredientResolver::new(&customs, &lookup);

        let no_match = resolver.resolve(&IngredientLine::new("kale", 1.0, "g")).await;
        assert!(matches!(no_match, Resolution::Unresolved(Unresolved::UnresolvedIngredient(_))));

        let throttled = resolver.resolve(&IngredientLine::new("throttled", 1.0, "g")).await;
        assert!(matches!(throttled, Resolution::Unresolved(Unresolved::LookupUnavailable(_))));

        let garbage = resolver.resolve(&IngredientLine::new("garbage", 1.0, "g")).await;
        match garbage {
            Resolution::Unresolved(Unresolved::LookupUnavailable(reason)) => assert!(reason.contains("malformed")),
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_offline_lookup_is_unavailable() {
        let customs = CustomIngredients::new();
        let mut resolver = IngredientResolver::new(&customs, &OfflineLookup);
        let resolution = resolver.resolve(&IngredientLine::new("eggs", 2.0, "piece")).await;
        assert!(!resolution.is_resolved());
        assert!(matches!(resolution, Resolution::Unresolved(Unresolved::LookupUnavailable(_))));
    }

    #[tokio::test]
    async fn test_invalid_custom_entry_is_not_used() {
        let customs: CustomIngredients = vec![CustomIngredient::new("bad", NutrientProfile::new(-50.0, 10.0, -5.0))]
            .into_iter()
            .collect();
        let lookup = counting();
        let mut resolver = IngredientResolver::new(&customs, &lookup);

        let line = IngredientLine::new("bad", 100.0, "g").with_profile(NutrientProfile::new(5.0, 5.0, 5.0));
        match resolver.resolve(&line).await {
            Resolution::Unresolved(Unresolved::UnresolvedIngredient(reason)) => assert!(reason.contains("invalid")),
            other => panic!("expected unresolved, got {:?}", other),
        }
        assert_eq!(resolver.lookup_calls(), 0);
    }
}
