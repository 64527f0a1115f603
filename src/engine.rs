use crate::config::{EngineConfig, ValidationMode};
use crate::error::{MacroError, MacroResult};
use crate::lookup::NutritionLookup;
use crate::nutrition::{CustomIngredients, NutrientProfile};
use crate::recipe::{IngredientLine, Recipe};
use crate::recipe_aggregator::{aggregate, RecipeComputationResult, ResolvedEntry, SkippedLine};
use crate::resolver::{IngredientResolver, Resolution};

/// Computes macro breakdowns. Holds configuration only; every call is independent.
#[derive(Debug, Clone, Default)]
pub struct MacroEngine {
    config: EngineConfig,
}

impl MacroEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Resolve and aggregate `lines` for `servings` portions.
    ///
    /// Lookup failures never fail the call: the affected ingredient is listed as
    /// unresolved and left out of the totals. Invalid lines abort the call in
    /// strict mode and are skipped (and reported) in lenient mode.
    pub async fn compute<L: NutritionLookup>(
        &self,
        lines: &[IngredientLine],
        servings: u32,
        custom: &CustomIngredients,
        lookup: &L,
    ) -> MacroResult<RecipeComputationResult> {
        if servings == 0 {
            return Err(MacroError::invalid("servings must be at least 1"));
        }

        let mut resolver = IngredientResolver::new(custom, lookup);
        let mut entries = Vec::with_capacity(lines.len());
        let mut skipped = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            if line.is_blank() {
                continue;
            }

            let density = effective_density(line, custom);
            if let Err(e) = self.validate_line(line, density, custom) {
                match self.config.mode {
                    ValidationMode::Strict => return Err(e.at_line(index, &line.name)),
                    ValidationMode::Lenient => {
                        tracing::warn!(line = index, ingredient = %line.name, error = %e, "skipping invalid ingredient line");
                        skipped.push(SkippedLine {
                            index,
                            name: line.name.trim().to_string(),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                }
            }

            let resolution = resolver.resolve(line).await;
            if let Resolution::Unresolved(reason) = &resolution {
                tracing::warn!(ingredient = %line.name, reason = reason.reason(), "ingredient left out of totals");
            }
            entries.push(ResolvedEntry {
                name: line.name.clone(),
                amount: line.amount,
                unit: line.unit.clone(),
                grams_per_unit: density,
                resolution,
            });
        }

        tracing::debug!(
            lines = lines.len(),
            entries = entries.len(),
            lookups = resolver.lookup_calls(),
            "resolution finished"
        );

        let mut result = aggregate(&entries, &self.config.units, servings)?;
        result.skipped = skipped;
        Ok(result)
    }

    /// Compute a saved recipe at its live serving count, with amounts derived
    /// from the recipe's baseline.
    pub async fn compute_recipe<L: NutritionLookup>(
        &self,
        recipe: &Recipe,
        custom: &CustomIngredients,
        lookup: &L,
    ) -> MacroResult<RecipeComputationResult> {
        self.compute(&recipe.scaled_lines(), recipe.servings, custom, lookup).await
    }

    /// Values the resolver ignores are not checked: a custom entry shadows
    /// whatever profile the line carries.
    fn validate_line(&self, line: &IngredientLine, density: Option<f64>, custom: &CustomIngredients) -> MacroResult<()> {
        self.config.units.grams(line.amount, &line.unit, density)?;
        match custom.get(&line.name) {
            Some(entry) => entry.validate(),
            None => line.profile.as_ref().map_or(Ok(()), NutrientProfile::validate),
        }
    }
}

/// Line-level density beats the custom store's, which beats the unit table.
/// Non-positive line values count as absent.
fn effective_density(line: &IngredientLine, custom: &CustomIngredients) -> Option<f64> {
    line.grams_per_unit
        .filter(|g| g.is_finite() && *g > 0.0)
        .or_else(|| custom.get(&line.name).and_then(|c| c.grams_per_unit_for(&line.unit)))
}
