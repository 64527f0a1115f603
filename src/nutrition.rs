use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{MacroError, MacroResult};

// Atwater factors, kcal per gram.
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Calories derived from macro grams. Stated calorie figures are never used
/// in place of this.
pub fn derive_calories(protein_g: f64, carbs_g: f64, fat_g: f64) -> f64 {
    KCAL_PER_G_PROTEIN * protein_g + KCAL_PER_G_CARBS * carbs_g + KCAL_PER_G_FAT * fat_g
}

/// Nutrient density of an ingredient, per 100 g.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientProfile {
    #[serde(alias = "protein")]
    pub protein_per_100g: f64,
    #[serde(alias = "carbs")]
    pub carbs_per_100g: f64,
    #[serde(alias = "fat")]
    pub fat_per_100g: f64,
    #[serde(default, alias = "fiber")]
    pub fiber_per_100g: f64,
    /// Calories as stated by the data source; display only.
    #[serde(default, alias = "calories", skip_serializing_if = "Option::is_none")]
    pub stated_calories_per_100g: Option<f64>,
}

impl NutrientProfile {
    pub fn new(protein_per_100g: f64, carbs_per_100g: f64, fat_per_100g: f64) -> Self {
        Self {
            protein_per_100g,
            carbs_per_100g,
            fat_per_100g,
            ..Default::default()
        }
    }

    pub fn with_fiber(mut self, fiber_per_100g: f64) -> Self {
        self.fiber_per_100g = fiber_per_100g;
        self
    }

    pub fn with_stated_calories(mut self, calories_per_100g: f64) -> Self {
        self.stated_calories_per_100g = Some(calories_per_100g);
        self
    }

    /// True when at least one macro carries a value. An all-zero profile is
    /// what an untouched form row looks like, so it does not count as supplied.
    pub fn has_macros(&self) -> bool {
        self.protein_per_100g > 0.0 || self.carbs_per_100g > 0.0 || self.fat_per_100g > 0.0
    }

    pub fn calories_per_100g(&self) -> f64 {
        derive_calories(self.protein_per_100g, self.carbs_per_100g, self.fat_per_100g)
    }

    /// Check every field is a finite, non-negative number.
    pub fn validate(&self) -> MacroResult<()> {
        let fields = [
            ("protein", self.protein_per_100g),
            ("carbs", self.carbs_per_100g),
            ("fat", self.fat_per_100g),
            ("fiber", self.fiber_per_100g),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(MacroError::invalid(format!(
                    "{} per 100g must be a non-negative number, got {}",
                    field, value
                )));
            }
        }
        if let Some(kcal) = self.stated_calories_per_100g {
            if !kcal.is_finite() || kcal < 0.0 {
                return Err(MacroError::invalid(format!(
                    "stated calories per 100g must be a non-negative number, got {}",
                    kcal
                )));
            }
        }
        Ok(())
    }
}

/// A user-defined ingredient that overrides any external lookup for its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomIngredient {
    pub name: String,
    /// Unit the density override applies to. `None` means any unit.
    #[serde(default, alias = "unit", skip_serializing_if = "Option::is_none")]
    pub unit_override: Option<String>,
    #[serde(default, alias = "grams_per_unit", skip_serializing_if = "Option::is_none")]
    pub grams_per_unit_override: Option<f64>,
    #[serde(flatten)]
    pub profile: NutrientProfile,
}

impl CustomIngredient {
    pub fn new(name: &str, profile: NutrientProfile) -> Self {
        Self {
            name: name.trim().to_string(),
            unit_override: None,
            grams_per_unit_override: None,
            profile,
        }
    }

    pub fn with_density(mut self, unit: &str, grams_per_unit: f64) -> Self {
        self.unit_override = Some(unit.trim().to_string());
        self.grams_per_unit_override = Some(grams_per_unit);
        self
    }

    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }

    /// Density override for a line measured in `unit`, if this ingredient defines one.
    pub fn grams_per_unit_for(&self, unit: &str) -> Option<f64> {
        let grams = self.grams_per_unit_override.filter(|g| g.is_finite() && *g > 0.0)?;
        match &self.unit_override {
            Some(own_unit) if !own_unit.trim().eq_ignore_ascii_case(unit.trim()) => None,
            _ => Some(grams),
        }
    }

    pub fn validate(&self) -> MacroResult<()> {
        if self.key().is_empty() {
            return Err(MacroError::invalid("custom ingredient name must not be empty"));
        }
        if let Some(grams) = self.grams_per_unit_override {
            if !grams.is_finite() || grams <= 0.0 {
                return Err(MacroError::invalid(format!(
                    "grams per unit for '{}' must be positive, got {}",
                    self.name, grams
                )));
            }
        }
        self.profile.validate()
    }
}

/// Read-only view of the custom-ingredient store, keyed by lowercased name.
#[derive(Debug, Clone, Default)]
pub struct CustomIngredients {
    by_name: HashMap<String, CustomIngredient>,
}

impl CustomIngredients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&CustomIngredient> {
        self.by_name.get(&normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl FromIterator<CustomIngredient> for CustomIngredients {
    /// Later entries with the same name replace earlier ones.
    fn from_iter<I: IntoIterator<Item = CustomIngredient>>(iter: I) -> Self {
        let by_name = iter.into_iter().map(|ingredient| (ingredient.key(), ingredient)).collect();
        Self { by_name }
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_calories_use_atwater_factors() {
        let profile = NutrientProfile::new(31.0, 0.0, 3.6).with_stated_calories(165.0);
        assert!((profile.calories_per_100g() - 156.4).abs() < 1e-9);
    }

    #[test]
    fn test_has_macros() {
        assert!(!NutrientProfile::default().has_macros());
        assert!(!NutrientProfile::default().with_fiber(3.0).has_macros());
        assert!(NutrientProfile::new(0.0, 0.1, 0.0).has_macros());
    }

    #[test]
    fn test_validate_rejects_negative_and_nan() {
        assert!(NutrientProfile::new(-1.0, 0.0, 0.0).validate().is_err());
        assert!(NutrientProfile::new(1.0, f64::NAN, 0.0).validate().is_err());
        assert!(NutrientProfile::new(1.0, 1.0, 1.0).with_stated_calories(-5.0).validate().is_err());
        assert!(NutrientProfile::new(1.0, 1.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_custom_density_respects_unit() {
        let bread = CustomIngredient::new("Sourdough", NutrientProfile::new(9.0, 51.0, 1.0))
            .with_density("slice", 40.0);
        assert_eq!(bread.grams_per_unit_for("Slice"), Some(40.0));
        assert_eq!(bread.grams_per_unit_for("g"), None);

        let mut any_unit = bread.clone();
        any_unit.unit_override = None;
        assert_eq!(any_unit.grams_per_unit_for("piece"), Some(40.0));
    }

    #[test]
    fn test_custom_map_is_keyed_by_lowercased_name() {
        let customs: CustomIngredients = vec![
            CustomIngredient::new("Protein Bread", NutrientProfile::new(20.0, 30.0, 5.0)),
            CustomIngredient::new("protein bread ", NutrientProfile::new(22.0, 28.0, 4.0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(customs.len(), 1);
        let hit = customs.get("  PROTEIN BREAD").unwrap();
        assert_eq!(hit.profile.protein_per_100g, 22.0);
    }

    #[test]
    fn test_custom_ingredient_json_shape() {
        let json = r#"{"name":"Tortilla","unit":"piece","grams_per_unit":45,"protein":8,"carbs":48,"fat":7,"calories":290}"#;
        let parsed: CustomIngredient = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.unit_override.as_deref(), Some("piece"));
        assert_eq!(parsed.grams_per_unit_override, Some(45.0));
        assert_eq!(parsed.profile.carbs_per_100g, 48.0);
        assert_eq!(parsed.profile.fiber_per_100g, 0.0);
        assert_eq!(parsed.profile.stated_calories_per_100g, Some(290.0));
    }
}
