use serde::{Deserialize, Serialize};

use crate::error::{MacroError, MacroResult};
use crate::nutrition::NutrientProfile;

/// One ingredient row as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredIngredientLine")]
pub struct IngredientLine {
    pub name: String,
    pub amount: f64,
    pub unit: String,
    /// Line-level density, e.g. "1 slice = 28 g" for this particular bread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grams_per_unit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<NutrientProfile>,
}

/// Accepted on-disk shapes of an ingredient line: a nested `profile`, or
/// per-100g macros written flat on the line (`p`/`c`/`f` in older files).
#[derive(Deserialize)]
struct StoredIngredientLine {
    name: String,
    #[serde(alias = "amt")]
    amount: f64,
    unit: String,
    #[serde(default)]
    grams_per_unit: Option<f64>,
    #[serde(default)]
    profile: Option<NutrientProfile>,
    #[serde(default, alias = "protein")]
    p: Option<f64>,
    #[serde(default, alias = "carbs")]
    c: Option<f64>,
    #[serde(default, alias = "fat")]
    f: Option<f64>,
    #[serde(default)]
    fiber: Option<f64>,
}

impl From<StoredIngredientLine> for IngredientLine {
    fn from(stored: StoredIngredientLine) -> Self {
        let flat = match (stored.p, stored.c, stored.f) {
            (None, None, None) => None,
            (p, c, f) => Some(
                NutrientProfile::new(p.unwrap_or(0.0), c.unwrap_or(0.0), f.unwrap_or(0.0))
                    .with_fiber(stored.fiber.unwrap_or(0.0)),
            ),
        };
        Self {
            name: stored.name,
            amount: stored.amount,
            unit: stored.unit,
            grams_per_unit: stored.grams_per_unit,
            profile: stored.profile.or(flat),
        }
    }
}

impl IngredientLine {
    pub fn new(name: &str, amount: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            amount,
            unit: unit.to_string(),
            grams_per_unit: None,
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: NutrientProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_grams_per_unit(mut self, grams_per_unit: f64) -> Self {
        self.grams_per_unit = Some(grams_per_unit);
        self
    }

    /// Rows with no name or no amount are unfinished form rows, not errors.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() || self.amount == 0.0
    }

    /// "200 g", "1.5 cup"
    pub fn amount_label(&self) -> String {
        amount_label(self.amount, &self.unit)
    }
}

pub fn amount_label(amount: f64, unit: &str) -> String {
    let rounded = (amount * 1000.0).round() / 1000.0;
    if rounded.fract() == 0.0 {
        format!("{:.0} {}", rounded, unit.trim())
    } else {
        format!("{} {}", rounded, unit.trim())
    }
}

fn default_servings() -> u32 {
    1
}

/// A saved recipe.
///
/// `ingredients` always hold the amounts for `base_servings`. Changing the
/// live `servings` never touches them; scaled amounts are derived on demand
/// from the baseline so repeated rescaling cannot drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    #[serde(default = "default_servings")]
    pub servings: u32,
    /// Serving count the ingredient amounts were written for. Defaults to
    /// `servings` when a stored record predates the field.
    #[serde(default)]
    pub base_servings: Option<u32>,
    pub ingredients: Vec<IngredientLine>,
    #[serde(default)]
    pub instructions: String,
}

impl Recipe {
    pub fn new(title: &str, servings: u32, ingredients: Vec<IngredientLine>) -> MacroResult<Self> {
        let servings = check_servings(servings)?;
        Ok(Self {
            title: title.to_string(),
            servings,
            base_servings: Some(servings),
            ingredients,
            instructions: String::new(),
        })
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = instructions.to_string();
        self
    }

    pub fn base_servings(&self) -> u32 {
        self.base_servings.unwrap_or(self.servings).max(1)
    }

    /// Change the live serving count. Ingredient amounts stay at the baseline.
    pub fn set_servings(&mut self, servings: u32) -> MacroResult<()> {
        let servings = check_servings(servings)?;
        if self.base_servings.is_none() {
            self.base_servings = Some(self.servings.max(1));
        }
        self.servings = servings;
        Ok(())
    }

    /// Ingredient lines with amounts for the live serving count:
    /// `base_amount * servings / base_servings`.
    pub fn scaled_lines(&self) -> Vec<IngredientLine> {
        let factor = f64::from(self.servings) / f64::from(self.base_servings());
        self.ingredients
            .iter()
            .map(|line| IngredientLine {
                amount: line.amount * factor,
                ..line.clone()
            })
            .collect()
    }

    /// Copy for the store's duplicate action.
    pub fn duplicate(&self) -> Self {
        Self {
            title: format!("{} (Copy)", self.title),
            ..self.clone()
        }
    }
}

fn check_servings(servings: u32) -> MacroResult<u32> {
    if servings == 0 {
        return Err(MacroError::invalid("servings must be at least 1"));
    }
    Ok(servings)
}
