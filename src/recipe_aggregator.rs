use serde::{Deserialize, Serialize};

use crate::error::{MacroError, MacroResult};
use crate::nutrition::{derive_calories, NutrientProfile};
use crate::recipe::amount_label;
use crate::resolver::{ProfileSource, Resolution, Unresolved};
use crate::units::UnitTable;

/// Absolute nutrient amounts in grams (calories in kcal).
///
/// Used both for full-precision running sums and, after [`MacroTotals::rounded`],
/// for presentation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct MacroTotals {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub net_carbs: f64,
    pub calories: f64,
}

macro_rules! map_fields {
    ($src:expr, |$v:ident| $body:expr) => {{
        let src = $src;
        MacroTotals {
            protein: { let $v = src.protein; $body },
            carbs: { let $v = src.carbs; $body },
            fat: { let $v = src.fat; $body },
            fiber: { let $v = src.fiber; $body },
            net_carbs: { let $v = src.net_carbs; $body },
            calories: { let $v = src.calories; $body },
        }
    }};
}

impl MacroTotals {
    /// Contribution of `grams` of an ingredient with the given profile.
    pub fn for_grams(profile: &NutrientProfile, grams: f64) -> Self {
        let scale = grams / 100.0;
        let protein = profile.protein_per_100g * scale;
        let carbs = profile.carbs_per_100g * scale;
        let fat = profile.fat_per_100g * scale;
        let fiber = profile.fiber_per_100g * scale;
        Self {
            protein,
            carbs,
            fat,
            fiber,
            net_carbs: (carbs - fiber).max(0.0),
            calories: derive_calories(protein, carbs, fat),
        }
    }

    pub fn add(&mut self, other: &MacroTotals) {
        self.protein += other.protein;
        self.carbs += other.carbs;
        self.fat += other.fat;
        self.fiber += other.fiber;
        self.net_carbs += other.net_carbs;
        self.calories += other.calories;
    }

    pub fn divided_by(&self, divisor: f64) -> Self {
        map_fields!(self, |v| v / divisor)
    }

    /// Round every field to two decimals. Only call at presentation boundaries.
    pub fn rounded(&self) -> Self {
        map_fields!(self, |v| round2(v))
    }
}

pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // avoid printing "-0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// An ingredient line paired with its resolution, ready for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub name: String,
    pub amount: f64,
    pub unit: String,
    /// Effective density override (line-level, else custom store).
    pub grams_per_unit: Option<f64>,
    pub resolution: Resolution,
}

impl ResolvedEntry {
    pub fn new(name: &str, amount: f64, unit: &str, profile: NutrientProfile) -> Self {
        Self {
            name: name.to_string(),
            amount,
            unit: unit.to_string(),
            grams_per_unit: None,
            resolution: Resolution::Resolved {
                profile,
                source: ProfileSource::Supplied,
            },
        }
    }

    fn amount_label(&self) -> String {
        amount_label(self.amount, &self.unit)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    Resolved { source: ProfileSource },
    Unresolved { reason: Unresolved },
}

/// One per-ingredient row. Nutrient values are rounded to two decimals;
/// unresolved rows carry zeros and are excluded from totals.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IngredientRow {
    pub name: String,
    pub amount: String,
    pub grams: f64,
    #[serde(flatten)]
    pub nutrients: MacroTotals,
    /// Calories as stated by the data source, for display next to the derived figure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stated_calories: Option<f64>,
    #[serde(flatten)]
    pub status: RowStatus,
}

impl IngredientRow {
    pub fn is_resolved(&self) -> bool {
        matches!(self.status, RowStatus::Resolved { .. })
    }
}

/// A line dropped during validation (lenient mode only).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SkippedLine {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeComputationResult {
    pub per_ingredient: Vec<IngredientRow>,
    pub totals: MacroTotals,
    pub per_serving: MacroTotals,
    pub servings: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedLine>,
}

impl RecipeComputationResult {
    pub fn unresolved(&self) -> impl Iterator<Item = &IngredientRow> {
        self.per_ingredient.iter().filter(|row| !row.is_resolved())
    }
}

/// Aggregate resolved entries into per-ingredient rows, totals and per-serving values.
///
/// Entries with an empty name or zero amount are skipped. Totals are summed at
/// full precision and rounded once.
///
/// # Errors
/// `InvalidInput` when `servings` is zero or an entry's amount/unit cannot be
/// converted to grams.
pub fn aggregate(
    entries: &[ResolvedEntry],
    units: &UnitTable,
    servings: u32,
) -> MacroResult<RecipeComputationResult> {
    if servings == 0 {
        return Err(MacroError::invalid("servings must be at least 1"));
    }

    let mut rows = Vec::with_capacity(entries.len());
    let mut totals = MacroTotals::default();

    for (index, entry) in entries.iter().enumerate() {
        if entry.name.trim().is_empty() || entry.amount == 0.0 {
            continue;
        }

        let grams = units
            .grams(entry.amount, &entry.unit, entry.grams_per_unit)
            .map_err(|e| e.at_line(index, &entry.name))?;

        let row = match &entry.resolution {
            Resolution::Resolved { profile, source } => {
                let contribution = MacroTotals::for_grams(profile, grams);
                totals.add(&contribution);
                IngredientRow {
                    name: entry.name.trim().to_string(),
                    amount: entry.amount_label(),
                    grams: round2(grams),
                    nutrients: contribution.rounded(),
                    stated_calories: profile
                        .stated_calories_per_100g
                        .map(|kcal| round2(kcal * grams / 100.0)),
                    status: RowStatus::Resolved { source: source.clone() },
                }
            }
            Resolution::Unresolved(reason) => IngredientRow {
                name: entry.name.trim().to_string(),
                amount: entry.amount_label(),
                grams: round2(grams),
                nutrients: MacroTotals::default(),
                stated_calories: None,
                status: RowStatus::Unresolved { reason: reason.clone() },
            },
        };
        rows.push(row);
    }

    Ok(RecipeComputationResult {
        per_ingredient: rows,
        totals: totals.rounded(),
        per_serving: totals.divided_by(f64::from(servings)).rounded(),
        servings,
        skipped: Vec::new(),
    })
}
