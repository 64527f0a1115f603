//! Serving arithmetic.
//!
//! Two operations that must stay separate:
//! * per-serving derivation divides computed totals and never touches ingredients;
//! * rescaling multiplies ingredient amounts to produce a new recipe variant,
//!   which is then re-aggregated.
//!
//! Baseline rescaling of a saved recipe lives on [`crate::recipe::Recipe`].

use crate::error::{MacroError, MacroResult};
use crate::recipe::IngredientLine;
use crate::recipe_aggregator::MacroTotals;

/// Per-serving view of `totals`.
///
/// Accepts fractional serving counts (e.g. half a portion); only the stored
/// recipe record requires a whole number.
pub fn per_serving(totals: &MacroTotals, servings: f64) -> MacroResult<MacroTotals> {
    if !servings.is_finite() || servings <= 0.0 {
        return Err(MacroError::invalid(format!("servings must be positive, got {}", servings)));
    }
    Ok(totals.divided_by(servings).rounded())
}

/// Multiply every amount by `factor`. Ratios between ingredients are
/// preserved exactly; no per-line rounding is applied.
pub fn rescale_lines(lines: &[IngredientLine], factor: f64) -> MacroResult<Vec<IngredientLine>> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(MacroError::invalid(format!("scale factor must be positive, got {}", factor)));
    }
    Ok(lines
        .iter()
        .map(|line| IngredientLine {
            amount: line.amount * factor,
            ..line.clone()
        })
        .collect())
}

/// Convert a user-supplied serving count into the whole number a recipe
/// record requires.
pub fn checked_servings(value: f64) -> MacroResult<u32> {
    if !value.is_finite() || value < 1.0 {
        return Err(MacroError::invalid(format!("servings must be at least 1, got {}", value)));
    }
    if value.fract() != 0.0 {
        return Err(MacroError::invalid(format!(
            "servings must be a whole number, got {}; scale ingredient amounts instead",
            value
        )));
    }
    if value > f64::from(u32::MAX) {
        return Err(MacroError::invalid(format!("servings out of range: {}", value)));
    }
    Ok(value as u32)
}
