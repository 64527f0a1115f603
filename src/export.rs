use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::recipe_aggregator::{MacroTotals, RecipeComputationResult, RowStatus};

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    ingredient: &'a str,
    amount: &'a str,
    grams: Option<f64>,
    protein: f64,
    carbs: f64,
    fat: f64,
    fiber: f64,
    net_carbs: f64,
    calories: f64,
    note: String,
}

impl<'a> ExportRow<'a> {
    fn summary(label: &'a str, amount: &'a str, totals: &MacroTotals) -> Self {
        Self {
            ingredient: label,
            amount,
            grams: None,
            protein: totals.protein,
            carbs: totals.carbs,
            fat: totals.fat,
            fiber: totals.fiber,
            net_carbs: totals.net_carbs,
            calories: totals.calories,
            note: String::new(),
        }
    }
}

/// Write one row per ingredient, then a `TOTAL` and a `PER SERVING` row.
pub fn write_result_csv<W: Write>(result: &RecipeComputationResult, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for row in &result.per_ingredient {
        let note = match &row.status {
            RowStatus::Resolved { .. } => row
                .stated_calories
                .map(|kcal| format!("source states {} kcal", kcal))
                .unwrap_or_default(),
            RowStatus::Unresolved { reason } => format!("not counted: {}", reason.reason()),
        };
        wtr.serialize(ExportRow {
            ingredient: &row.name,
            amount: &row.amount,
            grams: Some(row.grams),
            protein: row.nutrients.protein,
            carbs: row.nutrients.carbs,
            fat: row.nutrients.fat,
            fiber: row.nutrients.fiber,
            net_carbs: row.nutrients.net_carbs,
            calories: row.nutrients.calories,
            note,
        })?;
    }

    let servings_label = format!("1 of {}", result.servings);
    wtr.serialize(ExportRow::summary("TOTAL", "", &result.totals))?;
    wtr.serialize(ExportRow::summary("PER SERVING", &servings_label, &result.per_serving))?;
    wtr.flush()?;
    Ok(())
}

pub fn export_result_csv(result: &RecipeComputationResult, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("Failed to create export file {:?}", path))?;
    write_result_csv(result, file).with_context(|| format!("Failed to write export file {:?}", path))
}
