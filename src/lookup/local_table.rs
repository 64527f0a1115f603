use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;

use super::{LookupError, LookupRecord, NutritionLookup};
use crate::nutrition::normalize_name;

// Expected column headers
const NAME_COL: &str = "Name";
const PROTEIN_COL: &str = "Protein (g/100g)";
const CARB_COL: &str = "Carbohydrate (g/100g)";
const FAT_COL: &str = "Fat (g/100g)";
const FIBER_COL: &str = "Fiber (g/100g)";
const KCAL_COL: &str = "kcal/100g";

fn parse_optional_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

/// Nutrition lookup backed by a local CSV file, matched on exact
/// (case-insensitive) ingredient name.
#[derive(Debug, Clone, Default)]
pub struct LocalNutritionTable {
    items: HashMap<String, LookupRecord>,
}

impl LocalNutritionTable {
    pub fn from_records(records: impl IntoIterator<Item = (String, LookupRecord)>) -> Self {
        let items = records
            .into_iter()
            .map(|(name, record)| (normalize_name(&name), record))
            .collect();
        Self { items }
    }

    pub fn load(csv_path: &Path) -> Result<Self> {
        if !csv_path.exists() {
            return Err(anyhow::anyhow!("Nutrition CSV file not found at: {:?}", csv_path));
        }

        let file = std::fs::File::open(csv_path)
            .with_context(|| format!("Failed to open nutrition CSV file at {:?}", csv_path))?;
        let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::Headers).from_reader(file);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);
        let required = |name: &str| column(name).ok_or_else(|| anyhow::anyhow!("Column '{}' not found", name));

        let name_idx = required(NAME_COL)?;
        let protein_idx = required(PROTEIN_COL)?;
        let carb_idx = required(CARB_COL)?;
        let fat_idx = required(FAT_COL)?;
        let fiber_idx = column(FIBER_COL);
        let kcal_idx = column(KCAL_COL);

        let mut items = HashMap::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read record at row index {}", row_index))?;

            let name = record.get(name_idx).unwrap_or_default().trim().to_string();
            if name.is_empty() {
                continue;
            }

            let value = |idx: Option<usize>| idx.and_then(|i| record.get(i)).and_then(parse_optional_f64);
            let item = LookupRecord {
                source: format!("local table: {}", name),
                protein: value(Some(protein_idx)),
                carbs: value(Some(carb_idx)),
                fat: value(Some(fat_idx)),
                fiber: value(fiber_idx),
                calories: value(kcal_idx),
            };
            items.insert(normalize_name(&name), item);
        }

        if items.is_empty() {
            return Err(anyhow::anyhow!("No nutrition rows loaded from {:?}", csv_path));
        }

        tracing::debug!(rows = items.len(), path = ?csv_path, "loaded local nutrition table");
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl NutritionLookup for LocalNutritionTable {
    async fn lookup(&self, name: &str) -> Result<LookupRecord, LookupError> {
        self.items
            .get(&normalize_name(name))
            .cloned()
            .ok_or_else(|| LookupError::NoMatch(name.to_string()))
    }
}
