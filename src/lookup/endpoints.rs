use serde::{Deserialize, Serialize};

use super::{LookupError, LookupRecord};

pub const USDA_DEFAULT_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";
pub const FOODS_SEARCH_PATH: &str = "/foods/search";

// FoodData Central nutrient numbers.
pub const NUTRIENT_PROTEIN: &str = "203";
pub const NUTRIENT_FAT: &str = "204";
pub const NUTRIENT_CARBS: &str = "205";
pub const NUTRIENT_ENERGY: &str = "208";
pub const NUTRIENT_FIBER: &str = "291";

/// Data types searched, most curated first.
pub const SEARCH_DATA_TYPES: &str = "Foundation,SR Legacy,Survey (FNDDS)";

#[derive(Debug, Serialize, Clone)]
pub struct FoodSearchQuery<'a> {
    pub query: &'a str,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    #[serde(rename = "dataType")]
    pub data_type: &'a str,
    pub api_key: &'a str,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FoodSearchResponse {
    #[serde(default)]
    pub total_hits: Option<u64>,
    #[serde(default)]
    pub foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SearchFood {
    pub fdc_id: u64,
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub food_nutrients: Vec<SearchFoodNutrient>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SearchFoodNutrient {
    #[serde(default)]
    pub nutrient_number: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

impl SearchFoodNutrient {
    fn is(&self, number: &str) -> bool {
        self.nutrient_number.as_deref() == Some(number)
    }

    fn is_kcal(&self) -> bool {
        self.unit_name
            .as_deref()
            .map_or(false, |unit| unit.eq_ignore_ascii_case("kcal"))
    }
}

impl SearchFood {
    fn nutrient(&self, number: &str) -> Option<f64> {
        self.food_nutrients
            .iter()
            .filter(|n| n.is(number))
            .find_map(|n| n.value)
    }

    fn energy_kcal(&self) -> Option<f64> {
        self.food_nutrients
            .iter()
            .filter(|n| n.is(NUTRIENT_ENERGY) && n.is_kcal())
            .find_map(|n| n.value)
    }

    pub fn to_record(&self) -> LookupRecord {
        let source = match &self.data_type {
            Some(data_type) => format!("USDA #{} {} ({})", self.fdc_id, self.description, data_type),
            None => format!("USDA #{} {}", self.fdc_id, self.description),
        };
        LookupRecord {
            source,
            protein: self.nutrient(NUTRIENT_PROTEIN),
            carbs: self.nutrient(NUTRIENT_CARBS),
            fat: self.nutrient(NUTRIENT_FAT),
            fiber: self.nutrient(NUTRIENT_FIBER),
            calories: self.energy_kcal(),
        }
    }
}

/// Pick the top hit of a search response. An empty hit list is a definitive no-match.
pub fn record_from_search(response: &FoodSearchResponse, query: &str) -> Result<LookupRecord, LookupError> {
    response
        .foods
        .first()
        .map(SearchFood::to_record)
        .ok_or_else(|| LookupError::NoMatch(query.to_string()))
}
