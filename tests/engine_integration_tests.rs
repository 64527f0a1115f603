use dotenv::dotenv;
use recipe_macros::config::{EngineConfig, UsdaConfig};
use recipe_macros::lookup::{
    ChainedLookup, LocalNutritionTable, LookupError, LookupRecord, NutritionLookup, OfflineLookup, UsdaClient,
};
use recipe_macros::nutrition::{CustomIngredient, CustomIngredients, NutrientProfile};
use recipe_macros::recipe::{IngredientLine, Recipe};
use recipe_macros::recipe_aggregator::RowStatus;
use recipe_macros::resolver::{ProfileSource, Unresolved};
use recipe_macros::scaling::{per_serving, rescale_lines};
use recipe_macros::store::RecipeStore;
use recipe_macros::MacroEngine;
use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory stand-in for the USDA database.
struct FakeLookup {
    foods: HashMap<String, LookupRecord>,
    rate_limited: Vec<String>,
    calls: AtomicUsize,
}

impl FakeLookup {
    fn new() -> Self {
        Self {
            foods: HashMap::new(),
            rate_limited: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with_food(mut self, name: &str, protein: f64, carbs: f64, fat: f64) -> Self {
        self.foods.insert(
            name.to_string(),
            LookupRecord {
                source: format!("{}, raw", name),
                protein: Some(protein),
                carbs: Some(carbs),
                fat: Some(fat),
                fiber: None,
                calories: None,
            },
        );
        self
    }

    fn rate_limiting(mut self, name: &str) -> Self {
        self.rate_limited.push(name.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NutritionLookup for FakeLookup {
    async fn lookup(&self, name: &str) -> Result<LookupRecord, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = name.to_lowercase();
        if self.rate_limited.contains(&key) {
            return Err(LookupError::RateLimited);
        }
        self.foods
            .get(&key)
            .cloned()
            .ok_or_else(|| LookupError::NoMatch(name.to_string()))
    }
}

fn chicken() -> IngredientLine {
    IngredientLine::new("chicken breast", 200.0, "g").with_profile(NutrientProfile::new(31.0, 0.0, 3.6))
}

#[tokio::test]
async fn test_chicken_breast_for_two() {
    let result = MacroEngine::default()
        .compute(&[chicken()], 2, &CustomIngredients::new(), &OfflineLookup)
        .await
        .unwrap();

    let row = &result.per_ingredient[0];
    assert_eq!(row.grams, 200.0);
    assert_eq!(row.nutrients.protein, 62.0);
    assert_eq!(row.nutrients.fat, 7.2);
    assert_eq!(row.nutrients.calories, 312.8);
    assert_eq!(result.totals.calories, 312.8);
    assert_eq!(result.per_serving.protein, 31.0);
    assert_eq!(result.per_serving.fat, 3.6);
    assert_eq!(result.per_serving.calories, 156.4);
}

#[tokio::test]
async fn test_one_failing_lookup_does_not_sink_the_rest() {
    let lookup = FakeLookup::new()
        .with_food("brown rice", 2.6, 23.0, 0.9)
        .rate_limiting("broccoli");
    let lines = vec![
        chicken(),
        IngredientLine::new("brown rice", 1.0, "cup"),
        IngredientLine::new("broccoli", 150.0, "g"),
        IngredientLine::new("dragonfruit jam", 1.0, "tbsp"),
    ];

    let result = MacroEngine::default()
        .compute(&lines, 2, &CustomIngredients::new(), &lookup)
        .await
        .unwrap();

    assert_eq!(result.per_ingredient.len(), 4);
    assert_eq!(result.unresolved().count(), 2);
    assert!(matches!(
        result.per_ingredient[2].status,
        RowStatus::Unresolved { reason: Unresolved::LookupUnavailable(_) }
    ));
    assert!(matches!(
        result.per_ingredient[3].status,
        RowStatus::Unresolved { reason: Unresolved::UnresolvedIngredient(_) }
    ));

    // 200 g chicken + 240 g rice
    assert_eq!(result.totals.protein, 68.24);
    assert_eq!(result.totals.carbs, 55.2);
}

#[tokio::test]
async fn test_custom_store_beats_supplied_and_lookup() {
    let customs: CustomIngredients =
        vec![CustomIngredient::new("Chicken Breast", NutrientProfile::new(25.0, 0.0, 2.0))]
            .into_iter()
            .collect();
    let lookup = FakeLookup::new().with_food("chicken breast", 40.0, 0.0, 1.0);

    let result = MacroEngine::default()
        .compute(&[chicken()], 1, &customs, &lookup)
        .await
        .unwrap();

    assert_eq!(result.totals.protein, 50.0);
    assert_eq!(
        result.per_ingredient[0].status,
        RowStatus::Resolved { source: ProfileSource::Custom }
    );
    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn test_repeated_ingredient_is_looked_up_once_per_call() {
    let lookup = FakeLookup::new().with_food("egg", 12.6, 0.7, 9.5);
    let lines = vec![
        IngredientLine::new("egg", 2.0, "piece"),
        IngredientLine::new("Egg ", 1.0, "piece"),
        IngredientLine::new("EGG", 50.0, "g"),
    ];
    let engine = MacroEngine::default();

    let result = engine.compute(&lines, 1, &CustomIngredients::new(), &lookup).await.unwrap();
    assert_eq!(lookup.calls(), 1);
    assert_eq!(result.totals.protein, 25.2);

    // the memo does not outlive the computation
    engine.compute(&lines, 1, &CustomIngredients::new(), &lookup).await.unwrap();
    assert_eq!(lookup.calls(), 2);
}

#[tokio::test]
async fn test_rescaled_variant_halves_protein() {
    let lines = rescale_lines(&[chicken()], 0.5).unwrap();
    assert_eq!(lines[0].amount, 100.0);

    let result = MacroEngine::default()
        .compute(&lines, 1, &CustomIngredients::new(), &OfflineLookup)
        .await
        .unwrap();
    assert_eq!(result.totals.protein, 31.0);
}

#[tokio::test]
async fn test_per_serving_does_not_touch_ingredients() {
    let engine = MacroEngine::default();
    let result = engine
        .compute(&[chicken()], 1, &CustomIngredients::new(), &OfflineLookup)
        .await
        .unwrap();

    let first = per_serving(&result.totals, 2.0).unwrap();
    let second = per_serving(&result.totals, 2.0).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.protein, 31.0);
    assert_eq!(result.per_ingredient[0].nutrients.protein, 62.0);
}

#[tokio::test]
async fn test_saved_recipe_rescales_from_its_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecipeStore::new(dir.path().join("saved_recipes.json"));
    let recipe = Recipe::new("Chicken and rice", 2, vec![chicken()]).unwrap();
    store.save(recipe).unwrap();

    let engine = MacroEngine::default();
    let mut loaded = store.get(0).unwrap();
    loaded.set_servings(6).unwrap();
    loaded.set_servings(1).unwrap();

    let result = engine
        .compute_recipe(&loaded, &CustomIngredients::new(), &OfflineLookup)
        .await
        .unwrap();
    assert_eq!(result.servings, 1);
    assert_eq!(result.totals.protein, 31.0);
    assert_eq!(loaded.ingredients[0].amount, 200.0);
}

#[tokio::test]
async fn test_strict_mode_reports_line_index() {
    let lines = vec![chicken(), IngredientLine::new("olive oil", f64::NAN, "tbsp")];
    let err = MacroEngine::new(EngineConfig::strict())
        .compute(&lines, 1, &CustomIngredients::new(), &OfflineLookup)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("olive oil"));
}

#[tokio::test]
async fn test_local_table_falls_back_to_secondary() {
    let table = LocalNutritionTable::from_records(vec![(
        "Oats".to_string(),
        LookupRecord {
            source: "local: Oats".to_string(),
            protein: Some(13.2),
            carbs: Some(67.7),
            fat: Some(6.5),
            fiber: Some(10.1),
            calories: None,
        },
    )]);
    let lookup = ChainedLookup::new(table, FakeLookup::new().with_food("banana", 1.1, 22.8, 0.3));
    let lines = vec![
        IngredientLine::new("oats", 100.0, "g"),
        IngredientLine::new("banana", 100.0, "g"),
    ];

    let result = MacroEngine::default()
        .compute(&lines, 1, &CustomIngredients::new(), &lookup)
        .await
        .unwrap();
    assert_eq!(result.unresolved().count(), 0);
    assert_eq!(result.totals.protein, 14.3);
    assert_eq!(result.totals.fiber, 10.1);
}

#[tokio::test]
#[ignore]
async fn test_live_usda_lookup() {
    dotenv().ok();
    if env::var(UsdaConfig::API_KEY_ENV_VAR).is_err() {
        println!("Skipping test_live_usda_lookup: {} not set.", UsdaConfig::API_KEY_ENV_VAR);
        return;
    }

    let client = UsdaClient::new(UsdaConfig::from_env()).unwrap();
    let record = client.lookup("chicken breast").await;
    assert!(record.is_ok(), "USDA lookup failed: {:?}", record.err());
    let profile = record.unwrap().into_profile().unwrap();
    assert!(profile.protein_per_100g > 10.0);
}

#[tokio::test]
async fn test_older_saved_recipe_keeps_line_macros() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved_recipes.json");
    std::fs::write(
        &path,
        r#"[{"title": "Chicken", "servings": 2,
             "ingredients": [{"name": "chicken breast", "amt": 200, "unit": "g", "p": 31, "c": 0, "f": 3.6}],
             "instructions": ""}]"#,
    )
    .unwrap();

    let recipe = RecipeStore::new(&path).get(0).unwrap();
    let result = MacroEngine::default()
        .compute_recipe(&recipe, &CustomIngredients::new(), &OfflineLookup)
        .await
        .unwrap();
    assert_eq!(result.unresolved().count(), 0);
    assert_eq!(result.totals.protein, 62.0);
    assert_eq!(result.per_serving.calories, 156.4);
}
