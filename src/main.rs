use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing_subscriber::EnvFilter;

use recipe_macros::cli::{parse_args, Command, ComputeArgs, CustomCommand, LookupArgs, RecipesCommand};
use recipe_macros::config::{EngineConfig, UsdaConfig, ValidationMode};
use recipe_macros::engine::MacroEngine;
use recipe_macros::export::export_result_csv;
use recipe_macros::lookup::{
    ChainedLookup, LocalNutritionTable, LookupError, LookupRecord, NutritionLookup, OfflineLookup, UsdaClient,
};
use recipe_macros::nutrition::{CustomIngredient, CustomIngredients, NutrientProfile};
use recipe_macros::recipe::Recipe;
use recipe_macros::recipe_aggregator::{MacroTotals, RecipeComputationResult, RowStatus};
use recipe_macros::scaling::{checked_servings, rescale_lines};
use recipe_macros::store::{CustomIngredientStore, RecipeStore};

/// The lookup chosen on the command line.
enum CliLookup {
    Offline(OfflineLookup),
    Local(LocalNutritionTable),
    Usda(UsdaClient),
    LocalThenUsda(ChainedLookup<LocalNutritionTable, UsdaClient>),
}

impl NutritionLookup for CliLookup {
    async fn lookup(&self, name: &str) -> Result<LookupRecord, LookupError> {
        match self {
            CliLookup::Offline(l) => l.lookup(name).await,
            CliLookup::Local(l) => l.lookup(name).await,
            CliLookup::Usda(l) => l.lookup(name).await,
            CliLookup::LocalThenUsda(l) => l.lookup(name).await,
        }
    }
}

fn build_lookup(args: &LookupArgs) -> Result<CliLookup> {
    let local = args
        .nutrition_csv
        .as_deref()
        .map(LocalNutritionTable::load)
        .transpose()?;

    if args.offline {
        return Ok(match local {
            Some(table) => CliLookup::Local(table),
            None => CliLookup::Offline(OfflineLookup),
        });
    }

    let usda_config = UsdaConfig::from_env();
    if usda_config.api_key.is_none() {
        tracing::warn!(
            "{} is not set; ingredients without custom or supplied values will stay unresolved",
            UsdaConfig::API_KEY_ENV_VAR
        );
    }
    let usda = UsdaClient::new(usda_config).context("Failed to build USDA client")?;

    Ok(match local {
        Some(table) => CliLookup::LocalThenUsda(ChainedLookup::new(table, usda)),
        None => CliLookup::Usda(usda),
    })
}

async fn read_recipe(path: &Path) -> Result<Recipe> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read recipe file '{}'", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse recipe file '{}'", path.display()))
}

fn print_totals(label: &str, totals: &MacroTotals) {
    println!(
        "{:<28} {:>10} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>10.2}",
        label, "", totals.protein, totals.carbs, totals.fat, totals.fiber, totals.net_carbs, totals.calories
    );
}

fn print_result(title: &str, result: &RecipeComputationResult) {
    println!("\n{} ({} servings)", title, result.servings);
    println!(
        "{:<28} {:>10} {:>9} {:>9} {:>9} {:>9} {:>9} {:>10}",
        "Ingredient", "Grams", "Protein", "Carbs", "Fat", "Fiber", "Net carb", "Calories"
    );
    for row in &result.per_ingredient {
        let label = format!("{} ({})", row.name, row.amount);
        match &row.status {
            RowStatus::Resolved { .. } => println!(
                "{:<28} {:>10.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>10.2}",
                label,
                row.grams,
                row.nutrients.protein,
                row.nutrients.carbs,
                row.nutrients.fat,
                row.nutrients.fiber,
                row.nutrients.net_carbs,
                row.nutrients.calories
            ),
            RowStatus::Unresolved { reason } => {
                println!("{:<28} {:>10.2}   not counted: {}", label, row.grams, reason.reason())
            }
        }
    }
    print_totals("TOTAL", &result.totals);
    print_totals("PER SERVING", &result.per_serving);

    for skipped in &result.skipped {
        println!("skipped line {} ('{}'): {}", skipped.index + 1, skipped.name, skipped.reason);
    }
}

async fn compute(args: ComputeArgs, custom: &CustomIngredients) -> Result<()> {
    let mut recipe = read_recipe(&args.recipe_file).await?;

    if let Some(servings) = args.servings {
        recipe.set_servings(checked_servings(servings)?)?;
    }
    if let Some(factor) = args.scale {
        recipe.ingredients = rescale_lines(&recipe.ingredients, factor)?;
    }

    let mut units = EngineConfig::default().units;
    for (unit, grams) in &args.unit_overrides {
        units = units.with_factor(unit, *grams)?;
    }
    let engine = MacroEngine::new(EngineConfig {
        mode: if args.strict { ValidationMode::Strict } else { ValidationMode::Lenient },
        units,
    });

    let lookup = build_lookup(&args.lookup)?;
    let result = engine.compute_recipe(&recipe, custom, &lookup).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&recipe.title, &result);
    }

    if let Some(path) = &args.export_csv {
        export_result_csv(&result, path)?;
        println!("\nExported to {}", path.display());
    }
    Ok(())
}

async fn recipes(command: RecipesCommand, store: &RecipeStore, custom: &CustomIngredients) -> Result<()> {
    match command {
        RecipesCommand::List => {
            let saved = store.load()?;
            if saved.is_empty() {
                println!("No saved recipes found in {}.", store.path().display());
            }
            for (index, recipe) in saved.iter().enumerate() {
                println!("{:>3}  {} ({} servings, {} ingredients)", index, recipe.title, recipe.servings, recipe.ingredients.len());
            }
        }
        RecipesCommand::Show { index, servings, lookup } => {
            let mut recipe = store.get(index)?;
            if let Some(servings) = servings {
                recipe.set_servings(checked_servings(servings)?)?;
            }
            let lookup = build_lookup(&lookup)?;
            let result = MacroEngine::default().compute_recipe(&recipe, custom, &lookup).await?;
            print_result(&recipe.title, &result);
            if !recipe.instructions.trim().is_empty() {
                println!("\nInstructions:\n{}", recipe.instructions);
            }
        }
        RecipesCommand::Save { recipe_file } => {
            let recipe = read_recipe(&recipe_file).await?;
            let title = recipe.title.clone();
            let index = store.save(recipe)?;
            println!("Saved '{}' as recipe {}.", title, index);
        }
        RecipesCommand::Delete { index } => {
            let removed = store.delete(index)?;
            println!("Deleted '{}'.", removed.title);
        }
        RecipesCommand::Duplicate { index } => {
            let new_index = store.duplicate(index)?;
            println!("Duplicated recipe {} as {}.", index, new_index);
        }
    }
    Ok(())
}

fn custom_ingredients(command: CustomCommand, store: &CustomIngredientStore) -> Result<()> {
    match command {
        CustomCommand::List => {
            for ingredient in store.list()? {
                let density = match (&ingredient.unit_override, ingredient.grams_per_unit_override) {
                    (Some(unit), Some(grams)) => format!(", 1 {} = {} g", unit, grams),
                    (None, Some(grams)) => format!(", {} g per unit", grams),
                    _ => String::new(),
                };
                let p = &ingredient.profile;
                println!(
                    "{}: P {} / C {} / F {} / fiber {} per 100 g{}",
                    ingredient.name, p.protein_per_100g, p.carbs_per_100g, p.fat_per_100g, p.fiber_per_100g, density
                );
            }
        }
        CustomCommand::Add { name, protein, carbs, fat, fiber, calories, unit, grams_per_unit } => {
            let mut profile = NutrientProfile::new(protein, carbs, fat).with_fiber(fiber);
            profile.stated_calories_per_100g = calories;
            let mut ingredient = CustomIngredient::new(&name, profile);
            ingredient.unit_override = unit;
            ingredient.grams_per_unit_override = grams_per_unit;
            store.upsert(ingredient)?;
            println!("{} saved as custom ingredient.", name.trim());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let custom_store = CustomIngredientStore::new(&cli.custom_file);

    match cli.command {
        Command::Compute(args) => {
            let custom = custom_store.load()?;
            compute(args, &custom).await
        }
        Command::Recipes(command) => {
            let custom = custom_store.load()?;
            recipes(command, &RecipeStore::new(&cli.recipes_file), &custom).await
        }
        Command::Custom(command) => custom_ingredients(command, &custom_store),
    }
}
