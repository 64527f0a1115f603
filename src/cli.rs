use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::store::{DEFAULT_CUSTOM_INGREDIENTS_FILE, DEFAULT_RECIPES_FILE};

#[derive(Parser, Debug)]
#[command(author, version, about = "Macro-nutrient calculator for recipes", long_about = None)]
pub struct Cli {
    /// Custom ingredient store
    #[arg(long, global = true, default_value = DEFAULT_CUSTOM_INGREDIENTS_FILE)]
    pub custom_file: PathBuf,

    /// Saved recipe store
    #[arg(long, global = true, default_value = DEFAULT_RECIPES_FILE)]
    pub recipes_file: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute macros for a recipe JSON file
    Compute(ComputeArgs),
    /// Manage saved recipes
    #[command(subcommand)]
    Recipes(RecipesCommand),
    /// Manage custom ingredients
    #[command(subcommand)]
    Custom(CustomCommand),
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Never call the USDA database
    #[arg(long)]
    pub offline: bool,

    /// Local nutrition table consulted before the USDA database
    #[arg(long)]
    pub nutrition_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Path to the recipe JSON file
    pub recipe_file: PathBuf,

    /// Serve this many portions instead of the recipe's own count
    #[arg(short, long)]
    pub servings: Option<f64>,

    /// Multiply every ingredient amount (e.g. 0.5 or 2 for batch cooking)
    #[arg(long)]
    pub scale: Option<f64>,

    /// Fail on the first invalid ingredient line instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Override a unit's grams-per-unit factor, e.g. --unit slice=30
    #[arg(long = "unit", value_parser = parse_unit_override)]
    pub unit_overrides: Vec<(String, f64)>,

    /// Write the result table as CSV
    #[arg(long)]
    pub export_csv: Option<PathBuf>,

    /// Print the result as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub lookup: LookupArgs,
}

#[derive(Subcommand, Debug)]
pub enum RecipesCommand {
    /// List saved recipes
    List,
    /// Show a saved recipe with its macros
    Show {
        index: usize,
        #[arg(short, long)]
        servings: Option<f64>,
        #[command(flatten)]
        lookup: LookupArgs,
    },
    /// Save a recipe JSON file into the store
    Save { recipe_file: PathBuf },
    /// Delete a saved recipe
    Delete { index: usize },
    /// Duplicate a saved recipe
    Duplicate { index: usize },
}

#[derive(Subcommand, Debug)]
pub enum CustomCommand {
    /// List custom ingredients
    List,
    /// Add or replace a custom ingredient (values per 100 g)
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        protein: f64,
        #[arg(long)]
        carbs: f64,
        #[arg(long)]
        fat: f64,
        #[arg(long, default_value_t = 0.0)]
        fiber: f64,
        /// Stated calories per 100 g, kept for display
        #[arg(long)]
        calories: Option<f64>,
        /// Unit the density applies to
        #[arg(long, requires = "grams_per_unit")]
        unit: Option<String>,
        #[arg(long)]
        grams_per_unit: Option<f64>,
    },
}

fn parse_unit_override(s: &str) -> Result<(String, f64), String> {
    let (unit, grams) = s
        .split_once('=')
        .ok_or_else(|| format!("expected UNIT=GRAMS, got '{}'", s))?;
    let grams: f64 = grams
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", grams.trim()))?;
    Ok((unit.trim().to_string(), grams))
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
