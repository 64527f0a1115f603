pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod lookup;
pub mod nutrition;
pub mod recipe;
pub mod recipe_aggregator;
pub mod resolver;
pub mod scaling;
pub mod store;
pub mod units;

pub use engine::MacroEngine;
pub use error::{MacroError, MacroResult};
pub use recipe_aggregator::{MacroTotals, RecipeComputationResult};
