//! JSON-file persistence for saved recipes and custom ingredients.
//!
//! Both stores keep a single pretty-printed JSON array. A missing file reads
//! as empty. Writes replace the whole file; there is no locking.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::nutrition::{CustomIngredient, CustomIngredients};
use crate::recipe::Recipe;

pub const DEFAULT_RECIPES_FILE: &str = "saved_recipes.json";
pub const DEFAULT_CUSTOM_INGREDIENTS_FILE: &str = "custom_ingredients.json";

fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn write_list<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(items)?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
}

#[derive(Debug, Clone)]
pub struct RecipeStore {
    path: PathBuf,
}

impl RecipeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Recipe>> {
        read_list(&self.path)
    }

    pub fn save(&self, recipe: Recipe) -> Result<usize> {
        let mut recipes = self.load()?;
        recipes.push(recipe);
        write_list(&self.path, &recipes)?;
        Ok(recipes.len() - 1)
    }

    pub fn get(&self, index: usize) -> Result<Recipe> {
        let recipes = self.load()?;
        let count = recipes.len();
        recipes
            .into_iter()
            .nth(index)
            .ok_or_else(|| anyhow!("No recipe at index {} ({} saved)", index, count))
    }

    pub fn find_by_title(&self, title: &str) -> Result<Option<Recipe>> {
        Ok(self
            .load()?
            .into_iter()
            .find(|r| r.title.trim().eq_ignore_ascii_case(title.trim())))
    }

    pub fn delete(&self, index: usize) -> Result<Recipe> {
        let mut recipes = self.load()?;
        if index >= recipes.len() {
            return Err(anyhow!("No recipe at index {} ({} saved)", index, recipes.len()));
        }
        let removed = recipes.remove(index);
        write_list(&self.path, &recipes)?;
        Ok(removed)
    }

    /// Append a copy of the recipe at `index`, titled "<title> (Copy)".
    pub fn duplicate(&self, index: usize) -> Result<usize> {
        let mut recipes = self.load()?;
        let copy = recipes
            .get(index)
            .map(Recipe::duplicate)
            .ok_or_else(|| anyhow!("No recipe at index {} ({} saved)", index, recipes.len()))?;
        recipes.push(copy);
        write_list(&self.path, &recipes)?;
        Ok(recipes.len() - 1)
    }
}

#[derive(Debug, Clone)]
pub struct CustomIngredientStore {
    path: PathBuf,
}

impl CustomIngredientStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn list(&self) -> Result<Vec<CustomIngredient>> {
        read_list(&self.path)
    }

    /// Snapshot handed to the engine for one computation. Entries that fail
    /// validation (e.g. a hand-edited negative value) are left out.
    pub fn load(&self) -> Result<CustomIngredients> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|ingredient| match ingredient.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(ingredient = %ingredient.name, error = %e, "skipping invalid custom ingredient");
                    false
                }
            })
            .collect())
    }

    /// Add an ingredient, replacing any existing one with the same name.
    pub fn upsert(&self, ingredient: CustomIngredient) -> Result<()> {
        ingredient
            .validate()
            .with_context(|| format!("Refusing to store custom ingredient '{}'", ingredient.name))?;
        let mut ingredients = self.list()?;
        let key = ingredient.key();
        match ingredients.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => *existing = ingredient,
            None => ingredients.push(ingredient),
        }
        write_list(&self.path, &ingredients)
    }
}
