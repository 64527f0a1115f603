use serde::{Deserialize, Serialize};
use std::env;

use crate::lookup::endpoints::USDA_DEFAULT_BASE_URL;
use crate::units::UnitTable;

/// What to do with an ingredient line that fails validation
/// (negative amount, malformed unit, invalid supplied nutrients).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Skip the line and report it alongside the result.
    #[default]
    Lenient,
    /// Abort the computation on the first invalid line.
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub mode: ValidationMode,
    pub units: UnitTable,
}

impl EngineConfig {
    pub fn strict() -> Self {
        Self {
            mode: ValidationMode::Strict,
            ..Self::default()
        }
    }
}

/// USDA FoodData Central client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsdaConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Per-request timeout. A timed out lookup leaves that ingredient unresolved.
    pub timeout_secs: u64,
    /// Number of search hits requested; only the top hit is used.
    pub page_size: u32,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: USDA_DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
            page_size: 1,
        }
    }
}

impl UsdaConfig {
    pub const API_KEY_ENV_VAR: &'static str = "USDA_API_KEY";
    pub const BASE_URL_ENV_VAR: &'static str = "USDA_BASE_URL";
    pub const TIMEOUT_ENV_VAR: &'static str = "USDA_TIMEOUT_SECS";

    /// Build from process environment. Call `dotenv` beforehand to pick up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_key: get(Self::API_KEY_ENV_VAR).filter(|key| !key.trim().is_empty()),
            base_url: get(Self::BASE_URL_ENV_VAR).unwrap_or(defaults.base_url),
            timeout_secs: get(Self::TIMEOUT_ENV_VAR)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.timeout_secs),
            page_size: defaults.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup_reads_values() {
        let vars: HashMap<&str, &str> = [
            ("USDA_API_KEY", "abc"),
            ("USDA_BASE_URL", "http://localhost:8080/fdc"),
            ("USDA_TIMEOUT_SECS", "3"),
        ]
        .into_iter()
        .collect();
        let config = UsdaConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.base_url, "http://localhost:8080/fdc");
        assert_eq!(config.timeout_secs, 3);
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = UsdaConfig::from_lookup(|k| (k == "USDA_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert_eq!(config, UsdaConfig::default());
    }

    #[test]
    fn test_default_mode_is_lenient() {
        assert_eq!(EngineConfig::default().mode, ValidationMode::Lenient);
        assert_eq!(EngineConfig::strict().mode, ValidationMode::Strict);
    }
}
