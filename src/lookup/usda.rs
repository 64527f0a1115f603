use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::endpoints::{record_from_search, FoodSearchQuery, FoodSearchResponse, FOODS_SEARCH_PATH, SEARCH_DATA_TYPES};
use super::{LookupError, LookupRecord, NutritionLookup};
use crate::config::UsdaConfig;

/// FoodData Central search client.
///
/// Configuration is passed in explicitly; the client never reads the environment.
#[derive(Debug, Clone)]
pub struct UsdaClient {
    config: UsdaConfig,
    http: Client,
}

impl UsdaClient {
    pub fn new(config: UsdaConfig) -> Result<Self, LookupError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    pub async fn search(&self, query: &str) -> Result<FoodSearchResponse, LookupError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LookupError::MissingApiKey(UsdaConfig::API_KEY_ENV_VAR.to_string()))?;

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), FOODS_SEARCH_PATH);
        let params = FoodSearchQuery {
            query,
            page_size: self.config.page_size,
            data_type: SEARCH_DATA_TYPES,
            api_key,
        };

        let response = self.http.get(&url).query(&params).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LookupError::RateLimited);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(LookupError::Http { status, body });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str::<FoodSearchResponse>(&body)?)
    }
}

impl NutritionLookup for UsdaClient {
    async fn lookup(&self, name: &str) -> Result<LookupRecord, LookupError> {
        let response = self.search(name).await?;
        tracing::debug!(ingredient = name, hits = ?response.total_hits, "USDA search complete");
        record_from_search(&response, name)
    }
}
