//! SerpAPI Google search.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use enhancer_shared::{EnhancerError, Result, SearchConfig, SearchResult, resolve_secret};
use reqwest::Client;
use serde::Deserialize;

use crate::SearchProvider;

const PROVIDER: &str = "serpapi";

/// Credentialed API search. Without a key every call fails as unavailable.
pub struct SerpApiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    result_count: u32,
}

impl fmt::Debug for SerpApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerpApiProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("result_count", &self.result_count)
            .finish()
    }
}

impl SerpApiProvider {
    /// Build from the `[search]` section, reading the key from its env var.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let api_key = resolve_secret(&config.serpapi_key_env);
        if api_key.is_none() {
            tracing::debug!(env = %config.serpapi_key_env, "no SerpAPI key configured");
        }
        Self::new(
            &config.serpapi_base_url,
            api_key,
            config.result_count,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        result_count: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnhancerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            result_count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: Option<String>,
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(EnhancerError::provider(PROVIDER, "no API key configured"));
        };

        let url = format!("{}/search.json", self.base_url);
        let num = self.result_count.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", api_key),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| EnhancerError::provider(PROVIDER, e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnhancerError::provider(PROVIDER, format!("HTTP {status}")));
        }

        let body: SerpResponse = response
            .json()
            .await
            .map_err(|e| EnhancerError::provider(PROVIDER, format!("invalid response: {e}")))?;

        if let Some(error) = body.error {
            return Err(EnhancerError::provider(PROVIDER, error));
        }

        Ok(body
            .organic_results
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .map(|r| SearchResult {
                title: r.title,
                link: r.link,
                snippet: r.snippet.unwrap_or_default(),
            })
            .collect())
    }
}
