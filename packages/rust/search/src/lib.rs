//! Web search with ordered provider fallback.
//!
//! [`SearchChain`] tries each configured [`SearchProvider`] in priority order.
//! A provider that errors, or that answers with no results, is logged and
//! skipped. When every real provider misses, the chain answers with
//! [`MockSearchProvider`] placeholders, so a search never fails.

mod browser;
mod mock;
mod serpapi;

use async_trait::async_trait;
use enhancer_shared::{Result, SearchConfig, SearchResult};
use tracing::{error, info, instrument, warn};

pub use browser::BrowserSearchProvider;
pub use mock::MockSearchProvider;
pub use serpapi::SerpApiProvider;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One interchangeable search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short name for logs and run summaries.
    fn name(&self) -> &str;

    /// Ranked results for `query`.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Which provider answered, and what it returned.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub provider: String,
    pub results: Vec<SearchResult>,
}

/// Ordered providers plus the infallible placeholder fallback.
pub struct SearchChain {
    providers: Vec<Box<dyn SearchProvider>>,
    fallback: MockSearchProvider,
}

impl SearchChain {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>) -> Self {
        Self {
            providers,
            fallback: MockSearchProvider,
        }
    }

    /// SerpAPI first, then the headless browser (when enabled).
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let mut providers: Vec<Box<dyn SearchProvider>> =
            vec![Box::new(SerpApiProvider::from_config(config)?)];
        if config.browser.enabled {
            providers.push(Box::new(BrowserSearchProvider::new(&config.browser)?));
        }
        Ok(Self::new(providers))
    }

    /// Names of the real providers, in the order they are tried.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Search with fallback. Always returns at least one result.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn search(&self, query: &str) -> SearchOutcome {
        for provider in &self.providers {
            match provider.search(query).await {
                Ok(results) if !results.is_empty() => {
                    info!(
                        provider = provider.name(),
                        count = results.len(),
                        "search succeeded"
                    );
                    return SearchOutcome {
                        provider: provider.name().to_string(),
                        results,
                    };
                }
                Ok(_) => {
                    warn!(provider = provider.name(), "search returned no results");
                }
                Err(e) if e.is_fatal() => {
                    error!(provider = provider.name(), error = %e, "search provider misconfigured, skipping");
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "search provider failed");
                }
            }
        }

        warn!("all search providers failed, using placeholder results");
        SearchOutcome {
            provider: "mock".into(),
            results: self.fallback.results(query),
        }
    }
}
