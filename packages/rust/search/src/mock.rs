//! Deterministic placeholder results, the chain's last resort.

use async_trait::async_trait;
use enhancer_shared::{Result, SearchResult};

use crate::SearchProvider;

/// Always returns two fixed results derived from the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockSearchProvider;

impl MockSearchProvider {
    /// Infallible form used by [`SearchChain`](crate::SearchChain).
    pub fn results(&self, query: &str) -> Vec<SearchResult> {
        (1..=2)
            .map(|n| SearchResult {
                title: format!("Example Article {n} about {query}"),
                link: format!("https://example.com/article-{n}"),
                snippet: "Synthetic placeholder result; no search provider was available.".into(),
            })
            .collect()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        Ok(self.results(query))
    }
}
