//! Search by driving a headless Chrome session over a public results page.
//!
//! `headless_chrome` is synchronous, so each search runs on a blocking
//! thread with its own isolated browser process.

use std::time::Duration;

use async_trait::async_trait;
use enhancer_shared::{
    BROWSER_USER_AGENT, BrowserSearchConfig, EnhancerError, Result, SearchResult,
};
use headless_chrome::{Browser, LaunchOptions};
use scraper::{Html, Selector};
use url::Url;

use crate::SearchProvider;

const PROVIDER: &str = "browser";

/// Compiled result-page selectors.
#[derive(Debug)]
struct ResultSelectors {
    result: Selector,
    title: Selector,
    link: Selector,
    snippet: Selector,
}

/// Headless-browser search provider.
#[derive(Debug)]
pub struct BrowserSearchProvider {
    config: BrowserSearchConfig,
    selectors: ResultSelectors,
}

impl BrowserSearchProvider {
    pub fn new(config: &BrowserSearchConfig) -> Result<Self> {
        Url::parse(&config.search_url).map_err(|e| {
            EnhancerError::config(format!("invalid search_url '{}': {e}", config.search_url))
        })?;
        let selectors = ResultSelectors {
            result: parse_selector(&config.result_selector)?,
            title: parse_selector(&config.title_selector)?,
            link: parse_selector(&config.link_selector)?,
            snippet: parse_selector(&config.snippet_selector)?,
        };
        Ok(Self {
            config: config.clone(),
            selectors,
        })
    }

    fn results_url(&self, query: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.search_url)
            .map_err(|e| EnhancerError::config(e.to_string()))?;
        url.query_pairs_mut().append_pair("q", query);
        Ok(url)
    }

    /// Pull result blocks out of a rendered results page.
    pub fn parse_results_page(&self, html: &str, page_url: &Url) -> Vec<SearchResult> {
        let doc = Html::parse_document(html);
        let mut results = Vec::new();

        for block in doc.select(&self.selectors.result) {
            if results.len() >= self.config.max_results {
                break;
            }
            let title = block
                .select(&self.selectors.title)
                .next()
                .map(|el| collapse(&el.text().collect::<String>()))
                .unwrap_or_default();
            let link = block
                .select(&self.selectors.link)
                .filter_map(|a| a.value().attr("href"))
                .find_map(|href| resolve_link(page_url, href));
            let Some(link) = link else {
                continue;
            };
            if title.is_empty() {
                continue;
            }
            let snippet = block
                .select(&self.selectors.snippet)
                .next()
                .map(|el| collapse(&el.text().collect::<String>()))
                .unwrap_or_default();

            results.push(SearchResult {
                title,
                link,
                snippet,
            });
        }
        results
    }
}

#[async_trait]
impl SearchProvider for BrowserSearchProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        if !self.config.enabled {
            return Err(EnhancerError::provider(PROVIDER, "disabled by configuration"));
        }

        let url = self.results_url(query)?;
        let session = SessionSettings {
            url: url.to_string(),
            container: self.config.results_container.clone(),
            navigation_timeout: Duration::from_secs(self.config.navigation_timeout_secs),
            selector_timeout: Duration::from_secs(self.config.selector_timeout_secs),
        };

        let html = tokio::task::spawn_blocking(move || render_page(&session))
            .await
            .map_err(|e| {
                EnhancerError::provider(PROVIDER, format!("browser task failed: {e}"))
            })??;

        Ok(self.parse_results_page(&html, &url))
    }
}

/// What a blocking browser session needs; owned so it can cross threads.
struct SessionSettings {
    url: String,
    container: String,
    navigation_timeout: Duration,
    selector_timeout: Duration,
}

/// Launch a fresh headless browser, load the page, and return its HTML once
/// the results container is present.
fn render_page(session: &SessionSettings) -> Result<String> {
    let unavailable = |stage: &str, e: &dyn std::fmt::Display| {
        EnhancerError::provider(PROVIDER, format!("{stage}: {e}"))
    };

    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .build()
        .map_err(|e| unavailable("launch options", &e))?;
    let browser = Browser::new(options).map_err(|e| unavailable("launch", &e))?;
    let tab = browser.new_tab().map_err(|e| unavailable("new tab", &e))?;

    tab.set_default_timeout(session.navigation_timeout);
    tab.set_user_agent(BROWSER_USER_AGENT, None, None)
        .map_err(|e| unavailable("user agent", &e))?;
    tab.navigate_to(&session.url)
        .map_err(|e| unavailable("navigate", &e))?;
    tab.wait_until_navigated()
        .map_err(|e| unavailable("navigation", &e))?;
    tab.wait_for_element_with_custom_timeout(&session.container, session.selector_timeout)
        .map_err(|e| unavailable("results container", &e))?;

    tab.get_content().map_err(|e| unavailable("page content", &e))
}

/// Absolute http(s) target of a result href, unwrapping `/url?q=` redirects.
fn resolve_link(page_url: &Url, href: &str) -> Option<String> {
    let resolved = page_url.join(href).ok()?;
    let target = if resolved.path() == "/url" {
        let q = resolved
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned())?;
        Url::parse(&q).ok()?
    } else {
        resolved
    };
    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw)
        .map_err(|e| EnhancerError::config(format!("invalid selector '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"<html><body><div id="search">
        <div class="g">
            <a href="https://www.zendesk.example/blog/chatbots"><h3>Chatbots for support</h3></a>
            <div class="VwiC3b">How support teams use   bots.</div>
        </div>
        <div class="g">
            <a href="/url?q=https://www.intercom.example/guide&amp;sa=U"><h3>Guide to bots</h3></a>
            <span data-sncf="1">A practical guide.</span>
        </div>
        <div class="g"><h3>No link here</h3></div>
        <div class="g"><a href="https://x.example"></a></div>
    </div></body></html>"#;

    fn provider(max: usize) -> BrowserSearchProvider {
        BrowserSearchProvider::new(&BrowserSearchConfig {
            max_results: max,
            ..Default::default()
        })
        .expect("provider")
    }

    fn page_url() -> Url {
        Url::parse("https://www.google.com/search?q=chatbots").unwrap()
    }

    #[test]
    fn parses_result_blocks() {
        let results = provider(10).parse_results_page(RESULTS_PAGE, &page_url());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Chatbots for support");
        assert_eq!(results[0].link, "https://www.zendesk.example/blog/chatbots");
        assert_eq!(results[0].snippet, "How support teams use bots.");
        assert_eq!(results[1].link, "https://www.intercom.example/guide");
        assert_eq!(results[1].snippet, "A practical guide.");
    }

    #[test]
    fn respects_result_cap() {
        let results = provider(1).parse_results_page(RESULTS_PAGE, &page_url());
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn query_is_url_encoded() {
        let url = provider(10).results_url("bots & humans").unwrap();
        assert_eq!(url.as_str(), "https://www.google.com/search?q=bots+%26+humans");
    }

    #[test]
    fn non_http_links_are_dropped() {
        assert!(resolve_link(&page_url(), "javascript:void(0)").is_none());
        assert_eq!(
            resolve_link(&page_url(), "/relative").as_deref(),
            Some("https://www.google.com/relative")
        );
    }

    #[tokio::test]
    async fn disabled_provider_is_unavailable() {
        let provider = BrowserSearchProvider::new(&BrowserSearchConfig {
            enabled: false,
            ..Default::default()
        })
        .unwrap();
        let err = provider.search("anything").await.unwrap_err();
        assert!(matches!(err, EnhancerError::ProviderUnavailable { .. }));
    }
}
