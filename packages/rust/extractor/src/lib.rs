//! Main-body text extraction from arbitrary web pages.
//!
//! [`ContentExtractor`] fetches a page with a browser-like identity, then runs
//! a readability-style scorer over the DOM. When scoring finds nothing it
//! probes a ranked list of CSS selectors, and finally the whole `<body>`.

mod fallback;
mod listing;
mod metadata;
mod readability;
mod text;

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use enhancer_shared::{EnhancerError, ExtractionConfig, Result};
use reqwest::Client;
use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

use crate::fallback::SelectorFallback;

pub use listing::ListingEntry;
pub use text::normalize_text;

/// Maximum number of redirects followed per fetch.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Anything that can turn a URL into main-body text.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Normalized main-body text of the page at `url`.
    ///
    /// Fails with [`EnhancerError::Extraction`] on network errors, timeouts,
    /// non-2xx responses, and refused targets.
    async fn extract(&self, url: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// ExtractedPage
// ---------------------------------------------------------------------------

/// A fetched page with its body text and metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Final URL after redirects.
    pub url: String,
    pub title: Option<String>,
    pub text: String,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// ContentExtractor
// ---------------------------------------------------------------------------

/// HTTP fetcher plus the readability and selector extraction passes.
pub struct ContentExtractor {
    client: Client,
    fallback: SelectorFallback,
    /// Allow localhost/private IPs (for tests against local mock servers).
    allow_private_hosts: bool,
}

impl ContentExtractor {
    /// Build an extractor from the `[extraction]` config section.
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EnhancerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            fallback: SelectorFallback::new(&config.fallback_rules, &config.strip_selectors)?,
            allow_private_hosts: false,
        })
    }

    /// Permit fetches from loopback and private addresses.
    pub fn allow_private_hosts(mut self) -> Self {
        self.allow_private_hosts = true;
        self
    }

    /// Fetch `url` and extract both body text and page metadata.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_page(&self, url: &str) -> Result<ExtractedPage> {
        let (final_url, html) = self.fetch_html(url).await?;
        let doc = Html::parse_document(&html);
        let text = self.main_text(&doc);
        let meta = metadata::page_metadata(&doc, &final_url);

        Ok(ExtractedPage {
            url: final_url.to_string(),
            title: meta.title,
            text,
            author: meta.author,
            published_date: meta.published_date,
            image_url: meta.image_url,
        })
    }

    /// Fetch a blog listing page and return up to `max` post links from it.
    #[instrument(skip_all, fields(url = %url, max))]
    pub async fn fetch_listing(&self, url: &str, max: usize) -> Result<Vec<ListingEntry>> {
        let (final_url, html) = self.fetch_html(url).await?;
        let entries = listing::listing_entries(&Html::parse_document(&html), &final_url, max);
        debug!(count = entries.len(), "listing entries found");
        Ok(entries)
    }

    /// Extract main text from an HTML string without fetching.
    pub fn extract_html(&self, html: &str) -> String {
        self.main_text(&Html::parse_document(html))
    }

    fn main_text(&self, doc: &Html) -> String {
        match readability::main_text(doc) {
            Some(text) => text,
            None => {
                debug!("readability found no content, probing selectors");
                self.fallback.extract(doc)
            }
        }
    }

    async fn fetch_html(&self, raw_url: &str) -> Result<(Url, String)> {
        let url = Url::parse(raw_url)
            .map_err(|e| EnhancerError::extraction(raw_url, format!("invalid URL: {e}")))?;

        if !self.allow_private_hosts && is_ssrf_target(&url) {
            return Err(EnhancerError::extraction(raw_url, "refused non-public target"));
        }

        debug!(%url, "fetching page");
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| EnhancerError::extraction(raw_url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnhancerError::extraction(raw_url, format!("HTTP {status}")));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| EnhancerError::extraction(raw_url, format!("body read failed: {e}")))?;

        Ok((final_url, body))
    }
}

#[async_trait]
impl PageExtractor for ContentExtractor {
    async fn extract(&self, url: &str) -> Result<String> {
        let (_, html) = self.fetch_html(url).await?;
        Ok(self.extract_html(&html))
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    if !matches!(url.scheme(), "http" | "https") {
        return true;
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link-local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}
