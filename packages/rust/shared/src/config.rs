//! Application configuration for the enhancer.
//!
//! User config lives at `~/.enhancer/enhancer.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials are never stored in the file: each provider names the
//! environment variable that holds its key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EnhancerError, Result};
use crate::types::SelectionPolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "enhancer.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".enhancer";

/// Browser-like identification used for page fetches and the headless session.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching enhancer.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Article store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Search provider chain settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Content extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Reference collection policy.
    #[serde(default)]
    pub references: ReferencesConfig,

    /// Generative provider chain settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Orchestrator settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Blog-listing ingestion settings.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Which article store implementation to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Embedded libSQL database file.
    #[default]
    Sqlite,
    /// Remote article REST API.
    Http,
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file for the sqlite backend. `~` expands to the home directory.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Base URL of the article API for the http backend.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for store calls, in seconds.
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database_path: default_database_path(),
            api_base_url: default_api_base_url(),
            timeout_secs: default_store_timeout(),
        }
    }
}

fn default_database_path() -> String {
    "~/.enhancer/articles.db".into()
}
fn default_api_base_url() -> String {
    "http://localhost:3000".into()
}
fn default_store_timeout() -> u64 {
    10
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the SerpAPI key.
    #[serde(default = "default_serpapi_key_env")]
    pub serpapi_key_env: String,

    #[serde(default = "default_serpapi_base_url")]
    pub serpapi_base_url: String,

    /// Result count requested from the API.
    #[serde(default = "default_result_count")]
    pub result_count: u32,

    /// Timeout for API search calls, in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Headless browser fallback.
    #[serde(default)]
    pub browser: BrowserSearchConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            serpapi_key_env: default_serpapi_key_env(),
            serpapi_base_url: default_serpapi_base_url(),
            result_count: default_result_count(),
            timeout_secs: default_search_timeout(),
            browser: BrowserSearchConfig::default(),
        }
    }
}

fn default_serpapi_key_env() -> String {
    "SERPAPI_KEY".into()
}
fn default_serpapi_base_url() -> String {
    "https://serpapi.com".into()
}
fn default_result_count() -> u32 {
    10
}
fn default_search_timeout() -> u64 {
    30
}

/// `[search.browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Results page; the query is appended as `?q=`.
    #[serde(default = "default_browser_search_url")]
    pub search_url: String,

    /// Element that must appear before results are scraped.
    #[serde(default = "default_results_container")]
    pub results_container: String,

    /// One match per result block.
    #[serde(default = "default_result_selector")]
    pub result_selector: String,

    #[serde(default = "default_title_selector")]
    pub title_selector: String,

    #[serde(default = "default_link_selector")]
    pub link_selector: String,

    #[serde(default = "default_snippet_selector")]
    pub snippet_selector: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    #[serde(default = "default_selector_timeout")]
    pub selector_timeout_secs: u64,
}

impl Default for BrowserSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: default_browser_search_url(),
            results_container: default_results_container(),
            result_selector: default_result_selector(),
            title_selector: default_title_selector(),
            link_selector: default_link_selector(),
            snippet_selector: default_snippet_selector(),
            max_results: default_max_results(),
            navigation_timeout_secs: default_navigation_timeout(),
            selector_timeout_secs: default_selector_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_browser_search_url() -> String {
    "https://www.google.com/search".into()
}
fn default_results_container() -> String {
    "#search".into()
}
fn default_result_selector() -> String {
    "#search .g".into()
}
fn default_title_selector() -> String {
    "h3".into()
}
fn default_link_selector() -> String {
    "a[href]".into()
}
fn default_snippet_selector() -> String {
    r#".VwiC3b, .yXK7lf, [data-sncf="1"]"#.into()
}
fn default_max_results() -> usize {
    10
}
fn default_navigation_timeout() -> u64 {
    30
}
fn default_selector_timeout() -> u64 {
    10
}

/// One ranked fallback rule: the first element matching `selector` wins if
/// its text is longer than `min_chars`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRule {
    pub selector: String,
    #[serde(default = "default_rule_min_chars")]
    pub min_chars: usize,
}

impl SelectorRule {
    pub fn new(selector: impl Into<String>, min_chars: usize) -> Self {
        Self {
            selector: selector.into(),
            min_chars,
        }
    }
}

fn default_rule_min_chars() -> usize {
    200
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Page fetch timeout, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Elements ignored by the selector fallback.
    #[serde(default = "default_strip_selectors")]
    pub strip_selectors: Vec<String>,

    /// Ranked selector rules, probed in order.
    #[serde(default = "default_fallback_rules")]
    pub fallback_rules: Vec<SelectorRule>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            strip_selectors: default_strip_selectors(),
            fallback_rules: default_fallback_rules(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    BROWSER_USER_AGENT.into()
}
fn default_strip_selectors() -> Vec<String> {
    [
        "script",
        "style",
        "nav",
        "header",
        "footer",
        "aside",
        ".ad",
        ".advertisement",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_fallback_rules() -> Vec<SelectorRule> {
    [
        "article",
        ".post-content",
        ".entry-content",
        ".article-content",
        "main",
        r#"[class*="content"]"#,
    ]
    .into_iter()
    .map(|sel| SelectorRule::new(sel, default_rule_min_chars()))
    .collect()
}

/// `[references]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencesConfig {
    /// Maximum number of reference documents per run.
    #[serde(default = "default_reference_limit")]
    pub limit: usize,

    /// Extracted text must be longer than this to be accepted.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Accepted content is truncated to this many characters.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Delay between successive extractions, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Our own site; results hosted here are never used as references.
    #[serde(default = "default_publishing_domain")]
    pub publishing_domain: String,
}

impl Default for ReferencesConfig {
    fn default() -> Self {
        Self {
            limit: default_reference_limit(),
            min_content_chars: default_min_content_chars(),
            max_content_chars: default_max_content_chars(),
            pacing_ms: default_pacing_ms(),
            publishing_domain: default_publishing_domain(),
        }
    }
}

fn default_reference_limit() -> usize {
    2
}
fn default_min_content_chars() -> usize {
    100
}
fn default_max_content_chars() -> usize {
    3000
}
fn default_pacing_ms() -> u64 {
    1000
}
fn default_publishing_domain() -> String {
    "beyondchats.com".into()
}

/// Credentials and endpoint for one generative provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name of the env var holding the API key.
    pub api_key_env: String,
    pub model: String,
    pub base_url: String,
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Providers tried in this order; unknown names are rejected.
    #[serde(default = "default_provider_order")]
    pub provider_order: Vec<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-call timeout, in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_gemini")]
    pub gemini: ProviderConfig,

    #[serde(default = "default_openai")]
    pub openai: ProviderConfig,

    #[serde(default = "default_anthropic")]
    pub anthropic: ProviderConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider_order: default_provider_order(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
            gemini: default_gemini(),
            openai: default_openai(),
            anthropic: default_anthropic(),
        }
    }
}

/// Generative provider names understood by `provider_order`.
pub const KNOWN_PROVIDERS: [&str; 3] = ["gemini", "openai", "anthropic"];

fn default_provider_order() -> Vec<String> {
    KNOWN_PROVIDERS.iter().map(|s| s.to_string()).collect()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_llm_timeout() -> u64 {
    60
}
fn default_gemini() -> ProviderConfig {
    ProviderConfig {
        api_key_env: "GEMINI_API_KEY".into(),
        model: "gemini-1.5-flash".into(),
        base_url: "https://generativelanguage.googleapis.com".into(),
    }
}
fn default_openai() -> ProviderConfig {
    ProviderConfig {
        api_key_env: "OPENAI_API_KEY".into(),
        model: "gpt-4o-mini".into(),
        base_url: "https://api.openai.com".into(),
    }
}
fn default_anthropic() -> ProviderConfig {
    ProviderConfig {
        api_key_env: "ANTHROPIC_API_KEY".into(),
        model: "claude-3-5-sonnet-latest".into(),
        base_url: "https://api.anthropic.com".into(),
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Whether an original that already has a derivative may be selected again.
    #[serde(default)]
    pub rederive: SelectionPolicy,

    /// Sentinel author written on every derived article.
    #[serde(default = "default_author_label")]
    pub author_label: String,

    #[serde(default = "default_title_prefix")]
    pub title_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rederive: SelectionPolicy::default(),
            author_label: default_author_label(),
            title_prefix: default_title_prefix(),
        }
    }
}

fn default_author_label() -> String {
    "AI Enhanced".into()
}
fn default_title_prefix() -> String {
    "Enhanced: ".into()
}

/// `[ingest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Articles stored per listing page; the oldest entries are kept.
    #[serde(default = "default_listing_max")]
    pub listing_max: usize,

    /// Delay between article fetches, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Author stored when a page has no byline.
    #[serde(default = "default_ingest_author")]
    pub default_author: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            listing_max: default_listing_max(),
            pacing_ms: default_pacing_ms(),
            default_author: default_ingest_author(),
        }
    }
}

fn default_listing_max() -> usize {
    5
}
fn default_ingest_author() -> String {
    "BeyondChats".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.enhancer/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EnhancerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.enhancer/enhancer.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EnhancerError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        EnhancerError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EnhancerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EnhancerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EnhancerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configs the pipeline cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.references.limit == 0 {
        return Err(EnhancerError::config("references.limit must be at least 1"));
    }
    if config.references.max_content_chars <= config.references.min_content_chars {
        return Err(EnhancerError::config(
            "references.max_content_chars must exceed references.min_content_chars",
        ));
    }
    if config.ingest.listing_max == 0 {
        return Err(EnhancerError::config("ingest.listing_max must be at least 1"));
    }
    if config.extraction.fallback_rules.is_empty() {
        return Err(EnhancerError::config(
            "extraction.fallback_rules must contain at least one rule",
        ));
    }
    for name in &config.llm.provider_order {
        if !KNOWN_PROVIDERS.contains(&name.as_str()) {
            return Err(EnhancerError::config(format!(
                "unknown provider '{name}' in llm.provider_order (expected one of {})",
                KNOWN_PROVIDERS.join(", ")
            )));
        }
    }
    Ok(())
}

/// Read a credential from the named env var.
///
/// Empty values and unedited `your_..._here` placeholders count as absent.
pub fn resolve_secret(var_name: &str) -> Option<String> {
    let value = std::env::var(var_name).ok()?;
    let value = value.trim();
    if value.is_empty() || is_placeholder(value) {
        return None;
    }
    Some(value.to_string())
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("your_") && lower.ends_with("_here")
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("SERPAPI_KEY"));
        assert!(toml_str.contains("GEMINI_API_KEY"));
        assert!(toml_str.contains("exclude-derived"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.references.limit, 2);
        assert_eq!(parsed.references.max_content_chars, 3000);
        assert_eq!(parsed.extraction.fallback_rules.len(), 6);
        assert_eq!(parsed.llm.provider_order, vec!["gemini", "openai", "anthropic"]);
    }

    #[test]
    fn fallback_rules_keep_rank_order() {
        let config = AppConfig::default();
        let selectors: Vec<&str> = config
            .extraction
            .fallback_rules
            .iter()
            .map(|r| r.selector.as_str())
            .collect();
        assert_eq!(
            selectors,
            vec![
                "article",
                ".post-content",
                ".entry-content",
                ".article-content",
                "main",
                r#"[class*="content"]"#,
            ]
        );
        assert!(config.extraction.fallback_rules.iter().all(|r| r.min_chars == 200));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let toml_str = r#"
[store]
backend = "http"
api_base_url = "http://articles.internal:3000"

[pipeline]
rederive = "allow-repeat"

[[extraction.fallback_rules]]
selector = ".story-body"
min_chars = 50
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.store.backend, StoreBackend::Http);
        assert_eq!(config.store.timeout_secs, 10);
        assert_eq!(config.pipeline.rederive, SelectionPolicy::AllowRepeat);
        assert_eq!(config.extraction.fallback_rules, vec![SelectorRule::new(".story-body", 50)]);
        assert_eq!(config.references.pacing_ms, 1000);
        assert_eq!(config.ingest.listing_max, 5);
        assert_eq!(config.ingest.default_author, "BeyondChats");
    }

    #[test]
    fn zero_listing_max_rejected() {
        let mut config = AppConfig::default();
        config.ingest.listing_max = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("listing_max"));
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut config = AppConfig::default();
        config.llm.provider_order.push("mystery".into());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn zero_limit_rejected() {
        let mut config = AppConfig::default();
        config.references.limit = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn missing_secret_is_none() {
        // Use a unique env var name to avoid interfering with other tests
        assert!(resolve_secret("ENHANCER_TEST_NONEXISTENT_KEY_12345").is_none());
    }

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder("your_serpapi_key_here"));
        assert!(is_placeholder("YOUR_GEMINI_KEY_HERE"));
        assert!(!is_placeholder("sk-live-123"));
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/tmp/a.db"), PathBuf::from("/tmp/a.db"));
    }
}
