//! Shared types, error model, and configuration for the article enhancer.
//!
//! This crate is the foundation depended on by all other enhancer crates.
//! It provides:
//! - [`EnhancerError`], the unified error type
//! - Domain types ([`Article`], [`NewArticle`], [`SearchResult`], [`ReferenceDocument`])
//! - Configuration ([`AppConfig`] and its sections, config loading, credential lookup)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BROWSER_USER_AGENT, BrowserSearchConfig, ExtractionConfig, IngestConfig, KNOWN_PROVIDERS,
    LlmConfig, PipelineConfig, ProviderConfig, ReferencesConfig, SearchConfig, SelectorRule,
    StoreBackend, StoreConfig, config_dir, config_file_path, expand_home, init_config,
    load_config, load_config_from, resolve_secret, validate_config,
};
pub use error::{EnhancerError, Result};
pub use types::{
    Article, ArticleId, NewArticle, ReferenceDocument, ReferenceLink, SearchResult,
    SelectionPolicy, slice_chars, truncate_chars,
};
