//! Error types for the enhancer workspace.
//!
//! Library crates use [`EnhancerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all enhancer operations.
#[derive(Debug, thiserror::Error)]
pub enum EnhancerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside of a provider chain.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// A search or generative provider is unconfigured or its upstream call failed.
    /// Always recoverable by advancing to the next provider in the chain.
    #[error("provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    /// Fetching or extracting one page failed.
    #[error("extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    /// No article is waiting to be enhanced.
    #[error("no unenhanced article found")]
    TargetNotFound,

    /// Writing the derived article failed; nothing was persisted.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// A pipeline stage could not proceed.
    #[error("pipeline aborted at {stage}: {reason}")]
    Aborted { stage: String, reason: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing fields, broken lineage, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EnhancerError>;

impl EnhancerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a provider error tagged with the provider name.
    pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create an extraction error for a URL.
    pub fn extraction(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an abort error for a named pipeline stage.
    pub fn aborted(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Aborted {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the pipeline stops on this error instead of degrading.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::ProviderUnavailable { .. } | Self::Extraction { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = EnhancerError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = EnhancerError::provider("serpapi", "HTTP 401");
        assert_eq!(err.to_string(), "provider serpapi unavailable: HTTP 401");

        let err = EnhancerError::aborted("fetch-target", "timed out");
        assert!(err.to_string().contains("fetch-target"));
    }

    #[test]
    fn recoverable_errors_are_not_fatal() {
        assert!(!EnhancerError::provider("gemini", "no key").is_fatal());
        assert!(!EnhancerError::extraction("https://a.example", "HTTP 500").is_fatal());
        assert!(EnhancerError::TargetNotFound.is_fatal());
        assert!(EnhancerError::Persistence("disk full".into()).is_fatal());
    }
}
