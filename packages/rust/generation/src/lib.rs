//! Article rewriting with ordered generative-provider fallback.
//!
//! [`EnhancementChain`] builds one prompt, offers it to each configured
//! [`GenerativeProvider`] in priority order, and appends a uniform references
//! section to the first non-empty completion. When every provider is missing
//! or fails, the deterministic [`compose_template`] output is used instead,
//! so enhancement only fails on a malformed original.

mod anthropic;
mod gemini;
mod openai;
mod prompt;
mod template;

use std::time::Duration;

use async_trait::async_trait;
use enhancer_shared::{
    Article, EnhancerError, LlmConfig, ProviderConfig, ReferenceDocument, Result, resolve_secret,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use prompt::{build_prompt, references_section};
pub use template::compose_template;

/// Provider name reported when the template composer produced the article.
pub const TEMPLATE_PROVIDER: &str = "template";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One interchangeable text-generation backend.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Short name for logs and run summaries.
    fn name(&self) -> &str;

    /// Completion text for `prompt`.
    ///
    /// Transport errors, non-2xx responses, timeouts, and empty completions
    /// all surface as [`EnhancerError::ProviderUnavailable`].
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Client settings
// ---------------------------------------------------------------------------

/// Per-provider request settings.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ClientSettings {
    /// Combine the shared `[llm]` knobs with one provider's section.
    pub fn from_config(llm: &LlmConfig, provider: &ProviderConfig) -> Self {
        Self {
            base_url: provider.base_url.trim_end_matches('/').to_string(),
            model: provider.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            timeout: Duration::from_secs(llm.timeout_secs),
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EnhancerError::Network(format!("failed to build HTTP client: {e}")))
}

/// Send a JSON request and decode the response body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T> {
    // The URL may carry an API key, so it is stripped from transport errors.
    let response = request
        .send()
        .await
        .map_err(|e| EnhancerError::provider(provider, e.without_url().to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = enhancer_shared::truncate_chars(body.trim(), 200);
        return Err(EnhancerError::provider(
            provider,
            format!("HTTP {status}: {detail}"),
        ));
    }

    response
        .json()
        .await
        .map_err(|e| EnhancerError::provider(provider, format!("invalid response: {e}")))
}

/// Reject blank completions so the chain advances past them.
pub(crate) fn non_empty(provider: &str, text: String) -> Result<String> {
    if text.trim().is_empty() {
        Err(EnhancerError::provider(provider, "empty completion"))
    } else {
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// The enhanced article body and the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enhancement {
    pub provider: String,
    pub content: String,
}

/// Ordered generative providers plus the template fallback.
pub struct EnhancementChain {
    providers: Vec<Box<dyn GenerativeProvider>>,
}

impl EnhancementChain {
    pub fn new(providers: Vec<Box<dyn GenerativeProvider>>) -> Self {
        Self { providers }
    }

    /// Construct the providers named in `provider_order` that have a credential.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut providers: Vec<Box<dyn GenerativeProvider>> = Vec::new();

        for name in &config.provider_order {
            let section = match name.as_str() {
                "gemini" => &config.gemini,
                "openai" => &config.openai,
                "anthropic" => &config.anthropic,
                other => {
                    return Err(EnhancerError::config(format!(
                        "unknown generative provider '{other}'"
                    )));
                }
            };

            let Some(api_key) = resolve_secret(&section.api_key_env) else {
                debug!(provider = %name, env = %section.api_key_env, "no API key, provider skipped");
                continue;
            };

            let settings = ClientSettings::from_config(config, section);
            let provider: Box<dyn GenerativeProvider> = match name.as_str() {
                "gemini" => Box::new(GeminiClient::new(api_key, settings)?),
                "openai" => Box::new(OpenAiClient::new(api_key, settings)?),
                _ => Box::new(AnthropicClient::new(api_key, settings)?),
            };
            providers.push(provider);
        }

        Ok(Self::new(providers))
    }

    /// Names of the constructed providers, in the order they are tried.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Rewrite `original` using `references`.
    ///
    /// Fails only when the original has a blank title or content.
    #[instrument(skip_all, fields(article_id = %original.id, references = references.len()))]
    pub async fn enhance(
        &self,
        original: &Article,
        references: &[ReferenceDocument],
    ) -> Result<Enhancement> {
        if !original.is_well_formed() {
            return Err(EnhancerError::validation(format!(
                "article {} has an empty title or content",
                original.id
            )));
        }

        let prompt = build_prompt(original, references);
        for provider in &self.providers {
            match provider.generate(&prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(provider = provider.name(), chars = text.len(), "enhancement generated");
                    return Ok(Enhancement {
                        provider: provider.name().to_string(),
                        content: format!("{text}\n\n{}", references_section(references)),
                    });
                }
                Ok(_) => {
                    warn!(provider = provider.name(), "provider returned an empty completion");
                }
                Err(e) if e.is_fatal() => {
                    error!(provider = provider.name(), error = %e, "generative provider misconfigured, skipping");
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "generative provider failed");
                }
            }
        }

        warn!("no generative provider succeeded, composing from template");
        Ok(Enhancement {
            provider: TEMPLATE_PROVIDER.into(),
            content: compose_template(original, references),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use enhancer_shared::ArticleId;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn article(title: &str, content: &str) -> Article {
        Article {
            id: ArticleId(7),
            title: title.into(),
            content: content.into(),
            author: None,
            url: None,
            published_date: None,
            image_url: None,
            is_enhanced: false,
            original_article_id: None,
            reference_links: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            original_title: None,
        }
    }

    pub(crate) fn reference(title: &str, url: &str) -> ReferenceDocument {
        ReferenceDocument {
            title: title.into(),
            url: url.into(),
            content: format!("Extracted body of {title}."),
        }
    }

    pub(crate) fn settings(base_url: &str) -> ClientSettings {
        ClientSettings {
            base_url: base_url.into(),
            model: "test-model".into(),
            temperature: 0.7,
            max_tokens: 2000,
            timeout: Duration::from_secs(5),
        }
    }

    struct Scripted {
        name: &'static str,
        response: std::result::Result<&'static str, &'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl GenerativeProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .map(String::from)
                .map_err(|reason| EnhancerError::provider(self.name, reason))
        }
    }

    fn scripted(
        name: &'static str,
        response: std::result::Result<&'static str, &'static str>,
    ) -> (Box<dyn GenerativeProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Scripted {
                name,
                response,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    #[tokio::test]
    async fn first_success_gets_references_appended() {
        let (a, _) = scripted("a", Err("HTTP 500"));
        let (b, _) = scripted("b", Ok("# Better article"));
        let (c, c_calls) = scripted("c", Ok("unused"));
        let refs = vec![reference("Ref", "https://ref.example")];

        let out = EnhancementChain::new(vec![a, b, c])
            .enhance(&article("Bots", "Body"), &refs)
            .await
            .expect("enhance");

        assert_eq!(out.provider, "b");
        assert!(out.content.starts_with("# Better article\n\n---\n\n## References"));
        assert!(out.content.ends_with("1. [Ref](https://ref.example)\n"));
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_completion_advances() {
        let (a, _) = scripted("a", Ok("   \n"));
        let (b, _) = scripted("b", Ok("Rewritten"));
        let out = EnhancementChain::new(vec![a, b])
            .enhance(&article("Bots", "Body"), &[])
            .await
            .unwrap();
        assert_eq!(out.provider, "b");
    }

    struct Misconfigured;

    #[async_trait]
    impl GenerativeProvider for Misconfigured {
        fn name(&self) -> &str {
            "misconfigured"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(EnhancerError::config("model name rejected"))
        }
    }

    #[tokio::test]
    async fn misconfigured_provider_is_skipped() {
        assert!(EnhancerError::config("model name rejected").is_fatal());
        let (b, b_calls) = scripted("b", Ok("Rewritten"));
        let out = EnhancementChain::new(vec![Box::new(Misconfigured), b])
            .enhance(&article("Bots", "Body"), &[])
            .await
            .unwrap();
        assert_eq!(out.provider, "b");
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_chain_uses_template() {
        let (a, _) = scripted("a", Err("down"));
        let out = EnhancementChain::new(vec![a])
            .enhance(&article("Bots", "Body text"), &[])
            .await
            .unwrap();
        assert_eq!(out.provider, TEMPLATE_PROVIDER);
        assert!(out.content.starts_with("# Bots\n\n## Introduction"));
    }

    #[tokio::test]
    async fn malformed_original_is_rejected_before_any_call() {
        let (a, a_calls) = scripted("a", Ok("text"));
        let err = EnhancementChain::new(vec![a])
            .enhance(&article("Bots", "  "), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EnhancerError::Validation { .. }));
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unconfigured_chain_still_produces_text() {
        let mut config = LlmConfig::default();
        config.gemini.api_key_env = "ENHANCER_TEST_UNSET_GEMINI".into();
        config.openai.api_key_env = "ENHANCER_TEST_UNSET_OPENAI".into();
        config.anthropic.api_key_env = "ENHANCER_TEST_UNSET_ANTHROPIC".into();

        let chain = EnhancementChain::from_config(&config).expect("chain");
        assert!(chain.provider_names().is_empty());

        let out = chain.enhance(&article("Bots", "Body"), &[]).await.unwrap();
        assert_eq!(out.provider, TEMPLATE_PROVIDER);
        assert!(!out.content.is_empty());
    }

    #[test]
    fn unknown_provider_name_is_config_error() {
        let config = LlmConfig {
            provider_order: vec!["mystery".into()],
            ..Default::default()
        };
        let err = EnhancementChain::from_config(&config).err().expect("error");
        assert!(matches!(err, EnhancerError::Config { .. }));
    }
}
