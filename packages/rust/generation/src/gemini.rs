//! Google Gemini `generateContent` client.

use std::fmt;

use async_trait::async_trait;
use enhancer_shared::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{ClientSettings, GenerativeProvider, http_client, non_empty, send_json};

const PROVIDER: &str = "gemini";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    settings: ClientSettings,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"<redacted>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: String, settings: ClientSettings) -> Result<Self> {
        Ok(Self {
            client: http_client(settings.timeout)?,
            api_key,
            settings,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl GenerativeProvider for GeminiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        );
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        };

        let response: GenerateResponse = send_json(
            PROVIDER,
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body),
        )
        .await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        non_empty(PROVIDER, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::settings;
    use enhancer_shared::EnhancerError;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new("g-key".into(), settings(&server.uri())).expect("client")
    }

    #[tokio::test]
    async fn joins_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .and(query_param("key", "g-key"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"text": "Rewrite this"}]}],
                "generationConfig": {"maxOutputTokens": 2000}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "# Title\n"}, {"text": "Body"}]}}]
            })))
            .mount(&server)
            .await;

        let text = client(&server).generate("Rewrite this").await.expect("generate");
        assert_eq!(text, "# Title\nBody");
    }

    #[tokio::test]
    async fn no_candidates_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = client(&server).generate("p").await.unwrap_err();
        assert!(matches!(err, EnhancerError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn http_error_does_not_leak_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client(&server).generate("p").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("403"));
        assert!(message.contains("quota exceeded"));
        assert!(!message.contains("g-key"));
    }

    #[test]
    fn debug_redacts_key() {
        let client = GeminiClient::new("secret".into(), settings("http://x")).unwrap();
        assert!(!format!("{client:?}").contains("secret"));
    }
}
