//! Anthropic Messages API client.

use std::fmt;

use async_trait::async_trait;
use enhancer_shared::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{ClientSettings, GenerativeProvider, http_client, non_empty, send_json};

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    settings: ClientSettings,
}

impl fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("api_key", &"<redacted>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl AnthropicClient {
    pub fn new(api_key: String, settings: ClientSettings) -> Result<Self> {
        Ok(Self {
            client: http_client(settings.timeout)?,
            api_key,
            settings,
        })
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl GenerativeProvider for AnthropicClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.settings.base_url);
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response: MessagesResponse = send_json(
            PROVIDER,
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&body),
        )
        .await?;

        let text = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<String>();
        non_empty(PROVIDER, text)
    }
}
