//! OpenAI chat completions client.

use std::fmt;

use async_trait::async_trait;
use enhancer_shared::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{ClientSettings, GenerativeProvider, http_client, non_empty, send_json};

const PROVIDER: &str = "openai";

const SYSTEM_PROMPT: &str = "You are a professional content writer. Enhance articles by improving their formatting, structure, and content quality while maintaining the original message.";

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    settings: ClientSettings,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &"<redacted>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(api_key: String, settings: ClientSettings) -> Result<Self> {
        Ok(Self {
            client: http_client(settings.timeout)?,
            api_key,
            settings,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl GenerativeProvider for OpenAiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.settings.base_url);
        let body = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response: ChatResponse = send_json(
            PROVIDER,
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body),
        )
        .await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        non_empty(PROVIDER, text)
    }
}
