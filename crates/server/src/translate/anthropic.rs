//! Translation engine backed by the Anthropic Messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{language_name, TranslationEngine, TranslationError};
use crate::config::TranslationConfig;

const API_VERSION: &str = "2023-06-01";
const DETECT_MAX_TOKENS: u32 = 50;
const TRANSLATE_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<PromptMessage>,
}

#[derive(Debug, Serialize)]
struct PromptMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct AnthropicEngine {
    client: Client,
    config: TranslationConfig,
}

impl AnthropicEngine {
    pub fn new(config: TranslationConfig) -> Result<Self, TranslationError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TranslationError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn complete(&self, prompt: String, max_tokens: u32) -> Result<String, TranslationError> {
        let url = format!("{}/v1/messages", self.config.api_url.trim_end_matches('/'));
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens,
            messages: vec![PromptMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(TranslationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TranslationError::Network(e.to_string()))?;
        first_text_block(&body)
    }
}

/// Pull the first text block out of a Messages API response body.
fn first_text_block(body: &str) -> Result<String, TranslationError> {
    let parsed: MessagesResponse =
        serde_json::from_str(body).map_err(|e| TranslationError::Malformed(e.to_string()))?;
    parsed
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| TranslationError::Malformed("no text content".to_string()))
}

fn detect_prompt(text: &str) -> String {
    format!(
        "Detect the language of this text and respond with ONLY the ISO 639-1 language code \
         (e.g., \"en\" for English, \"es\" for Spanish, \"so\" for Somali, \"ar\" for Arabic). Text: \"{}\"",
        text
    )
}

fn translate_prompt(text: &str, source: &str, target: &str) -> String {
    format!(
        "Translate this text from {} to {}. Respond with ONLY the translated text, no explanations \
         or additional context. Text to translate: \"{}\"",
        language_name(source),
        language_name(target),
        text
    )
}

#[async_trait]
impl TranslationEngine for AnthropicEngine {
    async fn detect_language(&self, text: &str) -> Result<String, TranslationError> {
        self.complete(detect_prompt(text), DETECT_MAX_TOKENS).await
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        self.complete(translate_prompt(text, source, target), TRANSLATE_MAX_TOKENS)
            .await
    }
}
