//! Anthropic messages API

use super::{malformed, resolve_endpoint, Credentials, ProviderAdapter, ProviderConfig};
use crate::ai::{AiResult, HttpRequest, Message, PromptPayload, PromptTemplate};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const MESSAGES_PATH: &str = "messages";
const API_VERSION: &str = "2023-06-01";
const CREDENTIAL: &str = "anthropic_api_key";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message>,
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

#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    default_model: &'static str,
}

impl Default for AnthropicAdapter {
    fn default() -> Self {
        Self::new("claude-3-sonnet-20240229")
    }
}

impl AnthropicAdapter {
    pub fn new(default_model: &'static str) -> Self {
        Self { default_model }
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    fn build_request(
        &self,
        payload: &PromptPayload,
        config: &ProviderConfig,
        credentials: &Credentials,
    ) -> AiResult<HttpRequest> {
        let base = config
            .endpoint_override
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        let url = resolve_endpoint(base, MESSAGES_PATH, config.allow_plaintext)?;
        let key = credentials.require("anthropic", CREDENTIAL)?;

        let body = MessagesRequest {
            model: config.model_or(self.default_model),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system: PromptTemplate::system_prompt(),
            messages: vec![Message::user(payload.render_user_prompt())],
        };

        Ok(HttpRequest::post_json(url, &body)?
            .secret_header("x-api-key", key.clone())
            .header("anthropic-version", API_VERSION))
    }

    /// Text blocks joined in order; other block types are skipped
    fn extract_text(&self, body: &str) -> AiResult<String> {
        let response: MessagesResponse =
            serde_json::from_str(body).map_err(|e| malformed("anthropic", e))?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(malformed("anthropic", "no text content"));
        }
        Ok(text)
    }
}
