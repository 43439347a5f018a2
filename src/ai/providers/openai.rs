//! OpenAI chat completions, and vendors that speak the same protocol (xAI Grok)

use super::{malformed, resolve_endpoint, Credentials, ProviderAdapter, ProviderConfig};
use crate::ai::{AiResult, HttpRequest, Message, PromptPayload, PromptTemplate};
use crate::credentials::Secret;
use serde::{Deserialize, Serialize};

pub(crate) const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl<'a> ChatRequest<'a> {
    pub fn for_payload(model: &'a str, payload: &PromptPayload, config: &ProviderConfig) -> Self {
        Self {
            model,
            messages: vec![
                Message::system(PromptTemplate::system_prompt()),
                Message::user(payload.render_user_prompt()),
            ],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// First choice's message content from a chat completions body
pub(crate) fn chat_completion_text(provider_id: &str, body: &str) -> AiResult<String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| malformed(provider_id, e))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| malformed(provider_id, "no message content in choices"))
}

pub(crate) fn bearer(token: &Secret) -> Secret {
    Secret::new(format!("Bearer {}", token.expose()))
}

/// Bearer-authenticated OpenAI-style endpoint with a fixed credential name
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleAdapter {
    provider_id: &'static str,
    base_url: &'static str,
    default_model: &'static str,
    credential: &'static str,
}

impl OpenAiCompatibleAdapter {
    pub fn new(
        provider_id: &'static str,
        base_url: &'static str,
        default_model: &'static str,
        credential: &'static str,
    ) -> Self {
        Self {
            provider_id,
            base_url,
            default_model,
            credential,
        }
    }

    pub fn openai() -> Self {
        Self::new("openai", "https://api.openai.com/v1", "gpt-4", "openai_api_key")
    }

    pub fn grok() -> Self {
        Self::new("grok", "https://api.x.ai/v1", "grok-beta", "grok_api_key")
    }
}

impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn provider_id(&self) -> &str {
        self.provider_id
    }

    fn build_request(
        &self,
        payload: &PromptPayload,
        config: &ProviderConfig,
        credentials: &Credentials,
    ) -> AiResult<HttpRequest> {
        let base = config.endpoint_override.as_deref().unwrap_or(self.base_url);
        let url = resolve_endpoint(base, CHAT_COMPLETIONS_PATH, config.allow_plaintext)?;
        let key = credentials.require(self.provider_id, self.credential)?;
        let body = ChatRequest::for_payload(config.model_or(self.default_model), payload, config);

        Ok(HttpRequest::post_json(url, &body)?.secret_header("Authorization", bearer(key)))
    }

    fn extract_text(&self, body: &str) -> AiResult<String> {
        chat_completion_text(self.provider_id, body)
    }
}
