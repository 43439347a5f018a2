//! Operator-supplied OpenAI-compatible endpoint (Ollama, vLLM, LM Studio, gateways)

use super::openai::{bearer, chat_completion_text, ChatRequest, CHAT_COMPLETIONS_PATH};
use super::{resolve_endpoint, AuthMode, Credentials, ProviderAdapter, ProviderConfig};
use crate::ai::{AiResult, AnalysisError, HttpRequest, PromptPayload};

pub const API_KEY_CREDENTIAL: &str = "custom_api_key";
pub const BEARER_TOKEN_CREDENTIAL: &str = "custom_bearer_token";

/// Credential the custom endpoint needs under `mode`, if any
pub fn credential_for(mode: AuthMode) -> Option<&'static str> {
    match mode {
        AuthMode::None => None,
        AuthMode::ApiKey => Some(API_KEY_CREDENTIAL),
        AuthMode::BearerToken => Some(BEARER_TOKEN_CREDENTIAL),
    }
}

#[derive(Debug, Clone)]
pub struct CustomAdapter {
    default_model: &'static str,
}

impl Default for CustomAdapter {
    fn default() -> Self {
        Self::new("llama2")
    }
}

impl CustomAdapter {
    pub fn new(default_model: &'static str) -> Self {
        Self { default_model }
    }
}

impl ProviderAdapter for CustomAdapter {
    fn provider_id(&self) -> &str {
        "custom"
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
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| {
                AnalysisError::InvalidConfig(
                    "custom provider requires llm.base_url".to_string(),
                )
            })?;
        let url = resolve_endpoint(base, CHAT_COMPLETIONS_PATH, config.allow_plaintext)?;
        let body = ChatRequest::for_payload(config.model_or(self.default_model), payload, config);
        let request = HttpRequest::post_json(url, &body)?;

        let request = match config.auth_mode {
            AuthMode::None => request,
            AuthMode::ApiKey => {
                let key = credentials.require("custom", API_KEY_CREDENTIAL)?;
                match config.auth_header.as_deref().filter(|h| !h.trim().is_empty()) {
                    Some(header) => request.secret_header(header.trim(), key.clone()),
                    None => request.secret_header("Authorization", bearer(key)),
                }
            }
            AuthMode::BearerToken => {
                let token = credentials.require("custom", BEARER_TOKEN_CREDENTIAL)?;
                request.secret_header("Authorization", bearer(token))
            }
        };
        Ok(request)
    }

    fn extract_text(&self, body: &str) -> AiResult<String> {
        chat_completion_text("custom", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::SystemContext;
    use crate::credentials::{Backend, CredentialRecord, Secret};

    fn payload() -> PromptPayload {
        PromptPayload::new(SystemContext::detect(), "uptime", "load average: 9.0", Some(0))
    }

    fn config(mode: AuthMode) -> ProviderConfig {
        let mut config = ProviderConfig::new("custom");
        config.endpoint_override = Some("https://llm.corp.example/v1".into());
        config.auth_mode = mode;
        config
    }

    fn creds() -> Credentials {
        Credentials::new(vec![
            CredentialRecord {
                name: API_KEY_CREDENTIAL.into(),
                value: Secret::new("key-123"),
                source: Backend::File,
            },
            CredentialRecord {
                name: BEARER_TOKEN_CREDENTIAL.into(),
                value: Secret::new("tok-456"),
                source: Backend::File,
            },
        ])
    }

    #[test]
    fn test_base_url_required() {
        let err = CustomAdapter::default()
            .build_request(&payload(), &ProviderConfig::new("custom"), &creds())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
    }

    #[test]
    fn test_no_auth() {
        let request = CustomAdapter::default()
            .build_request(&payload(), &config(AuthMode::None), &Credentials::default())
            .unwrap();
        assert_eq!(request.url, "https://llm.corp.example/v1/chat/completions");
        assert!(request.headers.is_empty());
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["model"], "llama2");
    }

    #[test]
    fn test_api_key_in_custom_header() {
        let mut config = config(AuthMode::ApiKey);
        config.auth_header = Some("X-API-Key".into());
        let request = CustomAdapter::default()
            .build_request(&payload(), &config, &creds())
            .unwrap();
        assert_eq!(request.header_value("x-api-key"), Some("key-123"));
        assert_eq!(request.header_value("authorization"), None);
    }

    #[test]
    fn test_api_key_defaults_to_bearer() {
        let request = CustomAdapter::default()
            .build_request(&payload(), &config(AuthMode::ApiKey), &creds())
            .unwrap();
        assert_eq!(request.header_value("authorization"), Some("Bearer key-123"));
    }

    #[test]
    fn test_bearer_token() {
        let request = CustomAdapter::default()
            .build_request(&payload(), &config(AuthMode::BearerToken), &creds())
            .unwrap();
        assert_eq!(request.header_value("authorization"), Some("Bearer tok-456"));
    }

    #[test]
    fn test_credential_for_mode() {
        assert_eq!(credential_for(AuthMode::None), None);
        assert_eq!(credential_for(AuthMode::ApiKey), Some("custom_api_key"));
        assert_eq!(
            credential_for(AuthMode::BearerToken),
            Some("custom_bearer_token")
        );
    }
}
