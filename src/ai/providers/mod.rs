//! Provider adapters
//!
//! Each adapter turns a [`PromptPayload`] into one vendor-specific HTTP
//! request and pulls the model text back out of the vendor's response body.
//! Sending, retrying and status classification live in [`AiClient`]; parsing
//! the analysis document lives in [`parse_analysis`].

mod anthropic;
mod custom;
mod openai;

pub use anthropic::AnthropicAdapter;
pub use custom::CustomAdapter;
pub(crate) use custom::credential_for;
pub use openai::OpenAiCompatibleAdapter;

use crate::ai::{parse_analysis, AiClient, AiResult, AnalysisError, HttpRequest, PromptPayload};
use crate::credentials::{CredentialName, CredentialRecord, Secret};
use crate::models::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// How the custom endpoint authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    None,
    ApiKey,
    BearerToken,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(AuthMode::None),
            "api_key" => Ok(AuthMode::ApiKey),
            "bearer_token" => Ok(AuthMode::BearerToken),
            other => Err(format!(
                "unknown auth type '{}' (expected none, api_key or bearer_token)",
                other
            )),
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::None => write!(f, "none"),
            AuthMode::ApiKey => write!(f, "api_key"),
            AuthMode::BearerToken => write!(f, "bearer_token"),
        }
    }
}

/// Resolved settings for one analysis call
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider_id: String,
    /// Falls back to the registry default when unset
    pub model: Option<String>,
    pub endpoint_override: Option<String>,
    pub timeout_seconds: u64,
    pub auth_mode: AuthMode,
    /// Header carrying the API key for the custom endpoint (default: bearer `Authorization`)
    pub auth_header: Option<String>,
    /// Accept `http://` endpoints; an explicit risk acknowledgement
    pub allow_plaintext: bool,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model: None,
            endpoint_override: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            auth_mode: AuthMode::None,
            auth_header: None,
            allow_plaintext: false,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Configured model, or `default` when none is set
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(default)
    }
}

/// Credentials resolved for one call, keyed by name
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    records: Vec<CredentialRecord>,
}

impl Credentials {
    pub fn new(records: Vec<CredentialRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, name: &str) -> Option<&Secret> {
        self.records
            .iter()
            .find(|r| r.name.as_str() == name)
            .map(|r| &r.value)
    }

    /// A credential the adapter cannot work without
    pub fn require(&self, provider_id: &str, name: &str) -> AiResult<&Secret> {
        self.get(name)
            .ok_or_else(|| AnalysisError::CredentialsMissing {
                provider_id: provider_id.to_string(),
                missing: vec![CredentialName::new(name)],
            })
    }
}

/// A vendor API behind the uniform analysis contract
pub trait ProviderAdapter {
    fn provider_id(&self) -> &str;

    /// Build the HTTP request; validates the endpoint and attaches auth
    fn build_request(
        &self,
        payload: &PromptPayload,
        config: &ProviderConfig,
        credentials: &Credentials,
    ) -> AiResult<HttpRequest>;

    /// Pull the model's text out of a successful response body
    fn extract_text(&self, body: &str) -> AiResult<String>;

    /// One request/response exchange, parsed into an [`AnalysisResult`]
    fn analyze(
        &self,
        payload: &PromptPayload,
        config: &ProviderConfig,
        credentials: &Credentials,
        client: &AiClient,
    ) -> AiResult<AnalysisResult> {
        let request = self.build_request(payload, config, credentials)?;
        debug!("Sending analysis request to {} ({})", self.provider_id(), request.url);
        let body = client.execute(&request, config.timeout())?;
        let text = self.extract_text(&body)?;
        parse_analysis(&text)
    }
}

/// Join `path` onto `base`, enforcing HTTPS unless plaintext is allowed.
///
/// A base that already ends in `path` is used as is.
pub fn resolve_endpoint(base: &str, path: &str, allow_plaintext: bool) -> AiResult<String> {
    let url = Url::parse(base.trim())
        .map_err(|e| AnalysisError::InvalidConfig(format!("invalid endpoint '{}': {}", base, e)))?;

    match url.scheme() {
        "https" => {}
        "http" if allow_plaintext => {
            warn!(
                "Using plaintext HTTP endpoint {} (allow_plaintext is set)",
                url.host_str().unwrap_or("<none>")
            );
        }
        "http" => {
            return Err(AnalysisError::InvalidConfig(format!(
                "endpoint '{}' is not HTTPS; set llm.allow_plaintext = true to accept plaintext for a local target",
                base
            )))
        }
        other => {
            return Err(AnalysisError::InvalidConfig(format!(
                "unsupported endpoint scheme '{}'",
                other
            )))
        }
    }

    let trimmed = url.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if trimmed.ends_with(path) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{}/{}", trimmed, path))
    }
}

pub(crate) fn malformed(provider_id: &str, detail: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::MalformedResponse(format!("{} response: {}", provider_id, detail))
}
