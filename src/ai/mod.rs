//! LLM-backed command output analysis
//!
//! This module turns a captured command output into a structured
//! [`AnalysisResult`](crate::models::AnalysisResult) using one of several LLM
//! providers. Keys are BYOK and resolved at call time through
//! [`CredentialResolver`](crate::credentials::CredentialResolver).
//!
//! # Providers
//!
//! - `openai`: OpenAI chat completions (`openai_api_key`)
//! - `anthropic`: Anthropic messages API (`anthropic_api_key`)
//! - `grok`: xAI, OpenAI-compatible (`grok_api_key`)
//! - `custom`: any OpenAI-compatible endpoint (`custom_api_key` or
//!   `custom_bearer_token`, depending on `auth_type`)
//!
//! # Example
//!
//! ```rust,ignore
//! use cmdrx::ai::{Analyzer, ProviderConfig};
//!
//! let analyzer = Analyzer::new();
//! let config = ProviderConfig::new("openai");
//! let result = analyzer.analyze(&output, "systemctl status nginx", Some(3), &config)?;
//! ```

mod client;
mod orchestrator;
mod prompts;
mod providers;
mod registry;
mod response;

pub use client::{
    AiClient, HeaderValue, HttpRequest, HttpResponse, Message, RetryPolicy, Role, Transport,
    TransportError, UreqTransport,
};
pub use orchestrator::Analyzer;
pub use prompts::{PromptPayload, PromptTemplate, SystemContext};
pub use providers::{
    resolve_endpoint, AnthropicAdapter, AuthMode, Credentials, CustomAdapter,
    OpenAiCompatibleAdapter, ProviderAdapter, ProviderConfig,
};
pub use registry::{CredentialPolicy, ProviderRegistry, ProviderSpec};
pub use response::parse_analysis;

use crate::credentials::CredentialName;
use thiserror::Error;

/// Errors returned by an analysis call.
///
/// Display text never includes credential values; provider error bodies are
/// scrubbed of every secret sent with the request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Unknown provider '{provider_id}'")]
    UnknownProvider { provider_id: String },

    #[error("Missing credentials for provider '{provider_id}': {}", join_names(.missing))]
    CredentialsMissing {
        provider_id: String,
        missing: Vec<CredentialName>,
    },

    #[error("Authentication failed (HTTP {status}): {message}")]
    AuthenticationFailed { status: u16, message: String },

    #[error("Invalid request (HTTP {status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("Provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn join_names(names: &[CredentialName]) -> String {
    names
        .iter()
        .map(CredentialName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type AiResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_missing_lists_names() {
        let err = AnalysisError::CredentialsMissing {
            provider_id: "custom".into(),
            missing: vec!["custom_api_key".into(), "custom_bearer_token".into()],
        };
        assert_eq!(
            err.to_string(),
            "Missing credentials for provider 'custom': custom_api_key, custom_bearer_token"
        );
    }
}
