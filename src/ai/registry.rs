//! Static table of supported providers
//!
//! Adding a provider means one adapter and one entry in [`BUILTIN`]; nothing
//! else branches on the provider id.

use crate::ai::providers::credential_for;
use crate::ai::{
    AiResult, AnalysisError, AnthropicAdapter, CustomAdapter, OpenAiCompatibleAdapter,
    ProviderAdapter, ProviderConfig,
};
use crate::credentials::CredentialName;

/// Which credentials a provider needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPolicy {
    /// Always these names, in order
    Required(&'static [&'static str]),
    /// Chosen by the configured auth mode (custom endpoint)
    ByAuthMode,
}

pub struct ProviderSpec {
    pub id: &'static str,
    pub display_name: &'static str,
    pub default_model: &'static str,
    /// `None` when the operator must supply a base URL
    pub default_base_url: Option<&'static str>,
    pub credentials: CredentialPolicy,
    factory: fn() -> Box<dyn ProviderAdapter>,
}

impl ProviderSpec {
    pub fn adapter(&self) -> Box<dyn ProviderAdapter> {
        (self.factory)()
    }

    /// Credential names to resolve before calling this provider
    pub fn required_credentials(&self, config: &ProviderConfig) -> Vec<CredentialName> {
        match self.credentials {
            CredentialPolicy::Required(names) => {
                names.iter().map(|n| CredentialName::new(*n)).collect()
            }
            CredentialPolicy::ByAuthMode => credential_for(config.auth_mode)
                .map(CredentialName::new)
                .into_iter()
                .collect(),
        }
    }
}

impl std::fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("id", &self.id)
            .field("default_model", &self.default_model)
            .field("credentials", &self.credentials)
            .finish()
    }
}

fn openai() -> Box<dyn ProviderAdapter> {
    Box::new(OpenAiCompatibleAdapter::openai())
}

fn anthropic() -> Box<dyn ProviderAdapter> {
    Box::new(AnthropicAdapter::default())
}

fn grok() -> Box<dyn ProviderAdapter> {
    Box::new(OpenAiCompatibleAdapter::grok())
}

fn custom() -> Box<dyn ProviderAdapter> {
    Box::new(CustomAdapter::default())
}

static BUILTIN: &[ProviderSpec] = &[
    ProviderSpec {
        id: "openai",
        display_name: "OpenAI",
        default_model: "gpt-4",
        default_base_url: Some("https://api.openai.com/v1"),
        credentials: CredentialPolicy::Required(&["openai_api_key"]),
        factory: openai,
    },
    ProviderSpec {
        id: "anthropic",
        display_name: "Anthropic",
        default_model: "claude-3-sonnet-20240229",
        default_base_url: Some("https://api.anthropic.com/v1"),
        credentials: CredentialPolicy::Required(&["anthropic_api_key"]),
        factory: anthropic,
    },
    ProviderSpec {
        id: "grok",
        display_name: "xAI Grok",
        default_model: "grok-beta",
        default_base_url: Some("https://api.x.ai/v1"),
        credentials: CredentialPolicy::Required(&["grok_api_key"]),
        factory: grok,
    },
    ProviderSpec {
        id: "custom",
        display_name: "Custom OpenAI-compatible endpoint",
        default_model: "llama2",
        default_base_url: None,
        credentials: CredentialPolicy::ByAuthMode,
        factory: custom,
    },
];

/// Lookup table from provider id to [`ProviderSpec`]
#[derive(Debug, Clone, Copy)]
pub struct ProviderRegistry {
    specs: &'static [ProviderSpec],
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderRegistry {
    pub fn builtin() -> Self {
        Self { specs: BUILTIN }
    }

    /// Fails with `UnknownProvider` for unregistered ids; does no I/O
    pub fn lookup(&self, provider_id: &str) -> AiResult<&'static ProviderSpec> {
        self.specs
            .iter()
            .find(|s| s.id == provider_id)
            .ok_or_else(|| AnalysisError::UnknownProvider {
                provider_id: provider_id.to_string(),
            })
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> {
        self.specs.iter().map(|s| s.id)
    }
}
