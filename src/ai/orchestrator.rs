//! Single entry point for analysing command output

use crate::ai::{
    AiClient, AiResult, AnalysisError, Credentials, PromptPayload, ProviderConfig,
    ProviderRegistry, SystemContext,
};
use crate::credentials::CredentialResolver;
use crate::models::AnalysisResult;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const CONNECTION_CHECK_COMMAND: &str = "echo 'cmdrx connection check'";
const CONNECTION_CHECK_OUTPUT: &str = "STDOUT:\ncmdrx connection check";

/// Validates the provider, resolves its credentials, and dispatches to the
/// right adapter. Nothing here branches on the provider id.
pub struct Analyzer {
    registry: ProviderRegistry,
    resolver: CredentialResolver,
    client: AiClient,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Built-in providers, default credential backends, ureq transport
    pub fn new() -> Self {
        Self::with_parts(
            ProviderRegistry::builtin(),
            CredentialResolver::with_default_stores(),
            AiClient::new(),
        )
    }

    pub fn with_parts(
        registry: ProviderRegistry,
        resolver: CredentialResolver,
        client: AiClient,
    ) -> Self {
        Self {
            registry,
            resolver,
            client,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    /// Resolve every credential `config`'s provider needs.
    ///
    /// Fails with `CredentialsMissing` listing only the names no backend held.
    pub fn resolve_credentials(&self, config: &ProviderConfig) -> AiResult<Credentials> {
        let spec = self.registry.lookup(&config.provider_id)?;

        let mut records = Vec::new();
        let mut missing = Vec::new();
        for name in spec.required_credentials(config) {
            match self.resolver.resolve(&name) {
                Ok(record) => records.push(record),
                Err(failed) => missing.push(failed.name),
            }
        }

        if !missing.is_empty() {
            return Err(AnalysisError::CredentialsMissing {
                provider_id: config.provider_id.clone(),
                missing,
            });
        }
        Ok(Credentials::new(records))
    }

    /// Analyse one command's output with the configured provider
    pub fn analyze(
        &self,
        raw_output: &str,
        command_invoked: &str,
        exit_code: Option<i32>,
        config: &ProviderConfig,
    ) -> AiResult<AnalysisResult> {
        let spec = self.registry.lookup(&config.provider_id)?;
        let credentials = self.resolve_credentials(config)?;

        let payload = PromptPayload::new(
            SystemContext::detect(),
            command_invoked,
            raw_output,
            exit_code,
        );

        let model = config.model_or(spec.default_model);
        info!("Analyzing output of '{}' with {} ({})", command_invoked, spec.id, model);
        let start = Instant::now();

        let result = spec
            .adapter()
            .analyze(&payload, config, &credentials, &self.client);

        debug!("Analysis finished in {:.2?}", start.elapsed());
        result
    }

    /// Live round trip with a canned, successful command.
    ///
    /// Exercises credentials, endpoint, auth and response parsing; returns
    /// the elapsed time.
    pub fn check_connection(&self, config: &ProviderConfig) -> AiResult<Duration> {
        let start = Instant::now();
        self.analyze(
            CONNECTION_CHECK_OUTPUT,
            CONNECTION_CHECK_COMMAND,
            Some(0),
            config,
        )?;
        Ok(start.elapsed())
    }
}
