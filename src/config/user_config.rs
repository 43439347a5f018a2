//! User-level configuration for cmdrx
//!
//! Supports loading config from:
//! - ~/.config/cmdrx/config.toml
//! - Environment variables (`CMDRX_PROVIDER`, `CMDRX_MODEL`, `CMDRX_BASE_URL`)
//!
//! API keys never live here; see [`crate::credentials`].

use crate::ai::{AuthMode, ProviderConfig, ProviderRegistry};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider id: openai, anthropic, grok, custom
    pub provider: String,

    /// Model name; the provider's default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Endpoint override (required for custom)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Custom endpoint auth: none, api_key, bearer_token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<AuthMode>,

    /// Header name for the custom endpoint's API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_header: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Accept http:// endpoints (local/on-prem only)
    pub allow_plaintext: bool,

    pub max_tokens: u32,

    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            base_url: None,
            auth_type: None,
            auth_header: None,
            timeout: 30,
            allow_plaintext: false,
            max_tokens: 2000,
            temperature: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where analysis logs and fix scripts go; `~` is expanded
    pub log_directory: String,

    /// Write a fix script when the analysis suggests fixes
    pub auto_fix_scripts: bool,

    /// Seconds before a wrapped command is killed
    pub command_timeout: u64,

    pub verbose: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_directory: "~/cmdrx_logs".to_string(),
            auto_fix_scripts: true,
            command_timeout: 30,
            verbose: false,
        }
    }
}

/// Keys accepted by `cmdrx config set`
pub const CONFIG_KEYS: &[&str] = &[
    "llm.provider",
    "llm.model",
    "llm.base_url",
    "llm.auth_type",
    "llm.auth_header",
    "llm.timeout",
    "llm.allow_plaintext",
    "llm.max_tokens",
    "llm.temperature",
    "output.log_directory",
    "output.auto_fix_scripts",
    "output.command_timeout",
    "output.verbose",
];

impl UserConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. User config (~/.config/cmdrx/config.toml)
    /// 3. Built-in defaults
    ///
    /// A malformed file is reported and ignored.
    pub fn load() -> Self {
        let mut config = match Self::user_config_path() {
            Some(path) => Self::load_or_default(&path),
            None => UserConfig::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Read `path`, falling back to defaults when it is missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(Some(config)) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Ok(None) => UserConfig::default(),
            Err(e) => {
                warn!("Ignoring config file {}: {:#}", path.display(), e);
                UserConfig::default()
            }
        }
    }

    /// `Ok(None)` when the file does not exist
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?;
        Ok(Some(config))
    }

    /// Apply `CMDRX_PROVIDER`, `CMDRX_MODEL` and `CMDRX_BASE_URL`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(provider) = non_empty("CMDRX_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = non_empty("CMDRX_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(url) = non_empty("CMDRX_BASE_URL") {
            self.llm.base_url = Some(url);
        }
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cmdrx").join("config.toml"))
    }

    /// Settings for one analysis call
    pub fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::new(self.llm.provider.clone());
        config.model = self.llm.model.clone().filter(|m| !m.trim().is_empty());
        config.endpoint_override = self.llm.base_url.clone().filter(|u| !u.trim().is_empty());
        config.timeout_seconds = self.llm.timeout;
        config.auth_mode = self.llm.auth_type.unwrap_or_default();
        config.auth_header = self.llm.auth_header.clone();
        config.allow_plaintext = self.llm.allow_plaintext;
        config.max_tokens = self.llm.max_tokens;
        config.temperature = self.llm.temperature;
        config
    }

    /// Log directory with `~` expanded
    pub fn log_directory(&self) -> PathBuf {
        expand_home(&self.output.log_directory)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Set one dotted key, validating the value
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());

        match key {
            "llm.provider" => {
                ProviderRegistry::builtin().lookup(value)?;
                self.llm.provider = value.to_string();
            }
            "llm.model" => self.llm.model = optional(value),
            "llm.base_url" => {
                if !value.is_empty() {
                    url::Url::parse(value)
                        .with_context(|| format!("'{}' is not a valid URL", value))?;
                }
                self.llm.base_url = optional(value);
            }
            "llm.auth_type" => {
                self.llm.auth_type = Some(value.parse().map_err(anyhow::Error::msg)?)
            }
            "llm.auth_header" => self.llm.auth_header = optional(value),
            "llm.timeout" => self.llm.timeout = parse_positive(key, value)?,
            "llm.allow_plaintext" => self.llm.allow_plaintext = parse_bool(key, value)?,
            "llm.max_tokens" => {
                self.llm.max_tokens = u32::try_from(parse_positive(key, value)?)
                    .with_context(|| format!("{} must be at most {}", key, u32::MAX))?
            }
            "llm.temperature" => {
                let t: f32 = value
                    .parse()
                    .with_context(|| format!("{} must be a number", key))?;
                if !(0.0..=2.0).contains(&t) {
                    bail!("{} must be between 0.0 and 2.0", key);
                }
                self.llm.temperature = t;
            }
            "output.log_directory" => {
                if value.is_empty() {
                    bail!("{} cannot be empty", key);
                }
                self.output.log_directory = value.to_string();
            }
            "output.auto_fix_scripts" => self.output.auto_fix_scripts = parse_bool(key, value)?,
            "output.command_timeout" => self.output.command_timeout = parse_positive(key, value)?,
            "output.verbose" => self.output.verbose = parse_bool(key, value)?,
            _ => bail!(
                "Unknown config key '{}'. Valid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Initialize user config directory and write a commented default config
    pub fn init_user_config() -> Result<PathBuf> {
        let config_path = Self::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Self::init_at(&config_path)?;
        Ok(config_path)
    }

    /// Returns false if a config already existed
    pub fn init_at(config_path: &Path) -> Result<bool> {
        if config_path.exists() {
            return Ok(false);
        }
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let example = r#"# cmdrx configuration
#
# API keys are NOT stored here. Use one of:
#   cmdrx config set-credential openai_api_key   (secret store, file fallback)
#   export CMDRX_OPENAI_API_KEY=...

[llm]
# openai, anthropic, grok or custom
provider = "openai"
# model = "gpt-4"
# Custom endpoint (Ollama, vLLM, gateways)
# base_url = "http://localhost:11434/v1"
# auth_type = "none"          # none, api_key, bearer_token
# auth_header = "X-API-Key"   # header for api_key auth, default Authorization: Bearer
timeout = 30
# Required for http:// endpoints; traffic and keys are sent unencrypted
allow_plaintext = false
max_tokens = 2000
temperature = 0.1

[output]
log_directory = "~/cmdrx_logs"
auto_fix_scripts = true
command_timeout = 30
verbose = false
"#;
        std::fs::write(config_path, example)?;
        Ok(true)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("{} must be true or false", key),
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    let n: u64 = value
        .parse()
        .with_context(|| format!("{} must be a positive integer", key))?;
    if n == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(n)
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = UserConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.timeout, 30);
        assert!(!config.llm.allow_plaintext);
        assert!(config.output.auto_fix_scripts);
        assert_eq!(config.output.command_timeout, 30);
    }

    #[test]
    fn test_toml_parsing_custom_provider() {
        let toml_str = r#"
[llm]
provider = "custom"
model = "llama3"
base_url = "http://localhost:11434/v1"
auth_type = "bearer_token"
allow_plaintext = true

[output]
auto_fix_scripts = false
"#;
        let config: UserConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, "custom");
        assert_eq!(config.llm.auth_type, Some(AuthMode::BearerToken));
        assert_eq!(config.llm.timeout, 30);
        assert!(!config.output.auto_fix_scripts);
        assert_eq!(config.output.log_directory, "~/cmdrx_logs");

        let provider = config.provider_config();
        assert_eq!(provider.provider_id, "custom");
        assert_eq!(provider.model.as_deref(), Some("llama3"));
        assert_eq!(
            provider.endpoint_override.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(provider.auth_mode, AuthMode::BearerToken);
        assert!(provider.allow_plaintext);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config: UserConfig = toml::from_str("[llm]\nprovider = \"openai\"\n").unwrap();
        let env: HashMap<&str, &str> =
            [("CMDRX_PROVIDER", "grok"), ("CMDRX_MODEL", ""), ("CMDRX_BASE_URL", "https://x")]
                .into_iter()
                .collect();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.llm.provider, "grok");
        assert_eq!(config.llm.model, None);
        assert_eq!(config.llm.base_url.as_deref(), Some("https://x"));
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nprovider = ").unwrap();

        assert!(UserConfig::from_file(&path).is_err());
        assert_eq!(UserConfig::load_or_default(&path), UserConfig::default());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(UserConfig::from_file(&dir.path().join("nope.toml"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_set_value_validates() {
        let mut config = UserConfig::default();
        config.set_value("llm.provider", "anthropic").unwrap();
        assert_eq!(config.llm.provider, "anthropic");

        assert!(config.set_value("llm.provider", "bard").is_err());
        assert!(config.set_value("llm.timeout", "0").is_err());
        assert!(config.set_value("llm.timeout", "abc").is_err());
        assert!(config.set_value("llm.auth_type", "basic").is_err());
        assert!(config.set_value("output.verbose", "maybe").is_err());
        assert!(config.set_value("llm.api_key", "sk").is_err());

        config.set_value("llm.allow_plaintext", "yes").unwrap();
        assert!(config.llm.allow_plaintext);
        config.set_value("llm.model", "").unwrap();
        assert_eq!(config.llm.model, None);
    }

    #[test]
    fn test_max_tokens_out_of_range_rejected() {
        let mut config = UserConfig::default();
        let err = config.set_value("llm.max_tokens", "5000000000").unwrap_err();
        assert!(err.to_string().contains("llm.max_tokens"));
        assert_eq!(config.llm.max_tokens, 2000);

        config.set_value("llm.max_tokens", "4096").unwrap();
        assert_eq!(config.llm.max_tokens, 4096);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmdrx").join("config.toml");
        let mut config = UserConfig::default();
        config.set_value("llm.provider", "grok").unwrap();
        config.set_value("output.command_timeout", "90").unwrap();
        config.save_to(&path).unwrap();

        let reloaded = UserConfig::from_file(&path).unwrap().unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_init_writes_parseable_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(UserConfig::init_at(&path).unwrap());
        assert!(!UserConfig::init_at(&path).unwrap());
        let config = UserConfig::from_file(&path).unwrap().unwrap();
        assert_eq!(config, UserConfig::default());
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/cmdrx_logs"), home.join("cmdrx_logs"));
        }
        assert_eq!(expand_home("/var/log/cmdrx"), PathBuf::from("/var/log/cmdrx"));
    }
}
