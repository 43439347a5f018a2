//! Configuration module for cmdrx
//!
//! This module handles:
//! - The user config file (`<config_dir>/cmdrx/config.toml`)
//! - Environment overrides
//! - Building the per-call [`ProviderConfig`](crate::ai::ProviderConfig)

mod user_config;

pub use user_config::{LlmConfig, OutputConfig, UserConfig, CONFIG_KEYS};
