//! CLI command definitions and handlers

mod analyze;
mod capture;
mod doctor;

use crate::ai::{AnalysisError, ProviderRegistry};
use crate::config::{UserConfig, CONFIG_KEYS};
use crate::credentials::{
    CredentialName, CredentialResolver, EnvStore, Secret, StoreError, KNOWN_CREDENTIALS,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;

pub use analyze::AnalyzeOptions;

/// CmdRx - AI diagnosis for command output
#[derive(Parser, Debug)]
#[command(name = "cmdrx")]
#[command(
    version,
    about = "Analyze command output with an LLM and get troubleshooting steps and fix scripts",
    long_about = "CmdRx runs a command (or reads piped output), sends the output to a configured \
LLM provider for diagnosis, and prints issues, troubleshooting steps and suggested fixes.\n\n\
Suggested fixes are written to a reviewable script; cmdrx never executes them.\n\n\
Providers: openai, anthropic, grok, custom (any OpenAI-compatible endpoint). \
API keys are read from the OS secret store, CMDRX_* environment variables, or \
a permission-restricted credentials file, in that order.",
    after_help = "\
Examples:
  cmdrx systemctl status nginx          Run a command and analyze its output
  journalctl -u nginx -n 50 | cmdrx     Analyze piped output
  cmdrx --provider anthropic df -h      Use a different provider for one run
  cmdrx config set-credential openai_api_key
  cmdrx doctor                          Check configuration and credentials",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Show progress and debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Directory for analysis logs and fix scripts (default: output.log_directory)
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Analyze and log, but do not generate a fix script
    #[arg(long)]
    pub dry_run: bool,

    /// Do not write a log file or fix script
    #[arg(long)]
    pub no_save: bool,

    /// LLM provider for this run (openai, anthropic, grok, custom)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model for this run
    #[arg(long)]
    pub model: Option<String>,

    /// Command to run and analyze; omit to read piped input
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,

    #[command(subcommand)]
    pub subcommand: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration and stored credentials
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check configuration, endpoint, credentials and the log directory
    Doctor {
        /// Also send a live test request to the provider
        #[arg(long)]
        connect: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Initialize config file with example settings
    Init,
    /// Show current config and paths
    Show,
    /// Set a config value
    Set {
        /// Config key (e.g., llm.provider)
        key: String,
        /// Value to set
        value: String,
    },
    /// Store a credential; the value is read from stdin
    SetCredential {
        /// Credential name (e.g., openai_api_key)
        name: String,
    },
    /// Delete a stored credential from every writable backend
    DeleteCredential {
        /// Credential name (e.g., openai_api_key)
        name: String,
    },
}

impl Cli {
    /// Tracing filter directive for `--log-level` / `--verbose`
    pub fn log_directive(&self) -> String {
        let level = if self.verbose && matches!(self.log_level.as_str(), "error" | "warn" | "info") {
            "debug"
        } else {
            self.log_level.as_str()
        };
        format!("cmdrx={}", level)
    }

    fn apply_overrides(&self, config: &mut UserConfig) {
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if self.verbose {
            config.output.verbose = true;
        }
    }
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let mut config = UserConfig::load();
    cli.apply_overrides(&mut config);

    match cli.subcommand {
        Some(Commands::Config { action }) => run_config_action(action),
        Some(Commands::Doctor { connect }) => doctor::run(&config, connect),
        None => {
            let opts = AnalyzeOptions {
                command: cli.command,
                log_dir: cli.log_dir,
                dry_run: cli.dry_run,
                no_save: cli.no_save,
                verbose: config.output.verbose,
            };
            analyze::run(&opts, &config)
        }
    }
}

/// One-line hint for errors a user can fix themselves
pub fn hint_for(error: &anyhow::Error) -> Option<String> {
    match error.downcast_ref::<AnalysisError>()? {
        AnalysisError::UnknownProvider { .. } => Some(format!(
            "Valid providers: {}. Set one with: cmdrx config set llm.provider <id>",
            ProviderRegistry::builtin().ids().collect::<Vec<_>>().join(", ")
        )),
        AnalysisError::CredentialsMissing { missing, .. } => missing.first().map(|name| {
            format!(
                "Store it with: cmdrx config set-credential {}  (or export {})",
                name,
                EnvStore::var_name(name)
            )
        }),
        AnalysisError::AuthenticationFailed { .. } => {
            Some("Check the stored API key; run: cmdrx doctor".to_string())
        }
        AnalysisError::InvalidConfig(_) => {
            Some("Review settings with: cmdrx config show".to_string())
        }
        _ => None,
    }
}

fn run_config_action(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = UserConfig::init_user_config()?;
            println!("{} Config initialized at: {}", style("✓").green(), path.display());
            println!("\nStore your API key (not in the config file):");
            println!("  cmdrx config set-credential openai_api_key");
            println!("\nOr set via environment:");
            println!("  export CMDRX_OPENAI_API_KEY=\"sk-...\"");
            Ok(())
        }
        ConfigAction::Show => show_config(),
        ConfigAction::Set { key, value } => set_config_value(&key, &value),
        ConfigAction::SetCredential { name } => set_credential(&name),
        ConfigAction::DeleteCredential { name } => delete_credential(&name),
    }
}

fn show_config() -> Result<()> {
    let config = UserConfig::load();
    println!("{}", style("Config path:").bold());
    match UserConfig::user_config_path() {
        Some(path) => {
            let status = if path.exists() { "✓" } else { "(not found)" };
            println!("  {} {}", path.display(), status);
        }
        None => println!("  (no config directory)"),
    }
    println!();
    print!("{}", config.to_toml()?);
    println!();
    println!("{}", style("Log directory:").bold());
    println!("  {}", config.log_directory().display());
    Ok(())
}

fn set_config_value(key: &str, value: &str) -> Result<()> {
    let config_path = UserConfig::user_config_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;

    let mut config = UserConfig::from_file(&config_path)?.unwrap_or_default();
    config
        .set_value(key, value)
        .with_context(|| format!("Cannot set {} (valid keys: {})", key, CONFIG_KEYS.join(", ")))?;
    config.save_to(&config_path)?;

    println!("{} Set {} in {}", style("✓").green(), key, config_path.display());
    Ok(())
}

fn credential_name(name: &str) -> Result<CredentialName> {
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("Invalid credential name '{}': use letters, digits and underscores", name);
    }
    if !KNOWN_CREDENTIALS.contains(&name) {
        eprintln!(
            "{} '{}' is not used by any built-in provider (known: {})",
            style("note:").yellow(),
            name,
            KNOWN_CREDENTIALS.join(", ")
        );
    }
    Ok(CredentialName::new(name))
}

fn set_credential(name: &str) -> Result<()> {
    let name = credential_name(name)?;

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprintln!("Enter value for {} and press Ctrl-D:", name);
    }
    let mut value = String::new();
    stdin
        .lock()
        .read_to_string(&mut value)
        .context("Failed to read credential from stdin")?;
    let value = value.trim_end_matches(&['\r', '\n'][..]);
    if value.is_empty() {
        bail!("No value provided for {}", name);
    }

    let resolver = CredentialResolver::with_default_stores();
    let backend = resolver
        .store(&name, &Secret::new(value))
        .with_context(|| format!("Could not store {}", name))?;
    println!("{} Stored {} in {}", style("✓").green(), name, backend);
    Ok(())
}

fn delete_credential(name: &str) -> Result<()> {
    let name = credential_name(name)?;
    let resolver = CredentialResolver::with_default_stores();
    match resolver.remove(&name) {
        Ok(backends) => {
            let list: Vec<_> = backends.iter().map(|b| b.to_string()).collect();
            println!("{} Deleted {} from {}", style("✓").green(), name, list.join(", "));
            Ok(())
        }
        Err(StoreError::NotFound(_)) => {
            println!("{} {} was not stored in any writable backend", style("○").dim(), name);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Could not delete {}", name)),
    }
}
