//! Doctor command - check configuration and credentials

use crate::ai::{resolve_endpoint, Analyzer, ProviderRegistry};
use crate::config::UserConfig;
use crate::credentials::{CredentialResolver, EnvStore, FileStore};
use anyhow::{bail, Context, Result};
use console::style;
use std::path::Path;

const WRITE_CHECK_FILE: &str = ".cmdrx_write_check";

fn ok(label: &str, detail: impl std::fmt::Display) {
    println!("{} {}: {}", style("✓").green(), label, detail);
}

fn info(label: &str, detail: impl std::fmt::Display) {
    println!("{} {}: {}", style("○").dim(), label, detail);
}

fn fail(label: &str, detail: impl std::fmt::Display) {
    println!("{} {}: {}", style("✗").red(), label, detail);
}

/// Create `dir` if needed and prove a file can be written there
pub fn check_log_directory(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let check_file = dir.join(WRITE_CHECK_FILE);
    std::fs::write(&check_file, b"ok").with_context(|| format!("cannot write to {}", dir.display()))?;
    std::fs::remove_file(&check_file)
        .with_context(|| format!("cannot clean up {}", check_file.display()))?;
    Ok(())
}

/// Static checks, plus a live provider round trip when `connect` is set
pub fn run(config: &UserConfig, connect: bool) -> Result<()> {
    println!("{}\n", style("CmdRx Doctor").bold());
    let mut problems = 0;

    // Config file
    match UserConfig::user_config_path() {
        Some(path) => match UserConfig::from_file(&path) {
            Ok(Some(_)) => ok("Config", path.display()),
            Ok(None) => info("Config", format!("{} (not found, using defaults)", path.display())),
            Err(e) => {
                fail("Config", format!("{:#} (using defaults)", e));
                problems += 1;
            }
        },
        None => info("Config", "no config directory on this platform"),
    }

    // Provider and endpoint
    let provider_config = config.provider_config();
    let registry = ProviderRegistry::builtin();
    let spec = match registry.lookup(&provider_config.provider_id) {
        Ok(spec) => spec,
        Err(e) => {
            fail("Provider", &e);
            let valid: Vec<_> = registry.ids().collect();
            println!("  Valid providers: {}", valid.join(", "));
            bail!("1 configuration problem found");
        }
    };
    ok(
        "Provider",
        format!(
            "{} ({}), model {}",
            spec.id,
            spec.display_name,
            provider_config.model_or(spec.default_model)
        ),
    );

    let base = provider_config
        .endpoint_override
        .as_deref()
        .or(spec.default_base_url);
    match base {
        Some(base) => match resolve_endpoint(base, "", provider_config.allow_plaintext) {
            Ok(url) if url.starts_with("http://") => {
                println!(
                    "{} Endpoint: {} {}",
                    style("!").yellow(),
                    url,
                    style("(plaintext allowed; requests and keys are unencrypted)").yellow()
                );
            }
            Ok(url) => ok("Endpoint", url),
            Err(e) => {
                fail("Endpoint", &e);
                problems += 1;
            }
        },
        None => {
            fail("Endpoint", "llm.base_url is required for this provider");
            problems += 1;
        }
    }

    // Backends
    match FileStore::at_default_location() {
        Some(file) if file.exists() && file.is_exposed() => {
            fail(
                "Credentials file",
                format!("{} is readable by other users; run: chmod 600", file.path().display()),
            );
            problems += 1;
        }
        Some(file) if file.exists() => ok("Credentials file", file.path().display()),
        Some(file) => info("Credentials file", format!("{} (not created)", file.path().display())),
        None => info("Credentials file", "unavailable (no config directory)"),
    }

    // Required credentials, by backend only
    let resolver = CredentialResolver::with_default_stores();
    let required = spec.required_credentials(&provider_config);
    if required.is_empty() {
        info("Credentials", "none required");
    }
    for name in required {
        match resolver.resolve(&name) {
            Ok(record) => ok(name.as_str(), format!("found in {}", record.source)),
            Err(_) => {
                fail(name.as_str(), "not found");
                println!(
                    "  Set it with: cmdrx config set-credential {}  or  export {}=...",
                    name,
                    EnvStore::var_name(&name)
                );
                problems += 1;
            }
        }
    }

    // Output directory
    let log_dir = config.log_directory();
    match check_log_directory(&log_dir) {
        Ok(()) => ok("Log directory", log_dir.display()),
        Err(e) => {
            fail("Log directory", format!("{:#}", e));
            problems += 1;
        }
    }

    if connect {
        if problems > 0 {
            info("Connection", "skipped until the problems above are fixed");
        } else {
            match Analyzer::new().check_connection(&provider_config) {
                Ok(elapsed) => ok(
                    "Connection",
                    format!("{} answered in {:.2}s", spec.display_name, elapsed.as_secs_f64()),
                ),
                Err(e) => {
                    fail("Connection", &e);
                    problems += 1;
                }
            }
        }
    } else {
        info("Connection", "not tested (run: cmdrx doctor --connect)");
    }

    println!();
    if problems > 0 {
        bail!("{} problem(s) found", problems);
    }
    println!("{}", style("All checks passed!").green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_directory_created_and_left_clean() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("cmdrx_logs");
        check_log_directory(&logs).unwrap();
        assert!(logs.is_dir());
        assert_eq!(std::fs::read_dir(&logs).unwrap().count(), 0);
    }

    #[test]
    fn test_log_directory_under_a_file_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "x").unwrap();
        assert!(check_log_directory(&file.join("logs")).is_err());
    }
}
