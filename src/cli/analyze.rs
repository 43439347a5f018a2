//! Analyze command: capture output, ask the model, report and save

use super::capture::{self, CapturedOutput};
use crate::ai::{Analyzer, SystemContext};
use crate::config::UserConfig;
use crate::models::AnalysisResult;
use crate::reporters::{self, RunContext};
use anyhow::{bail, Result};
use chrono::Local;
use console::style;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::warn;

/// Flags that shape one analysis run
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub command: Vec<String>,
    pub log_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub no_save: bool,
    pub verbose: bool,
}

fn capture(opts: &AnalyzeOptions, config: &UserConfig) -> Result<CapturedOutput> {
    if !opts.command.is_empty() {
        let timeout = Duration::from_secs(config.output.command_timeout);
        return capture::run_command(&opts.command, timeout);
    }
    if capture::stdin_is_piped() {
        return capture::read_piped();
    }
    bail!("Nothing to analyze. Usage: cmdrx <command> [args...]  or  <command> | cmdrx")
}

pub fn run(opts: &AnalyzeOptions, config: &UserConfig) -> Result<()> {
    let captured = capture(opts, config)?;
    if captured.is_empty() {
        println!("{}", style("Command produced no output; nothing to analyze.").yellow());
        return Ok(());
    }

    let provider_config = config.provider_config();
    let analyzer = Analyzer::new();
    let spec = analyzer.registry().lookup(&provider_config.provider_id)?;
    let model = provider_config.model_or(spec.default_model).to_string();

    if opts.verbose {
        eprintln!(
            "{} {} ({} bytes) with {} / {}",
            style("Analyzing").cyan().bold(),
            captured.command,
            captured.output.len(),
            spec.display_name,
            model
        );
    }

    let started_at = Local::now();
    let start = Instant::now();
    let result = analyzer.analyze(
        &captured.output,
        &captured.command,
        captured.exit_code,
        &provider_config,
    )?;
    let elapsed = start.elapsed();

    print!("{}", reporters::render(&result));

    if opts.no_save {
        return Ok(());
    }

    let ctx = RunContext {
        command: captured.command,
        output: captured.output,
        exit_code: captured.exit_code,
        provider: spec.id.to_string(),
        model,
        elapsed,
        system: SystemContext::detect(),
        started_at,
    };
    let dir = opts
        .log_dir
        .clone()
        .unwrap_or_else(|| config.log_directory());
    save_artifacts(&dir, &ctx, &result, !opts.dry_run && config.output.auto_fix_scripts);
    Ok(())
}

/// Write the log and optionally the fix script. Failures here do not fail the
/// run: the analysis has already been shown.
fn save_artifacts(dir: &std::path::Path, ctx: &RunContext, result: &AnalysisResult, fix_script: bool) {
    println!();
    match reporters::write_log(dir, ctx, result) {
        Ok(path) => println!("{} {}", style("Log saved:").dim(), path.display()),
        Err(e) => warn!("Could not save analysis log: {:#}", e),
    }

    if !fix_script {
        return;
    }
    match reporters::write_fix_script(dir, ctx, result) {
        Ok(Some(path)) => {
            println!("{} {}", style("Fix script:").dim(), path.display());
            println!(
                "{}",
                style("Review the script before running it. cmdrx never runs fixes for you.")
                    .yellow()
            );
        }
        Ok(None) => {}
        Err(e) => warn!("Could not save fix script: {:#}", e),
    }
}
