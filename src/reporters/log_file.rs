//! Plain-text analysis log

use super::RunContext;
use crate::models::AnalysisResult;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

const RULE: &str = "================================================================================";

/// Render the full log document
pub fn render_log(ctx: &RunContext, result: &AnalysisResult) -> String {
    let mut out = String::new();
    let exit_code = ctx
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "n/a".to_string());

    let _ = writeln!(out, "CmdRx Analysis Log");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Timestamp:     {}", ctx.started_at.format("%Y-%m-%d %H:%M:%S %Z"));
    let _ = writeln!(out, "Command:       {}", ctx.command);
    let _ = writeln!(out, "Exit code:     {}", exit_code);
    let _ = writeln!(out, "Provider:      {}", ctx.provider);
    let _ = writeln!(out, "Model:         {}", ctx.model);
    let _ = writeln!(out, "Response time: {:.2}s", ctx.elapsed.as_secs_f64());

    let _ = writeln!(out, "\nSYSTEM CONTEXT\n{}", RULE);
    let _ = writeln!(out, "OS:           {}", ctx.system.os);
    let _ = writeln!(out, "Architecture: {}", ctx.system.architecture);
    let _ = writeln!(out, "User:         {}", ctx.system.user);
    let _ = writeln!(out, "Shell:        {}", ctx.system.shell);
    let _ = writeln!(out, "Hostname:     {}", ctx.system.hostname);

    let _ = writeln!(out, "\nCOMMAND OUTPUT\n{}", RULE);
    let _ = writeln!(out, "{}", ctx.output.trim_end());

    let _ = writeln!(out, "\nANALYSIS ({})\n{}", result.severity.to_string().to_uppercase(), RULE);
    let _ = writeln!(out, "{}", result.summary.trim());

    if !result.issues.is_empty() {
        let _ = writeln!(out, "\nISSUES IDENTIFIED\n{}", RULE);
        for issue in &result.issues {
            let _ = writeln!(out, "- {}", issue.description);
        }
    }

    if !result.steps.is_empty() {
        let _ = writeln!(out, "\nTROUBLESHOOTING STEPS\n{}", RULE);
        for (i, step) in result.steps.iter().enumerate() {
            let _ = writeln!(out, "{}. {} [risk: {}]", i + 1, step.description, step.risk_level);
            if let Some(command) = &step.command {
                let _ = writeln!(out, "   Command: {}", command);
            }
            if let Some(explanation) = &step.explanation {
                let _ = writeln!(out, "   {}", explanation);
            }
        }
    }

    if !result.fixes.is_empty() {
        let _ = writeln!(out, "\nSUGGESTED FIXES\n{}", RULE);
        for (i, fix) in result.fixes.iter().enumerate() {
            let _ = writeln!(out, "Fix {}: {} [risk: {}]", i + 1, fix.description, fix.risk_level);
            for command in &fix.commands {
                let _ = writeln!(out, "   $ {}", command);
            }
            if let Some(explanation) = &fix.explanation {
                let _ = writeln!(out, "   {}", explanation);
            }
        }
    }

    if let Some(info) = &result.additional_info {
        let _ = writeln!(out, "\nADDITIONAL INFORMATION\n{}", RULE);
        let _ = writeln!(out, "{}", info.trim());
    }

    let _ = writeln!(out, "\nRAW MODEL RESPONSE\n{}", RULE);
    let _ = writeln!(out, "{}", result.raw_response.trim_end());

    out
}

/// Write `cmdrx_analysis_<stamp>.log` into `dir`, creating it if needed
pub fn write_log(dir: &Path, ctx: &RunContext, result: &AnalysisResult) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let path = dir.join(format!("cmdrx_analysis_{}.log", ctx.file_stamp()));
    std::fs::write(&path, render_log(ctx, result))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote analysis log {}", path.display());
    Ok(path)
}
