//! Bash fix script generation
//!
//! Every model-supplied string is single-quoted before it lands in the
//! script, and every command runs only after an interactive confirmation.
//! cmdrx writes the script; it never runs it.

use super::RunContext;
use crate::models::{AnalysisResult, RiskLevel};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Quote `s` as one bash word
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Collapse to one line for comments
fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn risk_color(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "GREEN",
        RiskLevel::Medium => "YELLOW",
        RiskLevel::High => "RED",
    }
}

const PRELUDE: &str = r#"set -e  # Exit on any error
set -u  # Exit on undefined variables

RED='\033[31m'
GREEN='\033[32m'
YELLOW='\033[33m'
BLUE='\033[34m'
NC='\033[0m'

say() {
    printf '%b%s%b\n' "$1" "$2" "$NC"
}

confirm() {
    say "$YELLOW" "$1"
    read -r -p "Do you want to continue? (y/N): " reply
    case "$reply" in
        [Yy]*) ;;
        *) say "$RED" "Aborted."; exit 1 ;;
    esac
}

run_command() {
    say "$BLUE" "About to run: $1"
    confirm "This will execute the above command."
    say "$GREEN" "Executing: $1"
    bash -c "$1"
    say "$GREEN" "Command completed."
    echo
}
"#;

/// Render the script for `result`'s suggested fixes
pub fn render_fix_script(ctx: &RunContext, result: &AnalysisResult) -> String {
    let mut out = String::new();
    let command = one_line(&ctx.command);

    let _ = writeln!(out, "#!/bin/bash");
    let _ = writeln!(out, "#");
    let _ = writeln!(out, "# CmdRx Generated Fix Script");
    let _ = writeln!(out, "# Generated: {}", ctx.started_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "# Original command: {}", command);
    let _ = writeln!(out, "#");
    let _ = writeln!(out, "# WARNING: These fixes were suggested by an AI model.");
    let _ = writeln!(out, "# Review every command before running this script. Commands may modify");
    let _ = writeln!(out, "# system configuration, restart services, delete files or need root.");
    let _ = writeln!(out, "#");
    let _ = writeln!(out, "# Usage: bash cmdrx_fix_{}.sh", ctx.file_stamp());
    let _ = writeln!(out, "#");
    let _ = writeln!(out);
    out.push_str(PRELUDE);
    let _ = writeln!(out);
    let _ = writeln!(out, "say \"$BLUE\" 'CmdRx Fix Script'");
    let _ = writeln!(out, "say \"$YELLOW\" {}", shell_quote(&format!("Generated fixes for: {}", command)));
    let _ = writeln!(out, "echo");

    for (i, fix) in result.fixes.iter().enumerate() {
        let n = i + 1;
        let color = risk_color(fix.risk_level);
        let _ = writeln!(out);
        let _ = writeln!(out, "# Fix {}: {}", n, one_line(&fix.description));
        let _ = writeln!(
            out,
            "say \"${}\" {}",
            color,
            shell_quote(&format!("Fix {}: {}", n, one_line(&fix.description)))
        );
        let _ = writeln!(
            out,
            "say \"${}\" {}",
            color,
            shell_quote(&format!("Risk level: {}", fix.risk_level.to_string().to_uppercase()))
        );
        if let Some(explanation) = &fix.explanation {
            let _ = writeln!(
                out,
                "say \"$NC\" {}",
                shell_quote(&format!("Explanation: {}", one_line(explanation)))
            );
        }
        let _ = writeln!(out, "echo");

        if fix.commands.is_empty() {
            let _ = writeln!(out, "say \"$YELLOW\" 'No commands provided for this fix.'");
        }
        for command in &fix.commands {
            let _ = writeln!(out, "run_command {}", shell_quote(command));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "say \"$GREEN\" 'All fixes completed.'");
    let _ = writeln!(out, "say \"$BLUE\" 'Check the system status to verify the fixes worked.'");
    out
}

/// Write `cmdrx_fix_<stamp>.sh` into `dir` and mark it executable.
///
/// Returns `None` when no fix carries a command.
pub fn write_fix_script(
    dir: &Path,
    ctx: &RunContext,
    result: &AnalysisResult,
) -> Result<Option<PathBuf>> {
    if result.fix_commands().next().is_none() {
        return Ok(None);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let path = dir.join(format!("cmdrx_fix_{}.sh", ctx.file_stamp()));
    std::fs::write(&path, render_fix_script(ctx, result))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    make_executable(&path)?;

    debug!("Wrote fix script {}", path.display());
    Ok(Some(path))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to chmod {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
