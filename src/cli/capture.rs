//! Getting command output to analyse: run a command, or read a pipe

use anyhow::{bail, Context, Result};
use std::io::{IsTerminal, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// Label used for output that arrived on stdin
pub const PIPED_INPUT: &str = "<piped input>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub command: String,
    pub output: String,
    pub exit_code: Option<i32>,
}

impl CapturedOutput {
    pub fn is_empty(&self) -> bool {
        self.output.trim().is_empty()
    }
}

fn shell_command(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
}

/// Combine streams as `STDOUT:` / `STDERR:` sections, skipping empty ones
pub fn format_streams(stdout: &str, stderr: &str) -> String {
    let mut sections = Vec::new();
    if !stdout.trim().is_empty() {
        sections.push(format!("STDOUT:\n{}", stdout.trim_end()));
    }
    if !stderr.trim().is_empty() {
        sections.push(format!("STDERR:\n{}", stderr.trim_end()));
    }
    sections.join("\n\n")
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf);
        }
        buf
    })
}

/// Run `args` through the shell and capture both streams.
///
/// The child is killed if it outlives `timeout`.
pub fn run_command(args: &[String], timeout: Duration) -> Result<CapturedOutput> {
    let command_line = args.join(" ");
    if command_line.trim().is_empty() {
        bail!("No command given");
    }
    debug!("Running '{}' (timeout {:?})", command_line, timeout);

    let mut child = shell_command(&command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to run '{}'", command_line))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child
        .wait_timeout(timeout)
        .context("Failed while waiting for command")?
    {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            bail!(
                "Command '{}' timed out after {}s",
                command_line,
                timeout.as_secs()
            );
        }
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    Ok(CapturedOutput {
        command: command_line,
        output: format_streams(
            &String::from_utf8_lossy(&stdout),
            &String::from_utf8_lossy(&stderr),
        ),
        exit_code: status.code(),
    })
}

/// True when something is being piped in
pub fn stdin_is_piped() -> bool {
    !std::io::stdin().is_terminal()
}

/// Read all of stdin as the output to analyse
pub fn read_piped() -> Result<CapturedOutput> {
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .context("Failed to read piped input")?;
    Ok(CapturedOutput {
        command: PIPED_INPUT.to_string(),
        output: String::from_utf8_lossy(&buf).into_owned(),
        exit_code: None,
    })
}
