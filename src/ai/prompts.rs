//! Prompt construction for command output analysis
//!
//! One system prompt shared by every provider, and a user prompt rendered from
//! a [`PromptPayload`] asking for a single JSON analysis document.

use serde::{Deserialize, Serialize};

/// Host facts sent alongside the command output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemContext {
    pub os: String,
    pub architecture: String,
    pub user: String,
    pub shell: String,
    pub hostname: String,
}

impl SystemContext {
    /// Best-effort detection from compile-time target info and the environment
    pub fn detect() -> Self {
        let user = ["USER", "USERNAME", "LOGNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| "unknown".to_string());

        let shell = std::env::var("SHELL")
            .or_else(|_| std::env::var("COMSPEC"))
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            user,
            shell,
            hostname: detect_hostname(),
        }
    }
}

fn detect_hostname() -> String {
    if let Some(name) = ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
    {
        return name;
    }
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Everything one analysis request needs to say about the command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPayload {
    pub system_context: SystemContext,
    pub command_invoked: String,
    pub command_output: String,
    pub exit_code: Option<i32>,
}

impl PromptPayload {
    pub fn new(
        system_context: SystemContext,
        command_invoked: impl Into<String>,
        command_output: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            system_context,
            command_invoked: command_invoked.into(),
            command_output: command_output.into(),
            exit_code,
        }
    }

    /// Render the user-role message
    pub fn render_user_prompt(&self) -> String {
        let exit_line = self
            .exit_code
            .map(|code| {
                let status = if code == 0 { "SUCCESS" } else { "FAILURE" };
                format!("Exit code: {} ({})\n", code, status)
            })
            .unwrap_or_default();

        let ctx = &self.system_context;

        format!(
            r#"Analyze the following command output and provide detailed troubleshooting information.

Command executed: {command}
{exit_line}
System context:
- OS: {os}
- Architecture: {arch}
- User: {user}
- Shell: {shell}
- Hostname: {hostname}

Command output:
```
{output}
```

{format}"#,
            command = self.command_invoked,
            exit_line = exit_line,
            os = ctx.os,
            arch = ctx.architecture,
            user = ctx.user,
            shell = ctx.shell,
            hostname = ctx.hostname,
            output = fence_safe(&self.command_output),
            format = PromptTemplate::response_format(),
        )
    }
}

/// Fixed prompt text
pub struct PromptTemplate;

impl PromptTemplate {
    pub fn system_prompt() -> &'static str {
        "You are CmdRx, an expert system administrator AI assistant specialized in \
         Linux/Unix systems. Provide detailed, accurate troubleshooting information. \
         Respond with a single JSON object and nothing else."
    }

    /// JSON schema description and analysis guidelines appended to every prompt
    pub fn response_format() -> &'static str {
        r#"Provide your analysis as one JSON object in exactly this format:
{
  "analysis": "Comprehensive analysis of what the output shows and what it means",
  "status": "success|warning|error|info",
  "issues": ["specific", "issues", "identified", "from", "output"],
  "troubleshooting_steps": [
    {
      "step": 1,
      "description": "Clear step description",
      "command": "exact command to run (if applicable)",
      "explanation": "Why this step helps diagnose or resolve the issue",
      "risk_level": "low|medium|high"
    }
  ],
  "suggested_fixes": [
    {
      "description": "What this fix accomplishes",
      "commands": ["command1", "command2"],
      "risk_level": "low|medium|high",
      "explanation": "Detailed explanation of the fix and potential impact"
    }
  ],
  "additional_info": "Relevant background information, best practices, or warnings"
}

Analysis guidelines:
- Provide specific, actionable troubleshooting steps
- Include exact commands when helpful (with proper syntax)
- Risk levels: LOW (safe, read-only), MEDIUM (changes state, requires caution), HIGH (potential data loss or downtime)
- Focus on the most probable root causes based on the error patterns
- If the output shows success, highlight what is working and any optimization opportunities
- For errors, provide both immediate fixes and preventive measures
- Include relevant log file locations or configuration files to check
- Use an empty array when there are no issues or steps; never omit a field"#
    }
}

/// Keep captured output from closing the prompt's code fence early
fn fence_safe(output: &str) -> String {
    output.replace("```", "'''")
}
