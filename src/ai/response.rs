//! Parsing model text into an [`AnalysisResult`]
//!
//! The model is asked for one JSON object. A single Markdown code fence around
//! it is tolerated; anything else that does not match the document shape fails
//! the whole call, so no result is ever partially filled.

use crate::ai::{AiResult, AnalysisError};
use crate::models::{AnalysisResult, Issue, RiskLevel, Severity, SuggestedFix, TroubleshootingStep};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

#[derive(Debug, Deserialize)]
struct WireAnalysis {
    analysis: String,
    status: String,
    issues: Vec<String>,
    troubleshooting_steps: Vec<WireStep>,
    #[serde(default)]
    suggested_fixes: Option<Vec<WireFix>>,
    #[serde(default)]
    additional_info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStep {
    description: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    risk_level: String,
}

#[derive(Debug, Deserialize)]
struct WireFix {
    description: String,
    commands: Vec<String>,
    risk_level: String,
    #[serde(default)]
    explanation: Option<String>,
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)\A\s*```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?\s*```\s*\z").expect("valid regex")
    })
}

/// Remove one surrounding code fence, if present
fn strip_code_fence(text: &str) -> &str {
    code_fence()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
        .trim()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn risk(value: &str) -> AiResult<RiskLevel> {
    value.parse().map_err(AnalysisError::MalformedResponse)
}

/// Parse the model's text into a complete [`AnalysisResult`]
pub fn parse_analysis(text: &str) -> AiResult<AnalysisResult> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(AnalysisError::MalformedResponse(
            "model returned no content".to_string(),
        ));
    }

    let wire: WireAnalysis = serde_json::from_str(body)
        .map_err(|e| AnalysisError::MalformedResponse(format!("invalid analysis JSON: {}", e)))?;

    let severity: Severity = wire
        .status
        .parse()
        .map_err(AnalysisError::MalformedResponse)?;

    let steps = wire
        .troubleshooting_steps
        .into_iter()
        .map(|s| {
            Ok(TroubleshootingStep {
                description: s.description,
                command: non_empty(s.command),
                explanation: non_empty(s.explanation),
                risk_level: risk(&s.risk_level)?,
            })
        })
        .collect::<AiResult<Vec<_>>>()?;

    let fixes = wire
        .suggested_fixes
        .unwrap_or_default()
        .into_iter()
        .map(|f| {
            Ok(SuggestedFix {
                description: f.description,
                commands: f
                    .commands
                    .into_iter()
                    .filter(|c| !c.trim().is_empty())
                    .collect(),
                risk_level: risk(&f.risk_level)?,
                explanation: non_empty(f.explanation),
            })
        })
        .collect::<AiResult<Vec<_>>>()?;

    Ok(AnalysisResult {
        summary: wire.analysis,
        severity,
        issues: wire
            .issues
            .into_iter()
            .map(|description| Issue { description })
            .collect(),
        steps,
        fixes,
        additional_info: non_empty(wire.additional_info),
        raw_response: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "analysis": "nginx cannot bind to port 80",
        "status": "error",
        "issues": ["port 80 already in use"],
        "troubleshooting_steps": [
            {"step": 1, "description": "Find the listener", "command": "ss -ltnp", "risk_level": "low"},
            {"step": 2, "description": "Read the config", "command": "", "risk_level": "LOW"}
        ],
        "suggested_fixes": [
            {"description": "Stop apache", "commands": ["systemctl stop httpd"], "risk_level": "medium"}
        ],
        "additional_info": ""
    }"#;

    #[test]
    fn test_parse_valid_document() {
        let result = parse_analysis(VALID).unwrap();
        assert_eq!(result.summary, "nginx cannot bind to port 80");
        assert_eq!(result.severity, Severity::Error);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].command.as_deref(), Some("ss -ltnp"));
        assert_eq!(result.steps[1].command, None);
        assert_eq!(result.steps[1].risk_level, RiskLevel::Low);
        assert_eq!(result.fixes[0].risk_level, RiskLevel::Medium);
        assert_eq!(result.additional_info, None);
        assert_eq!(result.raw_response, VALID);
    }

    #[test]
    fn test_single_code_fence_is_stripped() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert!(parse_analysis(&fenced).is_ok());
        let bare_fence = format!("```\n{}\n```\n", VALID);
        assert!(parse_analysis(&bare_fence).is_ok());
    }

    #[test]
    fn test_missing_issues_is_malformed() {
        let text = r#"{"analysis": "a", "status": "info", "troubleshooting_steps": []}"#;
        assert!(matches!(
            parse_analysis(text),
            Err(AnalysisError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let text = r#"{"analysis": "a", "status": "info", "issues": "none", "troubleshooting_steps": []}"#;
        assert!(matches!(
            parse_analysis(text),
            Err(AnalysisError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_unknown_status_is_malformed() {
        let text = r#"{"analysis": "a", "status": "fatal", "issues": [], "troubleshooting_steps": []}"#;
        let err = parse_analysis(text).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MalformedResponse("unknown status 'fatal'".into())
        );
    }

    #[test]
    fn test_step_without_risk_level_is_malformed() {
        let text = r#"{"analysis": "a", "status": "info", "issues": [],
            "troubleshooting_steps": [{"description": "look"}]}"#;
        assert!(parse_analysis(text).is_err());
    }

    #[test]
    fn test_prose_is_malformed() {
        assert!(parse_analysis("The command failed because the disk is full.").is_err());
        assert!(parse_analysis("   ").is_err());
    }

    #[test]
    fn test_null_optional_sections() {
        let text = r#"{"analysis": "fine", "status": "success", "issues": [],
            "troubleshooting_steps": [], "suggested_fixes": null, "additional_info": null}"#;
        let result = parse_analysis(text).unwrap();
        assert!(result.fixes.is_empty());
        assert_eq!(result.severity, Severity::Success);
    }
}
