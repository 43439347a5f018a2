//! Text (terminal) reporter with colors and formatting

use crate::models::{AnalysisResult, RiskLevel, Severity};
use console::{style, StyledObject};

fn severity_style<D>(severity: Severity, value: D) -> StyledObject<D> {
    match severity {
        Severity::Success => style(value).green(),
        Severity::Warning => style(value).yellow(),
        Severity::Error => style(value).red(),
        Severity::Info => style(value).blue(),
    }
}

fn risk_style<D>(risk: RiskLevel, value: D) -> StyledObject<D> {
    match risk {
        RiskLevel::Low => style(value).green(),
        RiskLevel::Medium => style(value).yellow(),
        RiskLevel::High => style(value).red(),
    }
}

fn heading(out: &mut String, title: StyledObject<&str>) {
    out.push_str(&format!("\n{}\n", title.bold()));
    out.push_str(&format!("{}\n", style("──────────────────────────────────────").dim()));
}

/// Render an analysis for the terminal
pub fn render(result: &AnalysisResult) -> String {
    let mut out = String::new();

    let status = result.severity.to_string().to_uppercase();
    heading(
        &mut out,
        severity_style(result.severity, "Analysis"),
    );
    out.push_str(&format!(
        "Status: {}\n\n{}\n",
        severity_style(result.severity, status).bold(),
        result.summary.trim()
    ));

    if !result.issues.is_empty() {
        heading(&mut out, style("Issues Identified").red());
        for issue in &result.issues {
            out.push_str(&format!("  • {}\n", issue.description));
        }
    }

    if !result.steps.is_empty() {
        heading(&mut out, style("Troubleshooting Steps").blue());
        for (i, step) in result.steps.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {} {}\n",
                i + 1,
                style(&step.description).bold(),
                risk_style(step.risk_level, format!("[{}]", step.risk_level))
            ));
            if let Some(command) = &step.command {
                out.push_str(&format!("     $ {}\n", style(command).cyan()));
            }
            if let Some(explanation) = &step.explanation {
                out.push_str(&format!("     {}\n", style(explanation).dim()));
            }
        }
    }

    if !result.fixes.is_empty() {
        heading(&mut out, style("Suggested Fixes").green());
        for (i, fix) in result.fixes.iter().enumerate() {
            out.push_str(&format!(
                "  Fix {}: {}\n",
                i + 1,
                style(&fix.description).bold()
            ));
            out.push_str(&format!(
                "     Risk level: {}\n",
                risk_style(fix.risk_level, fix.risk_level.to_string().to_uppercase()).bold()
            ));
            for command in &fix.commands {
                out.push_str(&format!("     $ {}\n", style(command).cyan()));
            }
            if let Some(explanation) = &fix.explanation {
                out.push_str(&format!("     {}\n", style(explanation).dim()));
            }
        }
    }

    if let Some(info) = &result.additional_info {
        heading(&mut out, style("Additional Information").cyan());
        out.push_str(&format!("  {}\n", info.trim()));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::fixtures;

    #[test]
    fn test_render_sections() {
        let rendered = render(&fixtures::result());
        assert!(rendered.contains("Analysis"));
        assert!(rendered.contains("ERROR"));
        assert!(rendered.contains("bind() to 0.0.0.0:80 failed"));
        assert!(rendered.contains("Troubleshooting Steps"));
        assert!(rendered.contains("sudo ss -ltnp 'sport = :80'"));
        assert!(rendered.contains("Suggested Fixes"));
        assert!(rendered.contains("MEDIUM"));
        assert!(rendered.contains("Additional Information"));
    }

    #[test]
    fn test_empty_sections_omitted() {
        let mut result = fixtures::result();
        result.issues.clear();
        result.fixes.clear();
        result.additional_info = None;
        let rendered = render(&result);
        assert!(!rendered.contains("Issues Identified"));
        assert!(!rendered.contains("Suggested Fixes"));
        assert!(!rendered.contains("Additional Information"));
        assert!(rendered.contains("Troubleshooting Steps"));
    }
}
