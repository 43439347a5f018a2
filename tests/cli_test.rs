//! CLI contract tests against the built binary
//!
//! Every run gets its own HOME / XDG_CONFIG_HOME so the developer's config
//! and credentials file are never read or touched.

use httpmock::prelude::*;
use serde_json::json;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn cmdrx(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cmdrx"));
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .stdin(Stdio::null());
    for var in [
        "CMDRX_PROVIDER",
        "CMDRX_MODEL",
        "CMDRX_BASE_URL",
        "CMDRX_OPENAI_API_KEY",
        "CMDRX_ANTHROPIC_API_KEY",
        "CMDRX_GROK_API_KEY",
        "CMDRX_CUSTOM_API_KEY",
        "CMDRX_CUSTOM_BEARER_TOKEN",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn run(cmd: &mut Command) -> (i32, String, String) {
    let Output {
        status,
        stdout,
        stderr,
    } = cmd.output().unwrap();
    (
        status.code().unwrap_or(-1),
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    )
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run(cmdrx(home.path()).arg("--help"));
    assert_eq!(code, 0);
    assert!(stdout.contains("config"));
    assert!(stdout.contains("doctor"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn version_flag() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run(cmdrx(home.path()).arg("--version"));
    assert_eq!(code, 0);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[cfg(unix)]
#[test]
fn unknown_provider_fails_with_hint() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run(cmdrx(home.path()).args(["--provider", "bard", "echo", "hi"]));
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown provider 'bard'"));
    assert!(stderr.contains("openai, anthropic, grok, custom"));
}

#[cfg(unix)]
#[test]
fn missing_credential_names_env_var() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run(cmdrx(home.path())
        .args(["--provider", "grok", "--no-save", "echo", "hi"])
        .env("CMDRX_BASE_URL", "https://127.0.0.1:9/v1"));
    assert_eq!(code, 1);
    assert!(stderr.contains("grok_api_key"));
    assert!(stderr.contains("CMDRX_GROK_API_KEY"));
}

#[test]
fn config_set_validates_keys_and_persists() {
    let home = TempDir::new().unwrap();

    let (code, _, stderr) = run(cmdrx(home.path()).args(["config", "set", "llm.colour", "blue"]));
    assert_eq!(code, 1);
    assert!(stderr.contains("llm.colour"));

    let (code, _, _) = run(cmdrx(home.path()).args(["config", "set", "llm.timeout", "0"]));
    assert_eq!(code, 1);

    let (code, _, _) = run(cmdrx(home.path()).args(["config", "set", "llm.provider", "anthropic"]));
    assert_eq!(code, 0);

    let saved =
        std::fs::read_to_string(home.path().join(".config/cmdrx/config.toml")).unwrap();
    assert!(saved.contains("provider = \"anthropic\""));

    let (code, stdout, _) = run(cmdrx(home.path()).args(["config", "show"]));
    assert_eq!(code, 0);
    assert!(stdout.contains("anthropic"));
}

#[test]
fn set_credential_rejects_bad_names() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) =
        run(cmdrx(home.path()).args(["config", "set-credential", "../etc/passwd"]));
    assert_eq!(code, 1);
    assert!(stderr.contains("Invalid credential name"));
}

#[cfg(unix)]
#[test]
fn analyzes_command_and_writes_artifacts() {
    let server = MockServer::start();
    let analysis = json!({
        "analysis": "Disk is full on /var.",
        "status": "error",
        "issues": ["No space left on device"],
        "troubleshooting_steps": [
            {"step": 1, "description": "Check usage", "command": "df -h", "risk_level": "low"}
        ],
        "suggested_fixes": [
            {"description": "Clean the apt cache", "commands": ["apt-get clean"], "risk_level": "low"}
        ]
    });
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer sk-cli-test")
            .body_includes("No space left on device");
        then.status(200).json_body(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": analysis.to_string()}}]
        }));
    });

    let home = TempDir::new().unwrap();
    let logs = home.path().join("logs");
    let base_url = format!("{}/v1", server.base_url());
    for (key, value) in [
        ("llm.provider", "openai"),
        ("llm.base_url", base_url.as_str()),
        ("llm.allow_plaintext", "true"),
    ] {
        let (code, _, stderr) = run(cmdrx(home.path()).args(["config", "set", key, value]));
        assert_eq!(code, 0, "{}", stderr);
    }

    let (code, stdout, stderr) = run(cmdrx(home.path())
        .env("CMDRX_OPENAI_API_KEY", "sk-cli-test")
        .arg("--log-dir")
        .arg(&logs)
        .args(["echo 'No space left on device' >&2; exit 1"]));

    assert_eq!(code, 0, "{}", stderr);
    mock.assert();
    assert!(stdout.contains("Disk is full on /var."));
    assert!(stdout.contains("df -h"));
    assert!(!stdout.contains("sk-cli-test"));
    assert!(!stderr.contains("sk-cli-test"));

    let names: Vec<String> = std::fs::read_dir(&logs)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("cmdrx_analysis_") && n.ends_with(".log")));
    assert!(names.iter().any(|n| n.ends_with(".sh")));
}

#[test]
fn doctor_connect_checks_provider_and_log_directory() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer sk-doctor")
            .body_includes("cmdrx connection check");
        then.status(200).json_body(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": json!({
                "analysis": "The echo command succeeded.",
                "status": "success",
                "issues": [],
                "troubleshooting_steps": []
            }).to_string()}}]
        }));
    });

    let home = TempDir::new().unwrap();
    let logs = home.path().join("doctor_logs");
    for (key, value) in [
        ("llm.provider", "openai".to_string()),
        ("llm.base_url", format!("{}/v1", server.base_url())),
        ("llm.allow_plaintext", "true".to_string()),
        ("output.log_directory", logs.display().to_string()),
    ] {
        let (code, _, stderr) = run(cmdrx(home.path()).args(["config", "set", key, value.as_str()]));
        assert_eq!(code, 0, "{}", stderr);
    }

    let (code, stdout, stderr) = run(cmdrx(home.path())
        .env("CMDRX_OPENAI_API_KEY", "sk-doctor")
        .args(["doctor", "--connect"]));

    assert_eq!(code, 0, "{}\n{}", stdout, stderr);
    mock.assert();
    assert!(stdout.contains("Connection"));
    assert!(stdout.contains("Log directory"));
    assert!(logs.is_dir());
    assert!(!stdout.contains("sk-doctor"));
}

#[test]
fn doctor_without_connect_sends_nothing() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST);
        then.status(500);
    });

    let home = TempDir::new().unwrap();
    let (code, _, _) = run(cmdrx(home.path())
        .env("CMDRX_BASE_URL", format!("{}/v1", server.base_url()))
        .env("CMDRX_OPENAI_API_KEY", "sk-doctor")
        .arg("doctor"));

    // plaintext endpoint without opt-in is reported as a problem
    assert_eq!(code, 1);
    mock.assert_calls(0);
}
