//! CmdRx - command output doctor
//!
//! Captures a command's output, asks an LLM provider for a diagnosis, and
//! renders issues, troubleshooting steps and fix scripts.
//!
//! The library surface is [`ai::Analyzer`]: given raw output and a
//! [`ai::ProviderConfig`], it resolves API keys through
//! [`credentials::CredentialResolver`] and returns a
//! [`models::AnalysisResult`] or a typed [`ai::AnalysisError`].

pub mod ai;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod models;
pub mod reporters;
