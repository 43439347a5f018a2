//! Output reporters for cmdrx analysis results
//!
//! - `text` - Terminal output with colors
//! - `log_file` - Plain-text analysis log written to the log directory
//! - `fix_script` - Bash script wrapping the suggested fix commands
//!
//! All of them consume an [`AnalysisResult`](crate::models::AnalysisResult);
//! none of them execute anything.

mod fix_script;
mod log_file;
mod text;

pub use fix_script::{render_fix_script, write_fix_script};
pub use log_file::{render_log, write_log};
pub use text::render;

use crate::ai::SystemContext;
use chrono::{DateTime, Local};
use std::time::Duration;

/// What was analysed, and by whom; header material for log files
#[derive(Debug, Clone)]
pub struct RunContext {
    pub command: String,
    pub output: String,
    pub exit_code: Option<i32>,
    pub provider: String,
    pub model: String,
    pub elapsed: Duration,
    pub system: SystemContext,
    pub started_at: DateTime<Local>,
}

impl RunContext {
    /// `YYYYmmdd_HHMMSS`, shared by the log file and fix script names
    pub fn file_stamp(&self) -> String {
        self.started_at.format("%Y%m%d_%H%M%S").to_string()
    }
}
