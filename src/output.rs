//! JSON Output Envelope Types
//!
//! This module defines the structured output of a run.
//! Every run prints exactly one envelope to stdout.
//!
//! # Output Contract
//! - Success: `{"ok": true, "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "command": "...", "error": {"code": "...", "message": "..."}}`
//!
//! # CI Runner Outputs
//! When running as a workflow step, the same values are also appended to
//! the file named by `GITHUB_OUTPUT` as step outputs. Workflow commands
//! (`::add-mask::`, `::error::`) are written to stderr so stdout stays
//! pure JSON.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use crate::create::CreateResult;
use crate::error::BranchctlError;

/// Success envelope for operation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Command that was executed
    pub command: String,

    /// Operation-specific data
    pub data: T,

    /// Execution metadata
    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    /// Create a new success envelope
    pub fn new(command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, command: command.into(), data, meta }
    }
}

/// Error envelope for operation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    /// Command that was attempted
    pub command: String,

    /// Error information
    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    /// Create a new error envelope
    pub fn new(command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, command: command.into(), error }
    }

    /// Create error envelope from `BranchctlError`
    pub fn from_error(command: impl Into<String>, err: &BranchctlError) -> Self {
        Self::new(command, ErrorInfo { code: err.error_code().to_string(), message: err.message() })
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "CONFIG_ERROR", "NOT_FOUND")
    pub code: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorInfo {
    /// Create a new error info
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Execution time in milliseconds
    pub execution_ms: u64,
}

impl Metadata {
    pub fn new(execution_ms: u64) -> Self {
        Self { execution_ms }
    }
}

/// Step outputs in the order they are written
#[must_use]
pub fn step_outputs(result: &CreateResult) -> Vec<(&'static str, String)> {
    let mut outputs = vec![
        ("created", result.created.to_string()),
        ("db_url", result.db_url.clone()),
        ("db_url_pooled", result.db_url_pooled.clone()),
        ("db_host", result.db_host.clone()),
        ("db_host_pooled", result.db_host_pooled.clone()),
        ("password", result.password.clone()),
        ("branch_id", result.branch_id.clone()),
    ];
    if let Some(expires_at) = &result.expires_at {
        outputs.push(("expires_at", expires_at.clone()));
    }
    if let Some(auth_url) = &result.auth_url {
        outputs.push(("auth_url", auth_url.clone()));
    }
    outputs
}

/// Format one `GITHUB_OUTPUT` entry
///
/// Single-line values use `key=value`; anything with a newline uses the
/// heredoc form with a delimiter that does not occur in the value.
#[must_use]
pub fn format_output(key: &str, value: &str) -> String {
    if !value.contains('\n') && !value.contains('\r') {
        return format!("{key}={value}\n");
    }

    let mut delimiter = String::from("BRANCHCTL_EOF");
    let mut n = 0;
    while value.contains(&delimiter) {
        n += 1;
        delimiter = format!("BRANCHCTL_EOF_{n}");
    }
    format!("{key}<<{delimiter}\n{value}\n{delimiter}\n")
}

/// Append all step outputs to the `GITHUB_OUTPUT` file at `path`
pub fn write_step_outputs(path: &Path, result: &CreateResult) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for (key, value) in step_outputs(result) {
        file.write_all(format_output(key, &value).as_bytes())?;
    }
    file.flush()
}

/// Escape data for a workflow command
fn escape_command_data(value: &str) -> String {
    value.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// `::add-mask::` command hiding `secret` in runner logs
#[must_use]
pub fn mask_command(secret: &str) -> String {
    format!("::add-mask::{}", escape_command_data(secret))
}

/// `::error::` command marking the step as failed with `message`
#[must_use]
pub fn error_command(message: &str) -> String {
    format!("::error::{}", escape_command_data(message))
}
