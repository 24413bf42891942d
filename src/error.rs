//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout branchctl.
//! All errors are structured and map to specific error codes for JSON output.
//!
//! # Error Categories
//! - `Config`: Invalid inputs, detected before any remote call
//! - `InvalidEnumValue`: An input outside a closed set (ssl mode, branch type)
//! - `NotFound`: Parent branch, endpoint, database or role absent
//! - `Conflict`: Precondition conflicts (masking rules on an existing branch)
//! - `Api`: Non-success responses from the control plane
//! - `Transport`: Network and timeout failures
//! - `InvalidResponse`: Control-plane payloads that cannot be used
//! - `Context`: Any of the above, prefixed with the stage that failed

use thiserror::Error;

/// Main error type for branchctl operations
#[derive(Error, Debug)]
pub enum BranchctlError {
    /// Invalid configuration input. The message is reported verbatim.
    #[error("{0}")]
    Config(String),

    /// Input outside a declared enumeration
    #[error("Invalid {kind}: {value}")]
    InvalidEnumValue { kind: &'static str, value: String },

    /// Expected resource absent
    #[error("{0}")]
    NotFound(String),

    /// Request conflicts with the current remote state
    #[error("{0}")]
    Conflict(String),

    /// Control plane answered with a non-success status
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// Request never produced a response (connect error, timeout, ...)
    #[error("Request failed: {0}")]
    Transport(String),

    /// Response was received but is unusable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Error annotated with the stage it happened in
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<BranchctlError>,
    },
}

impl BranchctlError {
    /// Convert error to error code string for JSON output
    ///
    /// `Context` reports the code of the error it wraps, so stage prefixes
    /// never hide what actually went wrong.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidEnumValue { .. } => "INVALID_ENUM_VALUE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Api { .. } => "API_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::InvalidResponse(_) => "INVALID_RESPONSE",
            Self::Context { source, .. } => source.error_code(),
        }
    }

    /// Human-readable error message, safe for stdout (never contains secrets)
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an enumeration membership error
    pub fn invalid_enum_value(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEnumValue { kind, value: value.into() }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a precondition conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an API status error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api { status, message: message.into() }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create an invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Wrap this error with a stage description
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context { context: context.into(), source: Box::new(self) }
    }
}

impl From<reqwest::Error> for BranchctlError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transport("request timed out")
        } else if err.is_decode() {
            Self::invalid_response(err.to_string())
        } else {
            // Strip the URL so query strings never end up in messages
            Self::transport(err.without_url().to_string())
        }
    }
}

/// Extension for attaching stage context to fallible results
pub trait ResultExt<T> {
    /// Prefix the error (if any) with `context`
    fn stage(self, context: impl FnOnce() -> String) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn stage(self, context: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| e.context(context()))
    }
}

/// Result type alias for branchctl operations
pub type Result<T> = std::result::Result<T, BranchctlError>;
