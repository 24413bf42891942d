//! branchctl - Get-or-Create Database Branches from CI
//!
//! branchctl is a single CI step: it makes sure a named database branch
//! exists on the control plane (creating it if absent) and resolves the
//! connection details needed to reach it.
//!
//! # Core Principles
//! - Idempotent per name (an existing branch is reused, never modified)
//! - Sequential (one remote call at a time, no retries)
//! - Machine-readable (JSON-only stdout, logs on stderr)
//! - Fail fast (validation happens before any remote call)
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`output`] - JSON output envelopes and CI step outputs
//! - [`config`] - Input validation and closed enumerations
//! - [`api`] - Control-plane data model, trait and HTTP client
//! - [`annotations`] - CI event context attached to created branches
//! - [`branch`] - Branch lookup and get-or-create
//! - [`connection`] - Connection string assembly
//! - [`create`] - The end-to-end run

pub mod annotations;
pub mod api;
pub mod branch;
pub mod config;
pub mod connection;
pub mod create;
pub mod error;
pub mod output;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use annotations::EventContext;
pub use api::{Branch, ControlPlane, Endpoint, HttpControlPlane, MaskingRule};
pub use branch::{find_branch, resolve_or_create_branch, BranchRequest, ResolvedBranch};
pub use config::{BranchType, CreateParams, RawInputs, SslMode};
pub use connection::{resolve_connection_info, ConnectionInfo, ConnectionRequest};
pub use create::{create, create_with, CreateResult};
pub use error::{BranchctlError, Result};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_exports() {
        let _mode = SslMode::Require;
        let _kind = BranchType::Default;
        let _ctx = EventContext::default();
        let _inputs = RawInputs::default();
    }
}
