//! Configuration Management
//!
//! This module turns the raw step inputs into validated, typed parameters.
//!
//! # Input Sources
//! Inputs arrive as strings, either as CLI flags or as the `INPUT_*`
//! environment variables a CI runner sets for a step. The binary fills a
//! [`RawInputs`]; nothing in here reads the environment.
//!
//! # Validation
//! [`RawInputs::validate`] checks everything before a single remote call is
//! made, in a fixed order, and reports the first failure verbatim.

use chrono::DateTime;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::MaskingRule;
use crate::error::{BranchctlError, Result};

/// Default control-plane API host
pub const DEFAULT_API_HOST: &str = "https://console.neon.tech/api/v2";

/// Default database name
pub const DEFAULT_DATABASE: &str = "neondb";

/// Default role name
pub const DEFAULT_ROLE: &str = "neondb_owner";

/// Permissive `scheme://host...` check applied to the API host
const API_HOST_PATTERN: &str = r"https?://[^\s/$.?#].[^\s]*";

/// SSL mode appended to connection strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    Require,
    VerifyCa,
    VerifyFull,
    /// Leave `sslmode` out of the connection strings entirely
    Omit,
}

impl SslMode {
    pub const ALL: [Self; 4] = [Self::Require, Self::VerifyCa, Self::VerifyFull, Self::Omit];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Require => "require",
            Self::VerifyCa => "verify-ca",
            Self::VerifyFull => "verify-full",
            Self::Omit => "omit",
        }
    }

    /// Value of the `sslmode` query parameter, `None` for [`SslMode::Omit`]
    #[must_use]
    pub const fn query_value(&self) -> Option<&'static str> {
        match self {
            Self::Omit => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SslMode {
    type Err = BranchctlError;

    fn from_str(s: &str) -> Result<Self> {
        parse_enum(&Self::ALL, Self::as_str, "SSL mode", s)
    }
}

/// Kind of branch to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchType {
    Default,
    SchemaOnly,
}

impl BranchType {
    pub const ALL: [Self; 2] = [Self::Default, Self::SchemaOnly];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::SchemaOnly => "schema-only",
        }
    }

    #[must_use]
    pub const fn is_schema_only(&self) -> bool {
        matches!(self, Self::SchemaOnly)
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BranchType {
    type Err = BranchctlError;

    fn from_str(s: &str) -> Result<Self> {
        parse_enum(&Self::ALL, Self::as_str, "branch type", s)
    }
}

/// Single membership check shared by every closed enumeration
fn parse_enum<T: Copy>(
    all: &[T],
    name: fn(&T) -> &'static str,
    kind: &'static str,
    value: &str,
) -> Result<T> {
    all.iter()
        .find(|variant| name(variant) == value)
        .copied()
        .ok_or_else(|| BranchctlError::invalid_enum_value(kind, value))
}

/// Step inputs as received, before any validation
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub api_key: String,
    pub project_id: String,
    pub api_host: String,
    /// `"true"` enables ORM pooling parameters, anything else disables them
    pub prisma: String,
    pub database: String,
    pub role: String,
    pub branch_type: String,
    pub ssl: String,
    pub suspend_timeout: String,
    pub parent_branch: Option<String>,
    pub branch_name: Option<String>,
    pub expires_at: Option<String>,
    /// JSON-encoded list of masking rules
    pub masking_rules: Option<String>,
    pub get_auth_url: String,
}

/// Validated parameters for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateParams {
    pub api_key: String,
    pub api_host: String,
    pub project_id: String,
    pub use_prisma: bool,
    pub database: String,
    pub role: String,
    pub branch_type: BranchType,
    pub ssl_mode: SslMode,
    pub suspend_timeout: i64,
    pub branch_name: Option<String>,
    pub parent_branch: Option<String>,
    pub expires_at: Option<String>,
    pub masking_rules: Vec<MaskingRule>,
    pub get_auth_url: bool,
}

/// Trim an optional input, mapping empty to `None`
fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Trim an input that has a default, using the default when empty
fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn required(value: &str, name: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BranchctlError::config_error(format!(
            "Input required and not supplied: {name}"
        )));
    }
    Ok(value.to_string())
}

/// Check the API host against the permissive URL pattern
pub fn validate_api_host(api_host: &str) -> Result<()> {
    let pattern = RegexBuilder::new(API_HOST_PATTERN)
        .case_insensitive(true)
        .build()
        .map_err(|e| BranchctlError::config_error(format!("Invalid API host pattern: {e}")))?;

    if pattern.is_match(api_host) {
        Ok(())
    } else {
        Err(BranchctlError::config_error("API host must be a valid URL"))
    }
}

/// Parse the suspend timeout, in seconds
pub fn parse_suspend_timeout(value: &str) -> Result<i64> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse::<i64>()
        .map_err(|_| BranchctlError::config_error("Suspend timeout must be a number"))
}

/// Validate an RFC 3339 expiration timestamp, returning it unchanged
pub fn parse_expires_at(value: &str) -> Result<String> {
    DateTime::parse_from_rfc3339(value)
        .map(|_| value.to_string())
        .map_err(|_| BranchctlError::config_error(format!("Invalid expiration timestamp: {value}")))
}

/// Parse the JSON-encoded masking rule list
pub fn parse_masking_rules(value: &str) -> Result<Vec<MaskingRule>> {
    serde_json::from_str(value)
        .map_err(|e| BranchctlError::config_error(format!("Invalid masking rules: {e}")))
}

impl RawInputs {
    /// Validate inputs and produce typed parameters
    pub fn validate(&self) -> Result<CreateParams> {
        let api_key = required(&self.api_key, "api_key")?;
        let project_id = required(&self.project_id, "project_id")?;

        let api_host = or_default(&self.api_host, DEFAULT_API_HOST);
        validate_api_host(&api_host)?;

        let ssl_mode: SslMode = or_default(&self.ssl, SslMode::Require.as_str()).parse()?;
        let branch_type: BranchType =
            or_default(&self.branch_type, BranchType::Default.as_str()).parse()?;
        let suspend_timeout = parse_suspend_timeout(&self.suspend_timeout)?;

        let expires_at = non_empty(self.expires_at.as_ref())
            .map(|v| parse_expires_at(&v))
            .transpose()?;
        let masking_rules = non_empty(self.masking_rules.as_ref())
            .map(|v| parse_masking_rules(&v))
            .transpose()?
            .unwrap_or_default();

        Ok(CreateParams {
            api_key,
            api_host,
            project_id,
            use_prisma: self.prisma.trim() == "true",
            database: or_default(&self.database, DEFAULT_DATABASE),
            role: or_default(&self.role, DEFAULT_ROLE),
            branch_type,
            ssl_mode,
            suspend_timeout,
            branch_name: non_empty(self.branch_name.as_ref()),
            parent_branch: non_empty(self.parent_branch.as_ref()),
            expires_at,
            masking_rules,
            get_auth_url: self.get_auth_url.trim() == "true",
        })
    }
}
