//! Control-Plane Traits and Core Types
//!
//! This module defines the data model returned by the branch control plane
//! and the `ControlPlane` trait that the resolvers are written against.
//!
//! # One Call, One Exchange
//! Every trait method is a single request/response. There are no retries,
//! no paging loops and no caching; callers sequence calls themselves.
//!
//! # Absence
//! Listing calls return empty vectors for "nothing there". Single-resource
//! lookups surface a missing resource as an error (`Api` with status 404),
//! since the caller always treats that as fatal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

pub mod http;

pub use http::HttpControlPlane;

/// Server-side cap for branch listing. Matches beyond it are not visible.
pub const BRANCH_LIST_LIMIT: u32 = 10_000;

/// A database branch as reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Lifecycle state (`init`, `ready`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Endpoint kind requested on create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    ReadWrite,
}

/// A compute endpoint attached to a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,

    pub host: String,

    #[serde(default)]
    pub branch_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,

    #[serde(default)]
    pub branch_id: String,
}

/// A Postgres role. The password is deliberately not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,

    #[serde(default)]
    pub branch_id: String,
}

/// Data-anonymization directive applied when a branch is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingRule {
    pub database_name: String,

    pub schema_name: String,

    pub table_name: String,

    pub column_name: String,

    pub masking_function: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masking_value: Option<String>,
}

/// How a new branch is populated from its parent
///
/// Absent means the control plane default (copy the parent's data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitSource {
    #[serde(rename = "schema-only")]
    SchemaOnly,
}

/// Branch part of a create request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSpec {
    /// Omitted means the control plane picks a name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_source: Option<InitSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Endpoint part of a create request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,

    pub suspend_timeout_seconds: i64,
}

impl EndpointSpec {
    #[must_use]
    pub const fn read_write(suspend_timeout_seconds: i64) -> Self {
        Self { endpoint_type: EndpointType::ReadWrite, suspend_timeout_seconds }
    }
}

/// Branch and endpoint payload shared by both create variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCreate {
    pub branch: BranchSpec,

    pub endpoints: Vec<EndpointSpec>,
}

/// `POST /projects/{id}/branches` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBranchRequest {
    #[serde(flatten)]
    pub create: BranchCreate,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotation_value: BTreeMap<String, String>,
}

/// `POST /projects/{id}/branch_anonymized` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizedBranchRequest {
    pub branch_create: BranchCreate,

    pub masking_rules: Vec<MaskingRule>,

    pub start_anonymization: bool,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotation_value: BTreeMap<String, String>,
}

/// Control-plane trait
///
/// The resolvers only ever talk to the control plane through this trait,
/// which keeps them testable against an in-memory fake.
pub trait ControlPlane {
    /// List branches of a project, optionally filtered server-side by `search`
    ///
    /// The search may return near-matches; callers filter for exact equality.
    fn list_branches(
        &self,
        project_id: &str,
        search: Option<&str>,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Branch>>> + Send;

    /// Create a branch with a single endpoint
    fn create_branch(
        &self,
        project_id: &str,
        request: &CreateBranchRequest,
    ) -> impl std::future::Future<Output = Result<Branch>> + Send;

    /// Create a branch and start anonymizing it with the given masking rules
    fn create_anonymized_branch(
        &self,
        project_id: &str,
        request: &AnonymizedBranchRequest,
    ) -> impl std::future::Future<Output = Result<Branch>> + Send;

    /// List endpoints of a branch, in control-plane order
    fn list_endpoints(
        &self,
        project_id: &str,
        branch_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Endpoint>>> + Send;

    fn get_database(
        &self,
        project_id: &str,
        branch_id: &str,
        database: &str,
    ) -> impl std::future::Future<Output = Result<Database>> + Send;

    fn get_role(
        &self,
        project_id: &str,
        branch_id: &str,
        role: &str,
    ) -> impl std::future::Future<Output = Result<Role>> + Send;

    /// Reveal the current password of a role
    fn get_role_password(
        &self,
        project_id: &str,
        branch_id: &str,
        role: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Base URL of the branch's auth integration
    fn get_auth_url(
        &self,
        project_id: &str,
        branch_id: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}
