//! Get-or-create orchestration.
//!
//! A straight line with two fallible stages, each wrapped with its own
//! context: resolve the branch, then resolve its connection info. The auth
//! URL lookup is an optional third step.

use serde::Serialize;
use tracing::info;

use crate::annotations::EventContext;
use crate::api::{ControlPlane, HttpControlPlane};
use crate::branch::{resolve_or_create_branch, BranchRequest};
use crate::config::CreateParams;
use crate::connection::{resolve_connection_info, ConnectionRequest};
use crate::error::{Result, ResultExt};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateResult {
    /// True if this run created the branch
    pub created: bool,
    pub branch_id: String,
    pub db_url: String,
    pub db_url_pooled: String,
    pub db_host: String,
    pub db_host_pooled: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
}

impl From<&CreateParams> for BranchRequest {
    fn from(params: &CreateParams) -> Self {
        Self {
            project_id: params.project_id.clone(),
            branch_name: params.branch_name.clone(),
            schema_only: params.branch_type.is_schema_only(),
            parent_branch: params.parent_branch.clone(),
            suspend_timeout: params.suspend_timeout,
            expires_at: params.expires_at.clone(),
            masking_rules: params.masking_rules.clone(),
        }
    }
}

/// Run against the HTTP control plane named in `params`
pub async fn create(params: &CreateParams, context: &EventContext) -> Result<CreateResult> {
    let client = HttpControlPlane::new(&params.api_host, &params.api_key)?;
    create_with(&client, params, context).await
}

/// Run against any control plane
pub async fn create_with<C: ControlPlane>(
    client: &C,
    params: &CreateParams,
    context: &EventContext,
) -> Result<CreateResult> {
    let resolved = resolve_or_create_branch(client, &BranchRequest::from(params), context)
        .await
        .stage(|| "Failed to create branch".to_string())?;
    let branch = resolved.branch;

    let connection = resolve_connection_info(
        client,
        &ConnectionRequest {
            project_id: params.project_id.clone(),
            branch_id: branch.id.clone(),
            use_prisma: params.use_prisma,
            ssl_mode: params.ssl_mode,
            database: params.database.clone(),
            role: params.role.clone(),
        },
    )
    .await
    .stage(|| "Failed to get connection info".to_string())?;

    let auth_url = if params.get_auth_url {
        let url = client
            .get_auth_url(&params.project_id, &branch.id)
            .await
            .stage(|| format!("Failed to get auth URL for branch {}", branch.id))?;
        Some(url)
    } else {
        None
    };

    if resolved.created {
        info!(branch = %branch.name, id = %branch.id, "branch created successfully");
    } else {
        info!(branch = %branch.name, id = %branch.id, "branch already exists, reusing existing branch");
    }

    Ok(CreateResult {
        created: resolved.created,
        branch_id: branch.id,
        db_url: connection.database_url,
        db_url_pooled: connection.database_url_pooled,
        db_host: connection.database_host,
        db_host_pooled: connection.database_host_pooled,
        password: connection.password,
        expires_at: branch.expires_at,
        auth_url,
    })
}
