//! Branch Resolution
//!
//! Finds a branch by exact name or id, or creates exactly one new branch.
//!
//! # Lookup
//! A single bounded listing call ([`BRANCH_LIST_LIMIT`]) with the identifier
//! as the server-side search term. The search is fuzzy, so the result is
//! filtered for exact `name` or `id` equality. Projects with more branches
//! than the cap can hide a match; there is no paging.
//!
//! # Creation
//! Existing branches are never modified. Masking rules can only be applied
//! when a branch is created, so asking for them against an existing branch
//! fails before any mutating call.

use serde::Serialize;
use tracing::debug;

use crate::annotations::EventContext;
use crate::api::{
    AnonymizedBranchRequest, Branch, BranchCreate, BranchSpec, ControlPlane, CreateBranchRequest,
    EndpointSpec, InitSource, MaskingRule, BRANCH_LIST_LIMIT,
};
use crate::error::{BranchctlError, Result};

/// Parameters for [`resolve_or_create_branch`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchRequest {
    pub project_id: String,
    /// Left to the control plane when absent
    pub branch_name: Option<String>,
    pub schema_only: bool,
    /// Parent branch name or id
    pub parent_branch: Option<String>,
    pub suspend_timeout: i64,
    pub expires_at: Option<String>,
    pub masking_rules: Vec<MaskingRule>,
}

/// A resolved branch and whether this run created it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBranch {
    pub branch: Branch,
    pub created: bool,
}

/// Find a branch whose name or id equals `identifier` exactly
///
/// Returns `Ok(None)` when there is no exact match; errors are reserved for
/// failed remote calls.
pub async fn find_branch<C: ControlPlane>(
    client: &C,
    project_id: &str,
    identifier: &str,
) -> Result<Option<Branch>> {
    let branches = client.list_branches(project_id, Some(identifier), BRANCH_LIST_LIMIT).await?;

    Ok(branches.into_iter().find(|b| b.name == identifier || b.id == identifier))
}

/// Return the named branch if it exists, otherwise create it
pub async fn resolve_or_create_branch<C: ControlPlane>(
    client: &C,
    request: &BranchRequest,
    context: &EventContext,
) -> Result<ResolvedBranch> {
    if let Some(name) = &request.branch_name {
        if let Some(branch) = find_branch(client, &request.project_id, name).await? {
            if !request.masking_rules.is_empty() {
                return Err(BranchctlError::conflict(format!(
                    "Branch {name} already exists; masking rules can only be applied when a branch is created"
                )));
            }
            debug!(branch = %branch.name, id = %branch.id, "found existing branch");
            return Ok(ResolvedBranch { branch, created: false });
        }
        debug!(branch = %name, "branch not found, creating it");
    }

    let branch = create_branch(client, request, context).await?;
    Ok(ResolvedBranch { branch, created: true })
}

/// Issue exactly one create call, resolving the parent first
async fn create_branch<C: ControlPlane>(
    client: &C,
    request: &BranchRequest,
    context: &EventContext,
) -> Result<Branch> {
    let parent_id = match &request.parent_branch {
        Some(parent) => {
            let found = find_branch(client, &request.project_id, parent).await?;
            let parent_branch = found
                .ok_or_else(|| BranchctlError::not_found(format!("Parent branch {parent} not found")))?;
            Some(parent_branch.id)
        }
        None => None,
    };

    let create = BranchCreate {
        branch: BranchSpec {
            name: request.branch_name.clone(),
            parent_id,
            init_source: request.schema_only.then_some(InitSource::SchemaOnly),
            expires_at: request.expires_at.clone(),
        },
        endpoints: vec![EndpointSpec::read_write(request.suspend_timeout)],
    };
    let annotation_value = context.annotations();

    if request.masking_rules.is_empty() {
        let body = CreateBranchRequest { create, annotation_value };
        client.create_branch(&request.project_id, &body).await
    } else {
        let body = AnonymizedBranchRequest {
            branch_create: create,
            masking_rules: request.masking_rules.clone(),
            start_anonymization: true,
            annotation_value,
        };
        client.create_anonymized_branch(&request.project_id, &body).await
    }
}
