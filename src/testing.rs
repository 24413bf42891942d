//! In-memory control plane used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::api::{
    AnonymizedBranchRequest, Branch, ControlPlane, CreateBranchRequest, Database, Endpoint, Role,
};
use crate::error::{BranchctlError, Result};

/// A recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListBranches { search: Option<String>, limit: u32 },
    CreateBranch(CreateBranchRequest),
    CreateAnonymizedBranch(AnonymizedBranchRequest),
    ListEndpoints { branch_id: String },
    GetDatabase { branch_id: String, database: String },
    GetRole { branch_id: String, role: String },
    GetRolePassword { branch_id: String, role: String },
    GetAuthUrl { branch_id: String },
}

/// Fake control plane. The search filter is a substring match, like the
/// real one, so exact-match filtering in callers is exercised.
#[derive(Debug, Default)]
pub struct FakeControlPlane {
    pub branches: Vec<Branch>,
    pub created: Option<Branch>,
    pub endpoints: Vec<Endpoint>,
    pub databases: HashSet<String>,
    pub roles: HashSet<String>,
    pub passwords: HashMap<String, String>,
    pub auth_url: Option<String>,
    /// Makes `list_endpoints` fail with a transport error
    pub endpoints_unreachable: bool,
    pub calls: Mutex<Vec<Call>>,
}

pub fn branch(id: &str, name: &str) -> Branch {
    Branch {
        id: id.to_string(),
        name: name.to_string(),
        parent_id: None,
        current_state: Some("ready".to_string()),
        expires_at: None,
    }
}

pub fn endpoint(id: &str) -> Endpoint {
    Endpoint { id: id.to_string(), host: format!("{id}.endpoint.com"), branch_id: String::new() }
}

impl FakeControlPlane {
    /// A plane whose branch `1` has endpoint `e1`, database `neondb` and
    /// role `neondb_owner` with password `password`
    pub fn happy() -> Self {
        Self {
            created: Some(branch("1", "branchName")),
            endpoints: vec![endpoint("e1")],
            databases: HashSet::from(["neondb".to_string()]),
            roles: HashSet::from(["neondb_owner".to_string()]),
            passwords: HashMap::from([("neondb_owner".to_string(), "password".to_string())]),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateBranch(_) | Call::CreateAnonymizedBranch(_)))
            .count()
    }

    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn created_branch(&self) -> Result<Branch> {
        self.created.clone().ok_or_else(|| BranchctlError::api(500, "create not configured"))
    }
}

impl ControlPlane for FakeControlPlane {
    async fn list_branches(&self, _project_id: &str, search: Option<&str>, limit: u32) -> Result<Vec<Branch>> {
        self.record(Call::ListBranches { search: search.map(str::to_string), limit });
        Ok(self
            .branches
            .iter()
            .filter(|b| search.map_or(true, |s| b.name.contains(s) || b.id.contains(s)))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn create_branch(&self, _project_id: &str, request: &CreateBranchRequest) -> Result<Branch> {
        self.record(Call::CreateBranch(request.clone()));
        self.created_branch()
    }

    async fn create_anonymized_branch(
        &self,
        _project_id: &str,
        request: &AnonymizedBranchRequest,
    ) -> Result<Branch> {
        self.record(Call::CreateAnonymizedBranch(request.clone()));
        self.created_branch()
    }

    async fn list_endpoints(&self, _project_id: &str, branch_id: &str) -> Result<Vec<Endpoint>> {
        self.record(Call::ListEndpoints { branch_id: branch_id.to_string() });
        if self.endpoints_unreachable {
            return Err(BranchctlError::transport("request timed out"));
        }
        Ok(self.endpoints.clone())
    }

    async fn get_database(&self, _project_id: &str, branch_id: &str, database: &str) -> Result<Database> {
        self.record(Call::GetDatabase { branch_id: branch_id.to_string(), database: database.to_string() });
        if self.databases.contains(database) {
            Ok(Database { name: database.to_string(), branch_id: branch_id.to_string() })
        } else {
            Err(BranchctlError::api(404, "database not found"))
        }
    }

    async fn get_role(&self, _project_id: &str, branch_id: &str, role: &str) -> Result<Role> {
        self.record(Call::GetRole { branch_id: branch_id.to_string(), role: role.to_string() });
        if self.roles.contains(role) {
            Ok(Role { name: role.to_string(), branch_id: branch_id.to_string() })
        } else {
            Err(BranchctlError::api(404, "role not found"))
        }
    }

    async fn get_role_password(&self, _project_id: &str, branch_id: &str, role: &str) -> Result<String> {
        self.record(Call::GetRolePassword { branch_id: branch_id.to_string(), role: role.to_string() });
        self.passwords
            .get(role)
            .cloned()
            .ok_or_else(|| BranchctlError::api(404, "password not found"))
    }

    async fn get_auth_url(&self, _project_id: &str, branch_id: &str) -> Result<String> {
        self.record(Call::GetAuthUrl { branch_id: branch_id.to_string() });
        self.auth_url.clone().ok_or_else(|| BranchctlError::api(404, "auth not configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_overridden_fake_records_calls() {
        let plane = FakeControlPlane { endpoints: vec![], ..FakeControlPlane::happy() };

        assert!(plane.list_endpoints("p", "1").await.unwrap().is_empty());
        assert!(plane.get_role("p", "1", "missing").await.is_err());
        assert_eq!(
            plane.calls(),
            vec![
                Call::ListEndpoints { branch_id: "1".to_string() },
                Call::GetRole { branch_id: "1".to_string(), role: "missing".to_string() },
            ]
        );
        assert_eq!(plane.create_calls(), 0);
    }
}
