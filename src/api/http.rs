//! HTTP implementation of [`ControlPlane`]
//!
//! Talks JSON over HTTPS to a Neon-style v2 API. One client is built per
//! invocation and carries the API key and user agent, so nothing is shared
//! between runs.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{
    AnonymizedBranchRequest, Branch, ControlPlane, CreateBranchRequest, Database, Endpoint, Role,
};
use crate::error::{BranchctlError, Result};

/// Total time allowed for a single request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-identifying header value
pub const USER_AGENT: &str = concat!("branchctl v", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct BranchesResponse {
    branches: Vec<Branch>,
}

#[derive(Deserialize)]
struct BranchResponse {
    branch: Branch,
}

#[derive(Deserialize)]
struct EndpointsResponse {
    endpoints: Vec<Endpoint>,
}

#[derive(Deserialize)]
struct DatabaseResponse {
    database: Database,
}

#[derive(Deserialize)]
struct RoleResponse {
    role: Role,
}

#[derive(Deserialize)]
struct PasswordResponse {
    password: String,
}

#[derive(Deserialize)]
struct AuthResponse {
    base_url: String,
}

/// Error body returned by the control plane on non-2xx responses
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// reqwest-backed control-plane client
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    client: Client,
    base: Url,
}

impl HttpControlPlane {
    /// Build a client bound to `api_host` and authenticated with `api_key`
    pub fn new(api_host: &str, api_key: &str) -> Result<Self> {
        Self::with_timeout(api_host, api_key, REQUEST_TIMEOUT)
    }

    pub(crate) fn with_timeout(api_host: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(api_host)
            .map_err(|e| BranchctlError::config_error(format!("API host must be a valid URL: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(BranchctlError::config_error("API host must be a valid URL"));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| BranchctlError::config_error("API key contains invalid characters"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| BranchctlError::config_error(format!("Could not build HTTP client: {e}")))?;

        Ok(Self { client, base })
    }

    /// Resolve path segments against the base URL, percent-encoding each one
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in `new`, so this always yields segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or_else(|_| {
                    let text = String::from_utf8_lossy(&body).trim().to_string();
                    if text.is_empty() {
                        status.canonical_reason().unwrap_or("unknown error").to_string()
                    } else {
                        text
                    }
                });
            return Err(BranchctlError::api(status.as_u16(), message));
        }

        serde_json::from_slice(&body).map_err(|e| BranchctlError::invalid_response(e.to_string()))
    }
}

impl ControlPlane for HttpControlPlane {
    async fn list_branches(
        &self,
        project_id: &str,
        search: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Branch>> {
        debug!(project_id, search, limit, "listing branches");
        let mut url = self.url(&["projects", project_id, "branches"]);
        {
            let mut query = url.query_pairs_mut();
            if let Some(search) = search {
                query.append_pair("search", search);
            }
            query.append_pair("limit", &limit.to_string());
        }

        let response: BranchesResponse = self.send(self.client.get(url)).await?;
        Ok(response.branches)
    }

    async fn create_branch(&self, project_id: &str, request: &CreateBranchRequest) -> Result<Branch> {
        debug!(project_id, name = ?request.create.branch.name, "creating branch");
        let url = self.url(&["projects", project_id, "branches"]);

        let response: BranchResponse = self.send(self.client.post(url).json(request)).await?;
        Ok(response.branch)
    }

    async fn create_anonymized_branch(
        &self,
        project_id: &str,
        request: &AnonymizedBranchRequest,
    ) -> Result<Branch> {
        debug!(
            project_id,
            name = ?request.branch_create.branch.name,
            rules = request.masking_rules.len(),
            "creating anonymized branch"
        );
        let url = self.url(&["projects", project_id, "branch_anonymized"]);

        let response: BranchResponse = self.send(self.client.post(url).json(request)).await?;
        Ok(response.branch)
    }

    async fn list_endpoints(&self, project_id: &str, branch_id: &str) -> Result<Vec<Endpoint>> {
        debug!(project_id, branch_id, "listing endpoints");
        let url = self.url(&["projects", project_id, "branches", branch_id, "endpoints"]);

        let response: EndpointsResponse = self.send(self.client.get(url)).await?;
        Ok(response.endpoints)
    }

    async fn get_database(&self, project_id: &str, branch_id: &str, database: &str) -> Result<Database> {
        debug!(project_id, branch_id, database, "fetching database");
        let url = self.url(&["projects", project_id, "branches", branch_id, "databases", database]);

        let response: DatabaseResponse = self.send(self.client.get(url)).await?;
        Ok(response.database)
    }

    async fn get_role(&self, project_id: &str, branch_id: &str, role: &str) -> Result<Role> {
        debug!(project_id, branch_id, role, "fetching role");
        let url = self.url(&["projects", project_id, "branches", branch_id, "roles", role]);

        let response: RoleResponse = self.send(self.client.get(url)).await?;
        Ok(response.role)
    }

    async fn get_role_password(&self, project_id: &str, branch_id: &str, role: &str) -> Result<String> {
        debug!(project_id, branch_id, role, "revealing role password");
        let url = self.url(&[
            "projects",
            project_id,
            "branches",
            branch_id,
            "roles",
            role,
            "reveal_password",
        ]);

        let response: PasswordResponse = self.send(self.client.get(url)).await?;
        Ok(response.password)
    }

    async fn get_auth_url(&self, project_id: &str, branch_id: &str) -> Result<String> {
        debug!(project_id, branch_id, "fetching auth url");
        let url = self.url(&["projects", project_id, "branches", branch_id, "auth"]);

        let response: AuthResponse = self.send(self.client.get(url)).await?;
        Ok(response.base_url)
    }
}
