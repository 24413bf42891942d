//! Connection Info Resolution
//!
//! Turns a resolved branch into direct and pooled Postgres connection
//! strings.
//!
//! # Connection String Contract
//! `postgresql://<role>:<urlencoded-password>@<host>/<database>[?<params>]`
//!
//! Query parameters are always emitted in this order, because some
//! consumers read them positionally:
//! 1. `connect_timeout=30` (ORM pooling only)
//! 2. `pool_timeout=30`, `pgbouncer=true` (ORM pooling, pooled URL only)
//! 3. `sslmode=<mode>` (unless the mode is `omit`)

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::api::{ControlPlane, Endpoint};
use crate::config::SslMode;
use crate::error::{BranchctlError, Result, ResultExt};

/// Host-name suffix that routes through the connection pooler
pub const POOLER_SUFFIX: &str = "-pooler";

/// Timeout (seconds) used for the ORM pooling parameters
const ORM_TIMEOUT_SECS: &str = "30";

/// Parameters for [`resolve_connection_info`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRequest {
    pub project_id: String,
    pub branch_id: String,
    /// Shape the URLs for Prisma's pooling conventions
    pub use_prisma: bool,
    pub ssl_mode: SslMode,
    pub database: String,
    pub role: String,
}

/// Everything needed to reach a branch. Built fresh for every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub database_url: String,
    pub database_url_pooled: String,
    pub database_host: String,
    pub database_host_pooled: String,
    pub password: String,
}

/// Derive the pooled host by inserting [`POOLER_SUFFIX`] after the endpoint id
///
/// Fails when the id does not appear in the host, rather than silently
/// returning a "pooled" host that is really the direct one.
pub fn pooled_host(endpoint: &Endpoint) -> Result<String> {
    if endpoint.id.is_empty() || !endpoint.host.contains(&endpoint.id) {
        return Err(BranchctlError::invalid_response(format!(
            "Endpoint {} host {} does not contain the endpoint id",
            endpoint.id, endpoint.host
        )));
    }
    Ok(endpoint.host.replacen(&endpoint.id, &format!("{}{POOLER_SUFFIX}", endpoint.id), 1))
}

/// Build a single connection URL
///
/// Pure: identical inputs always produce byte-identical output.
pub fn connection_url(
    host: &str,
    database: &str,
    role: &str,
    password: &str,
    params: &[(&str, &str)],
) -> Result<String> {
    let mut url = Url::parse(&format!("postgresql://{host}"))
        .map_err(|e| BranchctlError::invalid_response(format!("Invalid endpoint host {host}: {e}")))?;

    url.set_username(role)
        .map_err(|()| BranchctlError::invalid_response(format!("Cannot set role on host {host}")))?;
    url.set_password(Some(password))
        .map_err(|()| BranchctlError::invalid_response(format!("Cannot set password on host {host}")))?;
    url.set_path(&format!("/{database}"));

    // An empty query_pairs_mut() would still leave a trailing '?'
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }

    Ok(url.into())
}

type QueryParams = Vec<(&'static str, &'static str)>;

/// Ordered query parameters for the direct and pooled URLs
fn query_params(use_prisma: bool, ssl_mode: SslMode) -> (QueryParams, QueryParams) {
    let mut direct = Vec::new();
    let mut pooled = Vec::new();

    if use_prisma {
        direct.push(("connect_timeout", ORM_TIMEOUT_SECS));

        pooled.push(("connect_timeout", ORM_TIMEOUT_SECS));
        pooled.push(("pool_timeout", ORM_TIMEOUT_SECS));
        pooled.push(("pgbouncer", "true"));
    }

    if let Some(mode) = ssl_mode.query_value() {
        direct.push(("sslmode", mode));
        pooled.push(("sslmode", mode));
    }

    (direct, pooled)
}

/// Assemble [`ConnectionInfo`] from an endpoint and credentials, no I/O
pub fn build_connection_info(
    endpoint: &Endpoint,
    database: &str,
    role: &str,
    password: String,
    use_prisma: bool,
    ssl_mode: SslMode,
) -> Result<ConnectionInfo> {
    let host = endpoint.host.clone();
    let host_pooled = pooled_host(endpoint)?;
    let (direct_params, pooled_params) = query_params(use_prisma, ssl_mode);

    Ok(ConnectionInfo {
        database_url: connection_url(&host, database, role, &password, &direct_params)?,
        database_url_pooled: connection_url(&host_pooled, database, role, &password, &pooled_params)?,
        database_host: host,
        database_host_pooled: host_pooled,
        password,
    })
}

/// Resolve connection details for a branch
///
/// Takes the first endpoint in listing order, checks that the database and
/// role exist, then reveals the role's password.
pub async fn resolve_connection_info<C: ControlPlane>(
    client: &C,
    request: &ConnectionRequest,
) -> Result<ConnectionInfo> {
    let ConnectionRequest { project_id, branch_id, database, role, .. } = request;

    let endpoint = async {
        let endpoints = client.list_endpoints(project_id, branch_id).await?;
        endpoints
            .into_iter()
            .next()
            .ok_or_else(|| BranchctlError::not_found(format!("No endpoints found for branch {branch_id}")))
    }
    .await
    .stage(|| "Failed to get branch endpoints".to_string())?;
    debug!(endpoint = %endpoint.id, host = %endpoint.host, "using endpoint");

    client
        .get_database(project_id, branch_id, database)
        .await
        .stage(|| format!("Database {database} not found"))?;

    client
        .get_role(project_id, branch_id, role)
        .await
        .stage(|| format!("Role {role} not found"))?;

    let password = client
        .get_role_password(project_id, branch_id, role)
        .await
        .stage(|| format!("Failed to get password for role {role}"))?;

    build_connection_info(&endpoint, database, role, password, request.use_prisma, request.ssl_mode)
}
