//! branchctl CLI Entry Point
//!
//! Reads the step inputs (flags, or the `INPUT_*` variables a CI runner
//! sets), validates them, runs the get-or-create flow and reports the
//! outcome.
//!
//! All output to stdout is a single JSON envelope. Logs go to stderr.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use branchctl::config::{DEFAULT_API_HOST, DEFAULT_DATABASE, DEFAULT_ROLE};
use branchctl::output::{error_command, mask_command, write_step_outputs};
use branchctl::{create, CreateResult, ErrorEnvelope, EventContext, Metadata, RawInputs, SuccessEnvelope};

const COMMAND: &str = "create";

/// branchctl - get or create a database branch and print its connection strings
#[derive(Parser, Debug)]
#[command(name = "branchctl")]
#[command(about = "Get or create a database branch and resolve its connection strings")]
#[command(version)]
struct Cli {
    /// Control-plane API key
    #[arg(long, env = "INPUT_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Project that owns the branch
    #[arg(long, env = "INPUT_PROJECT_ID", default_value = "")]
    project_id: String,

    /// Control-plane API base URL
    #[arg(long, env = "INPUT_API_HOST", default_value = DEFAULT_API_HOST)]
    api_host: String,

    /// "true" to add Prisma pooling parameters to the connection strings
    #[arg(long, env = "INPUT_PRISMA", default_value = "false")]
    prisma: String,

    /// Database the connection strings point at
    #[arg(long, env = "INPUT_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    /// Role used in the connection strings
    #[arg(long, env = "INPUT_ROLE", default_value = DEFAULT_ROLE)]
    role: String,

    /// default | schema-only
    #[arg(long, env = "INPUT_BRANCH_TYPE", default_value = "default")]
    branch_type: String,

    /// require | verify-ca | verify-full | omit
    #[arg(long, env = "INPUT_SSL", default_value = "require")]
    ssl: String,

    /// Compute suspend timeout in seconds
    #[arg(long, env = "INPUT_SUSPEND_TIMEOUT", default_value = "0")]
    suspend_timeout: String,

    /// Parent branch name or id (defaults to the project's default branch)
    #[arg(long, env = "INPUT_PARENT_BRANCH")]
    parent_branch: Option<String>,

    /// Branch name to get or create
    #[arg(long, env = "INPUT_BRANCH_NAME")]
    branch_name: Option<String>,

    /// RFC 3339 timestamp after which the branch is deleted
    #[arg(long, env = "INPUT_EXPIRES_AT")]
    expires_at: Option<String>,

    /// JSON list of masking rules (new branches only)
    #[arg(long, env = "INPUT_MASKING_RULES")]
    masking_rules: Option<String>,

    /// "true" to also resolve the branch's auth URL
    #[arg(long, env = "INPUT_GET_AUTH_URL", default_value = "false")]
    get_auth_url: String,

    /// Step output file (set by the CI runner)
    #[arg(long, env = "GITHUB_OUTPUT", hide = true)]
    github_output: Option<PathBuf>,
}

impl Cli {
    fn raw_inputs(&self) -> RawInputs {
        RawInputs {
            api_key: self.api_key.clone(),
            project_id: self.project_id.clone(),
            api_host: self.api_host.clone(),
            prisma: self.prisma.clone(),
            database: self.database.clone(),
            role: self.role.clone(),
            branch_type: self.branch_type.clone(),
            ssl: self.ssl.clone(),
            suspend_timeout: self.suspend_timeout.clone(),
            parent_branch: self.parent_branch.clone(),
            branch_name: self.branch_name.clone(),
            expires_at: self.expires_at.clone(),
            masking_rules: self.masking_rules.clone(),
            get_auth_url: self.get_auth_url.clone(),
        }
    }
}

fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("BRANCHCTL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to initialise logging")
}

fn in_ci() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let json = serde_json::to_string(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn report_success(cli: &Cli, result: &CreateResult, started: Instant) -> anyhow::Result<()> {
    if in_ci() {
        eprintln!("{}", mask_command(&result.password));
    }
    if let Some(path) = &cli.github_output {
        write_step_outputs(path, result)
            .with_context(|| format!("failed to write step outputs to {}", path.display()))?;
    }

    let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    print_json(&SuccessEnvelope::new(COMMAND, result, Metadata::new(elapsed)))
}

fn report_failure(err: &branchctl::BranchctlError) -> anyhow::Result<()> {
    tracing::error!(code = err.error_code(), "{}", err);
    if in_ci() {
        eprintln!("{}", error_command(&err.message()));
    }
    print_json(&ErrorEnvelope::from_error(COMMAND, err))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging() {
        eprintln!("{e:#}");
    }

    let started = Instant::now();
    let outcome = match cli.raw_inputs().validate() {
        Ok(params) => create(&params, &EventContext::from_env()).await,
        Err(e) => Err(e),
    };

    let reported = match &outcome {
        Ok(result) => report_success(&cli, result, started),
        Err(err) => report_failure(err),
    };

    match (outcome, reported) {
        (Ok(_), Ok(())) => ExitCode::SUCCESS,
        (_, Err(e)) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
        (Err(_), Ok(())) => ExitCode::FAILURE,
    }
}
