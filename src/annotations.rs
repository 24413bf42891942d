//! Branch annotations describing the CI event that triggered a run.
//!
//! The event context is captured once, up front, into an [`EventContext`]
//! and handed to the branch resolver explicitly.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Run-scoped CI event context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    /// `owner/repo`
    pub repository: String,
    pub actor: Option<String>,
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
    pub pr_number: Option<u64>,
    pub pr_title: Option<String>,
    pub git_ref: Option<String>,
    pub pr_head_ref: Option<String>,
    pub action_ref: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    #[serde(default)]
    head_commit: Option<HeadCommit>,
    #[serde(default)]
    pull_request: Option<PullRequest>,
}

#[derive(Debug, Deserialize)]
struct HeadCommit {
    id: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: Option<u64>,
    title: Option<String>,
    head: Option<PullRequestHead>,
}

#[derive(Debug, Deserialize)]
struct PullRequestHead {
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn load_payload(path: &Path) -> EventPayload {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read event payload");
            return EventPayload::default();
        }
    };
    serde_json::from_str(&contents).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "could not parse event payload");
        EventPayload::default()
    })
}

impl EventContext {
    /// Capture the context from the runner environment
    ///
    /// Reads `GITHUB_REPOSITORY`, `GITHUB_ACTOR`, `GITHUB_REF`,
    /// `GITHUB_ACTION_REF` and the JSON payload at `GITHUB_EVENT_PATH`.
    /// Missing pieces are simply left out.
    #[must_use]
    pub fn from_env() -> Self {
        let event_path = env_var("GITHUB_EVENT_PATH");

        Self::from_event_file(
            env_var("GITHUB_REPOSITORY").unwrap_or_default(),
            env_var("GITHUB_ACTOR"),
            env_var("GITHUB_REF"),
            env_var("GITHUB_ACTION_REF"),
            event_path.as_deref().map(Path::new),
        )
    }

    /// Build the context from explicit values and an optional payload file
    fn from_event_file(
        repository: String,
        actor: Option<String>,
        git_ref: Option<String>,
        action_ref: Option<String>,
        event_path: Option<&Path>,
    ) -> Self {
        let payload = event_path.map(load_payload).unwrap_or_default();
        let (commit_sha, commit_message) = payload
            .head_commit
            .map(|c| (c.id, c.message))
            .unwrap_or_default();
        let (pr_number, pr_title, pr_head_ref) = payload
            .pull_request
            .map(|pr| (pr.number, pr.title, pr.head.and_then(|h| h.git_ref)))
            .unwrap_or_default();

        Self {
            repository,
            actor,
            commit_sha,
            commit_message,
            pr_number,
            pr_title,
            git_ref,
            pr_head_ref,
            action_ref,
        }
    }

    /// Annotation map attached to branch-creation requests
    ///
    /// `github-commit-repo` is always present; every other key only when it
    /// has a non-empty value.
    #[must_use]
    pub fn annotations(&self) -> BTreeMap<String, String> {
        let mut annotations = BTreeMap::new();
        annotations.insert("github-commit-repo".to_string(), self.repository.clone());

        let mut add = |key: &str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                annotations.insert(key.to_string(), value);
            }
        };

        add("github-commit-author-login", self.actor.clone());
        add("github-commit-sha", self.commit_sha.clone());
        add("github-commit-message", self.commit_message.clone());
        add("github-pr-number", self.pr_number.map(|n| n.to_string()));
        add("github-pr-title", self.pr_title.clone());
        add(
            "github-commit-ref",
            self.git_ref.clone().filter(|r| !r.is_empty()).or_else(|| self.pr_head_ref.clone()),
        );
        add("github-action-ref", self.action_ref.clone());

        annotations
    }
}
