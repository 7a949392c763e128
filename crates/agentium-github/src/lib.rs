//! GitHub REST interface glue.
//!
//! The pipeline touches GitHub for issues, branches, draft PRs, check
//! runs, and merges. This crate specifies that surface as a trait, with a
//! reqwest-backed implementation and an in-memory fake for driver tests.
//! Retry policy is the caller's concern.

use agentium_core::{AgentiumError, AgentiumResult};
use agentium_handoff::IssueContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// A pull request as the pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
    pub draft: bool,
}

/// Aggregate conclusion of the check runs on a ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckConclusion {
    Success,
    Failure,
    Pending,
}

/// Outcome of a merge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub merged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// The GitHub operations the pipeline depends on.
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// Fetch an issue into the hand-off seed shape.
    async fn fetch_issue(&self, number: u64) -> AgentiumResult<IssueContext>;

    /// Create a branch pointing at a commit.
    async fn create_branch(&self, name: &str, from_sha: &str) -> AgentiumResult<()>;

    /// Open a draft pull request.
    async fn open_draft_pr(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> AgentiumResult<PullRequest>;

    /// Aggregate check-run conclusion for a ref.
    async fn check_conclusion(&self, git_ref: &str) -> AgentiumResult<CheckConclusion>;

    /// Merge a pull request.
    async fn merge_pr(&self, number: u64) -> AgentiumResult<MergeResult>;
}

/// REST-backed client for one repository.
pub struct RestGitHubClient {
    http: reqwest::Client,
    base_url: String,
    repository: String,
    token: String,
}

impl RestGitHubClient {
    /// Client for `owner/name` using the public API.
    pub fn new(repository: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_base_url("https://api.github.com", repository, token)
    }

    /// Client against an explicit API root, for tests and GHE.
    pub fn with_base_url(
        base_url: impl Into<String>,
        repository: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            repository: repository.into(),
            token: token.into(),
        }
    }

    fn url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{tail}",
            self.base_url.trim_end_matches('/'),
            self.repository
        )
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> AgentiumResult<serde_json::Value> {
        let resp = req
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "agentium")
            .send()
            .await
            .map_err(|e| AgentiumError::Http(e.to_string()))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .unwrap_or(serde_json::Value::Null);

        if !status.is_success() {
            return Err(AgentiumError::GitHub(format!(
                "GitHub API error {status}: {body}"
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl GitHubClient for RestGitHubClient {
    async fn fetch_issue(&self, number: u64) -> AgentiumResult<IssueContext> {
        let body = self
            .send(self.http.get(self.url(&format!("issues/{number}"))))
            .await?;
        Ok(IssueContext {
            number,
            title: body["title"].as_str().unwrap_or_default().to_string(),
            body: body["body"].as_str().unwrap_or_default().to_string(),
            url: body["html_url"].as_str().map(ToString::to_string),
        })
    }

    async fn create_branch(&self, name: &str, from_sha: &str) -> AgentiumResult<()> {
        self.send(self.http.post(self.url("git/refs")).json(&serde_json::json!({
            "ref": format!("refs/heads/{name}"),
            "sha": from_sha,
        })))
        .await?;
        info!(branch = name, "Created branch");
        Ok(())
    }

    async fn open_draft_pr(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> AgentiumResult<PullRequest> {
        let resp = self
            .send(self.http.post(self.url("pulls")).json(&serde_json::json!({
                "title": title,
                "head": head,
                "base": base,
                "body": body,
                "draft": true,
            })))
            .await?;
        Ok(PullRequest {
            number: resp["number"].as_u64().unwrap_or_default(),
            url: resp["html_url"].as_str().unwrap_or_default().to_string(),
            draft: resp["draft"].as_bool().unwrap_or(true),
        })
    }

    async fn check_conclusion(&self, git_ref: &str) -> AgentiumResult<CheckConclusion> {
        let body = self
            .send(
                self.http
                    .get(self.url(&format!("commits/{git_ref}/check-runs"))),
            )
            .await?;
        let runs = body["check_runs"].as_array().cloned().unwrap_or_default();

        let mut conclusion = CheckConclusion::Success;
        for run in &runs {
            match run["conclusion"].as_str() {
                Some("success") | Some("skipped") | Some("neutral") => {}
                Some(_) => return Ok(CheckConclusion::Failure),
                None => conclusion = CheckConclusion::Pending,
            }
        }
        Ok(conclusion)
    }

    async fn merge_pr(&self, number: u64) -> AgentiumResult<MergeResult> {
        let body = self
            .send(self.http.put(self.url(&format!("pulls/{number}/merge"))))
            .await?;
        Ok(MergeResult {
            merged: body["merged"].as_bool().unwrap_or(false),
            sha: body["sha"].as_str().map(ToString::to_string),
        })
    }
}

/// In-memory fake for tests: seed issues, observe created branches and
/// PRs, script check conclusions and merges.
#[derive(Default)]
pub struct InMemoryGitHub {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    issues: HashMap<u64, IssueContext>,
    branches: Vec<String>,
    prs: Vec<PullRequest>,
    next_pr_number: u64,
    conclusion: Option<CheckConclusion>,
    merge_sha: Option<String>,
}

impl InMemoryGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an issue.
    pub fn add_issue(&self, issue: IssueContext) {
        if let Ok(mut state) = self.state.lock() {
            state.issues.insert(issue.number, issue);
        }
    }

    /// Script the check conclusion returned by [`GitHubClient::check_conclusion`].
    pub fn set_check_conclusion(&self, conclusion: CheckConclusion) {
        if let Ok(mut state) = self.state.lock() {
            state.conclusion = Some(conclusion);
        }
    }

    /// Script the merge SHA returned by [`GitHubClient::merge_pr`].
    pub fn set_merge_sha(&self, sha: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.merge_sha = Some(sha.into());
        }
    }

    /// Branches created so far.
    pub fn branches(&self) -> Vec<String> {
        self.state.lock().map(|s| s.branches.clone()).unwrap_or_default()
    }

    /// PRs opened so far.
    pub fn pull_requests(&self) -> Vec<PullRequest> {
        self.state.lock().map(|s| s.prs.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GitHubClient for InMemoryGitHub {
    async fn fetch_issue(&self, number: u64) -> AgentiumResult<IssueContext> {
        let state = self
            .state
            .lock()
            .map_err(|_| AgentiumError::GitHub("fake state poisoned".into()))?;
        state
            .issues
            .get(&number)
            .cloned()
            .ok_or_else(|| AgentiumError::GitHub(format!("issue #{number} not found")))
    }

    async fn create_branch(&self, name: &str, _from_sha: &str) -> AgentiumResult<()> {
        if let Ok(mut state) = self.state.lock() {
            state.branches.push(name.to_string());
        }
        Ok(())
    }

    async fn open_draft_pr(
        &self,
        head: &str,
        _base: &str,
        title: &str,
        _body: &str,
    ) -> AgentiumResult<PullRequest> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AgentiumError::GitHub("fake state poisoned".into()))?;
        state.next_pr_number += 1;
        let pr = PullRequest {
            number: state.next_pr_number,
            url: format!("https://example.com/pr/{}", state.next_pr_number),
            draft: true,
        };
        info!(head, title, number = pr.number, "Fake draft PR opened");
        state.prs.push(pr.clone());
        Ok(pr)
    }

    async fn check_conclusion(&self, _git_ref: &str) -> AgentiumResult<CheckConclusion> {
        let state = self
            .state
            .lock()
            .map_err(|_| AgentiumError::GitHub("fake state poisoned".into()))?;
        Ok(state.conclusion.unwrap_or(CheckConclusion::Success))
    }

    async fn merge_pr(&self, _number: u64) -> AgentiumResult<MergeResult> {
        let state = self
            .state
            .lock()
            .map_err(|_| AgentiumError::GitHub("fake state poisoned".into()))?;
        Ok(MergeResult {
            merged: true,
            sha: state.merge_sha.clone(),
        })
    }
}
