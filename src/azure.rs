use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::pr_url::PullRequestRef;
use crate::threads::{IdentityRef, Thread, parse_threads};

/// Pull request metadata, as returned by the pull request endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub pull_request_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_by: Option<IdentityRef>,
    #[serde(default)]
    pub source_ref_name: Option<String>,
    #[serde(default)]
    pub target_ref_name: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThreadContext {
    pub file_path: String,
    pub right_file_start: Position,
    pub right_file_end: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub parent_comment_id: u64,
    pub content: String,
    /// 1 is a plain text comment.
    pub comment_type: u8,
}

/// Body of a thread-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThread {
    pub comments: Vec<NewComment>,
    pub status: u8,
    pub thread_context: NewThreadContext,
}

#[derive(Debug, Deserialize)]
struct CreatedThread {
    id: u64,
}

/// Typed access to the pull request endpoints of the review service.
pub struct ReviewApi {
    client: Box<dyn ApiClient>,
    api_version: String,
}

impl ReviewApi {
    pub fn new(client: Box<dyn ApiClient>, api_version: impl Into<String>) -> Self {
        Self {
            client,
            api_version: api_version.into(),
        }
    }

    fn repository_base(pr: &PullRequestRef) -> String {
        format!(
            "{}/{}/_apis/git/repositories/{}",
            pr.organization_url, pr.project, pr.repository
        )
    }

    pub fn pull_request_url(&self, pr: &PullRequestRef) -> String {
        format!(
            "{}/pullrequests/{}?api-version={}",
            Self::repository_base(pr),
            pr.pull_request_id,
            self.api_version
        )
    }

    pub fn threads_url(&self, pr: &PullRequestRef) -> String {
        format!(
            "{}/pullRequests/{}/threads?api-version={}",
            Self::repository_base(pr),
            pr.pull_request_id,
            self.api_version
        )
    }

    pub fn fetch_pull_request(&self, pr: &PullRequestRef) -> Result<PullRequest> {
        let json = self.client.get_json(&self.pull_request_url(pr))?;
        let pull_request: PullRequest = serde_json::from_value(json).map_err(|e| {
            Error::Transport(format!("unexpected pull request response shape: {e}"))
        })?;
        if pull_request.pull_request_id != pr.pull_request_id {
            return Err(Error::Transport(format!(
                "asked for pull request {} but the service returned {}",
                pr.pull_request_id, pull_request.pull_request_id
            )));
        }
        debug!(pr = %pr, title = %pull_request.title, "fetched pull request");
        Ok(pull_request)
    }

    pub fn fetch_threads(&self, pr: &PullRequestRef) -> Result<Vec<Thread>> {
        let json = self.client.get_json(&self.threads_url(pr))?;
        let threads = parse_threads(json)?;
        debug!(pr = %pr, count = threads.len(), "fetched threads");
        Ok(threads)
    }

    /// Create a new discussion thread and return its id.
    pub fn create_thread(&self, pr: &PullRequestRef, thread: &NewThread) -> Result<u64> {
        let body = serde_json::to_value(thread)?;
        let json = self.client.post_json(&self.threads_url(pr), &body)?;
        let created: CreatedThread = serde_json::from_value(json).map_err(|e| {
            Error::Transport(format!("unexpected thread creation response: {e}"))
        })?;
        Ok(created.id)
    }
}
