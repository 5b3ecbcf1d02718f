use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::azure::{NewComment, NewThread, NewThreadContext, Position, ReviewApi};
use crate::error::{Error, Result};
use crate::pr_url::PullRequestRef;
use crate::threads::ThreadStatus;

/// `commentType` of a plain text comment in creation requests.
const TEXT_COMMENT_TYPE: u8 = 1;

/// A review comment to be posted as a new thread.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundComment {
    /// Repository-root-relative path with a leading `/`.
    pub file_path: String,
    /// 1-based line in the new version of the file.
    pub line: u32,
    /// Markdown body.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ThreadStatus>,
}

impl OutboundComment {
    /// Check required fields and normalize the path to start with `/`.
    fn validate(mut self, position: usize) -> Result<Self> {
        let path = self.file_path.trim();
        if path.is_empty() || path == "/" {
            return Err(Error::InvalidInput(format!(
                "comment #{position}: filePath is required"
            )));
        }
        self.file_path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        if self.line == 0 {
            return Err(Error::InvalidInput(format!(
                "comment #{position}: line must be >= 1"
            )));
        }
        if self.content.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "comment #{position}: content is required"
            )));
        }
        if self.status == Some(ThreadStatus::Unknown) {
            return Err(Error::InvalidInput(format!(
                "comment #{position}: unrecognized status"
            )));
        }
        Ok(self)
    }
}

/// Parse and validate a JSON array of outbound comments.
pub fn parse_comments(json: &str) -> Result<Vec<OutboundComment>> {
    let comments: Vec<OutboundComment> = serde_json::from_str(json)
        .map_err(|e| Error::InvalidInput(format!("failed to parse comments JSON: {e}")))?;
    comments
        .into_iter()
        .enumerate()
        .map(|(i, c)| c.validate(i + 1))
        .collect()
}

/// Parse a comma-separated list of 1-based indices such as `"2,4"`.
///
/// Range checking happens later, against the actual comment count.
pub fn parse_selection(spec: &str) -> Result<Vec<usize>> {
    spec.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>().map_err(|_| {
                Error::InvalidInput(format!(
                    "invalid comment index '{part}' (expected comma-separated numbers, e.g. 2,4)"
                ))
            })
        })
        .collect()
}

/// Resolve a selection to 1-based indices into `total` comments.
///
/// Out-of-range and repeated indices are skipped with a warning. Without a
/// selection every comment is chosen, in order.
pub fn select_indices(total: usize, selection: Option<&[usize]>) -> Vec<usize> {
    let Some(selection) = selection else {
        return (1..=total).collect();
    };

    let mut chosen: Vec<usize> = Vec::with_capacity(selection.len());
    for &index in selection {
        if index == 0 || index > total {
            warn!(index, total, "comment index out of range, skipping");
        } else if chosen.contains(&index) {
            warn!(index, "comment index repeated, skipping");
        } else {
            chosen.push(index);
        }
    }
    chosen
}

/// Build the thread-creation request for one comment.
///
/// The anchor is a one-column span at the start of the line.
pub fn build_thread(comment: &OutboundComment) -> NewThread {
    NewThread {
        comments: vec![NewComment {
            parent_comment_id: 0,
            content: comment.content.clone(),
            comment_type: TEXT_COMMENT_TYPE,
        }],
        status: comment.status.unwrap_or_default().code(),
        thread_context: NewThreadContext {
            file_path: comment.file_path.clone(),
            right_file_start: Position {
                line: comment.line,
                offset: 1,
            },
            right_file_end: Position {
                line: comment.line,
                offset: 2,
            },
        },
    }
}

/// Outcome of posting one comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostOutcome {
    pub index: usize,
    pub file_path: String,
    pub line: u32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PostOutcome {
    fn new(index: usize, comment: &OutboundComment, result: Result<u64>) -> Self {
        let (success, thread_id, error) = match result {
            Ok(id) => (true, Some(id), None),
            Err(e) => (false, None, Some(e.to_string())),
        };
        Self {
            index,
            file_path: comment.file_path.clone(),
            line: comment.line,
            success,
            thread_id,
            error,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResult {
    pub attempted: usize,
    pub posted: usize,
    pub failed: usize,
    pub outcomes: Vec<PostOutcome>,
}

impl PostResult {
    fn from_outcomes(outcomes: Vec<PostOutcome>) -> Self {
        let posted = outcomes.iter().filter(|o| o.success).count();
        Self {
            attempted: outcomes.len(),
            posted,
            failed: outcomes.len() - posted,
            outcomes,
        }
    }

    /// Some, but not all, attempted comments failed.
    pub fn is_partial_failure(&self) -> bool {
        self.failed > 0 && self.failed < self.attempted
    }

    pub fn failures(&self) -> impl Iterator<Item = &PostOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}

/// A thread request planned for one selected comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedThread {
    pub index: usize,
    pub request: NewThread,
}

/// Requests that would be sent for the selection, without sending them.
pub fn plan_threads(comments: &[OutboundComment], selection: Option<&[usize]>) -> Vec<PlannedThread> {
    select_indices(comments.len(), selection)
        .into_iter()
        .map(|index| PlannedThread {
            index,
            request: build_thread(&comments[index - 1]),
        })
        .collect()
}

/// Post one new thread per selected comment, sequentially.
///
/// A transport failure on one comment is recorded and the loop moves on;
/// each comment is attempted once. Any other error, an auth failure in
/// particular, stops the batch and is returned with the number of threads
/// already created. Existing threads are never touched, so posting the same
/// input twice creates duplicate threads.
pub fn post_comments(
    api: &ReviewApi,
    pr: &PullRequestRef,
    comments: &[OutboundComment],
    selection: Option<&[usize]>,
) -> Result<PostResult> {
    let indices = select_indices(comments.len(), selection);
    if indices.is_empty() {
        info!("no comments selected, nothing to post");
        return Ok(PostResult::default());
    }

    let total = indices.len();
    let mut outcomes: Vec<PostOutcome> = Vec::with_capacity(total);
    for index in indices {
        let comment = &comments[index - 1];
        match api.create_thread(pr, &build_thread(comment)) {
            Ok(thread_id) => {
                info!(
                    index,
                    thread_id,
                    file = %comment.file_path,
                    line = comment.line,
                    "posted comment"
                );
                outcomes.push(PostOutcome::new(index, comment, Ok(thread_id)));
            }
            Err(Error::Transport(msg)) => {
                warn!(
                    index,
                    file = %comment.file_path,
                    line = comment.line,
                    error = %msg,
                    "failed to post comment"
                );
                outcomes.push(PostOutcome::new(index, comment, Err(Error::Transport(msg))));
            }
            Err(e) => {
                let posted = outcomes.iter().filter(|o| o.success).count();
                return Err(abort_batch(e, index, posted, total));
            }
        }
    }

    let result = PostResult::from_outcomes(outcomes);
    info!(
        attempted = result.attempted,
        posted = result.posted,
        failed = result.failed,
        "posting finished"
    );
    Ok(result)
}

/// Annotate a fatal error with how far the batch got.
fn abort_batch(err: Error, index: usize, posted: usize, total: usize) -> Error {
    let progress =
        format!("stopped at comment #{index}; {posted} of {total} selected comments were posted");
    match err {
        Error::Auth(msg) => Error::Auth(format!("{msg} ({progress})")),
        Error::InvalidInput(msg) => Error::InvalidInput(format!("{msg} ({progress})")),
        other => other,
    }
}
