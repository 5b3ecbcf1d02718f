use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::content::{extract, plain_content, summarize};
use crate::error::{Error, Result};
use crate::pr_url::PullRequestRef;

const UNKNOWN_AUTHOR: &str = "Unknown";

/// Review state of a discussion thread.
///
/// Read from the camelCase names the service returns, any casing of those
/// names, or the numeric codes used in requests. Anything else is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ThreadStatus {
    #[default]
    Active,
    Fixed,
    WontFix,
    Closed,
    ByDesign,
    Pending,
    Unknown,
}

impl ThreadStatus {
    /// Numeric code used in thread-creation requests.
    pub fn code(self) -> u8 {
        match self {
            ThreadStatus::Unknown => 0,
            ThreadStatus::Active => 1,
            ThreadStatus::Fixed => 2,
            ThreadStatus::WontFix => 3,
            ThreadStatus::Closed => 4,
            ThreadStatus::ByDesign => 5,
            ThreadStatus::Pending => 6,
        }
    }

    pub fn from_code(code: u64) -> Self {
        match code {
            1 => ThreadStatus::Active,
            2 => ThreadStatus::Fixed,
            3 => ThreadStatus::WontFix,
            4 => ThreadStatus::Closed,
            5 => ThreadStatus::ByDesign,
            6 => ThreadStatus::Pending,
            _ => ThreadStatus::Unknown,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "active" => ThreadStatus::Active,
            "fixed" => ThreadStatus::Fixed,
            "wontfix" => ThreadStatus::WontFix,
            "closed" => ThreadStatus::Closed,
            "bydesign" => ThreadStatus::ByDesign,
            "pending" => ThreadStatus::Pending,
            _ => ThreadStatus::Unknown,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Code(u64),
    Name(String),
}

impl<'de> Deserialize<'de> for ThreadStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match RawStatus::deserialize(deserializer)? {
            RawStatus::Code(code) => ThreadStatus::from_code(code),
            RawStatus::Name(name) => ThreadStatus::from_name(&name),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentType {
    Text,
    System,
    CodeChange,
    #[default]
    #[serde(other)]
    Unknown,
}

// --- Wire records ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRef {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub unique_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FilePosition {
    pub line: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadContext {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub right_file_start: Option<FilePosition>,
    #[serde(default)]
    pub right_file_end: Option<FilePosition>,
    #[serde(default)]
    pub left_file_start: Option<FilePosition>,
    #[serde(default)]
    pub left_file_end: Option<FilePosition>,
}

impl ThreadContext {
    /// New-file start line, else old-file start line.
    pub fn line_number(&self) -> Option<u32> {
        let positive = |p: &Option<FilePosition>| {
            p.and_then(|pos| u32::try_from(pos.line).ok())
                .filter(|line| *line > 0)
        };
        positive(&self.right_file_start).or_else(|| positive(&self.left_file_start))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub parent_comment_id: u64,
    #[serde(default)]
    pub author: Option<IdentityRef>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub comment_type: CommentType,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub published_date: Option<String>,
}

impl Comment {
    pub fn author_name(&self) -> String {
        self.author
            .as_ref()
            .and_then(|a| a.display_name.clone().or_else(|| a.unique_name.clone()))
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }

    pub fn raw_content(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: u64,
    #[serde(default)]
    pub status: Option<ThreadStatus>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub thread_context: Option<ThreadContext>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Deserialize)]
struct ThreadList {
    value: Vec<Thread>,
}

/// Decode the threads endpoint's list envelope.
pub fn parse_threads(json: Value) -> Result<Vec<Thread>> {
    let list: ThreadList = serde_json::from_value(json)
        .map_err(|e| Error::Transport(format!("unexpected threads response shape: {e}")))?;
    Ok(list.value)
}

// --- Normalized output ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub author: String,
    pub content: String,
}

/// One actionable thread, flattened for an agent to read and select by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedThreadRecord {
    /// 1-based, in API order; stable for one fetch.
    pub index: usize,
    pub thread_id: u64,
    pub comment_id: u64,
    pub author: String,
    pub plain_content: String,
    pub full_content: String,
    pub summary: String,
    pub reply_count: usize,
    pub replies: Vec<Reply>,
    pub file_path: Option<String>,
    pub line_number: Option<u32>,
    pub url: String,
    pub severity: Option<String>,
    pub category: Option<String>,
    pub comment_type: CommentType,
}

/// A thread is worth surfacing when it is active, has comments, and is
/// either anchored to code or opened by a human.
fn is_actionable(thread: &Thread) -> bool {
    if thread.is_deleted || thread.status != Some(ThreadStatus::Active) {
        return false;
    }
    let Some(root) = thread.comments.first() else {
        return false;
    };
    thread.thread_context.is_some() || root.comment_type == CommentType::Text
}

/// Filter, deduplicate and flatten raw threads into indexed records.
///
/// Deleted comments are ignored. A thread id seen twice keeps its first
/// occurrence. An empty result is a normal outcome.
pub fn normalize_threads(pr: &PullRequestRef, threads: Vec<Thread>) -> Vec<NormalizedThreadRecord> {
    let mut seen = HashSet::new();
    threads
        .into_iter()
        .filter(|thread| {
            let first = seen.insert(thread.id);
            if !first {
                debug!(thread_id = thread.id, "skipping duplicate thread");
            }
            first
        })
        .map(|mut thread| {
            thread.comments.retain(|c| !c.is_deleted);
            thread
        })
        .filter(is_actionable)
        .enumerate()
        .filter_map(|(i, thread)| to_record(i + 1, pr, thread))
        .collect()
}

fn to_record(index: usize, pr: &PullRequestRef, thread: Thread) -> Option<NormalizedThreadRecord> {
    let (root, rest) = thread.comments.split_first()?;

    let extracted = extract(root.raw_content());
    let replies: Vec<Reply> = rest
        .iter()
        .filter(|c| c.comment_type != CommentType::System)
        .map(|c| Reply {
            author: c.author_name(),
            content: plain_content(c.raw_content()),
        })
        .collect();

    let context = thread.thread_context.as_ref();
    Some(NormalizedThreadRecord {
        index,
        thread_id: thread.id,
        comment_id: root.id,
        author: root.author_name(),
        summary: summarize(&extracted.plain),
        plain_content: extracted.plain,
        full_content: root.raw_content().to_string(),
        reply_count: replies.len(),
        replies,
        file_path: context.and_then(|c| c.file_path.clone()),
        line_number: context.and_then(ThreadContext::line_number),
        url: pr.thread_url(thread.id),
        severity: extracted.severity,
        category: extracted.category,
        comment_type: root.comment_type,
    })
}
