use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::auth::TokenProvider;
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::poster::OutboundComment;

/// Token provider returning a canned token, or an auth failure.
pub struct StaticTokenProvider {
    token: Option<String>,
    pub audiences: RefCell<Vec<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            audiences: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            token: None,
            audiences: RefCell::new(Vec::new()),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn get_token(&self, audience: &str) -> Result<String> {
        self.audiences.borrow_mut().push(audience.to_string());
        self.token
            .clone()
            .ok_or_else(|| Error::Auth("no cached credentials; run `az login`".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

/// Scripted `ApiClient`: replays queued responses in call order.
///
/// Once the queue is drained, POSTs succeed with sequential thread ids
/// (starting at 1000) and GETs fail with a transport error.
pub struct MockApiClient {
    responses: RefCell<VecDeque<Result<Value>>>,
    calls: Rc<RefCell<Vec<RecordedCall>>>,
    next_thread_id: Cell<u64>,
}

impl MockApiClient {
    pub fn new(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: Rc::new(RefCell::new(Vec::new())),
            next_thread_id: Cell::new(1000),
        }
    }

    /// Shared handle on the call log, usable after the client is boxed.
    pub fn calls(&self) -> Rc<RefCell<Vec<RecordedCall>>> {
        Rc::clone(&self.calls)
    }

    fn next(&self, method: Method) -> Result<Value> {
        if let Some(response) = self.responses.borrow_mut().pop_front() {
            return response;
        }
        match method {
            Method::Get => Err(Error::Transport("no more mock responses".to_string())),
            Method::Post => {
                let id = self.next_thread_id.get();
                self.next_thread_id.set(id + 1);
                Ok(serde_json::json!({ "id": id, "status": 1 }))
            }
        }
    }
}

impl ApiClient for MockApiClient {
    fn get_json(&self, url: &str) -> Result<Value> {
        self.calls.borrow_mut().push(RecordedCall {
            method: Method::Get,
            url: url.to_string(),
            body: None,
        });
        self.next(Method::Get)
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        self.calls.borrow_mut().push(RecordedCall {
            method: Method::Post,
            url: url.to_string(),
            body: Some(body.clone()),
        });
        self.next(Method::Post)
    }
}

/// Raw wire JSON for a comment.
pub fn comment_json(id: u64, author: &str, content: &str, comment_type: &str) -> Value {
    let parent = if id == 1 { 0 } else { 1 };
    serde_json::json!({
        "id": id,
        "parentCommentId": parent,
        "author": { "displayName": author, "uniqueName": format!("{author}@example.com") },
        "content": content,
        "commentType": comment_type,
        "publishedDate": "2025-01-01T00:00:00Z",
    })
}

/// Raw wire JSON for an active thread anchored to a file line.
pub fn anchored_thread_json(id: u64, file: &str, line: u32, comments: Vec<Value>) -> Value {
    serde_json::json!({
        "id": id,
        "status": "active",
        "threadContext": {
            "filePath": file,
            "rightFileStart": { "line": line, "offset": 1 },
            "rightFileEnd": { "line": line, "offset": 12 },
        },
        "comments": comments,
        "isDeleted": false,
    })
}

/// Wrap threads in the list envelope returned by the threads endpoint.
pub fn threads_response(threads: Vec<Value>) -> Value {
    let count = threads.len();
    serde_json::json!({ "value": threads, "count": count })
}

pub fn pull_request_json(id: u64, title: &str) -> Value {
    serde_json::json!({
        "pullRequestId": id,
        "title": title,
        "status": "active",
        "createdBy": { "displayName": "Pat Doe", "uniqueName": "pat@example.com" },
        "sourceRefName": "refs/heads/feature/x",
        "targetRefName": "refs/heads/main",
        "isDraft": false,
    })
}

/// Create an `OutboundComment` with sensible defaults for tests.
pub fn make_outbound(file: &str, line: u32, content: &str) -> OutboundComment {
    OutboundComment {
        file_path: file.to_string(),
        line,
        content: content.to_string(),
        status: None,
    }
}
