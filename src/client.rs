use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::auth::TokenProvider;
use crate::config::Config;
use crate::error::{Error, Result};

const ERROR_SNIPPET_CHARS: usize = 200;

/// Abstraction over the REST transport for testability.
pub trait ApiClient {
    fn get_json(&self, url: &str) -> Result<Value>;

    fn post_json(&self, url: &str, body: &Value) -> Result<Value>;
}

/// Blocking HTTP client presenting a bearer token on every call.
///
/// The token is acquired once, when the client is built. No call is retried.
pub struct HttpApiClient {
    agent: ureq::Agent,
    token: String,
}

impl HttpApiClient {
    pub fn new(config: &Config, tokens: &dyn TokenProvider) -> Result<Self> {
        let token = tokens.get_token(&config.resource)?;
        Ok(Self::with_token(config, token))
    }

    pub fn with_token(config: &Config, token: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();
        Self { agent, token }
    }

    fn authorized(&self, request: ureq::Request) -> ureq::Request {
        request
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/json")
    }

    fn send(&self, request: ureq::Request, body: Option<&Value>) -> Result<Value> {
        let url = request.url().to_string();
        let result = match body {
            Some(body) => request
                .set("Content-Type", "application/json")
                .send_json(body),
            None => request.call(),
        };

        match result {
            Ok(response) => {
                let status = response.status();
                let text = response
                    .into_string()
                    .map_err(|e| Error::Transport(format!("{url}: failed to read body: {e}")))?;
                debug!(%url, status, bytes = text.len(), "response received");
                parse_success(status, &url, &text)
            }
            Err(ureq::Error::Status(code, response)) => {
                let text = response.into_string().unwrap_or_default();
                Err(status_error(code, &url, &text))
            }
            Err(ureq::Error::Transport(e)) => Err(Error::Transport(format!("{url}: {e}"))),
        }
    }
}

impl ApiClient for HttpApiClient {
    fn get_json(&self, url: &str) -> Result<Value> {
        debug!(%url, "GET");
        self.send(self.authorized(self.agent.get(url)), None)
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        debug!(%url, "POST");
        self.send(self.authorized(self.agent.post(url)), Some(body))
    }
}

/// Interpret a 2xx response body.
///
/// A 203 is the service's sign-in page served in place of JSON when the
/// token is not accepted.
fn parse_success(status: u16, url: &str, text: &str) -> Result<Value> {
    if status == 203 {
        return Err(Error::Auth(format!(
            "{url} redirected to sign-in (HTTP 203); run `az login` and retry"
        )));
    }
    if text.trim().is_empty() {
        return Err(Error::Transport(format!(
            "{url} returned an empty body (HTTP {status})"
        )));
    }
    serde_json::from_str(text).map_err(|e| {
        Error::Transport(format!(
            "{url} returned a non-JSON body (HTTP {status}): {e}"
        ))
    })
}

/// Map a non-2xx status to the error taxonomy.
fn status_error(code: u16, url: &str, body: &str) -> Error {
    match code {
        401 | 403 => Error::Auth(format!(
            "{url} returned HTTP {code}; run `az login` and retry"
        )),
        _ => Error::Transport(format!("{url} returned HTTP {code}: {}", error_detail(body))),
    }
}

/// Prefer the service's `message` field, else a bounded snippet of the body.
fn error_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body)
        && let Some(message) = json.get("message").and_then(|m| m.as_str())
    {
        return message.to_string();
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > ERROR_SNIPPET_CHARS {
        let snippet: String = trimmed.chars().take(ERROR_SNIPPET_CHARS).collect();
        format!("{snippet}...")
    } else {
        trimmed.to_string()
    }
}
