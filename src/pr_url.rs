use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

static DEV_AZURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://dev\.azure\.com/(?P<org>[^/]+)/(?P<project>[^/]+)/_git/(?P<repo>[^/]+)/pullrequest/(?P<id>\d+)/?$",
    )
    .expect("dev.azure.com pattern is valid")
});

static VISUALSTUDIO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https://(?P<org>[A-Za-z0-9][A-Za-z0-9-]*)\.visualstudio\.com/(?P<project>[^/]+)/_git/(?P<repo>[^/]+)/pullrequest/(?P<id>\d+)/?$",
    )
    .expect("visualstudio.com pattern is valid")
});

const ACCEPTED_SHAPES: &str = "https://dev.azure.com/{org}/{project}/_git/{repo}/pullrequest/{id} \
     or https://{org}.visualstudio.com/{project}/_git/{repo}/pullrequest/{id}";

/// A resolved pull request: where it lives and which one it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRef {
    /// Absolute https URL of the organization, without a trailing slash.
    pub organization_url: String,
    pub project: String,
    pub repository: String,
    pub pull_request_id: u64,
}

impl PullRequestRef {
    /// Canonical web URL of the pull request.
    pub fn web_url(&self) -> String {
        format!(
            "{}/{}/_git/{}/pullrequest/{}",
            self.organization_url, self.project, self.repository, self.pull_request_id
        )
    }

    /// Web URL that opens the pull request focused on one discussion thread.
    pub fn thread_url(&self, thread_id: u64) -> String {
        format!("{}?discussionId={thread_id}", self.web_url())
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}!{}",
            self.organization_url, self.project, self.repository, self.pull_request_id
        )
    }
}

/// Parse a pull request URL in either of the two hostname shapes.
///
/// Query string and fragment are discarded before matching. A trailing
/// `.git` on the repository segment is stripped.
pub fn parse_pr_url(url: &str) -> Result<PullRequestRef> {
    let trimmed = url.trim();
    let without_query = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let (caps, organization_url) = if let Some(caps) = DEV_AZURE_RE.captures(without_query) {
        let org = format!("https://dev.azure.com/{}", &caps["org"]);
        (caps, org)
    } else if let Some(caps) = VISUALSTUDIO_RE.captures(without_query) {
        let org = format!("https://{}.visualstudio.com", &caps["org"]);
        (caps, org)
    } else {
        return Err(invalid_url(trimmed));
    };

    let pull_request_id: u64 = caps["id"].parse().map_err(|_| invalid_url(trimmed))?;
    if pull_request_id == 0 {
        return Err(Error::InvalidInput(format!(
            "pull request id must be positive in {trimmed}"
        )));
    }

    let repo = &caps["repo"];
    let repository = repo.strip_suffix(".git").unwrap_or(repo);
    if repository.is_empty() {
        return Err(invalid_url(trimmed));
    }

    Ok(PullRequestRef {
        organization_url,
        project: caps["project"].to_string(),
        repository: repository.to_string(),
        pull_request_id,
    })
}

fn invalid_url(url: &str) -> Error {
    Error::InvalidInput(format!(
        "unrecognized pull request URL '{url}'; expected {ACCEPTED_SHAPES}"
    ))
}
