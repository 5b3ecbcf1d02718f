use std::io::{Read, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{AzCliTokenProvider, ChainTokenProvider, EnvTokenProvider};
use crate::azure::ReviewApi;
use crate::cli::{Cli, CliCommand};
use crate::client::HttpApiClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::poster::{
    OutboundComment, PostResult, parse_comments, parse_selection, plan_threads, post_comments,
};
use crate::pr_url::{PullRequestRef, parse_pr_url};
use crate::threads::{NormalizedThreadRecord, normalize_threads};

/// Build the API over a real HTTP client, acquiring the token up front.
///
/// Token sources: the configured environment variable, then the Azure CLI.
pub fn build_api(config: &Config) -> Result<ReviewApi> {
    let tokens = ChainTokenProvider::new(vec![
        Box::new(EnvTokenProvider::new(config.token_env.clone())),
        Box::new(AzCliTokenProvider::new(config.az_binary.clone())),
    ]);
    let client = HttpApiClient::new(config, &tokens)?;
    Ok(ReviewApi::new(Box::new(client), config.api_version.clone()))
}

/// Fetch the pull request's active threads as indexed records.
pub fn fetch_threads(api: &ReviewApi, pr: &PullRequestRef) -> Result<Vec<NormalizedThreadRecord>> {
    let pull_request = api.fetch_pull_request(pr)?;
    info!(
        pr = %pr,
        title = %pull_request.title,
        status = pull_request.status.as_deref().unwrap_or("unknown"),
        "fetching review threads"
    );

    let threads = api.fetch_threads(pr)?;
    let total = threads.len();
    let records = normalize_threads(pr, threads);
    if records.is_empty() {
        info!(total, "no active review threads");
    } else {
        info!(total, active = records.len(), "normalized review threads");
    }
    Ok(records)
}

/// Confirm the pull request exists, then post the selected comments.
pub fn post(
    api: &ReviewApi,
    pr: &PullRequestRef,
    comments: &[OutboundComment],
    selection: Option<&[usize]>,
) -> Result<PostResult> {
    let pull_request = api.fetch_pull_request(pr)?;
    info!(pr = %pr, title = %pull_request.title, count = comments.len(), "posting review comments");

    let result = post_comments(api, pr, comments, selection)?;
    for failure in result.failures() {
        warn!(
            index = failure.index,
            file = %failure.file_path,
            line = failure.line,
            error = failure.error.as_deref().unwrap_or_default(),
            "comment not posted; re-run with --select {} to retry",
            failure.index
        );
    }
    Ok(result)
}

/// Load outbound comments from a file, or stdin when `source` is `-`.
pub fn read_comments(source: &str) -> Result<Vec<OutboundComment>> {
    let json = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        let path = Path::new(source);
        if !path.exists() {
            return Err(Error::InvalidInput(format!(
                "comments file not found: {}",
                path.display()
            )));
        }
        std::fs::read_to_string(path)?
    };
    parse_comments(&json)
}

/// Serialize `value` as pretty JSON to `output`, or stdout.
pub fn write_json<T: Serialize>(value: &T, output: Option<&str>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))?;
            info!(path, "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

/// Execute the parsed command line.
///
/// Input is validated before any token is requested, so malformed URLs and
/// comment files fail fast without touching the network.
pub fn run(cli: &Cli, config: &Config) -> Result<()> {
    match &cli.command {
        CliCommand::Fetch { pr_url, output } => {
            let pr = parse_pr_url(pr_url)?;
            let api = build_api(config)?;
            let records = fetch_threads(&api, &pr)?;
            write_json(&records, output.as_deref())
        }
        CliCommand::Post {
            pr_url,
            comments,
            select,
            dry_run,
        } => {
            let pr = parse_pr_url(pr_url)?;
            let comments = read_comments(comments)?;
            let selection = select.as_deref().map(parse_selection).transpose()?;

            if *dry_run {
                let planned = plan_threads(&comments, selection.as_deref());
                info!(pr = %pr, planned = planned.len(), "dry run, nothing posted");
                return write_json(&planned, None);
            }

            let api = build_api(config)?;
            let result = post(&api, &pr, &comments, selection.as_deref())?;
            write_json(&result, None)
        }
    }
}
