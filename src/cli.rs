use clap::{Parser, Subcommand};

/// Fetch and post Azure DevOps pull request review threads
#[derive(Parser, Debug, Clone)]
#[command(name = "adoreview", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Path to config file (default: .adoreview.toml if present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// REST API version to request (default: 7.1)
    #[arg(long, global = true)]
    pub api_version: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Fetch active review threads of a pull request as JSON
    Fetch {
        /// Pull request URL (dev.azure.com or *.visualstudio.com)
        pr_url: String,

        /// Write the JSON to a file instead of stdout
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Post review comments to a pull request, one new thread per comment
    Post {
        /// Pull request URL (dev.azure.com or *.visualstudio.com)
        pr_url: String,

        /// JSON file with the comments to post ("-" reads stdin)
        #[arg(long, short)]
        comments: String,

        /// Comma-separated 1-based indices of comments to post (e.g. "2,4")
        #[arg(long, short)]
        select: Option<String>,

        /// Print the thread requests without posting anything
        #[arg(long)]
        dry_run: bool,
    },
}
