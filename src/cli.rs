// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - scan: list a user's repositories on GitHub and annotate their READMEs
// - annotate: annotate a local README file
//
// Flags that hold secrets or environment-specific values can also come from
// environment variables (GITHUB_TOKEN, GITHUB_API_URL).
// =============================================================================

use std::path::PathBuf;

use clap::builder::TypedValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::github::DEFAULT_API_URL;
use crate::pipeline::{DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE, DEFAULT_README_PATH};

#[derive(Parser, Debug)]
#[command(
    name = "readme-webtrends",
    version,
    about = "Adds WebTrends tracking codes to Microsoft links in GitHub READMEs",
    long_about = "readme-webtrends finds links to Microsoft domains in README files and adds a \
                  WT.mc_id tracking parameter to them. Repositories whose README changed are \
                  written out as JSON lines, ready to become pull requests."
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan every repository of one or more GitHub users
    ///
    /// Example: readme-webtrends scan --owner octocat --alias jdoe
    Scan(ScanArgs),

    /// Annotate the links in a local README file
    ///
    /// Example: readme-webtrends annotate README.md --repo-name my-repo --alias jdoe
    Annotate(AnnotateArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// GitHub login whose repositories are scanned
    #[arg(long, requires = "alias", conflicts_with = "users")]
    pub owner: Option<String>,

    /// Alias used in the tracking code for --owner
    #[arg(long)]
    pub alias: Option<String>,

    /// JSON file with an array of users (fullName, gitHubUserName, microsoftAlias, team)
    #[arg(long, required_unless_present = "owner")]
    pub users: Option<PathBuf>,

    /// GitHub token (required by the GraphQL API)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Repositories requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u16).range(1..=100).map(usize::from))]
    pub page_size: usize,

    /// Repositories processed at the same time
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Also annotate repositories that are forks
    #[arg(long)]
    pub include_forks: bool,

    /// Path of the README inside each repository
    #[arg(long, default_value = DEFAULT_README_PATH)]
    pub readme_path: String,

    /// Write updated repositories here instead of stdout (JSON lines)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Print the final summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AnnotateArgs {
    /// README file to annotate
    pub file: PathBuf,

    /// Repository name used for the event part of the tracking code
    #[arg(long)]
    pub repo_name: String,

    /// Alias used in the tracking code
    #[arg(long)]
    pub alias: String,

    /// Write the result back to the file instead of printing it
    #[arg(long, conflicts_with = "check")]
    pub in_place: bool,

    /// Only report whether the file would change (exit code 1 if it would)
    #[arg(long)]
    pub check: bool,
}
