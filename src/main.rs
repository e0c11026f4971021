// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) on stderr
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 1 = changes/failures, 2 = error)
//
// stdout is reserved for results (annotated README text or JSON lines of
// updated repositories), so every log line goes to stderr.
// =============================================================================

mod annotate; // src/annotate/ - link annotation rules
mod cli; // src/cli.rs - command-line parsing
mod github; // src/github/ - GitHub types, pagination and API client
mod pipeline; // src/pipeline/ - per-repository processing and handoff

use std::fs;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{AnnotateArgs, Cli, Commands, LogFormat, ScanArgs};
use github::{GitHubClient, GitHubUser};
use pipeline::{JsonLinesSink, ScanOptions, ScanSummary};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Scan(args) => handle_scan(args).await,
        Commands::Annotate(args) => handle_annotate(args),
    }
}

// RUST_LOG wins when set; otherwise -v picks the level for our crate.
fn init_tracing(verbose: u8, format: LogFormat) {
    let default_filter = match verbose {
        0 => "readme_webtrends=info",
        1 => "readme_webtrends=debug",
        _ => "readme_webtrends=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.with_target(false).init(),
        LogFormat::Json => builder.json().init(),
    }
}

// Handles the 'scan' subcommand
//
// Returns Ok(1) when any repository or user failed, so CI notices.
async fn handle_scan(args: ScanArgs) -> Result<i32> {
    let users = load_users(&args)?;
    if args.token.is_none() {
        bail!("a GitHub token is required for scanning (use --token or GITHUB_TOKEN)");
    }

    let client = GitHubClient::new(&args.api_url, args.token.clone())
        .context("could not create GitHub client")?;
    let sink = JsonLinesSink::open(args.output.as_deref()).with_context(|| match &args.output {
        Some(path) => format!("could not create {}", path.display()),
        None => "could not open stdout".to_string(),
    })?;

    let options = ScanOptions {
        page_size: args.page_size,
        concurrency: args.concurrency,
        include_forks: args.include_forks,
        readme_path: args.readme_path.clone(),
    };

    info!(users = users.len(), page_size = options.page_size, "starting scan");
    let summary = pipeline::scan_users(&client, &client, &sink, &users, &options).await;

    print_summary(&summary, args.json)?;

    Ok(if summary.has_failures() { 1 } else { 0 })
}

// Either the single --owner/--alias pair or the --users roster file.
fn load_users(args: &ScanArgs) -> Result<Vec<GitHubUser>> {
    if let Some(path) = &args.users {
        let json = fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        let users: Vec<GitHubUser> = serde_json::from_str(&json)
            .with_context(|| format!("{} is not a valid user list", path.display()))?;
        return Ok(users);
    }

    match (&args.owner, &args.alias) {
        (Some(owner), Some(alias)) => Ok(vec![GitHubUser {
            full_name: owner.clone(),
            git_hub_user_name: owner.clone(),
            microsoft_alias: alias.clone(),
            team: String::new(),
        }]),
        _ => bail!("either --users or both --owner and --alias are required"),
    }
}

// Handles the 'annotate' subcommand
//
// Returns:
//   Ok(0) = done (or, with --check, nothing would change)
//   Ok(1) = with --check, the file would change
fn handle_annotate(args: AnnotateArgs) -> Result<i32> {
    let readme = fs::read_to_string(&args.file)
        .with_context(|| format!("could not read {}", args.file.display()))?;

    let result = annotate::transform_readme(&readme, &args.repo_name, &args.alias);

    if args.check {
        if result.changed {
            eprintln!("{} has links without tracking codes", args.file.display());
            return Ok(1);
        }
        return Ok(0);
    }

    if args.in_place {
        if result.changed {
            fs::write(&args.file, &result.text)
                .with_context(|| format!("could not write {}", args.file.display()))?;
            info!(file = %args.file.display(), "updated links");
        } else {
            info!(file = %args.file.display(), "nothing to update");
        }
    } else {
        print!("{}", result.text);
    }

    Ok(0)
}

fn print_summary(summary: &ScanSummary, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(summary)?;
        eprintln!("{}", json_output);
    } else {
        print_table(summary);
    }
    Ok(())
}

// The summary goes to stderr: stdout may be carrying JSON lines.
fn print_table(summary: &ScanSummary) {
    eprintln!();
    eprintln!("📊 Summary:");
    eprintln!("   👤 Users: {}", summary.users);
    eprintln!("   📋 Repositories: {}", summary.repositories);
    eprintln!("   ✏️  Updated: {}", summary.updated);
    eprintln!("   ✅ Unchanged: {}", summary.unchanged);
    eprintln!("   ⏭️  Skipped: {}", summary.skipped);
    eprintln!("   ❌ Failed: {}", summary.failed);

    if !summary.failures.is_empty() {
        eprintln!();
        eprintln!("{:<40} {:<60}", "FAILED", "ERROR");
        eprintln!("{}", "=".repeat(100));
        for (name, error) in &summary.failures {
            eprintln!("{:<40} {:<60}", name, error);
        }
    }
}
