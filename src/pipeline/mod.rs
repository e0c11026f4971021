// src/pipeline/mod.rs
// =============================================================================
// This module ties the pieces together for a whole GitHub user.
//
// For each user:
// 1. Walk their repositories page by page (PagedRepositoryEnumerator)
// 2. For every repository on a page, as an independent unit:
//    - skip forks and empty repositories
//    - fetch README.md from the default branch
//    - annotate its links (transform_readme)
//    - if the text changed, hand the updated repository to the sink,
//      which stands for "open a pull request with this content"
//
// Units on the same page run concurrently (bounded); pages are fetched one
// at a time. A unit that fails is logged and counted, and never reaches the
// sink. A failed page fetch ends that user's traversal.
//
// Rust concepts:
// - Trait objects: &dyn ContentSource lets tests swap in fakes
// - Streams: buffer_unordered runs up to N units at once
// - #[instrument]: Attaches the repository name to every log line of a unit
// =============================================================================

mod sink;

pub use sink::{HandoffError, JsonLinesSink};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::annotate::transform_readme;
use crate::github::{FetchError, GitHubUser, PagedRepositoryEnumerator, Repository, RepositorySource};

pub const DEFAULT_README_PATH: &str = "README.md";
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 8;

/// The file-content collaborator: returns the text of `path` at `git_ref`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<String, FetchError>;
}

/// Receives repositories whose README changed.
#[async_trait]
pub trait PullRequestSink: Send + Sync {
    async fn submit(&self, repository: Repository) -> Result<(), HandoffError>;
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("could not fetch README: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not hand off updated README: {0}")]
    Handoff(#[from] HandoffError),
}

// Settings for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub page_size: usize,
    pub concurrency: usize,
    pub include_forks: bool,
    pub readme_path: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            include_forks: false,
            readme_path: DEFAULT_README_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Fork,
    NoDefaultBranch,
    NoReadme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// README changed and was handed off.
    Updated,
    Unchanged,
    Skipped(SkipReason),
}

// Counts for a whole run, printed at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub users: usize,
    pub repositories: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// (what failed, error message)
    pub failures: Vec<(String, String)>,
}

impl ScanSummary {
    fn record(&mut self, name: String, result: Result<Outcome, ProcessError>) {
        self.repositories += 1;
        match result {
            Ok(Outcome::Updated) => self.updated += 1,
            Ok(Outcome::Unchanged) => self.unchanged += 1,
            Ok(Outcome::Skipped(_)) => self.skipped += 1,
            Err(e) => {
                self.failed += 1;
                self.failures.push((name, e.to_string()));
            }
        }
    }

    pub fn record_user_failure(&mut self, login: &str, error: &FetchError) {
        self.failed += 1;
        self.failures.push((login.to_string(), error.to_string()));
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

// Processes one repository: fetch, annotate, hand off if changed.
//
// Returns the outcome, or an error if the README couldn't be fetched or the
// handoff failed. Nothing is handed off unless the whole transform finished.
#[instrument(skip_all, fields(repo = %repository.full_name()))]
pub async fn process_repository(
    content: &dyn ContentSource,
    sink: &dyn PullRequestSink,
    repository: &Repository,
    user: &GitHubUser,
    options: &ScanOptions,
) -> Result<Outcome, ProcessError> {
    if repository.is_fork && !options.include_forks {
        debug!("skipping fork");
        return Ok(Outcome::Skipped(SkipReason::Fork));
    }

    let Some(branch) = &repository.default_branch else {
        debug!("skipping repository without a default branch");
        return Ok(Outcome::Skipped(SkipReason::NoDefaultBranch));
    };

    let readme = match content
        .fetch_content(&repository.owner, &repository.name, &options.readme_path, &branch.name)
        .await
    {
        Ok(text) => text,
        Err(e) if e.is_not_found() => {
            debug!(path = %options.readme_path, "no README");
            return Ok(Outcome::Skipped(SkipReason::NoReadme));
        }
        Err(e) => return Err(e.into()),
    };

    let result = transform_readme(&readme, &repository.name, &user.microsoft_alias);
    if !result.changed {
        debug!("README already up to date");
        return Ok(Outcome::Unchanged);
    }

    info!(owner = %repository.owner, name = %repository.name, "updated README");
    sink.submit(repository.with_readme(result.text)).await?;
    Ok(Outcome::Updated)
}

// Scans every repository owned by `user`, adding the results to `summary`.
//
// Counts from pages processed before a failed page fetch stay in `summary`;
// the fetch error itself is returned.
pub async fn scan_user(
    source: &dyn RepositorySource,
    content: &dyn ContentSource,
    sink: &dyn PullRequestSink,
    user: &GitHubUser,
    options: &ScanOptions,
    summary: &mut ScanSummary,
) -> Result<(), FetchError> {
    info!(user = %user.git_hub_user_name, alias = %user.microsoft_alias, "scanning repositories");
    summary.users += 1;

    let mut pages = PagedRepositoryEnumerator::new(source, &user.git_hub_user_name, options.page_size);

    while let Some(batch) = pages.next().await? {
        let results: Vec<(String, Result<Outcome, ProcessError>)> = stream::iter(batch.iter())
            .map(|repository| async move {
                let result = process_repository(content, sink, repository, user, options).await;
                (repository.full_name(), result)
            })
            .buffer_unordered(options.concurrency.max(1))
            .collect()
            .await;

        for (name, result) in results {
            if let Err(e) = &result {
                warn!(repo = %name, error = %e, "repository failed");
            }
            summary.record(name, result);
        }
    }

    info!(
        user = %user.git_hub_user_name,
        pages = pages.pages_fetched(),
        "finished user"
    );
    Ok(())
}

// Scans all users one after another. A user whose listing fails is recorded
// and the remaining users still run.
pub async fn scan_users(
    source: &dyn RepositorySource,
    content: &dyn ContentSource,
    sink: &dyn PullRequestSink,
    users: &[GitHubUser],
    options: &ScanOptions,
) -> ScanSummary {
    let mut summary = ScanSummary::default();

    for user in users {
        if let Err(e) = scan_user(source, content, sink, user, options, &mut summary).await {
            warn!(user = %user.git_hub_user_name, error = %e, "listing repositories failed");
            summary.record_user_failure(&user.git_hub_user_name, &e);
        }
    }

    summary
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why `async move` inside map()?
//    - Each unit becomes its own future
//    - `move` copies the references (content, sink, user...) into it
//    - References are Copy, so nothing is actually cloned
//
// 2. Why collect results before updating the summary?
//    - The futures only borrow shared data
//    - Updating `summary` (a &mut) afterwards keeps the borrows simple
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{sample_repository, GraphQlError, PageCursor, RepositoryPage};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    // README bodies keyed by repository name; anything missing is a 404,
    // and "broken" returns a server error.
    struct FakeContent {
        readmes: HashMap<String, String>,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeContent {
        fn new(readmes: &[(&str, &str)]) -> Self {
            Self {
                readmes: readmes
                    .iter()
                    .map(|(name, text)| (name.to_string(), text.to_string()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentSource for FakeContent {
        async fn fetch_content(
            &self,
            _owner: &str,
            repo: &str,
            path: &str,
            git_ref: &str,
        ) -> Result<String, FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((repo.to_string(), path.to_string(), git_ref.to_string()));

            if repo == "broken" {
                return Err(FetchError::GraphQl(GraphQlError {
                    message: "server exploded".to_string(),
                    kind: None,
                }));
            }
            self.readmes
                .get(repo)
                .cloned()
                .ok_or_else(|| FetchError::NotFound {
                    resource: repo.to_string(),
                })
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        submitted: Mutex<Vec<Repository>>,
    }

    #[async_trait]
    impl PullRequestSink for CollectingSink {
        async fn submit(&self, repository: Repository) -> Result<(), HandoffError> {
            self.submitted.lock().unwrap().push(repository);
            Ok(())
        }
    }

    struct FakeListing {
        pages: Mutex<VecDeque<Result<RepositoryPage, FetchError>>>,
    }

    #[async_trait]
    impl RepositorySource for FakeListing {
        async fn fetch_repositories(
            &self,
            _owner: &str,
            _cursor: Option<&str>,
            _page_size: usize,
        ) -> Result<RepositoryPage, FetchError> {
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(RepositoryPage::default()))
        }
    }

    fn user() -> GitHubUser {
        GitHubUser {
            full_name: "Jane Doe".to_string(),
            git_hub_user_name: "octocat".to_string(),
            microsoft_alias: "jdoe".to_string(),
            team: "Cloud".to_string(),
        }
    }

    fn page(repositories: Vec<Repository>, end_cursor: Option<&str>, has_next_page: bool) -> RepositoryPage {
        RepositoryPage {
            repositories,
            cursor: PageCursor {
                end_cursor: end_cursor.map(str::to_string),
                has_next_page,
            },
        }
    }

    #[tokio::test]
    async fn test_changed_readme_is_handed_off() {
        let content = FakeContent::new(&[("My-Repo", "See https://azure.com/docs for details.")]);
        let sink = CollectingSink::default();
        let repository = sample_repository("My-Repo");

        let outcome = process_repository(&content, &sink, &repository, &user(), &ScanOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Updated);
        let submitted = sink.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].readme_text.contains("WT.mc_id=myrepo-github-jdoe"));
        assert_eq!(submitted[0].id, repository.id);
        // The snapshot we passed in is untouched.
        assert!(repository.readme_text.is_empty());

        let calls = content.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            ("My-Repo".to_string(), "README.md".to_string(), "main".to_string())
        );
    }

    #[tokio::test]
    async fn test_unchanged_readme_is_not_handed_off() {
        let content = FakeContent::new(&[("plain", "Nothing to see at https://example.com")]);
        let sink = CollectingSink::default();

        let outcome = process_repository(
            &content,
            &sink,
            &sample_repository("plain"),
            &user(),
            &ScanOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Unchanged);
        assert!(sink.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_forks_and_empty_repositories_are_skipped() {
        let content = FakeContent::new(&[]);
        let sink = CollectingSink::default();

        let mut fork = sample_repository("fork");
        fork.is_fork = true;
        let mut empty = sample_repository("empty");
        empty.default_branch = None;

        let options = ScanOptions::default();
        assert_eq!(
            process_repository(&content, &sink, &fork, &user(), &options).await.unwrap(),
            Outcome::Skipped(SkipReason::Fork)
        );
        assert_eq!(
            process_repository(&content, &sink, &empty, &user(), &options).await.unwrap(),
            Outcome::Skipped(SkipReason::NoDefaultBranch)
        );
        assert_eq!(
            process_repository(&content, &sink, &sample_repository("missing"), &user(), &options)
                .await
                .unwrap(),
            Outcome::Skipped(SkipReason::NoReadme)
        );
        assert_eq!(content.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_include_forks() {
        let content = FakeContent::new(&[("fork", "https://azure.com")]);
        let sink = CollectingSink::default();
        let mut fork = sample_repository("fork");
        fork.is_fork = true;

        let options = ScanOptions {
            include_forks: true,
            ..ScanOptions::default()
        };
        let outcome = process_repository(&content, &sink, &fork, &user(), &options).await.unwrap();
        assert_eq!(outcome, Outcome::Updated);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_handed_off() {
        let content = FakeContent::new(&[]);
        let sink = CollectingSink::default();

        let result = process_repository(
            &content,
            &sink,
            &sample_repository("broken"),
            &user(),
            &ScanOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(ProcessError::Fetch(_))));
        assert!(sink.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_users_counts_everything() {
        let listing = FakeListing {
            pages: Mutex::new(
                vec![
                    Ok(page(
                        vec![sample_repository("Docs-Sample"), sample_repository("plain")],
                        Some("c1"),
                        true,
                    )),
                    Ok(page(
                        vec![sample_repository("broken"), sample_repository("missing")],
                        None,
                        false,
                    )),
                ]
                .into(),
            ),
        };
        let content = FakeContent::new(&[
            ("Docs-Sample", "[docs](https://docs.microsoft.com/en-us/azure/)"),
            ("plain", "no links"),
        ]);
        let sink = CollectingSink::default();

        let summary = scan_users(&listing, &content, &sink, &[user()], &ScanOptions::default()).await;

        assert_eq!(summary.users, 1);
        assert_eq!(summary.repositories, 4);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].0, "octocat/broken");
        assert!(summary.has_failures());

        let submitted = sink.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(
            submitted[0].readme_text,
            "[docs](https://docs.microsoft.com/azure/?WT.mc_id=docssample-github-jdoe)"
        );
    }

    #[tokio::test]
    async fn test_listing_failure_keeps_earlier_counts() {
        let listing = FakeListing {
            pages: Mutex::new(
                vec![
                    Ok(page(vec![sample_repository("plain")], Some("c1"), true)),
                    Err(FetchError::MissingData),
                ]
                .into(),
            ),
        };
        let content = FakeContent::new(&[("plain", "no links")]);
        let sink = CollectingSink::default();

        let summary = scan_users(&listing, &content, &sink, &[user()], &ScanOptions::default()).await;

        assert_eq!(summary.repositories, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].0, "octocat");
    }
}
