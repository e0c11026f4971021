// src/github/pages.rs
// =============================================================================
// This module walks a paginated repository listing one page at a time.
//
// How it works:
// 1. The first call to next() fetches page one with no cursor
// 2. Every later call passes the end cursor from the previous page
// 3. Once a page says there are no more pages, next() returns Ok(None)
//
// The traversal is pull-driven: nothing is fetched until the caller asks
// for the next batch, and there is never more than one request in flight.
// Dropping the enumerator between batches stops the traversal without any
// further requests.
//
// If a fetch fails, the error is returned and the enumerator is finished.
// Batches returned before the failure are still valid.
//
// Rust concepts:
// - Traits: RepositorySource is anything that can fetch one page
// - async-trait: Lets us hold the source as &dyn RepositorySource
// - State machines: An enum tracks where the traversal is
// =============================================================================

use async_trait::async_trait;
use tracing::debug;

use super::error::FetchError;
use super::types::{PageCursor, Repository, RepositoryPage};

/// The paginated list collaborator: returns the repositories of `owner`
/// starting after `cursor` (or from the beginning when `None`).
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn fetch_repositories(
        &self,
        owner: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<RepositoryPage, FetchError>;
}

// Where the traversal currently is.
#[derive(Debug)]
enum State {
    Start,
    // The last page said more are available after this cursor.
    More(String),
    Done,
}

pub struct PagedRepositoryEnumerator<'a> {
    source: &'a dyn RepositorySource,
    owner: String,
    page_size: usize,
    state: State,
    pages_fetched: usize,
}

impl<'a> PagedRepositoryEnumerator<'a> {
    pub fn new(source: &'a dyn RepositorySource, owner: impl Into<String>, page_size: usize) -> Self {
        Self {
            source,
            owner: owner.into(),
            page_size,
            state: State::Start,
            pages_fetched: 0,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    // Fetches the next batch of repositories.
    //
    // Returns:
    //   Ok(Some(batch)) = one page worth of repositories (may be empty)
    //   Ok(None)        = the listing is exhausted
    //   Err(e)          = the fetch failed; later calls return Ok(None)
    pub async fn next(&mut self) -> Result<Option<Vec<Repository>>, FetchError> {
        let cursor = match std::mem::replace(&mut self.state, State::Done) {
            State::Start => None,
            State::More(cursor) => Some(cursor),
            State::Done => return Ok(None),
        };

        let page = self
            .source
            .fetch_repositories(&self.owner, cursor.as_deref(), self.page_size)
            .await?;
        self.pages_fetched += 1;

        let RepositoryPage {
            repositories,
            cursor: PageCursor {
                end_cursor,
                has_next_page,
            },
        } = page;

        debug!(
            owner = %self.owner,
            page = self.pages_fetched,
            count = repositories.len(),
            has_next_page,
            "fetched repository page"
        );

        if has_next_page {
            // A "more pages" answer without a cursor would fetch page one
            // again forever, so treat it as the end.
            match end_cursor {
                Some(cursor) => self.state = State::More(cursor),
                None => debug!(owner = %self.owner, "next page advertised without cursor, stopping"),
            }
        }

        Ok(Some(repositories))
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why not implement Iterator?
//    - Iterator::next can't be async
//    - An inherent async fn next() gives the same "pull one item" shape
//    - Callers loop with: while let Some(batch) = pages.next().await? { ... }
//
// 2. What does std::mem::replace do here?
//    - Takes the current state out and leaves Done behind
//    - If the fetch fails, the state stays Done, so nothing is re-fetched
// -----------------------------------------------------------------------------
