// src/github/mod.rs
// =============================================================================
// This module handles everything GitHub-specific.
//
// Submodules:
// - types: Repository, GitHubUser and page/cursor values
// - pages: Walks a paginated repository listing one page at a time
// - client: reqwest-based GitHub client (GraphQL listing, REST file contents)
// - error: FetchError, including the multi-error GraphQL case
// =============================================================================

mod client;
mod error;
mod pages;
mod types;

pub use client::{GitHubClient, DEFAULT_API_URL};
pub use error::FetchError;
pub use pages::{PagedRepositoryEnumerator, RepositorySource};
pub use types::{GitHubUser, Repository};

#[cfg(test)]
pub(crate) use error::GraphQlError;
#[cfg(test)]
pub(crate) use types::{sample_repository, PageCursor, RepositoryPage};
