// src/github/error.rs
// =============================================================================
// Errors from talking to GitHub.
//
// None of these are retried here. They travel up to whoever started the
// traversal or the README fetch, and that caller decides what to do.
//
// GraphQL reports errors inside a 200 response. One error comes back as
// FetchError::GraphQl, several come back together as FetchError::Aggregate
// so that none of them are lost.
// =============================================================================

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("{resource} was not found")]
    NotFound { resource: String },

    #[error("GraphQL error: {0}")]
    GraphQl(GraphQlError),

    #[error("{} GraphQL errors: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<FetchError>),

    #[error("response had neither data nor errors")]
    MissingData,
}

// One entry of the "errors" array in a GraphQL response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{} ({})", self.message, kind),
            None => write!(f, "{}", self.message),
        }
    }
}

impl FetchError {
    // Turns a GraphQL "errors" array into a single error.
    //
    // Returns None for an empty array, the error itself for one entry, and
    // an Aggregate holding all of them (in order) otherwise.
    pub fn from_graphql_errors(errors: Vec<GraphQlError>) -> Option<Self> {
        let mut errors: Vec<FetchError> = errors.into_iter().map(FetchError::GraphQl).collect();
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(FetchError::Aggregate(errors)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

fn join_errors(errors: &[FetchError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
