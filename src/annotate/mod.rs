// src/annotate/mod.rs
// =============================================================================
// This module contains the link annotation logic.
//
// Submodules:
// - scanner: Finds URL-shaped tokens in arbitrary text
// - rules: Decides whether one link qualifies and rewrites it
// - readme: Applies the rules to every link in a README body
//
// A link is "annotated" when it carries the WebTrends query key, e.g.
//   https://azure.com/docs?WT.mc_id=myrepo-github-jdoe
//
// Rust concepts:
// - Modules: Organize code into namespaces
// - pub use: Re-export items to simplify imports for users of this module
// - thiserror: Derive std::error::Error for our own error enum
// =============================================================================

mod readme;
mod rules;
mod scanner;

pub use readme::transform_readme;

use std::fmt;

use thiserror::Error;

/// Query key that marks a link as annotated.
///
/// Links in the wild already carry this exact key, so renaming it would make
/// every previously annotated link look un-annotated again.
pub const TRACKING_QUERY_KEY: &str = "WT.mc_id";

/// Channel segment of the tracking value.
pub const TRACKING_CHANNEL: &str = "github";

// Errors that can happen while rewriting a single link.
//
// These never escape a README transform: a bad link is left untouched.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("malformed url '{link}': {source}")]
    MalformedUrl {
        link: String,
        #[source]
        source: url::ParseError,
    },
}

// Everything needed to build the tracking value for one repository.
//
// The value is "{event}-{channel}-{alias}", where the event name is the
// repository name lower-cased with its hyphens removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingContext {
    pub event_name: String,
    pub channel: String,
    pub alias: String,
}

impl TrackingContext {
    pub fn new(repository_name: &str, alias: &str) -> Self {
        Self {
            event_name: repository_name.replace('-', "").to_lowercase(),
            channel: TRACKING_CHANNEL.to_string(),
            alias: alias.to_string(),
        }
    }

    /// The string stored under [`TRACKING_QUERY_KEY`].
    pub fn value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TrackingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.event_name, self.channel, self.alias)
    }
}
