// src/github/types.rs
// =============================================================================
// Plain data types shared by the GitHub client, the page enumerator and the
// processing pipeline.
//
// Repository values are snapshots: once a page is fetched they are never
// mutated. Putting a new README on a repository produces a new value via
// with_readme(), so the original stays around for comparison.
// =============================================================================

use serde::{Deserialize, Serialize};

/// The branch a pull request would be based on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultBranch {
    /// Commit id the branch points to.
    pub oid: String,
    /// Ref prefix, usually "refs/heads/".
    pub prefix: String,
    /// Short branch name, e.g. "main".
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// GitHub's opaque node id.
    pub id: String,
    pub owner: String,
    pub name: String,
    /// None for empty repositories.
    pub default_branch: Option<DefaultBranch>,
    pub is_fork: bool,
    /// Empty until the README has been fetched.
    #[serde(default)]
    pub readme_text: String,
}

impl Repository {
    // Returns a copy of this repository carrying a different README body.
    pub fn with_readme(&self, readme_text: impl Into<String>) -> Self {
        Self {
            readme_text: readme_text.into(),
            ..self.clone()
        }
    }

    // "owner/name", used in log lines and summaries
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

// A person whose repositories get annotated.
//
// Matches the JSON roster format:
//   { "fullName": "...", "gitHubUserName": "...", "microsoftAlias": "...", "team": "..." }
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubUser {
    pub full_name: String,
    pub git_hub_user_name: String,
    pub microsoft_alias: String,
    #[serde(default)]
    pub team: String,
}

/// Where the next page starts. Only lives for one traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCursor {
    /// `None` asks for the first page.
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// One page of a repository listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryPage {
    pub repositories: Vec<Repository>,
    pub cursor: PageCursor,
}

#[cfg(test)]
pub(crate) fn sample_repository(name: &str) -> Repository {
    Repository {
        id: format!("R_{}", name),
        owner: "octocat".to_string(),
        name: name.to_string(),
        default_branch: Some(DefaultBranch {
            oid: "0123abcd".to_string(),
            prefix: "refs/heads/".to_string(),
            name: "main".to_string(),
        }),
        is_fork: false,
        readme_text: String::new(),
    }
}
