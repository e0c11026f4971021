// src/github/client.rs
// =============================================================================
// This module talks to the GitHub API.
//
// Two endpoints are used:
// - GraphQL: repositoryOwner.repositories, one page per request, to list
//   every repository of a user along with its default branch
// - REST: /repos/{owner}/{repo}/contents/{path}?ref={branch}, with the raw
//   media type so the README comes back as plain text instead of base64
//
// One reqwest Client is built up front and reused for every request
// (connection pooling). A token is optional for REST but GraphQL requires one.
//
// Rust concepts:
// - Generics: execute_graphql<T> deserializes any response shape
// - serde: #[derive(Deserialize)] structs mirror the JSON we get back
// - Trait impls: GitHubClient plugs into RepositorySource and ContentSource
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::error::{FetchError, GraphQlError};
use super::pages::RepositorySource;
use super::types::{DefaultBranch, PageCursor, Repository, RepositoryPage};
use crate::pipeline::ContentSource;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

const REPOSITORIES_QUERY: &str = r#"
query ($owner: String!, $first: Int!, $after: String) {
  repositoryOwner(login: $owner) {
    repositories(first: $first, after: $after, orderBy: {field: NAME, direction: ASC}) {
      nodes {
        id
        name
        isFork
        owner { login }
        defaultBranchRef {
          name
          prefix
          target { oid }
        }
      }
      pageInfo {
        endCursor
        hasNextPage
      }
    }
  }
}
"#;

pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // Sends one GraphQL request and returns its "data", or the errors the
    // server reported instead.
    async fn execute_graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, FetchError> {
        let url = format!("{}/graphql", self.api_url);
        let request = self
            .http
            .post(&url)
            .json(&json!({ "query": query, "variables": variables }));

        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let body: GraphQlResponse<T> = response.json().await?;
        body.into_result()
    }
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn fetch_repositories(
        &self,
        owner: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<RepositoryPage, FetchError> {
        let variables = json!({
            "owner": owner,
            "first": page_size,
            "after": cursor,
        });

        let data: RepositoriesData = self.execute_graphql(REPOSITORIES_QUERY, variables).await?;
        data.into_page(owner)
    }
}

#[async_trait]
impl ContentSource for GitHubClient {
    async fn fetch_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<String, FetchError> {
        let url = format!("{}/repos/{}/{}/contents/{}", self.api_url, owner, repo, path);
        debug!(%url, git_ref, "fetching file");

        let request = self
            .http
            .get(&url)
            .query(&[("ref", git_ref)])
            .header(reqwest::header::ACCEPT, RAW_MEDIA_TYPE);

        let response = self.authorize(request).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.text().await?),
            StatusCode::NOT_FOUND => Err(FetchError::NotFound {
                resource: format!("{}/{}/{}@{}", owner, repo, path, git_ref),
            }),
            status => Err(FetchError::Status { url, status }),
        }
    }
}

// -----------------------------------------------------------------------------
// Response shapes
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

impl<T> GraphQlResponse<T> {
    // Errors win over data: a partial answer is still a failed request.
    fn into_result(self) -> Result<T, FetchError> {
        if let Some(err) = FetchError::from_graphql_errors(self.errors.unwrap_or_default()) {
            return Err(err);
        }
        self.data.ok_or(FetchError::MissingData)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoriesData {
    repository_owner: Option<RepositoryOwnerNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryOwnerNode {
    repositories: RepositoryConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryConnection {
    nodes: Vec<RepositoryNode>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    end_cursor: Option<String>,
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    id: String,
    name: String,
    is_fork: bool,
    owner: OwnerNode,
    default_branch_ref: Option<BranchRefNode>,
}

#[derive(Debug, Deserialize)]
struct OwnerNode {
    login: String,
}

#[derive(Debug, Deserialize)]
struct BranchRefNode {
    name: String,
    prefix: String,
    target: Option<TargetNode>,
}

#[derive(Debug, Deserialize)]
struct TargetNode {
    oid: String,
}

impl RepositoriesData {
    fn into_page(self, owner: &str) -> Result<RepositoryPage, FetchError> {
        let connection = self
            .repository_owner
            .ok_or_else(|| FetchError::NotFound {
                resource: format!("repository owner '{}'", owner),
            })?
            .repositories;

        let repositories = connection
            .nodes
            .into_iter()
            .map(|node| Repository {
                id: node.id,
                owner: node.owner.login,
                name: node.name,
                default_branch: node.default_branch_ref.map(|branch| DefaultBranch {
                    oid: branch.target.map(|t| t.oid).unwrap_or_default(),
                    prefix: branch.prefix,
                    name: branch.name,
                }),
                is_fork: node.is_fork,
                readme_text: String::new(),
            })
            .collect();

        Ok(RepositoryPage {
            repositories,
            cursor: PageCursor {
                end_cursor: connection.page_info.end_cursor,
                has_next_page: connection.page_info.has_next_page,
            },
        })
    }
}
