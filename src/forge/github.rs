//! forge::github
//!
//! GitHub implementation of the forge capabilities using the REST git-data
//! API.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | branch head | `GET /repos/{owner}/{repo}/branches/{branch}` |
//! | create branch | `POST /repos/{owner}/{repo}/git/refs` |
//! | commit tree | `GET /repos/{owner}/{repo}/git/commits/{sha}` |
//! | blob | `POST /repos/{owner}/{repo}/git/blobs` (base64) |
//! | tree | `POST /repos/{owner}/{repo}/git/trees` |
//! | commit | `POST /repos/{owner}/{repo}/git/commits` |
//! | ref update | `PATCH /repos/{owner}/{repo}/git/refs/heads/{branch}` |
//!
//! Commits created through this API are signed by GitHub when the token
//! belongs to an app or bot, which is the reason for going through it at all.
//!
//! # Rate Limiting
//!
//! Rate limits surface as [`ForgeError::RateLimited`]. There is no retry at
//! this layer.
//!
//! # Example
//!
//! ```ignore
//! use commit_headless::auth::EnvTokenProvider;
//! use commit_headless::forge::{BranchApi, GitHubClient};
//! use std::sync::Arc;
//!
//! let provider = Arc::new(EnvTokenProvider::from_env("github.com"));
//! let client = GitHubClient::new(provider, &"octocat/hello".parse()?, "https://api.github.com", timeout)?;
//! let head = client.get_branch_head("main").await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::traits::{BranchApi, CreateCommitRequest, ForgeError, GitDataApi, TreeEntry};
use crate::auth::{AuthError, TokenProvider};
use crate::core::types::Target;

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("commit-headless/", env!("CARGO_PKG_VERSION"));

/// GitHub git-data client for one repository.
pub struct GitHubClient {
    /// HTTP client for making requests
    client: Client,
    /// Token provider consulted per request
    token_provider: Arc<dyn TokenProvider>,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: Url,
}

// Custom Debug to keep the provider out of logs
impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

impl GitHubClient {
    /// Create a client for `target`.
    ///
    /// # Errors
    ///
    /// - [`ForgeError::NetworkError`] if `api_base` is not a usable URL or the
    ///   HTTP client cannot be built
    pub fn new(
        provider: Arc<dyn TokenProvider>,
        target: &Target,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, ForgeError> {
        let api_base = Url::parse(api_base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ForgeError::NetworkError(format!("invalid API base URL '{api_base}'")))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            token_provider: provider,
            owner: target.owner().to_string(),
            repo: target.repo().to_string(),
            api_base,
        })
    }

    async fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let token = self
            .token_provider
            .bearer_token()
            .await
            .map_err(|e| match e {
                AuthError::NotAuthenticated(_) => ForgeError::AuthRequired,
                other => ForgeError::AuthFailed(other.to_string()),
            })?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build `{api_base}/repos/{owner}/{repo}/{segments...}`.
    ///
    /// Each segment is percent-encoded on its own, so a `/` inside one
    /// segment is escaped.
    fn repo_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str()])
                .extend(segments);
        }
        url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response, ForgeError> {
        tracing::debug!(%method, path = url.path(), "github request");

        let mut request = self
            .client
            .request(method, url)
            .headers(self.headers().await?);
        if let Some(body) = body {
            request = request.json(body);
        }

        request
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ForgeError::Decode(e.to_string()))
        } else {
            Err(Self::error_for(response, status).await)
        }
    }

    async fn error_for(response: Response, status: StatusCode) -> ForgeError {
        let required_permissions = response
            .headers()
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let rate_remaining = response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        tracing::debug!(status = status.as_u16(), %message, "github error response");

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_remaining.as_deref() == Some("0") => {
                ForgeError::RateLimited
            }
            StatusCode::FORBIDDEN => {
                let mut err_msg = format!("Permission denied: {}", message);
                if let Some(perms) = required_permissions.filter(|p| !p.is_empty()) {
                    err_msg.push_str(&format!(" [required: {}]", perms));
                }
                ForgeError::AuthFailed(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl BranchApi for GitHubClient {
    async fn get_branch_head(&self, branch: &str) -> Result<String, ForgeError> {
        let url = self.repo_url(["branches", branch]);
        let response = self.send::<()>(Method::GET, url, None).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ForgeError::NoRemoteBranch {
                branch: branch.to_string(),
            });
        }

        let branch: GitHubBranch = self.handle_response(response).await?;
        Ok(branch.commit.sha)
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<String, ForgeError> {
        let url = self.repo_url(["git", "refs"]);
        let body = CreateRefBody {
            r#ref: format!("refs/heads/{}", branch),
            sha,
        };
        let response = self.send(Method::POST, url, Some(&body)).await?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(match Self::error_for(response, StatusCode::UNPROCESSABLE_ENTITY).await {
                ForgeError::ApiError { message, .. }
                    if message.to_lowercase().contains("already exists") =>
                {
                    ForgeError::ApiError {
                        status: 422,
                        message: format!("branch '{}' already exists", branch),
                    }
                }
                _ => ForgeError::BranchPointMissing {
                    sha: sha.to_string(),
                },
            });
        }

        let created: GitHubRef = self.handle_response(response).await?;
        Ok(created.object.sha)
    }
}

#[async_trait]
impl GitDataApi for GitHubClient {
    async fn get_commit_tree(&self, sha: &str) -> Result<String, ForgeError> {
        let url = self.repo_url(["git", "commits", sha]);
        let response = self.send::<()>(Method::GET, url, None).await?;
        let commit: GitHubCommit = self.handle_response(response).await?;
        Ok(commit.tree.sha)
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String, ForgeError> {
        let url = self.repo_url(["git", "blobs"]);
        let body = CreateBlobBody {
            content: BASE64.encode(content),
            encoding: "base64",
        };
        let response = self.send(Method::POST, url, Some(&body)).await?;
        let blob: GitHubSha = self.handle_response(response).await?;
        Ok(blob.sha)
    }

    async fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> Result<String, ForgeError> {
        let url = self.repo_url(["git", "trees"]);
        let body = CreateTreeBody {
            base_tree,
            tree: entries
                .iter()
                .map(|e| GitHubTreeEntry {
                    path: &e.path,
                    mode: &e.mode,
                    kind: e.kind.as_str(),
                    sha: e.sha.as_deref(),
                })
                .collect(),
        };
        let response = self.send(Method::POST, url, Some(&body)).await?;
        let tree: GitHubSha = self.handle_response(response).await?;
        Ok(tree.sha)
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<String, ForgeError> {
        let url = self.repo_url(["git", "commits"]);
        let body = CreateCommitBody {
            message: &request.message,
            tree: &request.tree,
            parents: &request.parents,
        };
        let response = self.send(Method::POST, url, Some(&body)).await?;
        let commit: GitHubSha = self.handle_response(response).await?;
        Ok(commit.sha)
    }

    async fn update_ref(&self, branch: &str, sha: &str, force: bool) -> Result<(), ForgeError> {
        let url = self.repo_url(["git", "refs", "heads"].into_iter().chain(branch.split('/')));
        let body = UpdateRefBody { sha, force };
        let response = self.send(Method::PATCH, url, Some(&body)).await?;
        let _: GitHubRef = self.handle_response(response).await?;
        Ok(())
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[derive(Deserialize)]
struct GitHubSha {
    sha: String,
}

#[derive(Deserialize)]
struct GitHubBranch {
    commit: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubRef {
    object: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubCommit {
    tree: GitHubSha,
}

#[derive(Serialize)]
struct CreateRefBody<'a> {
    r#ref: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct CreateBlobBody {
    content: String,
    encoding: &'static str,
}

#[derive(Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a str,
    tree: Vec<GitHubTreeEntry<'a>>,
}

/// A `null` sha removes the path from the base tree.
#[derive(Serialize)]
struct GitHubTreeEntry<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: &'a [String],
}

#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}
