//! GitHub provider (REST v3) for repository trees, file contents and PRs.
//!
//! Endpoints used:
//! - GET /repos/{owner}/{repo}                          (default branch)
//! - GET /repos/{owner}/{repo}/pulls/{number}           (PR metadata)
//! - GET /repos/{owner}/{repo}/git/trees/{ref}?recursive=1
//! - GET /repos/{owner}/{repo}/contents/{path}?ref=...  (base64 content)

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{ProviderError, ScmResult};
use crate::types::*;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String, // e.g. "https://api.github.com"
    token: String,    // "Bearer <token>"
}

impl GitHubClient {
    /// Constructs a GitHub client with a shared reqwest instance and auth token.
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        Self {
            http,
            base_api,
            token,
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
    }

    /// Returns the repository's default branch name.
    pub async fn get_default_branch(&self, repo: &RepoRef) -> ScmResult<String> {
        let url = format!("{}/repos/{}", self.base_api, repo.project);
        let resp: GhRepo = self.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(resp.default_branch)
    }

    /// Fetches PR metadata (head/base refs and head SHA).
    pub async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> ScmResult<PullRequestMeta> {
        let url = format!("{}/repos/{}/pulls/{}", self.base_api, repo.project, number);
        let resp: GhPull = self.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(PullRequestMeta {
            provider: ProviderKind::GitHub,
            number,
            title: resp.title,
            state: resp.state,
            head_ref: Some(resp.head.r#ref),
            base_ref: Some(resp.base.r#ref),
            head_sha: Some(resp.head.sha),
            web_url: resp.html_url,
        })
    }

    /// Lists all blobs in the repository tree at `git_ref` (recursive).
    ///
    /// The tree API reports blob sizes, which the fast sync path uses to skip
    /// oversized files without downloading them. Provider-side truncation and
    /// the `max_files` cap both mark the listing as truncated.
    pub async fn list_repository_files(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        max_files: usize,
    ) -> ScmResult<RepositoryListing> {
        let url = format!(
            "{}/repos/{}/git/trees/{}?recursive=1",
            self.base_api,
            repo.project,
            urlencoding::encode(git_ref)
        );
        let resp: GhTree = self.get(&url).send().await?.error_for_status()?.json().await?;
        let mut truncated = resp.truncated;
        if truncated {
            debug!(project = %repo.project, "github tree listing truncated by provider");
        }
        let mut files = Vec::new();
        for e in resp.tree.into_iter().filter(|e| e.r#type == "blob") {
            if files.len() >= max_files {
                truncated = true;
                break;
            }
            files.push(FileListing {
                path: e.path,
                size: e.size,
                sha: Some(e.sha),
            });
        }
        Ok(RepositoryListing { files, truncated })
    }

    /// Fetches file content at `git_ref`. Returns `Ok(None)` on 404.
    ///
    /// The contents API returns base64 with embedded newlines; decoding is the
    /// caller's job via [`FileContent::decoded`].
    pub async fn get_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> ScmResult<Option<FileContent>> {
        let url = format!(
            "{}/repos/{}/contents/{}?ref={}",
            self.base_api,
            repo.project,
            path.trim_start_matches('/'),
            urlencoding::encode(git_ref)
        );
        let resp = self.get(&url).send().await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let body: GhContent = resp.error_for_status()?.json().await?;
        match body.encoding.as_str() {
            "base64" => Ok(Some(FileContent::base64(body.content))),
            "utf-8" | "utf8" => Ok(Some(FileContent::utf8(body.content))),
            other => Err(ProviderError::InvalidResponse(format!(
                "unexpected content encoding: {other}"
            ))),
        }
    }
}

// ===== Raw GitHub JSON shapes =====

#[derive(Debug, Deserialize)]
struct GhRepo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct GhPull {
    title: String,
    state: String,
    html_url: Option<String>,
    head: GhPullRef,
    base: GhPullRef,
}

#[derive(Debug, Deserialize)]
struct GhPullRef {
    r#ref: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GhTree {
    #[serde(default)]
    truncated: bool,
    tree: Vec<GhTreeEntry>,
}

#[derive(Debug, Deserialize)]
struct GhTreeEntry {
    path: String,
    r#type: String,
    sha: String,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GhContent {
    content: String,
    encoding: String,
}
