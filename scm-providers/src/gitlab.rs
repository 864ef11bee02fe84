//! GitLab provider (REST v4) for repository trees, file contents and MRs.
//!
//! Endpoints used:
//! - GET /projects/:id                                    (default branch)
//! - GET /projects/:id/merge_requests/:iid                (MR metadata)
//! - GET /projects/:id/repository/tree?recursive=true     (paged listing)
//! - GET /projects/:id/repository/files/:path?ref=...     (base64 content)

use reqwest::Client;
use serde::Deserialize;

use crate::errors::ScmResult;
use crate::types::*;

#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String, // e.g. "https://gitlab.com/api/v4"
    token: String,    // "PRIVATE-TOKEN"
}

impl GitLabClient {
    /// Constructs a GitLab client with a shared reqwest instance and auth token.
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        Self {
            http,
            base_api,
            token,
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http.get(url).header("PRIVATE-TOKEN", &self.token)
    }

    /// Returns the project's default branch name.
    pub async fn get_default_branch(&self, repo: &RepoRef) -> ScmResult<String> {
        let url = format!(
            "{}/projects/{}",
            self.base_api,
            urlencoding::encode(&repo.project)
        );
        let resp: GlProject = self.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(resp.default_branch)
    }

    /// Fetches MR metadata (source/target branches and head SHA).
    pub async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> ScmResult<PullRequestMeta> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}",
            self.base_api,
            urlencoding::encode(&repo.project),
            number
        );
        let resp: GlMr = self.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(PullRequestMeta {
            provider: ProviderKind::GitLab,
            number,
            title: resp.title,
            state: resp.state,
            head_ref: Some(resp.source_branch),
            base_ref: Some(resp.target_branch),
            head_sha: resp.diff_refs.map(|r| r.head_sha),
            web_url: resp.web_url,
        })
    }

    /// Lists all blobs in the repository tree at `git_ref`, following pages
    /// until exhausted or `max_files` reached.
    ///
    /// The tree API carries no size metadata; `size` stays `None` here and the
    /// fast path's per-file byte cap is applied after fetch for GitLab.
    /// Stopping at the cap marks the listing as truncated.
    pub async fn list_repository_files(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        max_files: usize,
    ) -> ScmResult<RepositoryListing> {
        let mut files = Vec::new();
        let mut page = 1u32;
        loop {
            let url = format!(
                "{}/projects/{}/repository/tree?recursive=true&per_page=100&page={}&ref={}",
                self.base_api,
                urlencoding::encode(&repo.project),
                page,
                urlencoding::encode(git_ref)
            );
            let resp = self.get(&url).send().await?.error_for_status()?;
            let next_page = resp
                .headers()
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u32>().ok());
            let items: Vec<GlTreeEntry> = resp.json().await?;
            if items.is_empty() {
                break;
            }
            for e in items {
                if e.r#type == "blob" {
                    if files.len() >= max_files {
                        return Ok(RepositoryListing {
                            files,
                            truncated: true,
                        });
                    }
                    files.push(FileListing {
                        path: e.path,
                        size: None,
                        sha: Some(e.id),
                    });
                }
            }
            match next_page {
                Some(p) => page = p,
                None => break,
            }
        }
        Ok(RepositoryListing {
            files,
            truncated: false,
        })
    }

    /// Fetches file content at `git_ref`. Returns `Ok(None)` on 404.
    pub async fn get_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> ScmResult<Option<FileContent>> {
        let url = format!(
            "{}/projects/{}/repository/files/{}?ref={}",
            self.base_api,
            urlencoding::encode(&repo.project),
            urlencoding::encode(path.trim_start_matches('/')),
            urlencoding::encode(git_ref)
        );
        let resp = self.get(&url).send().await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let body: GlFile = resp.error_for_status()?.json().await?;
        // GitLab always reports base64 for this endpoint.
        Ok(Some(match body.encoding.as_deref() {
            Some("base64") | None => FileContent::base64(body.content),
            Some(_) => FileContent::utf8(body.content),
        }))
    }
}

// ===== Raw GitLab JSON shapes =====

#[derive(Debug, Deserialize)]
struct GlProject {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct GlMr {
    title: String,
    state: String,
    web_url: Option<String>,
    source_branch: String,
    target_branch: String,
    diff_refs: Option<GlDiffRefs>,
}

#[derive(Debug, Deserialize)]
struct GlDiffRefs {
    head_sha: String,
}

#[derive(Debug, Deserialize)]
struct GlTreeEntry {
    id: String,
    path: String,
    r#type: String,
}

#[derive(Debug, Deserialize)]
struct GlFile {
    content: String,
    encoding: Option<String>,
}
