//! Bitbucket Cloud provider (REST 2.0) for repository listings, file contents
//! and pull requests.
//!
//! Endpoints used:
//! - GET /2.0/repositories/{workspace}/{repo_slug}                 (main branch)
//! - GET /2.0/repositories/{workspace}/{repo_slug}/pullrequests/{id}
//! - GET /2.0/repositories/{workspace}/{repo_slug}/src/{ref}/      (paged listing)
//! - GET /2.0/repositories/{workspace}/{repo_slug}/src/{ref}/{path} (raw text)

use reqwest::Client;
use serde::Deserialize;

use crate::errors::ScmResult;
use crate::types::*;

#[derive(Debug, Clone)]
pub struct BitbucketClient {
    http: Client,
    base_api: String, // "https://api.bitbucket.org/2.0"
    token: String,    // "Bearer <token>"
}

impl BitbucketClient {
    /// Constructs a Bitbucket client with a shared reqwest instance and token.
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
    }

    /// Returns the repository's main branch name.
    pub async fn get_default_branch(&self, repo: &RepoRef) -> ScmResult<String> {
        let url = format!("{}/repositories/{}", self.base_api, repo.project);
        let resp: BbRepo = self.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(resp.mainbranch.name)
    }

    /// Fetches PR metadata (source/destination branches and source commit).
    pub async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> ScmResult<PullRequestMeta> {
        let url = format!(
            "{}/repositories/{}/pullrequests/{}",
            self.base_api, repo.project, number
        );
        let resp: BbPull = self.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(PullRequestMeta {
            provider: ProviderKind::Bitbucket,
            number,
            title: resp.title,
            state: resp.state,
            head_ref: Some(resp.source.branch.name),
            base_ref: Some(resp.destination.branch.name),
            head_sha: resp.source.commit.map(|c| c.hash),
            web_url: resp.links.and_then(|l| l.html).map(|h| h.href),
        })
    }

    /// Lists repository files at `git_ref`, following `next` page links.
    ///
    /// The `src` listing carries per-file sizes, which the fast sync path uses
    /// to pre-filter oversized files. Stopping at the `max_files` cap marks
    /// the listing as truncated.
    pub async fn list_repository_files(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        max_files: usize,
    ) -> ScmResult<RepositoryListing> {
        let mut files = Vec::new();
        let mut url = format!(
            "{}/repositories/{}/src/{}/?max_depth=20&pagelen=100",
            self.base_api,
            repo.project,
            urlencoding::encode(git_ref)
        );
        loop {
            let page: BbSrcPage = self.get(&url).send().await?.error_for_status()?.json().await?;
            for entry in page.values {
                if entry.r#type == "commit_file" {
                    if files.len() >= max_files {
                        return Ok(RepositoryListing {
                            files,
                            truncated: true,
                        });
                    }
                    files.push(FileListing {
                        path: entry.path,
                        size: entry.size,
                        sha: None,
                    });
                }
            }
            match page.next {
                Some(next) => url = next,
                None => break,
            }
        }
        Ok(RepositoryListing {
            files,
            truncated: false,
        })
    }

    /// Fetches file content at `git_ref`. Returns `Ok(None)` on 404.
    ///
    /// Bitbucket serves raw file bytes for this endpoint, so content arrives
    /// as plain UTF-8 text (no base64 step).
    pub async fn get_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> ScmResult<Option<FileContent>> {
        let url = format!(
            "{}/repositories/{}/src/{}/{}",
            self.base_api,
            repo.project,
            urlencoding::encode(git_ref),
            path.trim_start_matches('/')
        );
        let resp = self.get(&url).send().await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let text = resp.error_for_status()?.text().await?;
        Ok(Some(FileContent::utf8(text)))
    }
}

// ===== Raw Bitbucket JSON shapes =====

#[derive(Debug, Deserialize)]
struct BbRepo {
    mainbranch: BbBranch,
}

#[derive(Debug, Deserialize)]
struct BbBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BbPull {
    title: String,
    state: String,
    source: BbPullSide,
    destination: BbPullSide,
    links: Option<BbLinks>,
}

#[derive(Debug, Deserialize)]
struct BbPullSide {
    branch: BbBranch,
    commit: Option<BbCommit>,
}

#[derive(Debug, Deserialize)]
struct BbCommit {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct BbLinks {
    html: Option<BbHref>,
}

#[derive(Debug, Deserialize)]
struct BbHref {
    href: String,
}

#[derive(Debug, Deserialize)]
struct BbSrcPage {
    values: Vec<BbSrcEntry>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BbSrcEntry {
    path: String,
    r#type: String,
    size: Option<u64>,
}
