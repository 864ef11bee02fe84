//! Azure DevOps provider (REST 7.1) for repository items and pull requests.
//!
//! `RepoRef::project` is `"organization/project/repository"` here.
//!
//! Endpoints used:
//! - GET {org}/{project}/_apis/git/repositories/{repo}            (default branch)
//! - GET .../pullrequests/{id}
//! - GET .../items?recursionLevel=Full&versionDescriptor.version=...
//! - GET .../items?path=...&includeContent=true
//!
//! Listing metadata carries no blob sizes, so the fast path's pre-fetch size
//! filter does not apply to this provider.

use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

use crate::errors::{ProviderError, ScmResult};
use crate::types::*;

#[derive(Debug, Clone)]
pub struct AzureDevOpsClient {
    http: Client,
    base_api: String, // "https://dev.azure.com"
    token: String,    // PAT, sent as basic auth
}

impl AzureDevOpsClient {
    /// Constructs an Azure DevOps client with a shared reqwest instance and PAT.
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        Self {
            http,
            base_api,
            token,
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        // PATs use basic auth with an empty user name.
        let basic = base64::engine::general_purpose::STANDARD
            .encode(format!(":{}", self.token).as_bytes());
        self.http
            .get(url)
            .header("Authorization", format!("Basic {basic}"))
    }

    /// Splits `"org/project/repo"` into its three segments.
    fn split_project(repo: &RepoRef) -> ScmResult<(String, String, String)> {
        let mut parts = repo.project.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(org), Some(project), Some(name)) if !org.is_empty() && !name.is_empty() => Ok((
                org.to_string(),
                project.to_string(),
                name.to_string(),
            )),
            _ => Err(ProviderError::Config(format!(
                "azure devops repo ref must be \"org/project/repo\", got {:?}",
                repo.project
            ))),
        }
    }

    /// Returns the repository's default branch name (short form, no refs/heads/).
    pub async fn get_default_branch(&self, repo: &RepoRef) -> ScmResult<String> {
        let (org, project, name) = Self::split_project(repo)?;
        let url = format!(
            "{}/{}/{}/_apis/git/repositories/{}?api-version=7.1",
            self.base_api, org, project, name
        );
        let resp: AzRepo = self.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(resp
            .default_branch
            .trim_start_matches("refs/heads/")
            .to_string())
    }

    /// Fetches PR metadata (source/target branches, last merge source commit).
    pub async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> ScmResult<PullRequestMeta> {
        let (org, project, name) = Self::split_project(repo)?;
        let url = format!(
            "{}/{}/{}/_apis/git/repositories/{}/pullrequests/{}?api-version=7.1",
            self.base_api, org, project, name, number
        );
        let resp: AzPull = self.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(PullRequestMeta {
            provider: ProviderKind::AzureDevOps,
            number,
            title: resp.title,
            state: resp.status,
            head_ref: Some(
                resp.source_ref_name
                    .trim_start_matches("refs/heads/")
                    .to_string(),
            ),
            base_ref: Some(
                resp.target_ref_name
                    .trim_start_matches("refs/heads/")
                    .to_string(),
            ),
            head_sha: resp.last_merge_source_commit.map(|c| c.commit_id),
            web_url: None,
        })
    }

    /// Lists all blobs at `git_ref` (full recursion). Stopping at the
    /// `max_files` cap marks the listing as truncated.
    pub async fn list_repository_files(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        max_files: usize,
    ) -> ScmResult<RepositoryListing> {
        let (org, project, name) = Self::split_project(repo)?;
        let url = format!(
            "{}/{}/{}/_apis/git/repositories/{}/items?recursionLevel=Full&versionDescriptor.version={}&api-version=7.1",
            self.base_api,
            org,
            project,
            name,
            urlencoding::encode(git_ref)
        );
        let resp: AzItems = self.get(&url).send().await?.error_for_status()?.json().await?;
        let mut truncated = false;
        let mut files = Vec::new();
        for i in resp.value.into_iter().filter(|i| !i.is_folder) {
            if files.len() >= max_files {
                truncated = true;
                break;
            }
            files.push(FileListing {
                path: i.path.trim_start_matches('/').to_string(),
                size: None,
                sha: i.object_id,
            });
        }
        Ok(RepositoryListing { files, truncated })
    }

    /// Fetches file content at `git_ref`. Returns `Ok(None)` on 404.
    pub async fn get_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> ScmResult<Option<FileContent>> {
        let (org, project, name) = Self::split_project(repo)?;
        let url = format!(
            "{}/{}/{}/_apis/git/repositories/{}/items?path=/{}&includeContent=true&versionDescriptor.version={}&api-version=7.1",
            self.base_api,
            org,
            project,
            name,
            urlencoding::encode(path.trim_start_matches('/')),
            urlencoding::encode(git_ref)
        );
        let resp = self
            .get(&url)
            .header("Accept", "text/plain")
            .send()
            .await?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        let text = resp.error_for_status()?.text().await?;
        Ok(Some(FileContent::utf8(text)))
    }
}

// ===== Raw Azure DevOps JSON shapes =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzRepo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzPull {
    title: String,
    status: String,
    source_ref_name: String,
    target_ref_name: String,
    last_merge_source_commit: Option<AzCommitRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzCommitRef {
    commit_id: String,
}

#[derive(Debug, Deserialize)]
struct AzItems {
    value: Vec<AzItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzItem {
    path: String,
    #[serde(default)]
    is_folder: bool,
    object_id: Option<String>,
}
