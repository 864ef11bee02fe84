//! Platform adapter facade without async-trait or dynamic trait objects.
//!
//! One enum `ProviderClient` with concrete implementations per SCM platform
//! (GitHub / GitLab / Bitbucket / Azure DevOps). This keeps async fns simple,
//! avoids boxed futures, and makes capability gaps compile-time visible: an
//! operation a platform cannot serve returns `ProviderError::Unsupported`
//! from that variant's arm rather than a wide interface full of stubs.
//!
//! Operations exposed to the sync workflows:
//! - `get_default_branch`     — cheap metadata read
//! - `get_pull_request`       — PR/MR metadata (head/base refs + head SHA)
//! - `list_repository_files`  — recursive blob listing (size metadata where
//!   the platform provides it)
//! - `get_file_content`       — single file read, `Ok(None)` on 404,
//!   base64-aware via [`types::FileContent::decoded`]

pub mod errors;
pub mod retry;
pub mod types;

pub mod azure_devops;
pub mod bitbucket;
pub mod github;
pub mod gitlab;

pub use errors::{ProviderError, ScmResult};
pub use types::*;

/// Runtime configuration for any provider client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// API base, e.g. "https://api.github.com" or "https://gitlab.com/api/v4".
    pub base_api: String,
    /// Access token for the provider (PAT or app token).
    pub token: String,
}

impl ProviderConfig {
    /// Reads `SCM_PROVIDER`, `SCM_BASE_API` and `SCM_TOKEN`.
    ///
    /// `SCM_BASE_API` defaults to the public cloud endpoint of the chosen
    /// provider.
    pub fn from_env() -> ScmResult<Self> {
        let kind_raw = std::env::var("SCM_PROVIDER")
            .map_err(|_| ProviderError::Config("SCM_PROVIDER is not set".into()))?;
        let kind = ProviderKind::parse(&kind_raw).ok_or_else(|| {
            ProviderError::Config(format!("unsupported SCM_PROVIDER: {kind_raw}"))
        })?;
        let base_api = std::env::var("SCM_BASE_API").unwrap_or_else(|_| {
            match kind {
                ProviderKind::GitHub => "https://api.github.com",
                ProviderKind::GitLab => "https://gitlab.com/api/v4",
                ProviderKind::Bitbucket => "https://api.bitbucket.org/2.0",
                ProviderKind::AzureDevOps => "https://dev.azure.com",
            }
            .to_string()
        });
        let token = std::env::var("SCM_TOKEN")
            .map_err(|_| ProviderError::Config("SCM_TOKEN is not set".into()))?;
        Ok(Self {
            kind,
            base_api,
            token,
        })
    }
}

/// Concrete provider client (enum-dispatch).
#[derive(Debug, Clone)]
pub enum ProviderClient {
    GitHub(github::GitHubClient),
    GitLab(gitlab::GitLabClient),
    Bitbucket(bitbucket::BitbucketClient),
    AzureDevOps(azure_devops::AzureDevOpsClient),
}

impl ProviderClient {
    /// Constructs a concrete client from generic config.
    pub fn from_config(cfg: ProviderConfig) -> ScmResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("kody-sync-backend/0.1")
            .build()?;
        Ok(match cfg.kind {
            ProviderKind::GitHub => {
                Self::GitHub(github::GitHubClient::new(client, cfg.base_api, cfg.token))
            }
            ProviderKind::GitLab => {
                Self::GitLab(gitlab::GitLabClient::new(client, cfg.base_api, cfg.token))
            }
            ProviderKind::Bitbucket => Self::Bitbucket(bitbucket::BitbucketClient::new(
                client,
                cfg.base_api,
                cfg.token,
            )),
            ProviderKind::AzureDevOps => Self::AzureDevOps(azure_devops::AzureDevOpsClient::new(
                client,
                cfg.base_api,
                cfg.token,
            )),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::GitHub(_) => ProviderKind::GitHub,
            Self::GitLab(_) => ProviderKind::GitLab,
            Self::Bitbucket(_) => ProviderKind::Bitbucket,
            Self::AzureDevOps(_) => ProviderKind::AzureDevOps,
        }
    }

    /// Fetch the repository's default branch name.
    pub async fn get_default_branch(&self, repo: &RepoRef) -> ScmResult<String> {
        match self {
            Self::GitHub(c) => c.get_default_branch(repo).await,
            Self::GitLab(c) => c.get_default_branch(repo).await,
            Self::Bitbucket(c) => c.get_default_branch(repo).await,
            Self::AzureDevOps(c) => c.get_default_branch(repo).await,
        }
    }

    /// Fetch PR/MR metadata by number.
    pub async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> ScmResult<PullRequestMeta> {
        match self {
            Self::GitHub(c) => c.get_pull_request(repo, number).await,
            Self::GitLab(c) => c.get_pull_request(repo, number).await,
            Self::Bitbucket(c) => c.get_pull_request(repo, number).await,
            Self::AzureDevOps(c) => c.get_pull_request(repo, number).await,
        }
    }

    /// List repository blobs at `git_ref`, capped at `max_files`. The result
    /// is flagged as truncated when it may not cover the whole tree.
    pub async fn list_repository_files(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        max_files: usize,
    ) -> ScmResult<RepositoryListing> {
        match self {
            Self::GitHub(c) => c.list_repository_files(repo, git_ref, max_files).await,
            Self::GitLab(c) => c.list_repository_files(repo, git_ref, max_files).await,
            Self::Bitbucket(c) => c.list_repository_files(repo, git_ref, max_files).await,
            Self::AzureDevOps(c) => c.list_repository_files(repo, git_ref, max_files).await,
        }
    }

    /// Fetch a single file's content at `git_ref`. Returns `Ok(None)` on 404.
    pub async fn get_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> ScmResult<Option<FileContent>> {
        match self {
            Self::GitHub(c) => c.get_file_content(repo, path, git_ref).await,
            Self::GitLab(c) => c.get_file_content(repo, path, git_ref).await,
            Self::Bitbucket(c) => c.get_file_content(repo, path, git_ref).await,
            Self::AzureDevOps(c) => c.get_file_content(repo, path, git_ref).await,
        }
    }
}
