//! File-source seam between the orchestrator and the platform adapter.
//!
//! The orchestrator is generic over this trait; production wires
//! [`scm_providers::ProviderClient`] (with bounded retry and base64 decode on
//! reads), tests wire an in-memory fake.

use scm_providers::{
    ProviderClient, PullRequestMeta, RepoRef, RepositoryListing, retry,
};

use crate::errors::SyncResult;
use crate::types::RepositoryRef;

/// Read-only repository access used by the sync workflows.
pub trait FileSource {
    /// Repository default branch name.
    fn default_branch(
        &self,
        repo: &RepositoryRef,
    ) -> impl Future<Output = SyncResult<String>> + Send;

    /// PR/MR metadata by number.
    fn pull_request(
        &self,
        repo: &RepositoryRef,
        number: u64,
    ) -> impl Future<Output = SyncResult<PullRequestMeta>> + Send;

    /// Recursive blob listing at `git_ref`, capped at `max_files`. The
    /// `truncated` flag must be set whenever the listing may be incomplete.
    fn list_files(
        &self,
        repo: &RepositoryRef,
        git_ref: &str,
        max_files: usize,
    ) -> impl Future<Output = SyncResult<RepositoryListing>> + Send;

    /// Decoded text content of one file at `git_ref`; `None` when the file
    /// does not exist at that ref.
    fn read_file(
        &self,
        repo: &RepositoryRef,
        path: &str,
        git_ref: &str,
    ) -> impl Future<Output = SyncResult<Option<String>>> + Send;
}

impl FileSource for ProviderClient {
    async fn default_branch(&self, repo: &RepositoryRef) -> SyncResult<String> {
        let repo_ref = RepoRef::new(repo.project());
        Ok(self.get_default_branch(&repo_ref).await?)
    }

    async fn pull_request(
        &self,
        repo: &RepositoryRef,
        number: u64,
    ) -> SyncResult<PullRequestMeta> {
        let repo_ref = RepoRef::new(repo.project());
        Ok(self.get_pull_request(&repo_ref, number).await?)
    }

    async fn list_files(
        &self,
        repo: &RepositoryRef,
        git_ref: &str,
        max_files: usize,
    ) -> SyncResult<RepositoryListing> {
        let repo_ref = RepoRef::new(repo.project());
        Ok(self
            .list_repository_files(&repo_ref, git_ref, max_files)
            .await?)
    }

    async fn read_file(
        &self,
        repo: &RepositoryRef,
        path: &str,
        git_ref: &str,
    ) -> SyncResult<Option<String>> {
        let repo_ref = RepoRef::new(repo.project());
        let content = retry::with_retry("read_file", retry::DEFAULT_ATTEMPTS, || {
            self.get_file_content(&repo_ref, path, git_ref)
        })
        .await?;
        match content {
            Some(fc) => Ok(Some(fc.decoded()?)),
            None => Ok(None),
        }
    }
}
