//! Provider-agnostic data model for repository listings and pull requests.
//!
//! These types are the normalized output of the adapter layer and are consumed
//! by the rules-sync orchestrator (file discovery, content fetch, PR lookups).

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::{ProviderError, ScmResult};

/// Supported SCM platforms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProviderKind {
    GitHub,
    GitLab,
    Bitbucket,
    AzureDevOps,
}

impl ProviderKind {
    /// Parses common spellings ("github", "azure-devops", "azure_devops").
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Some(Self::GitHub),
            "gitlab" => Some(Self::GitLab),
            "bitbucket" => Some(Self::Bitbucket),
            "azuredevops" | "azure-devops" | "azure_devops" => Some(Self::AzureDevOps),
            _ => None,
        }
    }
}

/// A unique reference to a repository inside a provider.
///
/// * GitHub: `"owner/repo"`.
/// * GitLab: numeric project ID or `"group/project"`.
/// * Bitbucket: `"workspace/repo_slug"`.
/// * Azure DevOps: `"organization/project/repository"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoRef {
    pub project: String,
}

impl RepoRef {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }
}

/// Minimal pull/merge request metadata needed by the sync workflows.
///
/// `head_ref`/`base_ref` are branch names where the provider exposes them;
/// `head_sha` is filled when the API returns it (preferred for content reads
/// because source branches may be deleted after merge).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestMeta {
    pub provider: ProviderKind,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub head_ref: Option<String>,
    pub base_ref: Option<String>,
    pub head_sha: Option<String>,
    pub web_url: Option<String>,
}

/// One entry of a repository tree listing.
///
/// `size` comes from listing metadata when the provider includes it; the fast
/// sync path uses it to drop oversized files without fetching content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListing {
    pub path: String,
    pub size: Option<u64>,
    pub sha: Option<String>,
}

/// Result of a recursive tree listing.
///
/// `truncated` means the file set may be incomplete: the provider truncated
/// its tree response, or the `max_files` cap cut the walk short. Consumers
/// must not treat a path's absence from a truncated listing as the file being
/// gone from the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryListing {
    pub files: Vec<FileListing>,
    pub truncated: bool,
}

/// Content encoding reported by the provider for a file read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    Utf8,
    Base64,
}

/// Raw file content as returned by a provider, plus its declared encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
    pub encoding: ContentEncoding,
}

impl FileContent {
    pub fn utf8(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            encoding: ContentEncoding::Utf8,
        }
    }

    pub fn base64(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            encoding: ContentEncoding::Base64,
        }
    }

    /// Returns the decoded text. Base64 payloads may contain newlines
    /// (GitHub's contents API does that), so whitespace is stripped first.
    pub fn decoded(&self) -> ScmResult<String> {
        match self.encoding {
            ContentEncoding::Utf8 => Ok(self.content.clone()),
            ContentEncoding::Base64 => {
                let compact: String =
                    self.content.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(compact.as_bytes())
                    .map_err(|e| ProviderError::ContentDecode(format!("base64: {e}")))?;
                String::from_utf8(bytes)
                    .map_err(|e| ProviderError::ContentDecode(format!("utf-8: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_with_newlines() {
        // "hello\nworld" encoded, split across lines like GitHub returns it.
        let fc = FileContent::base64("aGVsbG8K\nd29ybGQ=\n");
        assert_eq!(fc.decoded().unwrap(), "hello\nworld");
    }

    #[test]
    fn utf8_passthrough() {
        let fc = FileContent::utf8("plain text");
        assert_eq!(fc.decoded().unwrap(), "plain text");
    }

    #[test]
    fn rejects_bad_base64() {
        let fc = FileContent::base64("not-base64!!!");
        assert!(fc.decoded().is_err());
    }
}
