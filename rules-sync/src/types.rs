//! Domain model for rule sync: candidates, persisted rules, sync addressing.
//!
//! `RuleCandidate` is the transient output of LLM extraction; it becomes a
//! persisted `Rule` only after the orchestrator resolves directory scoping
//! and upserts it through the rule store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a rule, inferred from the source file's modal language.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Case-insensitive parse; anything unrecognized is `None` so callers can
    /// apply the medium default.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Whether a rule applies per-file or to the pull request as a whole.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RuleScope {
    #[default]
    File,
    PullRequest,
}

impl RuleScope {
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "pull-request" | "pull_request" | "pullrequest" => Some(Self::PullRequest),
            _ => None,
        }
    }
}

/// A good/bad code example attached to a rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuleExample {
    pub snippet: String,
    pub is_correct: bool,
}

/// Transient rule candidate produced by the extraction engine.
///
/// Not persisted; the orchestrator turns it into a [`Rule`] via upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCandidate {
    pub title: String,
    pub rule: String,
    pub path: String,
    pub source_path: String,
    pub severity: Severity,
    pub scope: RuleScope,
    #[serde(default)]
    pub examples: Vec<RuleExample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_snippet: Option<String>,
}

/// Where a rule came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleOrigin {
    /// Synced from the user's repository files.
    User,
    /// Installed from the built-in rule library.
    Library,
}

/// Lifecycle status of a persisted rule. Deletes are always logical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Active,
    Deleted,
}

/// Persisted rule entity.
///
/// Upsert identity is `(repository_id, source_path)` with at most one active
/// rule per source path; the store enforces that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub uuid: Uuid,
    pub repository_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_id: Option<String>,
    pub source_path: String,
    pub title: String,
    pub rule: String,
    pub severity: Severity,
    pub scope: RuleScope,
    #[serde(default)]
    pub examples: Vec<RuleExample>,
    pub origin: RuleOrigin,
    pub status: RuleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sub-tree of a monorepo registered for separate rule scoping.
///
/// Owned by the repository's review configuration; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfiguredDirectory {
    pub id: String,
    pub path: String,
}

/// Organization/team addressing for one sync run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationAndTeamData {
    pub organization_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

/// The repository a sync run addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

impl RepositoryRef {
    /// Provider-facing project identifier (`full_name` when present).
    pub fn project(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }
}

/// Addressing context for one sync run. Created per invocation, not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTarget {
    pub organization_and_team_data: OrganizationAndTeamData,
    pub repository: RepositoryRef,
}

/// Change status of a file inside a PR event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

/// One entry of a changed-files event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedFile {
    pub filename: String,
    /// Pre-rename path; set only for `Renamed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_filename: Option<String>,
    pub status: ChangeStatus,
}

/// Transient in-memory candidate during one sync pass; discarded after
/// extraction. Directory scoping happens later, at upsert time.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub path: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(
            serde_json::from_str::<Severity>("\"high\"").unwrap(),
            Severity::High
        );
    }

    #[test]
    fn scope_serde_is_kebab_case() {
        assert_eq!(
            serde_json::to_string(&RuleScope::PullRequest).unwrap(),
            "\"pull-request\""
        );
    }

    #[test]
    fn lenient_parse_handles_capitalization() {
        assert_eq!(Severity::parse_lenient("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse_lenient("  Critical "), Some(Severity::Critical));
        assert_eq!(Severity::parse_lenient("urgent"), None);
        assert_eq!(
            RuleScope::parse_lenient("Pull_Request"),
            Some(RuleScope::PullRequest)
        );
    }
}
