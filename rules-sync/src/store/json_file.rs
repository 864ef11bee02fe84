//! JSON-on-disk rule store.
//!
//! Layout: $KODY_RULES_STORE_DIR/<organization>/<repo_sanitized>.rules.json
//! (a flat list of [`Rule`]) plus a sibling `.config.json` holding the
//! repository's review configuration. Default root: "code_data/rules_store".
//!
//! A process-wide mutex makes each read-modify-write atomic in-process, which
//! is what enforces the "one active rule per source path" key for concurrent
//! sync passes inside one deployment.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::SyncResult;
use crate::store::{ReviewConfigStore, RuleStore, RuleUpsert};
use crate::types::{ConfiguredDirectory, Rule, RuleStatus, SyncTarget};

/// Filesystem-safe replacement for repository ids (slashes → underscores).
fn sanitize(s: &str) -> String {
    s.replace('/', "_")
}

/// File-backed store implementing both persistence seams.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoConfig {
    #[serde(default = "default_true")]
    rule_sync_enabled: bool,
    #[serde(default)]
    directories: Vec<ConfiguredDirectory>,
    #[serde(default)]
    parameter_touched_at: Option<chrono::DateTime<Utc>>,
}

// Sync is opt-out: a repository with no stored config syncs by default.
impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            rule_sync_enabled: true,
            directories: Vec::new(),
            parameter_touched_at: None,
        }
    }
}

fn default_true() -> bool {
    true
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Root directory from `KODY_RULES_STORE_DIR` (default
    /// "code_data/rules_store").
    pub fn from_env() -> Self {
        let root = std::env::var("KODY_RULES_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("code_data/rules_store"));
        Self::new(root)
    }

    fn rules_path(&self, target: &SyncTarget) -> PathBuf {
        self.root
            .join(sanitize(&target.organization_and_team_data.organization_id))
            .join(format!("{}.rules.json", sanitize(&target.repository.id)))
    }

    fn config_path(&self, target: &SyncTarget) -> PathBuf {
        self.root
            .join(sanitize(&target.organization_and_team_data.organization_id))
            .join(format!("{}.config.json", sanitize(&target.repository.id)))
    }

    async fn load_rules(&self, target: &SyncTarget) -> SyncResult<Vec<Rule>> {
        let path = self.rules_path(target);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read(&path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn save_rules(&self, target: &SyncTarget, rules: &[Rule]) -> SyncResult<()> {
        let path = self.rules_path(target);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(rules)?;
        fs::write(&path, data).await?;
        Ok(())
    }

    async fn load_config(&self, target: &SyncTarget) -> SyncResult<RepoConfig> {
        let path = self.config_path(target);
        if !path.exists() {
            return Ok(RepoConfig::default());
        }
        let data = fs::read(&path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn save_config(&self, target: &SyncTarget, cfg: &RepoConfig) -> SyncResult<()> {
        let path = self.config_path(target);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&path, data).await?;
        Ok(())
    }
}

impl RuleStore for JsonFileStore {
    async fn create_or_update(&self, target: &SyncTarget, dto: RuleUpsert) -> SyncResult<Rule> {
        let _guard = self.write_lock.lock().await;
        let mut rules = self.load_rules(target).await?;
        let now = Utc::now();

        // Resolve the slot: explicit uuid first, then the active rule for the
        // same source path. This is the unique-key enforcement.
        let slot = rules.iter_mut().find(|r| match dto.uuid {
            Some(id) => r.uuid == id,
            None => {
                r.status == RuleStatus::Active
                    && r.source_path == dto.candidate.source_path
                    && r.repository_id == dto.repository_id
            }
        });

        let rule = match slot {
            Some(existing) => {
                existing.title = dto.candidate.title;
                existing.rule = dto.candidate.rule;
                existing.severity = dto.candidate.severity;
                existing.scope = dto.candidate.scope;
                existing.examples = dto.candidate.examples;
                existing.source_path = dto.candidate.source_path;
                existing.directory_id = dto.directory_id;
                existing.origin = dto.origin;
                existing.status = RuleStatus::Active;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let rule = Rule {
                    uuid: Uuid::new_v4(),
                    repository_id: dto.repository_id,
                    directory_id: dto.directory_id,
                    source_path: dto.candidate.source_path,
                    title: dto.candidate.title,
                    rule: dto.candidate.rule,
                    severity: dto.candidate.severity,
                    scope: dto.candidate.scope,
                    examples: dto.candidate.examples,
                    origin: dto.origin,
                    status: RuleStatus::Active,
                    created_at: now,
                    updated_at: now,
                };
                rules.push(rule.clone());
                rule
            }
        };

        self.save_rules(target, &rules).await?;
        Ok(rule)
    }

    async fn find_active_by_source_path(
        &self,
        target: &SyncTarget,
        source_path: &str,
    ) -> SyncResult<Option<Rule>> {
        let rules = self.load_rules(target).await?;
        Ok(rules
            .into_iter()
            .find(|r| r.status == RuleStatus::Active && r.source_path == source_path))
    }

    async fn list_active(&self, target: &SyncTarget) -> SyncResult<Vec<Rule>> {
        let rules = self.load_rules(target).await?;
        Ok(rules
            .into_iter()
            .filter(|r| r.status == RuleStatus::Active)
            .collect())
    }

    async fn delete_logically(
        &self,
        target: &SyncTarget,
        rule_uuid: Uuid,
    ) -> SyncResult<Option<Rule>> {
        let _guard = self.write_lock.lock().await;
        let mut rules = self.load_rules(target).await?;
        let mut deleted = None;
        if let Some(rule) = rules.iter_mut().find(|r| r.uuid == rule_uuid) {
            rule.status = RuleStatus::Deleted;
            rule.updated_at = Utc::now();
            deleted = Some(rule.clone());
        }
        if deleted.is_some() {
            self.save_rules(target, &rules).await?;
        }
        Ok(deleted)
    }
}

impl ReviewConfigStore for JsonFileStore {
    async fn is_rule_sync_enabled(&self, target: &SyncTarget) -> SyncResult<bool> {
        Ok(self.load_config(target).await?.rule_sync_enabled)
    }

    async fn configured_directories(
        &self,
        target: &SyncTarget,
    ) -> SyncResult<Vec<ConfiguredDirectory>> {
        Ok(self.load_config(target).await?.directories)
    }

    async fn update_or_create_parameter(&self, target: &SyncTarget) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut cfg = self.load_config(target).await?;
        cfg.parameter_touched_at = Some(Utc::now());
        self.save_config(target, &cfg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        OrganizationAndTeamData, RepositoryRef, RuleCandidate, RuleOrigin, RuleScope, Severity,
    };

    fn target() -> SyncTarget {
        SyncTarget {
            organization_and_team_data: OrganizationAndTeamData {
                organization_id: "org-1".into(),
                team_id: None,
            },
            repository: RepositoryRef {
                id: "repo-1".into(),
                name: "demo".into(),
                full_name: Some("acme/demo".into()),
                default_branch: Some("main".into()),
            },
        }
    }

    fn candidate(source_path: &str, title: &str) -> RuleCandidate {
        RuleCandidate {
            title: title.into(),
            rule: "rule text".into(),
            path: source_path.into(),
            source_path: source_path.into(),
            severity: Severity::Medium,
            scope: RuleScope::File,
            examples: Vec::new(),
            source_snippet: None,
        }
    }

    fn upsert(source_path: &str, title: &str) -> RuleUpsert {
        RuleUpsert {
            uuid: None,
            repository_id: "repo-1".into(),
            directory_id: None,
            origin: RuleOrigin::User,
            candidate: candidate(source_path, title),
        }
    }

    #[tokio::test]
    async fn upsert_by_source_path_never_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let t = target();

        let first = store.create_or_update(&t, upsert("a.md", "v1")).await.unwrap();
        let second = store.create_or_update(&t, upsert("a.md", "v2")).await.unwrap();

        assert_eq!(first.uuid, second.uuid);
        assert_eq!(second.title, "v2");
        assert_eq!(store.list_active(&t).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn logical_delete_preserves_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let t = target();

        let rule = store.create_or_update(&t, upsert("a.md", "v1")).await.unwrap();
        let deleted = store.delete_logically(&t, rule.uuid).await.unwrap().unwrap();
        assert_eq!(deleted.status, RuleStatus::Deleted);

        assert!(store.list_active(&t).await.unwrap().is_empty());
        // Raw file still holds the deleted record.
        let all = store.load_rules(&t).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn deleted_slot_is_not_reused_by_source_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let t = target();

        let rule = store.create_or_update(&t, upsert("a.md", "v1")).await.unwrap();
        store.delete_logically(&t, rule.uuid).await.unwrap();

        let fresh = store.create_or_update(&t, upsert("a.md", "v2")).await.unwrap();
        assert_ne!(fresh.uuid, rule.uuid);
    }

    #[tokio::test]
    async fn config_roundtrip_and_touch() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let t = target();

        // Defaults: sync enabled, no directories.
        assert!(store.is_rule_sync_enabled(&t).await.unwrap());
        assert!(store.configured_directories(&t).await.unwrap().is_empty());

        store.update_or_create_parameter(&t).await.unwrap();
        store.update_or_create_parameter(&t).await.unwrap();
        let cfg = store.load_config(&t).await.unwrap();
        assert!(cfg.parameter_touched_at.is_some());
    }
}
