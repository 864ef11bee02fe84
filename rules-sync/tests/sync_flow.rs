//! End-to-end orchestrator flows over an in-memory source, a scripted LLM
//! runner and the JSON-file store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use llm_runner::{LlmError, PromptMessage};
use scm_providers::{FileListing, ProviderKind, PullRequestMeta, RepositoryListing};
use serde_json::{Value, json};

use rules_sync::errors::SyncResult;
use rules_sync::extraction::RulePromptRunner;
use rules_sync::source::FileSource;
use rules_sync::store::{RuleStore, RuleUpsert};
use rules_sync::types::{
    ChangeStatus, ChangedFile, OrganizationAndTeamData, RepositoryRef, RuleCandidate, RuleOrigin,
    RuleScope, Severity, SyncTarget,
};
use rules_sync::{JsonFileStore, SyncLimits, SyncOrchestrator};

/// In-memory repository: a tree listing plus per-ref file contents.
#[derive(Default)]
struct FakeSource {
    listing: Vec<FileListing>,
    truncated: bool,
    files: HashMap<(String, String), String>,
}

impl FakeSource {
    fn listed(mut self, path: &str, size: u64) -> Self {
        self.listing.push(FileListing {
            path: path.to_string(),
            size: Some(size),
            sha: None,
        });
        self
    }

    fn truncated(mut self) -> Self {
        self.truncated = true;
        self
    }

    fn file(mut self, git_ref: &str, path: &str, content: &str) -> Self {
        self.files
            .insert((git_ref.to_string(), path.to_string()), content.to_string());
        self
    }
}

impl FileSource for FakeSource {
    async fn default_branch(&self, _repo: &RepositoryRef) -> SyncResult<String> {
        Ok("main".to_string())
    }

    async fn pull_request(
        &self,
        _repo: &RepositoryRef,
        number: u64,
    ) -> SyncResult<PullRequestMeta> {
        Ok(pr_meta(number))
    }

    async fn list_files(
        &self,
        _repo: &RepositoryRef,
        _git_ref: &str,
        max_files: usize,
    ) -> SyncResult<RepositoryListing> {
        Ok(RepositoryListing {
            files: self.listing.iter().take(max_files).cloned().collect(),
            truncated: self.truncated || self.listing.len() > max_files,
        })
    }

    async fn read_file(
        &self,
        _repo: &RepositoryRef,
        path: &str,
        git_ref: &str,
    ) -> SyncResult<Option<String>> {
        Ok(self
            .files
            .get(&(git_ref.to_string(), path.to_string()))
            .cloned())
    }
}

/// Counts LLM calls and replies with a fixed structured payload.
struct CountingRunner {
    calls: AtomicUsize,
    reply: Value,
}

impl CountingRunner {
    fn one_rule() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply: json!([{"title": "Extracted", "rule": "Do the thing", "severity": "high"}]),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RulePromptRunner for CountingRunner {
    async fn run_structured(&self, _messages: &[PromptMessage]) -> Result<Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    async fn run_raw(&self, _messages: &[PromptMessage]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::EmptyChoices)
    }
}

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

fn pr_meta(number: u64) -> PullRequestMeta {
    PullRequestMeta {
        provider: ProviderKind::GitHub,
        number,
        title: "test".into(),
        state: "open".into(),
        head_ref: Some("feature".into()),
        base_ref: Some("main".into()),
        head_sha: Some("abc123".into()),
        web_url: None,
    }
}

fn changed(filename: &str, status: ChangeStatus) -> ChangedFile {
    ChangedFile {
        filename: filename.into(),
        previous_filename: None,
        status,
    }
}

fn seed_rule(source_path: &str) -> RuleUpsert {
    RuleUpsert {
        uuid: None,
        repository_id: "repo-1".into(),
        directory_id: None,
        origin: RuleOrigin::User,
        candidate: RuleCandidate {
            title: "seeded".into(),
            rule: "seeded rule".into(),
            path: source_path.into(),
            source_path: source_path.into(),
            severity: Severity::Medium,
            scope: RuleScope::File,
            examples: Vec::new(),
            source_snippet: None,
        },
    }
}

/// Writes the repository review config directly into the store layout.
fn write_config(store_root: &Path, t: &SyncTarget, body: Value) {
    let dir = store_root.join(&t.organization_and_team_data.organization_id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(format!("{}.config.json", t.repository.id)),
        body.to_string(),
    )
    .unwrap();
}

#[tokio::test]
async fn disabled_org_without_markers_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let t = target();
    write_config(dir.path(), &t, json!({"ruleSyncEnabled": false}));

    let source = FakeSource::default().file("abc123", "CONTRIBUTING.md", "Guidelines.\nBe nice.");
    let runner = CountingRunner::one_rule();
    let store = JsonFileStore::new(dir.path());
    let orch = SyncOrchestrator::new(&source, &runner, &store, &store);

    let report = orch
        .sync_from_changed_files(
            &t,
            &pr_meta(1),
            &[changed("CONTRIBUTING.md", ChangeStatus::Modified)],
        )
        .await
        .unwrap();

    assert!(report.synced.is_empty());
    assert!(report.deleted.is_empty());
    assert_eq!(runner.calls(), 0);
    // No rules file written at all.
    assert!(!dir.path().join("org-1/repo-1.rules.json").exists());
}

#[tokio::test]
async fn force_sync_marker_overrides_disabled_org() {
    let dir = tempfile::tempdir().unwrap();
    let t = target();
    write_config(dir.path(), &t, json!({"ruleSyncEnabled": false}));

    let source = FakeSource::default().file(
        "abc123",
        "CONTRIBUTING.md",
        "<!-- @kody-sync -->\nAlways use snake_case names.",
    );
    let runner = CountingRunner::one_rule();
    let store = JsonFileStore::new(dir.path());
    let orch = SyncOrchestrator::new(&source, &runner, &store, &store);

    let report = orch
        .sync_from_changed_files(
            &t,
            &pr_meta(1),
            &[changed("CONTRIBUTING.md", ChangeStatus::Modified)],
        )
        .await
        .unwrap();

    assert_eq!(report.synced.len(), 1);
    assert_eq!(report.synced[0].source_path, "CONTRIBUTING.md");
    assert_eq!(store.list_active(&t).await.unwrap().len(), 1);
}

#[tokio::test]
async fn removed_rule_file_soft_deletes_without_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let t = target();
    let store = JsonFileStore::new(dir.path());
    let seeded = store
        .create_or_update(&t, seed_rule(".cursor/rules/api.md"))
        .await
        .unwrap();

    let source = FakeSource::default();
    let runner = CountingRunner::one_rule();
    let orch = SyncOrchestrator::new(&source, &runner, &store, &store);

    let report = orch
        .sync_from_changed_files(
            &t,
            &pr_meta(2),
            &[changed(".cursor/rules/api.md", ChangeStatus::Removed)],
        )
        .await
        .unwrap();

    assert_eq!(report.deleted, vec![seeded.uuid]);
    assert_eq!(runner.calls(), 0);
    assert!(store.list_active(&t).await.unwrap().is_empty());
}

#[tokio::test]
async fn ignore_marker_in_tail_deletes_existing_rule() {
    let dir = tempfile::tempdir().unwrap();
    let t = target();
    let store = JsonFileStore::new(dir.path());
    let seeded = store
        .create_or_update(&t, seed_rule("docs/style.mdc"))
        .await
        .unwrap();

    // Long file with the marker only in the last lines: tail window must
    // still catch it.
    let mut lines: Vec<String> = (0..40).map(|i| format!("guideline {i}")).collect();
    lines.push("@kody-ignore".to_string());
    let content = lines.join("\n");

    let source = FakeSource::default().file("abc123", "docs/style.mdc", &content);
    let runner = CountingRunner::one_rule();
    let orch = SyncOrchestrator::new(&source, &runner, &store, &store);

    let report = orch
        .sync_from_changed_files(
            &t,
            &pr_meta(3),
            &[changed("docs/style.mdc", ChangeStatus::Modified)],
        )
        .await
        .unwrap();

    assert_eq!(report.deleted, vec![seeded.uuid]);
    assert!(report.synced.is_empty());
    assert_eq!(runner.calls(), 0);
}

#[tokio::test]
async fn renamed_file_keeps_rule_identity() {
    let dir = tempfile::tempdir().unwrap();
    let t = target();
    let store = JsonFileStore::new(dir.path());
    let seeded = store
        .create_or_update(&t, seed_rule("docs/old.mdc"))
        .await
        .unwrap();

    let source = FakeSource::default().file("abc123", "docs/new.mdc", "Prefer small functions.");
    let runner = CountingRunner::one_rule();
    let orch = SyncOrchestrator::new(&source, &runner, &store, &store);

    let report = orch
        .sync_from_changed_files(
            &t,
            &pr_meta(4),
            &[ChangedFile {
                filename: "docs/new.mdc".into(),
                previous_filename: Some("docs/old.mdc".into()),
                status: ChangeStatus::Renamed,
            }],
        )
        .await
        .unwrap();

    assert_eq!(report.synced.len(), 1);
    assert_eq!(report.synced[0].uuid, seeded.uuid);
    assert_eq!(report.synced[0].source_path, "docs/new.mdc");
    assert_eq!(store.list_active(&t).await.unwrap().len(), 1);
}

#[tokio::test]
async fn full_scan_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let t = target();
    let store = JsonFileStore::new(dir.path());

    let source = FakeSource::default()
        .listed(".cursorrules", 30)
        .listed("src/main.rs", 500)
        .file("main", ".cursorrules", "Use descriptive branch names.");
    let runner = CountingRunner::one_rule();
    let orch = SyncOrchestrator::new(&source, &runner, &store, &store);

    let first = orch.sync_repository_main(&t).await.unwrap();
    let second = orch.sync_repository_main(&t).await.unwrap();

    assert_eq!(first.synced.len(), 1);
    assert_eq!(second.synced.len(), 1);
    assert_eq!(first.synced[0].uuid, second.synced[0].uuid);
    assert_eq!(store.list_active(&t).await.unwrap().len(), 1);
}

#[tokio::test]
async fn full_scan_reconciles_vanished_source_files() {
    let dir = tempfile::tempdir().unwrap();
    let t = target();
    let store = JsonFileStore::new(dir.path());
    let ghost = store
        .create_or_update(&t, seed_rule("ghost.mdc"))
        .await
        .unwrap();

    let source = FakeSource::default()
        .listed(".cursorrules", 30)
        .file("main", ".cursorrules", "Keep PRs small.");
    let runner = CountingRunner::one_rule();
    let orch = SyncOrchestrator::new(&source, &runner, &store, &store);

    let report = orch.sync_repository_main(&t).await.unwrap();

    assert!(report.deleted.contains(&ghost.uuid));
    let active = store.list_active(&t).await.unwrap();
    assert!(active.iter().all(|r| r.source_path != "ghost.mdc"));
}

#[tokio::test]
async fn truncated_listing_never_reconciles_rules_away() {
    let dir = tempfile::tempdir().unwrap();
    let t = target();
    let store = JsonFileStore::new(dir.path());
    // The rule's source file exists in the repository but fell past the
    // listing cap, so it is absent from the (truncated) tree we see.
    let seeded = store
        .create_or_update(&t, seed_rule("zz/.cursor/rules/api.md"))
        .await
        .unwrap();

    let source = FakeSource::default()
        .listed(".cursorrules", 30)
        .truncated()
        .file("main", ".cursorrules", "Keep PRs small.");
    let runner = CountingRunner::one_rule();
    let orch = SyncOrchestrator::new(&source, &runner, &store, &store);

    let report = orch.sync_repository_main(&t).await.unwrap();

    assert!(!report.deleted.contains(&seeded.uuid));
    let active = store.list_active(&t).await.unwrap();
    assert!(active.iter().any(|r| r.uuid == seeded.uuid));
    // Listed rule files still sync normally.
    assert_eq!(report.synced.len(), 1);
}

#[tokio::test]
async fn fast_scan_enforces_count_and_size_caps() {
    let dir = tempfile::tempdir().unwrap();
    let t = target();
    let store = JsonFileStore::new(dir.path());

    let source = FakeSource::default()
        .listed("a.mdc", 10)
        .listed("big.mdc", 5_000)
        .listed("b.mdc", 10)
        .listed("c.mdc", 10)
        .file("main", "a.mdc", "Rule A.")
        .file("main", "b.mdc", "Rule B.")
        .file("main", "c.mdc", "Rule C.");
    let runner = CountingRunner::one_rule();
    let orch = SyncOrchestrator::new(&source, &runner, &store, &store).with_limits(SyncLimits {
        max_files: 2,
        max_file_bytes: 100,
        max_total_bytes: 10_000,
        concurrency: 3,
    });

    let report = orch.sync_repository_main_fast(&t).await.unwrap();

    // big.mdc fails the per-file cap, c.mdc the count cap.
    assert!(report.skipped_files.contains(&"big.mdc".to_string()));
    assert!(report.skipped_files.contains(&"c.mdc".to_string()));
    assert_eq!(report.synced.len(), 1);
}

#[tokio::test]
async fn fast_scan_falls_back_to_manifests_when_rule_files_are_sparse() {
    let dir = tempfile::tempdir().unwrap();
    let t = target();
    let store = JsonFileStore::new(dir.path());

    let source = FakeSource::default()
        .listed(".cursorrules", 20)
        .listed("package.json", 40)
        .listed("Cargo.toml", 40)
        .file("main", ".cursorrules", "Rule file content.")
        .file("main", "package.json", "{\"name\": \"demo\"}")
        .file("main", "Cargo.toml", "[package]\nname = \"demo\"");
    let runner = CountingRunner::one_rule();
    let orch = SyncOrchestrator::new(&source, &runner, &store, &store);

    let report = orch.sync_repository_main_fast(&t).await.unwrap();

    // One batched call for the rule file, one for the manifests.
    assert_eq!(runner.calls(), 2);
    assert_eq!(report.synced.len(), 2);
    let paths: Vec<&str> = report.synced.iter().map(|r| r.source_path.as_str()).collect();
    assert!(paths.contains(&".cursorrules"));
}
