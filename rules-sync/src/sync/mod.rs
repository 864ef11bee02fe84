//! Sync orchestrator: the top-level workflows converting repository rule
//! files into persisted Kody rules.
//!
//! Per-file lifecycle within one pass:
//! `discovered → (pattern-filtered-out | gated | removed→rule-deleted) →
//! content-fetched → (ignore-marker→rule-deleted) → extracted →
//! (no-candidate→skipped) → directory-resolved → upserted`.
//! Terminal states map onto the [`SyncReport`] buckets; no state is revisited
//! within a pass, and cross-pass idempotency comes from the
//! `(repository_id, source_path)` upsert key.
//!
//! Entry points (all on [`SyncOrchestrator`]):
//! - [`SyncOrchestrator::sync_from_changed_files`] — incremental, PR-event driven;
//! - [`SyncOrchestrator::sync_repository_main`] — full scan (onboarding/rescan);
//! - [`SyncOrchestrator::sync_repository_main_fast`] — capped, batched
//!   onboarding scan with a bounded worker pool.

mod changed_files;
mod fast_batch;
mod repository;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::directories::resolve_directory;
use crate::errors::SyncResult;
use crate::extraction::RulePromptRunner;
use crate::limits::SyncLimits;
use crate::source::FileSource;
use crate::store::{ReviewConfigStore, RuleStore, RuleUpsert};
use crate::types::{
    ConfiguredDirectory, Rule, RuleCandidate, RuleOrigin, SyncTarget,
};

/// Outcome of one sync pass. Errors are per-file and never abort the pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Rules created or updated this pass.
    pub synced: Vec<Rule>,
    /// Rules soft-deleted this pass (ignore markers, removed files).
    pub deleted: Vec<Uuid>,
    /// Files seen but not synced (gated, unreadable, no candidate, over caps).
    pub skipped_files: Vec<String>,
    /// Per-file failures recorded without aborting the others.
    pub errors: Vec<SyncFileError>,
}

/// One recorded per-file failure.
#[derive(Debug, Clone)]
pub struct SyncFileError {
    pub path: String,
    pub reason: String,
}

/// Top-level workflow over the four collaborator seams.
///
/// Holds only borrowed collaborators and per-pass limits; all mutable state
/// lives in the stores. Nothing here is shared across passes.
pub struct SyncOrchestrator<'a, F, R, S, C> {
    pub(crate) source: &'a F,
    pub(crate) runner: &'a R,
    pub(crate) rules: &'a S,
    pub(crate) config: &'a C,
    pub(crate) limits: SyncLimits,
}

/// Full-scan listing cap; generous because rule files are filtered client-side.
pub(crate) const FULL_SCAN_MAX_FILES: usize = 10_000;

/// Below this many discovered rule files, the fast path falls back to
/// dependency manifests.
pub(crate) const MANIFEST_FALLBACK_THRESHOLD: usize = 6;

impl<'a, F, R, S, C> SyncOrchestrator<'a, F, R, S, C>
where
    F: FileSource + Sync,
    R: RulePromptRunner + Sync,
    S: RuleStore + Sync,
    C: ReviewConfigStore + Sync,
{
    pub fn new(source: &'a F, runner: &'a R, rules: &'a S, config: &'a C) -> Self {
        Self {
            source,
            runner,
            rules,
            config,
            limits: SyncLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SyncLimits) -> Self {
        self.limits = limits.clamped();
        self
    }

    /// Loads configured directories; a missing/broken config degrades to an
    /// empty list with a warning, never an error.
    pub(crate) async fn load_directories(&self, target: &SyncTarget) -> Vec<ConfiguredDirectory> {
        match self.config.configured_directories(target).await {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!(
                    repository = %target.repository.id,
                    error = %e,
                    "could not load configured directories, using repository root scope"
                );
                Vec::new()
            }
        }
    }

    /// Reads the org-level sync flag. `None` means the config store failed,
    /// which short-circuits the pass upstream.
    pub(crate) async fn sync_enabled(&self, target: &SyncTarget) -> Option<bool> {
        match self.config.is_rule_sync_enabled(target).await {
            Ok(flag) => Some(flag),
            Err(e) => {
                warn!(
                    repository = %target.repository.id,
                    error = %e,
                    "could not read rule-sync flag, skipping pass"
                );
                None
            }
        }
    }

    /// Tries each git ref in order; unreadable refs are logged and skipped so
    /// a deleted source branch falls through to base/default.
    pub(crate) async fn fetch_content_chain(
        &self,
        target: &SyncTarget,
        path: &str,
        refs: &[String],
    ) -> Option<String> {
        for git_ref in refs {
            match self.source.read_file(&target.repository, path, git_ref).await {
                Ok(Some(content)) => return Some(content),
                Ok(None) => {
                    debug!(path, git_ref, "file absent at ref, trying next");
                }
                Err(e) => {
                    warn!(path, git_ref, error = %e, "content read failed, trying next ref");
                }
            }
        }
        None
    }

    /// Soft-deletes the active rule for `source_path`, if one exists.
    pub(crate) async fn delete_rule_by_source_path(
        &self,
        target: &SyncTarget,
        source_path: &str,
    ) -> SyncResult<Option<Uuid>> {
        let Some(existing) = self
            .rules
            .find_active_by_source_path(target, source_path)
            .await?
        else {
            return Ok(None);
        };
        self.rules.delete_logically(target, existing.uuid).await?;
        debug!(source_path, rule = %existing.uuid, "rule soft-deleted");
        Ok(Some(existing.uuid))
    }

    /// Upserts one candidate: looks up the active rule under `lookup_path`
    /// (the pre-rename path for renamed files), writes through the store, and
    /// touches the review-configuration record on success.
    pub(crate) async fn upsert_candidate(
        &self,
        target: &SyncTarget,
        dirs: &[ConfiguredDirectory],
        candidate: RuleCandidate,
        lookup_path: &str,
    ) -> SyncResult<Rule> {
        let existing = self
            .rules
            .find_active_by_source_path(target, lookup_path)
            .await?;
        let directory_id = resolve_directory(dirs, &candidate.path).map(|d| d.id.clone());

        let rule = self
            .rules
            .create_or_update(
                target,
                RuleUpsert {
                    uuid: existing.map(|r| r.uuid),
                    repository_id: target.repository.id.clone(),
                    directory_id,
                    origin: RuleOrigin::User,
                    candidate,
                },
            )
            .await?;

        // Consistency repair for the configuration store; failures must not
        // undo a successful upsert.
        if let Err(e) = self.config.update_or_create_parameter(target).await {
            warn!(repository = %target.repository.id, error = %e, "review-config touch failed");
        }
        Ok(rule)
    }
}
