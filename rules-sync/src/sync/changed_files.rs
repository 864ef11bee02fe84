//! Incremental sync driven by a PR changed-files event.

use std::collections::HashMap;

use scm_providers::PullRequestMeta;
use tracing::{debug, info};

use crate::errors::SyncResult;
use crate::extraction::{self, RulePromptRunner};
use crate::markers;
use crate::patterns;
use crate::source::FileSource;
use crate::store::{ReviewConfigStore, RuleStore};
use crate::types::{ChangeStatus, ChangedFile, SyncTarget};

use super::{SyncFileError, SyncOrchestrator, SyncReport};

impl<'a, F, R, S, C> SyncOrchestrator<'a, F, R, S, C>
where
    F: FileSource + Sync,
    R: RulePromptRunner + Sync,
    S: RuleStore + Sync,
    C: ReviewConfigStore + Sync,
{
    /// Syncs rules for the files changed in one PR event.
    ///
    /// Files are processed in input order. When org-level sync is disabled
    /// only files carrying the `@kody-sync` marker qualify; if none do the
    /// pass exits without side effects (removed files included, since they
    /// have no content to carry a marker).
    pub async fn sync_from_changed_files(
        &self,
        target: &SyncTarget,
        pr: &PullRequestMeta,
        changed: &[ChangedFile],
    ) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();

        let dirs = self.load_directories(target).await;
        let mut pattern_set = patterns::default_rule_file_patterns();
        pattern_set.extend(patterns::directory_patterns(&dirs));

        let candidates: Vec<&ChangedFile> = changed
            .iter()
            .filter(|f| patterns::matches_any_ci(&f.filename, &pattern_set))
            .collect();
        if candidates.is_empty() {
            debug!(repository = %target.repository.id, "no rule files in change list");
            return Ok(report);
        }

        let Some(sync_enabled) = self.sync_enabled(target).await else {
            return Ok(report);
        };

        // Branch fallback chain: PR head → PR base → repository default
        // branch (source branches are often deleted right after merge).
        let refs = self.pr_ref_chain(target, pr).await;

        // With sync disabled, prefetch content and keep only force-sync
        // files. Contents are cached so qualifying files are not re-fetched.
        let mut content_cache: HashMap<String, String> = HashMap::new();
        let qualifying: Vec<&ChangedFile> = if sync_enabled {
            candidates
        } else {
            let mut forced = Vec::new();
            for file in candidates {
                if file.status == ChangeStatus::Removed {
                    continue;
                }
                if let Some(content) =
                    self.fetch_content_chain(target, &file.filename, &refs).await
                {
                    if markers::should_force_sync(&content) {
                        content_cache.insert(file.filename.clone(), content);
                        forced.push(file);
                    }
                }
            }
            if forced.is_empty() {
                info!(
                    repository = %target.repository.id,
                    "sync disabled and no force-sync markers, exiting without side effects"
                );
                return Ok(report);
            }
            forced
        };

        for file in qualifying {
            if let Err(e) = self
                .process_changed_file(target, &dirs, file, &refs, &mut content_cache, &mut report)
                .await
            {
                report.errors.push(SyncFileError {
                    path: file.filename.clone(),
                    reason: e.to_string(),
                });
            }
        }

        info!(
            repository = %target.repository.id,
            synced = report.synced.len(),
            deleted = report.deleted.len(),
            skipped = report.skipped_files.len(),
            errors = report.errors.len(),
            "changed-files sync pass finished"
        );
        Ok(report)
    }

    /// Resolves the ref chain for content reads during a PR-event pass.
    async fn pr_ref_chain(&self, target: &SyncTarget, pr: &PullRequestMeta) -> Vec<String> {
        let mut refs = Vec::new();
        if let Some(head) = pr.head_sha.clone().or_else(|| pr.head_ref.clone()) {
            refs.push(head);
        }
        if let Some(base) = pr.base_ref.clone() {
            refs.push(base);
        }
        let default = match target.repository.default_branch.clone() {
            Some(b) => Some(b),
            None => self.source.default_branch(&target.repository).await.ok(),
        };
        if let Some(branch) = default {
            if !refs.contains(&branch) {
                refs.push(branch);
            }
        }
        refs
    }

    async fn process_changed_file(
        &self,
        target: &SyncTarget,
        dirs: &[crate::types::ConfiguredDirectory],
        file: &ChangedFile,
        refs: &[String],
        content_cache: &mut HashMap<String, String>,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        if file.status == ChangeStatus::Removed {
            if let Some(uuid) = self
                .delete_rule_by_source_path(target, &file.filename)
                .await?
            {
                report.deleted.push(uuid);
            }
            return Ok(());
        }

        let content = match content_cache.remove(&file.filename) {
            Some(c) => c,
            None => match self.fetch_content_chain(target, &file.filename, refs).await {
                Some(c) => c,
                None => {
                    report.skipped_files.push(file.filename.clone());
                    return Ok(());
                }
            },
        };

        if markers::should_ignore(&content) {
            if let Some(uuid) = self
                .delete_rule_by_source_path(target, &file.filename)
                .await?
            {
                report.deleted.push(uuid);
            }
            debug!(path = %file.filename, "ignore marker present, file excluded");
            return Ok(());
        }

        let candidates =
            extraction::convert_file_to_rules(self.runner, &file.filename, &content).await;
        if candidates.is_empty() {
            report.skipped_files.push(file.filename.clone());
            return Ok(());
        }

        // Renamed files keep their rule: look up under the pre-rename path.
        let lookup_path = match file.status {
            ChangeStatus::Renamed => file
                .previous_filename
                .as_deref()
                .unwrap_or(&file.filename),
            _ => &file.filename,
        };

        for candidate in candidates {
            let rule = self
                .upsert_candidate(target, dirs, candidate, lookup_path)
                .await?;
            report.synced.push(rule);
        }
        Ok(())
    }
}
