//! Full-repository scan: onboarding and periodic resync.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::errors::SyncResult;
use crate::extraction::{self, RulePromptRunner};
use crate::markers;
use crate::patterns;
use crate::source::FileSource;
use crate::store::{ReviewConfigStore, RuleStore};
use crate::types::{RuleOrigin, SyncTarget};

use super::{FULL_SCAN_MAX_FILES, SyncFileError, SyncOrchestrator, SyncReport};

impl<'a, F, R, S, C> SyncOrchestrator<'a, F, R, S, C>
where
    F: FileSource + Sync,
    R: RulePromptRunner + Sync,
    S: RuleStore + Sync,
    C: ReviewConfigStore + Sync,
{
    /// Scans the whole repository tree at the default branch head and syncs
    /// every rule file, then reconciles rules whose source files vanished.
    ///
    /// Running this twice on an unchanged tree is a no-op for rule identity:
    /// the second pass resolves every upsert to an update of the existing
    /// rule via the `(repository_id, source_path)` key.
    pub async fn sync_repository_main(&self, target: &SyncTarget) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();

        let dirs = self.load_directories(target).await;
        let mut pattern_set = patterns::default_rule_file_patterns();
        pattern_set.extend(patterns::directory_patterns(&dirs));

        let Some(sync_enabled) = self.sync_enabled(target).await else {
            return Ok(report);
        };

        let branch = match target.repository.default_branch.clone() {
            Some(b) => b,
            None => self.source.default_branch(&target.repository).await?,
        };

        let listing = self
            .source
            .list_files(&target.repository, &branch, FULL_SCAN_MAX_FILES)
            .await?;
        let rule_files: Vec<&str> = listing
            .files
            .iter()
            .map(|f| f.path.as_str())
            .filter(|p| patterns::matches_any_ci(p, &pattern_set))
            .collect();
        debug!(
            repository = %target.repository.id,
            branch = %branch,
            total = listing.files.len(),
            truncated = listing.truncated,
            rule_files = rule_files.len(),
            "full scan listing complete"
        );

        for path in &rule_files {
            if let Err(e) = self
                .process_listed_file(target, &dirs, path, &branch, sync_enabled, &mut report)
                .await
            {
                report.errors.push(SyncFileError {
                    path: path.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        // Reconciliation: a rule whose source file left the tree is
        // soft-deleted, never hard-deleted. Only when sync is enabled;
        // a disabled org keeps its rules untouched. A truncated listing
        // cannot prove a file is gone, so reconciliation is skipped then.
        if listing.truncated {
            warn!(
                repository = %target.repository.id,
                "listing truncated, skipping vanished-source reconciliation"
            );
        } else if sync_enabled {
            let tree: HashSet<&str> = listing.files.iter().map(|f| f.path.as_str()).collect();
            for rule in self.rules.list_active(target).await? {
                if rule.origin == RuleOrigin::User && !tree.contains(rule.source_path.as_str()) {
                    self.rules.delete_logically(target, rule.uuid).await?;
                    report.deleted.push(rule.uuid);
                    debug!(
                        source_path = %rule.source_path,
                        rule = %rule.uuid,
                        "source file gone, rule soft-deleted"
                    );
                }
            }
        }

        info!(
            repository = %target.repository.id,
            synced = report.synced.len(),
            deleted = report.deleted.len(),
            skipped = report.skipped_files.len(),
            errors = report.errors.len(),
            "full-scan sync pass finished"
        );
        Ok(report)
    }

    async fn process_listed_file(
        &self,
        target: &SyncTarget,
        dirs: &[crate::types::ConfiguredDirectory],
        path: &str,
        branch: &str,
        sync_enabled: bool,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        let Some(content) = self
            .source
            .read_file(&target.repository, path, branch)
            .await?
        else {
            report.skipped_files.push(path.to_string());
            return Ok(());
        };

        if !sync_enabled && !markers::should_force_sync(&content) {
            report.skipped_files.push(path.to_string());
            return Ok(());
        }

        if markers::should_ignore(&content) {
            if let Some(uuid) = self.delete_rule_by_source_path(target, path).await? {
                report.deleted.push(uuid);
            }
            return Ok(());
        }

        let candidates = extraction::convert_file_to_rules(self.runner, path, &content).await;
        if candidates.is_empty() {
            report.skipped_files.push(path.to_string());
            return Ok(());
        }

        for candidate in candidates {
            let rule = self.upsert_candidate(target, dirs, candidate, path).await?;
            report.synced.push(rule);
        }
        Ok(())
    }
}
