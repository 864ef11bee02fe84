//! Fast onboarding scan: capped selection, bounded worker pool, batched
//! LLM extraction.
//!
//! Three caps apply simultaneously before any content download: file count,
//! per-file byte size (from listing metadata where the provider reports it)
//! and an aggregate byte budget. Remaining candidates are fetched by a small
//! worker pool sharing one queue index, so fast workers pick up more items
//! than slow ones; completions may land out of input order.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::SyncResult;
use crate::extraction::{self, RulePromptRunner};
use crate::markers;
use crate::patterns;
use crate::source::FileSource;
use crate::store::{ReviewConfigStore, RuleStore};
use crate::types::{ConfiguredDirectory, FileCandidate, SyncTarget};

use super::{
    FULL_SCAN_MAX_FILES, MANIFEST_FALLBACK_THRESHOLD, SyncFileError, SyncOrchestrator, SyncReport,
};

/// Files per batched LLM call on the fast path.
const FILES_PER_BATCH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueKind {
    RuleFile,
    Manifest,
}

struct QueueItem {
    path: String,
    kind: QueueKind,
}

/// Per-worker accumulator, merged after the pool drains the queue.
#[derive(Default)]
struct WorkerOutput {
    rule_candidates: Vec<FileCandidate>,
    manifest_candidates: Vec<FileCandidate>,
    skipped: Vec<String>,
    deleted: Vec<Uuid>,
    errors: Vec<SyncFileError>,
}

impl<'a, F, R, S, C> SyncOrchestrator<'a, F, R, S, C>
where
    F: FileSource + Sync,
    R: RulePromptRunner + Sync,
    S: RuleStore + Sync,
    C: ReviewConfigStore + Sync,
{
    /// Capped, batched variant of the full scan for onboarding.
    pub async fn sync_repository_main_fast(&self, target: &SyncTarget) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();
        let limits = &self.limits;

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

        // Cap selection using listing metadata only; nothing is fetched yet.
        let mut queue: Vec<QueueItem> = Vec::new();
        let mut total_bytes: u64 = 0;
        for file in &listing.files {
            if !patterns::matches_any_ci(&file.path, &pattern_set) {
                continue;
            }
            if queue.len() >= limits.max_files {
                report.skipped_files.push(file.path.clone());
                continue;
            }
            if let Some(size) = file.size {
                if size > limits.max_file_bytes {
                    debug!(path = %file.path, size, "file over per-file cap, skipped pre-fetch");
                    report.skipped_files.push(file.path.clone());
                    continue;
                }
                if total_bytes + size > limits.max_total_bytes {
                    report.skipped_files.push(file.path.clone());
                    continue;
                }
                total_bytes += size;
            }
            queue.push(QueueItem {
                path: file.path.clone(),
                kind: QueueKind::RuleFile,
            });
        }

        // Sparse repositories: fall back to dependency manifests and infer
        // stack rules from them instead.
        let rule_file_count = queue.len();
        if rule_file_count < MANIFEST_FALLBACK_THRESHOLD {
            for file in &listing.files {
                if !patterns::is_manifest_file(&file.path) {
                    continue;
                }
                if let Some(size) = file.size {
                    if size > limits.max_file_bytes {
                        continue;
                    }
                }
                queue.push(QueueItem {
                    path: file.path.clone(),
                    kind: QueueKind::Manifest,
                });
            }
            debug!(
                rule_files = rule_file_count,
                manifests = queue.len() - rule_file_count,
                "few rule files found, manifest fallback engaged"
            );
        }

        if queue.is_empty() {
            return Ok(report);
        }

        // Bounded worker pool over a shared queue index.
        let next = AtomicUsize::new(0);
        let workers = (0..limits.concurrency).map(|_| {
            let next = &next;
            let queue = &queue;
            let branch = branch.as_str();
            async move {
                let mut out = WorkerOutput::default();
                loop {
                    let i = next.fetch_add(1, Ordering::SeqCst);
                    let Some(item) = queue.get(i) else { break };
                    self.fast_process_item(target, item, branch, sync_enabled, &mut out)
                        .await;
                }
                out
            }
        });
        let outputs = join_all(workers).await;

        let mut rule_candidates = Vec::new();
        let mut manifest_candidates = Vec::new();
        for out in outputs {
            rule_candidates.extend(out.rule_candidates);
            manifest_candidates.extend(out.manifest_candidates);
            report.skipped_files.extend(out.skipped);
            report.deleted.extend(out.deleted);
            report.errors.extend(out.errors);
        }

        // Batched extraction, then the usual upsert path per candidate rule.
        for chunk in rule_candidates.chunks(FILES_PER_BATCH) {
            let files: Vec<(String, String)> = chunk
                .iter()
                .map(|c| (c.path.clone(), c.content.clone()))
                .collect();
            let extracted =
                extraction::convert_files_to_rules_fast_batch(self.runner, &files).await;
            self.upsert_extracted(target, &dirs, extracted, &mut report).await;
        }
        if !manifest_candidates.is_empty() {
            let files: Vec<(String, String)> = manifest_candidates
                .iter()
                .map(|c| (c.path.clone(), c.content.clone()))
                .collect();
            let extracted =
                extraction::convert_manifest_files_to_rules(self.runner, &files).await;
            self.upsert_extracted(target, &dirs, extracted, &mut report).await;
        }

        info!(
            repository = %target.repository.id,
            synced = report.synced.len(),
            deleted = report.deleted.len(),
            skipped = report.skipped_files.len(),
            errors = report.errors.len(),
            "fast sync pass finished"
        );
        Ok(report)
    }

    /// Fetch + marker/gating checks for one queue item. Failures are
    /// recorded locally; other items are unaffected.
    async fn fast_process_item(
        &self,
        target: &SyncTarget,
        item: &QueueItem,
        branch: &str,
        sync_enabled: bool,
        out: &mut WorkerOutput,
    ) {
        let content = match self
            .source
            .read_file(&target.repository, &item.path, branch)
            .await
        {
            Ok(Some(content)) => content,
            Ok(None) => {
                out.skipped.push(item.path.clone());
                return;
            }
            Err(e) => {
                out.errors.push(SyncFileError {
                    path: item.path.clone(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        // Providers without listing sizes get the per-file cap applied here.
        if content.len() as u64 > self.limits.max_file_bytes {
            out.skipped.push(item.path.clone());
            return;
        }

        if !sync_enabled && !markers::should_force_sync(&content) {
            out.skipped.push(item.path.clone());
            return;
        }

        if markers::should_ignore(&content) {
            match self.delete_rule_by_source_path(target, &item.path).await {
                Ok(Some(uuid)) => out.deleted.push(uuid),
                Ok(None) => {}
                Err(e) => out.errors.push(SyncFileError {
                    path: item.path.clone(),
                    reason: e.to_string(),
                }),
            }
            return;
        }

        let candidate = FileCandidate {
            path: item.path.clone(),
            content,
        };
        match item.kind {
            QueueKind::RuleFile => out.rule_candidates.push(candidate),
            QueueKind::Manifest => out.manifest_candidates.push(candidate),
        }
    }

    /// Upserts a batch-extraction result; per-rule failures are recorded.
    async fn upsert_extracted(
        &self,
        target: &SyncTarget,
        dirs: &[ConfiguredDirectory],
        extracted: Vec<crate::types::RuleCandidate>,
        report: &mut SyncReport,
    ) {
        for candidate in extracted {
            let lookup_path = candidate.source_path.clone();
            match self
                .upsert_candidate(target, dirs, candidate, &lookup_path)
                .await
            {
                Ok(rule) => report.synced.push(rule),
                Err(e) => report.errors.push(SyncFileError {
                    path: lookup_path,
                    reason: e.to_string(),
                }),
            }
        }
    }
}
