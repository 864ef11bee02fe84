//! Resource caps for the fast-batch onboarding path.

/// Caps applied before and during content download in
/// `sync_repository_main_fast`. All three size caps apply simultaneously.
#[derive(Debug, Clone)]
pub struct SyncLimits {
    /// Max number of rule files processed per pass.
    pub max_files: usize,
    /// Max per-file byte size (checked against listing metadata when the
    /// provider reports sizes, otherwise after fetch).
    pub max_file_bytes: u64,
    /// Max aggregate byte budget across all selected files.
    pub max_total_bytes: u64,
    /// Worker pool size for content fetches, clamped to [1, 10].
    pub concurrency: usize,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            max_files: 50,
            max_file_bytes: 96 * 1024,
            max_total_bytes: 768 * 1024,
            concurrency: 4,
        }
    }
}

impl SyncLimits {
    /// Reads `KODY_SYNC_MAX_FILES`, `KODY_SYNC_MAX_FILE_BYTES`,
    /// `KODY_SYNC_MAX_TOTAL_BYTES` and `KODY_SYNC_CONCURRENCY`, falling back
    /// to defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        fn read<T: std::str::FromStr>(var: &str) -> Option<T> {
            std::env::var(var).ok().and_then(|s| s.parse().ok())
        }
        let d = Self::default();
        Self {
            max_files: read("KODY_SYNC_MAX_FILES").unwrap_or(d.max_files),
            max_file_bytes: read("KODY_SYNC_MAX_FILE_BYTES").unwrap_or(d.max_file_bytes),
            max_total_bytes: read("KODY_SYNC_MAX_TOTAL_BYTES").unwrap_or(d.max_total_bytes),
            concurrency: read("KODY_SYNC_CONCURRENCY").unwrap_or(d.concurrency),
        }
        .clamped()
    }

    /// Clamps the worker count into [1, 10].
    pub fn clamped(mut self) -> Self {
        self.concurrency = self.concurrency.clamp(1, 10);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_is_clamped() {
        let limits = SyncLimits {
            concurrency: 0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(limits.concurrency, 1);

        let limits = SyncLimits {
            concurrency: 64,
            ..Default::default()
        }
        .clamped();
        assert_eq!(limits.concurrency, 10);
    }
}
