//! Persistence seams for the sync orchestrator.
//!
//! Traits use native async fns and are consumed generically (no `async_trait`
//! macro, no `Box<dyn ...>`): production wires the JSON-file store, tests
//! wire in-memory fakes.

pub mod json_file;

use uuid::Uuid;

use crate::errors::SyncResult;
use crate::types::{
    ConfiguredDirectory, Rule, RuleCandidate, RuleOrigin, SyncTarget,
};

/// Payload for a create-or-update write.
///
/// `uuid` set means "update that rule in place"; unset means the store decides
/// based on its own `(repository_id, source_path, active)` key, so two racing
/// passes converge on one active rule per source path instead of duplicating.
#[derive(Debug, Clone)]
pub struct RuleUpsert {
    pub uuid: Option<Uuid>,
    pub repository_id: String,
    pub directory_id: Option<String>,
    pub origin: RuleOrigin,
    pub candidate: RuleCandidate,
}

/// CRUD persistence for rules, keyed by organization/repository/source-path.
pub trait RuleStore {
    /// Creates a new rule or replaces the active rule matching the upsert key.
    fn create_or_update(
        &self,
        target: &SyncTarget,
        dto: RuleUpsert,
    ) -> impl Future<Output = SyncResult<Rule>> + Send;

    /// Finds the active rule for `source_path`, if any.
    fn find_active_by_source_path(
        &self,
        target: &SyncTarget,
        source_path: &str,
    ) -> impl Future<Output = SyncResult<Option<Rule>>> + Send;

    /// Lists all active rules of the repository.
    fn list_active(
        &self,
        target: &SyncTarget,
    ) -> impl Future<Output = SyncResult<Vec<Rule>>> + Send;

    /// Soft-deletes a rule (status flips to deleted, history preserved).
    fn delete_logically(
        &self,
        target: &SyncTarget,
        rule_uuid: Uuid,
    ) -> impl Future<Output = SyncResult<Option<Rule>>> + Send;
}

/// Review-configuration collaborator: sync policy, configured directories and
/// the idempotent consistency-repair "touch".
pub trait ReviewConfigStore {
    /// Org-level rule-sync flag; when false only force-sync files pass.
    fn is_rule_sync_enabled(
        &self,
        target: &SyncTarget,
    ) -> impl Future<Output = SyncResult<bool>> + Send;

    /// Configured sub-directories of the repository (may be empty).
    fn configured_directories(
        &self,
        target: &SyncTarget,
    ) -> impl Future<Output = SyncResult<Vec<ConfiguredDirectory>>> + Send;

    /// Idempotent no-op write ensuring the repository's review-configuration
    /// record exists. Called after every successful rule upsert.
    fn update_or_create_parameter(
        &self,
        target: &SyncTarget,
    ) -> impl Future<Output = SyncResult<()>> + Send;
}
