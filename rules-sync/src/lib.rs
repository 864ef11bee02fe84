//! Rule synchronization between repository rule files and the Kody rule
//! store.
//!
//! The crate discovers AI-assistant rule files (`.cursorrules`,
//! `.windsurfrules`, `.kody/rules/**`, contribution guides and the like) in a
//! repository, converts them into structured review rules through an LLM
//! extraction ladder, and keeps the stored rules consistent with the tree:
//! renamed files keep their rule identity, removed or `@kody-ignore`d files
//! get their rule soft-deleted, and `@kody-sync` overrides an org-level
//! disable.
//!
//! Structure:
//! - [`patterns`] — rule-file glob matching;
//! - [`markers`] — `@kody-sync` / `@kody-ignore` head/tail scanning;
//! - [`directories`] — longest-prefix configured-directory resolution;
//! - [`extraction`] — LLM prompts, structured-then-raw fallback, JSON
//!   payload recovery and candidate normalization;
//! - [`sync`] — the three orchestrator workflows;
//! - [`store`] — persistence seams plus a JSON-file implementation;
//! - [`source`] — the repository read seam over `scm_providers`.

pub mod directories;
pub mod errors;
pub mod extraction;
pub mod limits;
pub mod markers;
pub mod patterns;
pub mod source;
pub mod store;
pub mod sync;
pub mod types;

pub use errors::{Error, SyncResult};
pub use limits::SyncLimits;
pub use source::FileSource;
pub use store::{ReviewConfigStore, RuleStore, json_file::JsonFileStore};
pub use sync::{SyncOrchestrator, SyncReport};
pub use types::{
    ChangeStatus, ChangedFile, ConfiguredDirectory, OrganizationAndTeamData, RepositoryRef, Rule,
    RuleCandidate, RuleOrigin, RuleScope, RuleStatus, SyncTarget,
};
