use std::error::Error;

use llm_runner::PromptChain;
use rules_sync::{
    JsonFileStore, OrganizationAndTeamData, RepositoryRef, SyncLimits, SyncOrchestrator,
    SyncTarget,
};
use scm_providers::{ProviderClient, ProviderConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file, if one exists.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,rules_sync=debug"))?;
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let source = ProviderClient::from_config(ProviderConfig::from_env()?)?;
    let runner = PromptChain::from_env();
    let store = JsonFileStore::from_env();

    let target = SyncTarget {
        organization_and_team_data: OrganizationAndTeamData {
            organization_id: std::env::var("KODY_ORGANIZATION_ID")?,
            team_id: std::env::var("KODY_TEAM_ID").ok(),
        },
        repository: RepositoryRef {
            id: std::env::var("KODY_REPOSITORY_ID")?,
            name: std::env::var("KODY_REPOSITORY_NAME")?,
            full_name: std::env::var("KODY_REPOSITORY_FULL_NAME").ok(),
            default_branch: std::env::var("KODY_REPOSITORY_BRANCH").ok(),
        },
    };

    let orchestrator = SyncOrchestrator::new(&source, &runner, &store, &store)
        .with_limits(SyncLimits::from_env());
    let report = orchestrator.sync_repository_main_fast(&target).await?;

    info!(
        synced = report.synced.len(),
        deleted = report.deleted.len(),
        skipped = report.skipped_files.len(),
        errors = report.errors.len(),
        "rule sync finished"
    );
    for err in &report.errors {
        tracing::warn!(path = %err.path, reason = %err.reason, "file failed during sync");
    }

    Ok(())
}
