//! 手动触发保留期清理

use std::sync::Arc;

use colored::Colorize;
use serde_json::json;

use crate::analytics::RetentionTask;
use crate::interfaces::cli::CliError;
use crate::services::{Actor, AuditAction, AuditService};
use crate::storage::SeaOrmStorage;

pub async fn run_purge(storage: Arc<SeaOrmStorage>, retention_days: u64) -> Result<(), CliError> {
    if retention_days == 0 {
        return Err(CliError::CommandError(
            "Retention is disabled (retention_days = 0), pass --days to purge".to_string(),
        ));
    }

    let report = RetentionTask::new(storage.clone(), retention_days)
        .run_cleanup()
        .await?;

    AuditService::new(storage)
        .log(
            &Actor::system(),
            AuditAction::DataPurged,
            None,
            Some(json!({
                "events_deleted": report.events_deleted,
                "campaigns_deleted": report.campaigns_deleted,
                "retention_days": report.retention_days,
                "source": "cli",
            })),
        )
        .await;

    println!(
        "{} Purged {} events and {} completed campaigns older than {} days",
        "✓".green().bold(),
        report.events_deleted.to_string().cyan(),
        report.campaigns_deleted.to_string().cyan(),
        report.retention_days
    );
    Ok(())
}
