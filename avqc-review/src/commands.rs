//! Periodic task runners
//!
//! Each runner does one task and returns the one-line summary the binary
//! logs on success. Errors returned here are fatal for the task.

use avqc_common::Config;
use sqlx::SqlitePool;

use crate::services::{
    check_qc_status, send_startup_message, sync_rights_statements, DiscoveryProcess, Notifier,
};
use crate::types::RightsRegistry;

/// discover-packages
pub async fn discover_packages(discovery: &DiscoveryProcess) -> anyhow::Result<String> {
    let created = discovery.discover().await?;
    Ok(discovery_summary(&created))
}

/// check-qc-status
pub async fn check_status(config: &Config, notifier: &Notifier) -> anyhow::Result<String> {
    check_qc_status(config, notifier).await?;
    Ok("Status check complete".to_string())
}

/// fetch-rights-statements
pub async fn fetch_rights_statements(
    config: &Config,
    pool: &SqlitePool,
    registry: &dyn RightsRegistry,
) -> anyhow::Result<String> {
    config.require_storage_root()?;
    let created = sync_rights_statements(pool, registry).await?;
    Ok(rights_summary(&created))
}

/// send-startup-message
pub async fn startup_message(config: &Config, notifier: &Notifier) -> anyhow::Result<String> {
    send_startup_message(config, notifier).await?;
    Ok("Startup message sent".to_string())
}

pub fn discovery_summary(created: &[String]) -> String {
    if created.is_empty() {
        "No new packages to discover.".to_string()
    } else {
        format!("Packages created: {}", created.join(", "))
    }
}

pub fn rights_summary(created: &[String]) -> String {
    if created.is_empty() {
        "No new rights statements.".to_string()
    } else {
        format!("Rights statements created: {}", created.join(", "))
    }
}
