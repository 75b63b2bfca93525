//! Rights statement mirror
//!
//! Inserts registry entries that are not mirrored yet. Existing rows are
//! never updated or deleted.

use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::rights_statements;
use crate::types::{LookupError, RightsRegistry};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Fetching rights statements failed: {0}")]
    Registry(#[from] LookupError),

    #[error(transparent)]
    Store(#[from] avqc_common::Error),
}

/// Returns the external ids inserted by this run, in registry order
pub async fn sync_rights_statements(
    pool: &SqlitePool,
    registry: &dyn RightsRegistry,
) -> Result<Vec<String>, SyncError> {
    let entries = registry.list_available().await?;
    tracing::debug!(count = entries.len(), "Fetched rights statements");

    let mut created = Vec::new();
    for entry in entries {
        if rights_statements::rights_statement_exists(pool, &entry.id).await? {
            continue;
        }
        rights_statements::insert_rights_statement(pool, &entry.id, &entry.title).await?;
        tracing::info!(external_id = %entry.id, title = %entry.title, "Rights statement created");
        created.push(entry.id);
    }

    Ok(created)
}
