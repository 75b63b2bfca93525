//! Periodic queue status events

use avqc_common::{Config, Result};

use crate::services::notifier::Notifier;

/// Send COMPLETE if the storage root holds no entries.
///
/// Returns whether the queue was empty. A missing storage root is fatal.
pub async fn check_qc_status(config: &Config, notifier: &Notifier) -> Result<bool> {
    let root = config.require_storage_root()?;

    let empty = std::fs::read_dir(root)?.next().is_none();
    if empty {
        tracing::info!(storage_root = %root.display(), "Storage root is empty");
        notifier.qc_complete().await;
    } else {
        tracing::debug!(storage_root = %root.display(), "Packages still waiting for QC");
    }

    Ok(empty)
}

/// Announce that packages are waiting for review
pub async fn send_startup_message(config: &Config, notifier: &Notifier) -> Result<()> {
    config.require_storage_root()?;
    notifier.packages_waiting().await;
    Ok(())
}
