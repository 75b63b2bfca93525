//! Package discovery
//!
//! Turns storage-root entries into PENDING package records. Each entry is
//! processed on its own: a failure is reported through the notifier and
//! the pass moves on to the next entry.

use avqc_common::models::NewPackage;
use avqc_common::{Config, ProcessStatus};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::db::packages;
use crate::services::media_probe::{classify_package, technical_summary};
use crate::services::notifier::Notifier;
use crate::types::{LookupError, MediaProbe, MetadataLookup, ProbeError};

/// Why one entry could not be turned into a package
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("{0}")]
    Lookup(#[from] LookupError),

    #[error("Unable to determine type of package {0}")]
    UnknownType(String),

    #[error("{0}")]
    Probe(#[from] ProbeError),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] avqc_common::Error),
}

/// Discovery pass over the storage root
pub struct DiscoveryProcess {
    pool: SqlitePool,
    config: Arc<Config>,
    lookup: Arc<dyn MetadataLookup>,
    probe: Arc<dyn MediaProbe>,
    notifier: Notifier,
}

impl DiscoveryProcess {
    pub fn new(
        pool: SqlitePool,
        config: Arc<Config>,
        lookup: Arc<dyn MetadataLookup>,
        probe: Arc<dyn MediaProbe>,
        notifier: Notifier,
    ) -> Self {
        Self {
            pool,
            config,
            lookup,
            probe,
            notifier,
        }
    }

    /// Create a PENDING package for every entry without one.
    ///
    /// Returns the refids created by this pass. Only a missing storage root
    /// or an unreadable directory listing is returned as an error.
    pub async fn discover(&self) -> avqc_common::Result<Vec<String>> {
        let root = self.config.require_storage_root()?;
        let mut created = Vec::new();

        for entry in sorted_entries(root)? {
            let Some(refid) = refid_of(&entry) else {
                tracing::warn!(
                    entry = %entry.display(),
                    "Skipping entry whose name is not a bare refid"
                );
                continue;
            };

            if packages::exists_with_status(&self.pool, &refid, ProcessStatus::Pending).await? {
                tracing::debug!(refid = %refid, "Package already pending, skipping");
                continue;
            }

            match self.discover_one(&entry, &refid).await {
                Ok(()) => created.push(refid),
                Err(e) => {
                    tracing::error!(refid = %refid, error = %e, "Error discovering package");
                    self.notifier.discovery_failed(&refid, &e.to_string()).await;
                }
            }
        }

        Ok(created)
    }

    async fn discover_one(&self, entry: &Path, refid: &str) -> Result<(), PackageError> {
        let metadata = self.lookup.lookup(refid).await?;

        let package_type = classify_package(entry, refid)
            .ok_or_else(|| PackageError::UnknownType(refid.to_string()))?;

        let summary = technical_summary(self.probe.as_ref(), entry, package_type).await?;

        let possible_duplicate =
            packages::exists_with_status(&self.pool, refid, ProcessStatus::Approved).await?;

        let package = packages::insert_package(
            &self.pool,
            &NewPackage {
                refid: refid.to_string(),
                metadata,
                package_type,
                summary,
                possible_duplicate,
            },
        )
        .await?;

        tracing::info!(
            refid = %refid,
            package_id = package.id,
            package_type = %package_type,
            possible_duplicate,
            "Package discovered"
        );
        Ok(())
    }
}

/// Direct children of the storage root in name order
fn sorted_entries(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(root)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/// refid of a storage-root entry.
///
/// Approval and rejection address a package as `<storage_root>/<refid>`, so
/// an entry whose name carries an extension has no usable refid.
pub fn refid_of(entry: &Path) -> Option<String> {
    let name = entry.file_name()?.to_str()?;
    let stem = entry.file_stem()?.to_str()?;
    (!stem.is_empty() && stem == name).then(|| name.to_string())
}
