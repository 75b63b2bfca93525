//! Reviewer decisions on packages
//!
//! Each transition runs package by package. For approve and reject the
//! per-package order is side effect, then notification, then record update,
//! so a package is never marked APPROVED unless its files were moved. A
//! failing package is reported and skipped; the rest of the batch continues.

use avqc_common::models::Package;
use avqc_common::{Config, ProcessStatus};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::db::packages;
use crate::services::notifier::Notifier;
use crate::types::MetadataLookup;

/// Outcome of one batch transition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionReport {
    pub succeeded: Vec<i64>,
    pub failed: Vec<TransitionFailure>,
}

/// One package the transition could not be applied to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionFailure {
    pub id: i64,
    pub refid: Option<String>,
    pub reason: String,
}

impl TransitionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, id: i64, refid: Option<&str>, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(package_id = id, refid = ?refid, reason = %reason, "Transition failed");
        self.failed.push(TransitionFailure {
            id,
            refid: refid.map(str::to_string),
            reason,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Approve,
    Reject,
}

/// Drives approve, reject and metadata refresh
pub struct LifecycleController {
    pool: SqlitePool,
    config: Arc<Config>,
    lookup: Arc<dyn MetadataLookup>,
    notifier: Notifier,
}

impl LifecycleController {
    pub fn new(
        pool: SqlitePool,
        config: Arc<Config>,
        lookup: Arc<dyn MetadataLookup>,
        notifier: Notifier,
    ) -> Self {
        Self {
            pool,
            config,
            lookup,
            notifier,
        }
    }

    /// Move each package to the destination root and mark it APPROVED
    pub async fn approve(&self, ids: &[i64], rights_ids: &str) -> TransitionReport {
        let mut report = TransitionReport::default();

        for &id in ids {
            let Some(mut package) = self.pending_package(id, Decision::Approve, &mut report).await
            else {
                continue;
            };

            let source = self.config.storage_dir(&package.refid);
            let destination = self.config.destination_dir(&package.refid);
            if let Err(e) = move_package_files(&source, &destination).await {
                report.fail(
                    id,
                    Some(&package.refid),
                    format!("Moving files to {} failed: {}", destination.display(), e),
                );
                continue;
            }

            self.notifier.package_approved(&package.refid, rights_ids).await;

            package.process_status = ProcessStatus::Approved;
            package.rights_ids = Some(rights_ids.to_string());
            match packages::save_package(&self.pool, &mut package).await {
                Ok(()) => {
                    tracing::info!(
                        package_id = id,
                        refid = %package.refid,
                        rights_ids = %rights_ids,
                        "Package approved"
                    );
                    report.succeeded.push(id);
                }
                Err(e) => report.fail(id, Some(&package.refid), e.to_string()),
            }
        }

        report
    }

    /// Delete each package's files and mark it REJECTED
    pub async fn reject(&self, ids: &[i64]) -> TransitionReport {
        let mut report = TransitionReport::default();

        for &id in ids {
            let Some(mut package) = self.pending_package(id, Decision::Reject, &mut report).await
            else {
                continue;
            };

            let source = self.config.storage_dir(&package.refid);
            if let Err(e) = remove_package_files(&source).await {
                report.fail(
                    id,
                    Some(&package.refid),
                    format!("Removing {} failed: {}", source.display(), e),
                );
                continue;
            }

            self.notifier.package_rejected(&package.refid).await;

            package.process_status = ProcessStatus::Rejected;
            match packages::save_package(&self.pool, &mut package).await {
                Ok(()) => {
                    tracing::info!(package_id = id, refid = %package.refid, "Package rejected");
                    report.succeeded.push(id);
                }
                Err(e) => report.fail(id, Some(&package.refid), e.to_string()),
            }
        }

        report
    }

    /// Re-fetch descriptive metadata; status, files and notifications are
    /// left alone
    pub async fn refresh_metadata(&self, ids: &[i64]) -> TransitionReport {
        let mut report = TransitionReport::default();

        for &id in ids {
            let mut package = match packages::get_package(&self.pool, id).await {
                Ok(Some(package)) => package,
                Ok(None) => {
                    report.fail(id, None, "Package not found");
                    continue;
                }
                Err(e) => {
                    report.fail(id, None, e.to_string());
                    continue;
                }
            };

            let metadata = match self.lookup.lookup(&package.refid).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    report.fail(id, Some(&package.refid), e.to_string());
                    continue;
                }
            };

            package.apply_metadata(&metadata);
            match packages::save_package(&self.pool, &mut package).await {
                Ok(()) => {
                    tracing::info!(
                        package_id = id,
                        refid = %package.refid,
                        "Package metadata refreshed"
                    );
                    report.succeeded.push(id);
                }
                Err(e) => report.fail(id, Some(&package.refid), e.to_string()),
            }
        }

        report
    }

    /// Load a package that may still be decided on, recording why not otherwise
    async fn pending_package(
        &self,
        id: i64,
        decision: Decision,
        report: &mut TransitionReport,
    ) -> Option<Package> {
        match packages::get_package(&self.pool, id).await {
            Ok(Some(package)) if !package.process_status.is_terminal() => Some(package),
            Ok(Some(package)) => {
                report.fail(
                    id,
                    Some(&package.refid),
                    format!(
                        "Cannot {} package with status {}",
                        match decision {
                            Decision::Approve => "approve",
                            Decision::Reject => "reject",
                        },
                        package.process_status
                    ),
                );
                None
            }
            Ok(None) => {
                report.fail(id, None, "Package not found");
                None
            }
            Err(e) => {
                report.fail(id, None, e.to_string());
                None
            }
        }
    }
}

/// Move every entry of `source` into `destination`, then remove `source`
async fn move_package_files(source: &Path, destination: &Path) -> io::Result<()> {
    let source = source.to_path_buf();
    let destination = destination.to_path_buf();
    tokio::task::spawn_blocking(move || move_dir_contents(&source, &destination))
        .await
        .map_err(io::Error::other)?
}

fn move_dir_contents(source: &Path, destination: &Path) -> io::Result<()> {
    // Nothing may appear under the destination root unless the source is readable
    let entries = std::fs::read_dir(source)?.collect::<io::Result<Vec<_>>>()?;
    std::fs::create_dir_all(destination)?;

    for entry in entries {
        let target = destination.join(entry.file_name());
        if let Err(e) = std::fs::rename(entry.path(), &target) {
            // rename cannot cross filesystems; copy regular files instead
            if !entry.file_type()?.is_file() {
                return Err(e);
            }
            std::fs::copy(entry.path(), &target)?;
            std::fs::remove_file(entry.path())?;
        }
    }

    std::fs::remove_dir_all(source)
}

/// Delete `dir` recursively; a missing directory is already removed
async fn remove_package_files(dir: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}
