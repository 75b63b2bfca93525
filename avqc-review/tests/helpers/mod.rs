//! Test Helper Utilities
//!
//! Temporary storage/destination roots, a real SQLite file database, and
//! fakes for the four collaborators. Each integration test binary uses a
//! different subset.

#![allow(dead_code)]

pub mod fakes;

use avqc_common::models::{NewPackage, PackageMetadata, TechnicalSummary};
use avqc_common::{Config, Package, PackageType, ProcessStatus};
use avqc_review::db::{init_database, packages};
use avqc_review::services::Notifier;
use fakes::RecordingBus;
use sqlx::SqlitePool;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const TOPIC: &str = "arn:aws:sns:us-east-1:123456789012:digitized-av-qc";

/// Workspace for one test; the TempDir must stay alive for the test
pub struct TestEnv {
    pub dir: TempDir,
    pub config: Arc<Config>,
    pub pool: SqlitePool,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = dir.path().join("qc");
        let destination = dir.path().join("packaging");
        fs::create_dir_all(&storage).unwrap();
        fs::create_dir_all(&destination).unwrap();

        let config = test_config(dir.path(), &storage, &destination);
        let pool = init_database(&config.database_path).await.unwrap();

        Self {
            dir,
            config: Arc::new(config),
            pool,
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.config.storage_root
    }

    pub fn destination_root(&self) -> &Path {
        &self.config.destination_root
    }

    /// Create `<storage_root>/<refid>/` containing empty `files`
    pub fn add_package_dir(&self, refid: &str, files: &[&str]) -> PathBuf {
        let dir = self.storage_root().join(refid);
        fs::create_dir_all(&dir).unwrap();
        for name in files {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
        dir
    }

    /// Audio package directory: `<refid>.mp3` access copy and `<refid>.wav` master
    pub fn add_audio_package(&self, refid: &str) -> PathBuf {
        let access = format!("{}.mp3", refid);
        let master = format!("{}.wav", refid);
        self.add_package_dir(refid, &[access.as_str(), master.as_str()])
    }

    /// Package record plus its storage directory, as discovery leaves them
    pub async fn seed_pending(&self, refid: &str) -> Package {
        self.add_audio_package(refid);
        packages::insert_package(&self.pool, &new_package(refid)).await.unwrap()
    }

    /// Package record with the given status and no files
    pub async fn seed_record(&self, refid: &str, status: ProcessStatus) -> Package {
        let mut package = packages::insert_package(&self.pool, &new_package(refid))
            .await
            .unwrap();
        if status != ProcessStatus::Pending {
            package.process_status = status;
            packages::save_package(&self.pool, &mut package).await.unwrap();
        }
        package
    }

    pub fn notifier(&self, bus: Arc<RecordingBus>) -> Notifier {
        Notifier::new(bus, &self.config.notifications)
    }
}

pub fn test_config(base: &Path, storage: &Path, destination: &Path) -> Config {
    let toml = format!(
        r#"
        storage_root = '{}'
        destination_root = '{}'
        database_path = '{}'

        [archivesspace]
        baseurl = "http://localhost:8089"
        repository = "2"
        public_url = "https://archives.example.org"

        [aquila]
        baseurl = "http://localhost:8000"

        [notifications]
        topic_arn = "{}"
        "#,
        storage.display(),
        destination.display(),
        base.join("avqc.db").display(),
        TOPIC
    );
    Config::from_toml_str(&toml).unwrap()
}

pub fn metadata_for(refid: &str) -> PackageMetadata {
    PackageMetadata {
        title: format!("Recording {}", refid),
        object_uri: "/repositories/2/archival_objects/345".to_string(),
        resource_title: "Oral histories".to_string(),
        resource_uri: "/repositories/2/resources/12".to_string(),
        has_structured_dates: true,
    }
}

pub fn new_package(refid: &str) -> NewPackage {
    NewPackage {
        refid: refid.to_string(),
        metadata: metadata_for(refid),
        package_type: PackageType::Audio,
        summary: TechnicalSummary {
            duration_access: 60.0,
            duration_master: 60.0,
            multiple_masters: false,
        },
        possible_duplicate: false,
    }
}
