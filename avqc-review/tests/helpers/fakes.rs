//! Collaborator fakes that record calls for assertions

use avqc_common::models::PackageMetadata;
use avqc_common::{Notification, Outcome};
use avqc_review::types::{
    LookupError, MediaProbe, MetadataLookup, NotificationBus, NotifyError, ProbeError,
    RightsEntry, RightsRegistry,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::metadata_for;

/// Registry lookup answering every refid with [`metadata_for`] unless told otherwise
#[derive(Default)]
pub struct FakeLookup {
    failing: Mutex<HashSet<String>>,
    overrides: Mutex<HashMap<String, PackageMetadata>>,
    calls: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(refids: &[&str]) -> Self {
        let lookup = Self::default();
        lookup
            .failing
            .lock()
            .unwrap()
            .extend(refids.iter().map(|r| r.to_string()));
        lookup
    }

    pub fn set_metadata(&self, refid: &str, metadata: PackageMetadata) {
        self.overrides.lock().unwrap().insert(refid.to_string(), metadata);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MetadataLookup for FakeLookup {
    async fn lookup(&self, refid: &str) -> Result<PackageMetadata, LookupError> {
        self.calls.lock().unwrap().push(refid.to_string());
        if self.failing.lock().unwrap().contains(refid) {
            return Err(LookupError::UnexpectedResultCount {
                refid: refid.to_string(),
                count: 0,
            });
        }
        let overrides = self.overrides.lock().unwrap();
        Ok(overrides
            .get(refid)
            .cloned()
            .unwrap_or_else(|| metadata_for(refid)))
    }
}

/// Probe reporting a fixed duration, failing for listed file names
pub struct FakeProbe {
    seconds: f64,
    failing_files: HashSet<String>,
    probed: Mutex<Vec<PathBuf>>,
}

impl FakeProbe {
    pub fn new(seconds: f64) -> Self {
        Self {
            seconds,
            failing_files: HashSet::new(),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(seconds: f64, files: &[&str]) -> Self {
        Self {
            failing_files: files.iter().map(|f| f.to_string()).collect(),
            ..Self::new(seconds)
        }
    }

    pub fn probed(&self) -> Vec<PathBuf> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MediaProbe for FakeProbe {
    async fn duration_seconds(&self, path: &Path) -> Result<f64, ProbeError> {
        self.probed.lock().unwrap().push(path.to_path_buf());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing_files.contains(&name) {
            return Err(ProbeError::Failed(
                path.to_path_buf(),
                "Invalid data found when processing input".to_string(),
            ));
        }
        Ok(self.seconds)
    }
}

/// Notification bus keeping every published message
#[derive(Default)]
pub struct RecordingBus {
    sent: Mutex<Vec<(String, Notification)>>,
    fail: AtomicBool,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later publish fail
    pub fn fail_deliveries(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().iter().map(|(_, n)| n.clone()).collect()
    }

    pub fn topics(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn with_outcome(&self, outcome: Outcome) -> Vec<Notification> {
        self.sent().into_iter().filter(|n| n.outcome == outcome).collect()
    }
}

#[async_trait::async_trait]
impl NotificationBus for RecordingBus {
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("connection refused".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((topic.to_string(), notification.clone()));
        Ok(())
    }
}

/// Rights registry with a mutable entry list
#[derive(Default)]
pub struct FakeRegistry {
    entries: Mutex<Vec<RightsEntry>>,
    unavailable: AtomicBool,
}

impl FakeRegistry {
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let registry = Self::default();
        for (id, title) in entries {
            registry.add(id, title);
        }
        registry
    }

    pub fn add(&self, id: &str, title: &str) {
        self.entries.lock().unwrap().push(RightsEntry {
            id: id.to_string(),
            title: title.to_string(),
        });
    }

    pub fn go_offline(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RightsRegistry for FakeRegistry {
    async fn list_available(&self) -> Result<Vec<RightsEntry>, LookupError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LookupError::Network("connection refused".to_string()));
        }
        Ok(self.entries.lock().unwrap().clone())
    }
}
