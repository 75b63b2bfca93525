//! Collaborator implementations and the discovery/review processes

pub mod aquila_client;
pub mod archivesspace_client;
pub mod discovery;
pub mod lifecycle;
pub mod media_probe;
pub mod notifier;
pub mod rights_sync;
pub mod status_check;

pub use aquila_client::AquilaClient;
pub use archivesspace_client::ArchivesSpaceClient;
pub use discovery::{DiscoveryProcess, PackageError};
pub use lifecycle::{LifecycleController, TransitionFailure, TransitionReport};
pub use media_probe::FfprobeProbe;
pub use notifier::{Notifier, SnsNotificationBus};
pub use rights_sync::{sync_rights_statements, SyncError};
pub use status_check::{check_qc_status, send_startup_message};
