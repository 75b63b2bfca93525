//! Collaborator traits and their error types
//!
//! Discovery and the lifecycle controller talk to the outside world only
//! through these four seams:
//! - [`MetadataLookup`]: archival registry, refid → descriptive metadata
//! - [`RightsRegistry`]: list of available rights statements
//! - [`NotificationBus`]: fire-and-forget status events
//! - [`MediaProbe`]: duration of one media file
//!
//! Production implementations live in `services`; tests substitute fakes.

use avqc_common::models::PackageMetadata;
use avqc_common::Notification;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Metadata lookup
// ============================================================================

/// Archival registry lookup by refid
///
/// May fail per refid; callers isolate failures to the package concerned.
#[async_trait::async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn lookup(&self, refid: &str) -> Result<PackageMetadata, LookupError>;
}

/// Registry client error
#[derive(Debug, Error)]
pub enum LookupError {
    /// Network communication error (includes timeouts)
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication with the registry failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Registry answered with a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Lookup did not resolve to exactly one archival object
    #[error("Expecting to get one result for ref id {refid} but got {count} instead.")]
    UnexpectedResultCount { refid: String, count: usize },

    /// Response did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

// ============================================================================
// Rights registry
// ============================================================================

/// One entry of the remote rights registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RightsEntry {
    /// External id, normalized to a string
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub title: String,
}

/// Registry ids arrive as JSON numbers or strings
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[async_trait::async_trait]
pub trait RightsRegistry: Send + Sync {
    /// Full current list of available rights statements
    async fn list_available(&self) -> Result<Vec<RightsEntry>, LookupError>;
}

// ============================================================================
// Notification bus
// ============================================================================

/// Status event transport
#[async_trait::async_trait]
pub trait NotificationBus: Send + Sync {
    /// Publish one notification to `topic`
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notification transport error
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Message could not be built
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Delivery failed
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

// ============================================================================
// Media probe
// ============================================================================

/// Reports the playback duration of a media file
#[async_trait::async_trait]
pub trait MediaProbe: Send + Sync {
    /// Duration in seconds
    async fn duration_seconds(&self, path: &Path) -> Result<f64, ProbeError>;
}

/// Media probe error
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Probe utility could not be started
    #[error("Failed to run probe for {}: {}", .0.display(), .1)]
    Spawn(PathBuf, String),

    /// Probe did not finish in time
    #[error("Probe timed out after {}s: {}", .1, .0.display())]
    Timeout(PathBuf, u64),

    /// Probe exited unsuccessfully
    #[error("Probe failed for {}: {}", .0.display(), .1)]
    Failed(PathBuf, String),

    /// Probe output was not a duration
    #[error("Unparsable duration for {}: '{}'", .0.display(), .1)]
    Unparsable(PathBuf, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rights_entry_accepts_numeric_and_string_ids() {
        let entries: Vec<RightsEntry> =
            serde_json::from_str(r#"[{"id": 1, "title": "foo"}, {"id": "2", "title": "bar"}]"#)
                .unwrap();
        assert_eq!(entries[0].id, "1");
        assert_eq!(entries[1].id, "2");
    }

    #[test]
    fn test_rights_entry_rejects_object_id() {
        let result: Result<RightsEntry, _> =
            serde_json::from_str(r#"{"id": {"x": 1}, "title": "foo"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unexpected_count_message() {
        let err = LookupError::UnexpectedResultCount {
            refid: "abc".to_string(),
            count: 0,
        };
        assert_eq!(
            err.to_string(),
            "Expecting to get one result for ref id abc but got 0 instead."
        );
    }
}
