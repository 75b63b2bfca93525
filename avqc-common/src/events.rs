//! Notification event types
//!
//! Status events published to the notification bus. Delivery is
//! fire-and-forget; the event itself carries everything a subscriber needs
//! to correlate it with a package.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome attribute carried by every notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// Packages are waiting for review
    Started,
    /// Package approved
    Success,
    /// Package rejected, or discovery of a package failed
    Failure,
    /// Storage root is empty, nothing left to review
    Complete,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Started => "STARTED",
            Outcome::Success => "SUCCESS",
            Outcome::Failure => "FAILURE",
            Outcome::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Service tag identifying the publisher
    pub service: String,
    pub message: String,
    pub outcome: Outcome,
    /// Package the event is about, if any
    pub refid: Option<String>,
    pub rights_ids: Option<String>,
    /// Error detail for failed discovery attempts
    pub failure_detail: Option<String>,
}

impl Notification {
    pub fn new(service: impl Into<String>, message: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
            outcome,
            refid: None,
            rights_ids: None,
            failure_detail: None,
        }
    }

    pub fn with_refid(mut self, refid: impl Into<String>) -> Self {
        self.refid = Some(refid.into());
        self
    }

    pub fn with_rights_ids(mut self, rights_ids: impl Into<String>) -> Self {
        self.rights_ids = Some(rights_ids.into());
        self
    }

    pub fn with_failure_detail(mut self, detail: impl Into<String>) -> Self {
        self.failure_detail = Some(detail.into());
        self
    }

    /// String attributes in publish order: `service`, `outcome`, then the
    /// optional `refid`, `rights_ids` and `failure_detail`
    pub fn attributes(&self) -> Vec<(&'static str, &str)> {
        let mut attributes = vec![
            ("service", self.service.as_str()),
            ("outcome", self.outcome.as_str()),
        ];
        if let Some(refid) = &self.refid {
            attributes.push(("refid", refid.as_str()));
        }
        if let Some(rights_ids) = &self.rights_ids {
            attributes.push(("rights_ids", rights_ids.as_str()));
        }
        if let Some(detail) = &self.failure_detail {
            attributes.push(("failure_detail", detail.as_str()));
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_without_package() {
        let notification =
            Notification::new("digitized_av_qc", "No packages left to QC", Outcome::Complete);
        assert_eq!(
            notification.attributes(),
            vec![("service", "digitized_av_qc"), ("outcome", "COMPLETE")]
        );
    }

    #[test]
    fn test_attributes_with_package_and_rights() {
        let notification = Notification::new("digitized_av_qc", "approved", Outcome::Success)
            .with_refid("abc123")
            .with_rights_ids("1,2");
        let attributes = notification.attributes();
        assert!(attributes.contains(&("refid", "abc123")));
        assert!(attributes.contains(&("rights_ids", "1,2")));
        assert!(!attributes.iter().any(|(k, _)| *k == "failure_detail"));
    }
}
