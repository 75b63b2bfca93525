//! Notification delivery
//!
//! [`SnsNotificationBus`] publishes to an SNS topic. [`Notifier`] builds the
//! status events used across the service and swallows delivery failures
//! after logging them: notifications are at-least-once at best and a lost
//! message never aborts a discovery pass or a review decision.

use avqc_common::config::NotificationConfig;
use avqc_common::{Notification, Outcome};
use aws_config::{BehaviorVersion, ConfigLoader, Region};
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client;
use std::sync::Arc;

use crate::types::{NotificationBus, NotifyError};

/// Longest failure detail carried as a message attribute; the full detail
/// is always in the message body
const MAX_ATTRIBUTE_CHARS: usize = 1024;

pub const STARTED_MESSAGE: &str = "Packages are waiting to be QCed";
pub const COMPLETE_MESSAGE: &str = "No packages left to QC";
pub const APPROVED_MESSAGE: &str = "Package reviewed and approved.";
pub const REJECTED_MESSAGE: &str = "Package reviewed and rejected.";

/// SNS-backed notification bus
pub struct SnsNotificationBus {
    client: Client,
}

fn config_loader(config: &NotificationConfig) -> ConfigLoader {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }
    // Custom endpoint (LocalStack)
    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    loader
}

impl SnsNotificationBus {
    /// Build an SNS client, assuming `role_arn` first when configured
    pub async fn from_config(config: &NotificationConfig) -> Self {
        let base = config_loader(config).load().await;

        let sdk_config = match &config.role_arn {
            Some(role_arn) => {
                tracing::debug!(role_arn = %role_arn, "Assuming role for notifications");
                let provider = aws_config::sts::AssumeRoleProvider::builder(role_arn)
                    .session_name("avqc-review")
                    .configure(&base)
                    .build()
                    .await;
                config_loader(config).credentials_provider(provider).load().await
            }
            None => base,
        };

        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait::async_trait]
impl NotificationBus for SnsNotificationBus {
    async fn publish(&self, topic: &str, notification: &Notification) -> Result<(), NotifyError> {
        let mut request = self
            .client
            .publish()
            .topic_arn(topic)
            .message(&notification.message);

        for (key, value) in notification.attributes() {
            let value = truncate_chars(value, MAX_ATTRIBUTE_CHARS);
            let attribute = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(value)
                .build()
                .map_err(|e| NotifyError::InvalidMessage(e.to_string()))?;
            request = request.message_attributes(key, attribute);
        }

        request
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Builds and delivers the service's status events
#[derive(Clone)]
pub struct Notifier {
    bus: Arc<dyn NotificationBus>,
    topic: String,
    service: String,
}

impl Notifier {
    pub fn new(bus: Arc<dyn NotificationBus>, config: &NotificationConfig) -> Self {
        Self {
            bus,
            topic: config.topic_arn.clone(),
            service: config.service.clone(),
        }
    }

    /// Deliver a notification. Returns false if delivery failed; the
    /// failure has already been logged.
    pub async fn deliver(&self, notification: Notification) -> bool {
        match self.bus.publish(&self.topic, &notification).await {
            Ok(()) => {
                tracing::debug!(
                    outcome = %notification.outcome,
                    refid = ?notification.refid,
                    "Notification delivered"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    outcome = %notification.outcome,
                    refid = ?notification.refid,
                    error = %e,
                    "Failed to deliver notification"
                );
                false
            }
        }
    }

    fn event(&self, message: impl Into<String>, outcome: Outcome) -> Notification {
        Notification::new(self.service.clone(), message, outcome)
    }

    pub async fn packages_waiting(&self) -> bool {
        self.deliver(self.event(STARTED_MESSAGE, Outcome::Started)).await
    }

    pub async fn qc_complete(&self) -> bool {
        self.deliver(self.event(COMPLETE_MESSAGE, Outcome::Complete)).await
    }

    pub async fn package_approved(&self, refid: &str, rights_ids: &str) -> bool {
        let event = self
            .event(APPROVED_MESSAGE, Outcome::Success)
            .with_refid(refid)
            .with_rights_ids(rights_ids);
        self.deliver(event).await
    }

    /// Rejection outcome report (FAILURE here is the review outcome, not a fault)
    pub async fn package_rejected(&self, refid: &str) -> bool {
        let event = self.event(REJECTED_MESSAGE, Outcome::Failure).with_refid(refid);
        self.deliver(event).await
    }

    /// Discovery of `refid` failed with `detail`
    pub async fn discovery_failed(&self, refid: &str, detail: &str) -> bool {
        let event = self
            .event(format!("Error discovering refid {}\n\n{}", refid, detail), Outcome::Failure)
            .with_refid(refid)
            .with_failure_detail(detail);
        self.deliver(event).await
    }
}
