//! Types for approval notifications.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blob::{BlobError, ObjectLocation};

/// Approval status that promotes a model.
pub const APPROVED_STATUS: &str = "Approved";

/// Errors that can occur while handling an approval notification.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The notification is not a model approval state change, or lacks
    /// fields an approval notification must carry.
    #[error("Unexpected event: {0}")]
    UnexpectedEvent(String),

    /// The pointer could not be written.
    #[error("Failed to publish artifact pointer to {location}: {source}")]
    Storage {
        location: ObjectLocation,
        #[source]
        source: BlobError,
    },
}

impl TriggerError {
    pub fn kind(&self) -> &'static str {
        match self {
            TriggerError::UnexpectedEvent(_) => "unexpected_event",
            TriggerError::Storage { .. } => "storage",
        }
    }
}

/// Envelope of a model package state change notification.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalEvent {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(rename = "detail-type", default)]
    pub detail_type: Option<String>,
    #[serde(default)]
    pub detail: Option<ApprovalDetail>,
}

/// Payload of a model package state change notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApprovalDetail {
    #[serde(default)]
    pub model_package_group_name: Option<String>,
    #[serde(default)]
    pub model_package_arn: Option<String>,
    #[serde(default)]
    pub model_approval_status: Option<String>,
}

/// What the trigger did with a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// The pointer now names `model_reference`.
    Published {
        location: ObjectLocation,
        model_reference: String,
    },
    /// The model belongs to another family.
    SkippedFamily { model_family: String },
    /// The model was not approved.
    SkippedStatus { approval_status: String },
}

impl TriggerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerOutcome::Published { .. } => "published",
            TriggerOutcome::SkippedFamily { .. } => "skipped_family",
            TriggerOutcome::SkippedStatus { .. } => "skipped_status",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes_from_notification_shape() {
        let json = serde_json::json!({
            "source": "aws.sagemaker",
            "detail-type": "SageMaker Model Package State Change",
            "detail": {
                "ModelPackageGroupName": "news-headlines",
                "ModelPackageArn": "arn:model-package/news-headlines/3",
                "ModelApprovalStatus": "Approved",
                "ModelPackageVersion": 3
            }
        });
        let event: ApprovalEvent = serde_json::from_value(json).unwrap();

        assert_eq!(event.source.as_deref(), Some("aws.sagemaker"));
        let detail = event.detail.unwrap();
        assert_eq!(detail.model_package_group_name.as_deref(), Some("news-headlines"));
        assert_eq!(detail.model_approval_status.as_deref(), Some("Approved"));
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = TriggerOutcome::SkippedStatus {
            approval_status: "Rejected".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({ "outcome": "skipped_status", "approval_status": "Rejected" })
        );
    }
}
