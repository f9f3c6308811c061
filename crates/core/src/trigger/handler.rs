//! Approval notification handler.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::artifact::ArtifactPointer;
use crate::blob::{BlobStore, ObjectLocation};
use crate::config::TriggerConfig;
use crate::metrics;

use super::types::{ApprovalEvent, TriggerError, TriggerOutcome, APPROVED_STATUS};

/// Publishes the pointer for approved models of the configured family.
pub struct PromotionTrigger {
    store: Arc<dyn BlobStore>,
    config: TriggerConfig,
}

impl PromotionTrigger {
    pub fn new(store: Arc<dyn BlobStore>, config: TriggerConfig) -> Self {
        Self { store, config }
    }

    /// Where the pointer is published.
    pub fn pointer_location(&self) -> ObjectLocation {
        ObjectLocation::new(&self.config.bucket, &self.config.object_key)
    }

    /// Handles one notification.
    ///
    /// Idempotent: the pointer is overwritten wholesale, so redelivery of
    /// the same notification leaves the same content behind.
    pub async fn handle(&self, event: &serde_json::Value) -> Result<TriggerOutcome, TriggerError> {
        let span = info_span!("promotion_trigger");
        let result = self.handle_inner(event).instrument(span).await;

        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(TriggerError::UnexpectedEvent(_)) => "rejected",
            Err(TriggerError::Storage { .. }) => "error",
        };
        metrics::TRIGGER_EVENTS.with_label_values(&[label]).inc();

        result
    }

    async fn handle_inner(&self, event: &serde_json::Value) -> Result<TriggerOutcome, TriggerError> {
        let event: ApprovalEvent = serde_json::from_value(event.clone())
            .map_err(|e| TriggerError::UnexpectedEvent(format!("invalid event: {}", e)))?;

        let source = event.source.as_deref().unwrap_or_default();
        if source != self.config.expected_source {
            warn!(source, "Rejecting event from unexpected source");
            return Err(TriggerError::UnexpectedEvent(format!(
                "source {:?} is not {:?}",
                source, self.config.expected_source
            )));
        }

        let detail_type = event.detail_type.as_deref().unwrap_or_default();
        if detail_type != self.config.expected_detail_type {
            warn!(detail_type, "Rejecting event of unexpected type");
            return Err(TriggerError::UnexpectedEvent(format!(
                "detail-type {:?} is not {:?}",
                detail_type, self.config.expected_detail_type
            )));
        }

        let detail = event
            .detail
            .ok_or_else(|| TriggerError::UnexpectedEvent("missing detail".to_string()))?;

        let family = detail.model_package_group_name.ok_or_else(|| {
            TriggerError::UnexpectedEvent("missing ModelPackageGroupName".to_string())
        })?;
        if family != self.config.model_family {
            info!(model_family = %family, "Ignoring model outside the promoted family");
            return Ok(TriggerOutcome::SkippedFamily {
                model_family: family,
            });
        }

        let status = detail.model_approval_status.ok_or_else(|| {
            TriggerError::UnexpectedEvent("missing ModelApprovalStatus".to_string())
        })?;
        if status != APPROVED_STATUS {
            info!(approval_status = %status, "Ignoring model that is not approved");
            return Ok(TriggerOutcome::SkippedStatus {
                approval_status: status,
            });
        }

        let model_reference = detail
            .model_package_arn
            .filter(|arn| !arn.trim().is_empty())
            .ok_or_else(|| TriggerError::UnexpectedEvent("missing ModelPackageArn".to_string()))?;

        let location = self.pointer_location();
        let body = ArtifactPointer::new(&model_reference).to_json_bytes();
        self.store
            .put(&location.bucket, &location.key, body)
            .await
            .map_err(|source| TriggerError::Storage {
                location: location.clone(),
                source,
            })?;

        info!(%location, model_reference = %model_reference, "Published approved model pointer");
        Ok(TriggerOutcome::Published {
            location,
            model_reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobError;
    use crate::testing::{approval_event, MockBlobStore};

    const ARN: &str = "arn:model-package/news-headlines/3";

    fn trigger(store: &Arc<MockBlobStore>) -> PromotionTrigger {
        PromotionTrigger::new(store.clone(), TriggerConfig::default())
    }

    #[tokio::test]
    async fn test_approved_model_publishes_pointer() {
        let store = Arc::new(MockBlobStore::new());

        let outcome = trigger(&store)
            .handle(&approval_event("news-headlines", ARN, "Approved"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TriggerOutcome::Published {
                location: ObjectLocation::new("model-approvals", "approved-model.json"),
                model_reference: ARN.to_string(),
            }
        );
        let body = store
            .object("model-approvals", "approved-model.json")
            .await
            .unwrap();
        assert_eq!(ArtifactPointer::parse(&body).unwrap().model_reference, ARN);
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let store = Arc::new(MockBlobStore::new());
        let trigger = trigger(&store);
        let event = approval_event("news-headlines", ARN, "Approved");

        trigger.handle(&event).await.unwrap();
        let first = store.object("model-approvals", "approved-model.json").await;
        trigger.handle(&event).await.unwrap();
        let second = store.object("model-approvals", "approved-model.json").await;

        assert_eq!(first, second);
        assert_eq!(store.recorded_writes().await.len(), 2);
    }

    #[tokio::test]
    async fn test_latest_approval_wins() {
        let store = Arc::new(MockBlobStore::new());
        let trigger = trigger(&store);

        trigger
            .handle(&approval_event("news-headlines", ARN, "Approved"))
            .await
            .unwrap();
        trigger
            .handle(&approval_event(
                "news-headlines",
                "arn:model-package/news-headlines/4",
                "Approved",
            ))
            .await
            .unwrap();

        let body = store
            .object("model-approvals", "approved-model.json")
            .await
            .unwrap();
        assert_eq!(
            ArtifactPointer::parse(&body).unwrap().model_reference,
            "arn:model-package/news-headlines/4"
        );
    }

    #[tokio::test]
    async fn test_other_family_is_skipped_without_write() {
        let store = Arc::new(MockBlobStore::new());

        let outcome = trigger(&store)
            .handle(&approval_event("sports-scores", ARN, "Approved"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TriggerOutcome::SkippedFamily {
                model_family: "sports-scores".to_string()
            }
        );
        assert!(store.recorded_writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_unapproved_status_is_skipped_without_write() {
        let store = Arc::new(MockBlobStore::new());

        for status in ["Rejected", "PendingManualApproval"] {
            let outcome = trigger(&store)
                .handle(&approval_event("news-headlines", ARN, status))
                .await
                .unwrap();
            assert_eq!(outcome.as_str(), "skipped_status");
        }
        assert!(store.recorded_writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_source_is_rejected() {
        let store = Arc::new(MockBlobStore::new());
        let mut event = approval_event("news-headlines", ARN, "Approved");
        event["source"] = serde_json::json!("aws.s3");

        let err = trigger(&store).handle(&event).await.unwrap_err();

        assert!(matches!(err, TriggerError::UnexpectedEvent(_)));
        assert!(store.recorded_writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_detail_type_is_rejected() {
        let store = Arc::new(MockBlobStore::new());
        let mut event = approval_event("news-headlines", ARN, "Approved");
        event["detail-type"] = serde_json::json!("Training Job State Change");

        let err = trigger(&store).handle(&event).await.unwrap_err();

        assert_eq!(err.kind(), "unexpected_event");
    }

    #[tokio::test]
    async fn test_missing_detail_fields_are_rejected() {
        let store = Arc::new(MockBlobStore::new());
        let trigger = trigger(&store);

        let mut no_detail = approval_event("news-headlines", ARN, "Approved");
        no_detail.as_object_mut().unwrap().remove("detail");
        assert!(trigger.handle(&no_detail).await.is_err());

        let mut no_arn = approval_event("news-headlines", ARN, "Approved");
        no_arn["detail"]
            .as_object_mut()
            .unwrap()
            .remove("ModelPackageArn");
        let err = trigger.handle(&no_arn).await.unwrap_err();
        assert!(err.to_string().contains("ModelPackageArn"));

        let not_an_object = serde_json::json!(["not", "an", "event"]);
        assert!(trigger.handle(&not_an_object).await.is_err());
    }

    #[tokio::test]
    async fn test_storage_failure_is_surfaced() {
        let store = Arc::new(MockBlobStore::new());
        store
            .set_next_error(BlobError::Io {
                bucket: "model-approvals".to_string(),
                key: "approved-model.json".to_string(),
                source: std::io::Error::other("disk full"),
            })
            .await;

        let err = trigger(&store)
            .handle(&approval_event("news-headlines", ARN, "Approved"))
            .await
            .unwrap_err();

        assert!(matches!(err, TriggerError::Storage { .. }));
    }
}
