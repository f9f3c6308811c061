//! Approved-artifact pointer record.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blob::{BlobError, ObjectLocation};

/// Errors that can occur while resolving the approved artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The pointer object does not exist.
    #[error("Artifact pointer not found at {0}")]
    NotFound(ObjectLocation),

    /// The pointer object exists but is not a valid pointer record.
    #[error("Malformed artifact pointer at {location}: {reason}")]
    Malformed {
        location: ObjectLocation,
        reason: String,
    },

    /// Any other storage failure.
    #[error("Storage error: {0}")]
    Storage(#[from] BlobError),
}

/// JSON key holding the model reference inside the pointer object.
pub const MODEL_REFERENCE_KEY: &str = "ModelPackageArn";

/// Points at the model package approved for deployment.
///
/// Serialized as `{"ModelPackageArn": "<reference>"}`. The object is
/// overwritten wholesale on every approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPointer {
    #[serde(rename = "ModelPackageArn")]
    pub model_reference: String,
}

impl ArtifactPointer {
    pub fn new(model_reference: impl Into<String>) -> Self {
        Self {
            model_reference: model_reference.into(),
        }
    }

    /// Serializes the pointer to its stored JSON form.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::json!({ MODEL_REFERENCE_KEY: self.model_reference })
            .to_string()
            .into_bytes()
    }

    /// Parses a stored pointer. Unknown keys are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {}", e))?;

        let object = value
            .as_object()
            .ok_or_else(|| "expected a JSON object".to_string())?;

        match object.get(MODEL_REFERENCE_KEY) {
            Some(serde_json::Value::String(reference)) if !reference.trim().is_empty() => {
                Ok(Self::new(reference.clone()))
            }
            Some(serde_json::Value::String(_)) => {
                Err(format!("{} is empty", MODEL_REFERENCE_KEY))
            }
            Some(_) => Err(format!("{} is not a string", MODEL_REFERENCE_KEY)),
            None => Err(format!("missing {}", MODEL_REFERENCE_KEY)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_wire_format() {
        let pointer = ArtifactPointer::new("arn:model-package/news-headlines/4");
        let body = String::from_utf8(pointer.to_json_bytes()).unwrap();
        assert_eq!(
            body,
            r#"{"ModelPackageArn":"arn:model-package/news-headlines/4"}"#
        );
    }

    #[test]
    fn test_parse_ignores_extra_keys() {
        let pointer =
            ArtifactPointer::parse(br#"{"ModelPackageArn":"pkg-42","Other":true}"#).unwrap();
        assert_eq!(pointer.model_reference, "pkg-42");
    }

    #[test]
    fn test_parse_rejects_missing_reference() {
        let err = ArtifactPointer::parse(br#"{"modelReference":"pkg-42"}"#).unwrap_err();
        assert!(err.contains("missing ModelPackageArn"));
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        assert!(ArtifactPointer::parse(b"not json").is_err());
        assert!(ArtifactPointer::parse(br#"["pkg-42"]"#).is_err());
        assert!(ArtifactPointer::parse(br#"{"ModelPackageArn":42}"#)
            .unwrap_err()
            .contains("not a string"));
        assert!(ArtifactPointer::parse(br#"{"ModelPackageArn":" "}"#)
            .unwrap_err()
            .contains("empty"));
    }
}
