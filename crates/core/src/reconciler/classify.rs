//! Classification of control plane rejections.
//!
//! The control plane reports both "endpoint does not exist" and "endpoint is
//! busy" as a `ValidationException`; only the message tells them apart.
//! Confusing the two either creates a duplicate endpoint or aborts a
//! deployment that should have gone through, so the matching lives here.

use crate::control_plane::{ControlPlaneError, VALIDATION_EXCEPTION};

/// Message fragment of a rejection for a missing endpoint.
pub const ENDPOINT_NOT_FOUND_MARKER: &str = "Could not find endpoint";

/// Message fragment of a rejected update on an endpoint mid-transition.
pub const ENDPOINT_BUSY_MARKER: &str = "Cannot update in-progress endpoint";

/// Endpoint operation a rejection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointOperation {
    Describe,
    Create,
    Update,
}

/// What a rejection says about the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointFault {
    /// The endpoint does not exist.
    Absent,
    /// The endpoint exists and is converging toward another configuration.
    Busy,
    /// Anything else. Always fatal.
    Unknown,
}

impl EndpointFault {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointFault::Absent => "absent",
            EndpointFault::Busy => "busy",
            EndpointFault::Unknown => "unknown",
        }
    }
}

/// Maps a rejected endpoint operation to what it means for reconciliation.
pub fn classify(operation: EndpointOperation, error: &ControlPlaneError) -> EndpointFault {
    let ControlPlaneError::Service { code, message } = error else {
        return EndpointFault::Unknown;
    };
    if code != VALIDATION_EXCEPTION {
        return EndpointFault::Unknown;
    }

    match operation {
        EndpointOperation::Describe if message.contains(ENDPOINT_NOT_FOUND_MARKER) => {
            EndpointFault::Absent
        }
        EndpointOperation::Update if message.contains(ENDPOINT_BUSY_MARKER) => EndpointFault::Busy,
        // Deleted between the probe and the update.
        EndpointOperation::Update if message.contains(ENDPOINT_NOT_FOUND_MARKER) => {
            EndpointFault::Absent
        }
        _ => EndpointFault::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation(message: &str) -> ControlPlaneError {
        ControlPlaneError::service(VALIDATION_EXCEPTION, message)
    }

    const NOT_FOUND: &str =
        "Could not find endpoint \"arn:endpoint/news-headlines-endpoint\".";
    const BUSY: &str = "Cannot update in-progress endpoint \"arn:endpoint/news-headlines-endpoint\".";

    #[test]
    fn test_describe_not_found_is_absent() {
        assert_eq!(
            classify(EndpointOperation::Describe, &validation(NOT_FOUND)),
            EndpointFault::Absent
        );
    }

    #[test]
    fn test_update_in_progress_is_busy() {
        assert_eq!(
            classify(EndpointOperation::Update, &validation(BUSY)),
            EndpointFault::Busy
        );
    }

    #[test]
    fn test_update_not_found_is_absent() {
        assert_eq!(
            classify(EndpointOperation::Update, &validation(NOT_FOUND)),
            EndpointFault::Absent
        );
    }

    #[test]
    fn test_busy_message_on_describe_is_unknown() {
        // Only an update can be rejected for being in progress.
        assert_eq!(
            classify(EndpointOperation::Describe, &validation(BUSY)),
            EndpointFault::Unknown
        );
    }

    #[test]
    fn test_create_rejections_are_unknown() {
        assert_eq!(
            classify(
                EndpointOperation::Create,
                &validation("Cannot create already existing endpoint")
            ),
            EndpointFault::Unknown
        );
        assert_eq!(
            classify(EndpointOperation::Create, &validation(NOT_FOUND)),
            EndpointFault::Unknown
        );
    }

    #[test]
    fn test_other_validation_messages_are_unknown() {
        for op in [
            EndpointOperation::Describe,
            EndpointOperation::Update,
            EndpointOperation::Create,
        ] {
            assert_eq!(
                classify(op, &validation("1 validation error detected: EndpointName")),
                EndpointFault::Unknown
            );
        }
    }

    #[test]
    fn test_matching_message_with_other_code_is_unknown() {
        let err = ControlPlaneError::service("AccessDeniedException", NOT_FOUND);
        assert_eq!(
            classify(EndpointOperation::Describe, &err),
            EndpointFault::Unknown
        );

        let err = ControlPlaneError::service("ThrottlingException", BUSY);
        assert_eq!(classify(EndpointOperation::Update, &err), EndpointFault::Unknown);
    }

    #[test]
    fn test_transport_failures_are_unknown() {
        assert_eq!(
            classify(EndpointOperation::Describe, &ControlPlaneError::Timeout),
            EndpointFault::Unknown
        );
        assert_eq!(
            classify(
                EndpointOperation::Update,
                &ControlPlaneError::Transport("connection reset".to_string())
            ),
            EndpointFault::Unknown
        );
    }
}
