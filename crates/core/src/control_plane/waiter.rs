//! Polling wait for endpoint convergence.

use std::time::Duration;

use tokio::time::{sleep, timeout_at, Instant};
use tracing::debug;

use super::types::{ControlPlane, ControlPlaneError, EndpointDescription, EndpointStatus};

/// Longest convergence wait honoured. Longer timeouts are cut to this.
pub const MAX_CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Polls `describe_endpoint` until the endpoint is `InService`.
///
/// Returns `WaitFailed` as soon as `Failed` is observed and `WaitTimeout`
/// once `timeout` (at most [`MAX_CONVERGENCE_TIMEOUT`]) has elapsed.
/// Describe errors end the wait immediately.
pub async fn wait_until_in_service<C>(
    control_plane: &C,
    endpoint: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<EndpointDescription, ControlPlaneError>
where
    C: ControlPlane + ?Sized,
{
    let deadline = Instant::now() + timeout.min(MAX_CONVERGENCE_TIMEOUT);
    let mut last_status = EndpointStatus::Unknown;
    let timed_out = |last_status| ControlPlaneError::WaitTimeout {
        endpoint: endpoint.to_string(),
        waited: timeout,
        last_status,
    };

    loop {
        let description = timeout_at(deadline, control_plane.describe_endpoint(endpoint))
            .await
            .map_err(|_| timed_out(last_status))??;

        match description.status {
            status if status.is_healthy() => return Ok(description),
            EndpointStatus::Failed => {
                return Err(ControlPlaneError::WaitFailed {
                    endpoint: endpoint.to_string(),
                    status: description.status,
                    reason: description
                        .failure_reason
                        .unwrap_or_else(|| "no failure reason reported".to_string()),
                });
            }
            status => {
                debug!(endpoint, %status, "Endpoint not in service yet");
                last_status = status;
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out(last_status));
        }
        sleep(poll_interval.min(deadline - now)).await;
    }
}
