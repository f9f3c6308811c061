use super::{types::Config, ConfigError};
use crate::control_plane::MAX_CONVERGENCE_TIMEOUT;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Endpoint name, model name prefix, execution role and trigger location are set
/// - Instance count and variant weight are positive
/// - Poll interval is shorter than the convergence timeout
/// - Convergence timeout is at most a day
/// - Remote URLs use http or https
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    let deployment = &config.deployment;
    for (field, value) in [
        ("deployment.endpoint_name", &deployment.endpoint_name),
        ("deployment.model_name_prefix", &deployment.model_name_prefix),
        ("deployment.execution_role", &deployment.execution_role),
        ("deployment.variant_name", &deployment.variant_name),
        ("deployment.instance_type", &deployment.instance_type),
        ("trigger.bucket", &config.trigger.bucket),
        ("trigger.object_key", &config.trigger.object_key),
        ("trigger.model_family", &config.trigger.model_family),
    ] {
        if value.trim().is_empty() {
            return Err(invalid(&format!("{} cannot be empty", field)));
        }
    }

    if deployment.instance_count == 0 {
        return Err(invalid("deployment.instance_count must be at least 1"));
    }

    if !(deployment.variant_weight > 0.0) {
        return Err(invalid("deployment.variant_weight must be positive"));
    }

    if deployment.poll_interval_ms == 0 {
        return Err(invalid("deployment.poll_interval_ms cannot be 0"));
    }

    if deployment.convergence_timeout_secs > MAX_CONVERGENCE_TIMEOUT.as_secs() {
        return Err(invalid(&format!(
            "deployment.convergence_timeout_secs cannot exceed {}",
            MAX_CONVERGENCE_TIMEOUT.as_secs()
        )));
    }

    if deployment.poll_interval_ms >= deployment.convergence_timeout_secs.saturating_mul(1000) {
        return Err(invalid(
            "deployment.poll_interval_ms must be shorter than deployment.convergence_timeout_secs",
        ));
    }

    for (field, url) in [
        ("control_plane.url", &config.control_plane.url),
        ("coordinator.url", &config.coordinator.url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid(&format!("{} must be an http(s) URL", field)));
        }
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
