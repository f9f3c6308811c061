//! Per-invocation deployment context.

use std::sync::Mutex;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Format of the timestamp embedded in model and endpoint configuration names.
/// ISO-8601 with `-` in place of `:`, which resource names do not allow.
pub const RESOURCE_STAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Identity of one deployment attempt, threaded through every step.
#[derive(Debug, Clone, Serialize)]
pub struct DeployContext {
    /// Pipeline job this attempt reports to.
    pub job_id: String,
    /// Unique per attempt; distinguishes retries of the same job in logs.
    pub attempt_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Timestamp component shared by every resource this attempt creates.
    pub stamp: String,
    /// Identity the registered model executes as.
    pub execution_role: String,
}

impl DeployContext {
    pub fn new(
        job_id: impl Into<String>,
        execution_role: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            attempt_id: Uuid::new_v4(),
            started_at,
            stamp: resource_stamp(started_at),
            execution_role: execution_role.into(),
        }
    }

    /// Name of the model this attempt registers.
    pub fn model_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.stamp)
    }

    /// Name of the endpoint configuration this attempt creates.
    pub fn config_name(&self, endpoint_name: &str) -> String {
        format!("{}-config-{}", endpoint_name, self.stamp)
    }
}

/// Renders a time as a resource-name-safe stamp, e.g. `2024-03-01T12-30-05`.
pub fn resource_stamp(at: DateTime<Utc>) -> String {
    at.format(RESOURCE_STAMP_FORMAT).to_string()
}

/// Hands out attempt start times whose resource stamps never repeat within
/// the process: a second attempt in the same second is moved to the next one.
#[derive(Debug, Default)]
pub struct StampClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl StampClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(0);
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = match *last {
            Some(previous) if now <= previous => previous + chrono::Duration::seconds(1),
            _ => now,
        };
        *last = Some(next);
        next
    }
}
