//! Reconciliation state machine.
//!
//! One attempt walks:
//!
//! ```text
//! Start -> ConfigCreated -> { EndpointAbsent | EndpointPresentIdle | EndpointPresentBusy }
//!       -> Converging -> { Converged | ConvergenceFailed }
//! ```
//!
//! `next_step` names the remote call the driver makes in a state and
//! `transition` folds its outcome into the next state. Both are pure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::control_plane::EndpointStatus;

use super::classify::EndpointFault;

/// How the endpoint was brought to the new configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Create,
    Update,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Create => "create",
            Branch::Update => "update",
        }
    }
}

/// Why the convergence wait ended without a healthy endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceFailure {
    TimedOut,
    Unhealthy,
}

/// Why an attempt stopped before reaching the convergence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The new endpoint configuration was rejected.
    ConfigurationRejected,
    /// A probe, create or update rejection that is neither absent nor busy.
    UnknownFault,
}

/// State of one reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    Start,
    ConfigCreated,
    EndpointAbsent,
    /// The endpoint exists and has not been seen busy.
    EndpointPresentIdle,
    /// An update was rejected because the endpoint is converging elsewhere.
    /// Terminal: another deployment owns the endpoint right now.
    EndpointPresentBusy,
    Converging(Branch),
    Converged(Branch),
    ConvergenceFailed(ConvergenceFailure),
    Aborted(AbortReason),
}

/// Remote call the driver makes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateConfig,
    ProbeEndpoint,
    CreateEndpoint,
    UpdateEndpoint,
    AwaitConvergence,
    Finished,
}

/// Result of the remote call made for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The request was accepted.
    Accepted,
    /// The probe found the endpoint.
    EndpointFound(EndpointStatus),
    /// The request was rejected; the fault is already classified.
    Rejected(EndpointFault),
    /// The endpoint reached `InService`.
    Healthy,
    /// The convergence wait ran out of time.
    TimedOut,
    /// The endpoint reached a failed status while waiting.
    Unhealthy,
}

/// An outcome that cannot follow the current state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid reconcile transition: {outcome:?} in state {from}")]
pub struct InvalidTransition {
    pub from: ReconcileState,
    pub outcome: StepOutcome,
}

impl ReconcileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileState::Start => "Start",
            ReconcileState::ConfigCreated => "ConfigCreated",
            ReconcileState::EndpointAbsent => "EndpointAbsent",
            ReconcileState::EndpointPresentIdle => "EndpointPresentIdle",
            ReconcileState::EndpointPresentBusy => "EndpointPresentBusy",
            ReconcileState::Converging(_) => "Converging",
            ReconcileState::Converged(_) => "Converged",
            ReconcileState::ConvergenceFailed(_) => "ConvergenceFailed",
            ReconcileState::Aborted(_) => "Aborted",
        }
    }

    /// The remote call to make in this state.
    pub fn next_step(&self) -> Step {
        match self {
            ReconcileState::Start => Step::CreateConfig,
            ReconcileState::ConfigCreated => Step::ProbeEndpoint,
            ReconcileState::EndpointAbsent => Step::CreateEndpoint,
            ReconcileState::EndpointPresentIdle => Step::UpdateEndpoint,
            ReconcileState::Converging(_) => Step::AwaitConvergence,
            ReconcileState::EndpointPresentBusy
            | ReconcileState::Converged(_)
            | ReconcileState::ConvergenceFailed(_)
            | ReconcileState::Aborted(_) => Step::Finished,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_step() == Step::Finished
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReconcileState::Converged(_))
    }

    /// Folds the outcome of this state's step into the next state.
    pub fn transition(self, outcome: StepOutcome) -> Result<ReconcileState, InvalidTransition> {
        use ReconcileState as S;
        use StepOutcome as O;

        let next = match (self, outcome) {
            (S::Start, O::Accepted) => S::ConfigCreated,
            (S::Start, O::Rejected(_)) => S::Aborted(AbortReason::ConfigurationRejected),

            (S::ConfigCreated, O::EndpointFound(_)) => S::EndpointPresentIdle,
            (S::ConfigCreated, O::Rejected(EndpointFault::Absent)) => S::EndpointAbsent,
            (S::ConfigCreated, O::Rejected(EndpointFault::Busy)) => S::EndpointPresentBusy,
            (S::ConfigCreated, O::Rejected(EndpointFault::Unknown)) => {
                S::Aborted(AbortReason::UnknownFault)
            }

            (S::EndpointAbsent, O::Accepted) => S::Converging(Branch::Create),
            (S::EndpointAbsent, O::Rejected(_)) => S::Aborted(AbortReason::UnknownFault),

            (S::EndpointPresentIdle, O::Accepted) => S::Converging(Branch::Update),
            (S::EndpointPresentIdle, O::Rejected(EndpointFault::Busy)) => S::EndpointPresentBusy,
            (S::EndpointPresentIdle, O::Rejected(EndpointFault::Absent)) => S::EndpointAbsent,
            (S::EndpointPresentIdle, O::Rejected(EndpointFault::Unknown)) => {
                S::Aborted(AbortReason::UnknownFault)
            }

            (S::Converging(branch), O::Healthy) => S::Converged(branch),
            (S::Converging(_), O::TimedOut) => S::ConvergenceFailed(ConvergenceFailure::TimedOut),
            (S::Converging(_), O::Unhealthy) => {
                S::ConvergenceFailed(ConvergenceFailure::Unhealthy)
            }
            (S::Converging(_), O::Rejected(_)) => S::Aborted(AbortReason::UnknownFault),

            (from, outcome) => return Err(InvalidTransition { from, outcome }),
        };

        Ok(next)
    }
}

impl std::fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileState::Converging(branch) | ReconcileState::Converged(branch) => {
                write!(f, "{}({})", self.as_str(), branch.as_str())
            }
            ReconcileState::ConvergenceFailed(failure) => {
                write!(f, "{}({:?})", self.as_str(), failure)
            }
            ReconcileState::Aborted(reason) => write!(f, "{}({:?})", self.as_str(), reason),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Renders the states visited by an attempt, e.g. `Start -> ConfigCreated -> ...`.
pub fn format_trail(trail: &[ReconcileState]) -> String {
    trail
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
