//! Error taxonomy for the scheduling core (§7).
//!
//! Every fallible path in this crate resolves to one of six [`ErrorKind`]s.
//! The kind determines the recovery policy a caller applies; the variant
//! carries whatever context is useful for logging.

use thiserror::Error;
use uuid::Uuid;

/// Recovery class an [`OrchestratorError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bus/DB hiccup. Caller retries with exponential backoff, then warns.
    TransientExternal,
    /// A* or Dubins found no feasible path. Mission fails, alert demotes.
    PlanningInfeasible,
    /// Capacity exhausted (queue full, no eligible UAV). Alert stays queued.
    ResourceExhaustion,
    /// Malformed wire payload. Dropped with a structured log, worker survives.
    ProtocolViolation,
    /// A domain invariant broke. UAV is quarantined, mission failed.
    StateInvariant,
    /// Unrecoverable startup failure. Process exits non-zero.
    Fatal,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("bus error: {0}")]
    Bus(#[from] drone_bus::BusError),

    #[error("persistence error: {0}")]
    Persistence(#[from] drone_persistence::PersistenceError),

    #[error("planning error: {0}")]
    Planning(#[from] drone_planning::PlanningError),

    #[error("alert queue at capacity ({capacity})")]
    QueueFull { capacity: usize },

    #[error("no eligible UAV available for alert {alert_id}")]
    NoEligibleUav { alert_id: Uuid },

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("state invariant violated: {0}")]
    StateInvariant(String),

    #[error("fatal startup error: {0}")]
    Fatal(String),
}

impl OrchestratorError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Bus(_) | Self::Persistence(_) => ErrorKind::TransientExternal,
            Self::Planning(_) => ErrorKind::PlanningInfeasible,
            Self::QueueFull { .. } | Self::NoEligibleUav { .. } => ErrorKind::ResourceExhaustion,
            Self::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            Self::StateInvariant(_) => ErrorKind::StateInvariant,
            Self::Fatal(_) => ErrorKind::Fatal,
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_full_classifies_as_resource_exhaustion() {
        let err = OrchestratorError::QueueFull { capacity: 10 };
        assert_eq!(err.kind(), ErrorKind::ResourceExhaustion);
    }

    #[test]
    fn planning_error_classifies_as_planning_infeasible() {
        let err = OrchestratorError::Planning(drone_planning::PlanningError::DubinsInfeasible);
        assert_eq!(err.kind(), ErrorKind::PlanningInfeasible);
    }
}
