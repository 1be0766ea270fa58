//! Planning layer error types.

use thiserror::Error;

/// Errors raised when a planning request cannot be satisfied.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("no feasible Dubins family for the requested configuration")]
    DubinsInfeasible,

    #[error("A* found no path from start to goal")]
    AStarUnreachable,

    #[error("invalid planning parameters: {0}")]
    InvalidParameters(String),
}

pub type Result<T> = std::result::Result<T, PlanningError>;
