//! Agent-side error types (§4.13, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("bus error: {0}")]
    Bus(#[from] drone_bus::BusError),

    #[error("malformed command: {0}")]
    ProtocolViolation(String),

    #[error("no flight-controller link configured")]
    NoLink,
}

pub type Result<T> = std::result::Result<T, AgentError>;
