//! # UAV Agent (C13)
//!
//! Two interchangeable vehicle implementations behind one capability-set
//! trait ([`agent::UavAgent`]): [`simulated::SimulatedAgent`] for
//! testing/demonstration and [`real::RealAgent`] documenting the
//! flight-controller link contract for a real vehicle. Both speak the
//! same `commands/<uav_id>` / `uav/<uav_id>/telemetry` /
//! `uav/<uav_id>/status` wire protocol as the scheduling core (§4.13,
//! §6).

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod error;
pub mod real;
pub mod simulated;

pub use agent::{AgentCommand, AgentConfig, UavAgent};
pub use error::{AgentError, Result};
pub use real::{FlightControllerLink, RealAgent, VehicleState};
pub use simulated::SimulatedAgent;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
