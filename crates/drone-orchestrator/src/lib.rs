//! # Drone Orchestrator
//!
//! The alert-to-mission scheduling core (C6-C12): a bounded priority queue
//! of pending alerts, the live UAV registry, the scheduler loop that pairs
//! them, the mission dispatcher that turns a pairing into a flight plan,
//! the telemetry/detection ingestors that keep the registry and tracker
//! current, and the subscriber fan-out hub that exposes all of it over a
//! websocket.
//!
//! ```text
//! ┌──────────────┐   satellite/alerts   ┌───────────────┐
//! │  Scheduler   │◄─────────────────────┤  Message Bus  │
//! │  (C8, tick)  │                      └───────┬───────┘
//! └──────┬───────┘                              │
//!        │ match                      uav/+/telemetry, detections
//!        ▼                                      │
//! ┌──────────────┐     commands/<uav_id>  ┌──────▼────────┐
//! │  Dispatcher  │────────────────────────►  Ingestors    │
//! │  (C9)        │                        │  (C10, C11)   │
//! └──────────────┘                        └──────┬────────┘
//!                                                 │
//!                                          ┌──────▼────────┐
//!                                          │  Fan-out (C12)│
//!                                          └───────────────┘
//! ```
//!
//! This crate intentionally exposes only a `/health` endpoint and the
//! websocket subscription route; it owns no public CRUD API of its own.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alert_queue;
pub mod config;
pub mod detection_ingest;
pub mod dispatch;
pub mod error;
pub mod fanout;
pub mod registry;
pub mod scheduler;
pub mod telemetry_ingest;

pub use alert_queue::AlertQueue;
pub use config::Config;
pub use detection_ingest::DetectionIngestor;
pub use dispatch::MissionDispatcher;
pub use error::{ErrorKind, OrchestratorError, Result};
pub use fanout::{Channel, FanoutHub};
pub use registry::UavRegistry;
pub use scheduler::Scheduler;
pub use telemetry_ingest::TelemetryIngestor;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
