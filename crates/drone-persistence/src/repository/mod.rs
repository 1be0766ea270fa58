//! # Repository Module
//!
//! Repository pattern implementations for domain entity persistence.

pub mod scylla_impl;
pub mod traits;

pub use scylla_impl::{
    ScyllaAlertRepository, ScyllaClient, ScyllaConfig, ScyllaDetectionRepository,
    ScyllaMissionRepository, ScyllaTelemetryRepository, ScyllaTileRepository,
    ScyllaUavRepository, ScyllaUnitOfWork, ScyllaWaypointRepository, SharedScyllaClient,
    shared_scylla,
};
pub use traits::{
    AlertRepository, DetectionRepository, MissionRepository, TelemetryRepository,
    TileRepository, UavRepository, UnitOfWork, WaypointRepository,
};
