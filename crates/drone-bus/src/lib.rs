//! # Message Bus Client (C1)
//!
//! Topic-addressed publish/subscribe facade (§4.1) used by the bus
//! client, telemetry ingestor, detection ingestor, and UAV agents alike.
//! [`InProcessBus`] backs tests and the standalone simulator; the
//! `redis-backend` feature adds [`RedisBus`] for distributed deployments.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
#[cfg(feature = "redis-backend")]
pub mod redis_bus;
pub mod topic;

pub use client::{BusClient, BusMessage, BusSubscription, InProcessBus};
pub use error::{BusError, Result};
#[cfg(feature = "redis-backend")]
pub use redis_bus::RedisBus;
pub use topic::Topic;
