//! # UAV Telemetry & Detection Tracking
//!
//! Per-target Kalman filtering ([`kalman`]) coupled to track lifecycle
//! management ([`track`]): the detection ingestor (C11) feeds observations
//! in, the scheduler and fan-out hub read smoothed position/velocity
//! estimates out.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod kalman;
pub mod track;

pub use kalman::KalmanFilter;
pub use track::{Track, TrackManager, TrackManagerConfig};
