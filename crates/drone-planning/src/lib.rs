//! # UAV Path Planning
//!
//! Pure, synchronous, deterministic planning algorithms used by the
//! mission dispatcher (C9):
//!
//! - [`dubins`] — minimum-length oriented paths under a curvature limit (C2).
//! - [`astar`] — shortest path on an 8-connected grid with obstacles (C3).
//! - [`coverage`] — lawnmower/spiral/sector waypoint generators (C4).
//!
//! None of these modules perform I/O; they are deliberately free of
//! `async`, logging, or persistence concerns so that the dispatcher can
//! call them synchronously inside its own task.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod astar;
pub mod coverage;
pub mod dubins;
pub mod error;

pub use error::{PlanningError, Result};
