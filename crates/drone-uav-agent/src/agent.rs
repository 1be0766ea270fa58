//! C13 capability-set contract shared by the simulated and real agents.
//!
//! Per spec.md §9's redesign note, the original sim/real inheritance
//! hierarchy becomes a single trait implemented by two variants selected
//! at startup — no runtime dispatch through a base class.

use async_trait::async_trait;
use drone_domain::{Coordinates, Waypoint, WaypointAction};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AgentError, Result};

/// A command received on `commands/<uav_id>` (§6).
#[derive(Debug, Clone)]
pub enum AgentCommand {
    Goto {
        mission_id: Uuid,
        waypoints: Vec<Waypoint>,
    },
    Return,
    Land,
    Abort,
}

#[derive(Debug, Deserialize)]
struct WireWaypoint {
    lat: f64,
    lon: f64,
    alt: f64,
    speed: Option<f32>,
    heading: Option<f32>,
    #[serde(default = "default_action")]
    action: WaypointAction,
}

fn default_action() -> WaypointAction {
    WaypointAction::Nav
}

impl From<WireWaypoint> for Waypoint {
    fn from(w: WireWaypoint) -> Self {
        Self {
            position: Coordinates::new(w.lat, w.lon, w.alt),
            speed_mps: w.speed,
            heading_deg: w.heading,
            action: w.action,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireCommand {
    mission_id: Option<Uuid>,
    command: String,
    #[serde(default)]
    waypoints: Vec<WireWaypoint>,
}

impl AgentCommand {
    /// Parse the `{mission_id, command, waypoints?}` payload published on
    /// `commands/<uav_id>` by the dispatcher (C9, §6).
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self> {
        let wire: WireCommand = serde_json::from_value(payload.clone())
            .map_err(|e| AgentError::ProtocolViolation(e.to_string()))?;
        match wire.command.as_str() {
            "goto" => {
                let Some(mission_id) = wire.mission_id else {
                    return Err(AgentError::ProtocolViolation(
                        "goto command missing mission_id".into(),
                    ));
                };
                if wire.waypoints.is_empty() {
                    return Err(AgentError::ProtocolViolation(
                        "goto command carries no waypoints".into(),
                    ));
                }
                Ok(Self::Goto {
                    mission_id,
                    waypoints: wire.waypoints.into_iter().map(Waypoint::from).collect(),
                })
            }
            "return" => Ok(Self::Return),
            "land" => Ok(Self::Land),
            "abort" => Ok(Self::Abort),
            other => Err(AgentError::ProtocolViolation(format!(
                "unknown command: {other}"
            ))),
        }
    }
}

/// Tuning shared by every agent variant.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub tick_interval: std::time::Duration,
    pub cruise_speed_mps: f32,
    pub waypoint_arrival_tolerance_m: f64,
    /// Battery drain per second while in `assigned`/`in_mission`, absent an
    /// explicit telemetry override (§8 supplemented feature:
    /// `simulate_battery_drain`).
    pub battery_drain_pct_per_s: f32,
    /// Probability that arriving at a `Scan` waypoint yields a synthetic
    /// detection.
    pub detection_probability: f64,
    pub comm_timeout: std::time::Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tick_interval: std::time::Duration::from_secs(1),
            cruise_speed_mps: 15.0,
            waypoint_arrival_tolerance_m: 25.0,
            battery_drain_pct_per_s: 0.015,
            detection_probability: 0.35,
            comm_timeout: std::time::Duration::from_secs(5 * 60),
        }
    }
}

/// The capability set every UAV variant exposes to the runner loop.
///
/// `tick` is the only method that advances simulated/real time; the
/// others are invoked directly in response to bus traffic.
#[async_trait]
pub trait UavAgent: Send + Sync {
    /// Idempotent; fail-soft on link/broker absence (§4.1, §4.13).
    async fn connect(&self) -> Result<()>;

    /// Begin executing a goto/return/land/abort command.
    async fn on_command(&self, command: AgentCommand) -> Result<()>;

    /// Advance one tick: interpolate motion, drain battery, publish
    /// telemetry, and emit synthetic detections on arrival (sim), or poll
    /// the flight-control link and forward attribute updates (real).
    async fn tick(&self) -> Result<()>;

    /// Current reported position, for callers that need a synchronous peek
    /// (e.g. the CLI's status line).
    async fn position(&self) -> Coordinates;
}
