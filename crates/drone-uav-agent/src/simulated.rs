//! Simulated UAV agent: linear waypoint interpolation, proportional
//! battery drain, and synthetic detection emission on arrival (§4.13).
//!
//! Motion and noise-injection style is carried over from the teacher's
//! `drone-simulator::{flight, telemetry}` (interpolated heading, Gaussian
//! sensor noise), generalized from the 25-waypoint OPFOR strike profile
//! into the spec's goto/return/land/abort command set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use drone_bus::{BusClient, Topic};
use drone_domain::{Coordinates, UavStatus, Waypoint, WaypointAction};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::{AgentCommand, AgentConfig, UavAgent};
use crate::error::Result;

const DETECTION_CLASSES: &[&str] = &["person", "vehicle", "structure", "watercraft"];

struct AgentState {
    position: Coordinates,
    home: Coordinates,
    battery_pct: f32,
    status: UavStatus,
    heading_deg: f32,
    speed_mps: f32,
    mission_id: Option<Uuid>,
    waypoints: Vec<Waypoint>,
    next_waypoint_idx: usize,
}

/// A simulated vehicle: motion model, mission execution, synthetic
/// telemetry and detections, all driven by [`UavAgent::tick`].
pub struct SimulatedAgent {
    uav_id: Uuid,
    bus: Arc<dyn BusClient>,
    config: AgentConfig,
    state: Mutex<AgentState>,
    connected: AtomicBool,
}

impl SimulatedAgent {
    #[must_use]
    pub fn new(uav_id: Uuid, home: Coordinates, bus: Arc<dyn BusClient>, config: AgentConfig) -> Self {
        Self {
            uav_id,
            bus,
            config,
            state: Mutex::new(AgentState {
                position: home,
                home,
                battery_pct: 100.0,
                status: UavStatus::Available,
                heading_deg: 0.0,
                speed_mps: 0.0,
                mission_id: None,
                waypoints: Vec::new(),
                next_waypoint_idx: 0,
            }),
            connected: AtomicBool::new(false),
        }
    }

    async fn begin_transit(&self, destination: Coordinates, status: UavStatus) {
        let mut state = self.state.lock().await;
        state.status = status;
        state.waypoints = vec![Waypoint {
            position: destination,
            speed_mps: Some(self.config.cruise_speed_mps),
            heading_deg: None,
            action: WaypointAction::Rtb,
        }];
        state.next_waypoint_idx = 0;
    }

    async fn advance_motion(&self) -> Option<(Coordinates, Option<WaypointAction>, bool)> {
        let dt = self.config.tick_interval.as_secs_f64();
        let mut rng = rand::thread_rng();
        let mut state = self.state.lock().await;

        if !matches!(state.status, UavStatus::InMission | UavStatus::Returning) {
            return None;
        }

        // §3 invariant: battery is monotonically non-increasing while
        // in_mission/returning, absent an explicit recharge event.
        state.battery_pct = (state.battery_pct - self.config.battery_drain_pct_per_s * dt as f32).max(0.0);

        let Some(target) = state.waypoints.get(state.next_waypoint_idx).copied() else {
            return None;
        };

        let dist_m = state.position.distance_to_km(&target.position) * 1000.0;
        let arrived = dist_m <= self.config.waypoint_arrival_tolerance_m;

        if arrived {
            state.position = target.position;
            state.next_waypoint_idx += 1;
            let is_last = state.next_waypoint_idx >= state.waypoints.len();
            if is_last {
                if target.action == WaypointAction::Rtb {
                    state.status = UavStatus::Available;
                    state.mission_id = None;
                    state.waypoints.clear();
                    state.next_waypoint_idx = 0;
                    state.speed_mps = 0.0;
                }
            }
            return Some((target.position, Some(target.action), arrived));
        }

        let speed = f64::from(target.speed_mps.unwrap_or(self.config.cruise_speed_mps)).max(0.1);
        let step_m = speed * dt;
        let fraction = (step_m / dist_m).clamp(0.0, 1.0);
        let noise = Normal::new(0.0, 0.05).unwrap();
        let jitter = noise.sample(&mut rng).clamp(-0.2, 0.2);

        let next = lerp(state.position, target.position, (fraction + jitter * fraction).clamp(0.0, 1.0));
        state.heading_deg = bearing_deg(state.position, target.position);
        state.speed_mps = speed as f32;
        state.position = next;

        Some((next, None, false))
    }

    async fn maybe_emit_detection(&self, position: Coordinates) -> Result<()> {
        let mut rng = rand::thread_rng();
        if !rng.gen_bool(self.config.detection_probability) {
            return Ok(());
        }
        let (mission_id, uav_id) = {
            let state = self.state.lock().await;
            (state.mission_id, self.uav_id)
        };
        let object_class = DETECTION_CLASSES[rng.gen_range(0..DETECTION_CLASSES.len())];
        let confidence: f32 = rng.gen_range(0.3..0.99);
        let payload = serde_json::json!({
            "uav_id": uav_id,
            "mission_id": mission_id,
            "object_class": object_class,
            "confidence": confidence,
            "latitude": position.latitude,
            "longitude": position.longitude,
            "timestamp": Utc::now(),
        });
        self.bus.publish(drone_bus::topic::INFERENCE_RESULTS, payload).await?;
        debug!(%uav_id, object_class, confidence, "emitted synthetic detection");
        Ok(())
    }
}

#[async_trait]
impl UavAgent for SimulatedAgent {
    async fn connect(&self) -> Result<()> {
        self.bus.connect().await?;
        self.connected.store(true, Ordering::SeqCst);
        self.publish_status_event(true).await
    }

    async fn on_command(&self, command: AgentCommand) -> Result<()> {
        match command {
            AgentCommand::Goto { mission_id, waypoints } => {
                let mut state = self.state.lock().await;
                state.mission_id = Some(mission_id);
                state.waypoints = waypoints;
                state.next_waypoint_idx = 0;
                state.status = UavStatus::InMission;
                drop(state);
                info!(uav_id = %self.uav_id, %mission_id, "mission command accepted");
                self.publish_status_event(true).await?;
            }
            AgentCommand::Return | AgentCommand::Land => {
                let home = { self.state.lock().await.home };
                self.begin_transit(home, UavStatus::Returning).await;
                self.publish_status_event(true).await?;
            }
            AgentCommand::Abort => {
                let here = { self.state.lock().await.position };
                self.begin_transit(here, UavStatus::Returning).await;
                self.publish_status_event(true).await?;
            }
        }
        Ok(())
    }

    async fn tick(&self) -> Result<()> {
        if let Some((position, action, arrived)) = self.advance_motion().await {
            if arrived && action == Some(WaypointAction::Scan) {
                if let Err(err) = self.maybe_emit_detection(position).await {
                    warn!(%err, "failed to publish synthetic detection");
                }
            }
        }
        self.publish_telemetry().await?;
        Ok(())
    }

    async fn position(&self) -> Coordinates {
        self.state.lock().await.position
    }
}

impl SimulatedAgent {
    async fn publish_status_event(&self, connected: bool) -> Result<()> {
        let status = self.state.lock().await.status;
        let payload = serde_json::json!({
            "uav_id": self.uav_id,
            "status": status,
            "connected": connected,
        });
        self.bus.publish(&Topic::status(self.uav_id), payload).await?;
        Ok(())
    }

    async fn publish_telemetry(&self) -> Result<()> {
        let state = self.state.lock().await;
        let payload = serde_json::json!({
            "uav_id": self.uav_id,
            "latitude": state.position.latitude,
            "longitude": state.position.longitude,
            "altitude": state.position.altitude_m,
            "battery": state.battery_pct,
            "speed": state.speed_mps,
            "heading": state.heading_deg,
            "status": state.status,
            "timestamp": Utc::now(),
        });
        drop(state);
        self.bus
            .publish(&Topic::telemetry(self.uav_id), payload)
            .await?;
        Ok(())
    }
}

/// Linear lat/lon/alt interpolation between two points, `t` clamped to
/// `[0, 1]`. Adequate at the sub-kilometre leg lengths a mission waypoint
/// hop spans; matches the small-angle approximation used throughout
/// `drone-planning::coverage`.
fn lerp(from: Coordinates, to: Coordinates, t: f64) -> Coordinates {
    let t = t.clamp(0.0, 1.0);
    Coordinates::new(
        from.latitude + (to.latitude - from.latitude) * t,
        from.longitude + (to.longitude - from.longitude) * t,
        from.altitude_m + (to.altitude_m - from.altitude_m) * t,
    )
}

/// Initial bearing from `from` to `to`, degrees in `[0, 360)`.
fn bearing_deg(from: Coordinates, to: Coordinates) -> f32 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let bearing = y.atan2(x).to_degrees();
    ((bearing as f32) + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use drone_bus::InProcessBus;

    fn agent(bus: Arc<dyn BusClient>) -> SimulatedAgent {
        SimulatedAgent::new(
            Uuid::new_v4(),
            Coordinates::new(37.7749, -122.4194, 0.0),
            bus,
            AgentConfig {
                tick_interval: Duration::from_secs(1),
                ..AgentConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn goto_command_sets_in_mission_and_publishes_status() {
        let bus = Arc::new(InProcessBus::new());
        let a = agent(bus.clone());
        let uav_id = a.uav_id;
        let mut sub = bus.subscribe(&Topic::status(uav_id)).await.unwrap();

        a.on_command(AgentCommand::Goto {
            mission_id: Uuid::new_v4(),
            waypoints: vec![Waypoint {
                position: Coordinates::new(37.78, -122.42, 50.0),
                speed_mps: Some(10.0),
                heading_deg: None,
                action: WaypointAction::Nav,
            }],
        })
        .await
        .unwrap();

        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.payload["status"], "IN_MISSION");
    }

    #[tokio::test]
    async fn tick_moves_toward_target_and_drains_battery() {
        let bus = Arc::new(InProcessBus::new());
        let a = agent(bus);
        let start = a.position().await;

        a.on_command(AgentCommand::Goto {
            mission_id: Uuid::new_v4(),
            waypoints: vec![Waypoint {
                position: Coordinates::new(40.0, -120.0, 50.0),
                speed_mps: Some(50.0),
                heading_deg: None,
                action: WaypointAction::Nav,
            }],
        })
        .await
        .unwrap();

        a.tick().await.unwrap();
        let after = a.position().await;
        assert!(after.latitude != start.latitude || after.longitude != start.longitude);

        let battery = a.state.lock().await.battery_pct;
        assert!(battery < 100.0);
    }

    #[tokio::test]
    async fn arrival_at_rtb_waypoint_returns_to_available() {
        let bus = Arc::new(InProcessBus::new());
        let a = agent(bus);
        let home = a.position().await;

        a.on_command(AgentCommand::Return).await.unwrap();
        // Already at home: one tick should observe arrival immediately.
        a.tick().await.unwrap();

        let state = a.state.lock().await;
        assert_eq!(state.status, UavStatus::Available);
        assert_eq!(state.position, home);
    }

    #[test]
    fn bearing_is_zero_due_north() {
        let a = Coordinates::new(0.0, 0.0, 0.0);
        let b = Coordinates::new(1.0, 0.0, 0.0);
        assert!(bearing_deg(a, b).abs() < 1.0);
    }
}
