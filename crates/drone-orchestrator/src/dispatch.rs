//! C9: mission dispatch.
//!
//! Given an assigned `(uav, alert, mission_id)` triple, builds a waypoint
//! plan, persists the mission, publishes the flight command, and arms a
//! watchdog. Also owns the mission status machine transitions driven by
//! telemetry (§4.9).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use drone_bus::{BusClient, Topic};
use drone_domain::{Alert, AlertStatus, Coordinates, Mission, MissionStatus, TileStatus, Waypoint, WaypointAction};
use drone_persistence::{AlertRepository, MissionRepository, TileRepository, WaypointRepository};
use drone_planning::coverage;
use drone_planning::dubins::{self, Pose2D};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::alert_queue::AlertQueue;
use crate::config::DispatchConfig;
use crate::error::Result;
use crate::fanout::FanoutHub;
use crate::registry::UavRegistry;

pub struct MissionDispatcher {
    config: DispatchConfig,
    missions: Arc<dyn MissionRepository>,
    waypoints_repo: Arc<dyn WaypointRepository>,
    tiles: Arc<dyn TileRepository>,
    alerts: Arc<dyn AlertRepository>,
    bus: Arc<dyn BusClient>,
    registry: Arc<UavRegistry>,
    queue: Arc<AlertQueue>,
    hub: Arc<FanoutHub>,
    /// Per-mission watchdog-relevant waypoint count, used by telemetry
    /// ingest to recognise arrival at the final waypoint.
    active_missions: Mutex<std::collections::HashMap<Uuid, ActiveMission>>,
}

#[derive(Clone)]
struct ActiveMission {
    uav_id: Uuid,
    alert_id: Uuid,
    tile_id: Uuid,
    waypoints: Vec<Waypoint>,
    next_waypoint_idx: usize,
}

impl MissionDispatcher {
    #[must_use]
    pub fn new(
        config: DispatchConfig,
        missions: Arc<dyn MissionRepository>,
        waypoints_repo: Arc<dyn WaypointRepository>,
        tiles: Arc<dyn TileRepository>,
        alerts: Arc<dyn AlertRepository>,
        bus: Arc<dyn BusClient>,
        registry: Arc<UavRegistry>,
        queue: Arc<AlertQueue>,
        hub: Arc<FanoutHub>,
    ) -> Self {
        Self {
            config,
            missions,
            waypoints_repo,
            tiles,
            alerts,
            bus,
            registry,
            queue,
            hub,
            active_missions: Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn build_plan(&self, uav_position: Coordinates, alert: &Alert) -> Option<Vec<Waypoint>> {
        let start = Pose2D::new(0.0, 0.0, 0.0);
        let (dx_m, dy_m) = local_offset_m(uav_position, alert.position);
        let bearing = dy_m.atan2(dx_m);
        let goal = Pose2D::new(dx_m, dy_m, bearing);

        // Confirms the transit is geometrically feasible under the UAV's
        // minimum turn radius; the actual leg is flown direct (the coverage
        // pattern below supplies the fine-grained waypoints).
        dubins::shortest_path(start, goal, self.config.turn_radius_m)?;

        let mut plan = vec![Waypoint {
            position: alert.position,
            speed_mps: Some(self.config.cruise_speed_mps),
            heading_deg: None,
            action: WaypointAction::Nav,
        }];

        let pattern = if alert.event_type.eq_ignore_ascii_case("survey") {
            coverage::lawnmower(
                alert.position,
                2.0 * self.config.sector_scan_radius_m,
                2.0 * self.config.sector_scan_radius_m,
                self.config.lawnmower_row_spacing_m,
                self.config.default_altitude_m,
            )
        } else {
            coverage::sector_scan(
                alert.position,
                self.config.sector_scan_radius_m,
                0.0,
                std::f64::consts::TAU,
                8,
                self.config.default_altitude_m,
            )
        };
        plan.extend(pattern);
        plan.push(Waypoint {
            position: alert.position,
            speed_mps: Some(self.config.cruise_speed_mps),
            heading_deg: None,
            action: WaypointAction::Rtb,
        });
        Some(plan)
    }

    fn estimate_duration_s(&self, uav_position: Coordinates, waypoints: &[Waypoint]) -> u32 {
        let mut total_km = uav_position.distance_to_km(&waypoints[0].position);
        for pair in waypoints.windows(2) {
            total_km += pair[0].position.distance_to_km(&pair[1].position);
        }
        let total_m = total_km * 1000.0;
        let speed = f64::from(self.config.cruise_speed_mps).max(0.1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let seconds = (total_m / speed).ceil() as u32;
        seconds.max(1)
    }

    /// Build, persist, and dispatch a mission for `alert` to `uav_id`.
    ///
    /// On [`drone_planning::PlanningError`]-equivalent infeasibility (no
    /// waypoint plan found), the mission is never created: the UAV is freed
    /// and the alert is demoted back into the queue (§7 PlanningInfeasible).
    pub async fn dispatch(
        &self,
        mission_id: Uuid,
        uav_id: Uuid,
        uav_position: Coordinates,
        alert: Alert,
    ) -> Result<()> {
        let Some(waypoints) = self.build_plan(uav_position, &alert) else {
            self.fail_planning(uav_id, alert).await?;
            return Ok(());
        };

        let estimated_duration_s = self.estimate_duration_s(uav_position, &waypoints);
        let mission = Mission {
            mission_id,
            uav_id,
            tile_id: alert.tile_id,
            alert_id: alert.alert_id,
            priority: alert.priority,
            waypoints: waypoints.clone(),
            status: MissionStatus::Assigned,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            estimated_duration_s,
            actual_duration_s: None,
        };

        self.missions.create(&mission).await?;
        self.waypoints_repo
            .replace_for_mission(mission_id, &waypoints)
            .await?;
        self.hub.publish_mission_update(&mission);

        {
            let mut active = self.active_missions.lock().await;
            active.insert(
                mission_id,
                ActiveMission {
                    uav_id,
                    alert_id: alert.alert_id,
                    tile_id: alert.tile_id,
                    waypoints: waypoints.clone(),
                    next_waypoint_idx: 0,
                },
            );
        }

        let payload = serde_json::json!({
            "mission_id": mission_id,
            "command": "goto",
            "waypoints": waypoints.iter().map(waypoint_to_wire).collect::<Vec<_>>(),
        });
        self.bus.publish(&Topic::commands(uav_id), payload).await?;

        self.arm_watchdog(mission_id, estimated_duration_s);
        Ok(())
    }

    async fn fail_planning(&self, uav_id: Uuid, alert: Alert) -> Result<()> {
        tracing::warn!(uav_id = %uav_id, alert_id = %alert.alert_id, "no feasible plan; freeing uav");
        self.registry
            .update(uav_id, |u| {
                u.status = drone_domain::UavStatus::Available;
                u.current_mission_id = None;
            })
            .await?;
        self.demote_alert(alert).await
    }

    async fn demote_alert(&self, mut alert: Alert) -> Result<()> {
        let demotion_count = self.alerts.increment_demotion_count(alert.alert_id).await?;
        if demotion_count + 1 >= self.config.max_demotions {
            self.alerts
                .update_status(alert.alert_id, AlertStatus::FalsePositive)
                .await?;
            return Ok(());
        }
        alert.status = AlertStatus::Queued;
        alert.demotion_count = demotion_count + 1;
        self.alerts
            .update_status(alert.alert_id, AlertStatus::Queued)
            .await?;
        self.queue.offer(alert)?;
        Ok(())
    }

    fn arm_watchdog(&self, mission_id: Uuid, estimated_duration_s: u32) {
        let watchdog_s = (estimated_duration_s.saturating_mul(2)).clamp(60, 2 * 60 * 60);
        let missions = Arc::clone(&self.missions);
        let alerts = Arc::clone(&self.alerts);
        let registry = Arc::clone(&self.registry);
        let queue = Arc::clone(&self.queue);
        let hub = Arc::clone(&self.hub);
        let max_demotions = self.config.max_demotions;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(u64::from(watchdog_s))).await;
            let Ok(Some(mission)) = missions.get_by_id(mission_id).await else {
                return;
            };
            if matches!(
                mission.status,
                MissionStatus::Completed | MissionStatus::Failed | MissionStatus::Aborted
            ) {
                return;
            }
            tracing::warn!(%mission_id, "mission watchdog expired");
            let _ = missions
                .update_status(mission_id, MissionStatus::Failed, mission.started_at, Some(Utc::now()), None)
                .await;
            if let Ok(Some(failed)) = missions.get_by_id(mission_id).await {
                hub.publish_mission_update(&failed);
            }
            let _ = registry
                .update(mission.uav_id, |u| {
                    u.status = drone_domain::UavStatus::Available;
                    u.current_mission_id = None;
                })
                .await;
            if let Ok(Some(alert)) = alerts.get_by_id(mission.alert_id).await {
                let demotion_count = alerts.increment_demotion_count(alert.alert_id).await.unwrap_or(alert.demotion_count);
                if demotion_count + 1 < max_demotions {
                    let _ = alerts.update_status(alert.alert_id, AlertStatus::Queued).await;
                    let _ = queue.offer(alert);
                } else {
                    let _ = alerts
                        .update_status(alert.alert_id, AlertStatus::FalsePositive)
                        .await;
                }
            }
        });
    }

    /// Called by the telemetry ingestor when a UAV reports a status/position
    /// update while it holds `mission_id`. Drives assigned→active and
    /// active→completed transitions (§4.9).
    pub async fn on_telemetry(
        &self,
        mission_id: Uuid,
        uav_position: Coordinates,
        uav_status: drone_domain::UavStatus,
        arrival_tolerance_m: f64,
    ) -> Result<()> {
        let mut active = self.active_missions.lock().await;
        let Some(state) = active.get_mut(&mission_id) else {
            return Ok(());
        };

        if uav_status == drone_domain::UavStatus::InMission {
            if let Ok(Some(mission)) = self.missions.get_by_id(mission_id).await {
                if mission.status == MissionStatus::Assigned {
                    self.missions
                        .update_status(mission_id, MissionStatus::Active, Some(Utc::now()), None, None)
                        .await?;
                    if let Ok(Some(active_mission)) = self.missions.get_by_id(mission_id).await {
                        self.hub.publish_mission_update(&active_mission);
                    }
                }
            }
        }

        if let Some(next) = state.waypoints.get(state.next_waypoint_idx) {
            let dist_m = uav_position.distance_to_km(&next.position) * 1000.0;
            if dist_m <= arrival_tolerance_m {
                state.next_waypoint_idx += 1;
            }
        }

        let reached_last = state.next_waypoint_idx >= state.waypoints.len();
        let completed = reached_last && uav_status == drone_domain::UavStatus::Available;
        drop(active);
        if completed {
            self.complete_mission(mission_id).await?;
        }
        Ok(())
    }

    async fn complete_mission(&self, mission_id: Uuid) -> Result<()> {
        let mut active = self.active_missions.lock().await;
        let Some(state) = active.remove(&mission_id) else {
            return Ok(());
        };
        drop(active);

        self.missions
            .update_status(mission_id, MissionStatus::Completed, None, Some(Utc::now()), None)
            .await?;
        if let Ok(Some(completed)) = self.missions.get_by_id(mission_id).await {
            self.hub.publish_mission_update(&completed);
        }
        self.alerts
            .update_status(state.alert_id, AlertStatus::Verified)
            .await?;
        self.tiles
            .update_status(state.tile_id, TileStatus::Monitored)
            .await?;
        Ok(())
    }
}

fn waypoint_to_wire(wp: &Waypoint) -> serde_json::Value {
    serde_json::json!({
        "lat": wp.position.latitude,
        "lon": wp.position.longitude,
        "alt": wp.position.altitude_m,
        "speed": wp.speed_mps,
        "heading": wp.heading_deg,
        "action": wp.action,
    })
}

/// Local tangent-plane offset in meters from `origin` to `target`, East/North.
fn local_offset_m(origin: Coordinates, target: Coordinates) -> (f64, f64) {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let lat_rad = origin.latitude.to_radians();
    let dlat = (target.latitude - origin.latitude).to_radians();
    let dlon = (target.longitude - origin.longitude).to_radians();
    let north = dlat * EARTH_RADIUS_M;
    let east = dlon * EARTH_RADIUS_M * lat_rad.cos();
    (east, north)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_offset_is_zero_at_origin() {
        let origin = Coordinates::default();
        let (e, n) = local_offset_m(origin, origin);
        assert!(e.abs() < 1e-9);
        assert!(n.abs() < 1e-9);
    }
}
