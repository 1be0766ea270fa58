//! C8: the scheduler loop.
//!
//! Runs on a fixed tick (default 60s) and on demand whenever a fast-path
//! alert arrives. Never runs concurrently with itself: `tick` holds an
//! async mutex for its whole body (§4.8, single-runner invariant).

use std::sync::Arc;

use chrono::Utc;
use drone_bus::BusClient;
use drone_bus::topic::SATELLITE_ALERTS;
use drone_domain::{Alert, AlertSeverity, AlertStatus, TileStatus, Uav, UavStatus};
use drone_persistence::{AlertRepository, TileRepository};
use serde::Deserialize;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::alert_queue::AlertQueue;
use crate::config::SchedulerConfig;
use crate::dispatch::MissionDispatcher;
use crate::error::{OrchestratorError, Result};
use crate::fanout::FanoutHub;
use crate::registry::UavRegistry;

#[derive(Debug, Deserialize)]
struct IncomingAlert {
    #[serde(default = "Uuid::new_v4")]
    alert_id: Uuid,
    tile_id: Uuid,
    event_type: String,
    priority: i32,
    confidence: f32,
    latitude: f64,
    longitude: f64,
    severity: AlertSeverity,
    #[serde(default)]
    metadata: serde_json::Value,
}

impl IncomingAlert {
    fn into_alert(self) -> Alert {
        Alert {
            alert_id: self.alert_id,
            tile_id: self.tile_id,
            event_type: self.event_type,
            confidence: self.confidence,
            severity: self.severity,
            priority: self.priority,
            position: drone_domain::Coordinates::new(self.latitude, self.longitude, 0.0),
            status: AlertStatus::New,
            metadata: self.metadata,
            demotion_count: 0,
            created_at: Utc::now(),
        }
    }
}

pub struct Scheduler {
    config: SchedulerConfig,
    queue: Arc<AlertQueue>,
    registry: Arc<UavRegistry>,
    tiles: Arc<dyn TileRepository>,
    alerts: Arc<dyn AlertRepository>,
    dispatcher: Arc<MissionDispatcher>,
    bus: Arc<dyn BusClient>,
    hub: Arc<FanoutHub>,
    fast_path_tx: mpsc::Sender<()>,
    tick_lock: Mutex<()>,
}

impl Scheduler {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SchedulerConfig,
        queue: Arc<AlertQueue>,
        registry: Arc<UavRegistry>,
        tiles: Arc<dyn TileRepository>,
        alerts: Arc<dyn AlertRepository>,
        dispatcher: Arc<MissionDispatcher>,
        bus: Arc<dyn BusClient>,
        hub: Arc<FanoutHub>,
    ) -> (Arc<Self>, mpsc::Receiver<()>) {
        let (fast_path_tx, fast_path_rx) = mpsc::channel(16);
        let scheduler = Arc::new(Self {
            config,
            queue,
            registry,
            tiles,
            alerts,
            dispatcher,
            bus,
            hub,
            fast_path_tx,
            tick_lock: Mutex::new(()),
        });
        (scheduler, fast_path_rx)
    }

    /// Drive the tick loop: fixed interval, plus a fast-path wake whenever a
    /// high-severity alert is ingested.
    pub async fn run(self: Arc<Self>, mut fast_path_rx: mpsc::Receiver<()>) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                maybe = fast_path_rx.recv() => {
                    if maybe.is_none() {
                        break;
                    }
                }
            }
            if let Err(err) = self.tick().await {
                tracing::warn!(%err, "scheduler tick failed");
            }
        }
    }

    /// Subscribe to `satellite/alerts`, persisting and enqueuing every
    /// incoming alert, triggering the fast path for high-severity ones.
    pub fn spawn_alert_ingest(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut sub = match this.bus.subscribe(SATELLITE_ALERTS).await {
                Ok(sub) => sub,
                Err(err) => {
                    tracing::error!(%err, "failed to subscribe to satellite/alerts");
                    return;
                }
            };
            while let Some(msg) = sub.recv().await {
                if let Err(err) = this.handle_incoming_alert(msg.payload).await {
                    tracing::warn!(%err, "dropping malformed alert payload");
                }
            }
        })
    }

    async fn handle_incoming_alert(&self, payload: serde_json::Value) -> Result<()> {
        let incoming: IncomingAlert = serde_json::from_value(payload)
            .map_err(|e| OrchestratorError::ProtocolViolation(e.to_string()))?;
        let alert = incoming.into_alert();
        self.alerts.create(&alert).await?;
        self.hub.publish_alert(&alert);
        let fast_path = alert.severity >= self.config.fast_path_min_severity;
        self.queue.offer(alert)?;
        if fast_path {
            let _ = self.fast_path_tx.try_send(());
        }
        Ok(())
    }

    /// One scheduling cycle (§4.8 steps 1-7).
    pub async fn tick(&self) -> Result<()> {
        let _guard = self.tick_lock.lock().await;

        self.expire_stale_alerts().await?;
        self.sweep_fleet_health().await?;

        let pending = self.queue.poll(self.config.poll_batch_k);
        let candidates = self
            .registry
            .candidates(|u| u.status == UavStatus::Available && u.battery_pct >= self.config.min_battery_pct)
            .await;

        let mut unmatched = Vec::new();
        for alert in pending {
            match self.match_alert(&alert, &candidates).await {
                Ok(true) => {}
                Ok(false) => unmatched.push(alert),
                Err(err) => {
                    tracing::warn!(%err, alert_id = %alert.alert_id, "failed to match alert this tick");
                    unmatched.push(alert);
                }
            }
        }
        for alert in unmatched {
            self.queue.offer(alert)?;
        }
        Ok(())
    }

    async fn expire_stale_alerts(&self) -> Result<()> {
        let cutoff = Utc::now() - self.config.alert_ttl;
        let expired = self.queue.expire_older_than(cutoff);
        for alert in expired {
            self.alerts.update_status(alert.alert_id, AlertStatus::Expired).await?;
        }
        Ok(())
    }

    /// Charge UAVs that dropped below the low-battery threshold, and
    /// quarantine UAVs that have gone silent past the comm timeout.
    async fn sweep_fleet_health(&self) -> Result<()> {
        let now = Utc::now();
        let fleet = self.registry.snapshot().await;
        for uav in fleet {
            if uav.status == UavStatus::Unreachable {
                continue;
            }
            let silent_for = now.signed_duration_since(uav.last_seen);
            #[allow(clippy::cast_possible_wrap)]
            let comm_timeout = chrono::Duration::seconds(self.config.comm_timeout.as_secs() as i64);
            if silent_for > comm_timeout {
                self.quarantine_uav(&uav).await?;
                continue;
            }
            if uav.battery_pct < self.config.low_battery_charge_threshold && uav.status == UavStatus::Available {
                self.registry
                    .update(uav.uav_id, |u| u.status = UavStatus::Charging)
                    .await?;
            }
        }
        Ok(())
    }

    async fn quarantine_uav(&self, uav: &Uav) -> Result<()> {
        tracing::warn!(uav_id = %uav.uav_id, "uav comm timeout exceeded, quarantining");
        let mission_id = uav.current_mission_id;
        self.registry
            .update(uav.uav_id, |u| {
                u.status = UavStatus::Unreachable;
                u.current_mission_id = None;
            })
            .await?;
        if mission_id.is_some() {
            self.hub.publish_system_status(serde_json::json!({
                "event": "uav_unreachable",
                "uav_id": uav.uav_id,
            }));
        }
        Ok(())
    }

    /// Attempt to assign `alert` to the nearest eligible candidate. Returns
    /// `Ok(true)` on success, `Ok(false)` if no candidate could be secured.
    async fn match_alert(&self, alert: &Alert, candidates: &[Uav]) -> Result<bool> {
        let ranked = rank_candidates(alert, candidates);

        for candidate in ranked {
            let uav_id = candidate.uav_id;
            let uav_position = candidate.position;
            let mission_id = Uuid::new_v4();
            let mut assigned = false;
            self.registry
                .update(uav_id, |u| {
                    if u.status == UavStatus::Available && u.battery_pct >= self.config.min_battery_pct {
                        u.status = UavStatus::Assigned;
                        u.current_mission_id = Some(mission_id);
                        assigned = true;
                    }
                })
                .await?;
            if !assigned {
                continue;
            }

            self.tiles.update_status(alert.tile_id, TileStatus::Investigating).await?;
            self.alerts.update_status(alert.alert_id, AlertStatus::Assigned).await?;
            self.dispatcher
                .dispatch(mission_id, uav_id, uav_position, alert.clone())
                .await?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// §4.8 step 3: nearest-by-Haversine first, ties broken by higher battery,
/// then by lower UAV identifier.
fn rank_candidates<'a>(alert: &Alert, candidates: &'a [Uav]) -> Vec<&'a Uav> {
    let mut ranked: Vec<&Uav> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        let da = alert.position.distance_to_km(&a.position);
        let db = alert.position.distance_to_km(&b.position);
        da.total_cmp(&db)
            .then_with(|| b.battery_pct.total_cmp(&a.battery_pct))
            .then_with(|| a.uav_id.cmp(&b.uav_id))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use drone_domain::{AlertSeverity, AlertStatus, Coordinates};

    fn alert_at(lat: f64, lon: f64) -> Alert {
        Alert {
            alert_id: Uuid::new_v4(),
            tile_id: Uuid::new_v4(),
            event_type: "thermal".to_string(),
            confidence: 0.9,
            severity: AlertSeverity::High,
            priority: 8,
            position: Coordinates::new(lat, lon, 0.0),
            status: AlertStatus::New,
            metadata: serde_json::Value::Null,
            demotion_count: 0,
            created_at: Utc::now(),
        }
    }

    fn uav_at(lat: f64, lon: f64, battery: f32) -> Uav {
        Uav {
            uav_id: Uuid::new_v4(),
            name: "U".to_string(),
            position: Coordinates::new(lat, lon, 0.0),
            battery_pct: battery,
            status: UavStatus::Available,
            current_mission_id: None,
            last_seen: Utc::now(),
        }
    }

    #[test]
    fn ranks_nearest_uav_first() {
        let alert = alert_at(37.78, -122.42);
        let near = uav_at(37.7801, -122.4201, 80.0);
        let far = uav_at(38.5, -121.0, 95.0);
        let ranked = rank_candidates(&alert, &[far.clone(), near.clone()]);
        assert_eq!(ranked[0].uav_id, near.uav_id);
        assert_eq!(ranked[1].uav_id, far.uav_id);
    }

    #[test]
    fn ties_break_by_higher_battery_then_lower_id() {
        let alert = alert_at(0.0, 0.0);
        let mut a = uav_at(0.001, 0.001, 50.0);
        let mut b = uav_at(0.001, 0.001, 90.0);
        if a.uav_id > b.uav_id {
            std::mem::swap(&mut a, &mut b);
        }
        let ranked = rank_candidates(&alert, &[a.clone(), b.clone()]);
        assert_eq!(ranked[0].uav_id, b.uav_id, "higher battery wins the distance tie");
    }

    #[test]
    fn full_distance_and_battery_tie_breaks_by_uav_id() {
        let alert = alert_at(0.0, 0.0);
        let mut a = uav_at(1.0, 1.0, 70.0);
        let mut b = uav_at(1.0, 1.0, 70.0);
        if a.uav_id > b.uav_id {
            std::mem::swap(&mut a, &mut b);
        }
        let ranked = rank_candidates(&alert, &[b.clone(), a.clone()]);
        assert_eq!(ranked[0].uav_id, a.uav_id);
    }

    #[test]
    fn incoming_alert_parses_satellite_wire_shape() {
        let payload = serde_json::json!({
            "tile_id": Uuid::new_v4(),
            "event_type": "thermal",
            "priority": 8,
            "confidence": 0.92,
            "latitude": 37.78,
            "longitude": -122.42,
            "severity": "HIGH",
        });
        let incoming: IncomingAlert = serde_json::from_value(payload).unwrap();
        let alert = incoming.into_alert();
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.status, AlertStatus::New);
        assert_eq!(alert.demotion_count, 0);
    }
}
