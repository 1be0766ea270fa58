//! C10: telemetry ingest.
//!
//! Subscribes to `uav/+/telemetry`, updates C7 with the latest reported
//! position/battery/status, persists the sample, and notifies C9 of
//! waypoint arrivals. Drops timestamp regressions and coalesces bursts down
//! to the configured rate (§4.10).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use drone_bus::{BusClient, Topic};
use drone_domain::{Coordinates, TelemetrySample, UavStatus};
use drone_persistence::TelemetryRepository;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::TelemetryConfig;
use crate::dispatch::MissionDispatcher;
use crate::error::{OrchestratorError, Result};
use crate::fanout::FanoutHub;
use crate::registry::UavRegistry;

#[derive(Debug, Deserialize)]
struct TelemetryPayload {
    uav_id: Uuid,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    battery: f32,
    speed: f32,
    heading: f32,
    status: UavStatus,
    timestamp: DateTime<Utc>,
}

impl TelemetryPayload {
    fn into_sample(self) -> TelemetrySample {
        TelemetrySample {
            uav_id: self.uav_id,
            position: Coordinates::new(self.latitude, self.longitude, self.altitude),
            battery_pct: self.battery,
            speed_mps: self.speed,
            heading_deg: self.heading,
            status: self.status,
            recorded_at: self.timestamp,
        }
    }
}

pub struct TelemetryIngestor {
    config: TelemetryConfig,
    bus: Arc<dyn BusClient>,
    registry: Arc<UavRegistry>,
    telemetry_repo: Arc<dyn TelemetryRepository>,
    dispatcher: Arc<MissionDispatcher>,
    hub: Arc<FanoutHub>,
    last_timestamp: Mutex<HashMap<Uuid, DateTime<Utc>>>,
    last_applied_at: Mutex<HashMap<Uuid, Instant>>,
}

impl TelemetryIngestor {
    #[must_use]
    pub fn new(
        config: TelemetryConfig,
        bus: Arc<dyn BusClient>,
        registry: Arc<UavRegistry>,
        telemetry_repo: Arc<dyn TelemetryRepository>,
        dispatcher: Arc<MissionDispatcher>,
        hub: Arc<FanoutHub>,
    ) -> Self {
        Self {
            config,
            bus,
            registry,
            telemetry_repo,
            dispatcher,
            hub,
            last_timestamp: Mutex::new(HashMap::new()),
            last_applied_at: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run(self: Arc<Self>) -> Result<()> {
        let mut sub = self.bus.subscribe(Topic::telemetry_wildcard()).await?;
        while let Some(msg) = sub.recv().await {
            if let Err(err) = self.handle(msg.payload).await {
                tracing::warn!(%err, "dropping telemetry sample");
            }
        }
        Ok(())
    }

    async fn handle(&self, payload: serde_json::Value) -> Result<()> {
        let parsed: TelemetryPayload = serde_json::from_value(payload)
            .map_err(|e| OrchestratorError::ProtocolViolation(e.to_string()))?;
        let sample = parsed.into_sample();

        if !self.is_monotonic(sample.uav_id, sample.recorded_at) {
            return Ok(());
        }
        if self.is_rate_limited(sample.uav_id) {
            return Ok(());
        }

        self.telemetry_repo.insert(&sample).await?;

        let updated = self
            .registry
            .update(sample.uav_id, |u| {
                u.position = sample.position;
                u.battery_pct = sample.battery_pct;
                u.status = sample.status;
                u.last_seen = sample.recorded_at;
            })
            .await?;

        if let Some(uav) = updated {
            if let Some(mission_id) = uav.current_mission_id {
                self.dispatcher
                    .on_telemetry(
                        mission_id,
                        sample.position,
                        sample.status,
                        self.config.waypoint_arrival_tolerance_m,
                    )
                    .await?;
            }
        }

        self.hub.publish_telemetry(&sample);
        Ok(())
    }

    fn is_monotonic(&self, uav_id: Uuid, recorded_at: DateTime<Utc>) -> bool {
        let mut last = self.last_timestamp.lock().unwrap();
        match last.get(&uav_id) {
            Some(prev) if recorded_at <= *prev => false,
            _ => {
                last.insert(uav_id, recorded_at);
                true
            }
        }
    }

    fn is_rate_limited(&self, uav_id: Uuid) -> bool {
        let min_gap = Duration::from_secs_f64(1.0 / self.config.rate_limit_hz.max(0.001));
        let mut last_applied = self.last_applied_at.lock().unwrap();
        let now = Instant::now();
        match last_applied.get(&uav_id) {
            Some(prev) if now.duration_since(*prev) < min_gap => true,
            _ => {
                last_applied.insert(uav_id, now);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_payload_parses_wire_shape() {
        let json = serde_json::json!({
            "uav_id": Uuid::new_v4(),
            "latitude": 37.77,
            "longitude": -122.42,
            "altitude": 50.0,
            "battery": 88.0,
            "speed": 12.0,
            "heading": 180.0,
            "status": "AVAILABLE",
            "timestamp": Utc::now(),
        });
        let parsed: TelemetryPayload = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.status, UavStatus::Available);
    }
}
