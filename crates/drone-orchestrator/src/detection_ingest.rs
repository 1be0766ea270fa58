//! C11: detection ingest.
//!
//! Subscribes to `detections` and `inference/results`, validates each
//! reading, persists it, associates it to the reporting UAV's current
//! mission, feeds it into C5's tracker, and forwards it to C12. Low
//! confidence detections are kept but not broadcast (§4.11).

use std::sync::{Arc, Mutex};

use chrono::Utc;
use drone_bus::BusClient;
use drone_bus::topic::{DETECTIONS, INFERENCE_RESULTS};
use drone_domain::{BoundingBox, Coordinates, Detection};
use drone_persistence::DetectionRepository;
use drone_tracking::{TrackManager, TrackManagerConfig};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::DetectionConfig;
use crate::error::{OrchestratorError, Result};
use crate::fanout::FanoutHub;
use crate::registry::UavRegistry;

#[derive(Debug, Deserialize)]
struct DetectionPayload {
    uav_id: Uuid,
    mission_id: Option<Uuid>,
    object_class: String,
    confidence: f32,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    bbox: Option<BoundingBox>,
}

impl DetectionPayload {
    fn into_detection(self, fallback_mission_id: Option<Uuid>) -> Detection {
        Detection {
            detection_id: Uuid::new_v4(),
            uav_id: self.uav_id,
            mission_id: self.mission_id.or(fallback_mission_id),
            object_class: self.object_class,
            confidence: self.confidence,
            position: Coordinates::new(self.latitude, self.longitude, 0.0),
            bbox: self.bbox,
            evidence_reference: None,
            created_at: Utc::now(),
        }
    }
}

pub struct DetectionIngestor {
    config: DetectionConfig,
    bus: Arc<dyn BusClient>,
    detections_repo: Arc<dyn DetectionRepository>,
    registry: Arc<UavRegistry>,
    hub: Arc<FanoutHub>,
    tracker: Mutex<TrackManager>,
}

impl DetectionIngestor {
    #[must_use]
    pub fn new(
        config: DetectionConfig,
        bus: Arc<dyn BusClient>,
        detections_repo: Arc<dyn DetectionRepository>,
        registry: Arc<UavRegistry>,
        hub: Arc<FanoutHub>,
    ) -> Self {
        Self {
            config,
            bus,
            detections_repo,
            registry,
            hub,
            tracker: Mutex::new(TrackManager::new(TrackManagerConfig::default())),
        }
    }

    pub async fn run(self: Arc<Self>) -> Result<()> {
        let this_a = Arc::clone(&self);
        let this_b = Arc::clone(&self);
        let (a, b) = tokio::join!(
            tokio::spawn(async move { this_a.subscribe_topic(DETECTIONS).await }),
            tokio::spawn(async move { this_b.subscribe_topic(INFERENCE_RESULTS).await }),
        );
        a.map_err(|e| OrchestratorError::ProtocolViolation(e.to_string()))??;
        b.map_err(|e| OrchestratorError::ProtocolViolation(e.to_string()))??;
        Ok(())
    }

    async fn subscribe_topic(&self, topic: &str) -> Result<()> {
        let mut sub = self.bus.subscribe(topic).await?;
        while let Some(msg) = sub.recv().await {
            if let Err(err) = self.handle(msg.payload).await {
                tracing::warn!(%err, "dropping malformed detection");
            }
        }
        Ok(())
    }

    async fn handle(&self, payload: serde_json::Value) -> Result<()> {
        let parsed: DetectionPayload = serde_json::from_value(payload)
            .map_err(|e| OrchestratorError::ProtocolViolation(e.to_string()))?;

        let fallback_mission_id = self
            .registry
            .get(parsed.uav_id)
            .await
            .and_then(|u| u.current_mission_id);
        let detection = parsed.into_detection(fallback_mission_id);

        if !detection.is_valid() {
            return Err(OrchestratorError::ProtocolViolation(format!(
                "detection {} failed validation (confidence={}, lat={}, lon={})",
                detection.detection_id,
                detection.confidence,
                detection.position.latitude,
                detection.position.longitude
            )));
        }

        self.detections_repo.insert(&detection).await?;

        {
            let mut tracker = self.tracker.lock().unwrap();
            tracker.observe(
                &detection.object_class,
                (detection.position.latitude, detection.position.longitude),
            );
        }

        if detection.confidence >= self.config.broadcast_confidence_threshold {
            self.hub.publish_detection(&detection);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_payload_parses_wire_shape_with_bbox() {
        let payload = serde_json::json!({
            "uav_id": Uuid::new_v4(),
            "mission_id": Uuid::new_v4(),
            "object_class": "person",
            "confidence": 0.77,
            "latitude": 37.78,
            "longitude": -122.42,
            "bbox": {"x": 10.0, "y": 20.0, "width": 5.0, "height": 6.0},
        });
        let parsed: DetectionPayload = serde_json::from_value(payload).unwrap();
        let detection = parsed.into_detection(None);
        assert!(detection.is_valid());
        assert!(detection.bbox.is_some());
    }

    #[test]
    fn detection_payload_falls_back_to_uav_current_mission() {
        let payload = serde_json::json!({
            "uav_id": Uuid::new_v4(),
            "object_class": "vehicle",
            "confidence": 0.4,
            "latitude": 0.0,
            "longitude": 0.0,
        });
        let parsed: DetectionPayload = serde_json::from_value(payload).unwrap();
        let fallback = Uuid::new_v4();
        let detection = parsed.into_detection(Some(fallback));
        assert_eq!(detection.mission_id, Some(fallback));
    }

    #[test]
    fn out_of_range_confidence_fails_validation() {
        let payload = serde_json::json!({
            "uav_id": Uuid::new_v4(),
            "object_class": "person",
            "confidence": 1.5,
            "latitude": 37.78,
            "longitude": -122.42,
        });
        let parsed: DetectionPayload = serde_json::from_value(payload).unwrap();
        let detection = parsed.into_detection(None);
        assert!(!detection.is_valid());
    }
}
