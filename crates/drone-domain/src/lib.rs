//! # UAV Fleet Domain Model
//!
//! Core domain entities, value objects, and enums for the alert-response UAV
//! fleet. These types are the single source of truth across the planning,
//! tracking, bus, persistence, and orchestration crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// Geographic position, WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self {
            latitude: lat,
            longitude: lon,
            altitude_m: alt,
        }
    }

    /// Great-circle distance to another point, in kilometres (Haversine).
    #[must_use]
    pub fn distance_to_km(&self, other: &Coordinates) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }
}

impl Default for Coordinates {
    fn default() -> Self {
        // Default to San Francisco, matching the bootstrap tile grid.
        Self {
            latitude: 37.7749,
            longitude: -122.4194,
            altitude_m: 0.0,
        }
    }
}

// =============================================================================
// ENUMS
// =============================================================================

/// Tile monitoring status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileStatus {
    Unmonitored,
    Monitored,
    Investigating,
}

/// UAV operational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UavStatus {
    Available,
    Assigned,
    InMission,
    Returning,
    Charging,
    Unreachable,
}

impl UavStatus {
    /// True when this status is consistent with a non-null mission
    /// reference, per the §3 registry invariant.
    #[must_use]
    pub fn allows_mission(&self) -> bool {
        matches!(self, Self::Assigned | Self::InMission | Self::Returning)
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Alert lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    New,
    Queued,
    Assigned,
    Investigating,
    Verified,
    FalsePositive,
    Expired,
}

/// Mission lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    Pending,
    Assigned,
    Active,
    Completed,
    Failed,
    Aborted,
}

/// Action carried by a waypoint, executed by the UAV agent on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaypointAction {
    Nav,
    Loiter,
    Scan,
    Land,
    Rtb,
}

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// A polygonal region of the monitored area with a stable id and a
/// monitoring status. Created at bootstrap; never destroyed at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub tile_id: Uuid,
    pub polygon: Vec<Coordinates>,
    pub centroid: Coordinates,
    pub priority: i32,
    pub status: TileStatus,
}

/// A fleet vehicle. Owned by the UAV registry (C7); mutated by the
/// scheduler (assignment), the telemetry ingestor (position/battery), and
/// the dispatcher (mission completion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uav {
    pub uav_id: Uuid,
    pub name: String,
    pub position: Coordinates,
    pub battery_pct: f32,
    pub status: UavStatus,
    pub current_mission_id: Option<Uuid>,
    pub last_seen: DateTime<Utc>,
}

impl Uav {
    /// §3 invariant: a UAV with a non-null mission must be in a
    /// mission-compatible status.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.current_mission_id.is_none() || self.status.allows_mission()
    }
}

/// A satellite-derived event requiring UAV investigation.
///
/// The canonical schema follows the richer of the two divergent source
/// schemas (flat geo fields *and* a `metadata` blob simultaneously — see
/// `DESIGN.md`'s Open Question resolution), not either alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: Uuid,
    pub tile_id: Uuid,
    pub event_type: String,
    pub confidence: f32,
    pub severity: AlertSeverity,
    pub priority: i32,
    pub position: Coordinates,
    pub status: AlertStatus,
    pub metadata: serde_json::Value,
    pub demotion_count: u32,
    pub created_at: DateTime<Utc>,
}

/// A (position, altitude, optional speed/heading, action) instruction
/// along a mission path. Immutable after mission creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Coordinates,
    pub speed_mps: Option<f32>,
    pub heading_deg: Option<f32>,
    pub action: WaypointAction,
}

/// A scheduled unit of UAV work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub mission_id: Uuid,
    pub uav_id: Uuid,
    pub tile_id: Uuid,
    pub alert_id: Uuid,
    pub priority: i32,
    pub waypoints: Vec<Waypoint>,
    pub status: MissionStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub estimated_duration_s: u32,
    pub actual_duration_s: Option<u32>,
}

impl Mission {
    /// Watchdog deadline per §5: `estimated_duration * 2`, clamped to
    /// `[60s, 2h]`.
    #[must_use]
    pub fn watchdog_duration_s(&self) -> u32 {
        (self.estimated_duration_s * 2).clamp(60, 2 * 60 * 60)
    }
}

/// An append-only record of an edge-inference detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub detection_id: Uuid,
    pub uav_id: Uuid,
    pub mission_id: Option<Uuid>,
    pub object_class: String,
    pub confidence: f32,
    pub position: Coordinates,
    pub bbox: Option<BoundingBox>,
    pub evidence_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Detection {
    /// §4.11: confidence must be within `[0, 1]` and coordinates must lie
    /// on the Earth.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence)
            && (-90.0..=90.0).contains(&self.position.latitude)
            && (-180.0..=180.0).contains(&self.position.longitude)
    }
}

/// A pixel-space bounding box from the edge-inference stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// An append-only telemetry sample, may be ring-buffered for memory
/// control by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub uav_id: Uuid,
    pub position: Coordinates,
    pub battery_pct: f32,
    pub speed_mps: f32,
    pub heading_deg: f32,
    pub status: UavStatus,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// QUERY/FILTER TYPES
// =============================================================================

/// Time range filter for queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i32,
    pub offset: i32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("invalid detection: {0}")]
    InvalidDetection(String),

    #[error("state invariant violated: {0}")]
    StateInvariant(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_same_point_is_zero() {
        let p = Coordinates::new(37.7749, -122.4194, 0.0);
        assert_eq!(p.distance_to_km(&p), 0.0);
    }

    #[test]
    fn haversine_symmetric() {
        let a = Coordinates::new(37.7749, -122.4194, 0.0);
        let b = Coordinates::new(37.7800, -122.4200, 0.0);
        assert!((a.distance_to_km(&b) - b.distance_to_km(&a)).abs() < 1e-9);
    }

    #[test]
    fn haversine_known_distance_sf_to_la() {
        let sf = Coordinates::new(37.7749, -122.4194, 0.0);
        let la = Coordinates::new(34.0522, -118.2437, 0.0);
        let d = sf.distance_to_km(&la);
        assert!((500.0..620.0).contains(&d), "got {d}");
    }

    #[test]
    fn uav_invariant_rejects_idle_with_mission() {
        let uav = Uav {
            uav_id: Uuid::new_v4(),
            name: "U1".into(),
            position: Coordinates::default(),
            battery_pct: 90.0,
            status: UavStatus::Available,
            current_mission_id: Some(Uuid::new_v4()),
            last_seen: Utc::now(),
        };
        assert!(!uav.invariant_holds());
    }

    #[test]
    fn mission_watchdog_clamps_to_bounds() {
        let mission = Mission {
            mission_id: Uuid::new_v4(),
            uav_id: Uuid::new_v4(),
            tile_id: Uuid::new_v4(),
            alert_id: Uuid::new_v4(),
            priority: 5,
            waypoints: vec![],
            status: MissionStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            estimated_duration_s: 10,
            actual_duration_s: None,
        };
        assert_eq!(mission.watchdog_duration_s(), 60);
    }

    #[test]
    fn detection_rejects_out_of_range_confidence() {
        let detection = Detection {
            detection_id: Uuid::new_v4(),
            uav_id: Uuid::new_v4(),
            mission_id: None,
            object_class: "vehicle".into(),
            confidence: 1.5,
            position: Coordinates::default(),
            bbox: None,
            evidence_reference: None,
            created_at: Utc::now(),
        };
        assert!(!detection.is_valid());
    }
}
