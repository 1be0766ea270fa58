//! # Repository Traits
//!
//! Abstract repository interfaces for domain entities.
//! Implementations can be swapped for different backends (ScyllaDB, mock, etc.)

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use drone_domain::{
    Alert, AlertStatus, Detection, Mission, MissionStatus, Pagination, TelemetrySample, Tile,
    TileStatus, TimeRange, Uav, UavStatus, Waypoint,
};

// =============================================================================
// TILE REPOSITORY
// =============================================================================

/// Repository for Tile entity operations (C7 registry's coverage-area side)
#[async_trait]
pub trait TileRepository: Send + Sync {
    /// Get tile by ID
    async fn get_by_id(&self, tile_id: Uuid) -> Result<Option<Tile>>;

    /// Get all tiles, optionally filtered by status
    async fn get_by_status(&self, status: TileStatus) -> Result<Vec<Tile>>;

    /// Create a new tile
    async fn create(&self, tile: &Tile) -> Result<()>;

    /// Update tile status
    async fn update_status(&self, tile_id: Uuid, status: TileStatus) -> Result<()>;

    /// Update tile priority
    async fn update_priority(&self, tile_id: Uuid, priority: i32) -> Result<()>;

    /// Delete tile
    async fn delete(&self, tile_id: Uuid) -> Result<()>;
}

// =============================================================================
// UAV REPOSITORY
// =============================================================================

/// Repository for UAV entity operations (C7 registry)
#[async_trait]
pub trait UavRepository: Send + Sync {
    /// Get UAV by ID
    async fn get_by_id(&self, uav_id: Uuid) -> Result<Option<Uav>>;

    /// Get all known UAVs
    async fn get_all(&self) -> Result<Vec<Uav>>;

    /// Get UAVs by status
    async fn get_by_status(&self, status: UavStatus) -> Result<Vec<Uav>>;

    /// Register a new UAV
    async fn create(&self, uav: &Uav) -> Result<()>;

    /// Update UAV position, battery, and status
    async fn update_state(
        &self,
        uav_id: Uuid,
        position: drone_domain::Coordinates,
        battery_pct: f32,
        status: UavStatus,
    ) -> Result<()>;

    /// Assign (or clear, via `None`) the UAV's current mission
    async fn set_current_mission(&self, uav_id: Uuid, mission_id: Option<Uuid>) -> Result<()>;

    /// Deregister a UAV
    async fn delete(&self, uav_id: Uuid) -> Result<()>;
}

// =============================================================================
// ALERT REPOSITORY
// =============================================================================

/// Repository for Alert entity operations (C6 alert queue)
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Get alert by ID
    async fn get_by_id(&self, alert_id: Uuid) -> Result<Option<Alert>>;

    /// Get alerts by status, newest first
    async fn get_by_status(&self, status: AlertStatus, page: Pagination) -> Result<Vec<Alert>>;

    /// Get alerts for a tile
    async fn get_by_tile(&self, tile_id: Uuid) -> Result<Vec<Alert>>;

    /// Persist a newly ingested alert
    async fn create(&self, alert: &Alert) -> Result<()>;

    /// Transition alert status
    async fn update_status(&self, alert_id: Uuid, status: AlertStatus) -> Result<()>;

    /// Increment the demotion counter (priority aging, §4.6)
    async fn increment_demotion_count(&self, alert_id: Uuid) -> Result<u32>;

    /// Delete alert
    async fn delete(&self, alert_id: Uuid) -> Result<()>;
}

// =============================================================================
// MISSION REPOSITORY
// =============================================================================

/// Repository for Mission entity operations (C9 dispatcher)
#[async_trait]
pub trait MissionRepository: Send + Sync {
    /// Get mission by ID
    async fn get_by_id(&self, mission_id: Uuid) -> Result<Option<Mission>>;

    /// Get missions for a UAV
    async fn get_by_uav(&self, uav_id: Uuid, limit: Option<i32>) -> Result<Vec<Mission>>;

    /// Get missions by status
    async fn get_by_status(&self, status: MissionStatus) -> Result<Vec<Mission>>;

    /// Create a new mission
    async fn create(&self, mission: &Mission) -> Result<()>;

    /// Update mission status and timing
    async fn update_status(
        &self,
        mission_id: Uuid,
        status: MissionStatus,
        started_at: Option<chrono::DateTime<chrono::Utc>>,
        ended_at: Option<chrono::DateTime<chrono::Utc>>,
        actual_duration_s: Option<u32>,
    ) -> Result<()>;
}

// =============================================================================
// WAYPOINT REPOSITORY
// =============================================================================

/// Repository for Waypoint entity operations, keyed by mission
#[async_trait]
pub trait WaypointRepository: Send + Sync {
    /// Get all waypoints for a mission, in flight order
    async fn get_by_mission(&self, mission_id: Uuid) -> Result<Vec<Waypoint>>;

    /// Replace a mission's full waypoint plan
    async fn replace_for_mission(&self, mission_id: Uuid, waypoints: &[Waypoint]) -> Result<()>;

    /// Delete all waypoints for a mission
    async fn delete_by_mission(&self, mission_id: Uuid) -> Result<()>;
}

// =============================================================================
// DETECTION REPOSITORY
// =============================================================================

/// Repository for Detection entity operations (C11 detection ingestor)
#[async_trait]
pub trait DetectionRepository: Send + Sync {
    /// Get detections for a mission
    async fn get_by_mission(&self, mission_id: Uuid) -> Result<Vec<Detection>>;

    /// Get detections for a UAV within a time range
    async fn get_by_uav_range(
        &self,
        uav_id: Uuid,
        range: TimeRange,
        limit: Option<i32>,
    ) -> Result<Vec<Detection>>;

    /// Insert a detection record
    async fn insert(&self, detection: &Detection) -> Result<()>;
}

// =============================================================================
// TELEMETRY REPOSITORY
// =============================================================================

/// Repository for TelemetrySample entity operations (C10 telemetry ingestor)
#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Get telemetry for a UAV within a time range
    async fn get_by_uav_range(
        &self,
        uav_id: Uuid,
        range: TimeRange,
        limit: Option<i32>,
    ) -> Result<Vec<TelemetrySample>>;

    /// Get latest telemetry sample for a UAV
    async fn get_latest(&self, uav_id: Uuid) -> Result<Option<TelemetrySample>>;

    /// Insert telemetry record
    async fn insert(&self, sample: &TelemetrySample) -> Result<()>;

    /// Batch insert telemetry records
    async fn insert_batch(&self, samples: &[TelemetrySample]) -> Result<()>;
}

// =============================================================================
// UNIT OF WORK
// =============================================================================

/// Unit of Work pattern for transactional operations
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type TileRepo: TileRepository;
    type UavRepo: UavRepository;
    type AlertRepo: AlertRepository;
    type MissionRepo: MissionRepository;
    type WaypointRepo: WaypointRepository;
    type DetectionRepo: DetectionRepository;
    type TelemetryRepo: TelemetryRepository;

    /// Get tile repository
    fn tiles(&self) -> &Self::TileRepo;

    /// Get UAV repository
    fn uavs(&self) -> &Self::UavRepo;

    /// Get alert repository
    fn alerts(&self) -> &Self::AlertRepo;

    /// Get mission repository
    fn missions(&self) -> &Self::MissionRepo;

    /// Get waypoint repository
    fn waypoints(&self) -> &Self::WaypointRepo;

    /// Get detection repository
    fn detections(&self) -> &Self::DetectionRepo;

    /// Get telemetry repository
    fn telemetry(&self) -> &Self::TelemetryRepo;
}
