//! # ScyllaDB Repository Implementations
//!
//! Concrete implementations of the repository traits (§3/§4.7-§4.11) using
//! ScyllaDB, following the teacher's pre-prepared-statement session wrapper
//! shape: one `PreparedStatements` bundle built once at startup, denormalised
//! per-entity "by X" tables for the query patterns the scheduler, dispatcher,
//! and ingestors actually need (matching the teacher's `drones`/`drones_by_convoy`
//! split).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::prepared_statement::PreparedStatement;
use scylla::transport::session::Session;
use scylla::{IntoTypedRows, SessionBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::SharedCacheClient;
use crate::error::Result;
use crate::repository::traits::{
    AlertRepository, DetectionRepository, MissionRepository, TelemetryRepository, TileRepository,
    UavRepository, UnitOfWork, WaypointRepository,
};
use drone_domain::{
    Alert, AlertSeverity, AlertStatus, BoundingBox, Coordinates, Detection, Mission, MissionStatus,
    Pagination, TelemetrySample, Tile, TileStatus, TimeRange, Uav, UavStatus, Waypoint,
    WaypointAction,
};

// =============================================================================
// SCYLLA CLIENT
// =============================================================================

/// ScyllaDB client configuration.
#[derive(Debug, Clone)]
pub struct ScyllaConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pool_size: usize,
}

impl Default for ScyllaConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["127.0.0.1:9042".to_string()],
            keyspace: "drone_ops".to_string(),
            username: None,
            password: None,
            pool_size: 10,
        }
    }
}

/// ScyllaDB session wrapper.
#[derive(Clone)]
pub struct ScyllaClient {
    session: Arc<Session>,
    prepared_stmts: Arc<PreparedStatements>,
}

/// Pre-prepared statements for performance, one per query shape.
struct PreparedStatements {
    // Tile
    get_tile: PreparedStatement,
    get_tiles_by_status: PreparedStatement,
    insert_tile: PreparedStatement,
    insert_tile_by_status: PreparedStatement,
    delete_tile_by_status: PreparedStatement,
    update_tile_status: PreparedStatement,
    update_tile_priority: PreparedStatement,
    delete_tile: PreparedStatement,

    // UAV
    get_uav: PreparedStatement,
    get_all_uavs: PreparedStatement,
    get_uavs_by_status: PreparedStatement,
    insert_uav: PreparedStatement,
    update_uav_state: PreparedStatement,
    set_uav_mission: PreparedStatement,
    delete_uav: PreparedStatement,

    // Alert
    get_alert: PreparedStatement,
    get_alerts_by_status: PreparedStatement,
    get_alerts_by_tile: PreparedStatement,
    insert_alert: PreparedStatement,
    insert_alert_by_status: PreparedStatement,
    insert_alert_by_tile: PreparedStatement,
    update_alert_status: PreparedStatement,
    increment_alert_demotion: PreparedStatement,
    delete_alert: PreparedStatement,

    // Mission
    get_mission: PreparedStatement,
    get_missions_by_uav: PreparedStatement,
    get_missions_by_status: PreparedStatement,
    insert_mission: PreparedStatement,
    insert_mission_by_uav: PreparedStatement,
    insert_mission_by_status: PreparedStatement,
    update_mission_status: PreparedStatement,

    // Waypoint
    get_waypoints_by_mission: PreparedStatement,
    insert_waypoint: PreparedStatement,
    delete_waypoints_by_mission: PreparedStatement,

    // Detection
    get_detection: PreparedStatement,
    get_detections_by_mission: PreparedStatement,
    get_detections_by_uav_range: PreparedStatement,
    insert_detection: PreparedStatement,
    insert_detection_by_mission: PreparedStatement,
    insert_detection_by_uav: PreparedStatement,

    // Telemetry
    get_telemetry_by_uav_range: PreparedStatement,
    get_latest_telemetry: PreparedStatement,
    insert_telemetry: PreparedStatement,
}

impl ScyllaClient {
    /// Create a new ScyllaDB client and prepare every statement up front.
    pub async fn new(config: ScyllaConfig) -> Result<Self> {
        let mut builder = SessionBuilder::new().known_nodes(&config.hosts);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.user(user, pass);
        }

        let session = builder.build().await?;
        session.use_keyspace(&config.keyspace, false).await?;

        let prepared_stmts = Self::prepare_statements(&session).await?;

        Ok(Self {
            session: Arc::new(session),
            prepared_stmts: Arc::new(prepared_stmts),
        })
    }

    #[allow(clippy::too_many_lines)]
    async fn prepare_statements(session: &Session) -> Result<PreparedStatements> {
        Ok(PreparedStatements {
            // Tile
            get_tile: session
                .prepare("SELECT * FROM tiles WHERE tile_id = ?")
                .await?,
            get_tiles_by_status: session
                .prepare("SELECT * FROM tiles_by_status WHERE status = ?")
                .await?,
            insert_tile: session
                .prepare(
                    "INSERT INTO tiles (tile_id, polygon, centroid_lat, centroid_lon, \
                     centroid_alt, priority, status) VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .await?,
            insert_tile_by_status: session
                .prepare(
                    "INSERT INTO tiles_by_status (status, tile_id, priority) VALUES (?, ?, ?)",
                )
                .await?,
            delete_tile_by_status: session
                .prepare("DELETE FROM tiles_by_status WHERE status = ? AND tile_id = ?")
                .await?,
            update_tile_status: session
                .prepare("UPDATE tiles SET status = ? WHERE tile_id = ?")
                .await?,
            update_tile_priority: session
                .prepare("UPDATE tiles SET priority = ? WHERE tile_id = ?")
                .await?,
            delete_tile: session
                .prepare("DELETE FROM tiles WHERE tile_id = ?")
                .await?,

            // UAV
            get_uav: session
                .prepare("SELECT * FROM uavs WHERE uav_id = ?")
                .await?,
            get_all_uavs: session.prepare("SELECT * FROM uavs").await?,
            get_uavs_by_status: session
                .prepare("SELECT * FROM uavs_by_status WHERE status = ?")
                .await?,
            insert_uav: session
                .prepare(
                    "INSERT INTO uavs (uav_id, name, lat, lon, alt, battery_pct, status, \
                     current_mission_id, last_seen) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .await?,
            update_uav_state: session
                .prepare(
                    "UPDATE uavs SET lat = ?, lon = ?, alt = ?, battery_pct = ?, status = ?, \
                     last_seen = ? WHERE uav_id = ?",
                )
                .await?,
            set_uav_mission: session
                .prepare("UPDATE uavs SET current_mission_id = ? WHERE uav_id = ?")
                .await?,
            delete_uav: session
                .prepare("DELETE FROM uavs WHERE uav_id = ?")
                .await?,

            // Alert
            get_alert: session
                .prepare("SELECT * FROM alerts WHERE alert_id = ?")
                .await?,
            get_alerts_by_status: session
                .prepare(
                    "SELECT * FROM alerts_by_status WHERE status = ? \
                     ORDER BY created_at DESC LIMIT ?",
                )
                .await?,
            get_alerts_by_tile: session
                .prepare("SELECT * FROM alerts_by_tile WHERE tile_id = ?")
                .await?,
            insert_alert: session
                .prepare(
                    "INSERT INTO alerts (alert_id, tile_id, event_type, confidence, severity, \
                     priority, lat, lon, alt, status, metadata, demotion_count, created_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .await?,
            insert_alert_by_status: session
                .prepare(
                    "INSERT INTO alerts_by_status (status, created_at, alert_id, tile_id, \
                     priority) VALUES (?, ?, ?, ?, ?)",
                )
                .await?,
            insert_alert_by_tile: session
                .prepare(
                    "INSERT INTO alerts_by_tile (tile_id, created_at, alert_id) VALUES (?, ?, ?)",
                )
                .await?,
            update_alert_status: session
                .prepare("UPDATE alerts SET status = ? WHERE alert_id = ?")
                .await?,
            increment_alert_demotion: session
                .prepare(
                    "UPDATE alerts SET demotion_count = demotion_count + 1 WHERE alert_id = ?",
                )
                .await?,
            delete_alert: session
                .prepare("DELETE FROM alerts WHERE alert_id = ?")
                .await?,

            // Mission
            get_mission: session
                .prepare("SELECT * FROM missions WHERE mission_id = ?")
                .await?,
            get_missions_by_uav: session
                .prepare(
                    "SELECT * FROM missions_by_uav WHERE uav_id = ? \
                     ORDER BY created_at DESC LIMIT ?",
                )
                .await?,
            get_missions_by_status: session
                .prepare("SELECT * FROM missions_by_status WHERE status = ?")
                .await?,
            insert_mission: session
                .prepare(
                    "INSERT INTO missions (mission_id, uav_id, tile_id, alert_id, priority, \
                     status, created_at, started_at, ended_at, estimated_duration_s, \
                     actual_duration_s) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .await?,
            insert_mission_by_uav: session
                .prepare(
                    "INSERT INTO missions_by_uav (uav_id, created_at, mission_id, status) \
                     VALUES (?, ?, ?, ?)",
                )
                .await?,
            insert_mission_by_status: session
                .prepare(
                    "INSERT INTO missions_by_status (status, created_at, mission_id) \
                     VALUES (?, ?, ?)",
                )
                .await?,
            update_mission_status: session
                .prepare(
                    "UPDATE missions SET status = ?, started_at = ?, ended_at = ?, \
                     actual_duration_s = ? WHERE mission_id = ?",
                )
                .await?,

            // Waypoint
            get_waypoints_by_mission: session
                .prepare(
                    "SELECT * FROM waypoints WHERE mission_id = ? ORDER BY sequence ASC",
                )
                .await?,
            insert_waypoint: session
                .prepare(
                    "INSERT INTO waypoints (mission_id, sequence, lat, lon, alt, speed_mps, \
                     heading_deg, action) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .await?,
            delete_waypoints_by_mission: session
                .prepare("DELETE FROM waypoints WHERE mission_id = ?")
                .await?,

            // Detection
            get_detection: session
                .prepare("SELECT * FROM detections WHERE detection_id = ?")
                .await?,
            get_detections_by_mission: session
                .prepare("SELECT * FROM detections_by_mission WHERE mission_id = ?")
                .await?,
            get_detections_by_uav_range: session
                .prepare(
                    "SELECT * FROM detections_by_uav WHERE uav_id = ? \
                     AND created_at >= ? AND created_at <= ? LIMIT ?",
                )
                .await?,
            insert_detection: session
                .prepare(
                    "INSERT INTO detections (detection_id, uav_id, mission_id, object_class, \
                     confidence, lat, lon, alt, bbox_x, bbox_y, bbox_w, bbox_h, \
                     evidence_reference, created_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .await?,
            insert_detection_by_mission: session
                .prepare(
                    "INSERT INTO detections_by_mission (mission_id, created_at, detection_id) \
                     VALUES (?, ?, ?)",
                )
                .await?,
            insert_detection_by_uav: session
                .prepare(
                    "INSERT INTO detections_by_uav (uav_id, created_at, detection_id) \
                     VALUES (?, ?, ?)",
                )
                .await?,

            // Telemetry
            get_telemetry_by_uav_range: session
                .prepare(
                    "SELECT * FROM telemetry WHERE uav_id = ? AND recorded_at >= ? \
                     AND recorded_at <= ? LIMIT ?",
                )
                .await?,
            get_latest_telemetry: session
                .prepare(
                    "SELECT * FROM telemetry WHERE uav_id = ? ORDER BY recorded_at DESC LIMIT 1",
                )
                .await?,
            insert_telemetry: session
                .prepare(
                    "INSERT INTO telemetry (uav_id, recorded_at, lat, lon, alt, battery_pct, \
                     speed_mps, heading_deg, status) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .await?,
        })
    }

    /// Raw session access for advanced/administrative queries.
    #[must_use]
    pub fn session(&self) -> Arc<Session> {
        self.session.clone()
    }
}

fn status_str(s: TileStatus) -> &'static str {
    match s {
        TileStatus::Unmonitored => "UNMONITORED",
        TileStatus::Monitored => "MONITORED",
        TileStatus::Investigating => "INVESTIGATING",
    }
}

fn uav_status_str(s: UavStatus) -> &'static str {
    match s {
        UavStatus::Available => "AVAILABLE",
        UavStatus::Assigned => "ASSIGNED",
        UavStatus::InMission => "IN_MISSION",
        UavStatus::Returning => "RETURNING",
        UavStatus::Charging => "CHARGING",
        UavStatus::Unreachable => "UNREACHABLE",
    }
}

fn alert_status_str(s: AlertStatus) -> &'static str {
    match s {
        AlertStatus::New => "NEW",
        AlertStatus::Queued => "QUEUED",
        AlertStatus::Assigned => "ASSIGNED",
        AlertStatus::Investigating => "INVESTIGATING",
        AlertStatus::Verified => "VERIFIED",
        AlertStatus::FalsePositive => "FALSE_POSITIVE",
        AlertStatus::Expired => "EXPIRED",
    }
}

fn mission_status_str(s: MissionStatus) -> &'static str {
    match s {
        MissionStatus::Pending => "PENDING",
        MissionStatus::Assigned => "ASSIGNED",
        MissionStatus::Active => "ACTIVE",
        MissionStatus::Completed => "COMPLETED",
        MissionStatus::Failed => "FAILED",
        MissionStatus::Aborted => "ABORTED",
    }
}

fn waypoint_action_str(a: WaypointAction) -> &'static str {
    match a {
        WaypointAction::Nav => "NAV",
        WaypointAction::Loiter => "LOITER",
        WaypointAction::Scan => "SCAN",
        WaypointAction::Land => "LAND",
        WaypointAction::Rtb => "RTB",
    }
}

// =============================================================================
// TILE REPOSITORY
// =============================================================================

pub struct ScyllaTileRepository {
    client: ScyllaClient,
}

impl ScyllaTileRepository {
    #[must_use]
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn row_to_tile(
        row: (Uuid, Vec<(f64, f64)>, f64, f64, f64, i32, String),
    ) -> Tile {
        let (tile_id, polygon, lat, lon, alt, priority, status) = row;
        Tile {
            tile_id,
            polygon: polygon
                .into_iter()
                .map(|(lat, lon)| Coordinates::new(lat, lon, 0.0))
                .collect(),
            centroid: Coordinates::new(lat, lon, alt),
            priority,
            status: parse_tile_status(&status),
        }
    }
}

fn parse_tile_status(s: &str) -> TileStatus {
    match s {
        "MONITORED" => TileStatus::Monitored,
        "INVESTIGATING" => TileStatus::Investigating,
        _ => TileStatus::Unmonitored,
    }
}

#[async_trait]
impl TileRepository for ScyllaTileRepository {
    async fn get_by_id(&self, tile_id: Uuid) -> Result<Option<Tile>> {
        let result = self
            .client
            .session
            .execute(&self.client.prepared_stmts.get_tile, (tile_id,))
            .await?;

        let tile = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, Vec<(f64, f64)>, f64, f64, f64, i32, String)>()
            .next()
            .transpose()?
            .map(Self::row_to_tile);
        Ok(tile)
    }

    async fn get_by_status(&self, status: TileStatus) -> Result<Vec<Tile>> {
        // tiles_by_status is a thin index (status, tile_id, priority);
        // fetch ids then re-query the primary table for the full row.
        let result = self
            .client
            .session
            .execute(
                &self.client.prepared_stmts.get_tiles_by_status,
                (status_str(status),),
            )
            .await?;

        let tile_ids: Vec<Uuid> = result
            .rows
            .unwrap_or_default()
            .into_typed::<(String, Uuid, i32)>()
            .filter_map(std::result::Result::ok)
            .map(|(_, tile_id, _)| tile_id)
            .collect();

        let mut tiles = Vec::with_capacity(tile_ids.len());
        for tile_id in tile_ids {
            if let Some(tile) = self.get_by_id(tile_id).await? {
                tiles.push(tile);
            }
        }
        Ok(tiles)
    }

    async fn create(&self, tile: &Tile) -> Result<()> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_tile,
                (
                    tile.tile_id,
                    tile.polygon
                        .iter()
                        .map(|c| (c.latitude, c.longitude))
                        .collect::<Vec<_>>(),
                    tile.centroid.latitude,
                    tile.centroid.longitude,
                    tile.centroid.altitude_m,
                    tile.priority,
                    status_str(tile.status),
                ),
            )
            .await?;

        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_tile_by_status,
                (status_str(tile.status), tile.tile_id, tile.priority),
            )
            .await?;
        Ok(())
    }

    async fn update_status(&self, tile_id: Uuid, status: TileStatus) -> Result<()> {
        let previous = self.get_by_id(tile_id).await?;

        self.client
            .session
            .execute(
                &self.client.prepared_stmts.update_tile_status,
                (status_str(status), tile_id),
            )
            .await?;

        if let Some(tile) = previous {
            self.client
                .session
                .execute(
                    &self.client.prepared_stmts.delete_tile_by_status,
                    (status_str(tile.status), tile_id),
                )
                .await?;
            self.client
                .session
                .execute(
                    &self.client.prepared_stmts.insert_tile_by_status,
                    (status_str(status), tile_id, tile.priority),
                )
                .await?;
        }
        Ok(())
    }

    async fn update_priority(&self, tile_id: Uuid, priority: i32) -> Result<()> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.update_tile_priority,
                (priority, tile_id),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, tile_id: Uuid) -> Result<()> {
        self.client
            .session
            .execute(&self.client.prepared_stmts.delete_tile, (tile_id,))
            .await?;
        Ok(())
    }
}

// =============================================================================
// UAV REPOSITORY
// =============================================================================

pub struct ScyllaUavRepository {
    client: ScyllaClient,
    cache: Option<SharedCacheClient>,
}

impl ScyllaUavRepository {
    #[must_use]
    pub fn new(client: ScyllaClient, cache: Option<SharedCacheClient>) -> Self {
        Self { client, cache }
    }

    fn row_to_uav(
        row: (
            Uuid,
            String,
            f64,
            f64,
            f64,
            f32,
            String,
            Option<Uuid>,
            DateTime<Utc>,
        ),
    ) -> Uav {
        let (uav_id, name, lat, lon, alt, battery_pct, status, current_mission_id, last_seen) =
            row;
        Uav {
            uav_id,
            name,
            position: Coordinates::new(lat, lon, alt),
            battery_pct,
            status: parse_uav_status(&status),
            current_mission_id,
            last_seen,
        }
    }
}

fn parse_uav_status(s: &str) -> UavStatus {
    match s {
        "ASSIGNED" => UavStatus::Assigned,
        "IN_MISSION" => UavStatus::InMission,
        "RETURNING" => UavStatus::Returning,
        "CHARGING" => UavStatus::Charging,
        "UNREACHABLE" => UavStatus::Unreachable,
        _ => UavStatus::Available,
    }
}

#[async_trait]
impl UavRepository for ScyllaUavRepository {
    async fn get_by_id(&self, uav_id: Uuid) -> Result<Option<Uav>> {
        if let Some(cache) = &self.cache {
            if let Ok(Some(uav)) = cache.get_fleet_snapshot(uav_id).await {
                return Ok(Some(uav));
            }
        }

        let result = self
            .client
            .session
            .execute(&self.client.prepared_stmts.get_uav, (uav_id,))
            .await?;

        let uav = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, String, f64, f64, f64, f32, String, Option<Uuid>, DateTime<Utc>)>()
            .next()
            .transpose()?
            .map(Self::row_to_uav);
        Ok(uav)
    }

    async fn get_all(&self) -> Result<Vec<Uav>> {
        let result = self
            .client
            .session
            .execute(&self.client.prepared_stmts.get_all_uavs, ())
            .await?;

        let uavs = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, String, f64, f64, f64, f32, String, Option<Uuid>, DateTime<Utc>)>()
            .filter_map(std::result::Result::ok)
            .map(Self::row_to_uav)
            .collect();
        Ok(uavs)
    }

    async fn get_by_status(&self, status: UavStatus) -> Result<Vec<Uav>> {
        let result = self
            .client
            .session
            .execute(
                &self.client.prepared_stmts.get_uavs_by_status,
                (uav_status_str(status),),
            )
            .await?;

        let uavs = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, String, f64, f64, f64, f32, String, Option<Uuid>, DateTime<Utc>)>()
            .filter_map(std::result::Result::ok)
            .map(Self::row_to_uav)
            .collect();
        Ok(uavs)
    }

    async fn create(&self, uav: &Uav) -> Result<()> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_uav,
                (
                    uav.uav_id,
                    &uav.name,
                    uav.position.latitude,
                    uav.position.longitude,
                    uav.position.altitude_m,
                    uav.battery_pct,
                    uav_status_str(uav.status),
                    uav.current_mission_id,
                    uav.last_seen,
                ),
            )
            .await?;
        Ok(())
    }

    async fn update_state(
        &self,
        uav_id: Uuid,
        position: Coordinates,
        battery_pct: f32,
        status: UavStatus,
    ) -> Result<()> {
        let now = Utc::now();
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.update_uav_state,
                (
                    position.latitude,
                    position.longitude,
                    position.altitude_m,
                    battery_pct,
                    uav_status_str(status),
                    now,
                    uav_id,
                ),
            )
            .await?;

        if let Some(cache) = &self.cache {
            let _ = cache
                .set_fleet_snapshot(&Uav {
                    uav_id,
                    name: String::new(),
                    position,
                    battery_pct,
                    status,
                    current_mission_id: None,
                    last_seen: now,
                })
                .await;
        }
        Ok(())
    }

    async fn set_current_mission(&self, uav_id: Uuid, mission_id: Option<Uuid>) -> Result<()> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.set_uav_mission,
                (mission_id, uav_id),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, uav_id: Uuid) -> Result<()> {
        self.client
            .session
            .execute(&self.client.prepared_stmts.delete_uav, (uav_id,))
            .await?;
        if let Some(cache) = &self.cache {
            let _ = cache.invalidate_uav(uav_id).await;
        }
        Ok(())
    }
}

// =============================================================================
// ALERT REPOSITORY
// =============================================================================

pub struct ScyllaAlertRepository {
    client: ScyllaClient,
}

impl ScyllaAlertRepository {
    #[must_use]
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn row_to_alert(
        row: (
            Uuid,
            Uuid,
            String,
            f32,
            String,
            i32,
            f64,
            f64,
            f64,
            String,
            String,
            u32,
            DateTime<Utc>,
        ),
    ) -> Result<Alert> {
        let (
            alert_id,
            tile_id,
            event_type,
            confidence,
            severity,
            priority,
            lat,
            lon,
            alt,
            status,
            metadata,
            demotion_count,
            created_at,
        ) = row;
        Ok(Alert {
            alert_id,
            tile_id,
            event_type,
            confidence,
            severity: parse_alert_severity(&severity),
            priority,
            position: Coordinates::new(lat, lon, alt),
            status: parse_alert_status(&status),
            metadata: serde_json::from_str(&metadata)?,
            demotion_count,
            created_at,
        })
    }
}

fn parse_alert_severity(s: &str) -> AlertSeverity {
    match s {
        "MEDIUM" => AlertSeverity::Medium,
        "HIGH" => AlertSeverity::High,
        "CRITICAL" => AlertSeverity::Critical,
        _ => AlertSeverity::Low,
    }
}

fn parse_alert_status(s: &str) -> AlertStatus {
    match s {
        "QUEUED" => AlertStatus::Queued,
        "ASSIGNED" => AlertStatus::Assigned,
        "INVESTIGATING" => AlertStatus::Investigating,
        "VERIFIED" => AlertStatus::Verified,
        "FALSE_POSITIVE" => AlertStatus::FalsePositive,
        "EXPIRED" => AlertStatus::Expired,
        _ => AlertStatus::New,
    }
}

#[async_trait]
impl AlertRepository for ScyllaAlertRepository {
    async fn get_by_id(&self, alert_id: Uuid) -> Result<Option<Alert>> {
        let result = self
            .client
            .session
            .execute(&self.client.prepared_stmts.get_alert, (alert_id,))
            .await?;

        result
            .rows
            .unwrap_or_default()
            .into_typed::<(
                Uuid,
                Uuid,
                String,
                f32,
                String,
                i32,
                f64,
                f64,
                f64,
                String,
                String,
                u32,
                DateTime<Utc>,
            )>()
            .next()
            .transpose()?
            .map(Self::row_to_alert)
            .transpose()
    }

    async fn get_by_status(&self, status: AlertStatus, page: Pagination) -> Result<Vec<Alert>> {
        // alerts_by_status is a thin index (status, created_at, alert_id,
        // tile_id, priority); re-fetch the full row per id from `alerts`.
        let result = self
            .client
            .session
            .execute(
                &self.client.prepared_stmts.get_alerts_by_status,
                (alert_status_str(status), page.limit),
            )
            .await?;

        let alert_ids: Vec<Uuid> = result
            .rows
            .unwrap_or_default()
            .into_typed::<(String, DateTime<Utc>, Uuid, Uuid, i32)>()
            .filter_map(std::result::Result::ok)
            .skip(usize::try_from(page.offset).unwrap_or(0))
            .map(|(_, _, alert_id, _, _)| alert_id)
            .collect();

        let mut alerts = Vec::with_capacity(alert_ids.len());
        for alert_id in alert_ids {
            if let Some(alert) = self.get_by_id(alert_id).await? {
                alerts.push(alert);
            }
        }
        Ok(alerts)
    }

    async fn get_by_tile(&self, tile_id: Uuid) -> Result<Vec<Alert>> {
        let result = self
            .client
            .session
            .execute(&self.client.prepared_stmts.get_alerts_by_tile, (tile_id,))
            .await?;

        let alert_ids: Vec<Uuid> = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, DateTime<Utc>, Uuid)>()
            .filter_map(std::result::Result::ok)
            .map(|(_, _, alert_id)| alert_id)
            .collect();

        let mut alerts = Vec::with_capacity(alert_ids.len());
        for alert_id in alert_ids {
            if let Some(alert) = self.get_by_id(alert_id).await? {
                alerts.push(alert);
            }
        }
        Ok(alerts)
    }

    async fn create(&self, alert: &Alert) -> Result<()> {
        let metadata = serde_json::to_string(&alert.metadata)?;
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_alert,
                (
                    alert.alert_id,
                    alert.tile_id,
                    &alert.event_type,
                    alert.confidence,
                    format!("{:?}", alert.severity).to_uppercase(),
                    alert.priority,
                    alert.position.latitude,
                    alert.position.longitude,
                    alert.position.altitude_m,
                    alert_status_str(alert.status),
                    metadata,
                    alert.demotion_count,
                    alert.created_at,
                ),
            )
            .await?;

        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_alert_by_status,
                (
                    alert_status_str(alert.status),
                    alert.created_at,
                    alert.alert_id,
                    alert.tile_id,
                    alert.priority,
                ),
            )
            .await?;

        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_alert_by_tile,
                (alert.tile_id, alert.created_at, alert.alert_id),
            )
            .await?;
        Ok(())
    }

    async fn update_status(&self, alert_id: Uuid, status: AlertStatus) -> Result<()> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.update_alert_status,
                (alert_status_str(status), alert_id),
            )
            .await?;
        Ok(())
    }

    async fn increment_demotion_count(&self, alert_id: Uuid) -> Result<u32> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.increment_alert_demotion,
                (alert_id,),
            )
            .await?;
        let demotion_count = self
            .get_by_id(alert_id)
            .await?
            .map_or(0, |a| a.demotion_count);
        Ok(demotion_count)
    }

    async fn delete(&self, alert_id: Uuid) -> Result<()> {
        self.client
            .session
            .execute(&self.client.prepared_stmts.delete_alert, (alert_id,))
            .await?;
        Ok(())
    }
}

// =============================================================================
// MISSION REPOSITORY
// =============================================================================

pub struct ScyllaMissionRepository {
    client: ScyllaClient,
}

impl ScyllaMissionRepository {
    #[must_use]
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    /// Waypoints are owned by `WaypointRepository`, not the `missions`
    /// table; callers that need the full plan fetch it separately (as
    /// `MissionDispatcher` already does).
    fn row_to_mission(
        row: (
            Uuid,
            Uuid,
            Uuid,
            Uuid,
            i32,
            String,
            DateTime<Utc>,
            Option<DateTime<Utc>>,
            Option<DateTime<Utc>>,
            u32,
            Option<u32>,
        ),
    ) -> Mission {
        let (
            mission_id,
            uav_id,
            tile_id,
            alert_id,
            priority,
            status,
            created_at,
            started_at,
            ended_at,
            estimated_duration_s,
            actual_duration_s,
        ) = row;
        Mission {
            mission_id,
            uav_id,
            tile_id,
            alert_id,
            priority,
            waypoints: Vec::new(),
            status: parse_mission_status(&status),
            created_at,
            started_at,
            ended_at,
            estimated_duration_s,
            actual_duration_s,
        }
    }
}

fn parse_mission_status(s: &str) -> MissionStatus {
    match s {
        "ASSIGNED" => MissionStatus::Assigned,
        "ACTIVE" => MissionStatus::Active,
        "COMPLETED" => MissionStatus::Completed,
        "FAILED" => MissionStatus::Failed,
        "ABORTED" => MissionStatus::Aborted,
        _ => MissionStatus::Pending,
    }
}

#[async_trait]
impl MissionRepository for ScyllaMissionRepository {
    async fn get_by_id(&self, mission_id: Uuid) -> Result<Option<Mission>> {
        let result = self
            .client
            .session
            .execute(&self.client.prepared_stmts.get_mission, (mission_id,))
            .await?;

        let mission = result
            .rows
            .unwrap_or_default()
            .into_typed::<(
                Uuid,
                Uuid,
                Uuid,
                Uuid,
                i32,
                String,
                DateTime<Utc>,
                Option<DateTime<Utc>>,
                Option<DateTime<Utc>>,
                u32,
                Option<u32>,
            )>()
            .next()
            .transpose()?
            .map(Self::row_to_mission);
        Ok(mission)
    }

    async fn get_by_uav(&self, uav_id: Uuid, limit: Option<i32>) -> Result<Vec<Mission>> {
        let result = self
            .client
            .session
            .execute(
                &self.client.prepared_stmts.get_missions_by_uav,
                (uav_id, limit.unwrap_or(50)),
            )
            .await?;

        let mission_ids: Vec<Uuid> = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, DateTime<Utc>, Uuid, String)>()
            .filter_map(std::result::Result::ok)
            .map(|(_, _, mission_id, _)| mission_id)
            .collect();

        let mut missions = Vec::with_capacity(mission_ids.len());
        for mission_id in mission_ids {
            if let Some(mission) = self.get_by_id(mission_id).await? {
                missions.push(mission);
            }
        }
        Ok(missions)
    }

    async fn get_by_status(&self, status: MissionStatus) -> Result<Vec<Mission>> {
        let result = self
            .client
            .session
            .execute(
                &self.client.prepared_stmts.get_missions_by_status,
                (mission_status_str(status),),
            )
            .await?;

        let mission_ids: Vec<Uuid> = result
            .rows
            .unwrap_or_default()
            .into_typed::<(String, DateTime<Utc>, Uuid)>()
            .filter_map(std::result::Result::ok)
            .map(|(_, _, mission_id)| mission_id)
            .collect();

        let mut missions = Vec::with_capacity(mission_ids.len());
        for mission_id in mission_ids {
            if let Some(mission) = self.get_by_id(mission_id).await? {
                missions.push(mission);
            }
        }
        Ok(missions)
    }

    async fn create(&self, mission: &Mission) -> Result<()> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_mission,
                (
                    mission.mission_id,
                    mission.uav_id,
                    mission.tile_id,
                    mission.alert_id,
                    mission.priority,
                    mission_status_str(mission.status),
                    mission.created_at,
                    mission.started_at,
                    mission.ended_at,
                    mission.estimated_duration_s,
                    mission.actual_duration_s,
                ),
            )
            .await?;

        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_mission_by_uav,
                (
                    mission.uav_id,
                    mission.created_at,
                    mission.mission_id,
                    mission_status_str(mission.status),
                ),
            )
            .await?;

        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_mission_by_status,
                (
                    mission_status_str(mission.status),
                    mission.created_at,
                    mission.mission_id,
                ),
            )
            .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        mission_id: Uuid,
        status: MissionStatus,
        started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
        actual_duration_s: Option<u32>,
    ) -> Result<()> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.update_mission_status,
                (
                    mission_status_str(status),
                    started_at,
                    ended_at,
                    actual_duration_s,
                    mission_id,
                ),
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// WAYPOINT REPOSITORY
// =============================================================================

pub struct ScyllaWaypointRepository {
    client: ScyllaClient,
}

impl ScyllaWaypointRepository {
    #[must_use]
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

fn row_to_waypoint(
    row: (Uuid, i32, f64, f64, f64, Option<f32>, Option<f32>, String),
) -> Waypoint {
    let (_, _, lat, lon, alt, speed_mps, heading_deg, action) = row;
    Waypoint {
        position: Coordinates::new(lat, lon, alt),
        speed_mps,
        heading_deg,
        action: parse_waypoint_action(&action),
    }
}

fn parse_waypoint_action(s: &str) -> WaypointAction {
    match s {
        "LOITER" => WaypointAction::Loiter,
        "SCAN" => WaypointAction::Scan,
        "LAND" => WaypointAction::Land,
        "RTB" => WaypointAction::Rtb,
        _ => WaypointAction::Nav,
    }
}

#[async_trait]
impl crate::repository::traits::WaypointRepository for ScyllaWaypointRepository {
    async fn get_by_mission(&self, mission_id: Uuid) -> Result<Vec<Waypoint>> {
        let result = self
            .client
            .session
            .execute(
                &self.client.prepared_stmts.get_waypoints_by_mission,
                (mission_id,),
            )
            .await?;

        let waypoints = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, i32, f64, f64, f64, Option<f32>, Option<f32>, String)>()
            .filter_map(std::result::Result::ok)
            .map(row_to_waypoint)
            .collect();
        Ok(waypoints)
    }

    async fn replace_for_mission(&self, mission_id: Uuid, waypoints: &[Waypoint]) -> Result<()> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.delete_waypoints_by_mission,
                (mission_id,),
            )
            .await?;

        for (sequence, wp) in waypoints.iter().enumerate() {
            self.client
                .session
                .execute(
                    &self.client.prepared_stmts.insert_waypoint,
                    (
                        mission_id,
                        i32::try_from(sequence).unwrap_or(i32::MAX),
                        wp.position.latitude,
                        wp.position.longitude,
                        wp.position.altitude_m,
                        wp.speed_mps,
                        wp.heading_deg,
                        waypoint_action_str(wp.action),
                    ),
                )
                .await?;
        }
        Ok(())
    }

    async fn delete_by_mission(&self, mission_id: Uuid) -> Result<()> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.delete_waypoints_by_mission,
                (mission_id,),
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// DETECTION REPOSITORY
// =============================================================================

pub struct ScyllaDetectionRepository {
    client: ScyllaClient,
}

impl ScyllaDetectionRepository {
    #[must_use]
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn get_by_id(&self, detection_id: Uuid) -> Result<Option<Detection>> {
        let result = self
            .client
            .session
            .execute(&self.client.prepared_stmts.get_detection, (detection_id,))
            .await?;

        let detection = result
            .rows
            .unwrap_or_default()
            .into_typed::<(
                Uuid,
                Uuid,
                Option<Uuid>,
                String,
                f32,
                f64,
                f64,
                f64,
                Option<f32>,
                Option<f32>,
                Option<f32>,
                Option<f32>,
                Option<String>,
                DateTime<Utc>,
            )>()
            .next()
            .transpose()?
            .map(Self::row_to_detection);
        Ok(detection)
    }

    fn row_to_detection(
        row: (
            Uuid,
            Uuid,
            Option<Uuid>,
            String,
            f32,
            f64,
            f64,
            f64,
            Option<f32>,
            Option<f32>,
            Option<f32>,
            Option<f32>,
            Option<String>,
            DateTime<Utc>,
        ),
    ) -> Detection {
        let (
            detection_id,
            uav_id,
            mission_id,
            object_class,
            confidence,
            lat,
            lon,
            alt,
            bbox_x,
            bbox_y,
            bbox_w,
            bbox_h,
            evidence_reference,
            created_at,
        ) = row;
        let bbox = match (bbox_x, bbox_y, bbox_w, bbox_h) {
            (Some(x), Some(y), Some(width), Some(height)) => {
                Some(BoundingBox { x, y, width, height })
            }
            _ => None,
        };
        Detection {
            detection_id,
            uav_id,
            mission_id,
            object_class,
            confidence,
            position: Coordinates::new(lat, lon, alt),
            bbox,
            evidence_reference,
            created_at,
        }
    }
}

#[async_trait]
impl DetectionRepository for ScyllaDetectionRepository {
    async fn get_by_mission(&self, mission_id: Uuid) -> Result<Vec<Detection>> {
        let result = self
            .client
            .session
            .execute(
                &self.client.prepared_stmts.get_detections_by_mission,
                (mission_id,),
            )
            .await?;

        let detection_ids: Vec<Uuid> = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, DateTime<Utc>, Uuid)>()
            .filter_map(std::result::Result::ok)
            .map(|(_, _, detection_id)| detection_id)
            .collect();

        let mut detections = Vec::with_capacity(detection_ids.len());
        for detection_id in detection_ids {
            if let Some(detection) = self.get_by_id(detection_id).await? {
                detections.push(detection);
            }
        }
        Ok(detections)
    }

    async fn get_by_uav_range(
        &self,
        uav_id: Uuid,
        range: TimeRange,
        limit: Option<i32>,
    ) -> Result<Vec<Detection>> {
        let result = self
            .client
            .session
            .execute(
                &self.client.prepared_stmts.get_detections_by_uav_range,
                (uav_id, range.start, range.end, limit.unwrap_or(100)),
            )
            .await?;

        let detection_ids: Vec<Uuid> = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, DateTime<Utc>, Uuid)>()
            .filter_map(std::result::Result::ok)
            .map(|(_, _, detection_id)| detection_id)
            .collect();

        let mut detections = Vec::with_capacity(detection_ids.len());
        for detection_id in detection_ids {
            if let Some(detection) = self.get_by_id(detection_id).await? {
                detections.push(detection);
            }
        }
        Ok(detections)
    }

    async fn insert(&self, detection: &Detection) -> Result<()> {
        let (bbox_x, bbox_y, bbox_w, bbox_h) = match detection.bbox {
            Some(BoundingBox {
                x,
                y,
                width,
                height,
            }) => (Some(x), Some(y), Some(width), Some(height)),
            None => (None, None, None, None),
        };

        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_detection,
                (
                    detection.detection_id,
                    detection.uav_id,
                    detection.mission_id,
                    &detection.object_class,
                    detection.confidence,
                    detection.position.latitude,
                    detection.position.longitude,
                    detection.position.altitude_m,
                    bbox_x,
                    bbox_y,
                    bbox_w,
                    bbox_h,
                    &detection.evidence_reference,
                    detection.created_at,
                ),
            )
            .await?;

        if let Some(mission_id) = detection.mission_id {
            self.client
                .session
                .execute(
                    &self.client.prepared_stmts.insert_detection_by_mission,
                    (mission_id, detection.created_at, detection.detection_id),
                )
                .await?;
        }

        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_detection_by_uav,
                (detection.uav_id, detection.created_at, detection.detection_id),
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// TELEMETRY REPOSITORY
// =============================================================================

pub struct ScyllaTelemetryRepository {
    client: ScyllaClient,
    cache: Option<SharedCacheClient>,
}

impl ScyllaTelemetryRepository {
    #[must_use]
    pub fn new(client: ScyllaClient, cache: Option<SharedCacheClient>) -> Self {
        Self { client, cache }
    }

    fn row_to_sample(
        row: (Uuid, DateTime<Utc>, f64, f64, f64, f32, f32, f32, String),
    ) -> TelemetrySample {
        let (uav_id, recorded_at, lat, lon, alt, battery_pct, speed_mps, heading_deg, status) =
            row;
        TelemetrySample {
            uav_id,
            position: Coordinates::new(lat, lon, alt),
            battery_pct,
            speed_mps,
            heading_deg,
            status: parse_uav_status(&status),
            recorded_at,
        }
    }
}

#[async_trait]
impl TelemetryRepository for ScyllaTelemetryRepository {
    async fn get_by_uav_range(
        &self,
        uav_id: Uuid,
        range: TimeRange,
        limit: Option<i32>,
    ) -> Result<Vec<TelemetrySample>> {
        let result = self
            .client
            .session
            .execute(
                &self.client.prepared_stmts.get_telemetry_by_uav_range,
                (uav_id, range.start, range.end, limit.unwrap_or(1000)),
            )
            .await?;

        let samples = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, DateTime<Utc>, f64, f64, f64, f32, f32, f32, String)>()
            .filter_map(std::result::Result::ok)
            .map(Self::row_to_sample)
            .collect();
        Ok(samples)
    }

    async fn get_latest(&self, uav_id: Uuid) -> Result<Option<TelemetrySample>> {
        if let Some(cache) = &self.cache {
            if let Ok(Some(sample)) = cache.get_latest_telemetry(uav_id).await {
                return Ok(Some(sample));
            }
        }
        let result = self
            .client
            .session
            .execute(&self.client.prepared_stmts.get_latest_telemetry, (uav_id,))
            .await?;

        let sample = result
            .rows
            .unwrap_or_default()
            .into_typed::<(Uuid, DateTime<Utc>, f64, f64, f64, f32, f32, f32, String)>()
            .next()
            .transpose()?
            .map(Self::row_to_sample);
        Ok(sample)
    }

    async fn insert(&self, sample: &TelemetrySample) -> Result<()> {
        self.client
            .session
            .execute(
                &self.client.prepared_stmts.insert_telemetry,
                (
                    sample.uav_id,
                    sample.recorded_at,
                    sample.position.latitude,
                    sample.position.longitude,
                    sample.position.altitude_m,
                    sample.battery_pct,
                    sample.speed_mps,
                    sample.heading_deg,
                    uav_status_str(sample.status),
                ),
            )
            .await?;

        if let Some(cache) = &self.cache {
            let _ = cache.set_latest_telemetry(sample).await;
        }
        Ok(())
    }

    async fn insert_batch(&self, samples: &[TelemetrySample]) -> Result<()> {
        for sample in samples {
            self.insert(sample).await?;
        }
        Ok(())
    }
}

// =============================================================================
// UNIT OF WORK
// =============================================================================

/// ScyllaDB-backed unit of work, bundling one repository per entity behind
/// a shared client and cache.
pub struct ScyllaUnitOfWork {
    tiles: ScyllaTileRepository,
    uavs: ScyllaUavRepository,
    alerts: ScyllaAlertRepository,
    missions: ScyllaMissionRepository,
    waypoints: ScyllaWaypointRepository,
    detections: ScyllaDetectionRepository,
    telemetry: ScyllaTelemetryRepository,
}

impl ScyllaUnitOfWork {
    #[must_use]
    pub fn new(client: ScyllaClient, cache: Option<SharedCacheClient>) -> Self {
        Self {
            tiles: ScyllaTileRepository::new(client.clone()),
            uavs: ScyllaUavRepository::new(client.clone(), cache.clone()),
            alerts: ScyllaAlertRepository::new(client.clone()),
            missions: ScyllaMissionRepository::new(client.clone()),
            waypoints: ScyllaWaypointRepository::new(client.clone()),
            detections: ScyllaDetectionRepository::new(client.clone()),
            telemetry: ScyllaTelemetryRepository::new(client, cache),
        }
    }
}

#[async_trait]
impl UnitOfWork for ScyllaUnitOfWork {
    type TileRepo = ScyllaTileRepository;
    type UavRepo = ScyllaUavRepository;
    type AlertRepo = ScyllaAlertRepository;
    type MissionRepo = ScyllaMissionRepository;
    type WaypointRepo = ScyllaWaypointRepository;
    type DetectionRepo = ScyllaDetectionRepository;
    type TelemetryRepo = ScyllaTelemetryRepository;

    fn tiles(&self) -> &Self::TileRepo {
        &self.tiles
    }

    fn uavs(&self) -> &Self::UavRepo {
        &self.uavs
    }

    fn alerts(&self) -> &Self::AlertRepo {
        &self.alerts
    }

    fn missions(&self) -> &Self::MissionRepo {
        &self.missions
    }

    fn waypoints(&self) -> &Self::WaypointRepo {
        &self.waypoints
    }

    fn detections(&self) -> &Self::DetectionRepo {
        &self.detections
    }

    fn telemetry(&self) -> &Self::TelemetryRepo {
        &self.telemetry
    }
}

// =============================================================================
// SHARED CLIENT TYPE
// =============================================================================

pub type SharedScyllaClient = Arc<ScyllaClient>;

#[must_use]
pub fn shared_scylla(client: ScyllaClient) -> SharedScyllaClient {
    Arc::new(client)
}
