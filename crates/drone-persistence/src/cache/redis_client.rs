//! # Redis Cache Layer
//!
//! Redis client wrapper with typed operations for fleet state, the pending
//! alert queue, and telemetry, backing the cache-aside [`ReadStrategy`]/
//! [`WriteStrategy`] combinators in [`crate::strategy`].
//!
//! [`ReadStrategy`]: crate::strategy::ReadStrategy
//! [`WriteStrategy`]: crate::strategy::WriteStrategy

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use drone_domain::{Alert, TelemetrySample, Uav};

/// Cache TTL configuration
#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    pub telemetry: Duration,
    pub fleet_state: Duration,
    pub pending_alert_queue: Duration,
    pub tile_summary: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            telemetry: Duration::from_secs(10),
            fleet_state: Duration::from_secs(60),
            pending_alert_queue: Duration::from_secs(300),
            tile_summary: Duration::from_secs(120),
        }
    }
}

/// Redis cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: String,
    pub pool_size: usize,
    pub ttl: CacheTtl,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: 10,
            ttl: CacheTtl::default(),
        }
    }
}

/// Redis cache client with connection pooling
#[derive(Clone)]
pub struct CacheClient {
    conn: ConnectionManager,
    config: CacheConfig,
}

impl CacheClient {
    /// Create a new cache client
    pub async fn new(config: CacheConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self { conn, config })
    }

    /// Get raw connection for advanced operations
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    // =========================================================================
    // GENERIC OPERATIONS
    // =========================================================================

    /// Get a JSON value from cache
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(json) => {
                let parsed = serde_json::from_str(&json)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a JSON value in cache with TTL
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(value)?;
        let _: () = conn.set_ex(key, json, ttl.as_secs()).await?;
        Ok(())
    }

    /// Delete a key from cache
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    /// Delete multiple keys
    pub async fn delete_many(&self, keys: &[String]) -> Result<i64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(keys).await?;
        Ok(deleted)
    }

    /// Check if key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    // =========================================================================
    // FLEET STATE OPERATIONS (cache-aside snapshot of C7's UAV registry)
    // =========================================================================

    /// Get the cached fleet snapshot for a UAV.
    pub async fn get_fleet_snapshot(&self, uav_id: Uuid) -> Result<Option<Uav>> {
        let key = format!("fleet:state:{uav_id}");
        self.get_json(&key).await
    }

    /// Populate/refresh the cached fleet snapshot for a UAV.
    pub async fn set_fleet_snapshot(&self, uav: &Uav) -> Result<()> {
        let key = format!("fleet:state:{}", uav.uav_id);
        self.set_json(&key, uav, self.config.ttl.fleet_state).await
    }

    /// Drop the cached fleet snapshot, e.g. after a UAV is deregistered.
    pub async fn invalidate_uav(&self, uav_id: Uuid) -> Result<()> {
        let keys = vec![
            format!("fleet:state:{uav_id}"),
            format!("telemetry:latest:{uav_id}"),
        ];
        self.delete_many(&keys).await?;
        Ok(())
    }

    // =========================================================================
    // PENDING ALERT QUEUE CACHE (ZSET keyed by priority, §4.6)
    // =========================================================================

    /// Snapshot the pending-alert queue ordering, highest priority first.
    /// Backs C6's alert queue for observability/recovery without replaying
    /// every `alerts_by_status` row from ScyllaDB.
    pub async fn get_pending_alert_queue(&self, limit: usize) -> Result<Vec<Uuid>> {
        let key = "queue:alerts:pending";
        let mut conn = self.conn.clone();

        let members: Vec<String> = conn
            .zrevrange(key, 0, isize::try_from(limit).unwrap_or(isize::MAX) - 1)
            .await?;

        Ok(members
            .into_iter()
            .filter_map(|s| Uuid::parse_str(&s).ok())
            .collect())
    }

    /// Push a newly queued alert onto the pending-alert queue, scored by
    /// priority so the scheduler can peek the highest-priority alert first.
    pub async fn enqueue_pending_alert(&self, alert: &Alert) -> Result<()> {
        let key = "queue:alerts:pending";
        let mut conn = self.conn.clone();

        let _: () = conn
            .zadd(key, alert.alert_id.to_string(), f64::from(alert.priority))
            .await?;
        let _: () = conn
            .expire(key, i64::try_from(self.config.ttl.pending_alert_queue.as_secs()).unwrap_or(i64::MAX))
            .await?;
        Ok(())
    }

    /// Remove an alert from the pending queue once it has been assigned,
    /// expired, or resolved.
    pub async fn dequeue_pending_alert(&self, alert_id: Uuid) -> Result<bool> {
        let key = "queue:alerts:pending";
        let mut conn = self.conn.clone();

        let removed: i64 = conn.zrem(key, alert_id.to_string()).await?;
        Ok(removed > 0)
    }

    // =========================================================================
    // TELEMETRY OPERATIONS (latest-sample cache-aside)
    // =========================================================================

    /// Cache the most recent telemetry sample for a UAV.
    pub async fn set_latest_telemetry(&self, sample: &TelemetrySample) -> Result<()> {
        let key = format!("telemetry:latest:{}", sample.uav_id);
        self.set_json(&key, sample, self.config.ttl.telemetry).await
    }

    /// Fetch the most recent cached telemetry sample for a UAV.
    pub async fn get_latest_telemetry(&self, uav_id: Uuid) -> Result<Option<TelemetrySample>> {
        let key = format!("telemetry:latest:{uav_id}");
        self.get_json(&key).await
    }
}

/// Shared cache client wrapper
pub type SharedCacheClient = Arc<CacheClient>;

/// Create a shared cache client
#[must_use]
pub fn shared_cache(client: CacheClient) -> SharedCacheClient {
    Arc::new(client)
}
