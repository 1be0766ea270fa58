//! Runtime configuration, assembled from the environment (§1, §4.8-§4.12).

use std::net::SocketAddr;
use std::time::Duration;

use drone_domain::AlertSeverity;

#[derive(Debug, Clone)]
pub struct ScyllaConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: usize,
}

#[derive(Debug, Clone)]
pub struct BusConfig {
    /// When set, the core runs `RedisBus` against this URL; otherwise it
    /// falls back to an in-process broadcast bus (single-binary / test mode).
    pub redis_url: Option<String>,
}

/// Scheduler tuning (C8, §4.8).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub poll_batch_k: usize,
    pub min_battery_pct: f32,
    pub alert_ttl: chrono::Duration,
    pub fast_path_min_severity: AlertSeverity,
    pub low_battery_charge_threshold: f32,
    pub comm_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            poll_batch_k: 32,
            min_battery_pct: 30.0,
            alert_ttl: chrono::Duration::minutes(30),
            fast_path_min_severity: AlertSeverity::High,
            low_battery_charge_threshold: 20.0,
            comm_timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// Mission dispatch tuning (C9, §4.9).
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub cruise_speed_mps: f32,
    pub turn_radius_m: f64,
    pub sector_scan_radius_m: f64,
    pub lawnmower_row_spacing_m: f64,
    pub default_altitude_m: f64,
    pub max_demotions: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cruise_speed_mps: 15.0,
            turn_radius_m: 25.0,
            sector_scan_radius_m: 500.0,
            lawnmower_row_spacing_m: 80.0,
            default_altitude_m: 60.0,
            max_demotions: 3,
        }
    }
}

/// Telemetry ingest tuning (C10, §4.10).
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub rate_limit_hz: f64,
    pub waypoint_arrival_tolerance_m: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            rate_limit_hz: 10.0,
            waypoint_arrival_tolerance_m: 25.0,
        }
    }
}

/// Detection ingest tuning (C11, §4.11).
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub min_confidence: f32,
    pub broadcast_confidence_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            broadcast_confidence_threshold: 0.5,
        }
    }
}

/// Subscriber fan-out tuning (C12, §4.12).
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    pub backpressure_limit: u32,
    pub heartbeat_window: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            backpressure_limit: 64,
            heartbeat_window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub scylla: ScyllaConfig,
    pub redis: RedisConfig,
    pub bus: BusConfig,
    pub scheduler: SchedulerConfig,
    pub dispatch: DispatchConfig,
    pub telemetry: TelemetryConfig,
    pub detection: DetectionConfig,
    pub fanout: FanoutConfig,
    pub log_level: String,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let server_addr = std::env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8090".to_string())
            .parse()
            .expect("Invalid SERVER_ADDR");

        let scylla_hosts = std::env::var("SCYLLA_HOSTS")
            .unwrap_or_else(|_| "127.0.0.1:9042".to_string())
            .split(',')
            .map(str::trim)
            .map(String::from)
            .collect();

        let scylla = ScyllaConfig {
            hosts: scylla_hosts,
            keyspace: std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "drone_ops".to_string()),
            username: std::env::var("SCYLLA_USERNAME").ok(),
            password: std::env::var("SCYLLA_PASSWORD").ok(),
        };

        let redis = RedisConfig {
            url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            pool_size: std::env::var("REDIS_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        };

        let bus = BusConfig {
            redis_url: std::env::var("BUS_REDIS_URL").ok(),
        };

        let tick_interval_s = std::env::var("SCHEDULER_TICK_INTERVAL_S")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let scheduler = SchedulerConfig {
            tick_interval: Duration::from_secs(tick_interval_s),
            ..SchedulerConfig::default()
        };

        Self {
            server_addr,
            scylla,
            redis,
            bus,
            scheduler,
            dispatch: DispatchConfig::default(),
            telemetry: TelemetryConfig::default(),
            detection: DetectionConfig::default(),
            fanout: FanoutConfig::default(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
