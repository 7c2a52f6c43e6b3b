//! API configuration.

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use vtryon_storage::RetentionPolicy;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// General API rate limit, requests per second per IP
    pub rate_limit_rps: u32,
    /// General API rate limit burst
    pub rate_limit_burst: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Peers whose X-Forwarded-For / X-Real-IP headers are honoured
    pub trusted_proxies: Vec<IpAddr>,

    /// Directory holding uploads and generated results
    pub upload_dir: PathBuf,
    /// JSON catalog of garment items
    pub catalog_path: PathBuf,
    /// Timeout for downloading garment images
    pub garment_fetch_timeout: Duration,
    /// Largest garment download accepted, in bytes
    pub max_garment_bytes: usize,
    /// Scratch directory for live frames, outside the served upload dir
    pub frame_scratch_dir: PathBuf,
    /// Garment cache size kept after each trim
    pub garment_cache_capacity: usize,

    /// Live requests accepted per client per window
    pub live_rate_limit: usize,
    /// Sliding window for live requests
    pub live_rate_window: Duration,
    /// Idle time after which a client's limiter state is dropped
    pub rate_limit_retention: Duration,
    /// Live result retention
    pub retention: RetentionPolicy,
    /// Live writes between opportunistic sweeps
    pub clean_every_writes: u64,
    /// Period of the background housekeeping task
    pub housekeeping_interval: Duration,

    /// Single-shot pose model (searched in default locations when unset)
    pub pose_model_single_shot: Option<PathBuf>,
    /// Streaming pose model (searched in default locations when unset)
    pub pose_model_streaming: Option<PathBuf>,
    /// Background removal model (searched in default locations when unset)
    pub bg_model_path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 20,
            rate_limit_burst: 40,
            request_timeout: Duration::from_secs(30),
            max_body_size: 16 * 1024 * 1024, // 16MB
            environment: "development".to_string(),
            trusted_proxies: Vec::new(),
            upload_dir: PathBuf::from("uploads"),
            catalog_path: PathBuf::from("catalog.json"),
            garment_fetch_timeout: Duration::from_secs(10),
            max_garment_bytes: vtryon_storage::DEFAULT_MAX_GARMENT_BYTES,
            frame_scratch_dir: std::env::temp_dir().join("vtryon-frames"),
            garment_cache_capacity: 50,
            live_rate_limit: 5,
            live_rate_window: Duration::from_secs(2),
            rate_limit_retention: Duration::from_secs(3600),
            retention: RetentionPolicy::default(),
            clean_every_writes: 20,
            housekeeping_interval: Duration::from_secs(60),
            pose_model_single_shot: None,
            pose_model_streaming: None,
            bg_model_path: None,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

/// Comma-separated IP list; unparsable entries are skipped.
fn parse_ip_list(value: &str) -> Vec<IpAddr> {
    value
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_or("API_PORT", defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_or("RATE_LIMIT_RPS", defaults.rate_limit_rps),
            rate_limit_burst: env_or("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT", 30)),
            max_body_size: env_or("MAX_BODY_SIZE", defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            trusted_proxies: std::env::var("TRUSTED_PROXIES")
                .map(|s| parse_ip_list(&s))
                .unwrap_or(defaults.trusted_proxies),

            upload_dir: env_path("UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            catalog_path: env_path("CATALOG_PATH").unwrap_or(defaults.catalog_path),
            garment_fetch_timeout: Duration::from_secs(env_or("GARMENT_FETCH_TIMEOUT_SECS", 10)),
            max_garment_bytes: env_or("MAX_GARMENT_BYTES", defaults.max_garment_bytes),
            frame_scratch_dir: env_path("FRAME_SCRATCH_DIR").unwrap_or(defaults.frame_scratch_dir),
            garment_cache_capacity: env_or("GARMENT_CACHE_CAPACITY", defaults.garment_cache_capacity),

            live_rate_limit: env_or("LIVE_RATE_LIMIT", defaults.live_rate_limit),
            live_rate_window: Duration::from_secs(env_or("LIVE_RATE_WINDOW_SECS", 2)),
            rate_limit_retention: Duration::from_secs(env_or("RATE_LIMIT_RETENTION_SECS", 3600)),
            retention: RetentionPolicy {
                max_results: env_or("MAX_LIVE_RESULTS", defaults.retention.max_results),
                keep_results: env_or("KEEP_LIVE_RESULTS", defaults.retention.keep_results),
            },
            clean_every_writes: env_or("CLEAN_EVERY_WRITES", defaults.clean_every_writes),
            housekeeping_interval: Duration::from_secs(env_or("HOUSEKEEPING_INTERVAL_SECS", 60)),

            pose_model_single_shot: env_path("POSE_MODEL_SINGLE_SHOT"),
            pose_model_streaming: env_path("POSE_MODEL_STREAMING"),
            bg_model_path: env_path("BG_MODEL_PATH"),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}
