//! API configuration.

use std::time::Duration;

use agrisave_capture::CaptureConfig;
use agrisave_classifier::ClassifierConfig;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Expose `/metrics`
    pub metrics_enabled: bool,
    /// Surfaces unused for this long are torn down
    pub surface_idle_ttl: Duration,
    /// Most surfaces hosted at once
    pub max_surfaces: usize,
    /// Sessions unused for this long are dropped
    pub session_idle_ttl: Duration,
    /// Most login sessions held at once
    pub max_sessions: usize,
    /// Classification backend
    pub classifier: ClassifierConfig,
    /// Camera and snapshot capture
    pub capture: CaptureConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 10 * 1024 * 1024, // 10MB
            environment: "development".to_string(),
            metrics_enabled: true,
            surface_idle_ttl: Duration::from_secs(30 * 60),
            max_surfaces: 1_000,
            session_idle_ttl: Duration::from_secs(24 * 60 * 60),
            max_sessions: 10_000,
            classifier: ClassifierConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            surface_idle_ttl: Duration::from_secs(
                std::env::var("SURFACE_IDLE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30 * 60),
            ),
            max_surfaces: std::env::var("MAX_SURFACES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1_000),
            session_idle_ttl: Duration::from_secs(
                std::env::var("SESSION_IDLE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(24 * 60 * 60),
            ),
            max_sessions: std::env::var("MAX_SESSIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),
            classifier: ClassifierConfig::from_env(),
            capture: CaptureConfig::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
