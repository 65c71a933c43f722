use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::scoring::{PointsPolicy, TierThresholds};

/// Configuration for the traffic-watch client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Remote API configuration
    pub api: ApiConfig,
    /// Durable session storage
    pub storage: StorageConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Gamification configuration
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the reporting API (e.g. http://localhost:8000/api)
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Upper bound on the "loading" phase of session restore
    pub restore_timeout_secs: u64,
    /// Require HTTPS for the API base URL
    pub require_https: bool,
    /// Maximum response size in bytes
    pub max_response_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// File holding the persisted credential and identity snapshot
    pub session_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Mask tokens and passwords before they reach the log
    pub sanitize_logs: bool,
    /// Emit span events around requests
    pub log_requests: bool,
}

/// Badge thresholds and points policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Minimum points for Silver
    pub silver_threshold: u64,
    /// Minimum points for Gold
    pub gold_threshold: u64,
    /// Minimum points for Platinum
    pub platinum_threshold: u64,
    /// Points for a verified report
    pub verified_report_points: u64,
    /// Extra points when the verified report carried an evidence photo
    pub evidence_bonus_points: u64,
    /// Default number of leaderboard rows requested
    pub leaderboard_limit: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let thresholds = TierThresholds::default();
        let policy = PointsPolicy::default();
        Self {
            silver_threshold: thresholds.silver,
            gold_threshold: thresholds.gold,
            platinum_threshold: thresholds.platinum,
            verified_report_points: policy.verified_points,
            evidence_bonus_points: policy.evidence_bonus,
            leaderboard_limit: 50,
        }
    }
}

impl ScoringConfig {
    /// Convert to TierThresholds for use by the scoring engine
    pub fn to_thresholds(&self) -> TierThresholds {
        TierThresholds {
            silver: self.silver_threshold,
            gold: self.gold_threshold,
            platinum: self.platinum_threshold,
        }
    }

    /// Convert to the points policy applied on review
    pub fn to_policy(&self) -> PointsPolicy {
        PointsPolicy {
            verified_points: self.verified_report_points,
            evidence_bonus: self.evidence_bonus_points,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            restore_timeout_secs: 10,
            require_https: false,
            max_response_size: 5 * 1024 * 1024, // 5MB
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);
        Self {
            session_path: base.join(".traffic-watch").join("session.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            sanitize_logs: true,
            log_requests: false,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // API configuration
        if let Some(require_https) = lookup("TRAFFIC_WATCH_REQUIRE_HTTPS") {
            config.api.require_https = require_https
                .parse()
                .context("Invalid TRAFFIC_WATCH_REQUIRE_HTTPS value")?;
        }

        if let Some(base_url) = lookup("TRAFFIC_WATCH_API_URL") {
            config.api.base_url = base_url;
        }

        if let Some(timeout) = lookup("TRAFFIC_WATCH_TIMEOUT_SECS") {
            config.api.timeout_secs = timeout
                .parse()
                .context("Invalid TRAFFIC_WATCH_TIMEOUT_SECS value")?;
        }

        if let Some(timeout) = lookup("TRAFFIC_WATCH_RESTORE_TIMEOUT_SECS") {
            config.api.restore_timeout_secs = timeout
                .parse()
                .context("Invalid TRAFFIC_WATCH_RESTORE_TIMEOUT_SECS value")?;
        }

        if let Some(size) = lookup("TRAFFIC_WATCH_MAX_RESPONSE_SIZE") {
            config.api.max_response_size = size
                .parse()
                .context("Invalid TRAFFIC_WATCH_MAX_RESPONSE_SIZE value")?;
        }

        // Storage configuration
        if let Some(path) = lookup("TRAFFIC_WATCH_SESSION_PATH") {
            config.storage.session_path = PathBuf::from(path);
        }

        // Logging configuration
        if let Some(level) = lookup("TRAFFIC_WATCH_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(sanitize) = lookup("TRAFFIC_WATCH_SANITIZE_LOGS") {
            config.logging.sanitize_logs = sanitize
                .parse()
                .context("Invalid TRAFFIC_WATCH_SANITIZE_LOGS value")?;
        }

        if let Some(log_requests) = lookup("TRAFFIC_WATCH_LOG_REQUESTS") {
            config.logging.log_requests = log_requests
                .parse()
                .context("Invalid TRAFFIC_WATCH_LOG_REQUESTS value")?;
        }

        // Scoring configuration
        if let Some(threshold) = lookup("TRAFFIC_WATCH_SILVER_THRESHOLD") {
            config.scoring.silver_threshold = threshold
                .parse()
                .context("Invalid TRAFFIC_WATCH_SILVER_THRESHOLD value")?;
        }

        if let Some(threshold) = lookup("TRAFFIC_WATCH_GOLD_THRESHOLD") {
            config.scoring.gold_threshold = threshold
                .parse()
                .context("Invalid TRAFFIC_WATCH_GOLD_THRESHOLD value")?;
        }

        if let Some(threshold) = lookup("TRAFFIC_WATCH_PLATINUM_THRESHOLD") {
            config.scoring.platinum_threshold = threshold
                .parse()
                .context("Invalid TRAFFIC_WATCH_PLATINUM_THRESHOLD value")?;
        }

        if let Some(points) = lookup("TRAFFIC_WATCH_VERIFIED_REPORT_POINTS") {
            config.scoring.verified_report_points = points
                .parse()
                .context("Invalid TRAFFIC_WATCH_VERIFIED_REPORT_POINTS value")?;
        }

        if let Some(points) = lookup("TRAFFIC_WATCH_EVIDENCE_BONUS_POINTS") {
            config.scoring.evidence_bonus_points = points
                .parse()
                .context("Invalid TRAFFIC_WATCH_EVIDENCE_BONUS_POINTS value")?;
        }

        if let Some(limit) = lookup("TRAFFIC_WATCH_LEADERBOARD_LIMIT") {
            config.scoring.leaderboard_limit = limit
                .parse()
                .context("Invalid TRAFFIC_WATCH_LEADERBOARD_LIMIT value")?;
        }

        if !config.api.require_https && !config.api.base_url.starts_with("https://") {
            warn!(
                "API base URL is not HTTPS: {} (credentials travel in clear text)",
                config.api.base_url
            );
        }

        config.validate()?;

        info!(
            base_url = %config.api.base_url,
            session_path = %config.storage.session_path.display(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate configuration for security and consistency
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(anyhow::anyhow!("API base URL cannot be empty"));
        }

        url::Url::parse(&self.api.base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.api.base_url))?;

        if self.api.require_https && !self.api.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "HTTPS is required but API base URL is not HTTPS: {}",
                self.api.base_url
            ));
        }

        if self.api.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Request timeout must be non-zero"));
        }

        if self.api.restore_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Session restore timeout must be non-zero"));
        }

        if self.storage.session_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Session path cannot be empty"));
        }

        self.scoring
            .to_thresholds()
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid badge thresholds: {}", e))?;

        if self.scoring.leaderboard_limit == 0 {
            return Err(anyhow::anyhow!("Leaderboard limit must be non-zero"));
        }

        Ok(())
    }
}

/// Sanitize sensitive data for logging
pub fn sanitize_for_logging(data: &str) -> String {
    let sensitive_patterns = ["token", "password", "secret", "credential", "bearer", "auth"];

    let data_lower = data.to_lowercase();
    if sensitive_patterns.iter().any(|p| data_lower.contains(p)) {
        return mask_secret(data);
    }

    data.to_string()
}

const MIN_PARTIAL_MASK_LEN: usize = 8;

/// Mask a secret value, keeping only a few characters at each end.
/// Short secrets are masked entirely.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < MIN_PARTIAL_MASK_LEN {
        return "***".to_string();
    }
    let keep = if chars.len() > 20 { 6 } else { 2 };
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{}***{}", head, tail)
}
