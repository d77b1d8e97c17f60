//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file; every field has a default
//! so a missing file yields a fully working demo setup.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::TimeBasis;
use crate::error::{ConfigError, Result};
use crate::service::DetectorConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub limiter: LimiterConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Loop cadences and lifecycle windows.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Seconds between detection passes over the quote board.
    #[serde(default = "default_detection_interval_secs")]
    pub detection_interval_secs: u64,
    /// Seconds between snapshot passes over active trackings.
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,
    /// Quotes older than this are ignored by detection.
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,
    /// How long an expired symbol's state lingers before GC.
    #[serde(default = "default_expiry_grace_secs")]
    pub expiry_grace_secs: u64,
    /// Time basis the detector normalizes rates to.
    #[serde(default = "default_time_basis_hours")]
    pub time_basis_hours: u32,
    /// Per-subscriber event buffer before a slow consumer lags.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

const fn default_detection_interval_secs() -> u64 {
    10
}

const fn default_snapshot_interval_secs() -> u64 {
    60
}

const fn default_staleness_secs() -> u64 {
    120
}

const fn default_expiry_grace_secs() -> u64 {
    300
}

const fn default_time_basis_hours() -> u32 {
    8
}

const fn default_broadcast_capacity() -> usize {
    256
}

/// Trading fee assumptions.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeConfig {
    /// Taker fee per trade; a full cycle pays it four times.
    #[serde(default = "default_taker_fee_rate")]
    pub taker_fee_rate: Decimal,
}

fn default_taker_fee_rate() -> Decimal {
    Decimal::new(5, 4) // 0.0005
}

/// Opportunity detection thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    /// Net profit at which a symbol becomes an active opportunity.
    #[serde(default = "default_min_spread")]
    pub min_spread: Decimal,
    /// Net profit at which a pair appears in the published list.
    #[serde(default = "default_approaching_spread")]
    pub approaching_spread: Decimal,
    /// Smallest best-pair change that produces an update event.
    #[serde(default = "default_min_update_delta")]
    pub min_update_delta: Decimal,
}

fn default_min_spread() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn default_approaching_spread() -> Decimal {
    Decimal::new(5, 4) // 0.0005
}

fn default_min_update_delta() -> Decimal {
    Decimal::new(1, 4) // 0.0001
}

/// Net-profit cache behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Seconds a cached calculation stays fresh.
    #[serde(default = "default_profit_ttl_secs")]
    pub profit_ttl_secs: u64,
}

const fn default_profit_ttl_secs() -> u64 {
    10
}

/// Admission control per protected surface.
#[derive(Debug, Clone, Deserialize)]
pub struct LimiterConfig {
    /// Quote ingestion, keyed by exchange.
    #[serde(default = "default_ingest_limit")]
    pub ingest: SurfaceLimit,
    /// User queries and commands, keyed by user.
    #[serde(default = "default_query_limit")]
    pub query: SurfaceLimit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceLimit {
    pub max_requests: u32,
    pub window_ms: u64,
}

const fn default_ingest_limit() -> SurfaceLimit {
    SurfaceLimit {
        max_requests: 600,
        window_ms: 60_000,
    }
}

const fn default_query_limit() -> SurfaceLimit {
    SurfaceLimit {
        max_requests: 30,
        window_ms: 60_000,
    }
}

/// Synthetic demo quote feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Run the built-in random-walk feed.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_feed_symbols")]
    pub symbols: Vec<String>,
    #[serde(default = "default_feed_exchanges")]
    pub exchanges: Vec<String>,
    /// Milliseconds between emitted quote rounds.
    #[serde(default = "default_feed_interval_ms")]
    pub interval_ms: u64,
    /// Funding interval the synthetic quotes settle on.
    #[serde(default = "default_time_basis_hours")]
    pub funding_interval_hours: u32,
}

const fn default_true() -> bool {
    true
}

fn default_feed_symbols() -> Vec<String> {
    vec![
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "SOLUSDT".to_string(),
    ]
}

fn default_feed_exchanges() -> Vec<String> {
    vec![
        "binance".to_string(),
        "bybit".to_string(),
        "okx".to_string(),
    ]
}

const fn default_feed_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    ///
    /// The fallback notice goes to stderr because logging is not yet
    /// initialized at load time.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            eprintln!(
                "configuration file {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.thresholds.approaching_spread > self.thresholds.min_spread {
            return Err(ConfigError::InvalidValue {
                field: "thresholds.approaching_spread",
                reason: "must not exceed thresholds.min_spread".to_string(),
            }
            .into());
        }
        if self.fees.taker_fee_rate < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "fees.taker_fee_rate",
                reason: "must not be negative".to_string(),
            }
            .into());
        }
        if self.engine.detection_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.detection_interval_secs",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.engine.snapshot_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.snapshot_interval_secs",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if self.engine.broadcast_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.broadcast_capacity",
                reason: "must be positive".to_string(),
            }
            .into());
        }
        if TimeBasis::from_hours(self.engine.time_basis_hours).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "engine.time_basis_hours",
                reason: format!(
                    "unsupported basis {}h, expected 1, 8 or 24",
                    self.engine.time_basis_hours
                ),
            }
            .into());
        }
        for (field, limit) in [
            ("limiter.ingest", &self.limiter.ingest),
            ("limiter.query", &self.limiter.query),
        ] {
            if limit.max_requests == 0 || limit.window_ms == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "max_requests and window_ms must be positive".to_string(),
                }
                .into());
            }
        }
        if self.feed.enabled {
            if self.feed.symbols.is_empty() || self.feed.exchanges.len() < 2 {
                return Err(ConfigError::InvalidValue {
                    field: "feed",
                    reason: "needs at least one symbol and two exchanges".to_string(),
                }
                .into());
            }
            if self.feed.interval_ms == 0 || self.feed.funding_interval_hours == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "feed",
                    reason: "interval_ms and funding_interval_hours must be positive".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl EngineConfig {
    /// Get the detection loop cadence.
    #[must_use]
    pub fn detection_interval(&self) -> Duration {
        Duration::from_secs(self.detection_interval_secs)
    }

    /// Get the snapshot loop cadence.
    #[must_use]
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    /// Get the quote staleness window.
    #[must_use]
    pub fn staleness(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.staleness_secs as i64)
    }

    /// Get the detection time basis. Validated at load; falls back to 8h.
    #[must_use]
    pub fn time_basis(&self) -> TimeBasis {
        TimeBasis::from_hours(self.time_basis_hours).unwrap_or(TimeBasis::H8)
    }
}

impl SurfaceLimit {
    /// Get the admission window.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl From<&Config> for DetectorConfig {
    fn from(config: &Config) -> Self {
        Self {
            min_spread: config.thresholds.min_spread,
            approaching_spread: config.thresholds.approaching_spread,
            min_update_delta: config.thresholds.min_update_delta,
            expiry_grace: Duration::from_secs(config.engine.expiry_grace_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            fees: FeeConfig::default(),
            thresholds: ThresholdConfig::default(),
            cache: CacheConfig::default(),
            limiter: LimiterConfig::default(),
            feed: FeedConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detection_interval_secs: default_detection_interval_secs(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
            staleness_secs: default_staleness_secs(),
            expiry_grace_secs: default_expiry_grace_secs(),
            time_basis_hours: default_time_basis_hours(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            taker_fee_rate: default_taker_fee_rate(),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_spread: default_min_spread(),
            approaching_spread: default_approaching_spread(),
            min_update_delta: default_min_update_delta(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            profit_ttl_secs: default_profit_ttl_secs(),
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            ingest: default_ingest_limit(),
            query: default_query_limit(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            symbols: default_feed_symbols(),
            exchanges: default_feed_exchanges(),
            interval_ms: default_feed_interval_ms(),
            funding_interval_hours: default_time_basis_hours(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn defaults_match_production_values() {
        let config = Config::default();

        assert_eq!(config.fees.taker_fee_rate, Decimal::new(5, 4));
        assert_eq!(config.thresholds.min_spread, Decimal::new(1, 3));
        assert_eq!(config.thresholds.approaching_spread, Decimal::new(5, 4));
        assert_eq!(config.engine.time_basis(), TimeBasis::H8);
        assert_eq!(config.limiter.query.max_requests, 30);
        assert_eq!(config.limiter.query.window_ms, 60_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_a_partial_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[thresholds]
min_spread = "0.002"

[engine]
detection_interval_secs = 5

[limiter.query]
max_requests = 10
window_ms = 1000
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.thresholds.min_spread, Decimal::new(2, 3));
        assert_eq!(config.engine.detection_interval_secs, 5);
        assert_eq!(config.limiter.query.max_requests, 10);
        // Untouched sections keep their defaults
        assert_eq!(config.cache.profit_ttl_secs, 10);
        assert_eq!(config.limiter.ingest.max_requests, 600);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "thresholds = not valid").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[thresholds]
min_spread = "0.0001"
approaching_spread = "0.0005"
"#,
        )
        .unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "thresholds.approaching_spread",
                ..
            })
        ));
    }

    #[test]
    fn unsupported_time_basis_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\ntime_basis_hours = 4\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        let config = Config::load_or_default(&path).unwrap();

        assert_eq!(config.thresholds.min_spread, Decimal::new(1, 3));
    }

    #[test]
    fn detector_config_carries_thresholds_and_grace() {
        let config = Config::default();
        let detector: DetectorConfig = (&config).into();

        assert_eq!(detector.min_spread, Decimal::new(1, 3));
        assert_eq!(detector.approaching_spread, Decimal::new(5, 4));
        assert_eq!(detector.expiry_grace, Duration::from_secs(300));
    }
}
