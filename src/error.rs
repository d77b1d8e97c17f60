use thiserror::Error;

use crate::domain::TrackingId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Malformed query or command parameters, surfaced to the caller.
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("funding interval must be positive, got {hours}h for {exchange}")]
    InvalidFundingInterval { exchange: String, hours: u32 },

    #[error("unsupported time basis: {hours}h (expected 1, 8 or 24)")]
    UnsupportedTimeBasis { hours: u32 },

    #[error("long and short legs reference the same exchange: {exchange}")]
    SameExchange { exchange: String },

    #[error("quotes reference different symbols: {long} vs {short}")]
    SymbolMismatch { long: String, short: String },

    #[error("page limit must be between 1 and {max}, got {limit}")]
    InvalidLimit { limit: usize, max: usize },
}

/// Tracking lookup and command errors.
///
/// `NotFound` also covers trackings owned by another user so that
/// ownership is never leaked through a distinct error class.
#[derive(Error, Debug, Clone)]
pub enum TrackingError {
    #[error("tracking {id} not found")]
    NotFound { id: TrackingId },

    #[error("an active tracking already exists for {symbol} {long_exchange}/{short_exchange}")]
    DuplicateActive {
        user_id: String,
        symbol: String,
        long_exchange: String,
        short_exchange: String,
    },

    #[error("tracking {id} is still active; close it before deleting")]
    StillActive { id: TrackingId },

    #[error("tracking {id} is not active")]
    NotActive { id: TrackingId },
}

/// Stale or missing upstream market data.
///
/// Detection filters these quotes out before pairing; the tracking
/// surfaces return them when a pair's economics cannot be computed.
#[derive(Error, Debug, Clone)]
pub enum DataError {
    #[error("no quote for {symbol} on {exchange}")]
    MissingQuote { symbol: String, exchange: String },

    #[error("quote for {symbol} on {exchange} is stale ({age_secs}s old)")]
    StaleQuote {
        symbol: String,
        exchange: String,
        age_secs: i64,
    },
}

/// Notification delivery failures, isolated per channel.
#[derive(Error, Debug, Clone)]
pub enum ChannelError {
    #[error("channel {channel} is unavailable")]
    Unavailable { channel: String },

    #[error("channel {channel} failed to deliver: {reason}")]
    Delivery { channel: String, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("rate limit exceeded for {key}")]
    RateLimited { key: String },
}

pub type Result<T> = std::result::Result<T, Error>;
