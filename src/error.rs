//! Error types for Sleepwatch
//!
//! Insufficient data and sampler gaps are not errors: they degrade the
//! classification to `UNKNOWN`. Only malformed input, an incoherent
//! configuration and persistence failures surface here.

use thiserror::Error;

/// Result type alias for Sleepwatch operations
pub type Result<T> = std::result::Result<T, SleepError>;

/// Main error type for Sleepwatch operations
#[derive(Error, Debug)]
pub enum SleepError {
    /// Configuration rejected at load time
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// Motion score is negative, NaN or infinite
    #[error("Invalid motion score: {score}")]
    InvalidSample { score: f64 },

    /// Sample is older than the newest retained sample
    #[error("Out-of-order sample at {timestamp_ms}ms (newest retained: {newest_ms}ms)")]
    OutOfOrderSample { timestamp_ms: u64, newest_ms: u64 },

    /// A thread panicked while holding the monitor lock
    #[error("Monitor lock poisoned")]
    LockPoisoned,

    /// Session history persistence failed
    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

/// Incoherent configuration values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Threshold is NaN, infinite or negative
    #[error("Threshold `{field}` must be a finite non-negative number, got {value}")]
    NonFiniteThreshold { field: &'static str, value: f64 },

    /// Two thresholds are out of ladder order
    #[error("Threshold ladder broken: `{lower}` ({lower_value}) must be below `{upper}` ({upper_value})")]
    ThresholdOrder {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },

    /// Ratio outside (0, 1]
    #[error("Ratio `{field}` must be in (0, 1], got {value}")]
    RatioOutOfRange { field: &'static str, value: f64 },

    /// Duration must be strictly positive
    #[error("Duration `{field}` must be greater than zero")]
    ZeroDuration { field: &'static str },

    /// Breath interval bounds are inconsistent
    #[error("Breath interval bounds invalid: min {min_ms}ms must be below max {max_ms}ms")]
    IntervalBounds { min_ms: u64, max_ms: u64 },

    /// Variability bands overlap
    #[error("Variability bands invalid: deep CV {deep} must be below light CV {light}")]
    VariabilityBands { deep: f64, light: f64 },

    /// Window larger than the retention horizon
    #[error("Window `{field}` ({window_ms}ms) exceeds retention horizon ({retention_ms}ms)")]
    WindowExceedsRetention {
        field: &'static str,
        window_ms: u64,
        retention_ms: u64,
    },

    /// Count-valued setting must be at least one
    #[error("Setting `{field}` must be at least 1")]
    ZeroCount { field: &'static str },

    /// Configuration document could not be parsed
    #[error("Malformed configuration: {0}")]
    Malformed(String),
}

/// Errors while reading or writing session history
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// History file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
