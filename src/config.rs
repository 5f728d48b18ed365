// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Monitor configuration.
//!
//! All thresholds and timings live in one [`MonitorConfig`] value which is
//! validated as a whole. A monitor never starts on an incoherent threshold
//! ladder.

use crate::error::ConfigError;
use crate::state::StateMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Master configuration for a sleep monitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Which state set the classifier produces.
    pub mode: StateMode,

    /// Motion thresholds and density ratios.
    pub thresholds: Thresholds,

    /// Breath peak detection and rhythm analysis.
    pub breathing: BreathingConfig,

    /// Sample retention and statistics windows.
    pub windows: WindowConfig,

    /// Minimum sustain durations per transition.
    pub confirmation: ConfirmationConfig,

    /// Quality scoring guards.
    pub quality: QualityConfig,
}

/// Motion-score thresholds (raw frame-difference units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Samples below this count as "no motion".
    pub no_motion: f64,
    /// Lower edge of the breathing band (window mean).
    pub breathing_low: f64,
    /// Upper edge of the breathing band (window mean).
    pub breathing_high: f64,
    /// Window mean above this, sustained, means awake. Also the "high" band edge.
    pub awake: f64,
    /// Isolated peak above this is a spasm.
    pub spasm: f64,
    /// Minimum score for a breath peak.
    pub breath_peak: f64,
    /// Fraction of no-motion samples that triggers NO_BREATHING.
    pub no_breathing_low_ratio: f64,
    /// Fraction of high samples required for AWAKE.
    pub awake_high_ratio: f64,
    /// Fraction of high samples below which a peak is isolated.
    pub spasm_max_high_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            no_motion: 10_000.0,
            breathing_low: 15_000.0,
            breathing_high: 1_500_000.0,
            awake: 5_000_000.0,
            spasm: 10_000_000.0,
            breath_peak: 50_000.0,
            no_breathing_low_ratio: 0.70,
            awake_high_ratio: 0.50,
            spasm_max_high_ratio: 0.30,
        }
    }
}

/// Breath detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathingConfig {
    /// Minimum spacing between accepted peaks (bounds the rate at 60 BPM).
    pub min_interval_ms: u64,
    /// Intervals longer than this are too sparse for rhythm analysis.
    pub max_interval_ms: u64,
    /// Number of most recent intervals used for BPM and variability (K).
    pub rate_window_intervals: usize,
    /// Retained rhythm intervals.
    pub interval_history: usize,
    /// Retained breath events.
    pub event_history: usize,
    /// CV below this is deep sleep.
    pub deep_cv: f64,
    /// CV above this is light/REM sleep.
    pub light_cv: f64,
}

impl Default for BreathingConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1_000,
            max_interval_ms: 5_000,
            rate_window_intervals: 10,
            interval_history: 50,
            event_history: 100,
            deep_cv: 0.15,
            light_cv: 0.30,
        }
    }
}

/// Sample retention and statistics windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Samples older than this (relative to the newest) are evicted.
    pub retention_ms: u64,
    /// Window used for state classification.
    pub classification_ms: u64,
    /// Short window used to look for isolated spasm peaks.
    pub spasm_ms: u64,
    /// Fewer samples than this in the classification window means UNKNOWN.
    pub min_samples: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            retention_ms: 60_000,
            classification_ms: 10_000,
            spasm_ms: 5_000,
            min_samples: 3,
        }
    }
}

/// Minimum time a candidate state must persist before it is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Any state to AWAKE.
    pub awake_ms: u64,
    /// AWAKE to the sleep family.
    pub sleep_ms: u64,
    /// Any state to NO_BREATHING.
    pub no_breathing_ms: u64,
    /// Sleep to SPASM.
    pub spasm_ms: u64,
    /// DEEP_SLEEP and LIGHT_SLEEP in either direction.
    pub phase_change_ms: u64,
    /// Any other entry into the sleep family (after a spasm or an alert).
    pub resume_ms: u64,
    /// Longest a confirmed SPASM lasts without a fresh jerk before the
    /// pre-spasm sleep state is restored.
    pub spasm_max_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            awake_ms: 8_000,
            sleep_ms: 15_000,
            no_breathing_ms: 12_000,
            spasm_ms: 500,
            phase_change_ms: 30_000,
            resume_ms: 3_000,
            spasm_max_ms: 5_000,
        }
    }
}

/// Quality scoring guards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Sessions shorter than this score 0.
    pub min_session_ms: u64,
    /// Sessions with less sleep than this score 0.
    pub min_sleep_ms: u64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_session_ms: 60_000,
            min_sleep_ms: 60_000,
        }
    }
}

impl MonitorConfig {
    /// Default configuration with the given state mode.
    pub fn with_mode(mode: StateMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::Malformed(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check the configuration as a whole.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        self.breathing.validate()?;
        self.windows.validate()?;
        self.confirmation.validate()?;
        Ok(())
    }
}

impl Thresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        let levels = [
            ("no_motion", self.no_motion),
            ("breathing_low", self.breathing_low),
            ("breathing_high", self.breathing_high),
            ("awake", self.awake),
            ("spasm", self.spasm),
            ("breath_peak", self.breath_peak),
        ];
        for (field, value) in levels {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NonFiniteThreshold { field, value });
            }
        }

        // no_motion < breathing_low <= breathing_high < awake <= spasm
        strictly_below("no_motion", self.no_motion, "breathing_low", self.breathing_low)?;
        if self.breathing_low > self.breathing_high {
            return Err(order("breathing_low", self.breathing_low, "breathing_high", self.breathing_high));
        }
        strictly_below("breathing_high", self.breathing_high, "awake", self.awake)?;
        if self.awake > self.spasm {
            return Err(order("awake", self.awake, "spasm", self.spasm));
        }
        if self.breath_peak <= 0.0 {
            return Err(ConfigError::NonFiniteThreshold {
                field: "breath_peak",
                value: self.breath_peak,
            });
        }

        let ratios = [
            ("no_breathing_low_ratio", self.no_breathing_low_ratio),
            ("awake_high_ratio", self.awake_high_ratio),
            ("spasm_max_high_ratio", self.spasm_max_high_ratio),
        ];
        for (field, value) in ratios {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::RatioOutOfRange { field, value });
            }
        }
        Ok(())
    }
}

impl BreathingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_interval_ms == 0 || self.min_interval_ms >= self.max_interval_ms {
            return Err(ConfigError::IntervalBounds {
                min_ms: self.min_interval_ms,
                max_ms: self.max_interval_ms,
            });
        }
        let counts = [
            ("rate_window_intervals", self.rate_window_intervals),
            ("interval_history", self.interval_history),
            ("event_history", self.event_history),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::ZeroCount { field });
            }
        }
        if !(self.deep_cv.is_finite() && self.light_cv.is_finite())
            || self.deep_cv <= 0.0
            || self.deep_cv >= self.light_cv
        {
            return Err(ConfigError::VariabilityBands {
                deep: self.deep_cv,
                light: self.light_cv,
            });
        }
        Ok(())
    }
}

impl WindowConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "retention_ms",
            });
        }
        let windows = [
            ("classification_ms", self.classification_ms),
            ("spasm_ms", self.spasm_ms),
        ];
        for (field, window_ms) in windows {
            if window_ms == 0 {
                return Err(ConfigError::ZeroDuration { field });
            }
            if window_ms > self.retention_ms {
                return Err(ConfigError::WindowExceedsRetention {
                    field,
                    window_ms,
                    retention_ms: self.retention_ms,
                });
            }
        }
        if self.min_samples == 0 {
            return Err(ConfigError::ZeroCount {
                field: "min_samples",
            });
        }
        Ok(())
    }
}

impl ConfirmationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("awake_ms", self.awake_ms),
            ("sleep_ms", self.sleep_ms),
            ("no_breathing_ms", self.no_breathing_ms),
            ("spasm_ms", self.spasm_ms),
            ("phase_change_ms", self.phase_change_ms),
            ("resume_ms", self.resume_ms),
            ("spasm_max_ms", self.spasm_max_ms),
        ];
        for (field, value) in durations {
            if value == 0 {
                return Err(ConfigError::ZeroDuration { field });
            }
        }
        Ok(())
    }
}

fn order(lower: &'static str, lower_value: f64, upper: &'static str, upper_value: f64) -> ConfigError {
    ConfigError::ThresholdOrder {
        lower,
        lower_value,
        upper,
        upper_value,
    }
}

fn strictly_below(
    lower: &'static str,
    lower_value: f64,
    upper: &'static str,
    upper_value: f64,
) -> Result<(), ConfigError> {
    if lower_value >= upper_value {
        return Err(order(lower, lower_value, upper, upper_value));
    }
    Ok(())
}
