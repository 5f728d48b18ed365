// Sleepwatch Testdata - Core generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Trace generation from a list of timed segments.

use crate::dataset::{MotionTrace, TraceMetadata, TraceSegment};
use crate::patterns::{MotionPattern, PatternState};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// Generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Timestamp of the first sample.
    pub start_time_ms: u64,
    /// Interval between samples in milliseconds.
    pub sample_interval_ms: u64,
    /// Multiplicative sensor noise (standard deviation as a fraction).
    pub noise_ratio: f64,
    /// Random seed for reproducibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start_time_ms: 0,
            sample_interval_ms: 200, // 5 fps
            noise_ratio: 0.03,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_time(mut self, timestamp_ms: u64) -> Self {
        self.start_time_ms = timestamp_ms;
        self
    }

    pub fn with_sample_interval_ms(mut self, interval_ms: u64) -> Self {
        self.sample_interval_ms = interval_ms.max(1);
        self
    }

    pub fn with_noise_ratio(mut self, ratio: f64) -> Self {
        self.noise_ratio = ratio.max(0.0);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Short high-motion excursions layered over a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bursts {
    /// Start-to-start spacing.
    pub every_ms: u64,
    /// Length of each burst.
    pub length_ms: u64,
    /// Motion score during a burst.
    pub level: f64,
}

impl Bursts {
    /// Whether a burst is running `offset_ms` into the segment.
    ///
    /// Bursts sit at the end of each period.
    pub fn active_at(&self, offset_ms: u64) -> bool {
        self.every_ms > 0 && offset_ms % self.every_ms >= self.every_ms.saturating_sub(self.length_ms)
    }
}

impl Default for Bursts {
    fn default() -> Self {
        Self {
            every_ms: 60_000,
            length_ms: 400,
            level: 15_000_000.0,
        }
    }
}

/// A timed stretch of one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Expected state label carried into the trace metadata.
    pub label: String,
    pub pattern: MotionPattern,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bursts: Option<Bursts>,
}

impl Segment {
    pub fn new(label: &str, pattern: MotionPattern, duration_ms: u64) -> Self {
        Self {
            label: label.to_string(),
            pattern,
            duration_ms,
            bursts: None,
        }
    }

    pub fn minutes(label: &str, pattern: MotionPattern, minutes: f64) -> Self {
        Self::new(label, pattern, (minutes * 60_000.0) as u64)
    }

    pub fn seconds(label: &str, pattern: MotionPattern, seconds: f64) -> Self {
        Self::new(label, pattern, (seconds * 1000.0) as u64)
    }

    pub fn with_bursts(mut self, bursts: Bursts) -> Self {
        self.bursts = Some(bursts);
        self
    }
}

/// Generate a trace by playing `segments` back to back.
///
/// Breathing phase carries across consecutive breathing segments so a
/// change of pattern does not produce a spurious extra peak.
pub fn generate_trace(config: &GeneratorConfig, segments: &[Segment]) -> MotionTrace {
    let mut rng: StdRng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let noise = Normal::new(1.0, config.noise_ratio).ok();
    let interval = config.sample_interval_ms.max(1);

    let mut trace = MotionTrace {
        rows: Vec::new(),
        metadata: TraceMetadata {
            seed: config.seed,
            sample_interval_ms: Some(interval),
            ..Default::default()
        },
    };
    let mut state = PatternState::default();
    let mut t = config.start_time_ms;

    for segment in segments {
        let start = t;
        let end = start + segment.duration_ms;
        while t < end {
            let offset = t - start;
            let value = match segment.bursts {
                Some(b) if b.active_at(offset) => b.level,
                _ => state.evaluate(&segment.pattern, interval, &mut rng),
            };
            let factor = noise.as_ref().map(|n| n.sample(&mut rng)).unwrap_or(1.0);
            trace.push(t, (value * factor).max(0.0));
            t += interval;
        }
        trace.metadata.segments.push(TraceSegment {
            label: segment.label.clone(),
            start_ms: start,
            end_ms: t,
        });
    }

    trace
}
