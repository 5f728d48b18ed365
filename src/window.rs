// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sliding window management for motion samples.
//!
//! One buffer holds the retention horizon; every statistics window is a
//! trailing slice of it, so the classification and spasm windows never
//! duplicate storage.

use crate::error::{Result, SleepError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A timestamped motion-intensity reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub timestamp_ms: u64,
    pub motion_score: f64,
}

impl MotionSample {
    pub fn new(timestamp_ms: u64, motion_score: f64) -> Self {
        Self {
            timestamp_ms,
            motion_score,
        }
    }
}

/// Summary statistics over a trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub mean: f64,
    /// Sample standard deviation; 0.0 below two samples.
    pub std: f64,
    pub peak: f64,
    /// Fraction of samples above the high-band threshold.
    pub density_high_ratio: f64,
    /// Fraction of samples below the no-motion threshold.
    pub density_low_ratio: f64,
    pub sample_count: usize,
}

/// Band edges used for the density ratios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityBands {
    /// Samples strictly below this count as low.
    pub low: f64,
    /// Samples strictly above this count as high.
    pub high: f64,
}

/// Retains recent motion samples and summarizes trailing windows.
#[derive(Debug)]
pub struct SlidingWindowAggregator {
    samples: VecDeque<MotionSample>,
    retention_ms: u64,
}

impl SlidingWindowAggregator {
    pub fn new(retention_ms: u64) -> Self {
        Self {
            samples: VecDeque::new(),
            retention_ms,
        }
    }

    /// Append a sample and evict everything older than the retention horizon.
    pub fn ingest(&mut self, sample: MotionSample) -> Result<()> {
        if !sample.motion_score.is_finite() || sample.motion_score < 0.0 {
            return Err(SleepError::InvalidSample {
                score: sample.motion_score,
            });
        }
        if let Some(newest) = self.samples.back() {
            if sample.timestamp_ms < newest.timestamp_ms {
                return Err(SleepError::OutOfOrderSample {
                    timestamp_ms: sample.timestamp_ms,
                    newest_ms: newest.timestamp_ms,
                });
            }
        }

        self.samples.push_back(sample);
        self.prune(sample.timestamp_ms);
        Ok(())
    }

    /// Statistics over the freshest `window_ms` of retained samples.
    ///
    /// The window trails the newest sample. Whatever is available is used if
    /// fewer samples exist than the span asks for.
    pub fn stats(&self, window_ms: u64, bands: DensityBands) -> WindowStats {
        let Some(newest) = self.samples.back() else {
            return WindowStats::default();
        };
        let cutoff = newest.timestamp_ms.saturating_sub(window_ms);

        let mut count = 0usize;
        let mut sum = 0.0;
        let mut peak = 0.0f64;
        let mut high = 0usize;
        let mut low = 0usize;
        for sample in self.window(cutoff) {
            let score = sample.motion_score;
            count += 1;
            sum += score;
            peak = peak.max(score);
            if score > bands.high {
                high += 1;
            }
            if score < bands.low {
                low += 1;
            }
        }

        let n = count as f64;
        let mean = sum / n;
        let std = if count > 1 {
            let sum_sq: f64 = self
                .window(cutoff)
                .map(|s| (s.motion_score - mean).powi(2))
                .sum();
            (sum_sq / (n - 1.0)).max(0.0).sqrt()
        } else {
            0.0
        };

        WindowStats {
            mean,
            std,
            peak,
            density_high_ratio: high as f64 / n,
            density_low_ratio: low as f64 / n,
            sample_count: count,
        }
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<&MotionSample> {
        self.samples.back()
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time span covered by retained samples.
    pub fn time_range(&self) -> Option<(u64, u64)> {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => Some((first.timestamp_ms, last.timestamp_ms)),
            _ => None,
        }
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    fn window(&self, cutoff_ms: u64) -> impl Iterator<Item = &MotionSample> {
        self.samples
            .iter()
            .rev()
            .take_while(move |s| s.timestamp_ms >= cutoff_ms)
    }

    fn prune(&mut self, current_time_ms: u64) {
        let cutoff = current_time_ms.saturating_sub(self.retention_ms);
        while let Some(front) = self.samples.front() {
            if front.timestamp_ms < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }
}
