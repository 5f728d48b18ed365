// Sleepwatch Testdata - Motion patterns
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Motion-score patterns.
//!
//! Values are in raw frame-difference units, the same scale the monitor's
//! default thresholds use.

use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Shortest breath period a pattern will produce.
pub const MIN_PERIOD_MS: f64 = 1_100.0;
/// Longest breath period a pattern will produce.
pub const MAX_PERIOD_MS: f64 = 4_900.0;

/// Motion pattern definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionPattern {
    /// Periodic breathing motion.
    ///
    /// Each breath is one `cos^2` cycle that peaks as the breath starts, so
    /// peak-to-peak spacing equals the breath period. With
    /// `irregularity > 0` consecutive periods alternate between
    /// `period * (1 + irregularity)` and `period * (1 - irregularity)`.
    Breathing {
        period_ms: u64,
        irregularity: f64,
        baseline: f64,
        peak: f64,
    },

    /// Near-constant low level (no visible motion).
    Still { level: f64 },

    /// Gaussian high-level activity, clamped at zero.
    Restless { mean: f64, std: f64 },
}

impl MotionPattern {
    /// Regular breathing at `bpm`.
    pub fn regular_breathing(bpm: f64) -> Self {
        MotionPattern::Breathing {
            period_ms: (60_000.0 / bpm) as u64,
            irregularity: 0.0,
            baseline: 30_000.0,
            peak: 300_000.0,
        }
    }

    /// Irregular (active sleep) breathing at `bpm` on average.
    pub fn irregular_breathing(bpm: f64) -> Self {
        MotionPattern::Breathing {
            period_ms: (60_000.0 / bpm) as u64,
            irregularity: 0.4,
            baseline: 30_000.0,
            peak: 300_000.0,
        }
    }

    /// No motion.
    pub fn still() -> Self {
        MotionPattern::Still { level: 2_000.0 }
    }

    /// Sustained movement of an awake subject.
    pub fn awake() -> Self {
        MotionPattern::Restless {
            mean: 8_000_000.0,
            std: 1_500_000.0,
        }
    }
}

/// Per-pattern evolving state.
#[derive(Debug, Clone)]
pub struct PatternState {
    /// Position in the current breath, in [0, 1).
    phase: f64,
    period_ms: f64,
    long_next: bool,
}

impl Default for PatternState {
    fn default() -> Self {
        Self {
            phase: 0.0,
            period_ms: 0.0,
            long_next: true,
        }
    }
}

impl PatternState {
    /// Advance by `dt_ms` and return the pattern value.
    pub fn evaluate(&mut self, pattern: &MotionPattern, dt_ms: u64, rng: &mut dyn RngCore) -> f64 {
        match pattern {
            MotionPattern::Breathing {
                period_ms,
                irregularity,
                baseline,
                peak,
            } => {
                if self.period_ms <= 0.0 {
                    self.period_ms = self.next_period(*period_ms as f64, *irregularity, rng);
                }
                self.phase += dt_ms as f64 / self.period_ms;
                while self.phase >= 1.0 {
                    self.phase -= 1.0;
                    self.period_ms = self.next_period(*period_ms as f64, *irregularity, rng);
                }
                let lift = (PI * self.phase).cos().powi(2);
                baseline + (peak - baseline) * lift
            }
            MotionPattern::Still { level } => *level,
            MotionPattern::Restless { mean, std } => Normal::new(*mean, *std)
                .map(|d| d.sample(rng))
                .unwrap_or(*mean)
                .max(0.0),
        }
    }

    fn next_period(&mut self, base_ms: f64, irregularity: f64, rng: &mut dyn RngCore) -> f64 {
        let factor = if irregularity > 0.0 {
            self.long_next = !self.long_next;
            if self.long_next {
                1.0 + irregularity
            } else {
                1.0 - irregularity
            }
        } else {
            1.0
        };
        let jitter = Normal::new(1.0, 0.02)
            .map(|d| d.sample(rng))
            .unwrap_or(1.0);
        (base_ms * factor * jitter).clamp(MIN_PERIOD_MS, MAX_PERIOD_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    fn run(pattern: &MotionPattern, n: usize, dt_ms: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = PatternState::default();
        (0..n).map(|_| state.evaluate(pattern, dt_ms, &mut rng)).collect()
    }

    #[test]
    fn test_breathing_stays_in_band() {
        let values = run(&MotionPattern::regular_breathing(30.0), 500, 200);
        assert!(values.iter().all(|&v| (30_000.0..=300_000.0).contains(&v)));
        let max = values.iter().cloned().fold(f64::MIN, f64::max);
        assert!(max > 250_000.0);
    }

    #[test]
    fn test_peak_spacing_follows_period() {
        let pattern = MotionPattern::Breathing {
            period_ms: 2_000,
            irregularity: 0.4,
            baseline: 0.0,
            peak: 1.0,
        };
        let values = run(&pattern, 200, 100);
        let peaks: Vec<usize> = (1..values.len() - 1)
            .filter(|&i| values[i] > values[i - 1] && values[i] >= values[i + 1])
            .collect();
        let gaps: Vec<usize> = peaks.windows(2).map(|w| w[1] - w[0]).collect();
        // 1200 ms and 2800 ms breaths at 100 ms per sample, +-1 sample.
        assert!(gaps.iter().any(|&g| g <= 13));
        assert!(gaps.iter().any(|&g| g >= 27));
    }

    #[test]
    fn test_still_is_constant() {
        let values = run(&MotionPattern::still(), 10, 200);
        assert!(values.iter().all(|&v| v == 2_000.0));
    }

    #[test]
    fn test_restless_non_negative() {
        let pattern = MotionPattern::Restless {
            mean: 100.0,
            std: 1_000.0,
        };
        let values = run(&pattern, 200, 200);
        assert!(values.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_irregular_periods_alternate() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = PatternState::default();
        let a = state.next_period(2_000.0, 0.4, &mut rng);
        let b = state.next_period(2_000.0, 0.4, &mut rng);
        let (short, long) = if a < b { (a, b) } else { (b, a) };
        assert!(short < 1_400.0);
        assert!(long > 2_600.0);
    }
}
