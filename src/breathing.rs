// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Breath peak detection and rhythm analysis.
//!
//! A sample is a breath peak when it clears the peak threshold, is a local
//! maximum against its immediate neighbours, and lies at least
//! `min_interval_ms` after the previous accepted peak. Confirming a local
//! maximum needs the following sample, so peaks are reported one tick late.
//!
//! Intervals longer than `max_interval_ms` are too sparse to describe a
//! rhythm: the peak is still recorded but the interval is kept out of the
//! rate and variability figures.

use crate::config::BreathingConfig;
use crate::window::MotionSample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Sleep phase inferred from breathing regularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepPhase {
    /// Fewer than two rhythm intervals, or never classified.
    #[default]
    Unknown,
    /// Regular breathing (quiet sleep).
    Deep,
    /// Irregular breathing (active/REM sleep).
    Light,
}

impl SleepPhase {
    /// Classify a coefficient of variation.
    ///
    /// Returns `None` inside the transitional band, where the caller keeps
    /// its previous label.
    pub fn from_cv(cv: f64, deep_cv: f64, light_cv: f64) -> Option<SleepPhase> {
        if cv < deep_cv {
            Some(SleepPhase::Deep)
        } else if cv > light_cv {
            Some(SleepPhase::Light)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepPhase::Unknown => "unknown",
            SleepPhase::Deep => "deep",
            SleepPhase::Light => "light",
        }
    }
}

/// An accepted breath peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreathEvent {
    pub timestamp_ms: u64,
    /// Time since the previous accepted peak; `None` for the first.
    pub interval_since_prev_ms: Option<u64>,
    /// Whether the interval was used for rhythm analysis.
    pub rhythmic: bool,
}

/// Breathing figures at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BreathingStats {
    /// Breaths per minute; `None` without any rhythm interval.
    pub rate_bpm: Option<f64>,
    /// Coefficient of variation; `None` below two rhythm intervals.
    pub variability: Option<f64>,
    pub phase: SleepPhase,
    pub breath_count: usize,
    pub intervals_recorded: usize,
    /// Accepted peaks whose interval fed the rhythm figures.
    pub regular_intervals: u64,
    /// Accepted peaks whose interval was too long for a rhythm.
    pub sparse_intervals: u64,
}

/// Detects breath peaks and derives rate, variability and phase.
#[derive(Debug)]
pub struct BreathingAnalyzer {
    config: BreathingConfig,
    peak_threshold: f64,
    /// Sample before the candidate.
    before: Option<MotionSample>,
    /// Sample awaiting its right-hand neighbour.
    candidate: Option<MotionSample>,
    last_peak_ms: Option<u64>,
    events: VecDeque<BreathEvent>,
    intervals: VecDeque<u64>,
    phase_label: SleepPhase,
    regular_intervals: u64,
    sparse_intervals: u64,
}

impl BreathingAnalyzer {
    pub fn new(config: BreathingConfig, peak_threshold: f64) -> Self {
        Self {
            events: VecDeque::with_capacity(config.event_history),
            intervals: VecDeque::with_capacity(config.interval_history),
            config,
            peak_threshold,
            before: None,
            candidate: None,
            last_peak_ms: None,
            phase_label: SleepPhase::Unknown,
            regular_intervals: 0,
            sparse_intervals: 0,
        }
    }

    /// Feed the next sample. Returns the breath confirmed by it, if any.
    pub fn process(&mut self, sample: MotionSample) -> Option<BreathEvent> {
        let accepted = match self.candidate {
            Some(candidate) if self.is_local_peak(&candidate, &sample) => {
                self.accept_peak(candidate.timestamp_ms)
            }
            _ => None,
        };

        self.before = self.candidate;
        self.candidate = Some(sample);
        accepted
    }

    /// Breaths per minute over the last K rhythm intervals.
    pub fn rate_bpm(&self) -> Option<f64> {
        let recent = self.recent_intervals();
        let mean = mean(&recent)?;
        if mean > 0.0 {
            Some(60_000.0 / mean)
        } else {
            None
        }
    }

    /// Coefficient of variation over the last K rhythm intervals.
    pub fn variability(&self) -> Option<f64> {
        coefficient_of_variation(&self.recent_intervals())
    }

    /// Current phase label; `Unknown` below two rhythm intervals.
    pub fn phase(&self) -> SleepPhase {
        if self.intervals.len() < 2 {
            SleepPhase::Unknown
        } else {
            self.phase_label
        }
    }

    pub fn stats(&self) -> BreathingStats {
        BreathingStats {
            rate_bpm: self.rate_bpm(),
            variability: self.variability(),
            phase: self.phase(),
            breath_count: self.events.len(),
            intervals_recorded: self.intervals.len(),
            regular_intervals: self.regular_intervals,
            sparse_intervals: self.sparse_intervals,
        }
    }

    /// Retained breath events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &BreathEvent> {
        self.events.iter()
    }

    pub fn reset(&mut self) {
        self.before = None;
        self.candidate = None;
        self.last_peak_ms = None;
        self.events.clear();
        self.intervals.clear();
        self.phase_label = SleepPhase::Unknown;
        self.regular_intervals = 0;
        self.sparse_intervals = 0;
    }

    fn is_local_peak(&self, candidate: &MotionSample, next: &MotionSample) -> bool {
        let score = candidate.motion_score;
        // `>=` on the left and `>` on the right counts a plateau once, at its end.
        let above_before = self
            .before
            .map_or(true, |before| score >= before.motion_score);
        score > self.peak_threshold && above_before && score > next.motion_score
    }

    fn accept_peak(&mut self, timestamp_ms: u64) -> Option<BreathEvent> {
        let interval = match self.last_peak_ms {
            Some(last) => {
                let interval = timestamp_ms.saturating_sub(last);
                if interval < self.config.min_interval_ms {
                    return None;
                }
                Some(interval)
            }
            None => None,
        };
        self.last_peak_ms = Some(timestamp_ms);

        let rhythmic = match interval {
            Some(interval) if interval <= self.config.max_interval_ms => {
                push_bounded(&mut self.intervals, interval, self.config.interval_history);
                self.regular_intervals += 1;
                self.update_phase();
                true
            }
            Some(_) => {
                self.sparse_intervals += 1;
                false
            }
            None => false,
        };

        let event = BreathEvent {
            timestamp_ms,
            interval_since_prev_ms: interval,
            rhythmic,
        };
        push_bounded(&mut self.events, event, self.config.event_history);
        log::trace!(
            "Breath at {}ms (interval: {:?}, rhythmic: {})",
            timestamp_ms,
            interval,
            rhythmic
        );
        Some(event)
    }

    fn update_phase(&mut self) {
        if let Some(cv) = self.variability() {
            if let Some(phase) = SleepPhase::from_cv(cv, self.config.deep_cv, self.config.light_cv)
            {
                self.phase_label = phase;
            }
        }
    }

    fn recent_intervals(&self) -> Vec<f64> {
        let k = self.config.rate_window_intervals;
        let skip = self.intervals.len().saturating_sub(k);
        self.intervals.iter().skip(skip).map(|&i| i as f64).collect()
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, value: T, capacity: usize) {
    if queue.len() == capacity {
        queue.pop_front();
    }
    queue.push_back(value);
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation over mean.
///
/// `None` below two values or for a non-positive mean.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    if mean <= 0.0 {
        return None;
    }
    let n = values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.max(0.0).sqrt() / mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PEAK: f64 = 80_000.0;
    const BASE: f64 = 20_000.0;

    fn analyzer() -> BreathingAnalyzer {
        BreathingAnalyzer::new(BreathingConfig::default(), 50_000.0)
    }

    /// Feed one peak sample at each timestamp, with baseline samples around it.
    fn feed_peaks(analyzer: &mut BreathingAnalyzer, peaks_ms: &[u64]) -> usize {
        let mut accepted = 0;
        for &t in peaks_ms {
            for sample in [
                MotionSample::new(t.saturating_sub(250), BASE),
                MotionSample::new(t, PEAK),
                MotionSample::new(t + 250, BASE),
            ] {
                if analyzer.process(sample).is_some() {
                    accepted += 1;
                }
            }
        }
        accepted
    }

    #[test]
    fn test_constant_rhythm_rate() {
        let mut analyzer = analyzer();
        let peaks: Vec<u64> = (0..6).map(|i| 1000 + i * 2000).collect();
        let accepted = feed_peaks(&mut analyzer, &peaks);

        assert_eq!(accepted, 6);
        assert_relative_eq!(analyzer.rate_bpm().unwrap(), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_regular_intervals_are_deep() {
        let mut analyzer = analyzer();
        feed_peaks(&mut analyzer, &[1000, 3000, 5000, 7000, 9000]);

        assert_relative_eq!(analyzer.variability().unwrap(), 0.0);
        assert_eq!(analyzer.phase(), SleepPhase::Deep);
    }

    #[test]
    fn test_irregular_intervals_are_light() {
        let mut analyzer = analyzer();
        // Intervals 1.0, 3.0, 1.5, 3.5 seconds.
        feed_peaks(&mut analyzer, &[1000, 2000, 5000, 6500, 10_000]);

        let cv = analyzer.variability().unwrap();
        assert!(cv > 0.30, "cv = {}", cv);
        assert_eq!(analyzer.phase(), SleepPhase::Light);
    }

    #[test]
    fn test_transitional_keeps_previous_label() {
        let mut analyzer = analyzer();
        feed_peaks(&mut analyzer, &[1000, 3000, 5000, 7000]);
        assert_eq!(analyzer.phase(), SleepPhase::Deep);

        // Push the CV into the 0.15..0.30 band.
        feed_peaks(&mut analyzer, &[9800, 11_300]);
        let cv = analyzer.variability().unwrap();
        assert!(cv >= 0.15 && cv <= 0.30, "cv = {}", cv);
        assert_eq!(analyzer.phase(), SleepPhase::Deep);
    }

    #[test]
    fn test_undefined_below_two_intervals() {
        let mut analyzer = analyzer();
        assert_eq!(analyzer.rate_bpm(), None);
        assert_eq!(analyzer.variability(), None);

        feed_peaks(&mut analyzer, &[1000, 3000]);
        assert!(analyzer.rate_bpm().is_some());
        assert_eq!(analyzer.variability(), None);
        assert_eq!(analyzer.phase(), SleepPhase::Unknown);
    }

    #[test]
    fn test_min_interval_rejects_close_peaks() {
        let mut analyzer = analyzer();
        let accepted = feed_peaks(&mut analyzer, &[1000, 1600, 3000]);

        assert_eq!(accepted, 2);
        let events: Vec<_> = analyzer.events().collect();
        assert_eq!(events[1].interval_since_prev_ms, Some(2000));
    }

    #[test]
    fn test_sparse_interval_recorded_but_excluded() {
        let mut analyzer = analyzer();
        feed_peaks(&mut analyzer, &[1000, 3000, 5000, 15_000]);

        let stats = analyzer.stats();
        assert_eq!(stats.breath_count, 4);
        assert_eq!(stats.intervals_recorded, 2);
        assert_eq!(stats.sparse_intervals, 1);
        assert_relative_eq!(stats.rate_bpm.unwrap(), 30.0, epsilon = 1e-9);

        let last = analyzer.events().last().unwrap();
        assert!(!last.rhythmic);
        assert_eq!(last.interval_since_prev_ms, Some(10_000));
    }

    #[test]
    fn test_below_threshold_not_a_peak() {
        let mut analyzer = analyzer();
        for i in 0..20u64 {
            let score = if i % 4 == 0 { 40_000.0 } else { 10_000.0 };
            assert!(analyzer.process(MotionSample::new(i * 500, score)).is_none());
        }
    }

    #[test]
    fn test_plateau_counts_once() {
        let mut analyzer = analyzer();
        let samples = [
            (0, BASE),
            (500, PEAK),
            (1000, PEAK),
            (1500, BASE),
            (2000, BASE),
        ];
        let accepted = samples
            .iter()
            .filter_map(|&(t, s)| analyzer.process(MotionSample::new(t, s)))
            .count();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn test_reset() {
        let mut analyzer = analyzer();
        feed_peaks(&mut analyzer, &[1000, 3000, 5000]);
        analyzer.reset();

        let stats = analyzer.stats();
        assert_eq!(stats.breath_count, 0);
        assert_eq!(stats.rate_bpm, None);
        assert_eq!(stats.phase, SleepPhase::Unknown);
    }

    #[test]
    fn test_cv_helper() {
        assert_eq!(coefficient_of_variation(&[2.0]), None);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), None);
        assert_relative_eq!(
            coefficient_of_variation(&[2.0, 2.0, 2.0, 2.0]).unwrap(),
            0.0
        );
        assert!(coefficient_of_variation(&[1.0, 3.0, 1.5, 3.5]).unwrap() > 0.30);
    }

    #[test]
    fn test_phase_from_cv() {
        assert_eq!(SleepPhase::from_cv(0.05, 0.15, 0.30), Some(SleepPhase::Deep));
        assert_eq!(SleepPhase::from_cv(0.20, 0.15, 0.30), None);
        assert_eq!(SleepPhase::from_cv(0.45, 0.15, 0.30), Some(SleepPhase::Light));
    }
}
