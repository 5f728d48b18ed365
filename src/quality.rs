// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sleep quality scoring.
//!
//! A deterministic function of a session snapshot: start at 100, subtract
//! penalties, clamp to [0, 100] and map to a rating band.

use crate::config::QualityConfig;
use crate::session::SessionMetrics;
use crate::state::StateMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable quality band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityRating {
    Excellent,
    Good,
    Fair,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
}

impl QualityRating {
    pub fn from_score(score: u8) -> Self {
        match score {
            85..=u8::MAX => QualityRating::Excellent,
            70..=84 => QualityRating::Good,
            50..=69 => QualityRating::Fair,
            30..=49 => QualityRating::Poor,
            _ => QualityRating::VeryPoor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityRating::Excellent => "Excellent",
            QualityRating::Good => "Good",
            QualityRating::Fair => "Fair",
            QualityRating::Poor => "Poor",
            QualityRating::VeryPoor => "Very Poor",
        }
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deduction applied to the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPenalty {
    pub factor: String,
    pub points: u32,
}

/// Score, rating and the deductions behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: u8,
    pub rating: QualityRating,
    /// False when the session was too short to judge.
    pub sufficient_data: bool,
    /// DEEP_SLEEP share of total sleep (two-tier).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_ratio: Option<f64>,
    /// Share of breath intervals that fed the rhythm (single-tier).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular_breathing_percent: Option<f64>,
    pub penalties: Vec<QualityPenalty>,
}

/// The figures a score is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualityInputs {
    pub session_ms: u64,
    pub sleep_ms: u64,
    pub deep_ms: u64,
    pub wake_ups: u32,
    pub spasms: u32,
    pub variability: Option<f64>,
    pub regular_intervals: u64,
    pub sparse_intervals: u64,
}

impl QualityInputs {
    /// Read the inputs from a session at `now_ms`.
    pub fn from_metrics(metrics: &SessionMetrics, now_ms: u64) -> Self {
        let durations = metrics.durations_at(now_ms);
        Self {
            session_ms: metrics.elapsed_ms(now_ms),
            sleep_ms: durations.sleep_ms(),
            deep_ms: durations.deep_sleep_ms,
            wake_ups: metrics.wake_ups,
            spasms: metrics.spasms,
            variability: metrics.breathing.variability,
            regular_intervals: metrics.breathing.regular_intervals,
            sparse_intervals: metrics.breathing.sparse_intervals,
        }
    }
}

/// Computes quality reports.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    config: QualityConfig,
    mode: StateMode,
}

impl QualityScorer {
    pub fn new(config: QualityConfig, mode: StateMode) -> Self {
        Self { config, mode }
    }

    pub fn score_session(&self, metrics: &SessionMetrics, now_ms: u64) -> QualityReport {
        self.score(&QualityInputs::from_metrics(metrics, now_ms))
    }

    pub fn score(&self, inputs: &QualityInputs) -> QualityReport {
        if inputs.session_ms < self.config.min_session_ms
            || inputs.sleep_ms < self.config.min_sleep_ms
        {
            return QualityReport {
                score: 0,
                rating: QualityRating::from_score(0),
                sufficient_data: false,
                deep_ratio: None,
                regular_breathing_percent: None,
                penalties: Vec::new(),
            };
        }

        let mut penalties = Vec::new();
        let mut deep_ratio = None;
        let mut regular_breathing_percent = None;

        match self.mode {
            StateMode::TwoTier => {
                let ratio = inputs.deep_ms as f64 / inputs.sleep_ms as f64;
                deep_ratio = Some(ratio);
                let points = if ratio < 0.20 {
                    20
                } else if ratio < 0.35 {
                    10
                } else if ratio > 0.60 {
                    5
                } else {
                    0
                };
                push_penalty(&mut penalties, "deep_sleep_ratio", points);
            }
            StateMode::SingleTier => {
                let total = inputs.regular_intervals + inputs.sparse_intervals;
                if total > 0 {
                    let percent = inputs.regular_intervals as f64 / total as f64 * 100.0;
                    regular_breathing_percent = Some(percent);
                    let points = if percent < 50.0 {
                        20
                    } else if percent < 70.0 {
                        10
                    } else {
                        0
                    };
                    push_penalty(&mut penalties, "breathing_regularity", points);
                }
            }
        }

        // One wake-up per hour is normal.
        let hours = inputs.session_ms as f64 / 3_600_000.0;
        let allowance = hours.max(1.0);
        let excess = inputs.wake_ups as f64 - allowance;
        if excess > 0.0 {
            let points = ((excess * 10.0).floor() as u32).min(30);
            push_penalty(&mut penalties, "wake_ups", points);
        }

        if inputs.spasms > 10 {
            push_penalty(&mut penalties, "spasms", (inputs.spasms - 10).min(10));
        }

        if matches!(inputs.variability, Some(cv) if cv > 0.40) {
            push_penalty(&mut penalties, "breathing_variability", 10);
        }

        let deducted: u32 = penalties.iter().map(|p| p.points).sum();
        let score = 100u32.saturating_sub(deducted).min(100) as u8;

        QualityReport {
            score,
            rating: QualityRating::from_score(score),
            sufficient_data: true,
            deep_ratio,
            regular_breathing_percent,
            penalties,
        }
    }
}

fn push_penalty(penalties: &mut Vec<QualityPenalty>, factor: &str, points: u32) {
    if points > 0 {
        penalties.push(QualityPenalty {
            factor: factor.to_string(),
            points,
        });
    }
}
