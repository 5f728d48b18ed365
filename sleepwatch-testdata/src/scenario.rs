// Sleepwatch Testdata - Sleep scenarios
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Named sleep scenarios.
//!
//! Each scenario is a segment list scaled to a requested length. Segment
//! labels are the state names the monitor is expected to settle in.

use crate::dataset::{DatasetError, MotionTrace};
use crate::generator::{generate_trace, Bursts, GeneratorConfig, Segment};
use crate::patterns::MotionPattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Breathing rate used by the presets.
const BPM: f64 = 30.0;

/// Preset sleep scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Regular breathing throughout.
    CalmSleep,
    /// Irregular breathing throughout.
    ActiveSleep,
    /// Sleep, a stretch with no visible motion, sleep again.
    Apnea,
    /// Sleep interrupted by a waking episode.
    WakeUp,
    /// Regular breathing with an isolated jerk every minute.
    Spasms,
    /// Settling, deep and light phases, a waking episode and a spasm.
    Night,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::CalmSleep,
        Scenario::ActiveSleep,
        Scenario::Apnea,
        Scenario::WakeUp,
        Scenario::Spasms,
        Scenario::Night,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::CalmSleep => "calm_sleep",
            Scenario::ActiveSleep => "active_sleep",
            Scenario::Apnea => "apnea",
            Scenario::WakeUp => "wake_up",
            Scenario::Spasms => "spasms",
            Scenario::Night => "night",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::CalmSleep => "Regular breathing for the whole trace",
            Scenario::ActiveSleep => "Irregular breathing for the whole trace",
            Scenario::Apnea => "Thirty seconds without motion between two sleep stretches",
            Scenario::WakeUp => "Two minutes awake in the middle of sleep",
            Scenario::Spasms => "Regular breathing with a jerk every minute",
            Scenario::Night => "Awake, deep, light with a spasm, awake, deep",
        }
    }

    /// Segment list for a trace of roughly `minutes`.
    pub fn segments(&self, minutes: f64) -> Vec<Segment> {
        let minutes = minutes.max(1.0);
        let deep = || MotionPattern::regular_breathing(BPM);
        let light = || MotionPattern::irregular_breathing(BPM);

        match self {
            Scenario::CalmSleep => vec![Segment::minutes("deep_sleep", deep(), minutes)],
            Scenario::ActiveSleep => vec![Segment::minutes("light_sleep", light(), minutes)],
            Scenario::Apnea => {
                let half = ((minutes - 0.5) / 2.0).max(0.5);
                vec![
                    Segment::minutes("deep_sleep", deep(), half),
                    Segment::seconds("no_breathing", MotionPattern::still(), 30.0),
                    Segment::minutes("deep_sleep", deep(), half),
                ]
            }
            Scenario::WakeUp => {
                let half = ((minutes - 2.0) / 2.0).max(0.5);
                vec![
                    Segment::minutes("deep_sleep", deep(), half),
                    Segment::minutes("awake", MotionPattern::awake(), 2.0),
                    Segment::minutes("deep_sleep", deep(), half),
                ]
            }
            Scenario::Spasms => vec![
                Segment::minutes("deep_sleep", deep(), minutes).with_bursts(Bursts::default())
            ],
            Scenario::Night => {
                let unit = minutes / 10.0;
                vec![
                    Segment::minutes("awake", MotionPattern::awake(), unit.max(0.5)),
                    Segment::minutes("deep_sleep", deep(), 3.0 * unit),
                    Segment::minutes("light_sleep", light(), 2.0 * unit).with_bursts(Bursts {
                        every_ms: ((unit * 60_000.0) as u64).max(1_000),
                        ..Bursts::default()
                    }),
                    Segment::minutes("awake", MotionPattern::awake(), unit.max(0.5)),
                    Segment::minutes("deep_sleep", deep(), 3.0 * unit),
                ]
            }
        }
    }

    /// Generate the scenario with a fixed seed.
    pub fn build(&self, minutes: f64, seed: u64) -> MotionTrace {
        let config = GeneratorConfig::new().with_seed(seed);
        generate_trace(&config, &self.segments(minutes))
            .with_name(self.name())
            .with_description(self.description())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Scenario {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == wanted)
            .ok_or_else(|| DatasetError::UnknownScenario(s.to_string()))
    }
}
