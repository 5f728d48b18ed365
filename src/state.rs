// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sleep states and the state-set mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sleep state of the monitored subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepState {
    /// Not enough data to classify.
    Unknown,
    /// No movement in the window. Alert state.
    NoBreathing,
    /// Quiet, regular breathing (two-tier mode).
    DeepSleep,
    /// Active/REM sleep, irregular breathing (two-tier mode).
    LightSleep,
    /// Breathing within the sleep band (single-tier mode).
    Sleeping,
    /// Isolated burst of movement during sleep.
    Spasm,
    /// Sustained active movement.
    Awake,
}

impl SleepState {
    /// All states, in declaration order.
    pub const ALL: [SleepState; 7] = [
        SleepState::Unknown,
        SleepState::NoBreathing,
        SleepState::DeepSleep,
        SleepState::LightSleep,
        SleepState::Sleeping,
        SleepState::Spasm,
        SleepState::Awake,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepState::Unknown => "unknown",
            SleepState::NoBreathing => "no_breathing",
            SleepState::DeepSleep => "deep_sleep",
            SleepState::LightSleep => "light_sleep",
            SleepState::Sleeping => "sleeping",
            SleepState::Spasm => "spasm",
            SleepState::Awake => "awake",
        }
    }

    /// Breathing within the sleep band: DEEP, LIGHT or SLEEPING.
    pub fn is_sleep_family(&self) -> bool {
        matches!(
            self,
            SleepState::DeepSleep | SleepState::LightSleep | SleepState::Sleeping
        )
    }

    /// Asleep for sleep-time accounting: the sleep family plus SPASM.
    ///
    /// Wake-ups are counted from the sleep family only.
    pub fn is_asleep(&self) -> bool {
        self.is_sleep_family() || *self == SleepState::Spasm
    }
}

impl fmt::Display for SleepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which sleep-state set the classifier produces.
///
/// Both modes share one hysteresis, tracking and scoring core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateMode {
    /// DEEP_SLEEP / LIGHT_SLEEP, split by breathing variability.
    #[default]
    TwoTier,
    /// A single SLEEPING state.
    SingleTier,
}

impl StateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateMode::TwoTier => "two_tier",
            StateMode::SingleTier => "single_tier",
        }
    }
}
