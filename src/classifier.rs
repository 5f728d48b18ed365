// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Instantaneous state classification
//!
//! This module maps window statistics and the breathing phase to a raw
//! candidate state. The decision is an ordered list of rules held as data:
//! the first rule whose predicate matches decides, and nothing falls through.
//! Order matters whenever several thresholds are satisfied at once, so it is
//! exposed through [`StateClassifier::rules`] for inspection.

use crate::breathing::SleepPhase;
use crate::config::Thresholds;
use crate::state::{SleepState, StateMode};
use crate::window::WindowStats;
use serde::Serialize;

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput {
    /// Classification window.
    pub stats: WindowStats,
    /// Short window used for isolated peaks.
    pub spasm_stats: WindowStats,
    /// Samples held over the whole retention horizon.
    pub retained_samples: usize,
    /// Phase label from the breathing analyzer.
    pub phase: SleepPhase,
    /// Currently confirmed state.
    pub confirmed: SleepState,
    /// Sleep state in force, including the one a spasm interrupted.
    pub sleep_tier: Option<SleepState>,
}

/// What a matching rule yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    /// A fixed state.
    State(SleepState),
    /// A sleep-family state, resolved by mode and breathing phase.
    SleepFamily,
    /// No candidate: keep the confirmed state.
    Hold,
}

type Predicate = fn(&ClassifierInput, &Thresholds) -> bool;

/// One entry of the priority list.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub outcome: RuleOutcome,
    predicate: Predicate,
}

impl Rule {
    pub fn matches(&self, input: &ClassifierInput, thresholds: &Thresholds) -> bool {
        (self.predicate)(input, thresholds)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("outcome", &self.outcome)
            .finish()
    }
}

fn no_breathing(input: &ClassifierInput, t: &Thresholds) -> bool {
    input.stats.density_low_ratio > t.no_breathing_low_ratio
}

fn awake(input: &ClassifierInput, t: &Thresholds) -> bool {
    input.stats.mean > t.awake && input.stats.density_high_ratio > t.awake_high_ratio
}

fn spasm(input: &ClassifierInput, t: &Thresholds) -> bool {
    let during_sleep = input.confirmed.is_asleep();
    during_sleep
        && input.spasm_stats.peak > t.spasm
        && input.stats.density_high_ratio < t.spasm_max_high_ratio
}

fn sleeping(input: &ClassifierInput, t: &Thresholds) -> bool {
    input.stats.mean >= t.breathing_low && input.stats.mean <= t.breathing_high
}

fn unsettled(_: &ClassifierInput, _: &Thresholds) -> bool {
    true
}

/// Priority order, highest first.
static RULES: [Rule; 5] = [
    Rule {
        name: "no_breathing",
        outcome: RuleOutcome::State(SleepState::NoBreathing),
        predicate: no_breathing,
    },
    Rule {
        name: "awake",
        outcome: RuleOutcome::State(SleepState::Awake),
        predicate: awake,
    },
    Rule {
        name: "spasm",
        outcome: RuleOutcome::State(SleepState::Spasm),
        predicate: spasm,
    },
    Rule {
        name: "sleeping",
        outcome: RuleOutcome::SleepFamily,
        predicate: sleeping,
    },
    Rule {
        name: "unsettled",
        outcome: RuleOutcome::Hold,
        predicate: unsettled,
    },
];

/// Name reported when too few samples are retained to classify.
pub const INSUFFICIENT_DATA: &str = "insufficient_data";

/// Result of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Raw candidate; `None` means hold the confirmed state.
    pub raw: Option<SleepState>,
    /// Name of the deciding rule.
    pub rule: &'static str,
}

/// Maps statistics to a raw candidate state.
#[derive(Debug, Clone)]
pub struct StateClassifier {
    thresholds: Thresholds,
    mode: StateMode,
    min_samples: usize,
}

impl StateClassifier {
    pub fn new(thresholds: Thresholds, mode: StateMode, min_samples: usize) -> Self {
        Self {
            thresholds,
            mode,
            min_samples,
        }
    }

    /// The ordered rule list.
    pub fn rules() -> &'static [Rule] {
        &RULES
    }

    pub fn mode(&self) -> StateMode {
        self.mode
    }

    /// Classify one tick.
    pub fn classify(&self, input: &ClassifierInput) -> Classification {
        if input.retained_samples < self.min_samples {
            return Classification {
                raw: Some(SleepState::Unknown),
                rule: INSUFFICIENT_DATA,
            };
        }

        // The last rule always matches.
        let rule = RULES
            .iter()
            .find(|rule| rule.matches(input, &self.thresholds))
            .unwrap_or(&RULES[RULES.len() - 1]);

        let raw = match rule.outcome {
            RuleOutcome::State(state) => Some(state),
            RuleOutcome::SleepFamily => Some(self.resolve_sleep(input.phase, input.sleep_tier)),
            RuleOutcome::Hold => None,
        };
        Classification {
            raw,
            rule: rule.name,
        }
    }

    fn resolve_sleep(&self, phase: SleepPhase, tier: Option<SleepState>) -> SleepState {
        match self.mode {
            StateMode::SingleTier => SleepState::Sleeping,
            StateMode::TwoTier => match phase {
                SleepPhase::Deep => SleepState::DeepSleep,
                SleepPhase::Light => SleepState::LightSleep,
                SleepPhase::Unknown => match tier {
                    Some(state @ (SleepState::DeepSleep | SleepState::LightSleep)) => state,
                    _ => SleepState::LightSleep,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(mean: f64, peak: f64, high: f64, low: f64) -> WindowStats {
        WindowStats {
            mean,
            std: 0.0,
            peak,
            density_high_ratio: high,
            density_low_ratio: low,
            sample_count: 10,
        }
    }

    fn input(stats: WindowStats, confirmed: SleepState) -> ClassifierInput {
        ClassifierInput {
            stats,
            spasm_stats: stats,
            retained_samples: stats.sample_count,
            phase: SleepPhase::Unknown,
            confirmed,
            sleep_tier: confirmed.is_sleep_family().then_some(confirmed),
        }
    }

    fn classifier(mode: StateMode) -> StateClassifier {
        StateClassifier::new(Thresholds::default(), mode, 3)
    }

    #[test]
    fn test_rule_order() {
        let names: Vec<_> = StateClassifier::rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["no_breathing", "awake", "spasm", "sleeping", "unsettled"]
        );
    }

    #[test]
    fn test_insufficient_data() {
        let mut i = input(stats(100_000.0, 100_000.0, 0.0, 0.0), SleepState::Unknown);
        i.retained_samples = 2;
        let result = classifier(StateMode::TwoTier).classify(&i);
        assert_eq!(result.raw, Some(SleepState::Unknown));
        assert_eq!(result.rule, INSUFFICIENT_DATA);
    }

    #[test]
    fn test_thin_window_with_retained_history_classifies() {
        // One fresh sample after a short dropout, older ones still retained.
        let mut s = stats(9_000_000.0, 9_000_000.0, 1.0, 0.0);
        s.sample_count = 1;
        let mut i = input(s, SleepState::Sleeping);
        i.retained_samples = 60;
        let result = classifier(StateMode::SingleTier).classify(&i);
        assert_eq!(result.raw, Some(SleepState::Awake));
        assert_eq!(result.rule, "awake");
    }

    #[test]
    fn test_no_breathing_needs_majority_low() {
        let c = classifier(StateMode::TwoTier);

        let quiet = c.classify(&input(stats(1_000.0, 5_000.0, 0.0, 0.8), SleepState::LightSleep));
        assert_eq!(quiet.raw, Some(SleepState::NoBreathing));

        // A few zero frames among breathing samples do not trigger the alert.
        let sporadic =
            c.classify(&input(stats(100_000.0, 200_000.0, 0.0, 0.3), SleepState::LightSleep));
        assert_eq!(sporadic.raw, Some(SleepState::LightSleep));
    }

    #[test]
    fn test_no_breathing_beats_awake() {
        // Both predicates hold; priority decides.
        let c = classifier(StateMode::TwoTier);
        let result =
            c.classify(&input(stats(6_000_000.0, 9e7, 0.6, 0.75), SleepState::Awake));
        assert_eq!(result.raw, Some(SleepState::NoBreathing));
        assert_eq!(result.rule, "no_breathing");
    }

    #[test]
    fn test_awake_requires_sustained_motion() {
        let c = classifier(StateMode::TwoTier);

        let sustained =
            c.classify(&input(stats(6_000_000.0, 9e6, 0.8, 0.0), SleepState::DeepSleep));
        assert_eq!(sustained.raw, Some(SleepState::Awake));

        let brief = c.classify(&input(stats(6_000_000.0, 9e6, 0.2, 0.0), SleepState::DeepSleep));
        assert_ne!(brief.raw, Some(SleepState::Awake));
    }

    #[test]
    fn test_spasm_isolated_peak_during_sleep() {
        let c = classifier(StateMode::TwoTier);
        let s = stats(1_200_000.0, 12_000_000.0, 0.1, 0.0);

        let during_sleep = c.classify(&input(s, SleepState::DeepSleep));
        assert_eq!(during_sleep.raw, Some(SleepState::Spasm));

        let while_awake = c.classify(&input(s, SleepState::Awake));
        assert_eq!(while_awake.raw, Some(SleepState::LightSleep));
    }

    #[test]
    fn test_sleep_family_two_tier() {
        let c = classifier(StateMode::TwoTier);
        let s = stats(200_000.0, 300_000.0, 0.0, 0.0);

        let mut deep = input(s, SleepState::Unknown);
        deep.phase = SleepPhase::Deep;
        assert_eq!(c.classify(&deep).raw, Some(SleepState::DeepSleep));

        let mut light = input(s, SleepState::DeepSleep);
        light.phase = SleepPhase::Light;
        assert_eq!(c.classify(&light).raw, Some(SleepState::LightSleep));

        // Unknown phase keeps the confirmed sleep tier.
        let keep = input(s, SleepState::DeepSleep);
        assert_eq!(c.classify(&keep).raw, Some(SleepState::DeepSleep));
    }

    #[test]
    fn test_spasm_resolves_to_interrupted_tier() {
        let c = classifier(StateMode::TwoTier);
        let mut after_spasm = input(stats(200_000.0, 300_000.0, 0.0, 0.0), SleepState::Spasm);
        after_spasm.sleep_tier = Some(SleepState::DeepSleep);
        assert_eq!(c.classify(&after_spasm).raw, Some(SleepState::DeepSleep));

        after_spasm.sleep_tier = None;
        assert_eq!(c.classify(&after_spasm).raw, Some(SleepState::LightSleep));
    }

    #[test]
    fn test_sleep_family_single_tier() {
        let c = classifier(StateMode::SingleTier);
        let mut i = input(stats(200_000.0, 300_000.0, 0.0, 0.0), SleepState::Unknown);
        i.phase = SleepPhase::Deep;
        assert_eq!(c.classify(&i).raw, Some(SleepState::Sleeping));
    }

    #[test]
    fn test_unsettled_holds() {
        let c = classifier(StateMode::TwoTier);
        // Above the breathing band but not sustained enough for awake.
        let result = c.classify(&input(stats(3_000_000.0, 4e6, 0.1, 0.0), SleepState::Awake));
        assert_eq!(result.raw, None);
        assert_eq!(result.rule, "unsettled");
    }
}
