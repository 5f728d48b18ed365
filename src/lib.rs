//! # Sleepwatch - Motion-based sleep state monitoring
//!
//! Turns a scalar motion-intensity stream into a flicker-free sleep state,
//! session metrics and a quality score.
//!
//! ## Key Features
//!
//! - **Window statistics**: mean, deviation, peak and band densities over trailing windows
//! - **Breathing analysis**: breath peaks, rate (BPM), variability and sleep phase
//! - **Rule-list classification**: ordered, inspectable priority rules
//! - **Hysteresis**: per-transition confirmation times suppress flicker
//! - **Session tracking**: durations, wake-ups, spasms, sleep cycles and an event log
//! - **Quality scoring**: 0-100 score and rating
//!
//! Not a medical device: breathing regularity is approximated from gross motion.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use sleepwatch::{ManualClock, MonitorConfig, MotionSample, SleepMonitor, SleepState, StateMode};
//!
//! let clock = ManualClock::new();
//! let config = MonitorConfig::with_mode(StateMode::SingleTier);
//! let mut monitor = SleepMonitor::with_clock(config, Arc::new(clock.clone())).unwrap();
//!
//! // Steady breathing-level motion at 2 Hz
//! for i in 0..20u64 {
//!     clock.set_ms(i * 500);
//!     monitor.ingest_sample(MotionSample::new(i * 500, 200_000.0)).unwrap();
//! }
//! assert_eq!(monitor.state(), SleepState::Sleeping);
//!
//! let status = monitor.status();
//! assert!(status.breathing_detected);
//! ```
//!
//! ## Modules
//!
//! - [`window`]: Sample retention and window statistics
//! - [`breathing`]: Breath peak detection and rhythm analysis
//! - [`classifier`]: Priority rule list
//! - [`hysteresis`]: Confirmation of state changes
//! - [`session`]: Session metric accumulation
//! - [`quality`]: Quality scoring
//! - [`monitor`]: Pipeline orchestration and the shared handle
//! - [`snapshot`]: Status, session and report records
//! - [`history`]: Persistent session history

// Modules
pub mod breathing;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod history;
pub mod hysteresis;
pub mod monitor;
pub mod quality;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod window;

// Re-exports for convenient access
pub use breathing::{BreathEvent, BreathingAnalyzer, BreathingStats, SleepPhase};
pub use classifier::{Classification, ClassifierInput, Rule, RuleOutcome, StateClassifier};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{
    BreathingConfig, ConfirmationConfig, MonitorConfig, QualityConfig, Thresholds, WindowConfig,
};
pub use error::{ConfigError, HistoryError, Result, SleepError};
pub use event::{EventDetails, EventSeverity, SleepEvent, SleepEventKind};
pub use history::{HistoryEntry, HistorySummary, SessionHistory};
pub use hysteresis::{HysteresisGate, PendingTransition, Transition};
pub use monitor::{SharedMonitor, SleepMonitor, TickOutcome};
pub use quality::{QualityInputs, QualityRating, QualityReport, QualityScorer};
pub use session::{SessionMetrics, SleepSessionTracker, StateDurations};
pub use snapshot::{
    BreathingStatus, MonitorSnapshot, PendingSnapshot, SessionSnapshot, SleepReport,
    StatusSnapshot,
};
pub use state::{SleepState, StateMode};
pub use window::{DensityBands, MotionSample, SlidingWindowAggregator, WindowStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
