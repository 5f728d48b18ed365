// Sleepwatch Testdata - Synthetic motion streams
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # Sleepwatch Testdata
//!
//! Synthetic motion-score streams for exercising the Sleepwatch pipeline.
//!
//! - **Patterns**: regular and irregular breathing, stillness, restlessness
//! - **Segments**: timed patterns with optional spasm-like bursts
//! - **Scenarios**: labelled presets such as an apnea episode or a full night
//!
//! ## Quick Start
//!
//! ```rust
//! use sleepwatch_testdata::Scenario;
//!
//! let trace = Scenario::Apnea.build(5.0, 42);
//! assert_eq!(trace.metadata.segments[1].label, "no_breathing");
//! ```
//!
//! Traces carry their segment labels as ground truth and can be written to
//! CSV (`timestamp_ms,motion_score`) for the replay tool.

pub mod dataset;
pub mod generator;
pub mod patterns;
pub mod scenario;

// Re-exports for convenience
pub use dataset::{DatasetError, MotionRow, MotionTrace, TraceMetadata, TraceSegment};
pub use generator::{generate_trace, Bursts, GeneratorConfig, Segment};
pub use patterns::MotionPattern;
pub use scenario::Scenario;
