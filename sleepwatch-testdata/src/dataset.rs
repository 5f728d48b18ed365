// Sleepwatch Testdata - Trace structures
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Motion traces and their CSV/JSON I/O.
//!
//! The CSV layout is two columns, `timestamp_ms,motion_score`, one sample
//! per line.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Dataset error types.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse error at line {line}: {message}")]
    CsvParse { line: usize, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Empty trace")]
    Empty,

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

/// One motion sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionRow {
    pub timestamp_ms: u64,
    pub motion_score: f64,
}

/// A labelled stretch of a generated trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSegment {
    /// State the stretch is meant to produce, e.g. `deep_sleep`.
    pub label: String,
    pub start_ms: u64,
    /// Exclusive.
    pub end_ms: u64,
}

impl TraceSegment {
    pub fn contains(&self, timestamp_ms: u64) -> bool {
        (self.start_ms..self.end_ms).contains(&timestamp_ms)
    }
}

/// Trace metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_interval_ms: Option<u64>,
    /// Expected-state ground truth, in time order.
    #[serde(default)]
    pub segments: Vec<TraceSegment>,
}

/// A time-ordered motion-score stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotionTrace {
    pub rows: Vec<MotionRow>,
    #[serde(default)]
    pub metadata: TraceMetadata,
}

impl MotionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, timestamp_ms: u64, motion_score: f64) {
        self.rows.push(MotionRow {
            timestamp_ms,
            motion_score,
        });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Span between first and last sample.
    pub fn duration_ms(&self) -> u64 {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => last.timestamp_ms.saturating_sub(first.timestamp_ms),
            _ => 0,
        }
    }

    /// Label of the segment covering `timestamp_ms`.
    pub fn label_at(&self, timestamp_ms: u64) -> Option<&str> {
        self.metadata
            .segments
            .iter()
            .find(|s| s.contains(timestamp_ms))
            .map(|s| s.label.as_str())
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.metadata.name = Some(name.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.metadata.description = Some(description.to_string());
        self
    }

    /// Export to a CSV file.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_csv(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write CSV to any sink.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<(), DatasetError> {
        writeln!(writer, "timestamp_ms,motion_score")?;
        for row in &self.rows {
            writeln!(writer, "{},{:.3}", row.timestamp_ms, row.motion_score)?;
        }
        Ok(())
    }

    /// Import from a CSV file.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        Self::read_csv(file)
    }

    /// Parse CSV from any source.
    ///
    /// The header must name `timestamp_ms` and `motion_score`; other
    /// columns are ignored. Blank lines are skipped.
    pub fn read_csv<R: Read>(source: R) -> Result<Self, DatasetError> {
        let reader = BufReader::new(source);
        let mut lines = reader.lines();

        let header = lines.next().ok_or(DatasetError::Empty)??;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let ts_col = columns
            .iter()
            .position(|c| *c == "timestamp_ms")
            .ok_or_else(|| DatasetError::MissingColumn("timestamp_ms".to_string()))?;
        let score_col = columns
            .iter()
            .position(|c| *c == "motion_score")
            .ok_or_else(|| DatasetError::MissingColumn("motion_score".to_string()))?;

        let mut trace = MotionTrace::new();
        for (line_num, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let values: Vec<&str> = line.split(',').map(str::trim).collect();
            let field = |col: usize, what: &str| {
                values.get(col).copied().ok_or_else(|| DatasetError::CsvParse {
                    line: line_num + 2,
                    message: format!("Missing {}", what),
                })
            };

            let timestamp_ms = field(ts_col, "timestamp")?
                .parse()
                .map_err(|_| DatasetError::CsvParse {
                    line: line_num + 2,
                    message: "Invalid timestamp".to_string(),
                })?;
            let motion_score = field(score_col, "motion score")?
                .parse()
                .map_err(|_| DatasetError::CsvParse {
                    line: line_num + 2,
                    message: "Invalid motion score".to_string(),
                })?;
            trace.push(timestamp_ms, motion_score);
        }

        Ok(trace)
    }

    /// Export to a JSON file.
    pub fn to_json(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Import from a JSON file.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
