// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Persistent history of finished sessions.
//!
//! The history is a single JSON array on disk, oldest first, capped at the
//! newest [`DEFAULT_CAPACITY`] entries. A missing file is an empty history.

use crate::error::HistoryError;
use crate::quality::QualityRating;
use crate::snapshot::SleepReport;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Entries kept on disk.
pub const DEFAULT_CAPACITY: usize = 100;

/// One finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub date_iso: String,
    /// Total sleep, in seconds.
    pub duration_seconds: u64,
    pub duration_formatted: String,
    pub quality_score: u8,
    pub quality_rating: QualityRating,
    pub report: SleepReport,
}

impl HistoryEntry {
    pub fn new(started_at: DateTime<Utc>, sleep_ms: u64, report: SleepReport) -> Self {
        Self {
            id: report.session_id,
            started_at,
            date_iso: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_seconds: sleep_ms / 1000,
            duration_formatted: report.summary.total_sleep.clone(),
            quality_score: report.summary.quality_score,
            quality_rating: report.summary.quality_rating,
            report,
        }
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            id: self.id,
            started_at: self.started_at,
            date_iso: self.date_iso.clone(),
            duration_seconds: self.duration_seconds,
            duration_formatted: self.duration_formatted.clone(),
            quality_score: self.quality_score,
            quality_rating: self.quality_rating,
        }
    }
}

/// An entry without its report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub date_iso: String,
    pub duration_seconds: u64,
    pub duration_formatted: String,
    pub quality_score: u8,
    pub quality_rating: QualityRating,
}

/// JSON-file session history.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    path: PathBuf,
    capacity: usize,
}

impl SessionHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, oldest first.
    pub fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Append an entry, dropping the oldest beyond capacity.
    pub fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut entries = self.load()?;
        let id = entry.id;
        entries.push(entry);
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        log::info!("Session {} saved to {}", id, self.path.display());
        Ok(())
    }

    /// Up to `limit` summaries, newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<HistorySummary>, HistoryError> {
        Ok(self
            .load()?
            .iter()
            .rev()
            .take(limit)
            .map(HistoryEntry::summary)
            .collect())
    }

    /// Full report of one session.
    pub fn find(&self, id: &Uuid) -> Result<Option<SleepReport>, HistoryError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|entry| entry.id == *id)
            .map(|entry| entry.report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QualityConfig;
    use crate::hysteresis::Transition;
    use crate::quality::QualityScorer;
    use crate::session::SleepSessionTracker;
    use crate::state::{SleepState, StateMode};
    use tempfile::tempdir;

    fn entry(sleep_minutes: u64) -> HistoryEntry {
        let mut tracker = SleepSessionTracker::new(Utc::now());
        tracker.observe_sample(0);
        tracker.record_transition(&Transition {
            from: SleepState::Unknown,
            to: SleepState::Sleeping,
            at_ms: 0,
            pending_ms: 0,
        });
        let now = sleep_minutes * 60_000;
        let metrics = tracker.metrics();
        let quality = QualityScorer::new(QualityConfig::default(), StateMode::SingleTier)
            .score_session(metrics, now);
        let report = SleepReport::new(metrics, &quality, StateMode::SingleTier, now, Utc::now());
        HistoryEntry::new(metrics.started_at, metrics.total_sleep_ms(now), report)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let history = SessionHistory::new(dir.path().join("history.json"));
        assert!(history.load().unwrap().is_empty());
        assert!(history.list(10).unwrap().is_empty());
    }

    #[test]
    fn test_append_and_find() {
        let dir = tempdir().unwrap();
        let history = SessionHistory::new(dir.path().join("history.json"));
        let e = entry(90);
        let id = e.id;
        history.append(e).unwrap();

        let report = history.find(&id).unwrap().unwrap();
        assert_eq!(report.summary.total_sleep, "1h 30m");
        assert!(history.find(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let dir = tempdir().unwrap();
        let history = SessionHistory::new(dir.path().join("history.json"));
        for minutes in [10, 20, 30] {
            history.append(entry(minutes)).unwrap();
        }

        let listed = history.list(2).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].duration_seconds, 1800);
        assert_eq!(listed[1].duration_seconds, 1200);
    }

    #[test]
    fn test_capacity_keeps_newest() {
        let dir = tempdir().unwrap();
        let history = SessionHistory::with_capacity(dir.path().join("history.json"), 3);
        for minutes in 1..=5 {
            history.append(entry(minutes)).unwrap();
        }

        let entries = history.load().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].duration_seconds, 180);
        assert_eq!(entries[2].duration_seconds, 300);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ broken").unwrap();
        let history = SessionHistory::new(path);
        assert!(matches!(history.load(), Err(HistoryError::Json(_))));
    }
}
