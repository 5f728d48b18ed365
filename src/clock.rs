// Sleepwatch - Motion-based sleep state monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Time sources.
//!
//! Every elapsed-time comparison (hysteresis, duration accrual) uses the
//! monotonic millisecond reading. Wall-clock time only labels sessions.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A monotonic millisecond clock with a wall-clock companion.
pub trait Clock: Send + Sync {
    /// Milliseconds on a monotonic time base.
    fn now_ms(&self) -> u64;

    /// Current wall-clock time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Clock backed by [`Instant`], anchored at creation.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replay.
///
/// Clones share the same reading.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
    epoch: DateTime<Utc>,
}

impl ManualClock {
    /// Clock at `0ms`, with wall time anchored at the current instant.
    pub fn new() -> Self {
        Self::with_epoch(Utc::now())
    }

    /// Clock at `0ms` whose wall time is `epoch + now_ms`.
    pub fn with_epoch(epoch: DateTime<Utc>) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(0)),
            epoch,
        }
    }

    /// Jump to an absolute reading. Never moves backwards.
    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.fetch_max(now_ms, Ordering::SeqCst);
    }

    /// Advance by `delta_ms`.
    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.epoch + ChronoDuration::milliseconds(self.now_ms() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();

        clock.advance_ms(1500);
        assert_eq!(other.now_ms(), 1500);

        other.set_ms(4000);
        assert_eq!(clock.now_ms(), 4000);
    }

    #[test]
    fn test_manual_clock_never_rewinds() {
        let clock = ManualClock::new();
        clock.set_ms(5000);
        clock.set_ms(1000);
        assert_eq!(clock.now_ms(), 5000);
    }

    #[test]
    fn test_manual_clock_wall_time() {
        let epoch = Utc::now();
        let clock = ManualClock::with_epoch(epoch);
        clock.advance_ms(60_000);
        assert_eq!((clock.now_utc() - epoch).num_seconds(), 60);
    }
}
