//! Session context
//!
//! A [`Session`] owns everything that lives for one stream-connected
//! interval: the ledger, the current label and the clock observations are
//! stamped with. It is created at stream start, shared by handle with the
//! pipeline and any readers, and dropped as a whole on reset. There is no
//! process-wide session state.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use super::current::CurrentLabel;
use super::ledger::{LedgerSnapshot, Observation, SessionLedger};
use crate::neural::EmotionLabel;

/// Source of observation timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that advances by a fixed step on every reading
///
/// Used by replays and tests that need reproducible timestamps.
#[derive(Debug)]
pub struct SteppingClock {
    start: NaiveDateTime,
    step: ChronoDuration,
    ticks: AtomicU32,
}

impl SteppingClock {
    pub fn new(start: NaiveDateTime, step: ChronoDuration) -> Self {
        Self {
            start,
            step,
            ticks: AtomicU32::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> NaiveDateTime {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + self.step * n as i32
    }
}

/// Metadata describing a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub observations: usize,
    pub current_label: EmotionLabel,
}

/// One observation session
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    ledger: SessionLedger,
    current: CurrentLabel,
    clock: Arc<dyn Clock>,
    /// Sequence index of the newest committed frame
    newest_committed: Mutex<Option<u64>>,
}

impl Session {
    /// New session stamped with local wall-clock time
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            ledger: SessionLedger::new(),
            current: CurrentLabel::new(),
            clock,
            newest_committed: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    /// Label the overlay should show right now
    pub fn current_label(&self) -> EmotionLabel {
        self.current.get()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    /// Commit a successful classification of frame `sequence`
    ///
    /// Appends to the ledger first and then replaces the current label, so
    /// the current label is always one the ledger holds. Results for frames
    /// older than the newest committed one are discarded and `None` is
    /// returned; the current label never moves backwards.
    pub fn record(&self, sequence: u64, label: EmotionLabel) -> Option<Observation> {
        let mut newest = self.newest_committed.lock();
        if let Some(newest_seq) = *newest {
            if sequence <= newest_seq {
                debug!(
                    "[SESSION {}] discarding stale result for frame {} (newest {})",
                    self.id, sequence, newest_seq
                );
                return None;
            }
        }

        let timestamp = self.clock.now();
        self.ledger.append(timestamp, label.clone());
        self.current.replace(label.clone());
        *newest = Some(sequence);
        Some(Observation { timestamp, label })
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            started_at: self.started_at,
            observations: self.ledger.len(),
            current_label: self.current.get(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn clock() -> Arc<dyn Clock> {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap();
        Arc::new(SteppingClock::new(start, ChronoDuration::seconds(3)))
    }

    #[test]
    fn test_record_updates_ledger_and_current() {
        let session = Session::with_clock(clock());
        assert_eq!(session.current_label().as_str(), "neutral");

        let obs = session.record(15, "happy".into()).unwrap();
        assert_eq!(obs.timestamp.format("%H:%M:%S").to_string(), "10:00:00");
        session.record(30, "sad".into()).unwrap();

        assert_eq!(session.current_label().as_str(), "sad");
        let snap = session.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[1].timestamp.format("%H:%M:%S").to_string(), "10:00:03");
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let session = Session::with_clock(clock());
        session.record(30, "angry".into());
        assert!(session.record(15, "happy".into()).is_none());
        assert!(session.record(30, "happy".into()).is_none());
        assert_eq!(session.current_label().as_str(), "angry");
        assert_eq!(session.ledger().len(), 1);
    }

    #[test]
    fn test_sessions_are_independent() {
        let a = Session::with_clock(clock());
        let b = Session::with_clock(clock());
        a.record(1, "fear".into());
        assert_ne!(a.id(), b.id());
        assert!(b.ledger().is_empty());
        assert_eq!(b.info().current_label.as_str(), "neutral");
        assert_eq!(a.info().observations, 1);
    }
}
