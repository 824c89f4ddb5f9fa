//! Session ledger
//!
//! Append-only log of observations. The inference path is the only writer;
//! aggregation, export and any UI read snapshots. A snapshot is always a
//! prefix of the true append order: rows are pushed whole under the write
//! lock, so a reader never sees a torn or reordered view.

use std::ops::Deref;
use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::neural::EmotionLabel;

/// One recorded (timestamp, label) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub label: EmotionLabel,
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime, label: impl Into<EmotionLabel>) -> Self {
        Self {
            timestamp,
            label: label.into(),
        }
    }
}

/// Immutable view of the ledger at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    rows: Arc<[Observation]>,
}

impl Default for LedgerSnapshot {
    fn default() -> Self {
        Self::from_observations(Vec::new())
    }
}

impl LedgerSnapshot {
    /// Snapshot over an explicit list, in the given order
    pub fn from_observations(rows: Vec<Observation>) -> Self {
        Self { rows: rows.into() }
    }

    /// The last `n` observations (all of them if fewer)
    pub fn tail(&self, n: usize) -> &[Observation] {
        let start = self.rows.len().saturating_sub(n);
        &self.rows[start..]
    }

    /// Whether `earlier` is an in-order prefix of this snapshot
    pub fn extends(&self, earlier: &LedgerSnapshot) -> bool {
        self.rows.len() >= earlier.rows.len() && self.rows[..earlier.rows.len()] == earlier.rows[..]
    }
}

impl Deref for LedgerSnapshot {
    type Target = [Observation];

    fn deref(&self) -> &[Observation] {
        &self.rows
    }
}

impl Serialize for LedgerSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows[..].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LedgerSnapshot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Observation>::deserialize(deserializer).map(Self::from_observations)
    }
}

/// Append-only observation log for one session
#[derive(Debug, Default)]
pub struct SessionLedger {
    rows: RwLock<Vec<Observation>>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one observation, returning the new length
    pub fn append(&self, timestamp: NaiveDateTime, label: EmotionLabel) -> usize {
        let mut rows = self.rows.write();
        rows.push(Observation { timestamp, label });
        rows.len()
    }

    /// Copy of everything appended so far
    pub fn snapshot(&self) -> LedgerSnapshot {
        let rows = self.rows.read();
        LedgerSnapshot {
            rows: Arc::from(rows.as_slice()),
        }
    }

    /// Rows appended after the first `already_seen`
    ///
    /// Lets a reader that holds an earlier snapshot catch up without
    /// copying the whole log again.
    pub fn snapshot_since(&self, already_seen: usize) -> Vec<Observation> {
        let rows = self.rows.read();
        rows.get(already_seen..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Observation> {
        self.rows.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::thread;

    fn at(sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(10, 0, sec))
            .unwrap()
    }

    #[test]
    fn test_append_and_snapshot_order() {
        let ledger = SessionLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.append(at(0), "neutral".into()), 1);
        assert_eq!(ledger.append(at(3), "happy".into()), 2);

        let snap = ledger.snapshot();
        let labels: Vec<&str> = snap.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["neutral", "happy"]);
        assert_eq!(ledger.last().unwrap().label.as_str(), "happy");
    }

    #[test]
    fn test_later_snapshot_extends_earlier() {
        let ledger = SessionLedger::new();
        ledger.append(at(0), "sad".into());
        let first = ledger.snapshot();
        ledger.append(at(1), "angry".into());
        let second = ledger.snapshot();

        assert_eq!(first.len(), 1);
        assert!(second.extends(&first));
        assert!(!first.extends(&second));
        assert_eq!(ledger.snapshot_since(1), vec![Observation::new(at(1), "angry")]);
        assert!(ledger.snapshot_since(5).is_empty());
    }

    #[test]
    fn test_tail_window() {
        let rows = (0..25).map(|i| Observation::new(at(i), "happy")).collect();
        let snap = LedgerSnapshot::from_observations(rows);
        assert_eq!(snap.tail(20).len(), 20);
        assert_eq!(snap.tail(20)[0].timestamp, at(5));
        assert_eq!(snap.tail(100).len(), 25);
    }

    #[test]
    fn test_concurrent_readers_see_prefixes() {
        let ledger = Arc::new(SessionLedger::new());
        let writer = {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for i in 0..500u32 {
                    ledger.append(at(i % 60), EmotionLabel::new(format!("l{}", i)));
                }
            })
        };

        let mut previous = LedgerSnapshot::default();
        for _ in 0..200 {
            let snap = ledger.snapshot();
            assert!(snap.extends(&previous));
            for (i, row) in snap.iter().enumerate() {
                assert_eq!(row.label.as_str(), format!("l{}", i));
            }
            previous = snap;
        }
        writer.join().unwrap();
        assert_eq!(ledger.len(), 500);
    }
}
