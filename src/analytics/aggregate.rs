//! Session aggregation
//!
//! Turns a ledger snapshot into the numbers the charts need: per-label
//! counts and shares, the dominant label and the chronological timeline.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::neural::EmotionLabel;
use crate::state::Observation;

/// How often one label was observed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: EmotionLabel,
    pub count: usize,
    /// Fraction of all observations, 0.0 to 1.0
    pub share: f64,
}

/// Aggregates over a non-empty snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub total: usize,
    /// Counts in first-encountered order
    pub counts: Vec<LabelCount>,
    pub dominant: LabelCount,
    /// (timestamp, label) pairs in ledger order
    pub timeline: Vec<(NaiveDateTime, EmotionLabel)>,
    pub first_at: NaiveDateTime,
    pub last_at: NaiveDateTime,
}

impl SessionStats {
    pub fn count_of(&self, label: &str) -> usize {
        self.counts
            .iter()
            .find(|c| c.label.as_str() == label)
            .map_or(0, |c| c.count)
    }
}

/// Result of aggregating a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionSummary {
    /// The snapshot held no observations
    NoData,
    Data(SessionStats),
}

impl SessionSummary {
    pub fn stats(&self) -> Option<&SessionStats> {
        match self {
            SessionSummary::NoData => None,
            SessionSummary::Data(stats) => Some(stats),
        }
    }

    pub fn dominant(&self) -> Option<&LabelCount> {
        self.stats().map(|s| &s.dominant)
    }
}

/// Aggregate a snapshot
///
/// The dominant label is the one with the highest count; ties go to the
/// label encountered first.
pub fn summarize(observations: &[Observation]) -> SessionSummary {
    let (first, last) = match (observations.first(), observations.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return SessionSummary::NoData,
    };

    // First-encountered order, indexed by label
    let mut tallies: Vec<(EmotionLabel, usize)> = Vec::new();
    let mut slots: HashMap<&EmotionLabel, usize> = HashMap::new();
    for obs in observations {
        match slots.get(&obs.label) {
            Some(&slot) => tallies[slot].1 += 1,
            None => {
                slots.insert(&obs.label, tallies.len());
                tallies.push((obs.label.clone(), 1));
            }
        }
    }

    let total = observations.len();
    let counts: Vec<LabelCount> = tallies
        .into_iter()
        .map(|(label, count)| LabelCount {
            label,
            count,
            share: count as f64 / total as f64,
        })
        .collect();

    let mut dominant = &counts[0];
    for candidate in &counts[1..] {
        if candidate.count > dominant.count {
            dominant = candidate;
        }
    }
    let dominant = dominant.clone();

    SessionSummary::Data(SessionStats {
        total,
        dominant,
        timeline: observations
            .iter()
            .map(|o| (o.timestamp, o.label.clone()))
            .collect(),
        counts,
        first_at: first.timestamp,
        last_at: last.timestamp,
    })
}
