//! Append-only sample history shared between the session (writer) and the
//! chart/summary readers.

use std::{
    fmt,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{day_bucket, FeedbackRating, HistoryEntry, Sample, StressLabel};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "history";

use crate::log_warn;

#[derive(Debug, Default)]
struct HistoryInner {
    entries: Vec<HistoryEntry>,
    next_seq: u64,
}

/// Cloning yields another handle to the same log.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    inner: Arc<RwLock<HistoryInner>>,
}

/// One point of the chart series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub label: StressLabel,
    pub bucket: String,
    pub timestamp: DateTime<Utc>,
    pub value: u8,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample and returns the stored entry.
    pub fn append(&self, session_id: Option<&str>, sample: Sample) -> HistoryEntry {
        push_entry(&mut self.write(), session_id, sample)
    }

    /// Loads previously persisted entries in front of an empty log.
    /// Returns the number of entries restored; a non-empty log is left as is.
    pub fn restore(&self, samples: Vec<(Option<String>, Sample)>) -> usize {
        let mut inner = self.write();
        if !inner.entries.is_empty() {
            log_warn!("restore skipped; log already holds {} entries", inner.entries.len());
            return 0;
        }

        let count = samples.len();
        for (session_id, sample) in samples {
            push_entry(&mut inner, session_id.as_deref(), sample);
        }
        count
    }

    /// Drops every entry. Only external reset flows call this.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.entries.clear();
        inner.next_seq = 0;
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.read().entries.clone()
    }

    pub fn entries_for_session(&self, session_id: &str) -> Vec<HistoryEntry> {
        self.read()
            .entries
            .iter()
            .filter(|e| e.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect()
    }

    pub fn latest(&self) -> Option<HistoryEntry> {
        self.read().entries.last().cloned()
    }

    pub fn stress_count(&self) -> usize {
        self.read()
            .entries
            .iter()
            .filter(|e| e.sample.is_stressed())
            .count()
    }

    pub fn chart_series(&self) -> Vec<ChartPoint> {
        self.read()
            .entries
            .iter()
            .map(|e| ChartPoint {
                label: e.sample.label,
                bucket: e.sample.day_bucket.clone(),
                timestamp: e.sample.timestamp,
                value: e.sample.chart_value(),
            })
            .collect()
    }

    pub fn summary(&self, latest_feedback: Option<FeedbackRating>) -> MonitorSummary {
        let inner = self.read();
        MonitorSummary {
            total_samples: inner.entries.len(),
            stress_instances: inner
                .entries
                .iter()
                .filter(|e| e.sample.is_stressed())
                .count(),
            latest_feedback: latest_feedback.map(|r| r.value()),
            latest_sample: inner.entries.last().map(|e| e.sample.clone()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HistoryInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HistoryInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A sample older than the current tail is stored with the tail's timestamp
/// so the log stays chronologically ordered.
fn push_entry(inner: &mut HistoryInner, session_id: Option<&str>, sample: Sample) -> HistoryEntry {
    let sample = match inner.entries.last() {
        Some(tail) if sample.timestamp < tail.sample.timestamp => {
            log_warn!(
                "sample at {} precedes tail at {}; clamping",
                sample.timestamp,
                tail.sample.timestamp
            );
            let timestamp = tail.sample.timestamp;
            Sample {
                timestamp,
                day_bucket: day_bucket(timestamp),
                ..sample
            }
        }
        _ => sample,
    };

    let entry = HistoryEntry {
        seq: inner.next_seq,
        session_id: session_id.map(str::to_owned),
        sample,
    };
    inner.next_seq += 1;
    inner.entries.push(entry.clone());
    entry
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSummary {
    pub total_samples: usize,
    pub stress_instances: usize,
    pub latest_feedback: Option<u8>,
    pub latest_sample: Option<Sample>,
}

impl fmt::Display for MonitorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total samples: {}", self.total_samples)?;
        writeln!(f, "Total stress instances: {}", self.stress_instances)?;
        match self.latest_feedback {
            Some(rating) => write!(f, "Latest feedback: {}/{}", rating, FeedbackRating::MAX),
            None => write!(f, "Latest feedback: none"),
        }
    }
}
