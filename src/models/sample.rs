//! Sample and history data models.
//!
//! A `Sample` is the immutable outcome of one scheduler tick. `HistoryEntry`
//! wraps it with its position in the log so chart and summary readers agree
//! on ordering.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StressLabel {
    Calm,
    Stressed,
}

impl StressLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StressLabel::Calm => "Calm",
            StressLabel::Stressed => "Stressed",
        }
    }
}

/// Raw detector output before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Binary(bool),
    /// Percentage in 0..=100. Values above 100 are clamped.
    Intensity(u8),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub label: StressLabel,
    pub intensity: Option<u8>,
    pub day_bucket: String,
}

impl Sample {
    /// Builds a sample from a detection. An intensity is stressed when it is
    /// strictly above `threshold`.
    pub fn classify(detection: Detection, timestamp: DateTime<Utc>, threshold: u8) -> Self {
        let (label, intensity) = match detection {
            Detection::Binary(true) => (StressLabel::Stressed, None),
            Detection::Binary(false) => (StressLabel::Calm, None),
            Detection::Intensity(raw) => {
                let level = raw.min(100);
                let label = if level > threshold {
                    StressLabel::Stressed
                } else {
                    StressLabel::Calm
                };
                (label, Some(level))
            }
        };

        Self {
            timestamp,
            label,
            intensity,
            day_bucket: day_bucket(timestamp),
        }
    }

    pub fn is_stressed(&self) -> bool {
        self.label == StressLabel::Stressed
    }

    /// Chart value: the intensity when present, otherwise 0/100 for the label.
    pub fn chart_value(&self) -> u8 {
        match (self.intensity, self.label) {
            (Some(level), _) => level,
            (None, StressLabel::Stressed) => 100,
            (None, StressLabel::Calm) => 0,
        }
    }
}

/// Short local weekday name ("Mon", "Tue", ...) used as the chart x-axis key.
pub fn day_bucket(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%a").to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub seq: u64,
    pub session_id: Option<String>,
    pub sample: Sample,
}
