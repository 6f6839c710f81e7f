use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::models::{SessionStatus, StressLabel};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_status(value: &str) -> Result<SessionStatus> {
    match value {
        "Running" => Ok(SessionStatus::Running),
        "Completed" => Ok(SessionStatus::Completed),
        "Interrupted" => Ok(SessionStatus::Interrupted),
        other => Err(anyhow!("unknown session status {other}")),
    }
}

pub fn parse_label(value: &str) -> Result<StressLabel> {
    match value {
        "Calm" => Ok(StressLabel::Calm),
        "Stressed" => Ok(StressLabel::Stressed),
        other => Err(anyhow!("unknown sample label {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_statuses_round_trip_through_text() {
        for label in [StressLabel::Calm, StressLabel::Stressed] {
            assert_eq!(parse_label(label.as_str()).unwrap(), label);
        }
        for status in [
            SessionStatus::Running,
            SessionStatus::Completed,
            SessionStatus::Interrupted,
        ] {
            assert_eq!(parse_status(status.as_str()).unwrap(), status);
        }
        assert!(parse_label("Anxious").is_err());
    }

    #[test]
    fn integer_conversions_guard_ranges() {
        assert!(to_i64(u64::MAX).is_err());
        assert!(to_u64(-1, "interval_ms").is_err());
        assert_eq!(to_u64(5_000, "interval_ms").unwrap(), 5_000);
    }
}
