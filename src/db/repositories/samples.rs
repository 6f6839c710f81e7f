use anyhow::Result;
use rusqlite::params;

use crate::db::{
    helpers::{parse_datetime, parse_label},
    Database,
};
use crate::models::{day_bucket, Sample};

impl Database {
    /// Queues the sample for insertion; returns immediately.
    pub fn record_sample(&self, session_id: Option<&str>, sample: &Sample) {
        let session_id = session_id.map(str::to_owned);
        let record = sample.clone();
        self.submit("sample insert", move |conn| {
            conn.execute(
                "INSERT INTO samples (session_id, timestamp, label, intensity, day_bucket)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    session_id,
                    record.timestamp.to_rfc3339(),
                    record.label.as_str(),
                    record.intensity.map(i64::from),
                    record.day_bucket,
                ],
            )?;
            Ok(())
        });
    }

    /// Every stored sample in insertion order.
    pub async fn load_samples(&self) -> Result<Vec<(Option<String>, Sample)>> {
        self.execute("sample load", |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, timestamp, label, intensity, day_bucket
                 FROM samples
                 ORDER BY id ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut samples = Vec::new();
            while let Some(row) = rows.next()? {
                let session_id: Option<String> = row.get(0)?;
                let timestamp = parse_datetime(&row.get::<_, String>(1)?, "timestamp")?;
                let label = parse_label(&row.get::<_, String>(2)?)?;
                let intensity: Option<i64> = row.get(3)?;
                let bucket: Option<String> = row.get(4)?;

                samples.push((
                    session_id,
                    Sample {
                        timestamp,
                        label,
                        intensity: intensity.map(|v| v.clamp(0, 100) as u8),
                        day_bucket: bucket.unwrap_or_else(|| day_bucket(timestamp)),
                    },
                ));
            }
            Ok(samples)
        })
        .await
    }

    pub async fn count_samples(&self, session_id: &str) -> Result<u64> {
        let session_id = session_id.to_string();
        self.execute("sample count", move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM samples WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }
}
