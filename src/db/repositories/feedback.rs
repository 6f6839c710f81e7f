use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::db::{helpers::parse_datetime, Database};
use crate::models::{FeedbackRating, FeedbackRecord};

impl Database {
    pub fn record_feedback(&self, feedback: &FeedbackRecord) {
        let record = feedback.clone();
        self.submit("feedback insert", move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO feedback (alert_id, session_id, rating, submitted_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.alert_id.to_string(),
                    record.session_id,
                    i64::from(record.rating.value()),
                    record.submitted_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        });
    }

    pub async fn latest_feedback(&self) -> Result<Option<FeedbackRecord>> {
        self.execute("latest feedback read", |conn| {
            let raw = conn
                .query_row(
                    "SELECT alert_id, session_id, rating, submitted_at
                     FROM feedback
                     ORDER BY submitted_at DESC
                     LIMIT 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()?;

            let Some((alert_id, session_id, rating, submitted_at)) = raw else {
                return Ok(None);
            };

            Ok(Some(FeedbackRecord {
                alert_id: Uuid::parse_str(&alert_id)
                    .with_context(|| format!("invalid alert id {alert_id}"))?,
                session_id,
                rating: FeedbackRating::new(rating)?,
                submitted_at: parse_datetime(&submitted_at, "submitted_at")?,
            }))
        })
        .await
    }
}
