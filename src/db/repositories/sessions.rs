use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, parse_optional_datetime, parse_status, to_i64, to_u64},
    Database,
};
use crate::models::{SessionRecord, SessionStatus};

const SESSION_COLUMNS: &str =
    "id, started_at, stopped_at, status, interval_ms, created_at, updated_at";

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let started_at: String = row.get("started_at")?;
    let stopped_at: Option<String> = row.get("stopped_at")?;
    let status: String = row.get("status")?;
    let interval_ms: i64 = row.get("interval_ms")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        stopped_at: parse_optional_datetime(stopped_at, "stopped_at")?,
        status: parse_status(&status)?,
        interval_ms: to_u64(interval_ms, "interval_ms")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    /// Queues the insert of a freshly started session.
    pub fn record_session_started(&self, session: &SessionRecord) {
        let record = session.clone();
        self.submit("session insert", move |conn| {
            conn.execute(
                "INSERT INTO monitoring_sessions (id, started_at, stopped_at, status, interval_ms, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    to_i64(record.interval_ms)?,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        });
    }

    /// Queues a status change for a session.
    pub fn record_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        stopped_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) {
        let session_id = session_id.to_string();
        self.submit("session status update", move |conn| {
            conn.execute(
                "UPDATE monitoring_sessions
                 SET status = ?1,
                     stopped_at = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    status.as_str(),
                    stopped_at.map(|dt| dt.to_rfc3339()),
                    updated_at.to_rfc3339(),
                    session_id,
                ],
            )?;
            Ok(())
        });
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let session_id = session_id.to_string();
        self.execute("session read", move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM monitoring_sessions WHERE id = ?1"
            ))?;
            let raw = stmt
                .query_row(params![session_id], |row| Ok(row_to_session(row)))
                .optional()?;
            raw.transpose()
        })
        .await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>> {
        self.execute("session list", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM monitoring_sessions ORDER BY started_at ASC"
            ))?;
            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    /// Marks sessions left `Running` by an unclean shutdown as `Interrupted`.
    pub async fn recover_interrupted_sessions(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        self.execute("interrupted session recovery", move |conn| {
            let tx = conn.transaction()?;
            let ids = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM monitoring_sessions WHERE status = 'Running' ORDER BY started_at ASC",
                )?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            tx.execute(
                "UPDATE monitoring_sessions
                 SET status = ?1,
                     stopped_at = COALESCE(stopped_at, ?2),
                     updated_at = ?2
                 WHERE status = 'Running'",
                params![SessionStatus::Interrupted.as_str(), now.to_rfc3339()],
            )?;
            tx.commit()?;
            Ok(ids)
        })
        .await
    }
}
