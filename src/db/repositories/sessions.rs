use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    columns::{secs_from_sql, secs_to_sql, timestamp_from_sql},
    models::{SessionRecord, SessionStatus},
};

fn row_to_session(row: &Row) -> Result<SessionRecord> {
    let started_at: String = row.get("started_at")?;
    let stopped_at: Option<String> = row.get("stopped_at")?;
    let updated_at: String = row.get("updated_at")?;
    let status: String = row.get("status")?;
    let target_secs: Option<i64> = row.get("target_secs")?;
    let elapsed_secs: i64 = row.get("elapsed_secs")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        started_at: timestamp_from_sql(&started_at, "started_at")?,
        stopped_at: stopped_at
            .map(|raw| timestamp_from_sql(&raw, "stopped_at"))
            .transpose()?,
        status: status.parse()?,
        target_secs: target_secs
            .map(|secs| secs_from_sql(secs, "target_secs"))
            .transpose()?,
        elapsed_secs: secs_from_sql(elapsed_secs, "elapsed_secs")?,
        sound_count: row.get("sound_count")?,
        updated_at: timestamp_from_sql(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_session(&self, session: &SessionRecord) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, started_at, stopped_at, status, target_secs, elapsed_secs, sound_count, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    record.target_secs.map(secs_to_sql).transpose()?,
                    secs_to_sql(record.elapsed_secs)?,
                    record.sound_count,
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn mark_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        elapsed_secs: u64,
        stopped_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     elapsed_secs = ?2,
                     stopped_at = ?3,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    status.as_str(),
                    secs_to_sql(elapsed_secs)?,
                    stopped_at.to_rfc3339(),
                    session_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Most recent sessions first.
    pub async fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let limit = limit as i64;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, stopped_at, status, target_secs, elapsed_secs, sound_count, updated_at
                 FROM sessions
                 ORDER BY started_at DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    /// Close out sessions a crash left `Running`. Returns their ids.
    pub async fn recover_incomplete_sessions(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let ids = {
                let mut stmt = tx.prepare("SELECT id FROM sessions WHERE status = 'Running'")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                ids
            };

            for id in &ids {
                tx.execute(
                    "UPDATE sessions
                     SET status = ?1,
                         stopped_at = COALESCE(stopped_at, ?2),
                         updated_at = ?2
                     WHERE id = ?3",
                    params![SessionStatus::Interrupted.as_str(), now.to_rfc3339(), id],
                )?;
            }
            tx.commit()?;
            Ok(ids)
        })
        .await
    }
}
