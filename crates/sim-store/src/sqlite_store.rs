use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sim_types::{Job, JobResult, JobSummary, QueueRecord, QueueState, SimError, SimResult};
use tracing::warn;

use crate::error::StoreError;
use crate::state_store::{StateStore, StoreSummary};

type StoreResult<T> = Result<T, StoreError>;

/// SQLite-backed implementation of [`StateStore`].
///
/// A single [`Connection`] behind a [`Mutex`] serializes all access; every
/// public method opens and commits its own short transaction, so the lock
/// is never held across anything other than a handful of synchronous SQL
/// statements (never across an adapter invocation).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    job_id TEXT PRIMARY KEY,
    backend TEXT NOT NULL,
    workdir TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS results (
    job_id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    updated_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS queue (
    job_id TEXT PRIMARY KEY,
    state TEXT NOT NULL,
    error TEXT,
    attempt_count INTEGER DEFAULT 0,
    max_attempts INTEGER DEFAULT 1,
    enqueued_at TEXT DEFAULT CURRENT_TIMESTAMP,
    started_at TEXT,
    finished_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_queue_state_enqueued ON queue(state, enqueued_at);
"#;

fn parse_sqlite_ts(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> SimResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SimError::Internal(format!("failed to create store directory: {e}")))?;
            }
        }
        let conn = Connection::open(path).map_err(StoreError::from)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> SimResult<Self> {
        conn.execute_batch(SCHEMA).map_err(StoreError::from)?;
        migrate_queue_columns(&conn)?;
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Database(format!("poisoned store mutex: {e}")))
    }
}

fn migrate_queue_columns(conn: &Connection) -> SimResult<()> {
    let mut stmt = conn
        .prepare("PRAGMA table_info(queue)")
        .map_err(StoreError::from)?;
    let cols: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(StoreError::from)?
        .filter_map(|r| r.ok())
        .collect();
    drop(stmt);

    if !cols.iter().any(|c| c == "attempt_count") {
        conn.execute_batch("ALTER TABLE queue ADD COLUMN attempt_count INTEGER DEFAULT 0")
            .map_err(StoreError::from)?;
    }
    if !cols.iter().any(|c| c == "max_attempts") {
        conn.execute_batch("ALTER TABLE queue ADD COLUMN max_attempts INTEGER DEFAULT 1")
            .map_err(StoreError::from)?;
    }
    Ok(())
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn upsert_job(&self, job: &Job) -> SimResult<()> {
        let payload = serde_json::to_string(job).map_err(StoreError::from)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO jobs(job_id, backend, workdir, payload_json) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(job_id) DO UPDATE SET
               backend=excluded.backend, workdir=excluded.workdir, payload_json=excluded.payload_json",
            params![job.job_id, job.backend, job.workdir, payload],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn upsert_result(&self, result: &JobResult) -> SimResult<()> {
        let payload = serde_json::to_string(result).map_err(StoreError::from)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO results(job_id, status, payload_json, updated_at) VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
             ON CONFLICT(job_id) DO UPDATE SET
               status=excluded.status, payload_json=excluded.payload_json, updated_at=CURRENT_TIMESTAMP",
            params![result.job_id, result.status.name(), payload],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> SimResult<Option<Job>> {
        let conn = self.lock()?;
        let payload: Option<String> = conn
            .query_row("SELECT payload_json FROM jobs WHERE job_id=?1", params![job_id], |row| row.get(0))
            .optional()
            .map_err(StoreError::from)?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p).map_err(StoreError::from)?)),
            None => Ok(None),
        }
    }

    async fn get_result(&self, job_id: &str) -> SimResult<Option<JobResult>> {
        let conn = self.lock()?;
        let payload: Option<String> = conn
            .query_row("SELECT payload_json FROM results WHERE job_id=?1", params![job_id], |row| row.get(0))
            .optional()
            .map_err(StoreError::from)?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p).map_err(StoreError::from)?)),
            None => Ok(None),
        }
    }

    async fn list_jobs(&self, limit: i64) -> SimResult<Vec<JobSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT j.job_id, j.backend, j.created_at, r.status, r.updated_at
                 FROM jobs j LEFT JOIN results r ON r.job_id = j.job_id
                 ORDER BY j.created_at DESC LIMIT ?1",
            )
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params![limit], |row| {
                let job_id: String = row.get(0)?;
                let backend: String = row.get(1)?;
                let created_at: String = row.get(2)?;
                let status: Option<String> = row.get(3)?;
                let updated_at: Option<String> = row.get(4)?;
                Ok((job_id, backend, created_at, status, updated_at))
            })
            .map_err(StoreError::from)?;

        let mut out = Vec::new();
        for row in rows {
            let (job_id, backend, created_at, status, updated_at) = row.map_err(StoreError::from)?;
            out.push(JobSummary {
                job_id,
                backend,
                created_at: parse_sqlite_ts(&created_at),
                status: status.unwrap_or_else(|| "queued".to_string()),
                updated_at: updated_at.as_deref().map(parse_sqlite_ts),
            });
        }
        Ok(out)
    }

    async fn enqueue(&self, job_id: &str, max_attempts: i64) -> SimResult<()> {
        let max_attempts = max_attempts.max(1);
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO queue(job_id, state, error, attempt_count, max_attempts, enqueued_at, started_at, finished_at)
             VALUES (?1, 'queued', NULL, 0, ?2, CURRENT_TIMESTAMP, NULL, NULL)
             ON CONFLICT(job_id) DO UPDATE SET
               state='queued', error=NULL, max_attempts=excluded.max_attempts,
               enqueued_at=CURRENT_TIMESTAMP, started_at=NULL, finished_at=NULL",
            params![job_id, max_attempts],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn start_job(&self, job_id: &str) -> SimResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE queue SET state='running', started_at=CURRENT_TIMESTAMP, error=NULL,
               attempt_count=attempt_count+1 WHERE job_id=?1",
            params![job_id],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn finish_job(&self, job_id: &str, state: QueueState, error: Option<String>) -> SimResult<()> {
        if !state.is_terminal() {
            warn!(job_id, state = state.name(), "finish_job called with a non-terminal state");
        }
        let conn = self.lock()?;
        conn.execute(
            "UPDATE queue SET state=?1, error=?2, finished_at=CURRENT_TIMESTAMP WHERE job_id=?3",
            params![state.name(), error, job_id],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn should_retry(&self, job_id: &str) -> SimResult<bool> {
        let conn = self.lock()?;
        let row: Option<(i64, i64)> = conn
            .query_row(
                "SELECT attempt_count, max_attempts FROM queue WHERE job_id=?1",
                params![job_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(StoreError::from)?;
        Ok(row.map(|(attempt, max)| attempt < max).unwrap_or(false))
    }

    async fn requeue_for_retry(&self, job_id: &str, error: Option<String>) -> SimResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE queue SET state='queued', error=?1, started_at=NULL, finished_at=NULL,
               enqueued_at=CURRENT_TIMESTAMP WHERE job_id=?2",
            params![error, job_id],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn cancel(&self, job_id: &str, reason: Option<String>) -> SimResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE queue SET state='cancelled', error=?1, finished_at=CURRENT_TIMESTAMP WHERE job_id=?2",
            params![reason, job_id],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn replay_dead(&self, job_id: &str, max_attempts: i64) -> SimResult<bool> {
        let max_attempts = max_attempts.max(1);
        let conn = self.lock()?;
        let affected = conn
            .execute(
                "UPDATE queue SET state='queued', error=NULL, attempt_count=0, max_attempts=?1,
                   enqueued_at=CURRENT_TIMESTAMP, started_at=NULL, finished_at=NULL
                 WHERE job_id=?2 AND state='dead'",
                params![max_attempts, job_id],
            )
            .map_err(StoreError::from)?;
        Ok(affected > 0)
    }

    async fn next_queued_job_id(&self) -> SimResult<Option<String>> {
        let conn = self.lock()?;
        let job_id: Option<String> = conn
            .query_row(
                "SELECT job_id FROM queue WHERE state='queued' ORDER BY enqueued_at ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)?;
        Ok(job_id)
    }

    async fn claim_next_queued(&self) -> SimResult<Option<String>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::from)?;
        let job_id: Option<String> = tx
            .query_row(
                "SELECT job_id FROM queue WHERE state='queued' ORDER BY enqueued_at ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)?;

        if let Some(ref id) = job_id {
            let affected = tx
                .execute(
                    "UPDATE queue SET state='running', started_at=CURRENT_TIMESTAMP, error=NULL,
                       attempt_count=attempt_count+1 WHERE job_id=?1 AND state='queued'",
                    params![id],
                )
                .map_err(StoreError::from)?;
            if affected == 0 {
                tx.rollback().map_err(StoreError::from)?;
                return Ok(None);
            }
        }
        tx.commit().map_err(StoreError::from)?;
        Ok(job_id)
    }

    async fn queue_state(&self, job_id: &str) -> SimResult<Option<QueueRecord>> {
        let conn = self.lock()?;
        let row: Option<(String, Option<String>, i64, i64, String, Option<String>, Option<String>)> = conn
            .query_row(
                "SELECT state, error, attempt_count, max_attempts, enqueued_at, started_at, finished_at
                 FROM queue WHERE job_id=?1",
                params![job_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()
            .map_err(StoreError::from)?;

        let Some((state, error, attempt_count, max_attempts, enqueued_at, started_at, finished_at)) = row else {
            return Ok(None);
        };
        let state = QueueState::parse(&state)
            .ok_or_else(|| SimError::Internal(format!("corrupt queue state value: {state}")))?;
        Ok(Some(QueueRecord {
            job_id: job_id.to_string(),
            state,
            error,
            attempt_count,
            max_attempts,
            enqueued_at: parse_sqlite_ts(&enqueued_at),
            started_at: started_at.as_deref().map(parse_sqlite_ts),
            finished_at: finished_at.as_deref().map(parse_sqlite_ts),
        }))
    }

    async fn purge_finished(&self, keep_latest: i64) -> SimResult<usize> {
        let keep_latest = keep_latest.max(0);
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT job_id FROM queue WHERE state IN ('completed','failed','dead','cancelled')
                 ORDER BY COALESCE(finished_at, enqueued_at) DESC",
            )
            .map_err(StoreError::from)?;
        let ids: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(StoreError::from)?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);

        let to_delete: Vec<&String> = ids.iter().skip(keep_latest as usize).collect();
        for job_id in &to_delete {
            conn.execute("DELETE FROM queue WHERE job_id=?1", params![job_id]).map_err(StoreError::from)?;
            conn.execute("DELETE FROM results WHERE job_id=?1", params![job_id]).map_err(StoreError::from)?;
            conn.execute("DELETE FROM jobs WHERE job_id=?1", params![job_id]).map_err(StoreError::from)?;
        }
        Ok(to_delete.len())
    }

    async fn summary(&self) -> SimResult<StoreSummary> {
        let conn = self.lock()?;
        let total_jobs: i64 = conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))
            .map_err(StoreError::from)?;

        let mut status_counts = HashMap::new();
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM results GROUP BY status").map_err(StoreError::from)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(StoreError::from)?;
        for row in rows {
            let (status, count) = row.map_err(StoreError::from)?;
            status_counts.insert(status, count);
        }
        drop(stmt);

        let mut queue_counts = HashMap::new();
        let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM queue GROUP BY state").map_err(StoreError::from)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(StoreError::from)?;
        for row in rows {
            let (state, count) = row.map_err(StoreError::from)?;
            queue_counts.insert(state, count);
        }

        Ok(StoreSummary { total_jobs, status_counts, queue_counts })
    }

    async fn stranded_running(&self, threshold: DateTime<Utc>) -> SimResult<Vec<String>> {
        let conn = self.lock()?;
        let threshold_str = threshold.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut stmt = conn
            .prepare("SELECT job_id FROM queue WHERE state='running' AND started_at IS NOT NULL AND started_at < ?1")
            .map_err(StoreError::from)?;
        let ids = stmt
            .query_map(params![threshold_str], |row| row.get(0))
            .map_err(StoreError::from)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }
}
