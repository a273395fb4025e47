//! SQLite-backed job store implementation.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Job, JobPatch, JobStatus, JobStore, JobStoreError};

const SELECT_COLUMNS: &str = "SELECT id, created_at, status, input_path, output_path, output_url, video_url, demo_index, error, duration_ms FROM jobs";

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JobStoreError> {
        let conn = Connection::open(path).map_err(|e| JobStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, JobStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| JobStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL,
                input_path TEXT NOT NULL,
                output_path TEXT,
                output_url TEXT,
                video_url TEXT,
                demo_index INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                duration_ms INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at DESC);
            "#,
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, JobStoreError> {
        self.conn
            .lock()
            .map_err(|_| JobStoreError::Database("connection lock poisoned".to_string()))
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let created_at_str: String = row.get(1)?;
        let status_str: String = row.get(2)?;
        let input_path: String = row.get(3)?;
        let output_path: Option<String> = row.get(4)?;
        let duration_ms: Option<i64> = row.get(9)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        // Unknown status strings only come from foreign writers; treat as failed.
        let status = JobStatus::parse(&status_str).unwrap_or(JobStatus::Error);

        Ok(Job {
            id: row.get(0)?,
            created_at,
            status,
            input_path: PathBuf::from(input_path),
            output_path: output_path.map(PathBuf::from),
            output_url: row.get(5)?,
            video_url: row.get(6)?,
            demo_index: row.get(7)?,
            error: row.get(8)?,
            duration_ms: duration_ms.map(|ms| ms.max(0) as u64),
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Job>, JobStoreError> {
        conn.query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_job,
        )
        .optional()
        .map_err(|e| JobStoreError::Database(e.to_string()))
    }
}

fn path_str(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

impl JobStore for SqliteJobStore {
    fn create(&self, job: &Job) -> Result<(), JobStoreError> {
        let conn = self.lock()?;

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO jobs (id, created_at, status, input_path, output_path, output_url, video_url, demo_index, error, duration_ms) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    job.id,
                    job.created_at.to_rfc3339(),
                    job.status.as_str(),
                    job.input_path.to_string_lossy().into_owned(),
                    path_str(&job.output_path),
                    job.output_url,
                    job.video_url,
                    job.demo_index,
                    job.error,
                    job.duration_ms.map(|ms| ms as i64),
                ],
            )
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        if inserted == 0 {
            return Err(JobStoreError::Duplicate(job.id.clone()));
        }
        Ok(())
    }

    fn update(&self, id: &str, patch: &JobPatch) -> Result<Job, JobStoreError> {
        let conn = self.lock()?;

        let mut job = Self::fetch(&conn, id)?.ok_or_else(|| JobStoreError::NotFound(id.to_string()))?;
        JobStoreError::check_transition(id, job.status, patch)?;
        job.apply(patch);

        conn.execute(
            "UPDATE jobs SET status = ?, output_path = ?, output_url = ?, video_url = ?, error = ?, duration_ms = ? WHERE id = ?",
            params![
                job.status.as_str(),
                path_str(&job.output_path),
                job.output_url,
                job.video_url,
                job.error,
                job.duration_ms.map(|ms| ms as i64),
                id,
            ],
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(job)
    }

    fn get(&self, id: &str) -> Result<Option<Job>, JobStoreError> {
        let conn = self.lock()?;
        Self::fetch(&conn, id)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(&format!(
                "{} ORDER BY created_at DESC, rowid DESC LIMIT ?",
                SELECT_COLUMNS
            ))
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let jobs = stmt
            .query_map(params![limit as i64], Self::row_to_job)
            .map_err(|e| JobStoreError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteJobStore {
        SqliteJobStore::in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let job = Job::running("job-1", "storage/inputs/job-1.png", 3);
        store.create(&job).unwrap();

        let loaded = store.get("job-1").unwrap().unwrap();
        assert_eq!(loaded.id, "job-1");
        assert_eq!(loaded.status, JobStatus::Running);
        assert_eq!(loaded.input_path, PathBuf::from("storage/inputs/job-1.png"));
        assert_eq!(loaded.demo_index, 3);
        assert!(loaded.output_path.is_none());
    }

    #[test]
    fn test_get_missing() {
        assert!(store().get("nope").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let store = store();
        let job = Job::running("job-1", "in.png", 0);
        store.create(&job).unwrap();

        let err = store.create(&job).unwrap_err();
        assert!(matches!(err, JobStoreError::Duplicate(_)));
    }

    #[test]
    fn test_update_to_done() {
        let store = store();
        store.create(&Job::running("job-1", "in.png", 0)).unwrap();

        let patch = JobPatch::done("storage/outputs/job-1.webp", "http://localhost/job-1.webp", 4200)
            .with_video_url("https://cdn/XYZ/foo.mp4");
        let job = store.update("job-1", &patch).unwrap();
        assert_eq!(job.status, JobStatus::Done);

        let loaded = store.get("job-1").unwrap().unwrap();
        assert_eq!(loaded, job);
        assert_eq!(loaded.duration_ms, Some(4200));
        assert_eq!(loaded.video_url.as_deref(), Some("https://cdn/XYZ/foo.mp4"));
    }

    #[test]
    fn test_terminal_status_is_final() {
        let store = store();
        store.create(&Job::running("job-1", "in.png", 0)).unwrap();
        store.update("job-1", &JobPatch::failed("boom", 10)).unwrap();

        let err = store
            .update("job-1", &JobPatch::done("out.webp", "http://x/out.webp", 20))
            .unwrap_err();
        assert!(matches!(err, JobStoreError::InvalidTransition { .. }));

        let loaded = store.get("job-1").unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Error);
        assert_eq!(loaded.error.as_deref(), Some("boom"));
        assert!(loaded.output_path.is_none());
    }

    #[test]
    fn test_update_missing() {
        let err = store().update("nope", &JobPatch::failed("x", 0)).unwrap_err();
        assert!(matches!(err, JobStoreError::NotFound(_)));
    }

    #[test]
    fn test_list_recent_newest_first() {
        let store = store();
        for i in 0..5 {
            let mut job = Job::running(format!("job-{}", i), "in.png", 0);
            job.created_at = Utc::now() + chrono::Duration::seconds(i);
            store.create(&job).unwrap();
        }

        let jobs = store.list_recent(3).unwrap();
        let ids: Vec<_> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["job-4", "job-3", "job-2"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");

        {
            let store = SqliteJobStore::new(&path).unwrap();
            store.create(&Job::running("job-1", "in.png", 0)).unwrap();
        }

        let store = SqliteJobStore::new(&path).unwrap();
        assert!(store.get("job-1").unwrap().is_some());
    }
}
