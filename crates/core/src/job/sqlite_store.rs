//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::store::check_transition;
use super::{
    CasOutcome, CreateJobRequest, Job, JobFilter, JobInput, JobResult, JobState, JobStore,
    JobStoreError, JobUpdate,
};

const JOB_COLUMNS: &str = "id, state, input, result, submitted_by, parent_id, created_at, started_at, finished_at, updated_at";

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, JobStoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, JobStoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
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
                state TEXT NOT NULL,
                input TEXT NOT NULL,
                result TEXT,
                submitted_by TEXT NOT NULL,
                parent_id TEXT,
                created_at TEXT NOT NULL,
                started_at TEXT,
                finished_at TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state);
            CREATE INDEX IF NOT EXISTS idx_jobs_submitted_by ON jobs(submitted_by);
            CREATE INDEX IF NOT EXISTS idx_jobs_parent_id ON jobs(parent_id);
            CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
            "#,
        )
        .map_err(db_err)
    }

    fn build_where_clause(filter: &JobFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(state) = filter.state {
            conditions.push("state = ?");
            params.push(Box::new(state.as_str()));
        }

        if let Some(ref submitted_by) = filter.submitted_by {
            conditions.push("submitted_by = ?");
            params.push(Box::new(submitted_by.clone()));
        }

        if let Some(ref parent_id) = filter.parent_id {
            conditions.push("parent_id = ?");
            params.push(Box::new(parent_id.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let state: String = row.get(1)?;
        let input: String = row.get(2)?;
        let result: Option<String> = row.get(3)?;

        Ok(Job {
            id: row.get(0)?,
            state: state.parse().map_err(|e: String| conversion_err(1, e))?,
            input: serde_json::from_str::<JobInput>(&input).map_err(|e| conversion_err(2, e))?,
            result: result
                .map(|json| serde_json::from_str::<JobResult>(&json))
                .transpose()
                .map_err(|e| conversion_err(3, e))?,
            submitted_by: row.get(4)?,
            parent_id: row.get(5)?,
            created_at: parse_timestamp(6, row.get(6)?)?,
            started_at: row
                .get::<_, Option<String>>(7)?
                .map(|ts| parse_timestamp(7, ts))
                .transpose()?,
            finished_at: row
                .get::<_, Option<String>>(8)?
                .map(|ts| parse_timestamp(8, ts))
                .transpose()?,
            updated_at: parse_timestamp(9, row.get(9)?)?,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Job>, JobStoreError> {
        conn.query_row(
            &format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS),
            params![id],
            Self::row_to_job,
        )
        .optional()
        .map_err(db_err)
    }
}

impl JobStore for SqliteJobStore {
    fn create(&self, request: CreateJobRequest) -> Result<Job, JobStoreError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let input_json = serde_json::to_string(&request.input).map_err(db_err)?;

        conn.execute(
            "INSERT INTO jobs (id, state, input, submitted_by, parent_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                JobState::Submitted.as_str(),
                input_json,
                request.submitted_by,
                request.parent_id,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        Ok(Job {
            id,
            state: JobState::Submitted,
            input: request.input,
            result: None,
            submitted_by: request.submitted_by,
            parent_id: request.parent_id,
            created_at: now,
            started_at: None,
            finished_at: None,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Job>, JobStoreError> {
        let conn = self.conn.lock().unwrap();
        Self::fetch(&conn, id)
    }

    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM jobs {} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            JOB_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_job)
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn count(&self, filter: &JobFilter) -> Result<i64, JobStoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_err)
    }

    fn compare_and_set(
        &self,
        id: &str,
        expected: JobState,
        update: JobUpdate,
    ) -> Result<CasOutcome, JobStoreError> {
        check_transition(id, expected, &update)?;

        let conn = self.conn.lock().unwrap();
        let target = update.target_state();

        let changed = match &update {
            JobUpdate::Start { at } => conn.execute(
                "UPDATE jobs SET state = ?, started_at = ?, updated_at = ? WHERE id = ? AND state = ?",
                params![
                    target.as_str(),
                    at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    id,
                    expected.as_str(),
                ],
            ),
            JobUpdate::Finish { result, at } => {
                let result_json = serde_json::to_string(result).map_err(db_err)?;
                conn.execute(
                    "UPDATE jobs SET state = ?, result = ?, finished_at = ?, updated_at = ? WHERE id = ? AND state = ?",
                    params![
                        target.as_str(),
                        result_json,
                        at.to_rfc3339(),
                        Utc::now().to_rfc3339(),
                        id,
                        expected.as_str(),
                    ],
                )
            }
        }
        .map_err(db_err)?;

        let job = Self::fetch(&conn, id)?.ok_or_else(|| JobStoreError::NotFound(id.to_string()))?;

        if changed == 1 {
            Ok(CasOutcome::Applied(job))
        } else {
            Ok(CasOutcome::Stale { current: job.state })
        }
    }
}

fn db_err(e: impl std::fmt::Display) -> JobStoreError {
    JobStoreError::Database(e.to_string())
}

fn conversion_err(
    column: usize,
    e: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, e.into())
}

fn parse_timestamp(column: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(column, e))
}
