//! Task store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Define the read contract the proximity restore path depends on.
//! - Persist task records with their optional location reminder.
//!
//! # Invariants
//! - A stored location is all-or-nothing: latitude, longitude and range are
//!   either all present or all NULL.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories only accept connections with migrations fully applied.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::task_record::{TaskLocation, TaskRecord, TaskStatus};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    status,
    latitude,
    longitude,
    range_meters,
    address,
    notify_on_location
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(String),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read contract used to rebuild the proximity registry at login.
pub trait TaskStore {
    /// Returns pending tasks of `user_id` that carry a location and have
    /// arrival notifications enabled.
    fn query_pending_tasks_with_location(&self, user_id: &str) -> RepoResult<Vec<TaskRecord>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    /// Inserts a task or overwrites the existing row with the same id.
    pub fn upsert_task(&self, task: &TaskRecord) -> RepoResult<()> {
        let (latitude, longitude, range_meters, address) = match &task.location {
            Some(location) => (
                Some(location.latitude),
                Some(location.longitude),
                Some(location.range_meters),
                location.address.as_deref(),
            ),
            None => (None, None, None, None),
        };

        self.conn.execute(
            "INSERT INTO tasks (
                id,
                user_id,
                title,
                status,
                latitude,
                longitude,
                range_meters,
                address,
                notify_on_location
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                title = excluded.title,
                status = excluded.status,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                range_meters = excluded.range_meters,
                address = excluded.address,
                notify_on_location = excluded.notify_on_location,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                task.id.as_str(),
                task.user_id.as_str(),
                task.title.as_str(),
                task.status.as_str(),
                latitude,
                longitude,
                range_meters,
                address,
                bool_to_int(task.notify_on_location),
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> RepoResult<Option<TaskRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    /// Lists all tasks of one user, newest update first.
    pub fn list_tasks_for_user(&self, user_id: &str) -> RepoResult<Vec<TaskRecord>> {
        self.collect(
            &format!("{TASK_SELECT_SQL} WHERE user_id = ?1 ORDER BY updated_at DESC, id ASC;"),
            user_id,
        )
    }

    pub fn delete_task(&self, id: &str) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn collect(&self, sql: &str, user_id: &str) -> RepoResult<Vec<TaskRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([user_id])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }
}

impl TaskStore for SqliteTaskRepository<'_> {
    fn query_pending_tasks_with_location(&self, user_id: &str) -> RepoResult<Vec<TaskRecord>> {
        self.collect(
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE user_id = ?1
                   AND status = 'pending'
                   AND notify_on_location = 1
                   AND latitude IS NOT NULL
                 ORDER BY created_at ASC, id ASC;"
            ),
            user_id,
        )
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<TaskRecord> {
    let id: String = row.get("id")?;

    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` for task {id}"))
    })?;

    let latitude: Option<f64> = row.get("latitude")?;
    let longitude: Option<f64> = row.get("longitude")?;
    let range_meters: Option<f64> = row.get("range_meters")?;
    let location = match (latitude, longitude, range_meters) {
        (Some(latitude), Some(longitude), Some(range_meters)) => Some(TaskLocation {
            latitude,
            longitude,
            range_meters,
            address: row.get("address")?,
        }),
        (None, None, None) => None,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "partial location columns for task {id}"
            )));
        }
    };

    let notify_on_location = match row.get::<_, i64>("notify_on_location")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid notify_on_location value `{other}` for task {id}"
            )));
        }
    };

    Ok(TaskRecord {
        id,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        status,
        location,
        notify_on_location,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
