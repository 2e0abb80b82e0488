//! Database layer for the patient records store.

mod patients;
mod schema;

#[allow(unused_imports)]
pub use patients::*;
pub use schema::*;

use std::thread;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use thiserror::Error;

use crate::config::StoreConfig;
use crate::models::ValidationError;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Coarse failure class, as surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Validation(_) => ErrorKind::Validation,
            DbError::NotFound(_) => ErrorKind::NotFound,
            DbError::Constraint(_) | DbError::Sqlite(_) | DbError::Pool(_) => ErrorKind::Storage,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// A connection checked out of the pool; returned to it on drop.
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Pooled database handle. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    acquire_retries: u32,
    retry_backoff: Duration,
}

impl Database {
    /// Open the database file named by the config, creating it if needed.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        let busy_timeout = config.busy_timeout();
        let manager = SqliteConnectionManager::file(config.database_path())
            .with_init(move |conn| initialize(conn, busy_timeout));

        let pool = Pool::builder()
            .max_size(config.pool_size())
            .connection_timeout(config.acquire_timeout())
            .build(manager)?;

        tracing::debug!(
            path = %config.database_path().display(),
            pool_size = config.pool_size(),
            "opened patient store"
        );

        Ok(Self {
            pool,
            acquire_retries: config.acquire_retries(),
            retry_backoff: config.acquire_timeout() / 10,
        })
    }

    /// Create in-memory database (for testing).
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub fn open_in_memory() -> DbResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| initialize(conn, Duration::from_secs(5)));

        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        Ok(Self {
            pool,
            acquire_retries: 0,
            retry_backoff: Duration::ZERO,
        })
    }

    /// Check a connection out of the pool.
    ///
    /// The returned guard puts the connection back when dropped, on every
    /// exit path. Checkout is retried `acquire_retries` times with linear
    /// backoff before the pool timeout is reported.
    pub fn conn(&self) -> DbResult<DbConnection> {
        let mut attempt = 0;
        loop {
            match self.pool.get() {
                Ok(conn) => return Ok(conn),
                Err(e) if attempt < self.acquire_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "connection checkout failed, retrying");
                    thread::sleep(self.retry_backoff * attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Per-connection setup: busy timeout, SQL functions and schema.
fn initialize(conn: &mut rusqlite::Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    register_functions(conn)?;
    conn.execute_batch(SCHEMA)
}

/// `casefold(text)`: Unicode lowercase, used for case-insensitive search.
/// SQLite's own `LIKE` and `NOCASE` fold ASCII letters only.
fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"patients".to_string()));
    }

    #[test]
    fn test_casefold_function() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.conn().unwrap();

        let folded: String = conn
            .query_row("SELECT casefold('ÉLODIE Özgür')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "élodie özgür");

        let null: Option<String> = conn
            .query_row("SELECT casefold(NULL)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(null, None);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("patients.db")).with_pool_size(2);

        let db = Database::open(&config).unwrap();
        let first = db.conn().unwrap();
        let second = db.conn().unwrap();
        drop(first);
        drop(second);

        assert!(config.database_path().exists());
    }

    #[test]
    fn test_checkout_times_out_when_pool_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("patients.db"))
            .with_pool_size(1)
            .with_acquire_timeout(Duration::from_millis(50))
            .with_acquire_retries(1);

        let db = Database::open(&config).unwrap();
        let _held = db.conn().unwrap();

        match db.conn() {
            Err(err) => {
                assert!(matches!(err, DbError::Pool(_)));
                assert_eq!(err.kind(), ErrorKind::Storage);
            }
            Ok(_) => panic!("checkout should time out while the only connection is held"),
        }
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            DbError::from(ValidationError::MissingField("uhid")).kind(),
            ErrorKind::Validation
        );
        assert_eq!(DbError::NotFound("UH-1".into()).kind(), ErrorKind::NotFound);
        assert_eq!(DbError::Constraint("dup".into()).kind(), ErrorKind::Storage);
    }
}
