//! SQLite connection pooling.
//!
//! One file-backed database serves the whole deployment. Connections are
//! opened through an `r2d2` pool and every connection runs the same init
//! sequence: WAL journaling (checked, not assumed), foreign keys, and a
//! busy timeout so concurrent webhook writers wait on a locked database
//! instead of failing.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// A pooled SQLite connection handle.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Tunables applied to every pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database before giving up,
    /// in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on open connections. The write side is webhook-driven
    /// and bursty; the read side is a handful of dashboard queries.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 4,
        }
    }
}

/// Errors from pool construction.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to build connection pool: {0}")]
    Build(#[from] r2d2::Error),
}

/// Opens (or creates) the database at `db_path` and builds the pool.
///
/// `:memory:` is accepted for tests; note that each pooled connection then
/// gets its own private database, so tests wanting shared state cap the
/// pool at one connection.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| init_connection(conn, settings.busy_timeout_ms));

    Ok(Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?)
}

/// Per-connection initialization.
///
/// WAL lets dashboard reads proceed while a webhook write is in flight.
/// SQLite reports the journal mode it actually selected, so the answer is
/// verified rather than assumed; in-memory databases legitimately answer
/// `memory`.
fn init_connection(
    conn: &mut rusqlite::Connection,
    busy_timeout_ms: u64,
) -> Result<(), rusqlite::Error> {
    let mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if mode != "wal" && mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!(
                "journal_mode WAL not accepted, database reports '{mode}'"
            )),
        ));
    }
    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {busy_timeout_ms};"
    ))
}
