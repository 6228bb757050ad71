pub mod migrations;
pub mod queries;
pub mod store;

use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;

use crate::models::BookingStatus;

pub use store::SqliteStore;

/// Failures surfaced by the persistence layer, with the constraint that
/// tripped kept distinct from plain driver errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("booking overlaps an existing reservation")]
    Overlap,

    #[error("foreign key constraint failed")]
    ForeignKey,

    #[error("unique constraint failed")]
    Duplicate,

    #[error("record not found")]
    NotFound,

    #[error("status changed concurrently (now {actual})")]
    StatusChanged { actual: BookingStatus },

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database connection lock poisoned")]
    LockPoisoned,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;
    conn.busy_timeout(Duration::from_secs(5))
        .context("failed to set busy timeout")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}
