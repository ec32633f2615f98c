//! Database layer for the Closeloop platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and CRUD helpers for the campaign, lead, and
//! call-log tables.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: the dashboard is a single-server deployment;
//!   WAL allows concurrent readers with a single writer, which matches the
//!   read-heavy dashboard access pattern.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so migrations ship with the server and cannot drift
//!   from the code that depends on them.
//!
//! Call sessions and live transcripts are deliberately NOT stored here —
//! they are ephemeral relay state owned by `closeloop-registry`.

mod call_logs;
mod campaigns;
mod leads;
mod migrations;
mod pool;

pub use call_logs::{
    get_call_log, insert_call_log, list_call_logs, set_call_recording, update_call_status,
};
pub use campaigns::{create_campaign, get_campaign, list_campaigns, update_campaign_status};
pub use leads::{create_lead, get_lead, list_leads, update_lead_score, update_lead_status};
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("not found: {0}")]
    NotFound(String),
}
