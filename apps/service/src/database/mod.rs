/// Persistence layer
///
/// Append-only histories (checks, alerts, errors) and the service roster
/// behind a trait, with a pooled LibSQL implementation.
pub mod migrations;
pub mod models;
pub mod repository;
pub mod sink;

pub use repository::{Database, LibsqlRepository};
pub use sink::ErrorSink;

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
