//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and creates the package
//! and rights statement tables. Table creation is idempotent, so every task
//! can call [`init_database`] on startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Open the database at `db_path` and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Web requests and cron tasks may hit the same file
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_tables(&pool).await?;
    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_packages_table(pool).await?;
    create_rights_statements_table(pool).await?;
    Ok(())
}

/// Create the packages table
///
/// `refid` is deliberately not unique: re-submitted packages produce new
/// rows. The one-PENDING-per-refid rule is a discovery-time policy check.
pub async fn create_packages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS packages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            refid TEXT NOT NULL,
            title TEXT NOT NULL,
            object_uri TEXT NOT NULL,
            resource_title TEXT NOT NULL,
            resource_uri TEXT NOT NULL,
            package_type TEXT NOT NULL,
            duration_access REAL NOT NULL,
            duration_master REAL NOT NULL,
            multiple_masters INTEGER NOT NULL,
            undated_object INTEGER NOT NULL DEFAULT 0,
            possible_duplicate INTEGER NOT NULL DEFAULT 0,
            process_status TEXT NOT NULL,
            rights_ids TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (package_type IN ('AUDIO', 'VIDEO')),
            CHECK (process_status IN ('PENDING', 'APPROVED', 'REJECTED')),
            CHECK (duration_access >= 0 AND duration_master >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_packages_refid_status ON packages(refid, process_status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the rights_statements table
pub async fn create_rights_statements_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rights_statements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            last_modified TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
