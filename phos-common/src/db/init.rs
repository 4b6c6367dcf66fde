//! Database initialization
//!
//! Creates the digit store on first use. Table creation is idempotent so the
//! same database can receive several digitization outputs.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the digit database at `db_path`
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL keeps readers of earlier outputs unblocked while a run writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory digit database
///
/// Limited to one connection: every SQLite in-memory connection is its own
/// database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all digit store tables
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_digitizations_table(pool).await?;
    create_digits_table(pool).await?;
    Ok(())
}

/// One row per digitization output; `name` is the idempotency key
async fn create_digitizations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS digitizations (
            name TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            parameters TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_digits_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS digits (
            digitization TEXT NOT NULL REFERENCES digitizations(name) ON DELETE CASCADE,
            event INTEGER NOT NULL,
            list_index INTEGER NOT NULL,
            channel INTEGER NOT NULL,
            amplitude REAL NOT NULL,
            time REAL NOT NULL,
            provenance TEXT NOT NULL,
            PRIMARY KEY (digitization, event, list_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_digits_channel ON digits(digitization, event, channel)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
