//! Persistence for clients, social tokens and scheduled posts.
//!
//! Every store is a trait so the server can run against SQLite in production
//! and [`InMemoryRepository`] in tests.

mod memory;
pub mod repository;
mod sqlite;

pub use memory::InMemoryRepository;
pub use repository::{ClientRepository, PostRepository, TokenRepository};
pub use sqlite::SqliteRepository;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const MIGRATIONS: &[&str] = &[include_str!("../../migrations/sqlite/001_initial_schema.sql")];

/// Open (creating if needed) a SQLite database and apply migrations.
pub async fn connect_sqlite(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    run_migrations(&pool).await?;
    tracing::info!(url = %url, "Database ready");
    Ok(pool)
}

/// In-memory database on a single connection, so every query sees the same data.
pub async fn connect_sqlite_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    for migration_sql in MIGRATIONS {
        for statement in migration_sql.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed).execute(pool).await?;
            }
        }
    }
    Ok(())
}
