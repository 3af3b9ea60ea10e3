//! Persistent store module
//!
//! This module provides the durable local store:
//! - Schema and migrations
//! - Model definitions for the five collections
//! - The `Store` document layer and typed collection helpers

pub mod models;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::{Collection, Store};
pub use schema::initialize_schema;

use crate::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Create and initialize a database connection pool.
///
/// A connect failure means the host has no usable persistence backend and
/// surfaces as `StoreUnavailable`.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Creating store connection pool at: {:?}", db_path);

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options =
        SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

    tracing::info!("Store pool created successfully");

    Ok(pool)
}

/// In-memory pool for tests and throwaway sessions.
///
/// Capped at one connection: every pooled connection to `:memory:` would
/// otherwise get its own private database.
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

    Ok(pool)
}
