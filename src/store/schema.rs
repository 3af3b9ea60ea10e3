//! Store schema and migrations
//!
//! Five collections, each a table of JSON documents. Secondary indexes are
//! expression indexes over `json_extract`, standing in for the original
//! object-store indexes. Uses WAL mode for crash safety.

use crate::config::SCHEMA_VERSION;
use crate::error::{AppError, Result};
use sqlx::{sqlite::SqlitePool, Row};

/// Initialize the store schema. Idempotent across repeated calls.
///
/// Fails with `VersionConflict` when the database on disk was created by a
/// newer build of this crate.
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Initializing store schema");

    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version: i32 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?
        .get(0);

    if current_version > SCHEMA_VERSION {
        return Err(AppError::VersionConflict(format!(
            "store is at schema version {current_version}, this build supports {SCHEMA_VERSION}"
        )));
    }

    tracing::info!("Current schema version: {}", current_version);

    apply_migrations(pool, current_version).await?;

    tracing::info!("Store initialization complete");
    Ok(())
}

async fn apply_migrations(pool: &SqlitePool, current_version: i32) -> Result<()> {
    for (version, sql) in get_migrations() {
        if version > current_version {
            tracing::info!("Applying migration version {}", version);

            let mut tx = pool.begin().await?;

            for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
                sqlx::query(statement).execute(&mut *tx).await?;
            }

            sqlx::query("INSERT INTO migrations (version) VALUES (?)")
                .bind(version)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::info!("Migration version {} applied successfully", version);
        }
    }

    Ok(())
}

fn get_migrations() -> Vec<(i32, &'static str)> {
    vec![(
        1,
        r#"
        CREATE TABLE IF NOT EXISTS branding (
            key TEXT PRIMARY KEY,
            document TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_templates_created_at
            ON templates (json_extract(document, '$.createdAt'));

        CREATE TABLE IF NOT EXISTS responses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_responses_template_id
            ON responses (json_extract(document, '$.templateId'));

        CREATE TABLE IF NOT EXISTS analytics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_analytics_event_type
            ON analytics (json_extract(document, '$.eventType'));

        CREATE TABLE IF NOT EXISTS backup_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document TEXT NOT NULL
        )
        "#,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::create_memory_pool;

    #[tokio::test]
    async fn test_initialize_schema() {
        let pool = create_memory_pool().await.unwrap();

        initialize_schema(&pool).await.unwrap();

        let applied: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let pool = create_memory_pool().await.unwrap();

        initialize_schema(&pool).await.unwrap();
        initialize_schema(&pool).await.unwrap();

        let applied: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(applied, 1);
    }

    #[tokio::test]
    async fn test_newer_schema_version_is_rejected() {
        let pool = create_memory_pool().await.unwrap();

        initialize_schema(&pool).await.unwrap();

        sqlx::query("INSERT INTO migrations (version) VALUES (?)")
            .bind(SCHEMA_VERSION + 1)
            .execute(&pool)
            .await
            .unwrap();

        let result = initialize_schema(&pool).await;
        assert!(matches!(result, Err(AppError::VersionConflict(_))));
    }
}
