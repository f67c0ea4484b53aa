use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the schema on an open pool. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Create collections table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            id TEXT PRIMARY KEY,
            source_file TEXT NOT NULL,
            headers_json TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            record_count INTEGER NOT NULL,
            content_hash TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create records table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id TEXT PRIMARY KEY,
            collection_id TEXT NOT NULL,
            source_file TEXT NOT NULL,
            ingested_at INTEGER NOT NULL,
            row_index INTEGER NOT NULL,
            fields_json TEXT NOT NULL,
            UNIQUE(collection_id, row_index),
            FOREIGN KEY (collection_id) REFERENCES collections(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_collection_id ON records(collection_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_collections_created_at ON collections(created_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_collections_hash ON collections(content_hash)")
        .execute(pool)
        .await?;

    Ok(())
}
