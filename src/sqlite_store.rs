//! SQLite-backed [`RecordStore`] implementation.
//!
//! Each record's cells live in one JSON object column (`fields_json`), so a
//! collection can carry any header set. Equality predicates become
//! `json_extract` comparisons; the bound value is typed the same way cells
//! are typed at import, so `1234567890` compares as a number and
//! `2025-06-24` as text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeMap;

use crate::models::{Collection, FieldValue, Operator, Predicate, Record};
use crate::store::RecordStore;

/// SQLite implementation of the [`RecordStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// JSON path addressing one header, e.g. `$."Work Date"`.
fn json_path(header: &str) -> String {
    format!("$.\"{}\"", header.replace('"', ""))
}

fn collection_from_row(row: &SqliteRow) -> Result<Collection> {
    let headers_json: String = row.get("headers_json");
    let headers: Vec<String> =
        serde_json::from_str(&headers_json).context("corrupt collection headers")?;
    Ok(Collection {
        id: row.get("id"),
        source_file: row.get("source_file"),
        headers,
        created_at: row.get("created_at"),
        record_count: row.get("record_count"),
        content_hash: row.get("content_hash"),
    })
}

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    let fields_json: String = row.get("fields_json");
    let fields: BTreeMap<String, FieldValue> =
        serde_json::from_str(&fields_json).context("corrupt record fields")?;
    Ok(Record {
        id: row.get("id"),
        collection_id: row.get("collection_id"),
        source_file: row.get("source_file"),
        ingested_at: row.get("ingested_at"),
        row_index: row.get("row_index"),
        fields,
    })
}

const COLLECTION_COLUMNS: &str =
    "SELECT id, source_file, headers_json, created_at, record_count, content_hash FROM collections";

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert_collection(&self, collection: &Collection, records: &[Record]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO collections (id, source_file, headers_json, created_at, record_count, content_hash)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&collection.id)
        .bind(&collection.source_file)
        .bind(serde_json::to_string(&collection.headers)?)
        .bind(collection.created_at)
        .bind(collection.record_count)
        .bind(&collection.content_hash)
        .execute(&mut *tx)
        .await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO records (id, collection_id, source_file, ingested_at, row_index, fields_json)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&record.collection_id)
            .bind(&record.source_file)
            .bind(record.ingested_at)
            .bind(record.row_index)
            .bind(serde_json::to_string(&record.fields)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_collection(&self, id: &str) -> Result<Option<Collection>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", COLLECTION_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(collection_from_row).transpose()
    }

    async fn latest_collection(&self) -> Result<Option<Collection>> {
        let row = sqlx::query(&format!(
            "{} ORDER BY created_at DESC, rowid DESC LIMIT 1",
            COLLECTION_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(collection_from_row).transpose()
    }

    async fn find_collection_by_hash(&self, content_hash: &str) -> Result<Option<Collection>> {
        let row = sqlx::query(&format!(
            "{} WHERE content_hash = ? ORDER BY created_at DESC LIMIT 1",
            COLLECTION_COLUMNS
        ))
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(collection_from_row).transpose()
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY created_at DESC, rowid DESC",
            COLLECTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(collection_from_row).collect()
    }

    async fn fetch_records(&self, collection_id: &str, filters: &[Predicate]) -> Result<Vec<Record>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, collection_id, source_file, ingested_at, row_index, fields_json \
             FROM records WHERE collection_id = ",
        );
        qb.push_bind(collection_id.to_string());

        for predicate in filters.iter().filter(|p| p.operator == Operator::Equals) {
            if predicate.fields.is_empty() {
                qb.push(" AND 0");
                continue;
            }
            qb.push(" AND (");
            for (i, field) in predicate.fields.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("json_extract(fields_json, ");
                qb.push_bind(json_path(field));
                qb.push(") = ");
                match FieldValue::from_raw(&predicate.value) {
                    FieldValue::Number(n) => qb.push_bind(n),
                    FieldValue::Text(s) => qb.push_bind(s),
                };
            }
            qb.push(")");
        }
        qb.push(" ORDER BY row_index ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }
}
