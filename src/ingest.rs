//! CSV ingestion.
//!
//! Reads a spreadsheet export into a new collection: one [`Record`] per
//! data row, cells typed with [`FieldValue::from_raw`], headers kept in
//! source order. Re-importing a byte-identical file is skipped unless
//! forced; the content hash (SHA-256 of the file bytes) identifies it.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::models::{Collection, FieldValue, Record};
use crate::sqlite_store::SqliteStore;
use crate::store::RecordStore;

/// A parsed table: headers plus raw cell strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub collection: Collection,
    /// The file was already imported; `collection` is the earlier import.
    pub skipped: bool,
}

/// Parse CSV bytes. Blank headers become `Column N`; repeated headers get a
/// ` (2)`, ` (3)`… suffix so every cell stays addressable.
pub fn parse_csv(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let raw_headers = reader.headers().context("failed to read CSV header row")?.clone();
    let mut headers: Vec<String> = Vec::with_capacity(raw_headers.len());
    for (i, h) in raw_headers.iter().enumerate() {
        let base = if h.is_empty() {
            format!("Column {}", i + 1)
        } else {
            h.to_string()
        };
        let mut name = base.clone();
        let mut n = 2;
        while headers.contains(&name) {
            name = format!("{} ({})", base, n);
            n += 1;
        }
        headers.push(name);
    }
    if headers.is_empty() {
        bail!("CSV has no header row");
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result.context("failed to read CSV row")?;
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(row.iter().map(String::from).collect());
    }

    Ok(Table { headers, rows })
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Turn a table into a collection and its records. Cells beyond the header
/// count are dropped; missing trailing cells are left out of the record.
pub fn build_collection(
    source_file: &str,
    table: &Table,
    content_hash: &str,
    now: i64,
) -> (Collection, Vec<Record>) {
    let collection_id = Uuid::new_v4().to_string();
    let records: Vec<Record> = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let fields: BTreeMap<String, FieldValue> = table
                .headers
                .iter()
                .zip(row.iter())
                .map(|(h, cell)| (h.clone(), FieldValue::from_raw(cell)))
                .collect();
            Record {
                id: Uuid::new_v4().to_string(),
                collection_id: collection_id.clone(),
                source_file: source_file.to_string(),
                ingested_at: now,
                row_index: i as i64,
                fields,
            }
        })
        .collect();

    let collection = Collection {
        id: collection_id,
        source_file: source_file.to_string(),
        headers: table.headers.clone(),
        created_at: now,
        record_count: records.len() as i64,
        content_hash: content_hash.to_string(),
    };
    (collection, records)
}

/// Store a parsed table as a new collection.
pub async fn import_table(
    store: &dyn RecordStore,
    source_file: &str,
    table: &Table,
    content_hash: &str,
) -> Result<Collection> {
    let now = chrono::Utc::now().timestamp();
    let (collection, records) = build_collection(source_file, table, content_hash, now);
    store.insert_collection(&collection, &records).await?;
    info!(
        collection_id = %collection.id,
        source_file,
        records = records.len(),
        "imported collection"
    );
    Ok(collection)
}

/// Import a CSV file. `name` overrides the recorded source file name.
pub async fn ingest_csv(
    store: &dyn RecordStore,
    path: &Path,
    name: Option<&str>,
    force: bool,
) -> Result<IngestOutcome> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;
    let hash = content_hash(&bytes);

    if !force {
        if let Some(existing) = store.find_collection_by_hash(&hash).await? {
            debug!(collection_id = %existing.id, "file already imported");
            return Ok(IngestOutcome {
                collection: existing,
                skipped: true,
            });
        }
    }

    let table = parse_csv(&bytes)?;
    let source_file = match name {
        Some(n) => n.to_string(),
        None => path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    };

    let collection = import_table(store, &source_file, &table, &hash).await?;
    Ok(IngestOutcome {
        collection,
        skipped: false,
    })
}

pub async fn run_ingest(config: &Config, path: &Path, name: Option<&str>, force: bool) -> Result<()> {
    let pool = db::open(config).await?;
    let store = SqliteStore::new(pool.clone());

    let outcome = ingest_csv(&store, path, name, force).await?;
    let c = &outcome.collection;

    println!("ingest {}", path.display());
    if outcome.skipped {
        println!("  already imported as: {}", c.id);
        println!("  (use --force to import again)");
    } else {
        println!("  collection: {}", c.id);
        println!("  headers: {}", c.headers.join(", "));
        println!("  records: {}", c.record_count);
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use std::io::Write;

    const CSV: &str = "Identifier,Location,Action,Description,Date\n\
        1234567890,100 MAIN STREET,REPLACE BELT,worn belt,2025-06-24\n\
        0012,5 OAK AVENUE,CLEAN,,2025-06-25\n";

    #[test]
    fn test_parse_csv_types_cells() {
        let table = parse_csv(CSV.as_bytes()).unwrap();
        assert_eq!(table.headers.len(), 5);
        assert_eq!(table.rows.len(), 2);
        let (collection, records) = build_collection("orders.csv", &table, "h", 7);
        assert_eq!(collection.record_count, 2);
        assert_eq!(collection.headers[1], "Location");
        assert_eq!(
            records[0].get("Identifier"),
            Some(&FieldValue::Number(1234567890.0))
        );
        assert_eq!(
            records[1].get("Identifier"),
            Some(&FieldValue::Text("0012".to_string()))
        );
        assert_eq!(records[1].row_index, 1);
        assert!(records.iter().all(|r| r.collection_id == collection.id));
    }

    #[test]
    fn test_blank_and_duplicate_headers() {
        let table = parse_csv(b"Location,,Location\na,b,c\n").unwrap();
        assert_eq!(
            table.headers,
            vec!["Location".to_string(), "Column 2".to_string(), "Location (2)".to_string()]
        );
    }

    #[test]
    fn test_ragged_and_blank_rows() {
        let table = parse_csv(b"A,B\n1\n,\n2,3,4\n").unwrap();
        assert_eq!(table.rows.len(), 2);
        let (_, records) = build_collection("x.csv", &table, "h", 0);
        assert_eq!(records[0].fields.len(), 1);
        assert_eq!(records[1].fields.len(), 2);
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
        assert_eq!(content_hash(b"").len(), 64);
    }

    #[tokio::test]
    async fn test_reimport_is_skipped_unless_forced() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        let store = InMemoryStore::new();

        let first = ingest_csv(&store, file.path(), Some("orders.csv"), false)
            .await
            .unwrap();
        assert!(!first.skipped);
        assert_eq!(first.collection.source_file, "orders.csv");

        let second = ingest_csv(&store, file.path(), None, false).await.unwrap();
        assert!(second.skipped);
        assert_eq!(second.collection.id, first.collection.id);

        let forced = ingest_csv(&store, file.path(), None, true).await.unwrap();
        assert!(!forced.skipped);
        assert_ne!(forced.collection.id, first.collection.id);
        assert_eq!(store.list_collections().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let store = InMemoryStore::new();
        let err = ingest_csv(&store, Path::new("/nonexistent/x.csv"), None, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read CSV file"));
    }
}
