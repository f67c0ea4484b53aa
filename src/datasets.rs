//! `rq datasets`: list imported collections.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::models::Collection;
use crate::sqlite_store::SqliteStore;
use crate::store::RecordStore;

pub async fn run_datasets(config: &Config) -> Result<()> {
    let pool = db::open(config).await?;
    let store = SqliteStore::new(pool.clone());
    let collections = store.list_collections().await?;

    if collections.is_empty() {
        println!("No datasets imported yet. Run `rq ingest <file.csv>` first.");
    } else {
        println!("{:<38} {:>8}  {:<20} SOURCE", "ID", "RECORDS", "IMPORTED");
        for (i, c) in collections.iter().enumerate() {
            println!("{}", describe(c, i == 0));
        }
    }

    pool.close().await;
    Ok(())
}

/// One table row; the newest collection is the default answer target.
fn describe(c: &Collection, newest: bool) -> String {
    let imported = chrono::DateTime::from_timestamp(c.created_at, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| c.created_at.to_string());
    format!(
        "{:<38} {:>8}  {:<20} {}{}",
        c.id,
        c.record_count,
        imported,
        c.source_file,
        if newest { "  (default)" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_marks_default() {
        let c = Collection {
            id: "abc".to_string(),
            source_file: "orders.csv".to_string(),
            headers: vec![],
            created_at: 0,
            record_count: 12,
            content_hash: "h".to_string(),
        };
        let line = describe(&c, true);
        assert!(line.starts_with("abc"));
        assert!(line.contains("1970-01-01 00:00:00"));
        assert!(line.ends_with("orders.csv  (default)"));
        assert!(!describe(&c, false).contains("(default)"));
    }
}
