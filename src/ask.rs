//! `rq ask`: answer one question from the command line.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::db;
use crate::engine::QueryEngine;
use crate::llm::create_model;
use crate::models::AnswerSource;
use crate::sqlite_store::SqliteStore;
use crate::store::RecordStore;

/// Print the answer (or the full result as JSON). Returns whether the
/// engine considered the question answered.
pub async fn run_ask(
    config: &Config,
    question: &str,
    dataset: Option<&str>,
    json: bool,
) -> Result<bool> {
    let pool = db::open(config).await?;
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::new(pool.clone()));
    let model = create_model(&config.llm)?;
    let mut engine = QueryEngine::new(store, Arc::from(model), config.query.clone());

    if let Some(id) = dataset {
        engine.use_dataset(id).await?;
    }

    let result = engine.submit(question).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.answer);
        if result.answered_by == AnswerSource::Model {
            println!();
            println!("(answered by {})", config.llm.provider);
        }
    }

    pool.close().await;
    Ok(result.success)
}
