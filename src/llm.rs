//! Text model bridge for open-ended questions.
//!
//! Defines the [`TextModel`] trait and its implementations:
//! - **[`DisabledModel`]**: always fails; used when `llm.provider = "disabled"`.
//! - **[`OpenAiModel`]**: `POST /v1/chat/completions` on the OpenAI API.
//! - **[`OllamaModel`]**: `POST /api/generate` on a local Ollama instance.
//!
//! A model is stateless and single-shot: one prompt in, one text out. Calls
//! are never retried; an error surfaces to the caller on the first failure.
//!
//! [`build_prompt`] serializes the whole dataset into one prompt, one line
//! per record:
//!
//! ```text
//! #1 | Identifier: 1234567890 | Location: 100 MAIN STREET | Action: REPLACE BELT
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::models::Record;

/// Sentence the model must return when an exact-match question has no
/// literal match in the data.
pub const NO_INFORMATION: &str = "I don't have information about that.";

const OPENAI_URL: &str = "https://api.openai.com/v1";
const OLLAMA_URL: &str = "http://localhost:11434";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

#[async_trait]
pub trait TextModel: Send + Sync {
    /// Model identifier, e.g. `"gpt-4o-mini"`.
    fn name(&self) -> &str;

    /// Whether calls can succeed at all.
    fn enabled(&self) -> bool {
        true
    }

    async fn complete(&self, prompt: &str) -> Result<String>;
}

// ============ Disabled Model ============

pub struct DisabledModel;

#[async_trait]
impl TextModel for DisabledModel {
    fn name(&self) -> &str {
        "disabled"
    }

    fn enabled(&self) -> bool {
        false
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("text model is disabled")
    }
}

// ============ OpenAI Model ============

/// Chat completions against the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiModel {
    model: String,
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            url: config.url.clone().unwrap_or_else(|| OPENAI_URL.to_string()),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl TextModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_openai_response(&json)
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))
}

// ============ Ollama Model ============

/// Completions from a local Ollama instance (`ollama pull <model>` first).
pub struct OllamaModel {
    model: String,
    url: String,
    client: reqwest::Client,
}

impl OllamaModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for Ollama provider"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model,
            url: config.url.clone().unwrap_or_else(|| OLLAMA_URL.to_string()),
            client,
        })
    }
}

#[async_trait]
impl TextModel for OllamaModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url.trim_end_matches('/')))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
}

/// Instantiate the model named by `llm.provider`.
pub fn create_model(config: &LlmConfig) -> Result<Box<dyn TextModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledModel)),
        "openai" => Ok(Box::new(OpenAiModel::new(config)?)),
        "ollama" => Ok(Box::new(OllamaModel::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

// ============ Prompt ============

/// Render one record as a single line, fields in header order.
pub fn record_line(n: usize, headers: &[String], record: &Record) -> String {
    let mut line = format!("#{}", n);
    for header in headers {
        if let Some(value) = record.text(header) {
            line.push_str(&format!(" | {}: {}", header, value));
        }
    }
    line
}

/// Build the single-shot prompt carrying the question and every record.
pub fn build_prompt(question: &str, headers: &[String], records: &[Record]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You answer questions about maintenance records. The complete dataset is listed below, one record per line.\n\n",
    );
    prompt.push_str("Rules:\n");
    prompt.push_str(&format!(
        "1. If the question asks for a specific record, value, identifier, location or date, answer only from records that literally match it. If none do, reply exactly: \"{}\"\n",
        NO_INFORMATION
    ));
    prompt.push_str(
        "2. If the question is analytical (counts, most or least common, groupings, comparisons, trends), reason over all records and state the numbers you used.\n\n",
    );
    prompt.push_str(&format!(
        "Columns: {}\nRecords ({}):\n",
        headers.join(", "),
        records.len()
    ));
    for (i, record) in records.iter().enumerate() {
        prompt.push_str(&record_line(i + 1, headers, record));
        prompt.push('\n');
    }
    prompt.push_str(&format!("\nQuestion: {}\nAnswer:", question.trim()));
    prompt
}
