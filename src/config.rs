use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

/// When the engine may hand a question to the text model.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Only when the rule-based pipeline has little to go on.
    #[default]
    LowConfidence,
    Never,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default)]
    pub fallback: FallbackPolicy,
    /// Records sampled when detecting the numeric column.
    #[serde(default = "default_numeric_sample")]
    pub numeric_sample: usize,
    /// Distinct values listed in a summary before "and N more".
    #[serde(default = "default_summary_values")]
    pub summary_values: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::default(),
            numeric_sample: default_numeric_sample(),
            summary_values: default_summary_values(),
        }
    }
}

fn default_numeric_sample() -> usize {
    10
}
fn default_summary_values() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate query
    if config.query.numeric_sample == 0 {
        anyhow::bail!("query.numeric_sample must be > 0");
    }
    if config.query.summary_values == 0 {
        anyhow::bail!("query.summary_values must be > 0");
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if config.llm.provider == "ollama" && config.llm.model.is_none() {
        anyhow::bail!("llm.model must be specified when provider is 'ollama'");
    }
    if config.llm.is_enabled() && config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write_config("[db]\npath = \"./data/rq.sqlite\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.llm.provider, "disabled");
        assert_eq!(config.query.fallback, FallbackPolicy::LowConfidence);
        assert_eq!(config.query.numeric_sample, 10);
        assert_eq!(config.query.summary_values, 3);
        assert_eq!(config.server.bind, "127.0.0.1:7341");
    }

    #[test]
    fn test_full_config() {
        let file = write_config(
            r#"
[db]
path = "/tmp/rq.sqlite"

[llm]
provider = "ollama"
model = "llama3"
url = "http://gpu-box:11434"
timeout_secs = 120

[query]
fallback = "never"
summary_values = 5

[server]
bind = "0.0.0.0:8080"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.llm.model.as_deref(), Some("llama3"));
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.query.fallback, FallbackPolicy::Never);
        assert_eq!(config.query.summary_values, 5);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let file = write_config("[db]\npath = \"x\"\n[llm]\nprovider = \"magic\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown llm provider"));
    }

    #[test]
    fn test_rejects_ollama_without_model() {
        let file = write_config("[db]\npath = \"x\"\n[llm]\nprovider = \"ollama\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rejects_zero_sample() {
        let file = write_config("[db]\npath = \"x\"\n[query]\nnumeric_sample = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_example_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/rq.example.toml");
        let config = load_config(&path).unwrap();
        assert!(!config.llm.is_enabled());
        assert_eq!(config.query.fallback, FallbackPolicy::LowConfidence);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/rq.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
