use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub pinecone: PineconeConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_embed_dims")]
    pub embed_dims: usize,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            embed_model: default_embed_model(),
            embed_dims: default_embed_dims(),
            chat_model: default_chat_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_embed_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_embed_dims() -> usize {
    1536
}
fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_output_tokens() -> u32 {
    500
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct PineconeConfig {
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_cloud")]
    pub cloud: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Seconds between index-readiness polls after create.
    #[serde(default = "default_ready_poll_secs")]
    pub ready_poll_secs: u64,
    /// Maximum readiness polls before giving up with a timeout error.
    #[serde(default = "default_ready_max_polls")]
    pub ready_max_polls: u32,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            index: default_index(),
            cloud: default_cloud(),
            region: default_region(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            ready_poll_secs: default_ready_poll_secs(),
            ready_max_polls: default_ready_max_polls(),
        }
    }
}

fn default_index() -> String {
    "my-chatbot-data".to_string()
}
fn default_cloud() -> String {
    "aws".to_string()
}
fn default_region() -> String {
    "us-west-2".to_string()
}
fn default_ready_poll_secs() -> u64 {
    1
}
fn default_ready_max_polls() -> u32 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Number of chunk texts per embedding API call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    64
}

/// Load and validate configuration. A missing file yields the defaults so
/// the CLI works out of the box with just the API key environment variables.
pub fn load_config(path: &Path) -> Result<Config> {
    let config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.openai.embed_dims == 0 {
        anyhow::bail!("openai.embed_dims must be > 0");
    }
    if config.openai.embed_model.is_empty() {
        anyhow::bail!("openai.embed_model must not be empty");
    }
    if config.openai.chat_model.is_empty() {
        anyhow::bail!("openai.chat_model must not be empty");
    }
    if !(0.0..=2.0).contains(&config.openai.temperature) {
        anyhow::bail!("openai.temperature must be in [0.0, 2.0]");
    }
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.ingest.batch_size < 1 {
        anyhow::bail!("ingest.batch_size must be >= 1");
    }
    if config.pinecone.index.is_empty() {
        anyhow::bail!("pinecone.index must not be empty");
    }
    if config.pinecone.ready_max_polls < 1 {
        anyhow::bail!("pinecone.ready_max_polls must be >= 1");
    }
    Ok(())
}

/// Read a required API key from the environment before any network call.
pub fn require_env_key(var: &str) -> Result<String> {
    std::env::var(var).map_err(|_| anyhow::anyhow!("{} environment variable not set", var))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.openai.embed_model, "text-embedding-ada-002");
        assert_eq!(config.openai.embed_dims, 1536);
        assert_eq!(config.openai.temperature, 0.7);
        assert_eq!(config.openai.max_output_tokens, 500);
        assert_eq!(config.pinecone.index, "my-chatbot-data");
        assert_eq!(config.retrieval.top_k, 3);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/ragline.toml")).unwrap();
        assert_eq!(config.pinecone.index, "my-chatbot-data");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragline.toml");
        std::fs::write(
            &path,
            r#"
[pinecone]
index = "notes"

[retrieval]
top_k = 5
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.pinecone.index, "notes");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.openai.embed_dims, 1536);
    }

    #[test]
    fn test_rejects_zero_dims() {
        let mut config = Config::default();
        config.openai.embed_dims = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_top_k() {
        let mut config = Config::default();
        config.retrieval.top_k = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_poll_bound() {
        let mut config = Config::default();
        config.pinecone.ready_max_polls = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let mut config = Config::default();
        config.openai.temperature = 3.0;
        assert!(validate(&config).is_err());
    }
}
