//! Vector index gateway.
//!
//! Defines the [`VectorIndex`] trait and the [`PineconeIndex`] implementation
//! over the Pinecone REST API: control plane (`api.pinecone.io`) for
//! describe/create and index readiness, data plane (the per-index host from
//! describe) for upsert and query.
//!
//! Readiness after create is polled at a fixed interval with a hard bound —
//! exhaustion is an explicit timeout error, never an unbounded wait.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::{require_env_key, PineconeConfig};
use crate::http::{expect_json, send_with_retry};
use crate::models::{QueryMatch, VectorRecord};

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// Stores vectors with metadata and answers nearest-neighbor queries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Make sure the named index exists and is ready, creating it with the
    /// given dimensionality and cosine metric when absent.
    async fn ensure_ready(&self, name: &str, dims: usize) -> Result<()>;

    /// Upsert a batch of records, returning the count the service accepted.
    async fn upsert(&self, name: &str, records: &[VectorRecord]) -> Result<usize>;

    /// Query the `top_k` nearest neighbors with metadata included.
    /// An absent index yields an empty match list, not an error.
    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>>;
}

/// Pinecone serverless index client.
///
/// Requires the `PINECONE_API_KEY` environment variable.
pub struct PineconeIndex {
    api_key: String,
    cloud: String,
    region: String,
    max_retries: u32,
    ready_poll_secs: u64,
    ready_max_polls: u32,
    client: reqwest::Client,
}

/// Control-plane view of one index: readiness flag plus data-plane host.
#[derive(Debug, Clone)]
struct IndexStatus {
    ready: bool,
    host: String,
}

impl PineconeIndex {
    /// Create a new index client from configuration.
    ///
    /// Fails before any network call if `PINECONE_API_KEY` is missing.
    pub fn new(config: &PineconeConfig) -> Result<Self> {
        let api_key = require_env_key("PINECONE_API_KEY")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key,
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            max_retries: config.max_retries,
            ready_poll_secs: config.ready_poll_secs,
            ready_max_polls: config.ready_max_polls,
            client,
        })
    }

    /// Describe an index. `Ok(None)` means the index does not exist.
    async fn describe(&self, name: &str) -> Result<Option<IndexStatus>> {
        let url = format!("{}/indexes/{}", CONTROL_PLANE_URL, name);
        let response = send_with_retry(
            || {
                self.client
                    .get(&url)
                    .header("Api-Key", self.api_key.clone())
            },
            self.max_retries,
        )
        .await?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        let json = expect_json(response).await?;
        Ok(Some(parse_index_status(&json)?))
    }

    async fn create(&self, name: &str, dims: usize) -> Result<()> {
        let body = serde_json::json!({
            "name": name,
            "dimension": dims,
            "metric": "cosine",
            "spec": {
                "serverless": { "cloud": self.cloud, "region": self.region }
            }
        });

        let url = format!("{}/indexes", CONTROL_PLANE_URL);
        let response = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .header("Api-Key", self.api_key.clone())
                    .header("Content-Type", "application/json")
                    .json(&body)
            },
            self.max_retries,
        )
        .await?;

        expect_json(response).await?;
        Ok(())
    }

    /// Resolve the data-plane host for an index, or `None` when absent.
    async fn host(&self, name: &str) -> Result<Option<String>> {
        Ok(self.describe(name).await?.map(|status| status.host))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn ensure_ready(&self, name: &str, dims: usize) -> Result<()> {
        match self.describe(name).await? {
            Some(status) if status.ready => return Ok(()),
            Some(_) => {}
            None => self.create(name, dims).await?,
        }

        // Fixed-interval readiness poll, bounded by ready_max_polls.
        for _ in 0..self.ready_max_polls {
            tokio::time::sleep(Duration::from_secs(self.ready_poll_secs)).await;
            if let Some(status) = self.describe(name).await? {
                if status.ready {
                    return Ok(());
                }
            }
        }

        bail!(
            "Index '{}' not ready after {} polls ({}s interval)",
            name,
            self.ready_max_polls,
            self.ready_poll_secs
        );
    }

    async fn upsert(&self, name: &str, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let host = match self.host(name).await? {
            Some(host) => host,
            None => bail!("Index '{}' does not exist", name),
        };

        let body = serde_json::json!({ "vectors": records });
        let url = format!("https://{}/vectors/upsert", host);
        let response = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .header("Api-Key", self.api_key.clone())
                    .header("Content-Type", "application/json")
                    .json(&body)
            },
            self.max_retries,
        )
        .await?;

        let json = expect_json(response).await?;
        let upserted = json
            .get("upsertedCount")
            .and_then(|c| c.as_u64())
            .unwrap_or(records.len() as u64);
        Ok(upserted as usize)
    }

    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        let host = match self.host(name).await? {
            Some(host) => host,
            // Absent index: no matches rather than a hard failure.
            None => return Ok(Vec::new()),
        };

        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });

        let url = format!("https://{}/query", host);
        let response = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .header("Api-Key", self.api_key.clone())
                    .header("Content-Type", "application/json")
                    .json(&body)
            },
            self.max_retries,
        )
        .await?;

        let json = expect_json(response).await?;
        parse_query_matches(&json)
    }
}

fn parse_index_status(json: &serde_json::Value) -> Result<IndexStatus> {
    let ready = json
        .get("status")
        .and_then(|s| s.get("ready"))
        .and_then(|r| r.as_bool())
        .unwrap_or(false);

    let host = json
        .get("host")
        .and_then(|h| h.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(IndexStatus { ready, host })
}

/// Extract the ordered `matches` array from a query response.
fn parse_query_matches(json: &serde_json::Value) -> Result<Vec<QueryMatch>> {
    let matches = match json.get("matches") {
        Some(value) => value.clone(),
        None => return Ok(Vec::new()),
    };
    let parsed: Vec<QueryMatch> = serde_json::from_value(matches)
        .map_err(|e| anyhow::anyhow!("Invalid query response: {}", e))?;
    Ok(parsed)
}
