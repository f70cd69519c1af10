//! Pinecone REST backend.
//!
//! Index lifecycle goes through the control plane; vector reads and writes go
//! to the per-index data-plane host reported by `describe`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::service::{
    DistanceMetric, IndexDescription, IndexDescriptor, QueryMatch, VectorIndexService, VectorItem,
};
use super::vector_math::rank_matches;
use crate::catalog::ProductMetadata;
use crate::core::errors::{ConfigError, ServiceError};

const API_VERSION: &str = "2024-07";

#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub control_url: String,
    pub cloud: String,
    pub region: String,
    pub timeout: Duration,
}

pub struct PineconeIndex {
    client: Client,
    control_url: String,
    cloud: String,
    region: String,
    timeout: Duration,
    hosts: RwLock<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct DescribeResponse {
    name: String,
    dimension: usize,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Debug, Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<ProductMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: usize,
}

impl PineconeIndex {
    pub fn new(config: PineconeConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(config.api_key.trim()).map_err(|_| ConfigError::Invalid {
                key: "PINECONE_API_KEY".to_string(),
                reason: "not a valid header value".to_string(),
            })?,
        );
        headers.insert(
            "X-Pinecone-API-Version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "PINECONE_CONTROL_URL".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            control_url: config.control_url.trim_end_matches('/').to_string(),
            cloud: config.cloud,
            region: config.region,
            timeout: config.timeout,
            hosts: RwLock::new(HashMap::new()),
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::Timeout(self.timeout)
        } else {
            ServiceError::request(err)
        }
    }

    async fn check(&self, res: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(ServiceError::Status { status, body })
    }

    /// Data-plane host for `index`, resolved through `describe` on first use.
    async fn host(&self, index: &str) -> Result<Option<String>, ServiceError> {
        if let Some(host) = self.hosts.read().await.get(index) {
            return Ok(Some(host.clone()));
        }
        let Some(described) = self.describe_raw(index).await? else {
            return Ok(None);
        };
        if described.host.is_empty() {
            return Ok(None);
        }
        let host = data_plane_url(&described.host);
        self.hosts
            .write()
            .await
            .insert(index.to_string(), host.clone());
        Ok(Some(host))
    }

    async fn describe_raw(&self, index: &str) -> Result<Option<DescribeResponse>, ServiceError> {
        let url = format!("{}/indexes/{}", self.control_url, index);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let res = self.check(res).await?;
        res.json().await.map(Some).map_err(ServiceError::malformed)
    }

    async fn post_data(&self, index: &str, path: &str, body: Value) -> Result<Value, ServiceError> {
        let Some(host) = self.host(index).await? else {
            return Err(ServiceError::Status {
                status: 404,
                body: format!("index {} does not exist", index),
            });
        };
        let res = self
            .client
            .post(format!("{}/{}", host, path))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let res = self.check(res).await?;
        res.json().await.map_err(ServiceError::malformed)
    }
}

#[async_trait]
impl VectorIndexService for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn describe(&self, index: &str) -> Result<Option<IndexDescription>, ServiceError> {
        Ok(self.describe_raw(index).await?.map(|raw| IndexDescription {
            descriptor: IndexDescriptor {
                name: raw.name,
                dimension: raw.dimension,
                metric: DistanceMetric::Cosine,
            },
            ready: raw.status.ready,
        }))
    }

    async fn create(&self, descriptor: &IndexDescriptor) -> Result<(), ServiceError> {
        let body = create_body(descriptor, &self.cloud, &self.region);
        let res = self
            .client
            .post(format!("{}/indexes", self.control_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.check(res).await?;
        Ok(())
    }

    async fn delete(&self, index: &str) -> Result<(), ServiceError> {
        self.hosts.write().await.remove(index);
        let res = self
            .client
            .delete(format!("{}/indexes/{}", self.control_url, index))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.check(res).await?;
        Ok(())
    }

    async fn upsert(&self, index: &str, items: &[VectorItem]) -> Result<(), ServiceError> {
        if items.is_empty() {
            return Ok(());
        }
        self.post_data(index, "vectors/upsert", upsert_body(items)?)
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryMatch>, ServiceError> {
        let payload = self
            .post_data(
                index,
                "query",
                json!({ "vector": vector, "topK": top_k, "includeMetadata": true }),
            )
            .await?;
        let parsed: QueryResponse = serde_json::from_value(payload).map_err(ServiceError::malformed)?;
        let matches = parsed
            .matches
            .into_iter()
            .map(|m| QueryMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect();
        Ok(rank_matches(matches, top_k))
    }

    async fn count(&self, index: &str) -> Result<usize, ServiceError> {
        let payload = self
            .post_data(index, "describe_index_stats", json!({}))
            .await?;
        let stats: StatsResponse = serde_json::from_value(payload).map_err(ServiceError::malformed)?;
        Ok(stats.total_vector_count)
    }
}

fn data_plane_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

fn create_body(descriptor: &IndexDescriptor, cloud: &str, region: &str) -> Value {
    json!({
        "name": descriptor.name,
        "dimension": descriptor.dimension,
        "metric": descriptor.metric.as_str(),
        "spec": { "serverless": { "cloud": cloud, "region": region } },
    })
}

fn upsert_body(items: &[VectorItem]) -> Result<Value, ServiceError> {
    let mut vectors = Vec::with_capacity(items.len());
    for item in items {
        vectors.push(json!({
            "id": item.id,
            "values": item.values,
            "metadata": serde_json::to_value(&item.metadata).map_err(ServiceError::malformed)?,
        }));
    }
    Ok(json!({ "vectors": vectors }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_uses_serverless_spec() {
        let body = create_body(&IndexDescriptor::cosine("cheese", 1536), "aws", "us-east-1");
        assert_eq!(body["dimension"], 1536);
        assert_eq!(body["metric"], "cosine");
        assert_eq!(body["spec"]["serverless"]["region"], "us-east-1");
    }

    #[test]
    fn upsert_body_carries_metadata_snapshot() {
        let items = vec![VectorItem {
            id: "product_SKU1".to_string(),
            values: vec![0.5, 0.5],
            metadata: ProductMetadata {
                name: "Sharp Cheddar".to_string(),
                price: 12.5,
                ..ProductMetadata::default()
            },
        }];
        let body = upsert_body(&items).unwrap();
        assert_eq!(body["vectors"][0]["id"], "product_SKU1");
        assert_eq!(body["vectors"][0]["metadata"]["name"], "Sharp Cheddar");
    }

    #[test]
    fn hosts_without_scheme_get_https() {
        assert_eq!(
            data_plane_url("cheese-abc.svc.pinecone.io"),
            "https://cheese-abc.svc.pinecone.io"
        );
        assert_eq!(data_plane_url("http://localhost:5080/"), "http://localhost:5080");
    }

    #[test]
    fn query_response_tolerates_missing_metadata() {
        let parsed: QueryResponse = serde_json::from_value(json!({
            "matches": [{ "id": "product_1", "score": 0.8 }]
        }))
        .unwrap();
        assert_eq!(parsed.matches.len(), 1);
        assert!(parsed.matches[0].metadata.is_none());
    }

    #[test]
    fn describe_response_reads_readiness() {
        let raw: DescribeResponse = serde_json::from_value(json!({
            "name": "cheese",
            "dimension": 8,
            "metric": "cosine",
            "host": "cheese.svc.io",
            "status": { "ready": false, "state": "Initializing" }
        }))
        .unwrap();
        assert!(!raw.status.ready);
        assert_eq!(raw.dimension, 8);
    }
}
