//! [`ProductIndex`] backed by an Elasticsearch-compatible HTTP API.
//!
//! Queries are sent as `POST {url}/{index}/_search` with the body produced by
//! [`ProductQuery::to_request_body`]. One pooled `reqwest::Client` is shared
//! by all requests; its timeout is the per-call deadline.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use super::{decode_search_response, ProductIndex};
use crate::config::Config;
use crate::error::{KhojError, Result, Stage};
use crate::models::SearchResult;
use crate::query::ProductQuery;

pub struct ElasticsearchIndex {
    client: reqwest::Client,
    base_url: String,
    index: String,
    timeout: Duration,
}

impl ElasticsearchIndex {
    pub fn new(base_url: &str, index: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KhojError::Index(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.index.url, &config.index.name, config.request_timeout())
    }

    fn index_url(&self) -> String {
        format!("{}/{}", self.base_url, self.index)
    }

    /// Maps a send or body-read error. The client timeout covers both.
    fn transport_error(&self, err: reqwest::Error, what: &str) -> KhojError {
        if err.is_timeout() {
            KhojError::Timeout {
                stage: Stage::Search,
                after: self.timeout,
            }
        } else {
            KhojError::Index(format!("{}: {}", what, err))
        }
    }

    fn request_failed(&self, err: reqwest::Error) -> KhojError {
        let what = format!("request to {} failed", self.base_url);
        self.transport_error(err, &what)
    }
}

#[async_trait]
impl ProductIndex for ElasticsearchIndex {
    async fn search(&self, query: &ProductQuery) -> Result<SearchResult> {
        let url = format!("{}/_search", self.index_url());
        tracing::debug!(url = %url, query = %query.text(), "executing multi_match query");

        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&query.to_request_body())
            .send()
            .await
            .map_err(|e| self.request_failed(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(KhojError::Index(format!(
                "search returned {}: {}",
                status, body_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.transport_error(e, "unreadable search response"))?;

        let result = decode_search_response(body)?;
        tracing::info!(
            index = %self.index,
            returned = result.products.len(),
            total_hits = result.total_hits,
            latency_ms = %started.elapsed().as_millis(),
            "product search completed"
        );
        Ok(result)
    }

    async fn ping(&self) -> Result<()> {
        let response = self
            .client
            .head(self.index_url())
            .send()
            .await
            .map_err(|e| self.request_failed(e))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            reqwest::StatusCode::NOT_FOUND => Err(KhojError::Index(format!(
                "index '{}' does not exist at {}",
                self.index, self.base_url
            ))),
            s => Err(KhojError::Index(format!("index check returned {}", s))),
        }
    }
}
