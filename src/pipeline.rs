//! Sequencing of the text and image search paths.
//!
//! ```text
//! text:  query ─────────────────────────────▶ ProductQuery ─▶ index ─▶ products
//! image: bytes ─▶ detector ─▶ resolver ─▶ keyword ─▶ ProductQuery ─▶ index ─▶ dishes + products
//! ```
//!
//! Both outbound calls run under the same per-call deadline. Dropping the
//! returned future (for example when the HTTP client disconnects) cancels
//! whichever outbound call is in flight. Any stage failure aborts the request;
//! no partial response is ever assembled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::detection::{DishDetector, HttpDetector};
use crate::error::{KhojError, Result, Stage};
use crate::index::{ElasticsearchIndex, ProductIndex};
use crate::models::{Detections, PipelineResponse, SearchResult};
use crate::query::ProductQuery;
use crate::resolver::resolve_keyword;

pub struct Pipeline {
    detector: Arc<dyn DishDetector>,
    index: Arc<dyn ProductIndex>,
    deadline: Duration,
}

impl Pipeline {
    pub fn new(
        detector: Arc<dyn DishDetector>,
        index: Arc<dyn ProductIndex>,
        deadline: Duration,
    ) -> Self {
        Self {
            detector,
            index,
            deadline,
        }
    }

    /// Wires the HTTP detector and the Elasticsearch index from config.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpDetector::from_config(config)?),
            Arc::new(ElasticsearchIndex::from_config(config)?),
            config.request_timeout(),
        ))
    }

    pub fn index(&self) -> &dyn ProductIndex {
        self.index.as_ref()
    }

    /// Direct text search; no detection involved.
    pub async fn search_text(&self, text: &str) -> Result<SearchResult> {
        let query = ProductQuery::multi_match(text)?;
        tracing::info!(query = %query.text(), "text search");
        self.execute(&query).await
    }

    pub async fn detect(&self, image: &[u8]) -> Result<Detections> {
        with_deadline(Stage::Detection, self.deadline, self.detector.detect(image)).await
    }

    /// Image search: detect dishes, pick one keyword, search with it.
    ///
    /// The response carries every detection, not only the dish that was
    /// searched.
    #[tracing::instrument(
        name = "image_search",
        skip_all,
        fields(request_id = %uuid::Uuid::new_v4(), image_bytes = image.len())
    )]
    pub async fn search_image(&self, image: &[u8]) -> Result<PipelineResponse> {
        let detections = self.detect(image).await?;

        let resolved = resolve_keyword(&detections)?;
        tracing::info!(
            dish = %resolved.dish,
            keyword = %resolved.keyword,
            detected = detections.len(),
            "resolved search keyword"
        );
        let keyword = resolved.keyword.to_string();

        let query = ProductQuery::multi_match(keyword.as_str())?;
        let result = self.execute(&query).await?;

        Ok(PipelineResponse::from_image(detections, keyword, result))
    }

    async fn execute(&self, query: &ProductQuery) -> Result<SearchResult> {
        let result = with_deadline(Stage::Search, self.deadline, self.index.search(query)).await?;
        tracing::debug!(
            returned = result.products.len(),
            total_hits = result.total_hits,
            "search executed"
        );
        Ok(result)
    }
}

async fn with_deadline<T>(
    stage: Stage,
    deadline: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(stage = %stage, deadline_ms = %deadline.as_millis(), "deadline exceeded");
            Err(KhojError::Timeout {
                stage,
                after: deadline,
            })
        }
    }
}
