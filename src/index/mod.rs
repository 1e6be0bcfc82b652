//! Product index abstraction and hit decoding.
//!
//! The [`ProductIndex`] trait is the seam between the pipeline and the
//! search engine. Two backends are provided:
//!
//! - [`ElasticsearchIndex`] talks to an Elasticsearch-compatible `_search` API.
//! - [`InMemoryIndex`] evaluates queries over documents held in memory, for
//!   tests and offline development.
//!
//! Both decode hits with [`decode_search_response`] semantics: every hit must
//! decode into a [`Product`], and the first one that does not fails the whole
//! call. No partial results are ever returned.

pub mod elasticsearch;
pub mod memory;

pub use elasticsearch::ElasticsearchIndex;
pub use memory::InMemoryIndex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{KhojError, Result};
use crate::models::{Product, SearchResult};
use crate::query::ProductQuery;

/// A searchable store of product documents.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait ProductIndex: Send + Sync {
    /// Runs a query and decodes every returned hit into a [`Product`].
    ///
    /// Results follow the engine's relevance order and are bounded by its
    /// default result window.
    async fn search(&self, query: &ProductQuery) -> Result<SearchResult>;

    /// Checks that the index is reachable and exists.
    async fn ping(&self) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// `hits.total` is a bare number before Elasticsearch 7 and an object after.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Count(n) => *n,
            TotalHits::Object { value } => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

/// Decodes a raw `_search` response body.
pub fn decode_search_response(body: Value) -> Result<SearchResult> {
    let body: SearchResponseBody = serde_json::from_value(body)
        .map_err(|e| KhojError::Index(format!("malformed search response: {}", e)))?;

    let products = body
        .hits
        .hits
        .into_iter()
        .enumerate()
        .map(|(position, hit)| decode_hit(position, hit))
        .collect::<Result<Vec<Product>>>()?;

    let total_hits = body
        .hits
        .total
        .map(|t| t.value())
        .unwrap_or(products.len() as u64);

    Ok(SearchResult {
        products,
        total_hits,
    })
}

fn decode_hit(position: usize, hit: RawHit) -> Result<Product> {
    let label = hit
        .id
        .map(|id| format!("hit '{}'", id))
        .unwrap_or_else(|| format!("hit #{}", position));
    let source = hit
        .source
        .ok_or_else(|| KhojError::Index(format!("{} has no _source", label)))?;
    decode_document(&label, source)
}

pub(crate) fn decode_document(label: &str, source: Value) -> Result<Product> {
    serde_json::from_value(source)
        .map_err(|e| KhojError::Index(format!("failed to decode {} as product: {}", label, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(id: i64, name: &str) -> Value {
        json!({
            "index_id": id,
            "name": name,
            "sale_price": 30.0,
            "market_price": 32.0,
            "type": "Loaf",
            "quantity": 9,
            "category": "Bakery",
            "sub_category": "Breads",
            "brand": "Fresho",
            "rating": 3.9,
            "image_url": "https://img.example/b.jpg",
            "product_url": "https://shop.example/b",
            "description": "",
            "is_available": true
        })
    }

    #[test]
    fn test_decode_es7_total() {
        let body = json!({
            "took": 3,
            "hits": {
                "total": { "value": 42, "relation": "eq" },
                "hits": [
                    { "_id": "a", "_score": 2.0, "_source": source(1, "Brown Bread") },
                    { "_id": "b", "_score": 1.0, "_source": source(2, "White Bread") }
                ]
            }
        });
        let result = decode_search_response(body).unwrap();
        assert_eq!(result.total_hits, 42);
        let names: Vec<&str> = result.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Brown Bread", "White Bread"]);
    }

    #[test]
    fn test_decode_legacy_total() {
        let body = json!({ "hits": { "total": 1, "hits": [ { "_source": source(1, "Rusk") } ] } });
        let result = decode_search_response(body).unwrap();
        assert_eq!(result.total_hits, 1);
        assert_eq!(result.products[0].id, 1);
    }

    #[test]
    fn test_decode_empty() {
        let body = json!({ "hits": { "total": { "value": 0, "relation": "eq" }, "hits": [] } });
        let result = decode_search_response(body).unwrap();
        assert!(result.products.is_empty());
        assert_eq!(result.total_hits, 0);
    }

    #[test]
    fn test_bad_hit_fails_whole_call() {
        let mut broken = source(2, "Broken");
        broken.as_object_mut().unwrap().remove("sale_price");
        let body = json!({
            "hits": {
                "total": 2,
                "hits": [
                    { "_id": "ok", "_source": source(1, "Fine") },
                    { "_id": "bad", "_source": broken }
                ]
            }
        });
        let err = decode_search_response(body).unwrap_err();
        assert!(matches!(err, KhojError::Index(_)));
        assert!(err.to_string().contains("'bad'"), "got: {}", err);
    }

    #[test]
    fn test_full_precision_prices_survive_decoding() {
        let raw = r#"{
            "hits": {
                "total": { "value": 1, "relation": "eq" },
                "hits": [{
                    "_id": "p1",
                    "_source": {
                        "index_id": 1,
                        "name": "Basmati Rice",
                        "sale_price": 1175.4621790330661,
                        "market_price": 1865.8799244302274,
                        "type": "Bag",
                        "quantity": 1,
                        "category": "Staples",
                        "sub_category": "Rice",
                        "brand": "India Gate",
                        "rating": 4.123456789012345,
                        "image_url": "",
                        "product_url": "",
                        "description": "",
                        "is_available": true
                    }
                }]
            }
        }"#;
        let body: Value = serde_json::from_str(raw).unwrap();
        let product = &decode_search_response(body).unwrap().products[0];
        assert_eq!(product.sale_price.to_bits(), 1175.4621790330661_f64.to_bits());
        assert_eq!(product.market_price.to_bits(), 1865.8799244302274_f64.to_bits());
        assert_eq!(product.rating.to_bits(), 4.123456789012345_f64.to_bits());
    }

    #[test]
    fn test_missing_source_fails() {
        let body = json!({ "hits": { "hits": [ { "_id": "x" } ] } });
        let err = decode_search_response(body).unwrap_err();
        assert!(err.to_string().contains("no _source"));
    }

    #[test]
    fn test_malformed_body_fails() {
        let err = decode_search_response(json!({ "error": "boom" })).unwrap_err();
        assert!(err.to_string().contains("malformed search response"));
    }
}
