//! In-memory [`ProductIndex`] for tests and offline development.
//!
//! Documents are stored as raw JSON, matched with
//! [`ProductQuery::matches_document`], and decoded only when returned, so a
//! malformed document fails a search exactly as a malformed Elasticsearch
//! hit would. Results keep insertion order and are capped at
//! [`DEFAULT_RESULT_WINDOW`].

use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::{decode_document, ProductIndex};
use crate::error::{KhojError, Result};
use crate::models::{Product, SearchResult};
use crate::query::{ProductQuery, DEFAULT_RESULT_WINDOW};

pub struct InMemoryIndex {
    docs: RwLock<Vec<Value>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Result<Self> {
        let index = Self::new();
        for product in products {
            index.insert(&product)?;
        }
        Ok(index)
    }

    pub fn insert(&self, product: &Product) -> Result<()> {
        let doc = serde_json::to_value(product)
            .map_err(|e| KhojError::Index(format!("failed to encode product: {}", e)))?;
        self.insert_document(doc)
    }

    /// Stores a document as-is, without checking that it is a valid product.
    pub fn insert_document(&self, doc: Value) -> Result<()> {
        self.docs.write().map_err(|_| poisoned())?.push(doc);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> KhojError {
    KhojError::Index("in-memory index lock poisoned".to_string())
}

#[async_trait]
impl ProductIndex for InMemoryIndex {
    async fn search(&self, query: &ProductQuery) -> Result<SearchResult> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        let matched: Vec<(usize, &Value)> = docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| query.matches_document(doc))
            .collect();

        let total_hits = matched.len() as u64;
        let products = matched
            .into_iter()
            .take(DEFAULT_RESULT_WINDOW)
            .map(|(position, doc)| decode_document(&format!("document #{}", position), doc.clone()))
            .collect::<Result<Vec<Product>>>()?;

        Ok(SearchResult {
            products,
            total_hits,
        })
    }

    async fn ping(&self) -> Result<()> {
        self.docs.read().map(|_| ()).map_err(|_| poisoned())
    }
}
