//! Multi-field relevance query over the product catalog.
//!
//! A [`ProductQuery`] matches when its text appears in any of
//! [`SEARCH_FIELDS`], OR-combined with engine-default scoring. There is no
//! per-field boosting, fuzziness, or phrase matching, and no paging: the
//! engine's default result window bounds the number of hits returned.

use serde_json::{json, Value};

use crate::error::{KhojError, Result};
use crate::models::Product;

/// The only product fields a query may match against.
pub const SEARCH_FIELDS: [&str; 5] = ["name", "category", "sub_category", "brand", "type"];

/// Elasticsearch's default `size` when a search request sets none.
pub const DEFAULT_RESULT_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    text: String,
}

impl ProductQuery {
    /// Builds a query from client or pipeline text.
    ///
    /// The text is kept as given; it is only rejected when blank.
    pub fn multi_match(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(KhojError::Input("query must not be empty".to_string()));
        }
        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fields(&self) -> &'static [&'static str] {
        &SEARCH_FIELDS
    }

    /// Renders the `_search` request body.
    pub fn to_request_body(&self) -> Value {
        json!({
            "query": {
                "multi_match": {
                    "query": self.text,
                    "fields": SEARCH_FIELDS,
                }
            }
        })
    }

    /// Evaluates the query locally: any query term equal to any term of a
    /// searched field, case-insensitively.
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_values([
            product.name.as_str(),
            product.category.as_str(),
            product.sub_category.as_str(),
            product.brand.as_str(),
            product.product_type.as_str(),
        ])
    }

    /// Like [`matches`](Self::matches), but against a raw index document.
    /// Searched fields that are missing or not strings never match.
    pub fn matches_document(&self, doc: &Value) -> bool {
        self.matches_values(
            SEARCH_FIELDS
                .iter()
                .filter_map(|field| doc.get(*field).and_then(Value::as_str)),
        )
    }

    fn matches_values<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> bool {
        let terms = tokenize(&self.text);
        if terms.is_empty() {
            return false;
        }
        values
            .into_iter()
            .flat_map(tokenize)
            .any(|field_term| terms.contains(&field_term))
    }
}

/// Lowercased alphanumeric runs, roughly what the standard analyzer emits.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
