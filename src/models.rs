//! Core data models that flow through the search pipeline.
//!
//! [`Product`] mirrors the documents stored in the product index; its JSON
//! field names are shared with the index mapping and must not change.
//! [`DishDetection`] and [`Detections`] carry the recognition collaborator's
//! output, and [`PipelineResponse`] is what a client finally receives.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A catalog product as stored in the product index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "index_id")]
    pub id: i64,
    pub name: String,
    pub sale_price: f64,
    pub market_price: f64,
    #[serde(rename = "type")]
    pub product_type: String,
    pub quantity: u32,
    pub category: String,
    pub sub_category: String,
    pub brand: String,
    pub rating: f64,
    pub image_url: String,
    pub product_url: String,
    pub description: String,
    pub is_available: bool,
}

/// One dish recognized in an uploaded photograph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishDetection {
    pub name: String,
    /// Free-text recipe or description.
    #[serde(default)]
    pub recipe: String,
    /// Ingredient keywords, in the order the collaborator listed them.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Recognition confidence, when the collaborator reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Detections for one image, keyed by dish name, in arrival order.
///
/// A later detection with an already-seen name replaces the earlier one's
/// contents but keeps its position. Serializes as a JSON object mapping
/// dish name to [`DishDetection`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    dishes: Vec<DishDetection>,
}

impl Detections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, dish: DishDetection) {
        match self.dishes.iter_mut().find(|d| d.name == dish.name) {
            Some(existing) => *existing = dish,
            None => self.dishes.push(dish),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DishDetection> {
        self.dishes.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DishDetection> {
        self.dishes.iter()
    }

    pub fn len(&self) -> usize {
        self.dishes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }
}

impl FromIterator<DishDetection> for Detections {
    fn from_iter<I: IntoIterator<Item = DishDetection>>(iter: I) -> Self {
        let mut detections = Detections::new();
        for dish in iter {
            detections.push(dish);
        }
        detections
    }
}

impl<'a> IntoIterator for &'a Detections {
    type Item = &'a DishDetection;
    type IntoIter = std::slice::Iter<'a, DishDetection>;

    fn into_iter(self) -> Self::IntoIter {
        self.dishes.iter()
    }
}

impl Serialize for Detections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.dishes.len()))?;
        for dish in &self.dishes {
            map.serialize_entry(&dish.name, dish)?;
        }
        map.end()
    }
}

/// Products returned by one index query, in engine relevance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub products: Vec<Product>,
    /// Total matches reported by the engine. May exceed `products.len()`
    /// because the engine's default result window applies.
    pub total_hits: u64,
}

/// The externally visible result of one search request.
///
/// Text searches leave `dishes` empty; image searches carry every detection,
/// not only the dish whose keyword drove the query.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dishes: Option<Detections>,
    pub products: Vec<Product>,
    #[serde(skip)]
    pub keyword: Option<String>,
    #[serde(skip)]
    pub total_hits: u64,
}

impl PipelineResponse {
    pub fn from_text(result: SearchResult) -> Self {
        Self {
            dishes: None,
            products: result.products,
            keyword: None,
            total_hits: result.total_hits,
        }
    }

    pub fn from_image(dishes: Detections, keyword: String, result: SearchResult) -> Self {
        Self {
            dishes: Some(dishes),
            products: result.products,
            keyword: Some(keyword),
            total_hits: result.total_hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dish(name: &str, keywords: &[&str]) -> DishDetection {
        DishDetection {
            name: name.to_string(),
            recipe: String::new(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            confidence: None,
        }
    }

    #[test]
    fn test_product_field_names() {
        let doc = json!({
            "index_id": 7,
            "name": "Brown Bread",
            "sale_price": 40.0,
            "market_price": 45.5,
            "type": "Breads & Buns",
            "quantity": 12,
            "category": "Bakery",
            "sub_category": "Breads",
            "brand": "Fresho",
            "rating": 4.1,
            "image_url": "https://img.example/7.jpg",
            "product_url": "https://shop.example/p/7",
            "description": "Whole wheat loaf",
            "is_available": true
        });
        let product: Product = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(product.id, 7);
        assert_eq!(product.product_type, "Breads & Buns");
        assert_eq!(serde_json::to_value(&product).unwrap(), doc);
    }

    #[test]
    fn test_product_missing_field_rejected() {
        let doc = json!({ "index_id": 1, "name": "Milk" });
        assert!(serde_json::from_value::<Product>(doc).is_err());
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let doc = json!({
            "index_id": 1, "name": "x", "sale_price": 1.0, "market_price": 1.0,
            "type": "t", "quantity": -3, "category": "c", "sub_category": "s",
            "brand": "b", "rating": 2.5, "image_url": "", "product_url": "",
            "description": "", "is_available": true
        });
        assert!(serde_json::from_value::<Product>(doc).is_err());
    }

    #[test]
    fn test_dish_defaults() {
        let d: DishDetection = serde_json::from_value(json!({ "name": "Dal" })).unwrap();
        assert_eq!(d.recipe, "");
        assert!(d.keywords.is_empty());
        assert!(d.confidence.is_none());
        // Absent confidence is not echoed back.
        let out = serde_json::to_value(&d).unwrap();
        assert!(out.get("confidence").is_none());
    }

    #[test]
    fn test_detections_duplicate_name_replaces_in_place() {
        let detections: Detections = vec![
            dish("Pizza", &["cheese"]),
            dish("Salad", &["lettuce"]),
            dish("Pizza", &["basil"]),
        ]
        .into_iter()
        .collect();

        assert_eq!(detections.len(), 2);
        let names: Vec<&str> = detections.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Pizza", "Salad"]);
        assert_eq!(detections.get("Pizza").unwrap().keywords, vec!["basil"]);
    }

    #[test]
    fn test_detections_serialize_as_map() {
        let detections: Detections = vec![dish("Pizza", &["cheese", "tomato"])]
            .into_iter()
            .collect();
        let value = serde_json::to_value(&detections).unwrap();
        assert_eq!(
            value,
            json!({ "Pizza": { "name": "Pizza", "recipe": "", "keywords": ["cheese", "tomato"] } })
        );
    }

    #[test]
    fn test_text_response_omits_dishes() {
        let resp = PipelineResponse::from_text(SearchResult::default());
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value, json!({ "products": [] }));
    }
}
