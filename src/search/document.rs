//! Catalog document model
//!
//! A document is a bag of named fields. The fields the engine reads
//! (identifier, name, category, description, price) are lifted into typed
//! slots; everything else rides along in `extra` and is echoed back in results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ID_KEYS: &[&str] = &["id", "product_id"];
const NAME_KEYS: &[&str] = &["name", "product_name"];
const CATEGORY_KEYS: &[&str] = &["category", "product_category"];
const DESCRIPTION_KEYS: &[&str] = &["description", "product_description"];
const SCORE_KEY: &str = "similarity_score";

/// Catalog item, optionally annotated with a retrieval score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Document {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub extra: Map<String, Value>,
    /// Only set on retrieval results
    pub similarity_score: Option<f32>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            category: Some(category.into()),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.similarity_score = Some(score);
        self
    }

    pub fn without_score(mut self) -> Self {
        self.similarity_score = None;
        self
    }

    /// Retrieval score, 0.0 when absent
    pub fn score(&self) -> f32 {
        self.similarity_score.unwrap_or(0.0)
    }

    /// Text used for both embedding and keyword matching: name, description
    /// and category joined by single spaces. Missing fields become empty strings.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or(""),
            self.category.as_deref().unwrap_or("")
        )
    }
}

impl From<Map<String, Value>> for Document {
    fn from(mut map: Map<String, Value>) -> Self {
        let id = take_text(&mut map, ID_KEYS);
        let name = take_text(&mut map, NAME_KEYS);
        let category = take_text(&mut map, CATEGORY_KEYS);
        let description = take_text(&mut map, DESCRIPTION_KEYS);
        let price = match map.remove("price") {
            Some(raw) => {
                let parsed = match &raw {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                };
                // Keep unparseable prices as plain attributes
                if parsed.is_none() {
                    map.insert("price".to_string(), raw);
                }
                parsed
            }
            None => None,
        };
        let similarity_score = map
            .remove(SCORE_KEY)
            .and_then(|v| v.as_f64())
            .map(|s| s as f32);

        Self {
            id,
            name,
            category,
            description,
            price,
            extra: map,
            similarity_score,
        }
    }
}

impl From<Document> for Map<String, Value> {
    fn from(doc: Document) -> Self {
        let mut map = doc.extra;
        let fields = [
            ("id", doc.id),
            ("name", doc.name),
            ("category", doc.category),
            ("description", doc.description),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::String(value));
            }
        }
        if let Some(price) = doc.price {
            map.insert("price".to_string(), Value::from(price));
        }
        if let Some(score) = doc.similarity_score {
            map.insert(SCORE_KEY.to_string(), Value::from(score as f64));
        }
        map
    }
}

/// Remove the first present key of `keys` and render it as text.
///
/// Later aliases are left in the map when an earlier key wins, so nothing the
/// catalog supplied is dropped.
fn take_text(map: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let key = keys.iter().find(|k| map.contains_key(**k))?;
    match map.remove(*key)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_text_order() {
        let doc = Document::new("P1", "Coffee Maker Deluxe", "Home & Garden", "12-cup capacity");
        assert_eq!(doc.search_text(), "Coffee Maker Deluxe 12-cup capacity Home & Garden");
    }

    #[test]
    fn test_search_text_missing_fields() {
        let doc = Document {
            name: Some("Laptop Pro".to_string()),
            ..Default::default()
        };
        assert_eq!(doc.search_text(), "Laptop Pro  ");
    }

    #[test]
    fn test_catalog_aliases() {
        let doc: Document = serde_json::from_value(json!({
            "id": 7,
            "product_id": "abc123",
            "product_name": "Desk Lamp",
            "product_category": "Home",
            "product_description": "LED",
            "price": 19.5,
            "color": "black"
        }))
        .unwrap();

        assert_eq!(doc.id.as_deref(), Some("7"));
        assert_eq!(doc.name.as_deref(), Some("Desk Lamp"));
        assert_eq!(doc.category.as_deref(), Some("Home"));
        assert_eq!(doc.description.as_deref(), Some("LED"));
        assert_eq!(doc.price, Some(19.5));
        assert_eq!(doc.extra.get("product_id"), Some(&json!("abc123")));
        assert_eq!(doc.extra.get("color"), Some(&json!("black")));
        assert_eq!(doc.similarity_score, None);
    }

    #[test]
    fn test_unparseable_price_kept_as_attribute() {
        for raw in [json!("n/a"), json!(null), json!({"amount": 5})] {
            let doc: Document =
                serde_json::from_value(json!({"id": "P1", "price": raw.clone()})).unwrap();
            assert_eq!(doc.price, None);
            assert_eq!(doc.extra.get("price"), Some(&raw));

            let value = serde_json::to_value(&doc).unwrap();
            assert_eq!(value["price"], raw);
        }

        let doc: Document = serde_json::from_value(json!({"price": " 12.50 "})).unwrap();
        assert_eq!(doc.price, Some(12.5));
        assert!(doc.extra.is_empty());
    }

    #[test]
    fn test_product_id_used_when_id_absent() {
        let doc: Document = serde_json::from_value(json!({"product_id": "abc123"})).unwrap();
        assert_eq!(doc.id.as_deref(), Some("abc123"));
        assert!(doc.extra.is_empty());
    }

    #[test]
    fn test_serialize_canonical_keys() {
        let doc = Document::new("P2", "Laptop Pro", "Electronics", "16GB RAM")
            .with_price(1299.0)
            .with_attribute("stock", 4)
            .with_score(0.5);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "P2",
                "name": "Laptop Pro",
                "category": "Electronics",
                "description": "16GB RAM",
                "price": 1299.0,
                "stock": 4,
                "similarity_score": 0.5
            })
        );
    }

    #[test]
    fn test_score_defaults_to_zero() {
        let doc = Document::default();
        assert_eq!(doc.score(), 0.0);
        assert_eq!(doc.with_score(0.25).without_score().score(), 0.0);
    }
}
