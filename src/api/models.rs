use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::wikipedia::ImageStatus;

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateListRequest {
    #[serde(default)]
    pub category: Option<String>,
    /// A number or numeric string; anything else means the default.
    #[serde(default)]
    pub count: Option<Value>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Ranked items for a category and the property names worth showing for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemList {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub properties: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemDetailsRequest {
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub properties: Option<Vec<Value>>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Rendered details of one item as sent to, and cached for, the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub name: String,
    /// Sanitized HTML.
    pub description: String,
    /// Sanitized HTML strings or lists of them, in the order the model gave.
    pub properties: Map<String, Value>,
    pub images: Vec<String>,
    pub image_status: ImageStatus,
    pub image_source: Option<String>,
}

impl GenerateListRequest {
    pub fn count_or(&self, default: u32) -> u32 {
        let requested = match &self.count {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        requested.unwrap_or(default as i64).clamp(1, 100) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(count: Value) -> GenerateListRequest {
        serde_json::from_value(json!({"category": "rock bands", "count": count})).unwrap()
    }

    #[test]
    fn count_is_clamped_and_lenient() {
        assert_eq!(request(json!(5)).count_or(10), 5);
        assert_eq!(request(json!("7")).count_or(10), 7);
        assert_eq!(request(json!(0)).count_or(10), 1);
        assert_eq!(request(json!(500)).count_or(10), 100);
        assert_eq!(request(json!(null)).count_or(10), 10);
        assert_eq!(GenerateListRequest::default().count_or(10), 10);
    }

    #[test]
    fn details_serialize_with_snake_case_status() {
        let details = ItemDetails {
            name: "Paris".to_string(),
            description: "<p>Capital of France.</p>".to_string(),
            properties: Map::new(),
            images: vec![],
            image_status: ImageStatus::NoPageFound,
            image_source: None,
        };
        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["image_status"], "no_page_found");
        assert!(value["image_source"].is_null());
    }
}
