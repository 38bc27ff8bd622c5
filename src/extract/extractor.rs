//! Item extractor implementation

use crate::types::JsonValue;
use serde::Serialize;
use uuid::Uuid;

/// Identifier fields tried in order
pub const DEFAULT_ID_FIELDS: [&str; 8] = [
    "id",
    "Id",
    "ID",
    "_id",
    "pin_id",
    "board_id",
    "order_id",
    "product_id",
];

/// Body fields that may hold the item list, tried in order
pub const DEFAULT_CONTAINERS: [&str; 3] = ["data", "items", "orders"];

/// Pagination plumbing that is not part of an item
pub const TRANSPORT_FIELDS: [&str; 2] = ["bookmark", "url"];

const GENERATED_PREFIX: &str = "generated_";

/// A normalized item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedItem {
    /// Resolved identifier
    pub id: String,
    /// Item payload without transport-only fields
    pub payload: JsonValue,
    /// Raw `id` field of the item, if it had one
    pub original_id: Option<JsonValue>,
}

/// Extracts items and identifiers from page bodies
#[derive(Debug, Clone)]
pub struct ItemExtractor {
    id_fields: Vec<String>,
    containers: Vec<String>,
}

impl Default for ItemExtractor {
    fn default() -> Self {
        Self {
            id_fields: DEFAULT_ID_FIELDS.iter().map(ToString::to_string).collect(),
            containers: DEFAULT_CONTAINERS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ItemExtractor {
    /// Create an extractor with the default field lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with a custom identifier field order
    pub fn with_id_fields<I, S>(id_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id_fields: id_fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Identifier fields in lookup order
    pub fn id_fields(&self) -> &[String] {
        &self.id_fields
    }

    /// Raw items of a page body
    pub fn raw_items(&self, body: &JsonValue) -> Vec<JsonValue> {
        match body {
            JsonValue::Null => Vec::new(),
            JsonValue::String(s) if s.is_empty() => Vec::new(),
            JsonValue::Array(items) => items.clone(),
            _ => self
                .containers
                .iter()
                .find_map(|field| body.get(field).and_then(JsonValue::as_array))
                .cloned()
                .unwrap_or_else(|| vec![body.clone()]),
        }
    }

    /// Normalized items of a page body
    pub fn extract(&self, body: &JsonValue) -> Vec<ExtractedItem> {
        self.raw_items(body)
            .into_iter()
            .enumerate()
            .map(|(index, item)| ExtractedItem {
                id: self.resolve_id(&item, index),
                original_id: item.get("id").cloned(),
                payload: strip_transport_fields(item),
            })
            .collect()
    }

    /// Identifier of one item at `index`
    ///
    /// Fields holding null, false or an empty string are skipped. Without a
    /// usable field the identifier is derived from the index and the item's
    /// JSON, so the same body always yields the same identifiers.
    pub fn resolve_id(&self, item: &JsonValue, index: usize) -> String {
        self.id_fields
            .iter()
            .filter_map(|field| item.get(field))
            .find_map(id_string)
            .unwrap_or_else(|| generated_id(item, index))
    }
}

fn id_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null | JsonValue::Bool(false) => None,
        JsonValue::String(s) if s.is_empty() => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn generated_id(item: &JsonValue, index: usize) -> String {
    let seed = format!("{index}:{item}");
    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes());
    format!("{GENERATED_PREFIX}{id}")
}

/// Remove `bookmark` and `url` from an object item
pub fn strip_transport_fields(item: JsonValue) -> JsonValue {
    match item {
        JsonValue::Object(mut map) => {
            for field in TRANSPORT_FIELDS {
                map.remove(field);
            }
            JsonValue::Object(map)
        }
        other => other,
    }
}
