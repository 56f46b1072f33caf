//! Schema Splitter: partitions a JSON Schema into per-page and full-document
//! sub-schemas.
//!
//! A pure function over [`serde_json::Value`] with no I/O and no LLM
//! dependency, independently unit-testable — the same "pure, centrally
//! testable validator" shape the teacher uses for its config validators.

use serde_json::{Map, Value};

use crate::error::{DocMarkError, Result};

/// The result of splitting a schema by `extract_per_page` membership.
#[derive(Debug, Clone, Default)]
pub struct SplitSchema {
    pub per_page_schema: Option<Value>,
    pub full_doc_schema: Option<Value>,
}

/// Splits `schema` into per-page and full-document sub-schemas.
///
/// Properties named in `extract_per_page` go into `per_page_schema`; every
/// other top-level property goes into `full_doc_schema`. When
/// `extract_per_page` is empty, every property is full-document and
/// `per_page_schema` is `None`. A `required` array is preserved on each side
/// only for entries that remain present.
pub fn split_schema(schema: &Value, extract_per_page: &[String]) -> Result<SplitSchema> {
    let object = schema
        .as_object()
        .ok_or_else(|| DocMarkError::schema("schema must be a JSON object"))?;

    let properties = object
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    if extract_per_page.is_empty() {
        return Ok(SplitSchema { per_page_schema: None, full_doc_schema: Some(schema.clone()) });
    }

    let mut per_page_props = Map::new();
    let mut full_doc_props = Map::new();

    for (key, value) in &properties {
        if extract_per_page.iter().any(|name| name == key) {
            per_page_props.insert(key.clone(), value.clone());
        } else {
            full_doc_props.insert(key.clone(), value.clone());
        }
    }

    for name in extract_per_page {
        if !properties.contains_key(name) {
            tracing::debug!(property = %name, "extract_per_page names a property absent from the schema");
        }
    }

    let per_page_schema = partition(object, per_page_props);
    let full_doc_schema = partition(object, full_doc_props);

    Ok(SplitSchema { per_page_schema, full_doc_schema })
}

fn partition(original: &Map<String, Value>, properties: Map<String, Value>) -> Option<Value> {
    if properties.is_empty() {
        return None;
    }

    let mut partitioned = original.clone();
    let required = original
        .get("required")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.as_str().is_some_and(|name| properties.contains_key(name)))
                .cloned()
                .collect::<Vec<_>>()
        })
        .filter(|items| !items.is_empty());

    partitioned.insert("properties".to_string(), Value::Object(properties));
    match required {
        Some(required) => {
            partitioned.insert("required".to_string(), Value::Array(required));
        }
        None => {
            partitioned.remove("required");
        }
    }
    Some(Value::Object(partitioned))
}
