//! Inbound payload shapes and the canonical write request

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// A write payload as received, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// A JSON object body
    Json(Map<String, Value>),
    /// Form or multipart text fields in arrival order; keys may repeat
    Form(Vec<(String, String)>),
}

impl RawPayload {
    /// Set or replace a single-valued key, e.g. a stored upload path
    pub fn set(&mut self, key: &str, value: String) {
        match self {
            RawPayload::Json(map) => {
                map.insert(key.to_string(), Value::String(value));
            }
            RawPayload::Form(pairs) => {
                pairs.retain(|(existing, _)| existing != key);
                pairs.push((key.to_string(), value));
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match self {
            RawPayload::Json(map) => map.contains_key(key),
            RawPayload::Form(pairs) => pairs.iter().any(|(existing, _)| existing == key),
        }
    }

    /// Flatten into a JSON object
    ///
    /// Form keys that occur once become strings; repeated keys become lists
    /// of strings in arrival order. JSON objects are returned unchanged.
    pub fn into_map(self) -> Map<String, Value> {
        match self {
            RawPayload::Json(map) => map,
            RawPayload::Form(pairs) => flatten_form(pairs),
        }
    }
}

fn flatten_form(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in pairs {
        grouped.entry(key).or_default().push(value);
    }

    grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                Value::String(values.remove(0))
            } else {
                Value::Array(values.into_iter().map(Value::String).collect())
            };
            (key, value)
        })
        .collect()
}

/// Translation values per language as supplied, before validation
pub type RawTranslations = BTreeMap<String, Map<String, Value>>;

/// The single shape every write path is reduced to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRequest {
    /// Non-translatable, non-relational fields exactly as supplied
    pub plain_fields: Map<String, Value>,
    /// Relation name to ids, only for relations present in the payload
    pub relations: BTreeMap<String, Vec<i64>>,
    /// Language code to translatable field values
    pub translations: RawTranslations,
}

impl CanonicalRequest {
    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }
}
