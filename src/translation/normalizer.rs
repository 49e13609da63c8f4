//! Request normalization
//!
//! Reduces nested-JSON and flat form payloads to a [`CanonicalRequest`].
//! Flat form keys embed the language in the key (`name_en`), nested
//! payloads carry a `translations` object keyed by language.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::canonical::{CanonicalRequest, RawPayload, RawTranslations};
use super::schema::EntitySchema;
use crate::utils::errors::FieldErrors;

pub const TRANSLATIONS_KEY: &str = "translations";

/// Normalizes payloads for one entity schema and language set
pub struct Normalizer<'a> {
    schema: &'static EntitySchema,
    languages: &'a [String],
}

impl<'a> Normalizer<'a> {
    pub fn new(schema: &'static EntitySchema, languages: &'a [String]) -> Self {
        Self { schema, languages }
    }

    /// Normalize a raw payload; shape errors are aggregated per field
    pub fn normalize(&self, payload: RawPayload) -> Result<CanonicalRequest, FieldErrors> {
        let from_form = matches!(payload, RawPayload::Form(_));
        let mut map = payload.into_map();
        let mut errors = FieldErrors::new();

        let translations = self.extract_translations(&mut map, from_form, &mut errors);
        let relations = self.extract_relations(&mut map, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        debug!(
            entity = self.schema.kind.as_str(),
            languages = translations.len(),
            relations = relations.len(),
            "Payload normalized"
        );

        Ok(CanonicalRequest {
            plain_fields: map,
            relations,
            translations,
        })
    }

    fn extract_translations(
        &self,
        map: &mut Map<String, Value>,
        from_form: bool,
        errors: &mut FieldErrors,
    ) -> RawTranslations {
        let flat = self.take_flat_keys(map);

        let Some(nested) = map.remove(TRANSLATIONS_KEY) else {
            return self.collect_flat(flat, errors);
        };

        if !flat.is_empty() {
            errors.add(
                TRANSLATIONS_KEY,
                "Provide either nested translations or flat per-language fields, not both.",
            );
            return RawTranslations::new();
        }

        let nested = match nested {
            Value::String(encoded) if from_form => match serde_json::from_str::<Value>(&encoded) {
                Ok(decoded) => decoded,
                Err(_) => {
                    errors.add(TRANSLATIONS_KEY, "Value must be valid JSON.");
                    return RawTranslations::new();
                }
            },
            other => other,
        };

        match nested {
            Value::Object(languages) => {
                let mut translations = RawTranslations::new();
                for (language, fields) in languages {
                    match fields {
                        Value::Object(fields) => {
                            translations.insert(language, fields);
                        }
                        _ => errors.add(
                            format!("{}.{}", TRANSLATIONS_KEY, language),
                            "Expected an object of translated fields.",
                        ),
                    }
                }
                translations
            }
            _ => {
                errors.add(TRANSLATIONS_KEY, "Expected an object keyed by language code.");
                RawTranslations::new()
            }
        }
    }

    /// Remove every `{field}_{lang}` key whose field is translatable.
    ///
    /// Returns `(key, language, field, value)`; the language is not checked yet.
    fn take_flat_keys(&self, map: &mut Map<String, Value>) -> Vec<(String, String, String, Value)> {
        let candidates: Vec<(String, String, String)> = map
            .keys()
            .filter_map(|key| {
                let (field, language) = key.rsplit_once('_')?;
                if self.schema.is_translated(field) && looks_like_language_code(language) {
                    Some((key.clone(), language.to_string(), field.to_string()))
                } else {
                    None
                }
            })
            .collect();

        candidates
            .into_iter()
            .filter_map(|(key, language, field)| {
                map.remove(&key).map(|value| (key, language, field, value))
            })
            .collect()
    }

    fn collect_flat(
        &self,
        flat: Vec<(String, String, String, Value)>,
        errors: &mut FieldErrors,
    ) -> RawTranslations {
        let mut translations: RawTranslations = BTreeMap::new();
        for (key, language, field, value) in flat {
            if !self.languages.iter().any(|supported| supported == &language) {
                errors.add(key, format!("Unsupported language code: {}.", language));
                continue;
            }
            translations.entry(language).or_default().insert(field, value);
        }
        translations
    }

    fn extract_relations(
        &self,
        map: &mut Map<String, Value>,
        errors: &mut FieldErrors,
    ) -> BTreeMap<String, Vec<i64>> {
        let mut relations = BTreeMap::new();
        for relation in self.schema.relations {
            let Some(value) = map.remove(relation.name) else {
                continue;
            };
            match parse_relation_ids(value) {
                Ok(ids) => {
                    relations.insert(relation.name.to_string(), ids);
                }
                Err(message) => errors.add(relation.name, message),
            }
        }
        relations
    }
}

fn looks_like_language_code(candidate: &str) -> bool {
    (2..=3).contains(&candidate.len()) && candidate.chars().all(|c| c.is_ascii_lowercase())
}

/// Parse a relation value into ids.
///
/// Accepts a JSON array, a JSON-array string, a comma-separated string,
/// or a single scalar id. A blank string is the empty list.
pub fn parse_relation_ids(value: Value) -> Result<Vec<i64>, String> {
    match value {
        Value::Array(items) => items.iter().map(parse_id).collect(),
        Value::String(text) => parse_relation_string(&text),
        Value::Number(_) => parse_id(&value).map(|id| vec![id]),
        Value::Null => Err("This field may not be null.".to_string()),
        _ => Err("Expected a list of ids.".to_string()),
    }
}

fn parse_relation_string(text: &str) -> Result<Vec<i64>, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
        return items.iter().map(parse_id).collect();
    }

    trimmed
        .split(',')
        .map(|token| {
            token
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("Invalid id list: {:?}.", text))
        })
        .collect()
}

fn parse_id(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| format!("Incorrect type. Expected pk value, received {}.", number)),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("Incorrect type. Expected pk value, received {:?}.", text)),
        other => Err(format!("Incorrect type. Expected pk value, received {}.", other)),
    }
}
