//! Stored translatable entity model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::translation::schema::EntityKind;
use crate::utils::helpers::format_decimal;

/// Translatable field values for one language; `None` clears a field.
pub type TranslationFields = BTreeMap<String, Option<String>>;

/// Language code to field values
pub type Translations = BTreeMap<String, TranslationFields>;

/// Coerced value of a plain field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Money(Decimal),
    Integer(i64),
    Boolean(bool),
    Text(String),
    Null,
}

impl FieldValue {
    /// JSON rendering; money is rendered as a two-decimal string
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Money(value) => Value::String(format_decimal(*value)),
            FieldValue::Integer(value) => Value::from(*value),
            FieldValue::Boolean(value) => Value::Bool(*value),
            FieldValue::Text(value) => Value::String(value.clone()),
            FieldValue::Null => Value::Null,
        }
    }
}

/// One language's row in a translation table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRecord {
    pub entity_id: i64,
    pub language: String,
    /// Only the fields supplied by the caller; absent fields are left untouched
    pub fields: TranslationFields,
}

impl TranslationRecord {
    pub fn new(entity_id: i64, language: impl Into<String>, fields: TranslationFields) -> Self {
        Self {
            entity_id,
            language: language.into(),
            fields,
        }
    }
}

/// A translatable entity as loaded from storage
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub id: i64,
    pub fields: BTreeMap<String, FieldValue>,
    /// Related ids per relation name, ascending
    pub relations: BTreeMap<String, Vec<i64>>,
    /// Stored translations; fields holding no value are omitted
    pub translations: Translations,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EntityRecord {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn related_ids(&self, relation: &str) -> &[i64] {
        self.relations.get(relation).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_language(&self, language: &str) -> bool {
        self.translations.contains_key(language)
    }

    /// Stored value of a translatable field in exactly `language`
    pub fn translation(&self, language: &str, field: &str) -> Option<&str> {
        self.translations
            .get(language)
            .and_then(|fields| fields.get(field))
            .and_then(|value| value.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_renders_two_decimals() {
        assert_eq!(FieldValue::Money(Decimal::new(5, 0)).to_json(), Value::String("5.00".into()));
        assert_eq!(FieldValue::Null.to_json(), Value::Null);
    }

    #[test]
    fn test_translation_lookup_does_not_fall_back() {
        let mut translations = Translations::new();
        translations.insert(
            "es".to_string(),
            BTreeMap::from([("name".to_string(), Some("Bebidas".to_string()))]),
        );
        let record = EntityRecord {
            kind: EntityKind::Category,
            id: 1,
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
            translations,
            created_at: None,
            updated_at: None,
        };

        assert_eq!(record.translation("es", "name"), Some("Bebidas"));
        assert_eq!(record.translation("en", "name"), None);
        assert!(record.related_ids("categories").is_empty());
    }
}
