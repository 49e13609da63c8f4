//! Outbound JSON rendering of translatable entities

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use super::schema::EntityKind;
use crate::models::entity::{EntityRecord, FieldValue};
use crate::utils::helpers::format_price;

/// How an entity is rendered in a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// Reads: related entities embedded in full, currency fields formatted
    Nested,
    /// Write responses: related ids, stored values as-is
    Flat,
}

/// Related entities available for embedding, keyed by kind and id
pub type RelatedRecords = BTreeMap<(EntityKind, i64), EntityRecord>;

pub fn represent(record: &EntityRecord, shape: OutputShape, related: &RelatedRecords) -> Value {
    let schema = record.kind.schema();
    let mut object = Map::new();
    object.insert("id".to_string(), json!(record.id));

    for field in schema.plain_fields {
        let value = match record.field(field.name) {
            Some(FieldValue::Money(amount)) if field.currency && shape == OutputShape::Nested => {
                Value::String(format_price(*amount))
            }
            Some(value) => value.to_json(),
            None => Value::Null,
        };
        object.insert(field.name.to_string(), value);
    }

    for relation in schema.relations {
        let ids = record.related_ids(relation.name);
        let value = match shape {
            OutputShape::Flat => json!(ids),
            OutputShape::Nested => Value::Array(
                ids.iter()
                    .filter_map(|id| related.get(&(relation.target, *id)))
                    .map(|target| represent(target, OutputShape::Nested, related))
                    .collect(),
            ),
        };
        object.insert(relation.name.to_string(), value);
    }

    object.insert("translations".to_string(), translations_json(record));

    if schema.timestamps {
        object.insert("created_at".to_string(), json!(record.created_at));
        object.insert("updated_at".to_string(), json!(record.updated_at));
    }

    Value::Object(object)
}

fn translations_json(record: &EntityRecord) -> Value {
    let languages: Map<String, Value> = record
        .translations
        .iter()
        .map(|(language, fields)| {
            let fields: Map<String, Value> = fields
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .as_ref()
                        .map(|text| (name.clone(), Value::String(text.clone())))
                })
                .collect();
            (language.clone(), Value::Object(fields))
        })
        .collect();
    Value::Object(languages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn category(id: i64, name_es: &str) -> EntityRecord {
        EntityRecord {
            kind: EntityKind::Category,
            id,
            fields: BTreeMap::from([("image".to_string(), FieldValue::Null)]),
            relations: BTreeMap::new(),
            translations: BTreeMap::from([(
                "es".to_string(),
                BTreeMap::from([("name".to_string(), Some(name_es.to_string()))]),
            )]),
            created_at: None,
            updated_at: None,
        }
    }

    fn product() -> EntityRecord {
        EntityRecord {
            kind: EntityKind::Product,
            id: 9,
            fields: BTreeMap::from([
                ("price".to_string(), FieldValue::Money(Decimal::new(899, 2))),
                ("stock".to_string(), FieldValue::Integer(3)),
                ("available".to_string(), FieldValue::Boolean(true)),
                ("image".to_string(), FieldValue::Null),
            ]),
            relations: BTreeMap::from([
                ("categories".to_string(), vec![1]),
                ("ingredients".to_string(), vec![]),
            ]),
            translations: BTreeMap::from([(
                "en".to_string(),
                BTreeMap::from([
                    ("name".to_string(), Some("Coffee".to_string())),
                    ("description".to_string(), None),
                ]),
            )]),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_nested_shape_formats_price_and_embeds_relations() {
        let related = RelatedRecords::from([((EntityKind::Category, 1), category(1, "Bebidas"))]);
        let value = represent(&product(), OutputShape::Nested, &related);

        assert_eq!(value["price"], json!("8.99 €"));
        assert_eq!(value["categories"][0]["translations"]["es"]["name"], json!("Bebidas"));
        assert_eq!(value["ingredients"], json!([]));
    }

    #[test]
    fn test_flat_shape_keeps_ids_and_raw_price() {
        let value = represent(&product(), OutputShape::Flat, &RelatedRecords::new());
        assert_eq!(value["price"], json!("8.99"));
        assert_eq!(value["categories"], json!([1]));
    }

    #[test]
    fn test_unset_translated_fields_are_absent() {
        let value = represent(&product(), OutputShape::Nested, &RelatedRecords::new());
        assert_eq!(value["translations"], json!({ "en": { "name": "Coffee" } }));
    }

    #[test]
    fn test_entities_without_timestamps_omit_them() {
        let mut ingredient = category(2, "Gluten");
        ingredient.kind = EntityKind::Ingredient;
        let value = represent(&ingredient, OutputShape::Nested, &RelatedRecords::new());
        assert!(value.get("created_at").is_none());
        assert!(value.get("icon").is_some());
    }
}
