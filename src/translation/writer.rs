//! Translation fan-out writer
//!
//! Persists a validated request: plain fields once, each present relation
//! once, then one translation row per supplied language. The caller owns
//! the transaction, so a failure in any step leaves nothing behind.

use tracing::debug;

use super::schema::EntitySchema;
use super::store::TranslatableTx;
use super::validator::ValidatedRequest;
use crate::models::entity::{EntityRecord, TranslationFields, TranslationRecord};
use crate::utils::errors::{MenuError, Result};

/// Build the row for one language; the language is always explicit
pub fn write_translation(
    entity_id: i64,
    language: &str,
    fields: TranslationFields,
) -> TranslationRecord {
    TranslationRecord::new(entity_id, language, fields)
}

/// Insert a new entity and fan its translations out per language
pub async fn create<T: TranslatableTx>(
    tx: &mut T,
    schema: &'static EntitySchema,
    request: ValidatedRequest,
) -> Result<EntityRecord> {
    let id = tx.insert(schema, &request.plain).await?;
    debug!(entity = schema.kind.as_str(), id, "Entity row inserted");

    apply_relations_and_translations(tx, schema, id, request).await?;

    tx.load(schema, id).await?.ok_or(MenuError::NotFound {
        resource: schema.kind.label(),
        id,
    })
}

/// Merge a validated request into an existing entity
///
/// Only supplied plain fields, supplied relations and supplied languages change.
pub async fn update<T: TranslatableTx>(
    tx: &mut T,
    schema: &'static EntitySchema,
    id: i64,
    request: ValidatedRequest,
) -> Result<EntityRecord> {
    tx.update_plain(schema, id, &request.plain).await?;

    apply_relations_and_translations(tx, schema, id, request).await?;

    tx.load(schema, id).await?.ok_or(MenuError::NotFound {
        resource: schema.kind.label(),
        id,
    })
}

async fn apply_relations_and_translations<T: TranslatableTx>(
    tx: &mut T,
    schema: &'static EntitySchema,
    id: i64,
    request: ValidatedRequest,
) -> Result<()> {
    for (name, ids) in &request.relations {
        let relation = schema.relation(name).ok_or_else(|| {
            MenuError::InvalidInput(format!("Unknown relation for {}: {}", schema.kind, name))
        })?;
        tx.set_relation(schema, id, relation, ids).await?;
    }

    for (language, fields) in request.translations {
        if fields.is_empty() {
            continue;
        }
        let record = write_translation(id, &language, fields);
        tx.write_translation(schema, &record).await?;
        debug!(
            entity = schema.kind.as_str(),
            id,
            language = %record.language,
            "Translation written"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_write_translation_is_pure() {
        let fields = BTreeMap::from([("name".to_string(), Some("Entradas".to_string()))]);
        let first = write_translation(4, "es", fields.clone());
        let second = write_translation(4, "es", fields);
        assert_eq!(first, second);
        assert_eq!(first.language, "es");
        assert_eq!(first.entity_id, 4);
    }
}
