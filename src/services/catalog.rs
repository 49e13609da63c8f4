//! Catalog service implementation
//!
//! Create, update, read and delete for the translatable catalog entities
//! (products, categories, ingredients, company). Every write runs the
//! normalize, validate and fan-out steps inside one store transaction.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, info};

use crate::models::entity::EntityRecord;
use crate::models::pagination::Page;
use crate::translation::listing::ListQuery;
use crate::translation::representation::{represent, OutputShape, RelatedRecords};
use crate::translation::schema::{EntityKind, EntitySchema};
use crate::translation::store::{TranslatableStore, TranslatableTx};
use crate::translation::validator::{Validator, WriteMode};
use crate::translation::{writer, Normalizer, RawPayload};
use crate::utils::errors::{MenuError, Result};
use crate::utils::logging::log_entity_write;

#[derive(Clone, Debug)]
pub struct CatalogService<S: TranslatableStore> {
    store: S,
    languages: Vec<String>,
}

impl<S: TranslatableStore> CatalogService<S> {
    pub fn new(store: S, languages: Vec<String>) -> Self {
        Self { store, languages }
    }

    fn not_found(schema: &EntitySchema, id: i64) -> MenuError {
        MenuError::NotFound {
            resource: schema.kind.label(),
            id,
        }
    }

    /// Create an entity with all supplied languages
    pub async fn create(&self, kind: EntityKind, payload: RawPayload) -> Result<EntityRecord> {
        let schema = kind.schema();
        let canonical = Normalizer::new(schema, &self.languages)
            .normalize(payload)
            .map_err(MenuError::Validation)?;

        let mut tx = self.store.begin().await?;
        let validated = Validator::new(schema, &self.languages, WriteMode::Create)
            .validate(canonical, &mut tx)
            .await?;
        let languages: Vec<String> = validated.translations.keys().cloned().collect();

        let record = writer::create(&mut tx, schema, validated).await?;
        tx.commit().await?;

        log_entity_write(kind.as_str(), record.id, "create", &as_strs(&languages));
        Ok(record)
    }

    /// Full (`Replace`) or partial (`Patch`) update of an existing entity
    pub async fn update(&self, kind: EntityKind, id: i64, payload: RawPayload, mode: WriteMode) -> Result<EntityRecord> {
        let schema = kind.schema();
        let canonical = Normalizer::new(schema, &self.languages)
            .normalize(payload)
            .map_err(MenuError::Validation)?;

        let mut tx = self.store.begin().await?;
        let existing = tx.load(schema, id).await?.ok_or_else(|| Self::not_found(schema, id))?;
        let validated = Validator::new(schema, &self.languages, mode)
            .with_existing(&existing)
            .validate(canonical, &mut tx)
            .await?;
        let languages: Vec<String> = validated.translations.keys().cloned().collect();

        let record = writer::update(&mut tx, schema, id, validated).await?;
        tx.commit().await?;

        let action = match mode {
            WriteMode::Patch => "partial_update",
            _ => "update",
        };
        log_entity_write(kind.as_str(), id, action, &as_strs(&languages));
        Ok(record)
    }

    pub async fn retrieve(&self, kind: EntityKind, id: i64) -> Result<EntityRecord> {
        let schema = kind.schema();
        self.store
            .fetch(schema, id)
            .await?
            .ok_or_else(|| Self::not_found(schema, id))
    }

    pub async fn list(&self, kind: EntityKind, query: &ListQuery) -> Result<Page<EntityRecord>> {
        debug!(entity = kind.as_str(), page = query.page.page, "Listing entities");
        self.store.list(kind.schema(), query).await
    }

    pub async fn destroy(&self, kind: EntityKind, id: i64) -> Result<()> {
        let schema = kind.schema();
        if !self.store.delete(schema, id).await? {
            return Err(Self::not_found(schema, id));
        }
        info!(entity = kind.as_str(), id, "Entity deleted");
        Ok(())
    }

    /// Render one record; the nested shape embeds related entities
    pub async fn represent(&self, record: &EntityRecord, shape: OutputShape) -> Result<Value> {
        let related = self.related_records(std::slice::from_ref(record), shape).await?;
        Ok(represent(record, shape, &related))
    }

    pub async fn represent_many(&self, records: &[EntityRecord], shape: OutputShape) -> Result<Vec<Value>> {
        let related = self.related_records(records, shape).await?;
        Ok(records
            .iter()
            .map(|record| represent(record, shape, &related))
            .collect())
    }

    async fn related_records(&self, records: &[EntityRecord], shape: OutputShape) -> Result<RelatedRecords> {
        let mut related = RelatedRecords::new();
        if shape == OutputShape::Flat {
            return Ok(related);
        }

        let mut wanted: BTreeMap<EntityKind, BTreeSet<i64>> = BTreeMap::new();
        for record in records {
            for relation in record.kind.schema().relations {
                wanted
                    .entry(relation.target)
                    .or_default()
                    .extend(record.related_ids(relation.name).iter().copied());
            }
        }

        for (kind, ids) in wanted {
            if ids.is_empty() {
                continue;
            }
            let ids: Vec<i64> = ids.into_iter().collect();
            for target in self.store.fetch_many(kind.schema(), &ids).await? {
                related.insert((kind, target.id), target);
            }
        }
        Ok(related)
    }
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}
