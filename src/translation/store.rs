//! Storage contracts for translatable entities
//!
//! Writes happen inside a [`TranslatableTx`]; dropping a transaction
//! without committing discards every write made through it.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::listing::ListQuery;
use super::schema::{EntityKind, EntitySchema, RelationField};
use crate::models::entity::{EntityRecord, FieldValue, TranslationRecord};
use crate::models::pagination::Page;
use crate::utils::errors::Result;

/// Plain field values keyed by field name
pub type PlainValues = BTreeMap<String, FieldValue>;

#[async_trait]
pub trait TranslatableStore: Clone + Send + Sync + 'static {
    type Tx: TranslatableTx;

    async fn begin(&self) -> Result<Self::Tx>;

    async fn fetch(&self, schema: &'static EntitySchema, id: i64) -> Result<Option<EntityRecord>>;

    /// Records for the ids that exist, in ascending id order
    async fn fetch_many(&self, schema: &'static EntitySchema, ids: &[i64]) -> Result<Vec<EntityRecord>>;

    async fn list(&self, schema: &'static EntitySchema, query: &ListQuery) -> Result<Page<EntityRecord>>;

    /// Delete the entity with its translations and relation rows; `false` when absent
    async fn delete(&self, schema: &'static EntitySchema, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait TranslatableTx: Send {
    /// Insert a new entity row and return its id
    async fn insert(&mut self, schema: &'static EntitySchema, plain: &PlainValues) -> Result<i64>;

    /// Assign the given plain fields; other columns keep their values
    async fn update_plain(&mut self, schema: &'static EntitySchema, id: i64, plain: &PlainValues) -> Result<()>;

    /// Replace the full membership of one relation
    async fn set_relation(
        &mut self,
        schema: &'static EntitySchema,
        id: i64,
        relation: &'static RelationField,
        ids: &[i64],
    ) -> Result<()>;

    /// Create or update one language row; only the record's fields are assigned
    async fn write_translation(&mut self, schema: &'static EntitySchema, record: &TranslationRecord) -> Result<()>;

    /// The subset of `ids` that exist for `kind`
    async fn existing_ids(&mut self, kind: EntityKind, ids: &[i64]) -> Result<Vec<i64>>;

    async fn load(&mut self, schema: &'static EntitySchema, id: i64) -> Result<Option<EntityRecord>>;

    async fn commit(self) -> Result<()>;
}
