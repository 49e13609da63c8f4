//! In-memory catalog store
//!
//! Implements the translatable storage traits over plain maps so the
//! catalog service can be exercised without PostgreSQL. A transaction
//! works on a copy of the tables; committing swaps the copy in, dropping
//! it discards every write.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use digital_menu::models::entity::{EntityRecord, FieldValue, TranslationRecord, Translations};
use digital_menu::models::pagination::Page;
use digital_menu::translation::listing::ListQuery;
use digital_menu::translation::schema::{EntityKind, EntitySchema, RelationField};
use digital_menu::translation::store::{PlainValues, TranslatableStore, TranslatableTx};
use digital_menu::{MenuError, Result};

#[derive(Debug, Clone, Default)]
pub struct Tables {
    next_ids: BTreeMap<EntityKind, i64>,
    rows: BTreeMap<(EntityKind, i64), EntityRecord>,
}

impl Tables {
    fn records(&self, kind: EntityKind) -> impl Iterator<Item = &EntityRecord> {
        self.rows
            .range((kind, i64::MIN)..=(kind, i64::MAX))
            .map(|(_, record)| record)
    }

    fn row_mut(&mut self, schema: &EntitySchema, id: i64) -> Result<&mut EntityRecord> {
        self.rows
            .get_mut(&(schema.kind, id))
            .ok_or(MenuError::NotFound {
                resource: schema.kind.label(),
                id,
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of stored entities of one kind
    pub fn count(&self, kind: EntityKind) -> usize {
        self.lock().records(kind).count()
    }

    /// Stored record as-is, bypassing the store traits
    pub fn snapshot(&self, kind: EntityKind, id: i64) -> Option<EntityRecord> {
        self.lock().rows.get(&(kind, id)).cloned()
    }
}

pub struct MemoryTx {
    shared: Arc<Mutex<Tables>>,
    working: Tables,
}

#[async_trait]
impl TranslatableStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        Ok(MemoryTx {
            shared: self.tables.clone(),
            working: self.lock().clone(),
        })
    }

    async fn fetch(&self, schema: &'static EntitySchema, id: i64) -> Result<Option<EntityRecord>> {
        Ok(self.lock().rows.get(&(schema.kind, id)).cloned())
    }

    async fn fetch_many(&self, schema: &'static EntitySchema, ids: &[i64]) -> Result<Vec<EntityRecord>> {
        let tables = self.lock();
        Ok(tables
            .records(schema.kind)
            .filter(|record| ids.contains(&record.id))
            .cloned()
            .collect())
    }

    async fn list(&self, schema: &'static EntitySchema, query: &ListQuery) -> Result<Page<EntityRecord>> {
        let tables = self.lock();
        let filters = query.effective_filters(schema);

        let mut matches: Vec<EntityRecord> = tables
            .records(schema.kind)
            .filter(|record| {
                filters
                    .iter()
                    .all(|(name, value)| record.field(name) == Some(value))
            })
            .filter(|record| {
                query
                    .related
                    .iter()
                    .all(|(relation, id)| record.related_ids(relation).contains(id))
            })
            .filter(|record| match &query.search {
                Some(term) => mentions(&record.translations, term),
                None => true,
            })
            .cloned()
            .collect();

        if let Some(ordering) = query.ordering {
            matches.sort_by(|left, right| {
                let order = compare_on(left, right, ordering.field);
                let order = if ordering.descending { order.reverse() } else { order };
                order.then(left.id.cmp(&right.id))
            });
        }

        let count = matches.len() as i64;
        let items = matches
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit() as usize)
            .collect();
        Ok(Page::new(count, items))
    }

    async fn delete(&self, schema: &'static EntitySchema, id: i64) -> Result<bool> {
        let mut tables = self.lock();
        if tables.rows.remove(&(schema.kind, id)).is_none() {
            return Ok(false);
        }

        for record in tables.rows.values_mut() {
            for relation in record.kind.schema().relations {
                if relation.target == schema.kind {
                    if let Some(ids) = record.relations.get_mut(relation.name) {
                        ids.retain(|related| *related != id);
                    }
                }
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl TranslatableTx for MemoryTx {
    async fn insert(&mut self, schema: &'static EntitySchema, plain: &PlainValues) -> Result<i64> {
        let next = self.working.next_ids.entry(schema.kind).or_insert(0);
        *next += 1;
        let id = *next;

        let fields = schema
            .plain_fields
            .iter()
            .map(|field| {
                let value = plain.get(field.name).cloned().unwrap_or(FieldValue::Null);
                (field.name.to_string(), value)
            })
            .collect();
        let relations = schema
            .relations
            .iter()
            .map(|relation| (relation.name.to_string(), Vec::new()))
            .collect();
        let now = schema.timestamps.then(Utc::now);

        self.working.rows.insert(
            (schema.kind, id),
            EntityRecord {
                kind: schema.kind,
                id,
                fields,
                relations,
                translations: Translations::new(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_plain(&mut self, schema: &'static EntitySchema, id: i64, plain: &PlainValues) -> Result<()> {
        let record = self.working.row_mut(schema, id)?;
        for (name, value) in plain {
            if schema.plain_field(name).is_some() {
                record.fields.insert(name.clone(), value.clone());
            }
        }
        if schema.timestamps {
            record.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn set_relation(
        &mut self,
        schema: &'static EntitySchema,
        id: i64,
        relation: &'static RelationField,
        ids: &[i64],
    ) -> Result<()> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        let record = self.working.row_mut(schema, id)?;
        record.relations.insert(relation.name.to_string(), ids);
        Ok(())
    }

    async fn write_translation(&mut self, schema: &'static EntitySchema, record: &TranslationRecord) -> Result<()> {
        let row = self.working.row_mut(schema, record.entity_id)?;
        let stored = row.translations.entry(record.language.clone()).or_default();
        for (name, value) in &record.fields {
            if !schema.is_translated(name) {
                continue;
            }
            match value {
                Some(text) => {
                    stored.insert(name.clone(), Some(text.clone()));
                }
                None => {
                    stored.remove(name);
                }
            }
        }
        Ok(())
    }

    async fn existing_ids(&mut self, kind: EntityKind, ids: &[i64]) -> Result<Vec<i64>> {
        let mut existing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| self.working.rows.contains_key(&(kind, *id)))
            .collect();
        existing.sort_unstable();
        existing.dedup();
        Ok(existing)
    }

    async fn load(&mut self, schema: &'static EntitySchema, id: i64) -> Result<Option<EntityRecord>> {
        Ok(self.working.rows.get(&(schema.kind, id)).cloned())
    }

    async fn commit(self) -> Result<()> {
        let mut shared = self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *shared = self.working;
        Ok(())
    }
}

fn mentions(translations: &Translations, term: &str) -> bool {
    let term = term.to_lowercase();
    translations
        .values()
        .flat_map(|fields| fields.values())
        .flatten()
        .any(|value| value.to_lowercase().contains(&term))
}

fn compare_on(left: &EntityRecord, right: &EntityRecord, field: &str) -> CmpOrdering {
    match field {
        "id" => left.id.cmp(&right.id),
        "created_at" => left.created_at.cmp(&right.created_at),
        "updated_at" => left.updated_at.cmp(&right.updated_at),
        name => compare_values(left.field(name), right.field(name)),
    }
}

fn compare_values(left: Option<&FieldValue>, right: Option<&FieldValue>) -> CmpOrdering {
    match (left, right) {
        (Some(FieldValue::Money(a)), Some(FieldValue::Money(b))) => a.cmp(b),
        (Some(FieldValue::Integer(a)), Some(FieldValue::Integer(b))) => a.cmp(b),
        (Some(FieldValue::Boolean(a)), Some(FieldValue::Boolean(b))) => a.cmp(b),
        (Some(FieldValue::Text(a)), Some(FieldValue::Text(b))) => a.cmp(b),
        // Nulls sort last, as in PostgreSQL ascending order
        (None | Some(FieldValue::Null), None | Some(FieldValue::Null)) => CmpOrdering::Equal,
        (None | Some(FieldValue::Null), _) => CmpOrdering::Greater,
        (_, None | Some(FieldValue::Null)) => CmpOrdering::Less,
        _ => CmpOrdering::Equal,
    }
}
