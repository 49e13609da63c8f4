//! PostgreSQL store for translatable entities
//!
//! Each entity lives in its base table, one row per language in its
//! translation table (unique on `master_id, language_code`) and one join
//! table per relation. Column names are only ever taken from the static
//! entity schemas, never from request data.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::debug;

use super::connection::map_constraint_error;
use crate::models::entity::{EntityRecord, FieldValue, TranslationRecord, Translations};
use crate::models::pagination::Page;
use crate::translation::listing::ListQuery;
use crate::translation::schema::{EntityKind, EntitySchema, FieldType, PlainField, RelationField};
use crate::translation::store::{PlainValues, TranslatableStore, TranslatableTx};
use crate::utils::errors::Result;
use crate::utils::logging::log_database_operation;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TranslatableStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        Ok(PgTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn fetch(&self, schema: &'static EntitySchema, id: i64) -> Result<Option<EntityRecord>> {
        let mut conn = self.pool.acquire().await?;
        Ok(load_records(&mut conn, schema, &[id]).await?.pop())
    }

    async fn fetch_many(&self, schema: &'static EntitySchema, ids: &[i64]) -> Result<Vec<EntityRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.acquire().await?;
        load_records(&mut conn, schema, ids).await
    }

    async fn list(&self, schema: &'static EntitySchema, query: &ListQuery) -> Result<Page<EntityRecord>> {
        let started = Instant::now();
        let mut conn = self.pool.acquire().await?;

        let mut count_query = filtered_query("SELECT COUNT(*)", schema, query);
        let count: i64 = count_query.build().fetch_one(&mut *conn).await?.try_get(0)?;

        let mut ids_query = filtered_query("SELECT e.id", schema, query);
        match query.ordering {
            Some(ordering) => {
                ids_query.push(format!(
                    " ORDER BY e.{} {}, e.id ASC",
                    ordering.field,
                    if ordering.descending { "DESC" } else { "ASC" }
                ));
            }
            None => {
                ids_query.push(" ORDER BY e.id ASC");
            }
        }
        ids_query.push(" LIMIT ");
        ids_query.push_bind(query.page.limit());
        ids_query.push(" OFFSET ");
        ids_query.push_bind(query.page.offset());

        let ids: Vec<i64> = ids_query
            .build()
            .fetch_all(&mut *conn)
            .await?
            .iter()
            .map(|row| row.try_get::<i64, _>(0))
            .collect::<std::result::Result<_, _>>()?;

        let mut by_id: HashMap<i64, EntityRecord> = load_records(&mut conn, schema, &ids)
            .await?
            .into_iter()
            .map(|record| (record.id, record))
            .collect();
        let items = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        log_database_operation("list", schema.table, started.elapsed().as_millis() as u64, true);
        Ok(Page::new(count, items))
    }

    async fn delete(&self, schema: &'static EntitySchema, id: i64) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", schema.table))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                map_constraint_error(
                    error,
                    &format!("{} {} is still referenced and cannot be deleted.", schema.kind.label(), id),
                )
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TranslatableTx for PgTx {
    async fn insert(&mut self, schema: &'static EntitySchema, plain: &PlainValues) -> Result<i64> {
        let present: Vec<(&'static PlainField, &FieldValue)> = present_fields(schema, plain);

        let mut query = QueryBuilder::<Postgres>::new(format!("INSERT INTO {} ", schema.table));
        if present.is_empty() {
            query.push("DEFAULT VALUES");
        } else {
            let columns: Vec<&str> = present.iter().map(|(field, _)| field.name).collect();
            query.push(format!("({}) VALUES (", columns.join(", ")));
            for (index, (field, value)) in present.iter().enumerate() {
                if index > 0 {
                    query.push(", ");
                }
                push_bind_value(&mut query, field, value);
            }
            query.push(")");
        }
        query.push(" RETURNING id");

        let row = query.build().fetch_one(&mut *self.tx).await?;
        Ok(row.try_get("id")?)
    }

    async fn update_plain(&mut self, schema: &'static EntitySchema, id: i64, plain: &PlainValues) -> Result<()> {
        let present = present_fields(schema, plain);
        if present.is_empty() && !schema.timestamps {
            return Ok(());
        }

        let mut query = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", schema.table));
        for (index, (field, value)) in present.iter().enumerate() {
            if index > 0 {
                query.push(", ");
            }
            query.push(format!("{} = ", field.name));
            push_bind_value(&mut query, field, value);
        }
        if schema.timestamps {
            if !present.is_empty() {
                query.push(", ");
            }
            query.push("updated_at = NOW()");
        }
        query.push(" WHERE id = ");
        query.push_bind(id);

        query.build().execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn set_relation(
        &mut self,
        _schema: &'static EntitySchema,
        id: i64,
        relation: &'static RelationField,
        ids: &[i64],
    ) -> Result<()> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = $1",
            relation.join_table, relation.owner_column
        ))
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        if !ids.is_empty() {
            sqlx::query(&format!(
                "INSERT INTO {table} ({owner}, {target}) SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
                table = relation.join_table,
                owner = relation.owner_column,
                target = relation.target_column,
            ))
            .bind(id)
            .bind(ids.to_vec())
            .execute(&mut *self.tx)
            .await?;
        }

        debug!(relation = relation.name, id, count = ids.len(), "Relation replaced");
        Ok(())
    }

    async fn write_translation(&mut self, schema: &'static EntitySchema, record: &TranslationRecord) -> Result<()> {
        let present: Vec<(&'static str, Option<String>)> = schema
            .translated_fields
            .iter()
            .filter_map(|field| {
                record
                    .fields
                    .get(field.name)
                    .map(|value| (field.name, value.clone()))
            })
            .collect();
        if present.is_empty() {
            return Ok(());
        }

        // Single upsert so concurrent writers of a new language both succeed
        let columns: Vec<&str> = present.iter().map(|(name, _)| *name).collect();
        let mut upsert = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} (master_id, language_code, {}) VALUES (",
            schema.translation_table,
            columns.join(", ")
        ));
        upsert.push_bind(record.entity_id);
        upsert.push(", ");
        upsert.push_bind(record.language.clone());
        for (_, value) in present {
            upsert.push(", ");
            upsert.push_bind(value);
        }
        upsert.push(") ON CONFLICT (master_id, language_code) DO UPDATE SET ");
        upsert.push(
            columns
                .iter()
                .map(|column| format!("{column} = EXCLUDED.{column}"))
                .collect::<Vec<_>>()
                .join(", "),
        );
        upsert.build().execute(&mut *self.tx).await?;

        Ok(())
    }

    async fn existing_ids(&mut self, kind: EntityKind, ids: &[i64]) -> Result<Vec<i64>> {
        let existing = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT id FROM {} WHERE id = ANY($1) ORDER BY id",
            kind.schema().table
        ))
        .bind(ids.to_vec())
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(existing)
    }

    async fn load(&mut self, schema: &'static EntitySchema, id: i64) -> Result<Option<EntityRecord>> {
        Ok(load_records(&mut self.tx, schema, &[id]).await?.pop())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn present_fields<'v>(
    schema: &'static EntitySchema,
    plain: &'v PlainValues,
) -> Vec<(&'static PlainField, &'v FieldValue)> {
    schema
        .plain_fields
        .iter()
        .filter_map(|field| plain.get(field.name).map(|value| (field, value)))
        .collect()
}

fn push_bind_value(query: &mut QueryBuilder<'_, Postgres>, field: &PlainField, value: &FieldValue) {
    match value {
        FieldValue::Money(amount) => {
            query.push_bind(*amount);
        }
        FieldValue::Integer(number) => {
            query.push_bind(*number);
        }
        FieldValue::Boolean(flag) => {
            query.push_bind(*flag);
        }
        FieldValue::Text(text) => {
            query.push_bind(text.clone());
        }
        FieldValue::Null => match field.field_type {
            FieldType::Money { .. } => {
                query.push_bind(None::<Decimal>);
            }
            FieldType::Integer { .. } => {
                query.push_bind(None::<i64>);
            }
            FieldType::Boolean => {
                query.push_bind(None::<bool>);
            }
            _ => {
                query.push_bind(None::<String>);
            }
        },
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn filtered_query(
    select: &str,
    schema: &'static EntitySchema,
    query: &ListQuery,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("{} FROM {} e WHERE TRUE", select, schema.table));

    for (name, value) in query.effective_filters(schema) {
        let Some(field) = schema.plain_field(name) else {
            continue;
        };
        builder.push(format!(" AND e.{} = ", field.name));
        push_bind_value(&mut builder, field, &value);
    }

    for (name, id) in &query.related {
        let Some(relation) = schema.relation(name) else {
            continue;
        };
        builder.push(format!(
            " AND EXISTS (SELECT 1 FROM {table} r WHERE r.{owner} = e.id AND r.{target} = ",
            table = relation.join_table,
            owner = relation.owner_column,
            target = relation.target_column,
        ));
        builder.push_bind(*id);
        builder.push(")");
    }

    if let Some(term) = &query.search {
        let pattern = format!("%{}%", escape_like(term));
        builder.push(format!(
            " AND EXISTS (SELECT 1 FROM {} t WHERE t.master_id = e.id AND (",
            schema.translation_table
        ));
        for (index, field) in schema.translated_fields.iter().enumerate() {
            if index > 0 {
                builder.push(" OR ");
            }
            builder.push(format!("t.{} ILIKE ", field.name));
            builder.push_bind(pattern.clone());
        }
        builder.push("))");
    }

    builder
}

async fn load_records(
    conn: &mut PgConnection,
    schema: &'static EntitySchema,
    ids: &[i64],
) -> Result<Vec<EntityRecord>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut columns = vec!["id"];
    columns.extend(schema.plain_fields.iter().map(|field| field.name));
    if schema.timestamps {
        columns.extend(["created_at", "updated_at"]);
    }

    let rows = sqlx::query(&format!(
        "SELECT {} FROM {} WHERE id = ANY($1) ORDER BY id",
        columns.join(", "),
        schema.table
    ))
    .bind(ids.to_vec())
    .fetch_all(&mut *conn)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(decode_record(schema, row)?);
    }
    if records.is_empty() {
        return Ok(records);
    }

    let found: Vec<i64> = records.iter().map(|record| record.id).collect();
    let mut translations = load_translations(conn, schema, &found).await?;
    let mut relations = load_relations(conn, schema, &found).await?;

    for record in &mut records {
        record.translations = translations.remove(&record.id).unwrap_or_default();
        record.relations = relations.remove(&record.id).unwrap_or_else(|| {
            schema
                .relations
                .iter()
                .map(|relation| (relation.name.to_string(), Vec::new()))
                .collect()
        });
    }

    Ok(records)
}

fn decode_record(schema: &'static EntitySchema, row: &PgRow) -> Result<EntityRecord> {
    let mut fields = BTreeMap::new();
    for field in schema.plain_fields {
        let value = match field.field_type {
            FieldType::Money { .. } => row
                .try_get::<Option<Decimal>, _>(field.name)?
                .map(FieldValue::Money),
            FieldType::Integer { .. } => row
                .try_get::<Option<i64>, _>(field.name)?
                .map(FieldValue::Integer),
            FieldType::Boolean => row
                .try_get::<Option<bool>, _>(field.name)?
                .map(FieldValue::Boolean),
            FieldType::Text { .. } | FieldType::Email { .. } | FieldType::Media { .. } => row
                .try_get::<Option<String>, _>(field.name)?
                .map(FieldValue::Text),
        };
        fields.insert(field.name.to_string(), value.unwrap_or(FieldValue::Null));
    }

    let (created_at, updated_at) = if schema.timestamps {
        (Some(row.try_get("created_at")?), Some(row.try_get("updated_at")?))
    } else {
        (None, None)
    };

    Ok(EntityRecord {
        kind: schema.kind,
        id: row.try_get("id")?,
        fields,
        relations: BTreeMap::new(),
        translations: Translations::new(),
        created_at,
        updated_at,
    })
}

async fn load_translations(
    conn: &mut PgConnection,
    schema: &'static EntitySchema,
    ids: &[i64],
) -> Result<HashMap<i64, Translations>> {
    let columns: Vec<&str> = schema.translated_fields.iter().map(|field| field.name).collect();
    let rows = sqlx::query(&format!(
        "SELECT master_id, language_code, {} FROM {} WHERE master_id = ANY($1) ORDER BY master_id, language_code",
        columns.join(", "),
        schema.translation_table
    ))
    .bind(ids.to_vec())
    .fetch_all(&mut *conn)
    .await?;

    let mut by_entity: HashMap<i64, Translations> = HashMap::new();
    for row in &rows {
        let master_id: i64 = row.try_get("master_id")?;
        let language: String = row.try_get("language_code")?;
        let mut fields = BTreeMap::new();
        for field in schema.translated_fields {
            if let Some(value) = row.try_get::<Option<String>, _>(field.name)? {
                fields.insert(field.name.to_string(), Some(value));
            }
        }
        by_entity.entry(master_id).or_default().insert(language, fields);
    }

    Ok(by_entity)
}

async fn load_relations(
    conn: &mut PgConnection,
    schema: &'static EntitySchema,
    ids: &[i64],
) -> Result<HashMap<i64, BTreeMap<String, Vec<i64>>>> {
    let mut by_entity: HashMap<i64, BTreeMap<String, Vec<i64>>> = HashMap::new();
    if schema.relations.is_empty() {
        return Ok(by_entity);
    }

    for id in ids {
        let entry = by_entity.entry(*id).or_default();
        for relation in schema.relations {
            entry.insert(relation.name.to_string(), Vec::new());
        }
    }

    for relation in schema.relations {
        let pairs = sqlx::query_as::<_, (i64, i64)>(&format!(
            "SELECT {owner}, {target} FROM {table} WHERE {owner} = ANY($1) ORDER BY {owner}, {target}",
            owner = relation.owner_column,
            target = relation.target_column,
            table = relation.join_table,
        ))
        .bind(ids.to_vec())
        .fetch_all(&mut *conn)
        .await?;

        for (owner, target) in pairs {
            if let Some(related) = by_entity
                .get_mut(&owner)
                .and_then(|relations| relations.get_mut(relation.name))
            {
                related.push(target);
            }
        }
    }

    Ok(by_entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }

    #[test]
    fn test_filtered_query_uses_schema_columns() {
        let schema = EntityKind::Product.schema();
        let mut query = ListQuery::new(crate::models::pagination::PageRequest::new(1, 10));
        query.related.push(("categories", 3));
        query.search = Some("café".to_string());

        let builder = filtered_query("SELECT e.id", schema, &query);
        let sql = builder.sql();
        assert!(sql.contains("e.available = $1"));
        assert!(sql.contains("product_categories r"));
        assert!(sql.contains("t.name ILIKE"));
        assert!(sql.contains("t.description ILIKE"));
    }
}
