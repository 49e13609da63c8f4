//! List query parameters for translatable entities

use std::collections::HashMap;

use super::coerce;
use super::schema::{EntitySchema, FieldType};
use crate::config::PaginationConfig;
use crate::models::entity::FieldValue;
use crate::models::pagination::PageRequest;
use crate::utils::errors::{FieldErrors, Result};
use crate::utils::helpers::calculate_offset;

const TIMESTAMP_COLUMNS: [&str; 2] = ["created_at", "updated_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: &'static str,
    pub descending: bool,
}

/// Filters, search, ordering and paging for one list request
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Exact matches on plain fields
    pub filters: Vec<(&'static str, FieldValue)>,
    /// Relation membership: relation name and related id
    pub related: Vec<(&'static str, i64)>,
    /// Case-insensitive substring over every translated field in any language
    pub search: Option<String>,
    pub ordering: Option<Ordering>,
    pub page: PageRequest,
}

impl ListQuery {
    pub fn new(page: PageRequest) -> Self {
        Self {
            filters: Vec::new(),
            related: Vec::new(),
            search: None,
            ordering: None,
            page,
        }
    }

    /// Build from query-string parameters; unknown parameters are ignored
    pub fn from_params(
        schema: &'static EntitySchema,
        params: &HashMap<String, String>,
        pagination: &PaginationConfig,
    ) -> Result<Self> {
        let mut errors = FieldErrors::new();
        let mut query = ListQuery::new(parse_page(params, pagination, &mut errors));

        for field in schema.plain_fields.iter().filter(|field| field.filterable) {
            let Some(raw) = params.get(field.name) else {
                continue;
            };
            let value = serde_json::Value::String(raw.clone());
            let coerced = match field.field_type {
                FieldType::Boolean => coerce::boolean(&value).map(FieldValue::Boolean),
                FieldType::Integer { .. } => coerce::integer(&value).map(FieldValue::Integer),
                _ => coerce::text(&value).map(FieldValue::Text),
            };
            match coerced {
                Ok(value) => query.filters.push((field.name, value)),
                Err(message) => errors.add(field.name, message),
            }
        }

        for relation in schema.relations {
            let Some(raw) = params.get(relation.name) else {
                continue;
            };
            match raw.trim().parse::<i64>() {
                Ok(id) => query.related.push((relation.name, id)),
                Err(_) => errors.add(
                    relation.name,
                    "Select a valid choice. That choice is not one of the available choices.",
                ),
            }
        }

        query.search = params
            .get("search")
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty());

        if let Some(raw) = params.get("ordering") {
            query.ordering = parse_ordering(schema, raw);
        }

        errors.into_result()?;
        Ok(query)
    }

    /// Filters including the schema's default list scope
    ///
    /// The scope applies only when the caller did not filter on that field.
    pub fn effective_filters(&self, schema: &EntitySchema) -> Vec<(&'static str, FieldValue)> {
        let mut filters = self.filters.clone();
        if let Some((field, value)) = schema.list_scope {
            if !filters.iter().any(|(name, _)| *name == field) {
                filters.push((field, FieldValue::Boolean(value)));
            }
        }
        filters
    }
}

/// `page` and `page_size` parameters alone, for lists without filters
pub fn page_from_params(params: &HashMap<String, String>, pagination: &PaginationConfig) -> Result<PageRequest> {
    let mut errors = FieldErrors::new();
    let page = parse_page(params, pagination, &mut errors);
    errors.into_result()?;
    Ok(page)
}

fn parse_page(params: &HashMap<String, String>, pagination: &PaginationConfig, errors: &mut FieldErrors) -> PageRequest {
    let mut page_number = parse_positive(params.get("page"), "page", 1, errors);
    let page_size = parse_positive(params.get("page_size"), "page_size", pagination.page_size, errors)
        .min(pagination.max_page_size);
    if calculate_offset(page_number, page_size).is_none() {
        errors.add("page", "Invalid page.");
        page_number = 1;
    }
    PageRequest::new(page_number, page_size)
}

fn parse_positive(raw: Option<&String>, name: &str, default: i64, errors: &mut FieldErrors) -> i64 {
    match raw {
        None => default,
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(value) if value >= 1 => value,
            _ => {
                errors.add(name, "A valid positive integer is required.");
                default
            }
        },
    }
}

/// `price`, `-created_at`, ...; unknown fields are ignored
fn parse_ordering(schema: &'static EntitySchema, raw: &str) -> Option<Ordering> {
    let raw = raw.split(',').next()?.trim();
    let (descending, name) = match raw.strip_prefix('-') {
        Some(name) => (true, name),
        None => (false, raw),
    };

    if name == "id" {
        return Some(Ordering {
            field: "id",
            descending,
        });
    }

    if schema.timestamps {
        if let Some(column) = TIMESTAMP_COLUMNS.iter().find(|column| **column == name) {
            return Some(Ordering {
                field: *column,
                descending,
            });
        }
    }

    schema
        .plain_fields
        .iter()
        .find(|field| field.orderable && field.name == name)
        .map(|field| Ordering {
            field: field.name,
            descending,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::schema::EntityKind;

    fn pagination() -> PaginationConfig {
        PaginationConfig {
            page_size: 10,
            max_page_size: 50,
        }
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_product_list_defaults_to_available() {
        let schema = EntityKind::Product.schema();
        let query = ListQuery::from_params(schema, &params(&[]), &pagination()).unwrap();
        assert_eq!(
            query.effective_filters(schema),
            vec![("available", FieldValue::Boolean(true))]
        );
        assert_eq!(query.page, PageRequest::new(1, 10));
    }

    #[test]
    fn test_explicit_available_filter_overrides_scope() {
        let schema = EntityKind::Product.schema();
        let query =
            ListQuery::from_params(schema, &params(&[("available", "false")]), &pagination()).unwrap();
        assert_eq!(
            query.effective_filters(schema),
            vec![("available", FieldValue::Boolean(false))]
        );
    }

    #[test]
    fn test_relation_search_and_ordering() {
        let schema = EntityKind::Product.schema();
        let query = ListQuery::from_params(
            schema,
            &params(&[
                ("categories", "2"),
                ("search", " café "),
                ("ordering", "-price"),
                ("page", "2"),
            ]),
            &pagination(),
        )
        .unwrap();

        assert_eq!(query.related, vec![("categories", 2)]);
        assert_eq!(query.search.as_deref(), Some("café"));
        assert_eq!(
            query.ordering,
            Some(Ordering {
                field: "price",
                descending: true
            })
        );
        assert_eq!(query.page.offset(), 10);
    }

    #[test]
    fn test_unknown_ordering_is_ignored() {
        let schema = EntityKind::Ingredient.schema();
        let query =
            ListQuery::from_params(schema, &params(&[("ordering", "created_at")]), &pagination())
                .unwrap();
        assert_eq!(query.ordering, None);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let schema = EntityKind::Product.schema();
        let err = ListQuery::from_params(
            schema,
            &params(&[("available", "perhaps"), ("page", "zero")]),
            &pagination(),
        )
        .unwrap_err();
        match err {
            crate::utils::errors::MenuError::Validation(errors) => {
                assert!(errors.contains("available"));
                assert!(errors.contains("page"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_page_only_params() {
        let page = page_from_params(&params(&[("page", "3"), ("search", "x")]), &pagination()).unwrap();
        assert_eq!(page, PageRequest::new(3, 10));
        assert!(page_from_params(&params(&[("page", "-1")]), &pagination()).is_err());
    }

    #[test]
    fn test_page_past_offset_range_is_rejected() {
        let schema = EntityKind::Category.schema();
        let huge = i64::MAX.to_string();
        let err = ListQuery::from_params(schema, &params(&[("page", huge.as_str())]), &pagination()).unwrap_err();
        match err {
            crate::utils::errors::MenuError::Validation(errors) => assert!(errors.contains("page")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(page_from_params(&params(&[("page", huge.as_str())]), &pagination()).is_err());

        // Largest page whose offset still fits
        let last = (i64::MAX / 10 + 1).to_string();
        let query = ListQuery::from_params(schema, &params(&[("page", last.as_str())]), &pagination()).unwrap();
        assert!(query.page.offset() > 0);
    }

    #[test]
    fn test_page_size_is_capped() {
        let schema = EntityKind::Category.schema();
        let query =
            ListQuery::from_params(schema, &params(&[("page_size", "500")]), &pagination()).unwrap();
        assert_eq!(query.page.page_size, 50);
    }
}
