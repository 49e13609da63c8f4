//! Field-level validation of canonical requests
//!
//! Coerces plain fields, checks translations against the supported
//! languages and translatable fields, and confirms that related ids exist.
//! Every problem is collected before anything is returned, keyed by field
//! (`price`, `categories`, `translations.en.name`, ...).

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::canonical::CanonicalRequest;
use super::coerce::{self, NOT_BLANK, NOT_NULL, REQUIRED};
use super::schema::{EntitySchema, FieldDefault, FieldType, PlainField, TranslatedField};
use super::store::{PlainValues, TranslatableTx};
use crate::models::entity::{EntityRecord, FieldValue, TranslationFields, Translations};
use crate::utils::errors::{FieldErrors, Result};
use crate::utils::helpers::is_valid_email;

/// How a write treats fields the caller did not send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// New entity: required fields must be present, defaults fill the rest
    Create,
    /// Full update: required fields must be present
    Replace,
    /// Partial update: only supplied fields are checked
    Patch,
}

impl WriteMode {
    fn requires_all(self) -> bool {
        matches!(self, WriteMode::Create | WriteMode::Replace)
    }
}

/// A canonical request whose values are typed and checked
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedRequest {
    pub plain: PlainValues,
    /// Deduplicated ids per relation present in the request
    pub relations: BTreeMap<String, Vec<i64>>,
    pub translations: Translations,
}

impl ValidatedRequest {
    pub fn languages(&self) -> Vec<&str> {
        self.translations.keys().map(String::as_str).collect()
    }
}

pub struct Validator<'a> {
    schema: &'static EntitySchema,
    languages: &'a [String],
    mode: WriteMode,
    existing: Option<&'a EntityRecord>,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'static EntitySchema, languages: &'a [String], mode: WriteMode) -> Self {
        Self {
            schema,
            languages,
            mode,
            existing: None,
        }
    }

    /// The stored entity an update applies to
    pub fn with_existing(mut self, existing: &'a EntityRecord) -> Self {
        self.existing = Some(existing);
        self
    }

    /// Run every check, including relation existence through `tx`
    pub async fn validate<T: TranslatableTx>(
        &self,
        request: CanonicalRequest,
        tx: &mut T,
    ) -> Result<ValidatedRequest> {
        let mut errors = FieldErrors::new();
        let validated = self.check_fields(request, &mut errors);

        for (name, ids) in &validated.relations {
            if ids.is_empty() {
                continue;
            }
            let Some(relation) = self.schema.relation(name) else {
                continue;
            };
            let existing = tx.existing_ids(relation.target, ids).await?;
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !existing.contains(id))
                .map(|id| id.to_string())
                .collect();
            if !missing.is_empty() {
                errors.add(
                    name.clone(),
                    format!(
                        "Invalid pk \"{}\" - object does not exist.",
                        missing.join(", ")
                    ),
                );
            }
        }

        errors.into_result()?;
        Ok(validated)
    }

    /// Checks that need no storage access
    pub fn check_fields(&self, request: CanonicalRequest, errors: &mut FieldErrors) -> ValidatedRequest {
        let plain = self.check_plain(&request.plain_fields, errors);
        let relations = self.check_relations(request.relations, errors);
        let translations = self.check_translations(request.translations, errors);

        ValidatedRequest {
            plain,
            relations,
            translations,
        }
    }

    fn check_plain(&self, supplied: &Map<String, Value>, errors: &mut FieldErrors) -> PlainValues {
        let mut plain = PlainValues::new();

        for field in self.schema.plain_fields {
            match supplied.get(field.name) {
                Some(value) => match coerce_plain(field, value) {
                    Ok(coerced) => {
                        plain.insert(field.name.to_string(), coerced);
                    }
                    Err(message) => errors.add(field.name, message),
                },
                None => {
                    if self.mode.requires_all() && field.required {
                        errors.add(field.name, REQUIRED);
                    } else if self.mode == WriteMode::Create {
                        if let Some(default) = field.default {
                            plain.insert(field.name.to_string(), default_value(default));
                        }
                    }
                }
            }
        }

        plain
    }

    fn check_relations(
        &self,
        supplied: BTreeMap<String, Vec<i64>>,
        errors: &mut FieldErrors,
    ) -> BTreeMap<String, Vec<i64>> {
        let mut relations = BTreeMap::new();

        for relation in self.schema.relations {
            match supplied.get(relation.name) {
                Some(ids) => {
                    let mut unique = Vec::with_capacity(ids.len());
                    for id in ids {
                        if !unique.contains(id) {
                            unique.push(*id);
                        }
                    }
                    relations.insert(relation.name.to_string(), unique);
                }
                None if self.mode.requires_all() && relation.required => {
                    errors.add(relation.name, REQUIRED);
                }
                None => {}
            }
        }

        relations
    }

    fn check_translations(
        &self,
        supplied: BTreeMap<String, Map<String, Value>>,
        errors: &mut FieldErrors,
    ) -> Translations {
        let mut translations = Translations::new();

        if supplied.is_empty() && self.mode.requires_all() {
            errors.add("translations", REQUIRED);
            return translations;
        }

        for (language, fields) in supplied {
            let prefix = format!("translations.{}", language);
            if !self.languages.iter().any(|supported| *supported == language) {
                errors.add(prefix, format!("Unsupported language code: {}.", language));
                continue;
            }

            let is_new_language = match self.existing {
                Some(existing) => !existing.has_language(&language),
                None => true,
            };
            let complete = is_new_language || self.mode == WriteMode::Replace;

            let mut checked = TranslationFields::new();
            for (name, value) in &fields {
                let key = format!("{}.{}", prefix, name);
                match self.schema.translated_field(name) {
                    Some(field) => match coerce_translated(field, value) {
                        Ok(coerced) => {
                            checked.insert(name.clone(), coerced);
                        }
                        Err(message) => errors.add(key, message),
                    },
                    None => errors.add(key, "Unknown translatable field."),
                }
            }

            if complete {
                for field in self.schema.translated_fields.iter().filter(|f| f.required) {
                    if !fields.contains_key(field.name) {
                        errors.add(format!("{}.{}", prefix, field.name), REQUIRED);
                    }
                }
            }

            translations.insert(language, checked);
        }

        translations
    }
}

fn default_value(default: FieldDefault) -> FieldValue {
    match default {
        FieldDefault::Integer(value) => FieldValue::Integer(value),
        FieldDefault::Boolean(value) => FieldValue::Boolean(value),
    }
}

fn coerce_plain(field: &PlainField, value: &Value) -> std::result::Result<FieldValue, String> {
    let is_blank_media = matches!(field.field_type, FieldType::Media { .. })
        && matches!(value, Value::String(text) if text.is_empty());

    if value.is_null() || is_blank_media {
        return if field.nullable {
            Ok(FieldValue::Null)
        } else {
            Err(NOT_NULL.to_string())
        };
    }

    match field.field_type {
        FieldType::Money {
            min_hundredths,
            max_digits,
        } => {
            let amount = coerce::decimal(value, max_digits, 2)?;
            let minimum = rust_decimal::Decimal::new(min_hundredths, 2);
            if amount < minimum {
                return Err(format!(
                    "Ensure this value is greater than or equal to {}.",
                    minimum
                ));
            }
            Ok(FieldValue::Money(amount))
        }
        FieldType::Integer { min } => {
            let number = coerce::integer(value)?;
            if let Some(min) = min {
                if number < min {
                    return Err(format!(
                        "Ensure this value is greater than or equal to {}.",
                        min
                    ));
                }
            }
            Ok(FieldValue::Integer(number))
        }
        FieldType::Boolean => coerce::boolean(value).map(FieldValue::Boolean),
        FieldType::Text { max_len } => {
            let text = coerce::text(value)?;
            if let Some(max_len) = max_len {
                coerce::max_length(&text, max_len)?;
            }
            Ok(FieldValue::Text(text))
        }
        FieldType::Email { max_len } => {
            let text = coerce::text(value)?;
            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(NOT_BLANK.to_string());
            }
            coerce::max_length(&text, max_len)?;
            if !is_valid_email(&text) {
                return Err("Enter a valid email address.".to_string());
            }
            Ok(FieldValue::Text(text))
        }
        FieldType::Media { .. } => coerce::text(value).map(FieldValue::Text),
    }
}

fn coerce_translated(
    field: &TranslatedField,
    value: &Value,
) -> std::result::Result<Option<String>, String> {
    if value.is_null() {
        return if field.required {
            Err(NOT_NULL.to_string())
        } else {
            Ok(None)
        };
    }

    let text = coerce::text(value)?;
    if field.required && text.trim().is_empty() {
        return Err(NOT_BLANK.to_string());
    }
    if let Some(max_len) = field.max_len {
        coerce::max_length(&text, max_len)?;
    }
    Ok(Some(text))
}
