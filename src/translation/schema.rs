//! Static descriptions of the translatable catalog entities
//!
//! Every translatable entity (product, category, ingredient, company) is
//! described once here: its table, translation table, plain fields,
//! translatable fields and many-to-many relations. The normalizer,
//! validator, writer and stores are all driven by these descriptions.

use serde::{Deserialize, Serialize};

/// Kinds of translatable catalog entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Product,
    Category,
    Ingredient,
    Company,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Product,
        EntityKind::Category,
        EntityKind::Ingredient,
        EntityKind::Company,
    ];

    pub fn schema(self) -> &'static EntitySchema {
        match self {
            EntityKind::Product => &PRODUCT,
            EntityKind::Category => &CATEGORY,
            EntityKind::Ingredient => &INGREDIENT,
            EntityKind::Company => &COMPANY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::Category => "category",
            EntityKind::Ingredient => "ingredient",
            EntityKind::Company => "company",
        }
    }

    /// Human readable resource name used in error messages
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Product => "Product",
            EntityKind::Category => "Category",
            EntityKind::Ingredient => "Ingredient",
            EntityKind::Company => "Company",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage and coercion type of a plain (non-translatable) field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Two-decimal amount; bounds are expressed in hundredths.
    Money { min_hundredths: i64, max_digits: u32 },
    Integer { min: Option<i64> },
    Boolean,
    Text { max_len: Option<usize> },
    Email { max_len: usize },
    /// Stored file reference; uploads land under `folder` in the media root.
    Media { folder: &'static str },
}

/// Default applied on create when the field is omitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Integer(i64),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy)]
pub struct PlainField {
    pub name: &'static str,
    pub field_type: FieldType,
    /// Must be supplied on create and full update
    pub required: bool,
    pub nullable: bool,
    pub default: Option<FieldDefault>,
    /// Suffix appended when rendering for read, e.g. a currency sign
    pub currency: bool,
    /// Can be used as an exact-match list filter
    pub filterable: bool,
    /// Can be used in the list `ordering` parameter
    pub orderable: bool,
}

impl PlainField {
    const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            required: false,
            nullable: true,
            default: None,
            currency: false,
            filterable: false,
            orderable: false,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self.nullable = false;
        self
    }

    const fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self.nullable = false;
        self
    }

    const fn currency(mut self) -> Self {
        self.currency = true;
        self
    }

    const fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    const fn orderable(mut self) -> Self {
        self.orderable = true;
        self
    }
}

/// A field stored once per language in the translation table
#[derive(Debug, Clone, Copy)]
pub struct TranslatedField {
    pub name: &'static str,
    pub max_len: Option<usize>,
    /// Must be present and non-blank whenever a language is first created
    pub required: bool,
}

/// Many-to-many relation stored in a join table
#[derive(Debug, Clone, Copy)]
pub struct RelationField {
    pub name: &'static str,
    pub target: EntityKind,
    pub join_table: &'static str,
    pub owner_column: &'static str,
    pub target_column: &'static str,
    /// Must be supplied on create and full update
    pub required: bool,
}

#[derive(Debug)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub table: &'static str,
    pub translation_table: &'static str,
    pub plain_fields: &'static [PlainField],
    pub translated_fields: &'static [TranslatedField],
    pub relations: &'static [RelationField],
    pub timestamps: bool,
    /// Boolean filter applied to list results unless the caller filters on it
    pub list_scope: Option<(&'static str, bool)>,
}

impl EntitySchema {
    pub fn plain_field(&self, name: &str) -> Option<&'static PlainField> {
        self.plain_fields.iter().find(|field| field.name == name)
    }

    pub fn translated_field(&self, name: &str) -> Option<&'static TranslatedField> {
        self.translated_fields.iter().find(|field| field.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationField> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    pub fn is_translated(&self, name: &str) -> bool {
        self.translated_field(name).is_some()
    }

    /// The upload field and the media folder its files are stored in
    pub fn media_field(&self) -> Option<(&'static str, &'static str)> {
        self.plain_fields.iter().find_map(|field| match field.field_type {
            FieldType::Media { folder } => Some((field.name, folder)),
            _ => None,
        })
    }
}

static PRODUCT: EntitySchema = EntitySchema {
    kind: EntityKind::Product,
    table: "products",
    translation_table: "product_translations",
    plain_fields: &[
        PlainField::new(
            "price",
            FieldType::Money {
                min_hundredths: 1,
                max_digits: 10,
            },
        )
        .required()
        .currency()
        .orderable(),
        PlainField::new("stock", FieldType::Integer { min: Some(0) })
            .with_default(FieldDefault::Integer(0))
            .orderable(),
        PlainField::new("available", FieldType::Boolean)
            .with_default(FieldDefault::Boolean(true))
            .filterable(),
        PlainField::new("image", FieldType::Media { folder: "Products" }),
    ],
    translated_fields: &[
        TranslatedField {
            name: "name",
            max_len: Some(100),
            required: true,
        },
        TranslatedField {
            name: "description",
            max_len: None,
            required: false,
        },
    ],
    relations: &[
        RelationField {
            name: "categories",
            target: EntityKind::Category,
            join_table: "product_categories",
            owner_column: "product_id",
            target_column: "category_id",
            required: true,
        },
        RelationField {
            name: "ingredients",
            target: EntityKind::Ingredient,
            join_table: "product_ingredients",
            owner_column: "product_id",
            target_column: "ingredient_id",
            required: false,
        },
    ],
    timestamps: true,
    list_scope: Some(("available", true)),
};

static CATEGORY: EntitySchema = EntitySchema {
    kind: EntityKind::Category,
    table: "categories",
    translation_table: "category_translations",
    plain_fields: &[PlainField::new("image", FieldType::Media { folder: "categories" })],
    translated_fields: &[
        TranslatedField {
            name: "name",
            max_len: Some(100),
            required: true,
        },
        TranslatedField {
            name: "description",
            max_len: None,
            required: false,
        },
    ],
    relations: &[],
    timestamps: true,
    list_scope: None,
};

static INGREDIENT: EntitySchema = EntitySchema {
    kind: EntityKind::Ingredient,
    table: "ingredients",
    translation_table: "ingredient_translations",
    plain_fields: &[PlainField::new("icon", FieldType::Text { max_len: Some(50) })],
    translated_fields: &[TranslatedField {
        name: "name",
        max_len: Some(50),
        required: true,
    }],
    relations: &[],
    timestamps: false,
    list_scope: None,
};

static COMPANY: EntitySchema = EntitySchema {
    kind: EntityKind::Company,
    table: "companies",
    translation_table: "company_translations",
    plain_fields: &[
        PlainField::new("image", FieldType::Media { folder: "logos" }),
        PlainField::new("email", FieldType::Email { max_len: 100 }).required(),
        PlainField::new("phone", FieldType::Integer { min: Some(0) }).required(),
    ],
    translated_fields: &[
        TranslatedField {
            name: "name",
            max_len: Some(100),
            required: true,
        },
        TranslatedField {
            name: "address",
            max_len: Some(200),
            required: true,
        },
    ],
    relations: &[],
    timestamps: false,
    list_scope: None,
};
