//! Catalog write and read paths over the in-memory store

mod helpers;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use serde_json::json;

use digital_menu::models::entity::FieldValue;
use digital_menu::models::pagination::PageRequest;
use digital_menu::translation::listing::{ListQuery, Ordering};
use digital_menu::translation::schema::EntityKind;
use digital_menu::translation::{OutputShape, WriteMode};
use digital_menu::MenuError;
use helpers::*;

#[tokio::test]
async fn test_category_create_with_two_languages() {
    let (service, _store) = catalog();

    let record = service
        .create(
            EntityKind::Category,
            json_payload(json!({
                "translations": {
                    "es": { "name": "Entradas" },
                    "en": { "name": "Starters" }
                }
            })),
        )
        .await
        .unwrap();

    assert_eq!(record.translation("es", "name"), Some("Entradas"));
    assert_eq!(record.translation("en", "name"), Some("Starters"));
    assert_eq!(record.translation("es", "description"), None);
    assert_eq!(record.translation("en", "description"), None);

    let rendered = service.represent(&record, OutputShape::Flat).await.unwrap();
    assert_eq!(
        rendered["translations"],
        json!({ "es": { "name": "Entradas" }, "en": { "name": "Starters" } })
    );
}

#[tokio::test]
async fn test_create_then_read_has_no_cross_language_fallback() {
    let (service, _store) = catalog();
    let category = seed_category(&service, "Bebidas", "Drinks").await;

    let created = service
        .create(
            EntityKind::Product,
            json_payload(json!({
                "price": "3.50",
                "categories": [category],
                "translations": {
                    "es": { "name": "Café", "description": "Café de tueste natural" },
                    "en": { "name": "Coffee" }
                }
            })),
        )
        .await
        .unwrap();

    let read = service.retrieve(EntityKind::Product, created.id).await.unwrap();
    assert_eq!(read.translation("es", "name"), Some("Café"));
    assert_eq!(read.translation("es", "description"), Some("Café de tueste natural"));
    assert_eq!(read.translation("en", "name"), Some("Coffee"));
    assert_eq!(read.translation("en", "description"), None);
    assert_eq!(read.related_ids("categories"), &[category]);
}

#[tokio::test]
async fn test_flat_form_payload_creates_every_language() {
    let (service, _store) = catalog();
    let drinks = seed_category(&service, "Bebidas", "Drinks").await;
    let desserts = seed_category(&service, "Postres", "Desserts").await;

    let record = service
        .create(
            EntityKind::Product,
            form_payload(&[
                ("price", "4.25"),
                ("stock", "7"),
                ("available", "false"),
                ("categories", &format!("{},{}", drinks, desserts)),
                ("name_es", "Tarta de queso"),
                ("description_es", "Con mermelada"),
                ("name_en", "Cheesecake"),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(record.field("price"), Some(&FieldValue::Money(Decimal::new(425, 2))));
    assert_eq!(record.field("stock"), Some(&FieldValue::Integer(7)));
    assert_eq!(record.field("available"), Some(&FieldValue::Boolean(false)));
    assert_eq!(record.related_ids("categories"), &[drinks, desserts]);
    assert_eq!(record.translation("es", "description"), Some("Con mermelada"));
    assert_eq!(record.translation("en", "name"), Some("Cheesecake"));
}

#[tokio::test]
async fn test_relation_value_formats_are_equivalent() {
    let (service, _store) = catalog();
    let first = seed_ingredient(&service, "Tomate").await;
    let second = seed_ingredient(&service, "Queso").await;
    let third = seed_ingredient(&service, "Albahaca").await;
    let category = seed_category(&service, "Pizzas", "Pizzas").await;
    let product = seed_product(&service, "9.00", &[category], "Margarita", "Margherita").await;

    let expected = vec![first, second, third];
    let encodings = [
        json!(format!("{},{},{}", first, second, third)),
        json!(format!("[{},{},{}]", first, second, third)),
        json!([first, second, third]),
    ];

    for encoding in encodings {
        let record = service
            .update(
                EntityKind::Product,
                product,
                json_payload(json!({ "ingredients": encoding })),
                WriteMode::Patch,
            )
            .await
            .unwrap();
        assert_eq!(record.related_ids("ingredients"), expected.as_slice());
    }
}

#[tokio::test]
async fn test_partial_translation_update_leaves_everything_else() {
    let (service, _store) = catalog();
    let category = seed_category(&service, "Principales", "Mains").await;
    let product = seed_product(&service, "12.99", &[category], "Paella", "Paella").await;

    let updated = service
        .update(
            EntityKind::Product,
            product,
            json_payload(json!({ "translations": { "es": { "name": "Nuevo" } } })),
            WriteMode::Patch,
        )
        .await
        .unwrap();

    assert_eq!(updated.translation("es", "name"), Some("Nuevo"));
    assert_eq!(updated.translation("en", "name"), Some("Paella"));
    assert_eq!(updated.related_ids("categories"), &[category]);
    assert_eq!(updated.field("price"), Some(&FieldValue::Money(Decimal::new(1299, 2))));
}

#[tokio::test]
async fn test_repeated_update_is_idempotent() {
    let (service, store) = catalog();
    let category = seed_category(&service, "Bebidas", "Drinks").await;
    let product = seed_product(&service, "2.00", &[category], "Agua", "Water").await;

    let payload = json!({
        "price": "2.50",
        "stock": 40,
        "translations": { "en": { "name": "Still water", "description": "50 cl" } }
    });

    service
        .update(EntityKind::Product, product, json_payload(payload.clone()), WriteMode::Patch)
        .await
        .unwrap();
    let first = store.snapshot(EntityKind::Product, product).unwrap();

    service
        .update(EntityKind::Product, product, json_payload(payload), WriteMode::Patch)
        .await
        .unwrap();
    let second = store.snapshot(EntityKind::Product, product).unwrap();

    assert_eq!(first.fields, second.fields);
    assert_eq!(first.relations, second.relations);
    assert_eq!(first.translations, second.translations);
}

#[tokio::test]
async fn test_price_is_formatted_only_on_read() {
    let (service, _store) = catalog();
    let category = seed_category(&service, "Bebidas", "Drinks").await;
    let product = seed_product(&service, "8.99", &[category], "Zumo", "Juice").await;

    let record = service.retrieve(EntityKind::Product, product).await.unwrap();
    assert_eq!(record.field("price"), Some(&FieldValue::Money(Decimal::new(899, 2))));

    let nested = service.represent(&record, OutputShape::Nested).await.unwrap();
    assert_eq!(nested["price"], json!("8.99 €"));
    assert_eq!(nested["categories"][0]["id"], json!(category));
    assert_eq!(nested["categories"][0]["translations"]["en"]["name"], json!("Drinks"));

    let flat = service.represent(&record, OutputShape::Flat).await.unwrap();
    assert_eq!(flat["price"], json!("8.99"));
    assert_eq!(flat["categories"], json!([category]));
}

#[tokio::test]
async fn test_failed_write_persists_nothing() {
    let (service, store) = catalog();

    let err = service
        .create(
            EntityKind::Product,
            json_payload(json!({
                "price": "5.00",
                "categories": [404],
                "translations": { "es": { "name": "Fantasma" } }
            })),
        )
        .await
        .unwrap_err();

    assert_matches!(err, MenuError::Validation(ref errors) if errors.contains("categories"));
    assert_eq!(store.count(EntityKind::Product), 0);
}

#[tokio::test]
async fn test_create_requires_a_language() {
    let (service, store) = catalog();

    let err = service
        .create(EntityKind::Category, json_payload(json!({})))
        .await
        .unwrap_err();

    assert_matches!(err, MenuError::Validation(ref errors) if errors.contains("translations"));
    assert_eq!(store.count(EntityKind::Category), 0);
}

#[tokio::test]
async fn test_unsupported_flat_language_is_rejected() {
    let (service, _store) = catalog();

    let err = service
        .create(
            EntityKind::Category,
            form_payload(&[("name_es", "Entradas"), ("name_fr", "Entrées")]),
        )
        .await
        .unwrap_err();

    assert_matches!(err, MenuError::Validation(ref errors) if errors.contains("name_fr"));
}

#[tokio::test]
async fn test_nested_and_flat_translations_together_are_rejected() {
    let (service, _store) = catalog();

    let err = service
        .create(
            EntityKind::Category,
            json_payload(json!({
                "name_en": "Starters",
                "translations": { "es": { "name": "Entradas" } }
            })),
        )
        .await
        .unwrap_err();

    assert_matches!(err, MenuError::Validation(ref errors) if errors.contains("translations"));
}

#[tokio::test]
async fn test_replace_requires_full_payload() {
    let (service, _store) = catalog();
    let category = seed_category(&service, "Bebidas", "Drinks").await;
    let product = seed_product(&service, "1.50", &[category], "Té", "Tea").await;

    let err = service
        .update(
            EntityKind::Product,
            product,
            json_payload(json!({ "stock": 3 })),
            WriteMode::Replace,
        )
        .await
        .unwrap_err();

    assert_matches!(err, MenuError::Validation(ref errors) if errors.contains("price"));
}

#[tokio::test]
async fn test_update_of_missing_entity_is_not_found() {
    let (service, _store) = catalog();

    let err = service
        .update(
            EntityKind::Category,
            99,
            json_payload(json!({ "translations": { "es": { "name": "Nada" } } })),
            WriteMode::Patch,
        )
        .await
        .unwrap_err();

    assert_matches!(err, MenuError::NotFound { id: 99, .. });
}

#[tokio::test]
async fn test_product_list_hides_unavailable_by_default() {
    let (service, _store) = catalog();
    let category = seed_category(&service, "Bebidas", "Drinks").await;
    let visible = seed_product(&service, "2.00", &[category], "Agua", "Water").await;
    let hidden = seed_product(&service, "3.00", &[category], "Cerveza", "Beer").await;
    service
        .update(
            EntityKind::Product,
            hidden,
            json_payload(json!({ "available": false })),
            WriteMode::Patch,
        )
        .await
        .unwrap();

    let page = service
        .list(EntityKind::Product, &ListQuery::new(PageRequest::new(1, 10)))
        .await
        .unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.items[0].id, visible);

    let mut unavailable = ListQuery::new(PageRequest::new(1, 10));
    unavailable.filters.push(("available", FieldValue::Boolean(false)));
    let page = service.list(EntityKind::Product, &unavailable).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.items[0].id, hidden);
}

#[tokio::test]
async fn test_list_search_ordering_and_relation_filter() {
    let (service, _store) = catalog();
    let drinks = seed_category(&service, "Bebidas", "Drinks").await;
    let desserts = seed_category(&service, "Postres", "Desserts").await;
    let water = seed_product(&service, "2.00", &[drinks], "Agua", "Water").await;
    let juice = seed_product(&service, "3.50", &[drinks], "Zumo", "Orange juice").await;
    let flan = seed_product(&service, "4.00", &[desserts], "Flan", "Custard").await;

    let mut query = ListQuery::new(PageRequest::new(1, 10));
    query.ordering = Some(Ordering {
        field: "price",
        descending: true,
    });
    let ids: Vec<i64> = service
        .list(EntityKind::Product, &query)
        .await
        .unwrap()
        .items
        .iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(ids, vec![flan, juice, water]);

    let mut query = ListQuery::new(PageRequest::new(1, 10));
    query.related.push(("categories", drinks));
    query.search = Some("JUICE".to_string());
    let page = service.list(EntityKind::Product, &query).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.items[0].id, juice);
}

#[tokio::test]
async fn test_page_beyond_the_last_row_is_empty() {
    let (service, _store) = catalog();
    seed_category(&service, "Bebidas", "Drinks").await;

    let page = service
        .list(EntityKind::Category, &ListQuery::new(PageRequest::new(i64::MAX, 10)))
        .await
        .unwrap();
    assert_eq!(page.count, 1);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_destroy_removes_entity() {
    let (service, store) = catalog();
    let category = seed_category(&service, "Bebidas", "Drinks").await;

    service.destroy(EntityKind::Category, category).await.unwrap();
    assert_eq!(store.count(EntityKind::Category), 0);

    let err = service.destroy(EntityKind::Category, category).await.unwrap_err();
    assert_matches!(err, MenuError::NotFound { .. });
}

#[tokio::test]
async fn test_company_requires_address_for_new_language() {
    let (service, _store) = catalog();

    let err = service
        .create(
            EntityKind::Company,
            json_payload(json!({
                "email": "hola@lataberna.es",
                "phone": 952000000,
                "translations": { "es": { "name": "La Taberna" } }
            })),
        )
        .await
        .unwrap_err();
    assert_matches!(err, MenuError::Validation(ref errors) if errors.contains("translations.es.address"));

    let company = service
        .create(
            EntityKind::Company,
            json_payload(json!({
                "email": "hola@lataberna.es",
                "phone": 952000000,
                "translations": { "es": { "name": "La Taberna", "address": "Calle Real 1" } }
            })),
        )
        .await
        .unwrap();
    assert_eq!(company.field("phone"), Some(&FieldValue::Integer(952000000)));
}
