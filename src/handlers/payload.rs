//! Request body extraction
//!
//! Accepts JSON objects, urlencoded forms and multipart forms. Multipart
//! file parts are buffered and only written to media storage once the
//! handler has authorized the operation.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Form;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::services::media::MediaStorage;
use crate::state::AppState;
use crate::translation::canonical::RawPayload;
use crate::translation::coerce::REQUIRED;
use crate::utils::errors::{FieldErrors, MenuError, Result};

/// A file part of a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub bytes: Bytes,
}

/// Request body as received, with any uploaded files set aside
#[derive(Debug, Clone)]
pub struct Payload {
    pub body: RawPayload,
    pub files: Vec<UploadedFile>,
}

impl Payload {
    pub fn json(map: Map<String, Value>) -> Self {
        Self {
            body: RawPayload::Json(map),
            files: Vec::new(),
        }
    }

    /// Store the upload sent as `field` under `folder` and put its path in the body
    ///
    /// Returns the stored path so a failed write can discard it. Files sent
    /// under other field names are ignored.
    pub async fn store_upload(&mut self, media: &MediaStorage, field: &str, folder: &str) -> Result<Option<String>> {
        let Some(position) = self.files.iter().position(|file| file.field == field) else {
            return Ok(None);
        };
        let file = self.files.swap_remove(position);
        let path = media.save(field, folder, &file.filename, &file.bytes).await?;
        self.body.set(field, path.clone());
        Ok(Some(path))
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.body.into_map()
    }

    /// Deserialize the flattened body into a typed request
    pub fn parse<T: DeserializeOwned>(self) -> Result<T> {
        parse_body(self.into_map())
    }
}

/// Deserialize a body map, reporting missing fields per field name
pub fn parse_body<T: DeserializeOwned>(map: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(map)).map_err(|error| {
        let message = error.to_string();
        match missing_field(&message) {
            Some(field) => MenuError::field(field, REQUIRED),
            None => MenuError::InvalidInput(message),
        }
    })
}

fn missing_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("missing field `")?;
    rest.split_once('`').map(|(field, _)| field)
}

/// Require every listed key, collecting one error per missing key
pub fn require_fields(map: &Map<String, Value>, fields: &[&str]) -> Result<()> {
    let mut errors = FieldErrors::new();
    for field in fields {
        if map.get(*field).map_or(true, Value::is_null) {
            errors.add(*field, REQUIRED);
        }
    }
    errors.into_result()
}

fn invalid(message: impl Into<String>) -> MenuError {
    MenuError::InvalidInput(message.into())
}

async fn read_multipart(mut multipart: Multipart) -> Result<Payload> {
    let mut pairs = Vec::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| invalid(error.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            // An untouched file input: the field counts as absent
            Some(filename) if filename.is_empty() => continue,
            Some(filename) => {
                let bytes = field.bytes().await.map_err(|error| invalid(error.body_text()))?;
                files.push(UploadedFile {
                    field: name,
                    filename,
                    bytes,
                });
            }
            None => {
                let text = field.text().await.map_err(|error| invalid(error.body_text()))?;
                pairs.push((name, text));
            }
        }
    }

    debug!(fields = pairs.len(), files = files.len(), "Read multipart body");
    Ok(Payload {
        body: RawPayload::Form(pairs),
        files,
    })
}

fn read_json(bytes: &[u8]) -> Result<Payload> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::json(Map::new()));
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(Payload::json(map)),
        Ok(_) => Err(invalid("Expected a JSON object.")),
        Err(error) => Err(invalid(format!("JSON parse error - {}", error))),
    }
}

#[async_trait]
impl FromRequest<AppState> for Payload {
    type Rejection = MenuError;

    async fn from_request(request: Request, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(request, state)
                .await
                .map_err(|rejection| invalid(rejection.body_text()))?;
            read_multipart(multipart).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, state)
                .await
                .map_err(|rejection| invalid(rejection.body_text()))?;
            Ok(Payload {
                body: RawPayload::Form(pairs),
                files: Vec::new(),
            })
        } else {
            let bytes = Bytes::from_request(request, state)
                .await
                .map_err(|rejection| invalid(rejection.body_text()))?;
            read_json(&bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::database::create_lazy_pool;
    use crate::models::user::ChangePasswordRequest;
    use crate::translation::{EntityKind, Normalizer};
    use assert_matches::assert_matches;
    use axum::body::Body;
    use serde_json::json;

    const BOUNDARY: &str = "menu-form-boundary";

    fn state() -> AppState {
        let mut settings = Settings::default();
        settings.database.min_connections = 0;
        let pool = create_lazy_pool(&settings.database).unwrap();
        AppState::new(settings, pool)
    }

    async fn extract(content_type: &str, body: impl Into<Body>) -> Result<Payload> {
        let request = axum::http::Request::builder()
            .method("PATCH")
            .uri("/api/products/1/")
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap();
        Payload::from_request(request, &state()).await
    }

    /// Multipart body from text fields and `(field, filename, bytes)` file parts
    fn multipart_body(texts: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in texts {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        for (name, filename, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    #[tokio::test]
    async fn test_multipart_text_parts_keep_order_and_files_are_set_aside() {
        let body = multipart_body(
            &[("name_es", "Tarta"), ("categories", "1"), ("categories", "2")],
            &[("image", "tarta.png", &b"png"[..])],
        );

        let payload = extract(&multipart_type(), body).await.unwrap();
        assert_matches!(&payload.body, RawPayload::Form(pairs) => {
            assert_eq!(
                pairs,
                &vec![
                    ("name_es".to_string(), "Tarta".to_string()),
                    ("categories".to_string(), "1".to_string()),
                    ("categories".to_string(), "2".to_string()),
                ]
            );
        });
        assert_eq!(payload.files.len(), 1);
        assert_eq!(payload.files[0].field, "image");
        assert_eq!(payload.files[0].filename, "tarta.png");
        assert_eq!(payload.files[0].bytes, Bytes::from_static(b"png"));
        assert!(!payload.body.contains_key("image"));
    }

    #[tokio::test]
    async fn test_empty_file_input_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Settings::default().media;
        config.root = dir.path().to_string_lossy().to_string();
        let media = MediaStorage::new(&config);

        let body = multipart_body(
            &[("name_es", "Tarta"), ("categories", "1,2")],
            &[("image", "", &b""[..])],
        );
        let mut payload = extract(&multipart_type(), body).await.unwrap();
        assert!(payload.files.is_empty());

        let stored = payload.store_upload(&media, "image", "Products").await.unwrap();
        assert_eq!(stored, None);
        assert!(!payload.body.contains_key("image"));
    }

    #[tokio::test]
    async fn test_urlencoded_form_reaches_normalizer_as_flat_keys() {
        let payload = extract(
            "application/x-www-form-urlencoded",
            "price=8.99&name_es=Zumo&name_en=Orange+juice&categories=3&categories=4",
        )
        .await
        .unwrap();
        assert!(payload.files.is_empty());
        assert_matches!(&payload.body, RawPayload::Form(pairs) if pairs.len() == 5);

        let languages = vec!["es".to_string(), "en".to_string()];
        let canonical = Normalizer::new(EntityKind::Product.schema(), &languages)
            .normalize(payload.body)
            .unwrap();
        assert_eq!(canonical.translations["es"]["name"], json!("Zumo"));
        assert_eq!(canonical.translations["en"]["name"], json!("Orange juice"));
        assert_eq!(canonical.relations["categories"], vec![3, 4]);
        assert_eq!(canonical.plain_fields["price"], json!("8.99"));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_read_as_json() {
        let payload = extract("", r#"{"translations": {"es": {"name": "Flan"}}}"#).await.unwrap();
        assert_matches!(payload.body, RawPayload::Json(_));
    }

    #[test]
    fn test_read_json_object() {
        let payload = read_json(br#"{"name": "Postres"}"#).unwrap();
        assert_eq!(payload.into_map().get("name"), Some(&json!("Postres")));
    }

    #[test]
    fn test_empty_body_is_empty_object() {
        let payload = read_json(b"  \n").unwrap();
        assert!(payload.into_map().is_empty());
    }

    #[test]
    fn test_non_object_json_is_rejected() {
        assert_matches!(read_json(b"[1, 2]"), Err(MenuError::InvalidInput(_)));
        assert_matches!(read_json(b"{broken"), Err(MenuError::InvalidInput(message)) if message.starts_with("JSON parse error"));
    }

    #[test]
    fn test_parse_body_reports_missing_field() {
        let map = json!({"old_password": "a", "new_password": "b"});
        let Value::Object(map) = map else { unreachable!() };

        let error = parse_body::<ChangePasswordRequest>(map).unwrap_err();
        assert_matches!(error, MenuError::Validation(errors) if errors.contains("new_password_confirm"));
    }

    #[test]
    fn test_require_fields() {
        let Value::Object(map) = json!({"refresh": null, "username": "ana"}) else { unreachable!() };
        let error = require_fields(&map, &["username", "refresh", "password"]).unwrap_err();
        assert_matches!(error, MenuError::Validation(errors) => {
            assert!(errors.contains("refresh"));
            assert!(errors.contains("password"));
            assert!(!errors.contains("username"));
        });
    }

    #[tokio::test]
    async fn test_store_upload_sets_body_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Settings::default().media;
        config.root = dir.path().to_string_lossy().to_string();
        let media = MediaStorage::new(&config);

        let mut payload = Payload {
            body: RawPayload::Form(vec![("name_es".into(), "Tarta".into())]),
            files: vec![UploadedFile {
                field: "image".into(),
                filename: "tarta.png".into(),
                bytes: Bytes::from_static(b"png"),
            }],
        };

        let stored = payload.store_upload(&media, "image", "Products").await.unwrap();
        let stored = stored.unwrap();
        assert!(stored.starts_with("/media/Products/"));
        assert!(payload.files.is_empty());
        assert_eq!(payload.into_map().get("image"), Some(&json!(stored)));
    }
}
