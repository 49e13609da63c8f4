//! Media storage for uploaded images
//!
//! Files are written below the configured media root, one folder per kind
//! of owner, and referenced by their public URL path.

use std::path::PathBuf;

use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::utils::errors::{MenuError, Result};
use crate::utils::helpers::sanitize_filename;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"];

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
    max_upload_bytes: usize,
}

impl MediaStorage {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Reject uploads that are too large or do not look like images
    pub fn check_upload(&self, field: &str, filename: &str, size: usize) -> Result<()> {
        if size == 0 {
            return Err(MenuError::field(field, "The submitted file is empty."));
        }
        if size > self.max_upload_bytes {
            return Err(MenuError::field(
                field,
                format!("Ensure the file is at most {} bytes.", self.max_upload_bytes),
            ));
        }

        let extension = filename
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase())
            .unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(MenuError::field(
                field,
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            ));
        }
        Ok(())
    }

    /// Store an upload under `folder` and return its public path
    pub async fn save(&self, field: &str, folder: &str, filename: &str, bytes: &[u8]) -> Result<String> {
        self.check_upload(field, filename, bytes.len())?;

        let stored_name = format!("{}_{}", Uuid::new_v4().simple(), sanitize_filename(filename));
        let directory = self.root.join(folder);
        fs::create_dir_all(&directory).await?;
        fs::write(directory.join(&stored_name), bytes).await?;

        info!(folder = %folder, file = %stored_name, size = bytes.len(), "Stored upload");
        Ok(format!("{}/{}/{}", self.url_prefix, folder, stored_name))
    }

    /// Remove a previously stored upload by its public path
    ///
    /// Paths outside the media prefix are ignored.
    pub async fn discard(&self, url: &str) {
        let Some(relative) = url.strip_prefix(self.url_prefix.as_str()) else {
            return;
        };
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() || relative.split('/').any(|segment| segment == "..") {
            return;
        }
        if let Err(error) = fs::remove_file(self.root.join(relative)).await {
            warn!(path = %relative, error = %error, "Failed to remove discarded upload");
        }
    }
}
