//! Local storage for uploads and generated artifacts.
//!
//! Everything lives flat in a single upload directory that is also served
//! under `/uploads/`. Artifact names encode their kind:
//!
//! | kind        | name                                         |
//! |-------------|----------------------------------------------|
//! | one-shot    | `tryon_result_<uuid>.png`                    |
//! | live        | `live_result_<13-digit millis>_<8 hex>.jpg`  |
//! | no-bg       | `nobg_<uuid>.png`                            |
//! | user upload | `upload_<uuid>.<ext>`                        |
//!
//! Live names sort lexically in creation order, which the housekeeping sweep
//! relies on.

use std::path::{Path, PathBuf};

use chrono::Utc;
use image::RgbaImage;
use tracing::{debug, info};
use uuid::Uuid;

use vtryon_media::{save_jpeg, save_png, LIVE_JPEG_QUALITY};

use crate::error::{StorageError, StorageResult};

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads/";

pub const LIVE_RESULT_PREFIX: &str = "live_result_";
pub const TRYON_RESULT_PREFIX: &str = "tryon_result_";
pub const NOBG_PREFIX: &str = "nobg_";
pub const UPLOAD_PREFIX: &str = "upload_";

/// Extensions accepted for user uploads.
pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Maximum stored filename length.
const MAX_FILENAME_LENGTH: usize = 256;

/// Whether a filename is safe to join onto the upload directory.
///
/// Alphanumeric, hyphen, underscore and dot only; no traversal or hidden files.
pub fn is_safe_filename(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_FILENAME_LENGTH {
        return false;
    }
    if name.starts_with('.') || name.contains("..") || name.contains('/') || name.contains('\\') {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Name for a live result written at `millis` since the epoch.
pub fn live_result_name(millis: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{:013}_{}.jpg", LIVE_RESULT_PREFIX, millis.max(0), &suffix[..8])
}

/// Public URL of a stored artifact.
pub fn public_url(name: &str) -> String {
    format!("{}{}", PUBLIC_PREFIX, name)
}

/// Extract the stored filename from a `/uploads/<name>` URL.
pub fn filename_from_public_url(url: &str) -> Option<&str> {
    url.strip_prefix(PUBLIC_PREFIX).filter(|name| is_safe_filename(name))
}

/// Flat directory of uploads and results.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Open the store, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        info!(root = %root.display(), "Opened result store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for a filename, validating it first.
    pub fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        if !is_safe_filename(name) {
            return Err(StorageError::invalid_key(name));
        }
        Ok(self.root.join(name))
    }

    /// Path for a filename that must already exist.
    pub fn resolve_existing(&self, name: &str) -> StorageResult<PathBuf> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(StorageError::not_found(name));
        }
        Ok(path)
    }

    /// Save a one-shot try-on result as PNG. Blocking.
    pub fn save_tryon_result(&self, image: &RgbaImage) -> StorageResult<String> {
        let name = format!("{}{}.png", TRYON_RESULT_PREFIX, Uuid::new_v4());
        save_png(image, self.root.join(&name))?;
        debug!(name = %name, "Saved try-on result");
        Ok(name)
    }

    /// Save a live result as JPEG. Blocking.
    pub fn save_live_result(&self, image: &RgbaImage) -> StorageResult<String> {
        let name = live_result_name(Utc::now().timestamp_millis());
        save_jpeg(image, self.root.join(&name), LIVE_JPEG_QUALITY)?;
        debug!(name = %name, "Saved live result");
        Ok(name)
    }

    /// Save a background-removed image as PNG. Blocking.
    pub fn save_nobg(&self, image: &RgbaImage) -> StorageResult<String> {
        let name = format!("{}{}.png", NOBG_PREFIX, Uuid::new_v4());
        save_png(image, self.root.join(&name))?;
        debug!(name = %name, "Saved background-removed image");
        Ok(name)
    }

    /// Store a user upload under a generated name, keeping its extension.
    pub async fn save_upload(&self, original_name: &str, bytes: &[u8]) -> StorageResult<String> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|e| ALLOWED_UPLOAD_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| StorageError::invalid_key(original_name))?;

        let name = format!("{}{}.{}", UPLOAD_PREFIX, Uuid::new_v4(), extension);
        tokio::fs::write(self.root.join(&name), bytes).await?;
        info!(name = %name, size = bytes.len(), "Stored upload");
        Ok(name)
    }

    /// List filenames with a prefix, sorted lexically.
    pub async fn list_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(prefix) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Live results, oldest first.
    pub async fn list_live_artifacts(&self) -> StorageResult<Vec<String>> {
        self.list_with_prefix(LIVE_RESULT_PREFIX).await
    }

    /// Delete a stored file.
    pub async fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.path_for(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::delete_failed(format!("{}: {}", name, e)))
    }

    /// Check the directory accepts writes.
    pub async fn is_writable(&self) -> bool {
        let probe = self.root.join(format!(".probe_{}", Uuid::new_v4().simple()));
        match tokio::fs::write(&probe, b"ok").await {
            Ok(()) => tokio::fs::remove_file(&probe).await.is_ok(),
            Err(_) => false,
        }
    }
}
