//! Garment catalog lookup.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use vtryon_models::GarmentItem;

use crate::error::StorageResult;

/// Read-only access to catalog items.
#[async_trait]
pub trait GarmentCatalog: Send + Sync {
    async fn find_item(&self, id: i64) -> StorageResult<Option<GarmentItem>>;
}

/// Catalog loaded once from a JSON array of items.
#[derive(Debug, Clone, Default)]
pub struct JsonGarmentCatalog {
    items: HashMap<i64, GarmentItem>,
}

impl JsonGarmentCatalog {
    pub fn from_items(items: impl IntoIterator<Item = GarmentItem>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
        }
    }

    /// Load the catalog file. A missing file yields an empty catalog.
    pub async fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Catalog file not found, starting with empty catalog");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let items: Vec<GarmentItem> = serde_json::from_slice(&bytes)?;
        let catalog = Self::from_items(items);
        info!(path = %path.display(), items = catalog.len(), "Loaded garment catalog");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl GarmentCatalog for JsonGarmentCatalog {
    async fn find_item(&self, id: i64) -> StorageResult<Option<GarmentItem>> {
        Ok(self.items.get(&id).cloned())
    }
}
