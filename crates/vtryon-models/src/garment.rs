//! Garment catalog items and garment sources.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A catalog clothing item as exposed by the catalog collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GarmentItem {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Remote URL or `/uploads/...` path of the garment photo
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Where a garment image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GarmentSource {
    /// Catalog item looked up by id
    CatalogItem(i64),
    /// Direct image URL supplied by the client
    Url(String),
}

impl GarmentSource {
    /// Pick a source from optional request fields. A catalog id wins over a raw URL.
    pub fn from_parts(item_id: Option<i64>, image_url: Option<&str>) -> Option<Self> {
        match (item_id, image_url.map(str::trim).filter(|u| !u.is_empty())) {
            (Some(id), _) => Some(GarmentSource::CatalogItem(id)),
            (None, Some(url)) => Some(GarmentSource::Url(url.to_string())),
            (None, None) => None,
        }
    }

    /// Stable identity used as the background-removed image cache key.
    pub fn cache_key(&self) -> String {
        match self {
            GarmentSource::CatalogItem(id) => format!("item:{}", id),
            GarmentSource::Url(url) => format!("url:{}", url),
        }
    }
}

impl fmt::Display for GarmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GarmentSource::CatalogItem(id) => write!(f, "catalog item {}", id),
            GarmentSource::Url(url) => write!(f, "{}", url),
        }
    }
}
