//! Local storage for the virtual try-on backend.
//!
//! This crate provides:
//! - Result and upload storage in a flat upload directory
//! - Retention sweeps for live results
//! - Background-removed garment image cache
//! - Garment image fetching (remote or local uploads)
//! - Garment catalog lookup

pub mod catalog;
pub mod error;
pub mod fetch;
pub mod garment_cache;
pub mod housekeeping;
pub mod result_store;

pub use catalog::{GarmentCatalog, JsonGarmentCatalog};
pub use error::{StorageError, StorageResult};
pub use fetch::{GarmentFetcher, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_GARMENT_BYTES};
pub use garment_cache::GarmentCache;
pub use housekeeping::{sweep_live_results, RetentionPolicy};
pub use result_store::{filename_from_public_url, is_safe_filename, public_url, ResultStore};
