//! Shared data models for the virtual try-on backend.
//!
//! This crate provides Serde-serializable types for:
//! - Pose landmarks and detection results
//! - Garment placement rectangles
//! - Processing modes (one-shot photo vs. live frame)
//! - Garment sources and catalog items
//! - HTTP request/response schemas

pub mod api;
pub mod garment;
pub mod landmark;
pub mod mode;
pub mod rect;

// Re-export common types
pub use api::{
    ClearCacheResponse, LiveTryOnResponse, RemoveBgRequest, RemoveBgResponse, TryOnRequest,
    TryOnResponse, UploadResponse,
};
pub use garment::{GarmentItem, GarmentSource};
pub use landmark::{Landmark, LandmarkName, PoseResult, TorsoLandmarks};
pub use mode::ProcessingMode;
pub use rect::PlacementRect;
