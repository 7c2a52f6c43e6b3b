//! Image processing for the virtual try-on backend.
//!
//! This crate provides:
//! - Image decode/encode helpers
//! - Garment placement geometry and compositing
//! - Pose estimation (MoveNet via ONNX Runtime)
//! - Background removal (U²-Net via ONNX Runtime)
//! - Scratch files for live frames

pub mod background;
pub mod compositor;
pub mod error;
pub mod frame;
pub mod image_io;
pub mod models;
pub mod placement;
pub mod pose;

pub use background::{BackgroundRemover, OrtBackgroundRemover};
pub use compositor::{composite_garment, resampling_filter, try_on};
pub use error::{MediaError, MediaResult};
pub use frame::TempFrame;
pub use image_io::{decode_image, open_image, save_jpeg, save_png, LIVE_JPEG_QUALITY};
pub use placement::{compute_placement, fallback_box, fit_garment, is_degenerate, torso_box, GarmentPlacement};
pub use pose::{OrtPoseEstimator, PoseEstimator, PoseEstimatorConfig, PoseSession};
