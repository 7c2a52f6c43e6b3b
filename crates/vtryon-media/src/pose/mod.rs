//! Human pose estimation.
//!
//! Estimation is split into a long-lived [`PoseEstimator`] that owns the loaded
//! models and short-lived [`PoseSession`]s that carry per-mode thresholds and
//! smoothing state. Live frames open a fresh session per frame, so smoothing
//! never carries across requests.

mod movenet;
mod smoothing;

pub use movenet::{OrtPoseEstimator, MOVENET_LIGHTNING_FILE, MOVENET_THUNDER_FILE};
pub use smoothing::LandmarkSmoother;

use image::RgbImage;
use vtryon_models::{PoseResult, ProcessingMode};

use crate::error::MediaResult;

/// Source of pose sessions. Implementations are shared across requests.
pub trait PoseEstimator: Send + Sync {
    /// Open a session configured for the given mode.
    fn open_session(&self, mode: ProcessingMode) -> MediaResult<Box<dyn PoseSession>>;
}

/// A single estimation context.
pub trait PoseSession: Send {
    /// Detect torso landmarks in an RGB image.
    fn estimate(&mut self, image: &RgbImage) -> MediaResult<PoseResult>;
}

/// Detector settings for one processing mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseEstimatorConfig {
    pub mode: ProcessingMode,
    /// Square model input edge in pixels
    pub input_size: u32,
    pub static_image_mode: bool,
    pub smooth_landmarks: bool,
    /// EMA weight of the newest observation when smoothing
    pub smoothing_alpha: f32,
    pub min_detection_confidence: f32,
    /// Only applies in streaming mode
    pub min_tracking_confidence: Option<f32>,
}

impl PoseEstimatorConfig {
    /// Settings for the given mode.
    ///
    /// Uploaded photos use the heavier model with no temporal smoothing; live
    /// frames trade accuracy for latency and smooth landmarks.
    pub fn for_mode(mode: ProcessingMode) -> Self {
        match mode {
            ProcessingMode::SingleShot => Self {
                mode,
                input_size: 256,
                static_image_mode: true,
                smooth_landmarks: false,
                smoothing_alpha: 1.0,
                min_detection_confidence: 0.5,
                min_tracking_confidence: None,
            },
            ProcessingMode::Streaming => Self {
                mode,
                input_size: 192,
                static_image_mode: false,
                smooth_landmarks: true,
                smoothing_alpha: 0.5,
                min_detection_confidence: 0.5,
                min_tracking_confidence: Some(0.5),
            },
        }
    }

    /// Lowest score a landmark may have and still be kept.
    pub fn keep_threshold(&self) -> f32 {
        match self.min_tracking_confidence {
            Some(tracking) => self.min_detection_confidence.max(tracking),
            None => self.min_detection_confidence,
        }
    }
}
