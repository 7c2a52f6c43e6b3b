//! MoveNet pose estimation through ONNX Runtime.
//!
//! MoveNet takes a square int32 RGB image (NHWC) and emits `[1, 1, 17, 3]`
//! keypoints as `(y, x, score)` in COCO order. Inputs are letterboxed to keep
//! the aspect ratio, and coordinates are mapped back to the source frame.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use image::imageops::{self, FilterType};
use image::RgbImage;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, trace};

use vtryon_models::{Landmark, LandmarkName, PoseResult, ProcessingMode};

use super::{LandmarkSmoother, PoseEstimator, PoseEstimatorConfig, PoseSession};
use crate::error::{MediaError, MediaResult};
use crate::models::{load_session, resolve_model_path};

/// Default file name of the accurate single-shot model.
pub const MOVENET_THUNDER_FILE: &str = "movenet_thunder.onnx";

/// Default file name of the low-latency streaming model.
pub const MOVENET_LIGHTNING_FILE: &str = "movenet_lightning.onnx";

const OUTPUT_NAME: &str = "output_0";
const VALUES_PER_KEYPOINT: usize = 3;

struct MoveNetModel {
    session: Mutex<Session>,
    input_size: u32,
}

impl MoveNetModel {
    fn load(path: &Path, input_size: u32) -> MediaResult<Self> {
        Ok(Self {
            session: Mutex::new(load_session(path)?),
            input_size,
        })
    }

    /// Run the model and return the raw keypoint buffer.
    fn infer(&self, tensor: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::inference_failed("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| MediaError::inference_failed(format!("ORT run failed: {e}")))?;

        let output = outputs
            .get(OUTPUT_NAME)
            .ok_or_else(|| MediaError::inference_failed("ORT returned no keypoint output"))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::inference_failed(format!("ORT extract: {e}")))?;

        trace!(shape = ?shape, "MoveNet output");
        Ok(data.to_vec())
    }
}

/// Pose estimator backed by two MoveNet variants, one per processing mode.
pub struct OrtPoseEstimator {
    single_shot: Arc<MoveNetModel>,
    streaming: Arc<MoveNetModel>,
}

impl OrtPoseEstimator {
    /// Load both models from explicit paths.
    pub fn load(single_shot_model: &Path, streaming_model: &Path) -> MediaResult<Self> {
        let single = PoseEstimatorConfig::for_mode(ProcessingMode::SingleShot);
        let live = PoseEstimatorConfig::for_mode(ProcessingMode::Streaming);
        Ok(Self {
            single_shot: Arc::new(MoveNetModel::load(single_shot_model, single.input_size)?),
            streaming: Arc::new(MoveNetModel::load(streaming_model, live.input_size)?),
        })
    }

    /// Load both models, searching the default model directories for any
    /// path that is not configured.
    pub fn from_paths(single_shot_model: Option<&Path>, streaming_model: Option<&Path>) -> MediaResult<Self> {
        let single = resolve_model_path(single_shot_model, MOVENET_THUNDER_FILE)?;
        let live = resolve_model_path(streaming_model, MOVENET_LIGHTNING_FILE)?;
        Self::load(&single, &live)
    }
}

impl PoseEstimator for OrtPoseEstimator {
    fn open_session(&self, mode: ProcessingMode) -> MediaResult<Box<dyn PoseSession>> {
        let config = PoseEstimatorConfig::for_mode(mode);
        let model = match mode {
            ProcessingMode::SingleShot => Arc::clone(&self.single_shot),
            ProcessingMode::Streaming => Arc::clone(&self.streaming),
        };
        let smoother = config
            .smooth_landmarks
            .then(|| LandmarkSmoother::new(config.smoothing_alpha));

        Ok(Box::new(OrtPoseSession {
            model,
            config,
            smoother,
        }))
    }
}

struct OrtPoseSession {
    model: Arc<MoveNetModel>,
    config: PoseEstimatorConfig,
    smoother: Option<LandmarkSmoother>,
}

impl PoseSession for OrtPoseSession {
    fn estimate(&mut self, image: &RgbImage) -> MediaResult<PoseResult> {
        let letterbox = Letterbox::new(image.width(), image.height(), self.model.input_size)?;
        let tensor = letterbox.to_tensor(image)?;
        let raw = self.model.infer(tensor)?;

        let mut landmarks = decode_keypoints(&raw, &letterbox, &self.config)?;
        if let Some(smoother) = self.smoother.as_mut() {
            landmarks = smoother.smooth(landmarks);
        }

        let result = PoseResult::from_landmarks(landmarks);
        debug!(
            mode = %self.config.mode,
            detected = result.is_detected(),
            "Pose estimation complete"
        );
        Ok(result)
    }
}

/// Aspect-preserving fit of a frame into the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    size: u32,
    scaled_width: u32,
    scaled_height: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn new(width: u32, height: u32, size: u32) -> MediaResult<Self> {
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidDimensions { width, height });
        }
        let scale = size as f32 / width.max(height) as f32;
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, size);
        Ok(Self {
            size,
            scaled_width,
            scaled_height,
            pad_x: (size - scaled_width) / 2,
            pad_y: (size - scaled_height) / 2,
        })
    }

    /// Build the `[1, size, size, 3]` int32 input tensor.
    fn to_tensor(&self, image: &RgbImage) -> MediaResult<Value> {
        let resized = imageops::resize(image, self.scaled_width, self.scaled_height, FilterType::Triangle);
        let mut canvas = RgbImage::new(self.size, self.size);
        imageops::replace(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);

        let data: Vec<i32> = canvas.as_raw().iter().map(|&v| v as i32).collect();
        let shape = vec![1usize, self.size as usize, self.size as usize, 3];
        Tensor::from_array((shape, data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::inference_failed(format!("ORT tensor: {e}")))
    }

    /// Map normalized model coordinates back to normalized source coordinates.
    fn unproject(&self, nx: f32, ny: f32) -> (f32, f32) {
        let size = self.size as f32;
        let x = (nx * size - self.pad_x as f32) / self.scaled_width as f32;
        let y = (ny * size - self.pad_y as f32) / self.scaled_height as f32;
        (x, y)
    }
}

/// Turn raw MoveNet output into landmarks above the mode's threshold.
fn decode_keypoints(
    raw: &[f32],
    letterbox: &Letterbox,
    config: &PoseEstimatorConfig,
) -> MediaResult<BTreeMap<LandmarkName, Landmark>> {
    let expected = LandmarkName::COUNT * VALUES_PER_KEYPOINT;
    if raw.len() < expected {
        return Err(MediaError::inference_failed(format!(
            "Unexpected MoveNet output length: {} (expected {})",
            raw.len(),
            expected
        )));
    }

    let threshold = config.keep_threshold();
    let mut landmarks = BTreeMap::new();
    for (index, chunk) in raw.chunks_exact(VALUES_PER_KEYPOINT).take(LandmarkName::COUNT).enumerate() {
        let (ny, nx, score) = (chunk[0], chunk[1], chunk[2]);
        if score < threshold {
            continue;
        }
        let Some(name) = LandmarkName::from_index(index) else {
            continue;
        };
        let (x, y) = letterbox.unproject(nx, ny);
        landmarks.insert(name, Landmark::new(x, y, score));
    }
    Ok(landmarks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with(points: &[(usize, f32, f32, f32)]) -> Vec<f32> {
        let mut raw = vec![0.0; LandmarkName::COUNT * VALUES_PER_KEYPOINT];
        for &(index, y, x, score) in points {
            let base = index * VALUES_PER_KEYPOINT;
            raw[base] = y;
            raw[base + 1] = x;
            raw[base + 2] = score;
        }
        raw
    }

    #[test]
    fn test_square_letterbox_is_identity() {
        let letterbox = Letterbox::new(512, 512, 256).unwrap();
        assert_eq!(letterbox.pad_x, 0);
        assert_eq!(letterbox.pad_y, 0);
        let (x, y) = letterbox.unproject(0.25, 0.75);
        assert!((x - 0.25).abs() < 1e-6);
        assert!((y - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_portrait_letterbox_pads_horizontally() {
        // 100x200 into 192: scaled to 96x192, 48px pad each side
        let letterbox = Letterbox::new(100, 200, 192).unwrap();
        assert_eq!((letterbox.scaled_width, letterbox.scaled_height), (96, 192));
        assert_eq!(letterbox.pad_x, 48);

        // Centre of the model input is centre of the source
        let (x, y) = letterbox.unproject(0.5, 0.5);
        assert!((x - 0.5).abs() < 1e-6);
        assert!((y - 0.5).abs() < 1e-6);

        // Left edge of the content region is x = 0 in the source
        let (x, _) = letterbox.unproject(48.0 / 192.0, 0.5);
        assert!(x.abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_rejects_empty_frame() {
        assert!(Letterbox::new(0, 10, 192).is_err());
    }

    #[test]
    fn test_decode_filters_low_confidence() {
        let letterbox = Letterbox::new(256, 256, 256).unwrap();
        let config = PoseEstimatorConfig::for_mode(ProcessingMode::SingleShot);
        let raw = raw_with(&[(5, 0.3, 0.6, 0.9), (6, 0.3, 0.4, 0.49)]);

        let landmarks = decode_keypoints(&raw, &letterbox, &config).unwrap();
        assert_eq!(landmarks.len(), 1);
        let shoulder = landmarks[&LandmarkName::LeftShoulder];
        // MoveNet emits (y, x)
        assert!((shoulder.x - 0.6).abs() < 1e-6);
        assert!((shoulder.y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_decode_full_torso_is_detected() {
        let letterbox = Letterbox::new(256, 256, 256).unwrap();
        let config = PoseEstimatorConfig::for_mode(ProcessingMode::Streaming);
        let raw = raw_with(&[
            (5, 0.3, 0.65, 0.8),
            (6, 0.3, 0.35, 0.8),
            (11, 0.7, 0.6, 0.7),
            (12, 0.7, 0.4, 0.7),
        ]);

        let landmarks = decode_keypoints(&raw, &letterbox, &config).unwrap();
        assert!(PoseResult::from_landmarks(landmarks).torso().is_some());
    }

    #[test]
    fn test_decode_rejects_short_output() {
        let letterbox = Letterbox::new(256, 256, 256).unwrap();
        let config = PoseEstimatorConfig::for_mode(ProcessingMode::SingleShot);
        assert!(decode_keypoints(&[0.0; 10], &letterbox, &config).is_err());
    }
}
