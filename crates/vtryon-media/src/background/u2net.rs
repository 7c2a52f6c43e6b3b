//! U²-Net salient object matting through ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::debug;

use super::{apply_alpha_mask, normalize_mask, BackgroundRemover};
use crate::error::{MediaError, MediaResult};
use crate::models::{load_session, resolve_model_path};

/// Default file name of the matting model.
pub const U2NET_MODEL_FILE: &str = "u2net.onnx";

/// Square edge of the model input.
pub const U2NET_INPUT_SIZE: u32 = 320;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Background remover running a U²-Net style model on the CPU.
pub struct OrtBackgroundRemover {
    session: Mutex<Session>,
}

impl OrtBackgroundRemover {
    pub fn load(model_path: &Path) -> MediaResult<Self> {
        Ok(Self {
            session: Mutex::new(load_session(model_path)?),
        })
    }

    /// Load from a configured path or the default model directories.
    pub fn from_path(model_path: Option<&Path>) -> MediaResult<Self> {
        let path = resolve_model_path(model_path, U2NET_MODEL_FILE)?;
        Self::load(&path)
    }

    fn infer(&self, tensor: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::inference_failed("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| MediaError::inference_failed(format!("ORT run failed: {e}")))?;

        // U²-Net emits several side outputs; the first is the fused mask.
        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::inference_failed(format!("ORT extract: {e}")))?;

        Ok(data.to_vec())
    }
}

impl BackgroundRemover for OrtBackgroundRemover {
    fn remove_background(&self, image: &DynamicImage) -> MediaResult<RgbaImage> {
        if image.width() == 0 || image.height() == 0 {
            return Err(MediaError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
            });
        }

        let tensor = to_normalized_tensor(image)?;
        let plane = self.infer(tensor)?;
        let mask = normalize_mask(&plane, U2NET_INPUT_SIZE, U2NET_INPUT_SIZE)?;

        debug!(
            width = image.width(),
            height = image.height(),
            "Background mask computed"
        );
        Ok(apply_alpha_mask(image, &mask))
    }
}

/// Resize to the model input and build an ImageNet-normalized NCHW tensor.
fn to_normalized_tensor(image: &DynamicImage) -> MediaResult<Value> {
    let data = normalized_chw(image);
    let size = U2NET_INPUT_SIZE as usize;
    Tensor::from_array((vec![1usize, 3, size, size], data.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| MediaError::inference_failed(format!("ORT tensor: {e}")))
}

fn normalized_chw(image: &DynamicImage) -> Vec<f32> {
    let resized = image
        .resize_exact(U2NET_INPUT_SIZE, U2NET_INPUT_SIZE, FilterType::Lanczos3)
        .to_rgb8();
    let plane = (U2NET_INPUT_SIZE * U2NET_INPUT_SIZE) as usize;

    let mut chw = vec![0.0f32; plane * 3];
    for (i, pixel) in resized.pixels().enumerate() {
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            chw[c * plane + i] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    chw
}
