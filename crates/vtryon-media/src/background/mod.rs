//! Background removal.
//!
//! Removers return an RGBA image of the same size as the input, with alpha 0
//! on background pixels and 255 (or a soft edge value) on the foreground.

mod u2net;

pub use u2net::{OrtBackgroundRemover, U2NET_INPUT_SIZE, U2NET_MODEL_FILE};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, RgbaImage};

use crate::error::{MediaError, MediaResult};

/// Segments the foreground subject of an image.
pub trait BackgroundRemover: Send + Sync {
    fn remove_background(&self, image: &DynamicImage) -> MediaResult<RgbaImage>;
}

/// Build an 8-bit mask from a raw saliency plane using min-max normalization.
pub fn normalize_mask(plane: &[f32], width: u32, height: u32) -> MediaResult<GrayImage> {
    let expected = width as usize * height as usize;
    if plane.len() < expected || expected == 0 {
        return Err(MediaError::inference_failed(format!(
            "Mask plane has {} values, expected {}x{}",
            plane.len(),
            width,
            height
        )));
    }

    let plane = &plane[..expected];
    let min = plane.iter().copied().fold(f32::MAX, f32::min);
    let max = plane.iter().copied().fold(f32::MIN, f32::max);
    let range = max - min;

    let data = plane
        .iter()
        .map(|&v| {
            let normalized = if range > f32::EPSILON { (v - min) / range } else { 0.0 };
            (normalized.clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect();

    GrayImage::from_raw(width, height, data)
        .ok_or_else(|| MediaError::internal("mask buffer size mismatch"))
}

/// Write a mask into the alpha channel of an image, resizing the mask to fit.
pub fn apply_alpha_mask(image: &DynamicImage, mask: &GrayImage) -> RgbaImage {
    let mut rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mask = if mask.dimensions() == (width, height) {
        mask.clone()
    } else {
        imageops::resize(mask, width, height, FilterType::Lanczos3)
    };

    for (pixel, alpha) in rgba.pixels_mut().zip(mask.pixels()) {
        pixel[3] = alpha[0];
    }
    rgba
}
