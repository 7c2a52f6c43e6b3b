//! Garment compositing.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use vtryon_models::{PoseResult, ProcessingMode};

use crate::error::{MediaError, MediaResult};
use crate::placement::{compute_placement, GarmentPlacement};

/// Resampling filter used to scale garments for a mode.
pub fn resampling_filter(mode: ProcessingMode) -> FilterType {
    match mode {
        ProcessingMode::SingleShot => FilterType::Lanczos3,
        ProcessingMode::Streaming => FilterType::Triangle,
    }
}

/// Paste a garment onto a copy of the user image at the given placement.
///
/// The garment's alpha channel is the paste mask: fully transparent pixels
/// leave the user image untouched.
pub fn composite_garment(
    user: &DynamicImage,
    garment: &RgbaImage,
    placement: &GarmentPlacement,
    mode: ProcessingMode,
) -> RgbaImage {
    let rect = placement.garment_rect;
    let resized = if garment.dimensions() == (rect.width, rect.height) {
        garment.clone()
    } else {
        imageops::resize(garment, rect.width, rect.height, resampling_filter(mode))
    };

    let mut canvas = user.to_rgba8();
    let (canvas_w, canvas_h) = canvas.dimensions();

    for (gx, gy, pixel) in resized.enumerate_pixels() {
        let (x, y) = (rect.x + gx, rect.y + gy);
        if x >= canvas_w || y >= canvas_h {
            continue;
        }
        let alpha = pixel[3];
        if alpha == 0 {
            continue;
        }
        let base = canvas.get_pixel_mut(x, y);
        *base = if alpha == u8::MAX {
            *pixel
        } else {
            blend(base, pixel, alpha)
        };
    }

    canvas
}

/// Linear interpolation of every channel by the mask value.
fn blend(base: &Rgba<u8>, top: &Rgba<u8>, alpha: u8) -> Rgba<u8> {
    let a = alpha as u32;
    let mix = |b: u8, t: u8| ((t as u32 * a + b as u32 * (255 - a) + 127) / 255) as u8;
    Rgba([
        mix(base[0], top[0]),
        mix(base[1], top[1]),
        mix(base[2], top[2]),
        mix(base[3], top[3]),
    ])
}

/// Place and composite a garment using a pose result.
///
/// Fails with [`MediaError::PoseNotDetected`] when the torso is incomplete.
pub fn try_on(
    user: &DynamicImage,
    garment: &RgbaImage,
    pose: &PoseResult,
    mode: ProcessingMode,
) -> MediaResult<(RgbaImage, GarmentPlacement)> {
    let torso = pose.torso().ok_or(MediaError::PoseNotDetected)?;
    let placement = compute_placement(
        &torso,
        user.width(),
        user.height(),
        garment.width(),
        garment.height(),
        mode,
    )?;

    debug!(
        mode = %mode,
        box_x = placement.target_box.x,
        box_y = placement.target_box.y,
        box_w = placement.target_box.width,
        box_h = placement.target_box.height,
        garment_w = placement.garment_rect.width,
        garment_h = placement.garment_rect.height,
        fallback = placement.used_fallback,
        "Computed garment placement"
    );

    let composited = composite_garment(user, garment, &placement, mode);
    Ok((composited, placement))
}
