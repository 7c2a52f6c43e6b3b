//! Garment placement geometry.
//!
//! Turns torso landmarks into the rectangle a garment is drawn into:
//!
//! 1. Landmarks are scaled to pixels.
//! 2. The torso box spans both shoulders and hips horizontally, and runs from
//!    the highest shoulder down to the lowest hip.
//! 3. Live frames get 2% padding on each side to absorb landmark jitter.
//! 4. Boxes that are too small or too wide are replaced by a centred fallback.
//! 5. The garment is scaled to fit the box on both axes, aspect preserved,
//!    centred horizontally and hung from the top edge (the shoulder line).

use serde::Serialize;
use tracing::debug;

use vtryon_models::{PlacementRect, ProcessingMode, TorsoLandmarks};

use crate::error::{MediaError, MediaResult};

/// Minimum torso box width before falling back.
pub const MIN_BOX_WIDTH: u32 = 20;

/// Minimum torso box height before falling back.
pub const MIN_BOX_HEIGHT: u32 = 50;

/// Maximum torso box width/height ratio before falling back.
pub const MAX_BOX_ASPECT: f64 = 2.5;

/// Padding added to each side of the box in streaming mode, as a fraction of image size.
pub const STREAMING_PADDING_RATIO: f32 = 0.02;

/// Final geometry for one garment paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GarmentPlacement {
    /// Box the garment was fitted into
    pub target_box: PlacementRect,
    /// Where the resized garment lands (always inside `target_box`)
    pub garment_rect: PlacementRect,
    /// Whether the landmark box was rejected in favour of the fixed fallback
    pub used_fallback: bool,
}

/// Compute the raw torso bounding box in pixels, clamped to the image.
///
/// The result may be degenerate (even zero-sized); see [`is_degenerate`].
pub fn torso_box(
    torso: &TorsoLandmarks,
    image_width: u32,
    image_height: u32,
    mode: ProcessingMode,
) -> PlacementRect {
    let w = image_width as f32;
    let h = image_height as f32;

    let xs = [
        torso.left_shoulder.x,
        torso.right_shoulder.x,
        torso.left_hip.x,
        torso.right_hip.x,
    ];
    let mut min_x = xs.iter().copied().fold(f32::MAX, f32::min) * w;
    let mut max_x = xs.iter().copied().fold(f32::MIN, f32::max) * w;
    let mut min_y = torso.left_shoulder.y.min(torso.right_shoulder.y) * h;
    let mut max_y = torso.left_hip.y.max(torso.right_hip.y) * h;

    if mode == ProcessingMode::Streaming {
        let pad_x = w * STREAMING_PADDING_RATIO;
        let pad_y = h * STREAMING_PADDING_RATIO;
        min_x -= pad_x;
        max_x += pad_x;
        min_y -= pad_y;
        max_y += pad_y;
    }

    let min_x = min_x.clamp(0.0, w) as u32;
    let max_x = max_x.clamp(0.0, w) as u32;
    let min_y = min_y.clamp(0.0, h) as u32;
    let max_y = max_y.clamp(0.0, h) as u32;

    PlacementRect::new(
        min_x,
        min_y,
        max_x.saturating_sub(min_x),
        max_y.saturating_sub(min_y),
    )
}

/// Whether a torso box is too noisy to trust.
pub fn is_degenerate(rect: &PlacementRect) -> bool {
    rect.width < MIN_BOX_WIDTH || rect.height < MIN_BOX_HEIGHT || rect.aspect_ratio() > MAX_BOX_ASPECT
}

/// Fixed centred box covering the middle quarter-to-three-quarters of the image.
pub fn fallback_box(image_width: u32, image_height: u32) -> PlacementRect {
    let width = (image_width / 2).clamp(1, image_width.max(1));
    let height = (image_height / 2).clamp(1, image_height.max(1));
    PlacementRect::new(image_width / 4, image_height / 4, width, height)
}

/// Scale a garment to fit inside a box without distorting it.
///
/// Width is matched first; if the derived height overflows, height is matched
/// instead. Both axes are bounded by the box afterwards.
pub fn fit_garment(
    garment_width: u32,
    garment_height: u32,
    target: &PlacementRect,
) -> MediaResult<(u32, u32)> {
    if garment_width == 0 || garment_height == 0 {
        return Err(MediaError::InvalidDimensions {
            width: garment_width,
            height: garment_height,
        });
    }
    if target.width == 0 || target.height == 0 {
        return Err(MediaError::internal("placement box is empty"));
    }

    let ratio = garment_height as f64 / garment_width as f64;

    let mut width = target.width as f64;
    let mut height = (width * ratio).round();
    if height > target.height as f64 {
        height = target.height as f64;
        width = (height / ratio).round();
    }

    let width = (width as u32).clamp(1, target.width);
    let height = (height as u32).clamp(1, target.height);
    Ok((width, height))
}

/// Resolve the box and garment rectangle for a detected torso.
pub fn compute_placement(
    torso: &TorsoLandmarks,
    image_width: u32,
    image_height: u32,
    garment_width: u32,
    garment_height: u32,
    mode: ProcessingMode,
) -> MediaResult<GarmentPlacement> {
    if image_width == 0 || image_height == 0 {
        return Err(MediaError::InvalidDimensions {
            width: image_width,
            height: image_height,
        });
    }

    let computed = torso_box(torso, image_width, image_height, mode);
    let used_fallback = is_degenerate(&computed);
    let target_box = if used_fallback {
        debug!(
            width = computed.width,
            height = computed.height,
            aspect = computed.aspect_ratio(),
            "Torso box rejected, using fallback placement"
        );
        fallback_box(image_width, image_height)
    } else {
        computed
    };

    let (width, height) = fit_garment(garment_width, garment_height, &target_box)?;
    let garment_rect = PlacementRect::new(
        target_box.x + (target_box.width - width) / 2,
        target_box.y,
        width,
        height,
    );

    Ok(GarmentPlacement {
        target_box,
        garment_rect,
        used_fallback,
    })
}
