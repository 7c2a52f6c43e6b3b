//! Image decoding and encoding helpers.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, RgbaImage};

use crate::error::{MediaError, MediaResult};

/// JPEG quality used for live results (matches what the web client sends).
pub const LIVE_JPEG_QUALITY: u8 = 80;

/// Decode an image from raw bytes (JPEG, PNG, WebP, ...).
pub fn decode_image(bytes: &[u8]) -> MediaResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(MediaError::decode("empty image payload"));
    }
    let image = image::load_from_memory(bytes).map_err(|e| MediaError::decode(e.to_string()))?;
    ensure_non_empty(&image)?;
    Ok(image)
}

/// Open and decode an image file.
pub fn open_image(path: impl AsRef<Path>) -> MediaResult<DynamicImage> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    // Sniff the content instead of trusting the extension; live frames are
    // always written with a .jpg suffix.
    let image = image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| MediaError::decode(format!("{}: {}", path.display(), e)))?;
    ensure_non_empty(&image)?;
    Ok(image)
}

/// Save an RGBA image as PNG, keeping transparency.
pub fn save_png(image: &RgbaImage, path: impl AsRef<Path>) -> MediaResult<()> {
    image
        .save_with_format(path.as_ref(), ImageFormat::Png)
        .map_err(|e| MediaError::encode(format!("PNG {}: {}", path.as_ref().display(), e)))
}

/// Save an image as JPEG, flattening the alpha channel.
pub fn save_jpeg(image: &RgbaImage, path: impl AsRef<Path>, quality: u8) -> MediaResult<()> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| MediaError::encode(format!("JPEG {}: {}", path.as_ref().display(), e)))
}

fn ensure_non_empty(image: &DynamicImage) -> MediaResult<()> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(MediaError::InvalidDimensions { width, height });
    }
    Ok(())
}
