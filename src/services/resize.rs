// src/services/resize.rs

//! Raster decode, resize and JPEG encode.
//!
//! All functions here are CPU-bound; async callers run them on the
//! blocking pool.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageResult};

use crate::models::SizeSpec;

/// Decode JPEG bytes into a raster.
pub fn decode_jpeg(bytes: &[u8]) -> ImageResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
}

/// Resize to exactly the target dimensions using bilinear filtering.
///
/// Aspect ratio is not preserved.
pub fn resize(raster: &DynamicImage, target: SizeSpec) -> DynamicImage {
    raster.resize_exact(target.width(), target.height(), FilterType::Triangle)
}

/// Encode a raster as baseline JPEG.
pub fn encode_jpeg(raster: &DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    // JPEG carries no alpha channel.
    let rgb = raster.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;
    Ok(buf)
}

/// Resize then encode, the unit of CPU work for one stored variant.
pub fn render_variant(
    raster: &DynamicImage,
    target: SizeSpec,
    quality: u8,
) -> ImageResult<Vec<u8>> {
    encode_jpeg(&resize(raster, target), quality)
}
