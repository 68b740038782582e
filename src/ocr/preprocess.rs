//! Image pre-processing ahead of recognition. Photographed receipts are
//! low-contrast and skew-lit; greyscale + contrast stretch + a mild sharpen
//! measurably improve character accuracy. Every step is best-effort: any
//! failure falls back to the caller's original bytes.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat};

/// Longest allowed edge after pre-processing. Images are only ever scaled
/// down, never up beyond their original resolution.
const MAX_DIMENSION: u32 = 2400;

/// Unsharp-mask parameters tuned for receipt glyphs.
const SHARPEN_SIGMA: f32 = 1.2;
const SHARPEN_THRESHOLD: i32 = 2;

/// Decode, normalize and re-encode an image for the OCR engine.
pub fn prepare(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    let processed = pipeline(img);

    let mut out = Cursor::new(Vec::new());
    processed.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

fn pipeline(img: DynamicImage) -> DynamicImage {
    let gray = stretch_contrast(img.to_luma8());
    let mut processed = DynamicImage::ImageLuma8(gray);

    let (w, h) = (processed.width(), processed.height());
    if w > MAX_DIMENSION || h > MAX_DIMENSION {
        processed = processed.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
    }
    // Sharpen after resampling so the mask works on the final glyph size.
    processed.unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
}

/// Linear levels stretch: map the darkest pixel to 0 and the brightest to
/// 255. A flat image (min == max) is returned unchanged.
fn stretch_contrast(mut gray: GrayImage) -> GrayImage {
    let (mut min, mut max) = (u8::MAX, u8::MIN);
    for p in gray.pixels() {
        min = min.min(p.0[0]);
        max = max.max(p.0[0]);
    }
    if min >= max {
        return gray;
    }
    let range = (max - min) as f32;
    for p in gray.pixels_mut() {
        p.0[0] = (((p.0[0] - min) as f32 / range) * 255.0).round() as u8;
    }
    gray
}
