//! Source image enhancement
//!
//! Contrast, brightness and sharpness are each applied by blending the
//! image against a "degenerate" version of itself:
//! - contrast: a flat image at the mean luminance
//! - brightness: a black image
//! - sharpness: the image run through a 3×3 smoothing kernel
//!
//! A factor of 1.0 leaves the image unchanged, values above 1.0 push away
//! from the degenerate image. The order of the three steps affects the
//! result and is fixed.

use crate::options::EnhancementSettings;
use crate::types::{PanelError, Result};
use crate::workspace::Workspace;
use image::imageops::filter3x3;
use image::{DynamicImage, RgbImage};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Smoothing kernel used as the degenerate image for sharpness
const SMOOTH_KERNEL: [f32; 9] = [
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    5.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
];

const INCHES_PER_METER: f64 = 1.0 / 0.0254;

/// Enhanced intermediate written into the run workspace
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Decode `source`, enhance it and write the result as a PNG into the workspace.
pub fn enhance(
    source: &Path,
    settings: &EnhancementSettings,
    workspace: &Workspace,
) -> Result<EnhancedImage> {
    let decoded = image::open(source).map_err(|e| PanelError::Decode {
        path: source.to_path_buf(),
        source: e,
    })?;

    let mut rgb = decoded.to_rgb8();
    apply_enhancements(&mut rgb, settings);

    let (width, height) = rgb.dimensions();
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    let path = workspace.file(&format!("enhanced_{}.png", stem));
    write_png(&path, &DynamicImage::ImageRgb8(rgb), settings.dpi)?;

    info!(
        "Enhanced {} ({}x{}, contrast {}, brightness {}, sharpness {})",
        source.display(),
        width,
        height,
        settings.contrast,
        settings.brightness,
        settings.sharpness
    );

    Ok(EnhancedImage {
        path,
        width,
        height,
    })
}

/// Apply contrast, brightness and sharpness in that order
pub fn apply_enhancements(image: &mut RgbImage, settings: &EnhancementSettings) {
    adjust_contrast(image, settings.contrast);
    adjust_brightness(image, settings.brightness);
    adjust_sharpness(image, settings.sharpness);
}

pub(crate) fn adjust_contrast(image: &mut RgbImage, factor: f32) {
    let mean = mean_luminance(image);
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = blend(mean, *channel as f32, factor);
        }
    }
}

pub(crate) fn adjust_brightness(image: &mut RgbImage, factor: f32) {
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = blend(0.0, *channel as f32, factor);
        }
    }
}

/// Border pixels are left untouched, matching the smoothing filter's extent.
pub(crate) fn adjust_sharpness(image: &mut RgbImage, factor: f32) {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return;
    }

    let smoothed: RgbImage = filter3x3(&*image, &SMOOTH_KERNEL);
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let degenerate = smoothed.get_pixel(x, y).0;
            let pixel = image.get_pixel_mut(x, y);
            for (channel, smooth) in pixel.0.iter_mut().zip(degenerate) {
                *channel = blend(smooth as f32, *channel as f32, factor);
            }
        }
    }
}

/// Rounded mean of ITU-R 601 luma over the whole image.
///
/// Per-pixel luma is rounded in 16-bit fixed point.
fn mean_luminance(image: &RgbImage) -> f32 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let total: u64 = image
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            (r as u64 * 19595 + g as u64 * 38470 + b as u64 * 7471 + 0x8000) >> 16
        })
        .sum();
    (total as f64 / count as f64).round() as f32
}

/// Interpolate in single precision and truncate toward zero
fn blend(degenerate: f32, value: f32, factor: f32) -> u8 {
    (degenerate + factor * (value - degenerate)).clamp(0.0, 255.0) as u8
}

/// Write a PNG with best compression and a pHYs tag for `dpi`.
///
/// Images with alpha are written as RGBA, everything else as RGB.
pub(crate) fn write_png(path: &Path, image: &DynamicImage, dpi: u32) -> Result<()> {
    let (color, data) = if image.color().has_alpha() {
        (png::ColorType::Rgba, image.to_rgba8().into_raw())
    } else {
        (png::ColorType::Rgb, image.to_rgb8().into_raw())
    };

    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width(), image.height());
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Best);

    let pixels_per_meter = (dpi as f64 * INCHES_PER_METER).round() as u32;
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: pixels_per_meter,
        yppu: pixels_per_meter,
        unit: png::Unit::Meter,
    }));

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&data)?;
    writer.finish()?;
    Ok(())
}
