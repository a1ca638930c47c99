//! Footer raster optimization
//!
//! Footers exported from layout tools often carry a single low-resolution
//! raster. The optimizer pulls that raster out, upscales and sharpens it and
//! writes a new one-page footer of the same size holding only the improved
//! image.

use crate::constants::OPTIMIZED_FOOTER_DPI;
use crate::enhance::{adjust_sharpness, write_png};
use crate::options::FooterOptimization;
use crate::render::{
    PageResources, build_single_page, embed_image, extract_image, find_first_image, first_page,
    get_page_box, load_document, place_image, save_document,
};
use crate::types::{PanelError, Result};
use crate::workspace::Workspace;
use image::DynamicImage;
use image::imageops::FilterType;
use log::info;
use lopdf::Document;
use std::path::{Path, PathBuf};

const FOOTER_IMAGE: &str = "FooterImage";

/// Rebuild `footer_path` around an upscaled copy of its first image.
///
/// Returns the path of the footer to use: `output_path` on success, or
/// `footer_path` unchanged when the footer has no embedded image.
pub fn optimize_footer(
    footer_path: &Path,
    output_path: &Path,
    options: &FooterOptimization,
    workspace: &Workspace,
) -> Result<PathBuf> {
    if !(options.upscale_factor.is_finite() && options.upscale_factor > 0.0) {
        return Err(PanelError::Config(
            "Footer upscale factor must be positive".to_string(),
        ));
    }

    let doc = load_document(footer_path)?;
    let page_id = first_page(&doc)?;
    let page_box = get_page_box(&doc, page_id)?;

    let Some(image_id) = find_first_image(&doc, page_id)? else {
        info!("No embedded image in {}, keeping it as is", footer_path.display());
        return Ok(footer_path.to_path_buf());
    };

    let extracted = extract_image(&doc, image_id)?;
    let extracted_path = workspace.file(&format!(
        "footer_extracted.{}",
        extracted.encoding.extension()
    ));
    match &extracted.encoded {
        Some(bytes) => std::fs::write(&extracted_path, bytes)?,
        None => extracted.image.save(&extracted_path)?,
    }

    let source = image::open(&extracted_path)?;
    let width = ((source.width() as f32 * options.upscale_factor).round() as u32).max(1);
    let height = ((source.height() as f32 * options.upscale_factor).round() as u32).max(1);
    let mut upscaled = source
        .resize_exact(width, height, FilterType::Lanczos3)
        .to_rgb8();
    adjust_sharpness(&mut upscaled, options.sharpness_factor);

    let hq_path = workspace.file("footer_hq.png");
    write_png(&hq_path, &DynamicImage::ImageRgb8(upscaled), OPTIMIZED_FOOTER_DPI)?;
    let hq = image::open(&hq_path)?;

    let mut out = Document::with_version("1.7");
    let image_id = embed_image(&mut out, &hq)?;
    build_single_page(
        &mut out,
        page_box.width,
        page_box.height,
        place_image(FOOTER_IMAGE, 0.0, 0.0, page_box.width, page_box.height).into_bytes(),
        &PageResources::default().xobject(FOOTER_IMAGE, image_id),
    )?;
    save_document(&mut out, output_path)?;

    workspace.discard(&extracted_path);
    workspace.discard(&hq_path);

    info!(
        "Optimized footer {} -> {} ({}x{} to {}x{} px)",
        footer_path.display(),
        output_path.display(),
        source.width(),
        source.height(),
        width,
        height
    );

    Ok(output_path.to_path_buf())
}
