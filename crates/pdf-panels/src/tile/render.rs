//! Tiled panel document rendering

use super::layout::{TileLayout, check_resolution};
use crate::constants::{PDF_AUTHOR, PDF_PRODUCER};
use crate::enhance::EnhancedImage;
use crate::options::PanelConfig;
use crate::render::{
    DocumentInfo, PageResources, build_single_page, embed_image, place_image, save_document,
    set_document_info,
};
use crate::types::{PanelSpec, Result};
use crate::workspace::Workspace;
use image::imageops::FilterType;
use log::{info, warn};
use lopdf::Document;
use std::path::PathBuf;

const TILE_XOBJECT: &str = "Tile";

/// One-page PDF holding the tiled image, before the footer is applied
#[derive(Debug, Clone, PartialEq)]
pub struct TiledDocument {
    pub path: PathBuf,
    pub layout: TileLayout,
}

/// Resize the enhanced image to panel width and tile it up the page.
///
/// The resized tile is embedded once and drawn `tile_count` times.
pub fn tile(
    enhanced: &EnhancedImage,
    spec: &PanelSpec,
    config: &PanelConfig,
    workspace: &Workspace,
) -> Result<TiledDocument> {
    let bleed_points = config.bleed_table.points(spec.bleed);
    let layout = TileLayout::compute(spec, bleed_points, enhanced.width, enhanced.height)?;

    let check = check_resolution(enhanced.width, enhanced.height, spec);
    if check.is_undersized() {
        warn!(
            "Source is {}x{} px, {}x{} px needed for {} dpi at {}x{} ft; it will be upscaled",
            check.image_width,
            check.image_height,
            check.required_width,
            check.required_height,
            spec.dpi,
            spec.width_ft,
            spec.height_ft
        );
    }

    let source = image::open(&enhanced.path)?;
    let resized = source.resize_exact(
        layout.tile_px_width,
        layout.tile_px_height,
        FilterType::Lanczos3,
    );

    let mut doc = Document::with_version("1.7");
    let image_id = embed_image(&mut doc, &resized)?;

    let mut content = String::new();
    for index in 0..layout.tile_count {
        content.push_str(&place_image(
            TILE_XOBJECT,
            0.0,
            layout.tile_origin(index),
            layout.tile_px_width as f64,
            layout.tile_px_height as f64,
        ));
    }

    build_single_page(
        &mut doc,
        layout.page_width,
        layout.page_height,
        content.into_bytes(),
        &PageResources::default().xobject(TILE_XOBJECT, image_id),
    )?;
    set_document_info(&mut doc, &panel_info(spec));

    let path = workspace.file(&format!(
        "tiled_{}",
        spec.output_file_name()
    ));
    save_document(&mut doc, &path)?;

    info!(
        "Tiled {} x{} ({}x{} px tile, page {:.2}x{:.2} pt, overshoot {:.2} pt)",
        spec.output_file_name(),
        layout.tile_count,
        layout.tile_px_width,
        layout.tile_px_height,
        layout.page_width,
        layout.page_height,
        layout.overshoot
    );

    Ok(TiledDocument { path, layout })
}

/// Info dictionary contents for a panel
pub(crate) fn panel_info(spec: &PanelSpec) -> DocumentInfo {
    DocumentInfo {
        title: format!(
            "{} {}ft {}mm",
            spec.substrate.code(),
            spec.height_ft,
            spec.bleed.mm()
        ),
        author: PDF_AUTHOR.to_string(),
        subject: format!("High-Quality Print for {}", spec.design_name),
        keywords: format!(
            "large format, high quality, print, {}mm bleed",
            spec.bleed.mm()
        ),
        producer: PDF_PRODUCER.to_string(),
    }
}
