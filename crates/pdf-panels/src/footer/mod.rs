//! Footer compositing
//!
//! The footer page is scaled to the full panel width, keeping its aspect
//! ratio, and anchored to the bottom edge. Depending on the height tier it
//! is drawn as vector content on the tiled page, merged with the tiled page
//! into a fresh document, or rasterized and placed as an image. The design
//! name, material and height are then stamped on top, along with an
//! optional centered logo.

mod optimize;
mod text;

pub use optimize::optimize_footer;
pub use text::{
    STAMP_FONT, StampFont, encode_win_ansi, footer_fields, load_stamp_font, text_content,
};

use crate::constants::{LOGO_HEIGHT_RATIO, LOGO_WIDTH_RATIO, POINTS_PER_INCH};
use crate::enhance::write_png;
use crate::options::{PanelConfig, TierSettings};
use crate::render::{
    PageBox, PageResources, append_to_page, build_single_page, create_page_xobject, embed_image,
    first_page, get_page_box, load_document, place_form, place_image, rasterize_first_page,
    save_document, set_document_info,
};
use crate::tile::{TileLayout, TiledDocument, panel_info};
use crate::types::{FooterStrategy, PanelError, PanelSpec, Result};
use crate::workspace::Workspace;
use image::DynamicImage;
use log::info;
use lopdf::{Document, ObjectId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const FOOTER_XOBJECT: &str = "Footer";
const BASE_XOBJECT: &str = "Panel";
const LOGO_XOBJECT: &str = "Logo";

/// Footer inputs resolved for one panel
#[derive(Debug, Clone, PartialEq)]
pub struct FooterAsset {
    pub footer: PathBuf,
    pub logo: Option<PathBuf>,
    pub settings: TierSettings,
}

/// Finished panel written to the output directory
#[derive(Debug, Clone, PartialEq)]
pub struct FinalDocument {
    pub path: PathBuf,
    pub layout: TileLayout,
    pub footer_height: f64,
    pub strategy: FooterStrategy,
}

/// Resolve the footer (and logo) for a panel, checking that they exist
pub fn resolve_footer_asset(spec: &PanelSpec, config: &PanelConfig) -> Result<FooterAsset> {
    let footer = config.footer_path(spec.height_ft);
    require_file(&footer)?;

    let logo = config.logo_path();
    if let Some(logo) = &logo {
        require_file(logo)?;
    }

    Ok(FooterAsset {
        footer,
        logo,
        settings: config.tiers.settings_for_height(spec.height_ft),
    })
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PanelError::AssetMissing(path.to_path_buf()))
    }
}

/// Composite the footer, logo and text onto a tiled panel and save it.
///
/// The tiled document and any rasters made along the way are removed from
/// the workspace once the output has been written.
pub fn apply_footer(
    tiled: &TiledDocument,
    spec: &PanelSpec,
    asset: &FooterAsset,
    config: &PanelConfig,
    workspace: &Workspace,
) -> Result<FinalDocument> {
    let library_dir = config.pdfium_library_dir.as_deref();
    apply_footer_with(tiled, spec, asset, config, workspace, |pdf, scale, transparent| {
        rasterize_first_page(pdf, scale, transparent, library_dir)
    })
}

/// [`apply_footer`] with a caller-supplied page rasterizer.
///
/// `rasterize(pdf, scale, transparent)` renders the first page of `pdf`; it is
/// used for the raster footer strategy and for the logo.
pub fn apply_footer_with<R>(
    tiled: &TiledDocument,
    spec: &PanelSpec,
    asset: &FooterAsset,
    config: &PanelConfig,
    workspace: &Workspace,
    rasterize: R,
) -> Result<FinalDocument>
where
    R: Fn(&Path, f32, bool) -> Result<DynamicImage>,
{
    let layout = tiled.layout;
    let footer_doc = load_document(&asset.footer)?;
    let footer_page = first_page(&footer_doc)?;
    let footer_box = get_page_box(&footer_doc, footer_page)?;

    let scale = layout.page_width / footer_box.width;
    let footer_height = footer_box.height * scale;

    let mut consumed = vec![tiled.path.clone()];
    let mut content = String::new();
    let mut resources = PageResources::default();

    let tiled_doc = load_document(&tiled.path)?;
    let tiled_page = first_page(&tiled_doc)?;

    // Merging starts from an empty document; the other strategies draw on the tiled page
    let (mut doc, page_id) = match asset.settings.strategy {
        FooterStrategy::VectorMerge => {
            let mut merged = Document::with_version("1.7");
            let base_box = get_page_box(&tiled_doc, tiled_page)?;
            let base_id =
                create_page_xobject(&mut merged, &tiled_doc, tiled_page, &mut HashMap::new())?;
            content.push_str(&place_form(
                BASE_XOBJECT,
                0.0,
                0.0,
                1.0,
                base_box.x0,
                base_box.y0,
            ));
            resources = resources.xobject(BASE_XOBJECT, base_id);
            (merged, None)
        }
        FooterStrategy::VectorOverlay | FooterStrategy::Raster { .. } => {
            (tiled_doc, Some(tiled_page))
        }
    };

    match asset.settings.strategy {
        FooterStrategy::VectorOverlay | FooterStrategy::VectorMerge => {
            let footer_id =
                create_page_xobject(&mut doc, &footer_doc, footer_page, &mut HashMap::new())?;
            content.push_str(&place_footer_form(&footer_box, scale));
            resources = resources.xobject(FOOTER_XOBJECT, footer_id);
        }
        FooterStrategy::Raster { resolution } => {
            let raster_path = workspace.file(&format!("footer_{}ft.png", spec.height_ft));
            let footer_id = embed_rasterized(
                &mut doc,
                &rasterize,
                &asset.footer,
                resolution,
                false,
                &raster_path,
            )?;
            consumed.push(raster_path);
            content.push_str(&place_raster_footer(layout.page_width, footer_height));
            resources = resources.xobject(FOOTER_XOBJECT, footer_id);
        }
    }

    if let Some(logo) = &asset.logo {
        let raster_path = workspace.file(&format!("logo_{}ft.png", spec.height_ft));
        let logo_id = embed_rasterized(
            &mut doc,
            &rasterize,
            logo,
            asset.settings.logo_resolution,
            true,
            &raster_path,
        )?;
        consumed.push(raster_path);
        content.push_str(&place_logo(layout.page_width, footer_height));
        resources = resources.xobject(LOGO_XOBJECT, logo_id);
    }

    let font = load_stamp_font(&mut doc, config.font_path.as_deref());
    resources = resources.font(STAMP_FONT, font.id);
    let mut content = content.into_bytes();
    content.extend(text_content(
        &footer_fields(spec, &config.text),
        asset.settings.font_size.unwrap_or(config.text.font_size),
        layout.page_width,
        footer_height,
    )?);

    match page_id {
        Some(page_id) => append_to_page(&mut doc, page_id, content, &resources)?,
        None => {
            build_single_page(
                &mut doc,
                layout.page_width,
                layout.page_height,
                content,
                &resources,
            )?;
        }
    }
    set_document_info(&mut doc, &panel_info(spec));

    let path = config.output_dir.join(spec.output_file_name());
    save_document(&mut doc, &path)?;

    for temp in &consumed {
        workspace.discard(temp);
    }

    info!(
        "Wrote {} ({:?} footer, {:.2} pt tall, font {})",
        path.display(),
        asset.settings.strategy,
        footer_height,
        font.base_font
    );

    Ok(FinalDocument {
        path,
        layout,
        footer_height,
        strategy: asset.settings.strategy,
    })
}

fn place_footer_form(footer_box: &PageBox, scale: f64) -> String {
    place_form(FOOTER_XOBJECT, 0.0, 0.0, scale, footer_box.x0, footer_box.y0)
}

/// Rasterized footer stretched across the bottom band
fn place_raster_footer(page_width: f64, footer_height: f64) -> String {
    place_image(FOOTER_XOBJECT, 0.0, 0.0, page_width, footer_height)
}

/// Logo centered in the footer band, sized from the footer height
fn place_logo(page_width: f64, footer_height: f64) -> String {
    let logo_width = footer_height * LOGO_WIDTH_RATIO;
    let logo_height = footer_height * LOGO_HEIGHT_RATIO;
    place_image(
        LOGO_XOBJECT,
        (page_width - logo_width) / 2.0,
        (footer_height - logo_height) / 2.0,
        logo_width,
        logo_height,
    )
}

/// Rasterize the first page of `pdf_path`, keep the PNG in the workspace and
/// embed it into `doc`
fn embed_rasterized<R>(
    doc: &mut Document,
    rasterize: &R,
    pdf_path: &Path,
    resolution: f32,
    keep_alpha: bool,
    raster_path: &Path,
) -> Result<ObjectId>
where
    R: Fn(&Path, f32, bool) -> Result<DynamicImage>,
{
    let rendered = rasterize(pdf_path, resolution, keep_alpha)?;
    let rendered = if keep_alpha {
        DynamicImage::ImageRgba8(rendered.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(rendered.to_rgb8())
    };

    let dpi = (POINTS_PER_INCH * resolution as f64).round() as u32;
    write_png(raster_path, &rendered, dpi)?;
    let raster = image::open(raster_path)?;
    embed_image(doc, &raster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_footer_fills_bottom_band() {
        assert_eq!(
            place_raster_footer(1739.3386, 434.8347),
            "q 1739.3386 0 0 434.8347 0 0 cm /Footer Do Q\n"
        );
    }

    #[test]
    fn logo_is_centered_in_footer() {
        // 1.5 x 0.7 footer heights, centered on a 1000 x 200 band
        assert_eq!(
            place_logo(1000.0, 200.0),
            "q 300 0 0 140 350 30 cm /Logo Do Q\n"
        );
    }
}
