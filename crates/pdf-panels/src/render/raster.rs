//! Page rasterization through pdfium
//!
//! Only available with the `raster` feature. The shared library is looked up
//! in the configured directory first, then in `vendor/pdfium/lib` under the
//! working directory, then on the system search path.

use crate::types::{PanelError, Result};
use image::DynamicImage;
use std::path::Path;

#[cfg(feature = "raster")]
use pdfium_render::prelude::*;

#[cfg(feature = "raster")]
fn init_pdfium(library_dir: Option<&Path>) -> std::result::Result<Pdfium, PdfiumError> {
    let vendor_path = std::env::current_dir().ok().and_then(|mut p| {
        p.push("vendor/pdfium/lib");
        if p.exists() { Some(p) } else { None }
    });

    let candidates = library_dir.map(Path::to_path_buf).into_iter().chain(vendor_path);
    for dir in candidates {
        if let Ok(binding) =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
        {
            return Ok(Pdfium::new(binding));
        }
    }

    Pdfium::bind_to_system_library().map(Pdfium::new)
}

/// Render the first page of `pdf_path` at `scale`× its point size.
///
/// With `transparent` the bitmap starts fully transparent, so areas the page
/// does not paint keep alpha 0. Otherwise it is cleared to opaque white.
#[cfg(feature = "raster")]
pub fn rasterize_first_page(
    pdf_path: &Path,
    scale: f32,
    transparent: bool,
    library_dir: Option<&Path>,
) -> Result<DynamicImage> {
    let rasterize_error = |e: PdfiumError| PanelError::Rasterize(e.to_string());

    let pdfium = init_pdfium(library_dir).map_err(rasterize_error)?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(rasterize_error)?;
    let page = document.pages().get(0).map_err(rasterize_error)?;

    let config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_clear_color(clear_color(transparent));
    let bitmap = page.render_with_config(&config).map_err(rasterize_error)?;

    let width = bitmap.width() as u32;
    let height = bitmap.height() as u32;
    let rgba = bitmap.as_rgba_bytes().to_vec();
    image::RgbaImage::from_raw(width, height, rgba)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| PanelError::Rasterize("bitmap size mismatch".to_string()))
}

#[cfg(feature = "raster")]
fn clear_color(transparent: bool) -> PdfColor {
    if transparent {
        PdfColor::new(255, 255, 255, 0)
    } else {
        PdfColor::WHITE
    }
}

#[cfg(not(feature = "raster"))]
pub fn rasterize_first_page(
    pdf_path: &Path,
    _scale: f32,
    _transparent: bool,
    _library_dir: Option<&Path>,
) -> Result<DynamicImage> {
    Err(PanelError::Rasterize(format!(
        "cannot rasterize {}: built without the `raster` feature",
        pdf_path.display()
    )))
}

#[cfg(all(test, feature = "raster"))]
mod tests {
    use super::*;

    #[test]
    fn transparent_renders_clear_to_zero_alpha() {
        assert_eq!(clear_color(true).alpha(), 0);
        assert_eq!(clear_color(false).alpha(), 255);
        assert_eq!(clear_color(true).red(), 255);
    }
}
