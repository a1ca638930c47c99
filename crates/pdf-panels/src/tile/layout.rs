//! Tiling geometry
//!
//! One pixel of the resized tile maps to one point on the page. The tile is
//! resized to span the full bleed-extended width and is repeated bottom-up
//! until the stack reaches past the top of the page.

use crate::types::{PanelError, PanelSpec, ResolutionCheck, Result};

/// Page size and tile arrangement for one panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileLayout {
    /// Trim width plus bleed on both sides
    pub page_width: f64,
    pub page_height: f64,
    pub tile_px_width: u32,
    pub tile_px_height: u32,
    pub tile_count: u32,
    /// Total height covered by the tile stack
    pub stack_height: f64,
    /// Portion of the stack above the page, clipped by the MediaBox
    pub overshoot: f64,
}

impl TileLayout {
    /// Compute the layout for a panel from the enhanced image's pixel size.
    pub fn compute(
        spec: &PanelSpec,
        bleed_points: f64,
        image_width: u32,
        image_height: u32,
    ) -> Result<Self> {
        spec.validate()?;
        if image_width == 0 || image_height == 0 {
            return Err(PanelError::Config(format!(
                "Image has no pixels ({}x{})",
                image_width, image_height
            )));
        }
        if !(bleed_points.is_finite() && bleed_points >= 0.0) {
            return Err(PanelError::Config(format!(
                "Invalid bleed: {} pt",
                bleed_points
            )));
        }

        let page_width = spec.width_points() + 2.0 * bleed_points;
        let page_height = spec.height_points();

        let tile_px_width = page_width.ceil() as u32;
        let scaled = image_height as f64 * tile_px_width as f64 / image_width as f64;
        let tile_px_height = (scaled.round() as u32).max(1);

        let tile_count = (page_height / tile_px_height as f64).floor() as u32 + 1;
        let stack_height = tile_count as f64 * tile_px_height as f64;

        Ok(Self {
            page_width,
            page_height,
            tile_px_width,
            tile_px_height,
            tile_count,
            stack_height,
            overshoot: stack_height - page_height,
        })
    }

    /// Bottom edge of tile `index`, in points from the page bottom
    pub fn tile_origin(&self, index: u32) -> f64 {
        index as f64 * self.tile_px_height as f64
    }
}

/// Compare the source size against the pixels needed for full DPI at print size
pub fn check_resolution(image_width: u32, image_height: u32, spec: &PanelSpec) -> ResolutionCheck {
    let inches_wide = spec.width_ft * 12.0;
    let inches_high = spec.height_ft as f64 * 12.0;
    ResolutionCheck {
        image_width,
        image_height,
        required_width: (inches_wide * spec.dpi as f64).round() as u32,
        required_height: (inches_high * spec.dpi as f64).round() as u32,
    }
}
