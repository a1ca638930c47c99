//! Shared constants for panel generation
//!
//! This module centralizes unit conversions and the default values that
//! seed [`PanelConfig`](crate::PanelConfig).

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per inch
pub const POINTS_PER_INCH: f64 = 72.0;

/// Points per foot (12 inches × 72 points)
pub const POINTS_PER_FOOT: f64 = 12.0 * POINTS_PER_INCH;

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f64 = 72.0 / 25.4;

/// Convert feet to points
#[inline]
pub fn ft_to_pt(ft: f64) -> f64 {
    ft * POINTS_PER_FOOT
}

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * POINTS_PER_MM
}

// =============================================================================
// Bleed
// =============================================================================

/// 2mm bleed in points
pub const BLEED_2MM_POINTS: f64 = 5.6693;

/// 3mm bleed in points
pub const BLEED_3MM_POINTS: f64 = 8.5039;

// =============================================================================
// Enhancement Defaults
// =============================================================================

pub const DEFAULT_CONTRAST: f32 = 1.2;
pub const DEFAULT_BRIGHTNESS: f32 = 1.1;
pub const DEFAULT_SHARPNESS: f32 = 1.3;

/// DPI tag written into the enhanced intermediate image
pub const ENHANCED_IMAGE_DPI: u32 = 600;

// =============================================================================
// Footer Optimization Defaults
// =============================================================================

pub const DEFAULT_FOOTER_UPSCALE: f32 = 4.0;
pub const DEFAULT_FOOTER_SHARPNESS: f32 = 1.2;

/// DPI tag written into the optimized footer raster
pub const OPTIMIZED_FOOTER_DPI: u32 = 1200;

// =============================================================================
// Panel Defaults
// =============================================================================

pub const DEFAULT_WIDTH_FT: f64 = 2.0;
pub const DEFAULT_HEIGHTS_FT: [u32; 2] = [13, 27];
pub const DEFAULT_DPI: u32 = 1200;

/// Panels at or above this height use the tall-tier footer treatment
pub const DEFAULT_TALL_THRESHOLD_FT: u32 = 27;

/// Footer raster / logo resolution multipliers per tier
pub const STANDARD_RASTER_RESOLUTION: f32 = 3.0;
pub const TALL_RASTER_RESOLUTION: f32 = 6.0;

// =============================================================================
// Footer Text
// =============================================================================

pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Offsets measured from the right page edge (x) and down from the
/// footer's top edge (y).
pub const DESIGN_TEXT_OFFSET: (f64, f64) = (430.0, 49.0);
pub const MATERIAL_TEXT_OFFSET: (f64, f64) = (430.0, 65.0);
pub const HEIGHT_TEXT_OFFSET: (f64, f64) = (155.0, 55.0);

/// Logo box relative to footer height
pub const LOGO_WIDTH_RATIO: f64 = 1.5;
pub const LOGO_HEIGHT_RATIO: f64 = 0.7;

// =============================================================================
// Assets
// =============================================================================

pub const DEFAULT_SHARED_FOOTER: &str = "LPfooter.pdf";

/// Placeholder substituted with the panel height in per-height footer names
pub const HEIGHT_PLACEHOLDER: &str = "{height}";

// =============================================================================
// Document Metadata
// =============================================================================

pub const PDF_AUTHOR: &str = "Automated PDF Generator";
pub const PDF_PRODUCER: &str = "pdf-panels";
