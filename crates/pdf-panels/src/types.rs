use crate::constants::{BLEED_2MM_POINTS, BLEED_3MM_POINTS, ft_to_pt};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Asset not found: {}", .0.display())]
    AssetMissing(PathBuf),
    #[error("Failed to decode source image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Unsupported footer image: {0}")]
    UnsupportedImage(String),
    #[error("Rasterization failed: {0}")]
    Rasterize(String),
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PanelError>;

/// Coarse classification used when reporting batch outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AssetMissing,
    Decode,
    Write,
    Other,
}

impl PanelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PanelError::AssetMissing(_) => ErrorKind::AssetMissing,
            PanelError::Decode { .. } => ErrorKind::Decode,
            PanelError::Write { .. } => ErrorKind::Write,
            _ => ErrorKind::Other,
        }
    }
}

/// Physical wallpaper material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Substrate {
    #[cfg_attr(feature = "serde", serde(rename = "TRAD"))]
    Traditional,
    #[cfg_attr(feature = "serde", serde(rename = "P&S"))]
    PeelAndStick,
    #[cfg_attr(feature = "serde", serde(rename = "PP"))]
    PrePasted,
}

impl Substrate {
    pub const ALL: [Substrate; 3] = [
        Substrate::Traditional,
        Substrate::PeelAndStick,
        Substrate::PrePasted,
    ];

    /// Short code used in file names and metadata
    pub fn code(self) -> &'static str {
        match self {
            Substrate::Traditional => "TRAD",
            Substrate::PeelAndStick => "P&S",
            Substrate::PrePasted => "PP",
        }
    }

    /// Full material name stamped onto the footer
    pub fn material_name(self) -> &'static str {
        match self {
            Substrate::Traditional => "Traditional",
            Substrate::PeelAndStick => "Peel & Stick",
            Substrate::PrePasted => "Pre-Pasted",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl fmt::Display for Substrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Bleed margin added to each side of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bleed {
    #[cfg_attr(feature = "serde", serde(rename = "2mm"))]
    Mm2,
    #[cfg_attr(feature = "serde", serde(rename = "3mm"))]
    Mm3,
}

impl Bleed {
    pub fn mm(self) -> u32 {
        match self {
            Bleed::Mm2 => 2,
            Bleed::Mm3 => 3,
        }
    }

    pub fn from_mm(mm: u32) -> Option<Self> {
        match mm {
            2 => Some(Bleed::Mm2),
            3 => Some(Bleed::Mm3),
            _ => None,
        }
    }
}

impl fmt::Display for Bleed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mm", self.mm())
    }
}

/// Point values for each recognized bleed
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BleedTable {
    pub mm2_points: f64,
    pub mm3_points: f64,
}

impl Default for BleedTable {
    fn default() -> Self {
        Self {
            mm2_points: BLEED_2MM_POINTS,
            mm3_points: BLEED_3MM_POINTS,
        }
    }
}

impl BleedTable {
    pub fn points(&self, bleed: Bleed) -> f64 {
        match bleed {
            Bleed::Mm2 => self.mm2_points,
            Bleed::Mm3 => self.mm3_points,
        }
    }
}

/// Height classification driving footer fidelity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightTier {
    Standard,
    /// The tallest configured panels, rendered with the high-fidelity footer path
    Tall,
}

impl HeightTier {
    pub fn for_height(height_ft: u32, tall_threshold_ft: u32) -> Self {
        if height_ft >= tall_threshold_ft {
            HeightTier::Tall
        } else {
            HeightTier::Standard
        }
    }
}

/// Check that a design name can be used as an output file name prefix
pub fn validate_design_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PanelError::Config("Design name must not be empty".to_string()));
    }
    if name.contains(|c: char| c == '/' || c == '\\') {
        return Err(PanelError::Config(format!(
            "Design name must not contain path separators: {}",
            name
        )));
    }
    Ok(())
}

/// How the footer page is composited onto the panel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind")
)]
pub enum FooterStrategy {
    /// Footer page drawn into the tiled page as a Form XObject
    VectorOverlay,
    /// Fresh document holding both the tiled page and the footer as Form XObjects
    VectorMerge,
    /// Footer rasterized at `resolution`× and placed as an image
    Raster { resolution: f32 },
}

/// Configuration for one output panel
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSpec {
    pub height_ft: u32,
    pub width_ft: f64,
    pub substrate: Substrate,
    pub bleed: Bleed,
    pub design_name: String,
    pub dpi: u32,
}

impl PanelSpec {
    pub fn validate(&self) -> Result<()> {
        if self.height_ft == 0 {
            return Err(PanelError::Config("Panel height must be positive".to_string()));
        }
        if !(self.width_ft.is_finite() && self.width_ft > 0.0) {
            return Err(PanelError::Config("Panel width must be positive".to_string()));
        }
        validate_design_name(&self.design_name)?;
        if self.dpi == 0 {
            return Err(PanelError::Config("DPI must be positive".to_string()));
        }
        Ok(())
    }

    /// Trim width in points, before bleed
    pub fn width_points(&self) -> f64 {
        ft_to_pt(self.width_ft)
    }

    pub fn height_points(&self) -> f64 {
        ft_to_pt(self.height_ft as f64)
    }

    /// Label stamped onto the footer, e.g. `13ft"`
    pub fn height_label(&self) -> String {
        format!("{}ft\"", self.height_ft)
    }

    pub fn output_file_name(&self) -> String {
        output_file_name(&self.design_name, self.substrate, self.height_ft, self.bleed)
    }
}

/// Deterministic output name: `{design}_{substrate}_{height}ft_{bleed}mm.pdf`
pub fn output_file_name(design_name: &str, substrate: Substrate, height_ft: u32, bleed: Bleed) -> String {
    format!(
        "{}_{}_{}ft_{}mm.pdf",
        design_name,
        substrate.code(),
        height_ft,
        bleed.mm()
    )
}

/// Outcome of the source resolution check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionCheck {
    pub image_width: u32,
    pub image_height: u32,
    pub required_width: u32,
    pub required_height: u32,
}

impl ResolutionCheck {
    /// True when the source has to be upscaled to reach the target DPI
    pub fn is_undersized(&self) -> bool {
        self.image_width < self.required_width || self.image_height < self.required_height
    }
}
