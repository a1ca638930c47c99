use crate::constants::*;
use crate::types::*;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Image enhancement parameters, applied in field order
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnhancementSettings {
    pub contrast: f32,
    pub brightness: f32,
    pub sharpness: f32,
    /// DPI recorded in the enhanced intermediate image
    pub dpi: u32,
}

impl Default for EnhancementSettings {
    fn default() -> Self {
        Self {
            contrast: DEFAULT_CONTRAST,
            brightness: DEFAULT_BRIGHTNESS,
            sharpness: DEFAULT_SHARPNESS,
            dpi: ENHANCED_IMAGE_DPI,
        }
    }
}

/// Footer raster optimization parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FooterOptimization {
    /// Run the optimizer on the footer before compositing
    pub enabled: bool,
    pub upscale_factor: f32,
    pub sharpness_factor: f32,
}

impl Default for FooterOptimization {
    fn default() -> Self {
        Self {
            enabled: false,
            upscale_factor: DEFAULT_FOOTER_UPSCALE,
            sharpness_factor: DEFAULT_FOOTER_SHARPNESS,
        }
    }
}

/// Where footer documents are found inside the footer directory
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "kind")
)]
pub enum FooterSelection {
    /// One footer document for every panel height
    Shared { file: PathBuf },
    /// One footer per height; `{height}` in the template is replaced
    PerHeight { template: String },
}

impl Default for FooterSelection {
    fn default() -> Self {
        FooterSelection::Shared {
            file: PathBuf::from(DEFAULT_SHARED_FOOTER),
        }
    }
}

impl FooterSelection {
    /// Footer file name (relative to the footer directory) for a panel height
    pub fn file_for_height(&self, height_ft: u32) -> PathBuf {
        match self {
            FooterSelection::Shared { file } => file.clone(),
            FooterSelection::PerHeight { template } => {
                PathBuf::from(template.replace(HEIGHT_PLACEHOLDER, &height_ft.to_string()))
            }
        }
    }
}

/// Footer handling for one height tier
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TierSettings {
    pub strategy: FooterStrategy,
    /// Scale factor used when rasterizing the logo
    pub logo_resolution: f32,
    /// Stamp font size for this tier, overriding `TextLayout::font_size`
    #[cfg_attr(feature = "serde", serde(default))]
    pub font_size: Option<f32>,
}

/// Maps panel heights onto footer treatments
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TierPolicy {
    pub tall_threshold_ft: u32,
    pub standard: TierSettings,
    pub tall: TierSettings,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            tall_threshold_ft: DEFAULT_TALL_THRESHOLD_FT,
            standard: TierSettings {
                strategy: FooterStrategy::VectorOverlay,
                logo_resolution: STANDARD_RASTER_RESOLUTION,
                font_size: None,
            },
            tall: TierSettings {
                strategy: FooterStrategy::VectorMerge,
                logo_resolution: TALL_RASTER_RESOLUTION,
                font_size: None,
            },
        }
    }
}

impl TierPolicy {
    pub fn tier(&self, height_ft: u32) -> HeightTier {
        HeightTier::for_height(height_ft, self.tall_threshold_ft)
    }

    pub fn settings(&self, tier: HeightTier) -> TierSettings {
        match tier {
            HeightTier::Standard => self.standard,
            HeightTier::Tall => self.tall,
        }
    }

    pub fn settings_for_height(&self, height_ft: u32) -> TierSettings {
        self.settings(self.tier(height_ft))
    }
}

/// A text field position in the footer band
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextAnchor {
    /// Distance from the right page edge to the text origin
    pub from_right: f64,
    /// Distance from the top of the footer down to the text baseline
    pub below_footer_top: f64,
}

impl From<(f64, f64)> for TextAnchor {
    fn from((from_right, below_footer_top): (f64, f64)) -> Self {
        Self {
            from_right,
            below_footer_top,
        }
    }
}

/// Fixed text layout stamped into the footer
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextLayout {
    pub design: TextAnchor,
    pub material: TextAnchor,
    pub height: TextAnchor,
    pub font_size: f32,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            design: DESIGN_TEXT_OFFSET.into(),
            material: MATERIAL_TEXT_OFFSET.into(),
            height: HEIGHT_TEXT_OFFSET.into(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

/// Complete batch configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct PanelConfig {
    // Assets
    pub footer_dir: PathBuf,
    pub footer: FooterSelection,
    /// Logo document, relative to `footer_dir`
    pub logo_file: Option<PathBuf>,
    /// Preferred display font (TTF/OTF); Helvetica is used when unavailable
    pub font_path: Option<PathBuf>,
    /// Directory holding the pdfium shared library, if not installed system-wide
    pub pdfium_library_dir: Option<PathBuf>,

    // Output
    pub output_dir: PathBuf,
    /// Parent for per-run scratch directories; the system temp dir when unset
    pub scratch_dir: Option<PathBuf>,

    // Panel geometry
    pub width_ft: f64,
    pub dpi: u32,
    pub bleed_table: BleedTable,

    // Batch cross-product
    pub substrates: Vec<Substrate>,
    pub heights_ft: Vec<u32>,
    pub bleeds: Vec<Bleed>,

    // Processing
    pub enhancement: EnhancementSettings,
    pub footer_optimization: FooterOptimization,
    pub tiers: TierPolicy,
    pub text: TextLayout,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            footer_dir: PathBuf::from("."),
            footer: FooterSelection::default(),
            logo_file: None,
            font_path: None,
            pdfium_library_dir: None,
            output_dir: PathBuf::from("."),
            scratch_dir: None,
            width_ft: DEFAULT_WIDTH_FT,
            dpi: DEFAULT_DPI,
            bleed_table: BleedTable::default(),
            substrates: Substrate::ALL.to_vec(),
            heights_ft: DEFAULT_HEIGHTS_FT.to_vec(),
            bleeds: vec![Bleed::Mm2, Bleed::Mm3],
            enhancement: EnhancementSettings::default(),
            footer_optimization: FooterOptimization::default(),
            tiers: TierPolicy::default(),
            text: TextLayout::default(),
        }
    }
}

impl PanelConfig {
    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let config = serde_json::from_slice(&bytes)
            .map_err(|e| PanelError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PanelError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.substrates.is_empty() {
            return Err(PanelError::Config("No substrates specified".to_string()));
        }
        if self.heights_ft.is_empty() {
            return Err(PanelError::Config("No panel heights specified".to_string()));
        }
        if self.heights_ft.contains(&0) {
            return Err(PanelError::Config("Panel heights must be positive".to_string()));
        }
        if self.bleeds.is_empty() {
            return Err(PanelError::Config("No bleed values specified".to_string()));
        }
        if !(self.width_ft.is_finite() && self.width_ft > 0.0) {
            return Err(PanelError::Config("Panel width must be positive".to_string()));
        }
        if self.dpi == 0 {
            return Err(PanelError::Config("DPI must be positive".to_string()));
        }

        let bleeds = [self.bleed_table.mm2_points, self.bleed_table.mm3_points];
        if bleeds.iter().any(|b| !(b.is_finite() && *b >= 0.0)) {
            return Err(PanelError::Config(
                "Bleed point values must be non-negative".to_string(),
            ));
        }

        let e = &self.enhancement;
        if [e.contrast, e.brightness, e.sharpness]
            .iter()
            .any(|f| !(f.is_finite() && *f >= 0.0))
        {
            return Err(PanelError::Config(
                "Enhancement factors must be non-negative".to_string(),
            ));
        }

        let opt = &self.footer_optimization;
        if !(opt.upscale_factor.is_finite() && opt.upscale_factor > 0.0) {
            return Err(PanelError::Config(
                "Footer upscale factor must be positive".to_string(),
            ));
        }

        for settings in [self.tiers.standard, self.tiers.tall] {
            if let FooterStrategy::Raster { resolution } = settings.strategy {
                if !(resolution.is_finite() && resolution > 0.0) {
                    return Err(PanelError::Config(
                        "Raster footer resolution must be positive".to_string(),
                    ));
                }
            }
            if !(settings.logo_resolution.is_finite() && settings.logo_resolution > 0.0) {
                return Err(PanelError::Config(
                    "Logo resolution must be positive".to_string(),
                ));
            }
            if let Some(size) = settings.font_size {
                if !(size.is_finite() && size > 0.0) {
                    return Err(PanelError::Config("Font size must be positive".to_string()));
                }
            }
        }

        if let FooterSelection::PerHeight { template } = &self.footer {
            if !template.contains(HEIGHT_PLACEHOLDER) {
                return Err(PanelError::Config(format!(
                    "Per-height footer template must contain {}",
                    HEIGHT_PLACEHOLDER
                )));
            }
        }

        if !(self.text.font_size.is_finite() && self.text.font_size > 0.0) {
            return Err(PanelError::Config("Font size must be positive".to_string()));
        }

        Ok(())
    }

    /// Resolved footer document path for a panel height
    pub fn footer_path(&self, height_ft: u32) -> PathBuf {
        self.footer_dir.join(self.footer.file_for_height(height_ft))
    }

    pub fn logo_path(&self) -> Option<PathBuf> {
        self.logo_file.as_ref().map(|file| self.footer_dir.join(file))
    }

    /// Build the spec for one combination
    pub fn panel_spec(
        &self,
        design_name: &str,
        substrate: Substrate,
        height_ft: u32,
        bleed: Bleed,
    ) -> PanelSpec {
        PanelSpec {
            height_ft,
            width_ft: self.width_ft,
            substrate,
            bleed,
            design_name: design_name.to_string(),
            dpi: self.dpi,
        }
    }
}
