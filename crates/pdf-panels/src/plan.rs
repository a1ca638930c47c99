//! Dry-run planning: geometry and footer treatment for every combination,
//! without decoding more than the source header or writing any file

use crate::batch::combinations;
use crate::options::PanelConfig;
use crate::tile::{TileLayout, check_resolution};
use crate::types::{FooterStrategy, HeightTier, PanelSpec, ResolutionCheck, Result};
use std::path::{Path, PathBuf};

/// What a combination would produce
#[derive(Debug, Clone, PartialEq)]
pub struct PanelPlan {
    pub spec: PanelSpec,
    pub output_path: PathBuf,
    pub footer_path: PathBuf,
    pub tier: HeightTier,
    pub strategy: FooterStrategy,
    pub layout: TileLayout,
    pub resolution: ResolutionCheck,
}

/// Plan every combination for a source of `source_dims` pixels
pub fn plan_batch(
    source_dims: (u32, u32),
    design_name: &str,
    config: &PanelConfig,
) -> Result<Vec<PanelPlan>> {
    config.validate()?;
    let (width, height) = source_dims;

    combinations(design_name, config)
        .into_iter()
        .map(|spec| {
            let layout =
                TileLayout::compute(&spec, config.bleed_table.points(spec.bleed), width, height)?;
            let tier = config.tiers.tier(spec.height_ft);
            Ok(PanelPlan {
                output_path: config.output_dir.join(spec.output_file_name()),
                footer_path: config.footer_path(spec.height_ft),
                tier,
                strategy: config.tiers.settings(tier).strategy,
                layout,
                resolution: check_resolution(width, height, &spec),
                spec,
            })
        })
        .collect()
}

/// Source pixel size from the image header
pub fn source_dimensions(source: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(source).map_err(|e| crate::types::PanelError::Decode {
        path: source.to_path_buf(),
        source: e,
    })
}
