//! Batch orchestration
//!
//! A batch covers every substrate × height × bleed combination in the
//! configuration for one source image. Combinations run one at a time; a
//! failing combination is logged and recorded, and the rest still run.

use crate::enhance::enhance;
use crate::footer::{FinalDocument, apply_footer, optimize_footer, resolve_footer_asset};
use crate::options::PanelConfig;
use crate::tile::tile;
use crate::types::{PanelError, PanelSpec, Result, validate_design_name};
use crate::workspace::Workspace;
use log::{error, info};
use std::path::Path;

/// Result of one combination
#[derive(Debug)]
pub struct PanelOutcome {
    pub spec: PanelSpec,
    pub result: Result<FinalDocument>,
}

/// Per-combination results of a batch, in generation order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<PanelOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &FinalDocument> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&PanelSpec, &PanelError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.spec, e)))
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Every combination for `design_name`, ordered substrate, then height, then bleed
pub fn combinations(design_name: &str, config: &PanelConfig) -> Vec<PanelSpec> {
    let mut specs = Vec::with_capacity(
        config.substrates.len() * config.heights_ft.len() * config.bleeds.len(),
    );
    for &substrate in &config.substrates {
        for &height_ft in &config.heights_ft {
            for &bleed in &config.bleeds {
                specs.push(config.panel_spec(design_name, substrate, height_ft, bleed));
            }
        }
    }
    specs
}

/// Design name derived from the source file name
pub fn design_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Decode the source once, returning its pixel size
pub fn probe_source(source: &Path) -> Result<(u32, u32)> {
    let decoded = image::open(source).map_err(|e| PanelError::Decode {
        path: source.to_path_buf(),
        source: e,
    })?;
    Ok((decoded.width(), decoded.height()))
}

/// Produce one panel: enhance, tile, optionally optimize the footer, composite.
///
/// Assets are checked before any image work starts. All intermediates live
/// in a workspace that is removed when this returns.
pub fn generate_panel_sync(
    source: &Path,
    spec: &PanelSpec,
    config: &PanelConfig,
) -> Result<FinalDocument> {
    spec.validate()?;
    let mut asset = resolve_footer_asset(spec, config)?;
    let workspace = Workspace::create(config.scratch_dir.as_deref())?;

    let enhanced = enhance(source, &config.enhancement, &workspace)?;
    let tiled = tile(&enhanced, spec, config, &workspace)?;
    workspace.discard(&enhanced.path);

    let original_footer = asset.footer.clone();
    if config.footer_optimization.enabled {
        let optimized = workspace.file(&format!("optimized_footer_{}ft.pdf", spec.height_ft));
        asset.footer = optimize_footer(
            &asset.footer,
            &optimized,
            &config.footer_optimization,
            &workspace,
        )?;
    }

    let result = apply_footer(&tiled, spec, &asset, config, &workspace)?;
    if asset.footer != original_footer {
        workspace.discard(&asset.footer);
    }
    Ok(result)
}

/// Async wrapper running [`generate_panel_sync`] on the blocking pool
pub async fn generate_panel(
    source: impl AsRef<Path>,
    spec: &PanelSpec,
    config: &PanelConfig,
) -> Result<FinalDocument> {
    config.validate()?;

    let source = source.as_ref().to_owned();
    let spec = spec.clone();
    let config = config.clone();

    tokio::task::spawn_blocking(move || generate_panel_sync(&source, &spec, &config)).await?
}

/// Generate every combination for one source image.
///
/// Returns `Err` only when the batch cannot start: invalid configuration,
/// an empty or path-like design name, an undecodable source or an unusable output
/// directory. Per-combination failures are collected in the report.
pub async fn generate_batch(
    source: impl AsRef<Path>,
    design_name: &str,
    config: &PanelConfig,
) -> Result<BatchReport> {
    config.validate()?;
    validate_design_name(design_name)?;

    let source = source.as_ref().to_owned();
    let probe_path = source.clone();
    let (width, height) = tokio::task::spawn_blocking(move || probe_source(&probe_path)).await??;
    info!("Source {} is {}x{} px", source.display(), width, height);

    tokio::fs::create_dir_all(&config.output_dir).await?;

    let mut report = BatchReport::default();
    for spec in combinations(design_name, config) {
        info!(
            "Generating {} {}ft {}",
            spec.substrate.code(),
            spec.height_ft,
            spec.bleed
        );
        let result = generate_panel(&source, &spec, config).await;
        match &result {
            Ok(doc) => info!("Created {}", doc.path.display()),
            Err(e) => error!("Failed {}: {}", spec.output_file_name(), e),
        }
        report.outcomes.push(PanelOutcome { spec, result });
    }

    Ok(report)
}
