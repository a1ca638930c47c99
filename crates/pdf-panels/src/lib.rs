pub mod batch;
pub mod constants;
mod enhance;
pub mod footer;
mod options;
mod plan;
pub mod render;
pub mod tile;
mod types;
mod workspace;

pub use batch::{
    BatchReport, PanelOutcome, combinations, design_name_from_path, generate_batch,
    generate_panel, generate_panel_sync, probe_source,
};
pub use enhance::{EnhancedImage, apply_enhancements, enhance};
pub use footer::{
    FinalDocument, FooterAsset, apply_footer, apply_footer_with, optimize_footer,
    resolve_footer_asset,
};
pub use options::*;
pub use plan::{PanelPlan, plan_batch, source_dimensions};
pub use render::{load_pdf, save_pdf};
pub use tile::{TileLayout, TiledDocument, check_resolution, tile};
pub use types::*;
pub use workspace::Workspace;
