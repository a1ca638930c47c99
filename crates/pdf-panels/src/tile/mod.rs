//! Tile compositing: scaling the enhanced image to panel width and stacking
//! it to panel height

mod layout;
mod render;

pub use layout::{TileLayout, check_resolution};
pub use render::{TiledDocument, tile};
pub(crate) use render::panel_info;
