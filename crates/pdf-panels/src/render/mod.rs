//! PDF rendering helpers
//!
//! This module handles all PDF-specific operations:
//! - Creating Form XObjects from footer and panel pages
//! - Embedding and extracting image XObjects
//! - Building and appending page content
//! - Rasterizing pages through pdfium
//! - Loading and saving documents

mod image;
mod io;
mod page;
mod raster;
mod xobject;

pub use self::image::{
    ExtractedImage, RasterEncoding, embed_image, embed_rgb, extract_image, find_first_image,
};
pub use io::{
    DocumentInfo, load_document, load_pdf, save_document, save_pdf, set_document_info,
};
pub use page::{PageResources, append_to_page, place_form, place_image, build_single_page};
pub use raster::rasterize_first_page;
pub use xobject::{PageBox, copy_object_deep, create_page_xobject, first_page, get_page_box};
