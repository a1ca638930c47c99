//! Page assembly helpers
//!
//! Building single-page documents, appending content onto existing pages
//! and writing the transformation commands that place XObjects.

use crate::types::Result;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

// =============================================================================
// Document Construction
// =============================================================================

/// Resources referenced by a content stream
#[derive(Debug, Default, Clone)]
pub struct PageResources {
    pub xobjects: Vec<(String, ObjectId)>,
    pub fonts: Vec<(String, ObjectId)>,
}

impl PageResources {
    pub fn xobject(mut self, name: impl Into<String>, id: ObjectId) -> Self {
        self.xobjects.push((name.into(), id));
        self
    }

    pub fn font(mut self, name: impl Into<String>, id: ObjectId) -> Self {
        self.fonts.push((name.into(), id));
        self
    }
}

/// Give an empty document its page tree: one page of `width` × `height` points.
///
/// Objects the content refers to (images, fonts, forms) are expected to be
/// added to `doc` beforehand. Returns the page's object ID.
pub fn build_single_page(
    doc: &mut Document,
    width: f64,
    height: f64,
    content: Vec<u8>,
    resources: &PageResources,
) -> Result<ObjectId> {
    let pages_id = doc.new_object_id();

    let mut resource_dict = Dictionary::new();
    merge_resources(&mut resource_dict, resources)?;

    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(pages_id));
    page_dict.set("MediaBox", media_box(width, height));
    page_dict.set("Contents", Object::Reference(content_id));
    page_dict.set("Resources", Object::Dictionary(resource_dict));
    let page_id = doc.add_object(page_dict);

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages_dict.set("Count", Object::Integer(1));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    Ok(page_id)
}

fn media_box(width: f64, height: f64) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(width as f32),
        Object::Real(height as f32),
    ])
}

// =============================================================================
// Appending to Existing Pages
// =============================================================================

/// Append a content stream to a page, drawn on top of what is already there.
///
/// The existing content is wrapped in `q`/`Q` so graphics state left over
/// from it cannot leak into the new content.
pub fn append_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
    resources: &PageResources,
) -> Result<()> {
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), content));

    // Resolve an indirect Resources dictionary before mutably borrowing the page
    let resources_ref = match doc.get_dictionary(page_id)?.get(b"Resources") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    match resources_ref {
        Some(id) => merge_resources(doc.get_object_mut(id)?.as_dict_mut()?, resources)?,
        None => {
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            if !page.has(b"Resources") {
                page.set("Resources", Object::Dictionary(Dictionary::new()));
            }
            merge_resources(page.get_mut(b"Resources")?.as_dict_mut()?, resources)?;
        }
    }

    let existing = match doc.get_dictionary(page_id)?.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id)? {
            Object::Array(items) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));

    let mut contents = Vec::with_capacity(existing.len() + 3);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(overlay_id));

    doc.get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// Add XObject and Font entries to a resource dictionary
fn merge_resources(target: &mut Dictionary, resources: &PageResources) -> Result<()> {
    merge_category(target, b"XObject", &resources.xobjects)?;
    merge_category(target, b"Font", &resources.fonts)
}

fn merge_category(target: &mut Dictionary, key: &[u8], entries: &[(String, ObjectId)]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    if !target.has(key) {
        target.set(key.to_vec(), Object::Dictionary(Dictionary::new()));
    }
    let category = target.get_mut(key)?.as_dict_mut()?;
    for (name, id) in entries {
        category.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    Ok(())
}

// =============================================================================
// Content Commands
// =============================================================================

/// Draw an XObject whose unit square (image) is stretched to the given rect
pub fn place_image(name: &str, x: f64, y: f64, width: f64, height: f64) -> String {
    format!(
        "q {} 0 0 {} {} {} cm /{} Do Q\n",
        fmt_num(width),
        fmt_num(height),
        fmt_num(x),
        fmt_num(y),
        name
    )
}

/// Draw a Form XObject scaled uniformly by `scale`, with its BBox origin at (x, y)
pub fn place_form(name: &str, x: f64, y: f64, scale: f64, bbox_x0: f64, bbox_y0: f64) -> String {
    format!(
        "q {} 0 0 {} {} {} cm /{} Do Q\n",
        fmt_num(scale),
        fmt_num(scale),
        fmt_num(x - bbox_x0 * scale),
        fmt_num(y - bbox_y0 * scale),
        name
    )
}

/// Format a number for a content stream without exponent notation
pub(crate) fn fmt_num(value: f64) -> String {
    let formatted = format!("{:.4}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}
