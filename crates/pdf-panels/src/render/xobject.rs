//! Form XObject creation from existing pages
//!
//! Footer pages (and, for the merge strategy, the tiled panel page itself)
//! are copied into the output document as Form XObjects, which keeps them
//! as vector content and lets them be placed with a single `cm` transform.

use crate::types::{PanelError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// A page's MediaBox in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub width: f64,
    pub height: f64,
}

// =============================================================================
// XObject Creation
// =============================================================================

/// Copy a source page into `output` as a Form XObject.
///
/// Objects referenced by the page's resources are deep-copied once and
/// tracked in `cache`, so several XObjects from the same source share them.
pub fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;
    let page_box = get_page_box(source, page_id)?;
    let content_data = get_page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Real(page_box.x0 as f32),
            Object::Real(page_box.y0 as f32),
            Object::Real((page_box.x0 + page_box.width) as f32),
            Object::Real((page_box.y0 + page_box.height) as f32),
        ]),
    );
    xobject_dict.set("FormType", Object::Integer(1));

    if let Some(resources) = inherited_attribute(source, page_id, b"Resources")? {
        xobject_dict.set(
            "Resources",
            copy_object_deep(output, source, &resources, cache)?,
        );
    }

    Ok(output.add_object(Stream::new(xobject_dict, content_data)))
}

/// Look up a page attribute, walking up the page tree for inheritable keys
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
    let mut current = doc.get_dictionary(page_id)?;
    // Bounded walk guards against cyclic Parent links
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Ok(Some(value.clone()));
        }
        match current.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent_id) => current = doc.get_dictionary(parent_id)?,
            Err(_) => return Ok(None),
        }
    }
    Ok(None)
}

// =============================================================================
// Page Content Extraction
// =============================================================================

/// Get the decoded content stream data of a page
fn get_page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()), // No content = blank page
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(arr) => get_concatenated_content_streams(doc, arr),
            Object::Stream(stream) => Ok(decoded_stream(stream)),
            _ => Ok(Vec::new()),
        },
        Object::Array(arr) => get_concatenated_content_streams(doc, arr),
        _ => Ok(Vec::new()),
    }
}

fn get_concatenated_content_streams(doc: &Document, refs: &[Object]) -> Result<Vec<u8>> {
    let mut result = Vec::new();

    for obj in refs {
        if let Object::Reference(id) = obj {
            if let Ok(stream) = doc.get_object(*id)?.as_stream() {
                result.extend_from_slice(&decoded_stream(stream));
                result.push(b'\n');
            }
        }
    }

    Ok(result)
}

fn decoded_stream(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// Uses a cache to avoid copying the same object multiple times.
pub fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            // Reserve the id first so self-referencing structures terminate
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let referenced = source.get_object(*id)?;
            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Stream(Stream {
                dict: new_dict,
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: None,
            }))
        }
        _ => Ok(obj.clone()),
    }
}

// =============================================================================
// Page Geometry
// =============================================================================

/// Get a page's MediaBox, following page-tree inheritance
pub fn get_page_box(doc: &Document, page_id: ObjectId) -> Result<PageBox> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")?
        .ok_or_else(|| PanelError::Config("Page has no MediaBox".to_string()))?;
    let media_box = match media_box {
        Object::Reference(id) => doc.get_object(id)?.clone(),
        other => other,
    };
    let values: Vec<f64> = media_box
        .as_array()?
        .iter()
        .filter_map(extract_number)
        .collect();

    if values.len() != 4 {
        return Err(PanelError::Config("Malformed MediaBox".to_string()));
    }

    let (x0, x1) = (values[0].min(values[2]), values[0].max(values[2]));
    let (y0, y1) = (values[1].min(values[3]), values[1].max(values[3]));
    if x1 - x0 <= 0.0 || y1 - y0 <= 0.0 {
        return Err(PanelError::Config("Degenerate MediaBox".to_string()));
    }

    Ok(PageBox {
        x0,
        y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

/// First page of a document
pub fn first_page(doc: &Document) -> Result<ObjectId> {
    doc.get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| PanelError::Config("Document has no pages".to_string()))
}

/// Extract numeric value from a PDF object
pub(crate) fn extract_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}
