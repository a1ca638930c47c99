//! Document I/O and final-save cleanup

use crate::types::{PanelError, Result};
use lopdf::{Dictionary, Document, Object};
use log::debug;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Metadata written into a document's Info dictionary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub producer: String,
}

/// Replace the document's Info dictionary
pub fn set_document_info(doc: &mut Document, info: &DocumentInfo) {
    let mut dict = Dictionary::new();
    for (key, value) in [
        ("Title", &info.title),
        ("Author", &info.author),
        ("Subject", &info.subject),
        ("Keywords", &info.keywords),
        ("Producer", &info.producer),
    ] {
        if !value.is_empty() {
            dict.set(key, Object::string_literal(value.as_str()));
        }
    }
    let info_id = doc.add_object(dict);
    doc.trailer.set("Info", Object::Reference(info_id));
}

/// Load a PDF from disk
pub fn load_document(path: &Path) -> Result<Document> {
    Ok(Document::load(path)?)
}

/// Clean up and write a document.
///
/// Unreferenced objects and empty streams are dropped, objects renumbered and
/// streams compressed. The bytes go to a temp file next to `path` which then
/// replaces it, so a failed save never leaves a partial file behind.
pub fn save_document(doc: &mut Document, path: &Path) -> Result<()> {
    let pruned = doc.prune_objects();
    let emptied = doc.delete_zero_length_streams();
    doc.renumber_objects();
    doc.compress();
    debug!(
        "Cleaned document for {} ({} pruned, {} empty streams)",
        path.display(),
        pruned.len(),
        emptied.len()
    );

    let write_error = |source: std::io::Error| PanelError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        doc.save_to(&mut writer)?;
        writer.flush().map_err(write_error)?;
    }
    temp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

/// Load a single PDF document
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes)).await??;
    Ok(doc)
}

/// Save a document with the same cleanup as the pipeline's final write
pub async fn save_pdf(mut doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    tokio::task::spawn_blocking(move || save_document(&mut doc, &path)).await?
}
