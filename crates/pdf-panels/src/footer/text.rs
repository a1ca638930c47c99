//! Footer text stamping
//!
//! The design name, material and height label are drawn in black at fixed
//! offsets from the footer's top-right corner. The configured font is
//! embedded as a simple WinAnsi font; when it cannot be read the standard
//! Helvetica font is used instead.

use crate::options::{TextAnchor, TextLayout};
use crate::types::{PanelSpec, Result};
use log::{debug, warn};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;

/// Resource name the stamp font is registered under
pub const STAMP_FONT: &str = "FStamp";

const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 255;

/// Font object added to a document for stamping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampFont {
    pub id: ObjectId,
    pub base_font: String,
    /// False when the Helvetica fallback is in use
    pub embedded: bool,
}

/// Add the stamp font to `doc`, falling back to Helvetica with a warning
pub fn load_stamp_font(doc: &mut Document, font_path: Option<&Path>) -> StampFont {
    let Some(path) = font_path else {
        debug!("No display font configured, using Helvetica");
        return helvetica(doc);
    };

    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Font {} unavailable ({}), falling back to Helvetica", path.display(), e);
            return helvetica(doc);
        }
    };

    match embed_font(doc, &data, path) {
        Some(font) => {
            debug!("Embedded font {} from {}", font.base_font, path.display());
            font
        }
        None => {
            warn!("Font {} could not be parsed, falling back to Helvetica", path.display());
            helvetica(doc)
        }
    }
}

fn helvetica(doc: &mut Document) -> StampFont {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"Font".to_vec()));
    dict.set("Subtype", Object::Name(b"Type1".to_vec()));
    dict.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    StampFont {
        id: doc.add_object(dict),
        base_font: "Helvetica".to_string(),
        embedded: false,
    }
}

fn embed_font(doc: &mut Document, data: &[u8], path: &Path) -> Option<StampFont> {
    let face = ttf_parser::Face::parse(data, 0).ok()?;
    let units_per_em = face.units_per_em().max(1);
    let scale = 1000.0 / units_per_em as f32;
    let scaled = |value: i16| (value as f32 * scale).round() as i64;

    let base_font = postscript_name(&face, path);
    let is_cff = face.tables().cff.is_some();

    let widths: Vec<Object> = (FIRST_CHAR..=LAST_CHAR)
        .map(|code| {
            let advance = decode_win_ansi(code)
                .and_then(|ch| face.glyph_index(ch))
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(0);
            Object::Integer((advance as f32 * scale).round() as i64)
        })
        .collect();
    let missing_width = widths.first().cloned().unwrap_or(Object::Integer(0));

    let mut file_dict = Dictionary::new();
    file_dict.set("Length1", Object::Integer(data.len() as i64));
    if is_cff {
        file_dict.set("Subtype", Object::Name(b"OpenType".to_vec()));
    }
    let file_id = doc.add_object(Stream::new(file_dict, data.to_vec()));

    let bbox = face.global_bounding_box();
    let ascent = scaled(face.ascender());
    let mut flags = 32;
    if face.is_monospaced() {
        flags |= 1;
    }

    let mut descriptor = Dictionary::new();
    descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
    descriptor.set("FontName", Object::Name(base_font.as_bytes().to_vec()));
    descriptor.set("Flags", Object::Integer(flags));
    descriptor.set(
        "FontBBox",
        Object::Array(vec![
            Object::Integer(scaled(bbox.x_min)),
            Object::Integer(scaled(bbox.y_min)),
            Object::Integer(scaled(bbox.x_max)),
            Object::Integer(scaled(bbox.y_max)),
        ]),
    );
    descriptor.set(
        "ItalicAngle",
        Object::Integer(face.italic_angle().map(|a| a.round() as i64).unwrap_or(0)),
    );
    descriptor.set("Ascent", Object::Integer(ascent));
    descriptor.set("Descent", Object::Integer(scaled(face.descender())));
    descriptor.set(
        "CapHeight",
        Object::Integer(face.capital_height().map(scaled).unwrap_or(ascent)),
    );
    descriptor.set("StemV", Object::Integer(80));
    descriptor.set("MissingWidth", missing_width);
    let font_file_key = if is_cff { "FontFile3" } else { "FontFile2" };
    descriptor.set(font_file_key, Object::Reference(file_id));
    let descriptor_id = doc.add_object(descriptor);

    let subtype: &[u8] = if is_cff { b"Type1" } else { b"TrueType" };
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(subtype.to_vec()));
    font.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
    font.set("FirstChar", Object::Integer(FIRST_CHAR as i64));
    font.set("LastChar", Object::Integer(LAST_CHAR as i64));
    font.set("Widths", Object::Array(widths));
    font.set("FontDescriptor", Object::Reference(descriptor_id));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));

    Some(StampFont {
        id: doc.add_object(font),
        base_font,
        embedded: true,
    })
}

/// PostScript name of the face, or the file stem, restricted to name-safe characters
fn postscript_name(face: &ttf_parser::Face<'_>, path: &Path) -> String {
    let from_table = face
        .names()
        .into_iter()
        .filter(|entry| entry.name_id == ttf_parser::name::name_id::POST_SCRIPT_NAME)
        .find_map(|entry| entry.to_string());
    let raw = from_table
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "EmbeddedFont".to_string());
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

// =============================================================================
// Text Content
// =============================================================================

/// The three fields stamped onto a panel's footer
pub fn footer_fields(spec: &PanelSpec, layout: &TextLayout) -> Vec<(String, TextAnchor)> {
    vec![
        (spec.design_name.clone(), layout.design),
        (spec.substrate.material_name().to_string(), layout.material),
        (spec.height_label(), layout.height),
    ]
}

/// Build the content stream drawing `fields` in the footer band.
///
/// The band spans `0..footer_height` from the page bottom.
pub fn text_content(
    fields: &[(String, TextAnchor)],
    font_size: f32,
    page_width: f64,
    footer_height: f64,
) -> Result<Vec<u8>> {
    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("g", vec![Object::Integer(0)]),
    ];
    for (text, anchor) in fields {
        let x = page_width - anchor.from_right;
        let y = footer_height - anchor.below_footer_top;
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(STAMP_FONT.as_bytes().to_vec()),
                    Object::Real(font_size),
                ],
            ),
            Operation::new("Td", vec![Object::Real(x as f32), Object::Real(y as f32)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }
    operations.push(Operation::new("Q", vec![]));

    Ok(Content { operations }.encode()?)
}

// =============================================================================
// WinAnsi Encoding
// =============================================================================

/// cp1252 assignments in 0x80..=0x9F; `None` marks unassigned codes
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

/// Character for a WinAnsi code
fn decode_win_ansi(code: u8) -> Option<char> {
    match code {
        0x80..=0x9F => WIN_ANSI_HIGH[(code - 0x80) as usize],
        _ => Some(code as char),
    }
}

/// Encode text as WinAnsi bytes; unmappable characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{0000}'..='\u{007F}' | '\u{00A0}'..='\u{00FF}' => ch as u8,
            _ => WIN_ANSI_HIGH
                .iter()
                .position(|&mapped| mapped == Some(ch))
                .map(|index| 0x80 + index as u8)
                .unwrap_or(b'?'),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_ansi_covers_ascii_latin1_and_cp1252() {
        assert_eq!(encode_win_ansi("13ft\""), b"13ft\"".to_vec());
        assert_eq!(encode_win_ansi("Café"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("€ – ™"), vec![0x80, b' ', 0x96, b' ', 0x99]);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn decode_is_inverse_for_mapped_codes() {
        for code in FIRST_CHAR..=LAST_CHAR {
            if let Some(ch) = decode_win_ansi(code) {
                assert_eq!(encode_win_ansi(&ch.to_string()), vec![code]);
            }
        }
    }

    #[test]
    fn missing_font_falls_back_to_helvetica() {
        let mut doc = Document::with_version("1.7");
        let font = load_stamp_font(&mut doc, Some(Path::new("/nonexistent/font.ttf")));
        assert!(!font.embedded);
        assert_eq!(font.base_font, "Helvetica");
    }

    #[test]
    fn garbage_font_falls_back_to_helvetica() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font at all").unwrap();

        let mut doc = Document::with_version("1.7");
        let font = load_stamp_font(&mut doc, Some(&path));
        assert!(!font.embedded);
        let dict = doc.get_dictionary(font.id).unwrap();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
    }

    #[test]
    fn text_is_placed_from_footer_top_right() {
        let fields = vec![("Ivy".to_string(), TextAnchor::from((430.0, 49.0)))];
        let content = text_content(&fields, 12.0, 1740.0, 120.0).unwrap();
        let decoded = Content::decode(&content).unwrap();

        let td = decoded
            .operations
            .iter()
            .find(|op| op.operator == "Td")
            .unwrap();
        let x = td.operands[0].as_float().unwrap();
        let y = td.operands[1].as_float().unwrap();
        assert!((x - 1310.0).abs() < 1e-3);
        assert!((y - 71.0).abs() < 1e-3);

        let tj = decoded
            .operations
            .iter()
            .find(|op| op.operator == "Tj")
            .unwrap();
        assert_eq!(tj.operands[0].as_str().unwrap(), b"Ivy");
    }
}
