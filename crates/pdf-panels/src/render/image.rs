//! Image XObjects: embedding rasters and extracting them back out

use crate::types::{PanelError, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

// =============================================================================
// Embedding
// =============================================================================

/// Embed an image as a Flate-compressed DeviceRGB XObject.
///
/// Images with an alpha channel get a DeviceGray soft mask.
pub fn embed_image(doc: &mut Document, image: &DynamicImage) -> Result<ObjectId> {
    if image.color().has_alpha() {
        embed_rgba(doc, &image.to_rgba8())
    } else {
        embed_rgb(doc, &image.to_rgb8(), None)
    }
}

pub fn embed_rgb(doc: &mut Document, image: &RgbImage, soft_mask: Option<ObjectId>) -> Result<ObjectId> {
    let (width, height) = image.dimensions();
    let mut dict = image_dict(width, height, b"DeviceRGB");
    if let Some(mask_id) = soft_mask {
        dict.set("SMask", Object::Reference(mask_id));
    }
    add_compressed(doc, dict, image.as_raw().clone())
}

fn embed_rgba(doc: &mut Document, image: &RgbaImage) -> Result<ObjectId> {
    let (width, height) = image.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let mask_id = add_compressed(doc, image_dict(width, height, b"DeviceGray"), alpha)?;
    let mut dict = image_dict(width, height, b"DeviceRGB");
    dict.set("SMask", Object::Reference(mask_id));
    add_compressed(doc, dict, rgb)
}

fn image_dict(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

fn add_compressed(doc: &mut Document, dict: Dictionary, data: Vec<u8>) -> Result<ObjectId> {
    let mut stream = Stream::new(dict, data);
    stream.compress()?;
    Ok(doc.add_object(stream))
}

// =============================================================================
// Extraction
// =============================================================================

/// How an extracted raster was stored in the PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterEncoding {
    Jpeg,
    Samples,
}

impl RasterEncoding {
    /// File extension used for the extracted temp file
    pub fn extension(self) -> &'static str {
        match self {
            RasterEncoding::Jpeg => "jpg",
            RasterEncoding::Samples => "png",
        }
    }
}

/// A raster pulled out of a page's resources
pub struct ExtractedImage {
    pub id: ObjectId,
    pub image: DynamicImage,
    pub encoding: RasterEncoding,
    /// Original encoded bytes for JPEG data, untouched
    pub encoded: Option<Vec<u8>>,
}

/// Find the first Image XObject in a page's resources
pub fn find_first_image(doc: &Document, page_id: ObjectId) -> Result<Option<ObjectId>> {
    let page = doc.get_dictionary(page_id)?;
    let resources = match page.get(b"Resources") {
        Ok(obj) => resolve_dict(doc, obj)?,
        Err(_) => return Ok(None),
    };
    let xobjects = match resources.get(b"XObject") {
        Ok(obj) => resolve_dict(doc, obj)?,
        Err(_) => return Ok(None),
    };

    for (_, value) in xobjects.iter() {
        if let Object::Reference(id) = value {
            if let Ok(stream) = doc.get_object(*id)?.as_stream() {
                let is_image = stream
                    .dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .map(|name| name == b"Image")
                    .unwrap_or(false);
                if is_image {
                    return Ok(Some(*id));
                }
            }
        }
    }

    Ok(None)
}

/// Decode an Image XObject into pixels at its native resolution.
///
/// Supports JPEG (DCTDecode) and 8-bit gray/RGB/CMYK samples, either raw
/// or Flate-compressed.
pub fn extract_image(doc: &Document, id: ObjectId) -> Result<ExtractedImage> {
    let stream = doc.get_object(id)?.as_stream()?;
    let filters = stream_filters(doc, &stream.dict)?;

    if filters.iter().any(|f| f == b"DCTDecode") {
        let image = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)?;
        return Ok(ExtractedImage {
            id,
            image,
            encoding: RasterEncoding::Jpeg,
            encoded: Some(stream.content.clone()),
        });
    }

    if let Some(other) = filters.iter().find(|f| f.as_slice() != b"FlateDecode") {
        return Err(PanelError::UnsupportedImage(format!(
            "filter {}",
            String::from_utf8_lossy(other)
        )));
    }

    let width = dict_u32(doc, &stream.dict, b"Width")?;
    let height = dict_u32(doc, &stream.dict, b"Height")?;
    let bits = dict_u32(doc, &stream.dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(PanelError::UnsupportedImage(format!(
            "{} bits per component",
            bits
        )));
    }

    let components = color_components(doc, &stream.dict)?;
    let data = sample_bytes(stream, &filters)?;

    let expected = width as usize * height as usize * components as usize;
    if data.len() < expected {
        return Err(PanelError::UnsupportedImage(format!(
            "sample data too short ({} of {} bytes)",
            data.len(),
            expected
        )));
    }
    let mut data = data;
    data.truncate(expected);

    let image = match components {
        1 => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        4 => RgbImage::from_raw(width, height, cmyk_to_rgb(&data)).map(DynamicImage::ImageRgb8),
        _ => None,
    }
    .ok_or_else(|| PanelError::UnsupportedImage("invalid sample buffer".to_string()))?;

    Ok(ExtractedImage {
        id,
        image,
        encoding: RasterEncoding::Samples,
        encoded: None,
    })
}

/// Stream payload with any Flate compression removed.
///
/// `Stream::compress` leaves very small payloads uncompressed, so a missing
/// `/Filter` means the content is already raw.
fn sample_bytes(stream: &Stream, filters: &[Vec<u8>]) -> Result<Vec<u8>> {
    if filters.is_empty() {
        Ok(stream.content.clone())
    } else {
        Ok(stream.decompressed_content()?)
    }
}

fn stream_filters(doc: &Document, dict: &Dictionary) -> Result<Vec<Vec<u8>>> {
    let filter = match dict.get(b"Filter") {
        Ok(obj) => resolve(doc, obj)?,
        Err(_) => return Ok(Vec::new()),
    };
    match filter {
        Object::Name(name) => Ok(vec![name.clone()]),
        Object::Array(items) => Ok(items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect()),
        _ => Ok(Vec::new()),
    }
}

fn color_components(doc: &Document, dict: &Dictionary) -> Result<u32> {
    let color_space = resolve(doc, dict.get(b"ColorSpace")?)?;
    match color_space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" => Ok(1),
            b"DeviceRGB" => Ok(3),
            b"DeviceCMYK" => Ok(4),
            other => Err(PanelError::UnsupportedImage(format!(
                "color space {}",
                String::from_utf8_lossy(other)
            ))),
        },
        Object::Array(items) if items.first().and_then(|o| o.as_name().ok()) == Some(&b"ICCBased"[..]) => {
            let profile = items
                .get(1)
                .ok_or_else(|| PanelError::UnsupportedImage("ICCBased without profile".to_string()))?;
            let profile = resolve(doc, profile)?.as_stream()?;
            dict_u32(doc, &profile.dict, b"N")
        }
        _ => Err(PanelError::UnsupportedImage("color space".to_string())),
    }
}

fn cmyk_to_rgb(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u32;
            [
                ((255 - px[0] as u32) * k / 255) as u8,
                ((255 - px[1] as u32) * k / 255) as u8,
                ((255 - px[2] as u32) * k / 255) as u8,
            ]
        })
        .collect()
}

fn dict_u32(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32> {
    let value = resolve(doc, dict.get(key)?)?.as_i64()?;
    u32::try_from(value).map_err(|_| {
        PanelError::UnsupportedImage(format!(
            "invalid {}: {}",
            String::from_utf8_lossy(key),
            value
        ))
    })
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Dictionary> {
    Ok(resolve(doc, obj)?.as_dict()?)
}
