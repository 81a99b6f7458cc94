use std::io::Cursor;
use std::num::NonZeroU32;

use base64::{
    Engine, alphabet,
    engine::{
        DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD,
    },
};
use image::{ImageFormat, ImageReader};

use crate::error::{CardError, Result};

/// Accepts payloads with or without trailing `=` padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Intrinsic pixel size of an uploaded photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: NonZeroU32,
    pub height: NonZeroU32,
}

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}

pub fn mime_to_format(mime_type: &str) -> Result<ImageFormat> {
    match mime_type {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Ok(ImageFormat::Jpeg),
        "image/gif" => Ok(ImageFormat::Gif),
        "image/webp" => Ok(ImageFormat::WebP),
        "image/bmp" => Ok(ImageFormat::Bmp),
        _ => Err(CardError::Image(format!("unsupported mime type: {mime_type}"))),
    }
}

/// Reads width and height from the image header without decoding pixels.
/// The format is guessed from the bytes; `mime_type` is only consulted when
/// the bytes carry no recognizable signature.
pub fn get_dimensions(bytes: &[u8], mime_type: &str) -> Result<Dimensions> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| CardError::Image(format!("read image header failed: {err}")))?;
    if reader.format().is_none() {
        reader.set_format(mime_to_format(mime_type)?);
    }
    let (width, height) = reader
        .into_dimensions()
        .map_err(|err| CardError::Image(format!("read image header failed: {err}")))?;
    match (NonZeroU32::new(width), NonZeroU32::new(height)) {
        (Some(width), Some(height)) => Ok(Dimensions { width, height }),
        _ => Err(CardError::Image(format!(
            "image has an empty dimension: {width}x{height}"
        ))),
    }
}

pub fn encode_data_uri(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

pub fn is_image_data_uri(source: &str) -> bool {
    source.starts_with("data:image")
}

/// Decodes the payload of a data URI: everything after the last `;base64,`.
/// A string without that separator is decoded whole. Whitespace and line
/// breaks are ignored and padding is optional.
pub fn decode_data_uri_payload(source: &str) -> Result<Vec<u8>> {
    let payload: String = source
        .rsplit_once(";base64,")
        .map(|(_, data)| data)
        .unwrap_or(source)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    LENIENT
        .decode(payload)
        .map_err(|err| CardError::Validation(format!("invalid base64 image data: {err}")))
}
