//! Uploaded image payloads: base64 / data-URL decoding and light inspection.
//!
//! Clients send images as plain base64 or as `data:image/<fmt>;base64,<...>`.
//! Browsers and hand-rolled clients are sloppy about padding and line breaks,
//! so decoding is lenient: whitespace is dropped, `=` padding is restored,
//! and non-canonical trailing bits are accepted.

use std::io::Cursor;

use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

use crate::error_handler::ImageDataError;

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const DATA_URL_PREFIX: &str = "data:image";

/// Decodes an uploaded image payload into raw bytes.
///
/// # Errors
/// - [`ImageDataError::Empty`] for a blank payload
/// - [`ImageDataError::MalformedDataUrl`] for `data:image...` without a `,`
/// - [`ImageDataError::InvalidBase64`] when the body is not base64
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>, ImageDataError> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(ImageDataError::Empty);
    }

    let body = if trimmed.starts_with(DATA_URL_PREFIX) {
        trimmed
            .split_once(',')
            .map(|(_, b)| b)
            .ok_or(ImageDataError::MalformedDataUrl)?
    } else {
        trimmed
    };

    let mut clean: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    if clean.is_empty() {
        return Err(ImageDataError::Empty);
    }
    let missing = clean.len() % 4;
    if missing != 0 {
        clean.extend(std::iter::repeat_n('=', 4 - missing));
    }

    LENIENT_BASE64
        .decode(clean.as_bytes())
        .map_err(|e| ImageDataError::InvalidBase64(e.to_string()))
}

/// Guesses the MIME type from magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Re-encodes raw bytes as a `data:` URL (used by remote providers).
pub fn to_data_url(bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        sniff_mime(bytes),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Reads the image header and returns `(width, height)`.
///
/// # Errors
/// [`ImageDataError::Undecodable`] when the bytes are not a supported image.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), ImageDataError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageDataError::Undecodable(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ImageDataError::Undecodable(e.to_string()))
}
