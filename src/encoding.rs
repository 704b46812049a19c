//! Byte decoding using `simdutf8` and `encoding_rs`.
//!
//! Only Unicode input is recognised: UTF-8 with or without a BOM, and UTF-16
//! announced by its BOM. Anything else is decoded lossily as UTF-8.

use std::borrow::Cow;

use simdutf8::basic::from_utf8;
use tracing::debug;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Check if the given bytes are valid UTF-8.
pub fn is_utf8(data: &[u8]) -> bool {
    from_utf8(data).is_ok()
}

/// Skip the UTF-8 BOM if present and return the remaining data.
pub fn skip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// What [`decode`] found in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    /// Not valid UTF-8; invalid sequences were replaced.
    Lossy,
}

/// Decode `data` to text, borrowing when it is already valid UTF-8.
pub fn decode(data: &[u8]) -> Cow<'_, str> {
    decode_with_encoding(data).0
}

/// Decode `data` to text and report the encoding that was used.
pub fn decode_with_encoding(data: &[u8]) -> (Cow<'_, str>, SourceEncoding) {
    if data.starts_with(UTF16LE_BOM) {
        let (text, _) = encoding_rs::UTF_16LE.decode_with_bom_removal(data);
        return (text, SourceEncoding::Utf16Le);
    }
    if data.starts_with(UTF16BE_BOM) {
        let (text, _) = encoding_rs::UTF_16BE.decode_with_bom_removal(data);
        return (text, SourceEncoding::Utf16Be);
    }

    let has_bom = data.starts_with(UTF8_BOM);
    let body = skip_bom(data);
    match from_utf8(body) {
        Ok(text) if has_bom => (Cow::Borrowed(text), SourceEncoding::Utf8Bom),
        Ok(text) => (Cow::Borrowed(text), SourceEncoding::Utf8),
        Err(_) => {
            debug!(len = body.len(), "input is not valid UTF-8, decoding lossily");
            (String::from_utf8_lossy(body), SourceEncoding::Lossy)
        }
    }
}
