//! Body decoding. Gutenberg serves mostly UTF-8, but older uploads are Latin-1 or
//! Windows-1252 with no reliable charset header.

use encoding_rs::{UTF_8, WINDOWS_1252};

/// Decode as UTF-8, falling back to Windows-1252 if the bytes are not valid UTF-8.
///
/// Windows-1252 maps every byte to a character, so the fallback never fails.
pub fn decode_preferred(bytes: &[u8]) -> String {
    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => text.into_owned(),
        None => {
            tracing::debug!(bytes = bytes.len(), "Body is not UTF-8, decoding as Windows-1252");
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

/// Decode as UTF-8, replacing invalid sequences with U+FFFD.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let (text, had_errors) = UTF_8.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::debug!(bytes = bytes.len(), "Replaced invalid UTF-8 sequences");
    }
    text.into_owned()
}
