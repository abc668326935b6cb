//! Wire encoding of blob payloads: standard base64, either bare or wrapped in
//! a `data:<mime>;base64,<payload>` URI.

use base64::{engine::general_purpose::STANDARD, Engine as _};

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Invalid base64 data")]
    InvalidBase64(#[source] base64::DecodeError),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(&'static str),
}

/// Decode a bare base64 string or a base64 data URI into raw bytes.
///
/// ASCII whitespace inside the base64 text is ignored so line-wrapped input
/// is accepted. Padding is required.
pub fn decode_payload(encoded: &str) -> Result<Vec<u8>, PayloadError> {
    let encoded = encoded.trim();
    let base64_text = match strip_prefix_ignore_case(encoded, "data:") {
        Some(uri) => {
            let (header, data) = uri
                .split_once(',')
                .ok_or(PayloadError::InvalidDataUri("missing ',' separator"))?;
            if !header.to_ascii_lowercase().ends_with(";base64") {
                return Err(PayloadError::InvalidDataUri(
                    "only base64 encoded data URIs are supported",
                ));
            }
            data
        }
        None => encoded,
    };

    let compact: String = base64_text
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact).map_err(PayloadError::InvalidBase64)
}

pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}
