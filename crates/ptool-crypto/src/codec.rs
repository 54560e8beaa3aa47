//! Unpadded base64url, the only text encoding used for binary data.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::error::Result;

/// URL-safe alphabet, never emits padding, accepts input with or without it
/// and ignores stray bits in the final symbol.
const B64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encode bytes as base64url without padding.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    B64URL.encode(bytes)
}

/// Decode base64url text, ignoring surrounding whitespace.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    Ok(B64URL.decode(text.trim())?)
}
