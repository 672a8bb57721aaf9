/*!
 * Data Sources
 * Conversion between raw bytes and `data:` URLs used on the wire
 */

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use super::types::{VfsError, VfsResult};

/// Encode bytes as a `data:<mime>;base64,<payload>` URL
pub fn to_data_url(data: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Decode a `data:` URL (base64 payload) back into bytes
pub fn from_data_url(source: &str) -> VfsResult<Bytes> {
    let rest = source
        .strip_prefix("data:")
        .ok_or_else(|| VfsError::InvalidArgument("expected a data: URL".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| VfsError::InvalidArgument("malformed data: URL".into()))?;

    if header.ends_with(";base64") {
        decode_base64(payload)
    } else {
        Ok(Bytes::copy_from_slice(payload.as_bytes()))
    }
}

/// Decode a bare base64 payload
pub fn decode_base64(payload: &str) -> VfsResult<Bytes> {
    STANDARD
        .decode(payload.trim())
        .map(Bytes::from)
        .map_err(|e| VfsError::InvalidArgument(format!("invalid base64 payload: {}", e)))
}

/// Encode a bare base64 payload
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}
