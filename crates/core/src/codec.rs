//! File payload encoding helpers.
//!
//! Generated files travel as base64 strings on every queue. Some historical
//! peers emitted hex instead, so decoding accepts either; entries that are
//! neither are dropped by callers.

use base64::Engine as _;
use std::collections::BTreeMap;

/// Decode a file payload that may be base64 (canonical) or hex (legacy).
pub fn decode_file_bytes(data: &str) -> Option<Vec<u8>> {
    if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(data) {
        return Some(bytes);
    }
    hex::decode(data).ok()
}

/// Encode raw bytes as canonical base64.
pub fn encode_file_bytes(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Re-encode a legacy hex payload as base64. `None` for invalid hex.
pub fn hex_to_base64(data: &str) -> Option<String> {
    hex::decode(data).ok().map(|b| encode_file_bytes(&b))
}

/// Normalize a filename → payload mapping to base64 values, silently
/// skipping entries that decode as neither base64 nor hex.
pub fn normalize_files_to_base64(files: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut normalized = BTreeMap::new();
    for (name, data) in files {
        match decode_file_bytes(data) {
            Some(bytes) => {
                tracing::debug!(file = %name, bytes = bytes.len(), "encoded generated file");
                normalized.insert(name.clone(), encode_file_bytes(&bytes));
            }
            None => {
                tracing::warn!(file = %name, "skipping file with undecodable payload");
            }
        }
    }
    normalized
}
