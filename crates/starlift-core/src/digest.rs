//! # Payload Integrity Digests
//!
//! Stored export payloads get a SHA-256 digest at insert time so a reload
//! from disk can detect truncated or hand-edited index files. The digest is
//! advisory — a mismatch drops the record with a warning, it never aborts
//! startup.

use sha2::{Digest, Sha256};

/// SHA-256 digest (lowercase hex) of an opaque JSON payload.
///
/// Payload values preserve key order and number encoding end to end, so
/// the digest computed at insert matches the digest recomputed after a
/// store → disk → reload round trip of the same record.
pub fn payload_digest(payload: &serde_json::Value) -> String {
    let bytes = serde_json::to_vec(payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_is_64_lowercase_hex_chars() {
        let d = payload_digest(&json!({"a": 1}));
        assert_eq!(d.len(), 64);
        assert!(d
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_survives_serialization_round_trip() {
        let original: serde_json::Value =
            serde_json::from_str(r#"{"y":2,"x":1,"f":16.67}"#).unwrap();
        let reloaded: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&original).unwrap()).unwrap();
        assert_eq!(payload_digest(&original), payload_digest(&reloaded));
    }

    #[test]
    fn different_payloads_differ() {
        assert_ne!(
            payload_digest(&json!({"a": 1})),
            payload_digest(&json!({"a": 2}))
        );
    }
}
