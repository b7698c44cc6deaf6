//! Canonical JSON bytes and content hashes for run reports.
//!
//! Every digest the harness produces goes through this module.
//!
//! # Canonicalization rules
//!
//! 1. Object keys are sorted lexicographically (byte order).
//! 2. Compact form, no whitespace.
//! 3. Strings are JSON-escaped by `serde_json`.
//! 4. Numbers use `serde_json`'s own formatting, which is deterministic for
//!    a given value. Non-finite floats cannot occur in a `serde_json::Value`.

use sha2::{Digest, Sha256};

/// Domain prefix for run report digests.
pub const DOMAIN_RUN_REPORT: &[u8] = b"ROLLOUT::RUN_REPORT::V1\0";

/// Canonical bytes of `value`.
#[must_use]
pub fn canonical_json_bytes(value: &serde_json::Value) -> Vec<u8> {
    let mut buf = Vec::new();
    write_value(&mut buf, value);
    buf
}

fn write_value(buf: &mut Vec<u8>, value: &serde_json::Value) {
    match value {
        serde_json::Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_value(buf, item);
            }
            buf.push(b']');
        }
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            buf.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_scalar(buf, &serde_json::Value::String((*key).clone()));
                buf.push(b':');
                write_value(buf, &map[key.as_str()]);
            }
            buf.push(b'}');
        }
        scalar => write_scalar(buf, scalar),
    }
}

fn write_scalar(buf: &mut Vec<u8>, scalar: &serde_json::Value) {
    buf.extend_from_slice(scalar.to_string().as_bytes());
}

/// `"sha256:<hex>"` of `domain || data`.
#[must_use]
pub fn content_hash(domain: &[u8], data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
