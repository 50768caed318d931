//! Canonical JSON serialisation and the SHA-256 helpers used for hash
//! chaining.
//!
//! Canonical form: object keys sorted lexicographically at every nesting
//! level, no insignificant whitespace, strings JSON-escaped, numbers in
//! their shortest form. The hash pre-image of a chained record is the raw
//! bytes of the previous hash followed by the canonical bytes of the record
//! without its `hash` field.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// The `previousHash` of the first entry ever appended to an empty journal.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Lowercase-hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Chain hash: SHA-256 over `previous_hash` bytes followed by the canonical
/// bytes of `pre_image`.
pub fn chain_hash(previous_hash: &str, pre_image: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(canonical_json(pre_image).as_bytes());
    hex::encode(hasher.finalize())
}

/// True when `s` is a 64-char lowercase-hex SHA-256 digest.
pub fn is_hex_sha256(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Emit the canonical JSON encoding of `value`.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        // serde_json renders integers exactly and floats in shortest form.
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push_str(&serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into()));
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (k, v)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(k).unwrap_or_else(|_| "\"\"".into()));
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
    }
}
