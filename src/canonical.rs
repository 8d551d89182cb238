// ═══════════════════════════════════════════════════════════════════════════════
// PAC-OCC-P63-GOVERNANCE-CORE — canonical.rs
// Governance Kernel: Canonical Serialization & Hashing
// Governance Tier: LAW
// Invariant: DETERMINISTIC_HASH | SORTED_KEYS
// ═══════════════════════════════════════════════════════════════════════════════
//!
//! # Canonical Form
//!
//! Every hash in the kernel is SHA-256 over this canonical rendering:
//! mapping keys sorted lexicographically, no whitespace, UTF-8 strings,
//! hex-encoded lowercase digest. This form is part of the wire contract —
//! external callers recomputing `proof_hash`/`decision_hash`/`outcome_hash`/
//! `pdo_hash` must produce byte-identical input.
//!
//! Map iteration order of the in-memory representation is never trusted;
//! keys are sorted explicitly on every render.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Renders a JSON value in canonical form: sorted keys, compact separators.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Serializes any `Serialize` payload and renders it canonically.
///
/// Returns the serialization error unmodified if the payload cannot be
/// represented as JSON (fail-closed: no partial rendering).
pub fn canonicalize_payload<T: Serialize>(payload: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(payload)?;
    Ok(canonicalize(&value))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            // serde_json handles escaping; a &str never fails to serialize
            out.push_str(&serde_json::to_string(s).expect("string serialization"));
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
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("key serialization"));
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

/// SHA-256 over concatenated byte parts, hex-encoded lowercase.
pub fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// SHA-256 of a JSON value's canonical form.
pub fn canonical_hash(value: &Value) -> String {
    sha256_hex(&[canonicalize(value).as_bytes()])
}

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

/// True if `s` looks like a hex-encoded SHA-256 digest.
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == SHA256_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_are_sorted() {
        let value = json!({"zeta": 1, "alpha": 2, "mid": {"b": 1, "a": 2}});
        assert_eq!(
            canonicalize(&value),
            r#"{"alpha":2,"mid":{"a":2,"b":1},"zeta":1}"#
        );
    }

    #[test]
    fn test_no_whitespace() {
        let value = json!({"a": [1, 2, 3], "b": "x y"});
        let canonical = canonicalize(&value);
        // Whitespace appears only inside string contents
        assert_eq!(canonical, r#"{"a":[1,2,3],"b":"x y"}"#);
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let value = json!({"c": {"z": [true, null]}, "a": "text", "b": 3.5});
        let once = canonicalize(&value);
        let reparsed: Value = serde_json::from_str(&once).unwrap();
        let twice = canonicalize(&reparsed);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_hash_is_deterministic_across_key_order() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(canonical_hash(&a), canonical_hash(&b));
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        // SHA-256("") — well-known digest
        assert_eq!(
            sha256_hex(&[b""]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_hex_concatenation_matches_single_buffer() {
        let joined = sha256_hex(&[b"abc", b"def"]);
        let single = sha256_hex(&[b"abcdef"]);
        assert_eq!(joined, single);
    }

    #[test]
    fn test_is_sha256_hex() {
        assert!(is_sha256_hex(&sha256_hex(&[b"x"])));
        assert!(!is_sha256_hex("abc"));
        assert!(!is_sha256_hex(&"A".repeat(64)));
    }

    #[test]
    fn test_unicode_strings_render_utf8() {
        let value = json!({"name": "Überprüfung"});
        let canonical = canonicalize(&value);
        assert!(canonical.contains("Überprüfung"));
    }
}
