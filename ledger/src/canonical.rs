//! Canonical serialization, hashing, and proof-of-work comparison.
//!
//! Every hash, signature, and Merkle root in this system depends bit-exactly
//! on one encoding: `serde_json::to_string` of a struct whose fields are
//! declared in the order the protocol expects, without reordering via
//! `#[serde(rename_all)]` or map-based representations. `serde_json`
//! preserves struct field declaration order and never inserts extra
//! whitespace when used through `to_string`, which is exactly what makes it
//! usable as this system's canonical form.

use num_bigint::BigUint;
use num_traits::cast::FromPrimitive;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Serializes `value` using the canonical encoding: compact JSON with field
/// order matching the struct declaration.
pub fn canonical_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("domain types are always serializable")
}

/// SHA-256 of the UTF-8 bytes of `data`, hex-encoded lowercase.
pub fn sha256_hex(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    hex::encode(digest)
}

/// SHA-256 applied twice: `sha256_hex(sha256_hex(data))`.
///
/// Used for the block hash, which is the double-SHA-256 of the header's
/// canonical serialization.
pub fn double_sha256_hex(data: &str) -> String {
    sha256_hex(&sha256_hex(data))
}

/// Returns `true` if the hex-encoded hash, interpreted as a big unsigned
/// integer, is strictly less than `target`.
///
/// `target` is carried as an `f64` (matching the protocol's numeric
/// `target_bits` field); it is converted to the nearest [`BigUint`] for the
/// comparison. Proof-of-work targets are always whole, very large numbers
/// (e.g. `2^231`), so this conversion is exact for the targets this system
/// actually produces.
pub fn hash_below_target(hash_hex: &str, target: f64) -> bool {
    let hash_value = BigUint::parse_bytes(hash_hex.as_bytes(), 16)
        .expect("hash must be valid hex produced by sha256_hex");
    let target_value = BigUint::from_f64(target).unwrap_or_else(|| BigUint::from(0u32));
    hash_value < target_value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_is_deterministic_and_lowercase() {
        let a = sha256_hex("hello");
        let b = sha256_hex("hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn double_sha256_hex_differs_from_single() {
        let single = sha256_hex("data");
        let double = double_sha256_hex("data");
        assert_ne!(single, double);
        assert_eq!(double, sha256_hex(&single));
    }

    #[test]
    fn hash_below_target_respects_big_integer_comparison() {
        let small_hash = "0".repeat(63) + "1";
        let target = 2f64.powi(231);
        assert!(hash_below_target(&small_hash, target));

        let large_hash = "f".repeat(64);
        assert!(!hash_below_target(&large_hash, target));
    }

    #[test]
    fn canonical_json_preserves_field_order() {
        #[derive(Serialize)]
        struct Ordered {
            b: u32,
            a: u32,
        }
        let encoded = canonical_json(&Ordered { b: 1, a: 2 });
        assert_eq!(encoded, r#"{"b":1,"a":2}"#);
    }
}
