use sha2::{Digest, Sha256};

/// Deterministic mapping of `input` onto `[0, 1]`.
///
/// SHA-256 of the UTF-8 input; the first two big-endian 32-bit words are
/// XORed and scaled by `u32::MAX`. Stable across processes and restarts, so
/// any implementation sharing the salt scheme buckets subjects identically.
pub fn deterministic_hash(input: &str) -> f64 {
    let digest = Sha256::digest(input.as_bytes());
    let hi = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let lo = u32::from_be_bytes([digest[4], digest[5], digest[6], digest[7]]);
    (hi ^ lo) as f64 / u32::MAX as f64
}
