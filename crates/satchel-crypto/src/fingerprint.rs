//! Human-readable verification fingerprint
//!
//! BLAKE2b-256 of a public key, read as 16 big-endian 16-bit words and
//! rendered as zero-padded 5-digit decimal groups, four per line. Users
//! read the groups aloud out-of-band to confirm each other's identity.
//! Collision resistance comes from the full hash; the decimal rendering
//! does not reduce it.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// Groups per fingerprint (32 hash bytes = 16 u16 words).
const FINGERPRINT_GROUPS: usize = 16;
/// Groups per rendered line.
const GROUPS_PER_LINE: usize = 4;

/// BLAKE2b-256 digest of arbitrary bytes (unkeyed).
pub fn digest256(content: &[u8]) -> [u8; 32] {
    Blake2b256::digest(content).into()
}

/// Render a fingerprint with the default three-space delimiter.
pub fn pretty_fingerprint(content: &[u8]) -> String {
    pretty_fingerprint_with_delimiter(content, "   ")
}

/// Render a fingerprint with a custom in-line group delimiter.
///
/// Deterministic in `content`; any single-byte change flips at least
/// one group with overwhelming probability.
pub fn pretty_fingerprint_with_delimiter(content: &[u8], delimiter: &str) -> String {
    let digest = Blake2b256::digest(content);

    let groups: Vec<String> = digest
        .chunks(2)
        .take(FINGERPRINT_GROUPS)
        .map(|pair| format!("{:05}", u16::from_be_bytes([pair[0], pair[1]])))
        .collect();

    groups
        .chunks(GROUPS_PER_LINE)
        .map(|line| line.join(delimiter))
        .collect::<Vec<_>>()
        .join("\n")
}
