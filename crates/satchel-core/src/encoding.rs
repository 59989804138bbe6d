//! URL-safe base64 and identifier generation
//!
//! All binary fields cross the wire as base64 with the URL-safe
//! alphabet and no padding. Collection and item uids additionally go
//! through an alphabet-narrowing step so they are plain alphanumeric
//! identifiers.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use crate::error::{Error, Result};

/// Number of random bytes behind a generated uid (encodes to 32 chars).
const UID_RAW_SIZE: usize = 24;

/// Encode bytes as URL-safe base64 without padding.
pub fn to_base64(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode URL-safe unpadded base64.
pub fn from_base64(s: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| Error::Encoding(format!("base64 decode: {e}")))
}

/// Generate a random 32-character alphanumeric identifier.
///
/// 24 random bytes are base64-url encoded, then `-` is replaced with
/// `a` and `_` with `b`. The narrowing concentrates two of the 64
/// alphabet slots; the uid is an identifier, not key material, so the
/// bias is accepted.
pub fn gen_uid() -> String {
    let mut raw = [0u8; UID_RAW_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut raw);
    to_base64(&raw).replace('-', "a").replace('_', "b")
}
