//! Key derivation: Argon2id password → master key, plus the
//! context-labeled subkey tree
//!
//! The master key never leaves the device. Every other symmetric key in
//! the system is carved out of it (directly or transitively) by
//! `derive_subkey`: keyed BLAKE2b-256 personalized by an 8-byte context
//! label and indexed by a subkey id. Domain separation guarantees that
//! no construction (AEAD, MAC, signature seed) can leak material usable
//! by another.

use argon2::{Algorithm, Argon2, Params, Version};
use blake2::digest::consts::U32;
use blake2::digest::Mac;
use blake2::Blake2bMac;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use satchel_core::{Error, Result};

use crate::{CONTEXT_SIZE, KEY_SIZE, SALT_SIZE};

/// Subkey id for a manager's cipher key.
pub const SUBKEY_ID_CIPHER: u64 = 1;
/// Subkey id for a manager's MAC key.
pub const SUBKEY_ID_MAC: u64 = 2;
/// Subkey id for a manager's asymmetric key seed.
pub const SUBKEY_ID_ASYM: u64 = 3;

/// A 256-bit master key derived from the account password via Argon2id.
///
/// Zeroized on drop so the password-derived secret does not linger in
/// memory after logout.
#[derive(Clone)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Explicitly wipe the key material (also happens on drop).
    pub fn zeroize(&mut self) {
        self.bytes.zeroize();
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters for the password KDF.
///
/// Defaults are the sensitive/moderate profile: ~0.5–1 s of work on
/// commodity hardware. Tests use lighter settings.
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 262144 = 256 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / passes (default: 4)
    pub time_cost: u32,
    /// Parallelism (default: 1)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 262144,
            time_cost: 4,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Fast parameters for unit tests only. Not for production keys.
    pub fn insecure_for_tests() -> Self {
        Self {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Derive the 256-bit master key from a password and salt using
/// Argon2id v1.3.
///
/// Deterministic in `(salt, password)`. The salt is 16 random bytes,
/// generated at signup and stored server-side; it does not need to be
/// secret.
pub fn derive_key(
    password: &SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> Result<MasterKey> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| Error::Other(anyhow::anyhow!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| Error::Other(anyhow::anyhow!("Argon2id KDF failed: {e}")))?;

    Ok(MasterKey::from_bytes(key))
}

/// Derive a 256-bit subkey from a parent key.
///
/// Keyed BLAKE2b-256 with `parent` as the key and an empty message;
/// the subkey id goes into the first 8 bytes of the salt
/// (little-endian) and the context label into the first 8 bytes of the
/// personalization, both zero-extended to 16 bytes.
pub fn derive_subkey(
    parent: &[u8; KEY_SIZE],
    context: &[u8; CONTEXT_SIZE],
    subkey_id: u64,
) -> Result<[u8; KEY_SIZE]> {
    let mut salt = [0u8; 16];
    salt[..8].copy_from_slice(&subkey_id.to_le_bytes());
    let mut personal = [0u8; 16];
    personal[..8].copy_from_slice(context);

    let mac = Blake2bMac::<U32>::new_with_salt_and_personal(parent, &salt, &personal)
        .map_err(|e| Error::Other(anyhow::anyhow!("subkey derivation failed: {e}")))?;
    Ok(mac.finalize().into_bytes().into())
}

/// Pad a context label to exactly 8 bytes with ASCII space (0x20).
///
/// Padding with 0x00 would derive different keys and break interop;
/// labels longer than 8 bytes or containing non-ASCII are rejected.
pub fn pad_context(label: &str) -> Result<[u8; CONTEXT_SIZE]> {
    if !label.is_ascii() || label.len() > CONTEXT_SIZE {
        return Err(Error::Encoding(format!(
            "context label must be at most {CONTEXT_SIZE} ASCII bytes"
        )));
    }
    let mut context = [0x20u8; CONTEXT_SIZE];
    context[..label.len()].copy_from_slice(label.as_bytes());
    Ok(context)
}
