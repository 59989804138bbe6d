//! The per-object symmetric crypto manager
//!
//! Ciphertext format (binary, attached):
//! ```text
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! ```
//! The detached variants return the tag separately; the ciphertext
//! still carries its nonce prefix. Nonces are drawn fresh from the OS
//! RNG on every call; there is no API that accepts a caller-chosen
//! nonce.
//!
//! A manager is the `(parent key, context label, version)` triple made
//! concrete: three subkeys (cipher, MAC, asymmetric seed) derived from
//! the parent under the label. The named constructors bind the three
//! fixed labels of the protocol.

use blake2::digest::consts::U32;
use blake2::digest::Mac;
use blake2::Blake2bMac;
use chacha20poly1305::{
    aead::{Aead, AeadInPlace, KeyInit, Payload},
    Tag, XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use zeroize::Zeroize;

use satchel_core::{Error, Result, CURRENT_VERSION};

use crate::kdf::{
    derive_subkey, MasterKey, SUBKEY_ID_ASYM, SUBKEY_ID_CIPHER, SUBKEY_ID_MAC,
};
use crate::{CONTEXT_SIZE, KEY_SIZE, MAC_SIZE, NONCE_SIZE, TAG_SIZE};

/// Context label for the account-level manager.
pub const CONTEXT_MAIN: &[u8; CONTEXT_SIZE] = b"Main    ";
/// Context label for per-collection managers.
pub const CONTEXT_COLLECTION: &[u8; CONTEXT_SIZE] = b"Col     ";
/// Context label for per-item managers.
pub const CONTEXT_ITEM: &[u8; CONTEXT_SIZE] = b"ColItem ";

/// A per-collection/item 256-bit symmetric encryption key.
///
/// Stored wrapped (AEAD-encrypted) under the parent's cipher key;
/// zeroized on drop while unwrapped.
#[derive(Clone)]
pub struct ObjectKey {
    bytes: [u8; KEY_SIZE],
}

impl ObjectKey {
    /// Draw a fresh random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for ObjectKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Symmetric crypto manager bound to one object's cryptographic scope.
///
/// Immutable after construction. Holds the (cipher, MAC, asym-seed)
/// subkey triple derived from `(parent, context, version)`.
pub struct CryptoManager {
    version: u8,
    cipher_key: [u8; KEY_SIZE],
    mac_key: [u8; KEY_SIZE],
    asym_key_seed: [u8; KEY_SIZE],
}

impl CryptoManager {
    /// Derive a manager from a parent key under an 8-byte context
    /// label. Refuses versions above [`CURRENT_VERSION`].
    pub fn new(parent: &[u8; KEY_SIZE], context: &[u8; CONTEXT_SIZE], version: u8) -> Result<Self> {
        if version > CURRENT_VERSION {
            return Err(Error::Version {
                found: version,
                supported: CURRENT_VERSION,
            });
        }
        Ok(Self {
            version,
            cipher_key: derive_subkey(parent, context, SUBKEY_ID_CIPHER)?,
            mac_key: derive_subkey(parent, context, SUBKEY_ID_MAC)?,
            asym_key_seed: derive_subkey(parent, context, SUBKEY_ID_ASYM)?,
        })
    }

    /// The account's top-level manager (context `"Main    "`).
    pub fn main(master: &MasterKey, version: u8) -> Result<Self> {
        Self::new(master.as_bytes(), CONTEXT_MAIN, version)
    }

    /// A per-collection manager (context `"Col     "`).
    pub fn collection(key: &ObjectKey, version: u8) -> Result<Self> {
        Self::new(key.as_bytes(), CONTEXT_COLLECTION, version)
    }

    /// A per-item manager (context `"ColItem "`).
    pub fn item(key: &ObjectKey, version: u8) -> Result<Self> {
        Self::new(key.as_bytes(), CONTEXT_ITEM, version)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Seed for the manager's deterministic Ed25519 keypair.
    pub fn asym_key_seed(&self) -> &[u8; KEY_SIZE] {
        &self.asym_key_seed
    }

    /// Encrypt with a fresh random nonce; returns `nonce ‖ ct ‖ tag`.
    pub fn encrypt(&self, plaintext: &[u8], additional_data: Option<&[u8]>) -> Result<Vec<u8>> {
        let cipher = XChaCha20Poly1305::new((&self.cipher_key).into());
        let nonce_bytes = gen_nonce();
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: additional_data.unwrap_or(&[]),
                },
            )
            .map_err(|_| Error::Other(anyhow::anyhow!("AEAD encryption failed")))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt `nonce ‖ ct ‖ tag`. Verification failure is reported as
    /// a single [`Error::Integrity`] regardless of cause — bad key, bad
    /// nonce and bad tag are indistinguishable to the caller.
    pub fn decrypt(&self, data: &[u8], additional_data: Option<&[u8]>) -> Result<Vec<u8>> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::Encoding(format!(
                "ciphertext too short: {} bytes (minimum {})",
                data.len(),
                NONCE_SIZE + TAG_SIZE
            )));
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let cipher = XChaCha20Poly1305::new((&self.cipher_key).into());

        cipher
            .decrypt(
                XNonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: additional_data.unwrap_or(&[]),
                },
            )
            .map_err(|_| Error::Integrity("AEAD verification failed".into()))
    }

    /// Encrypt with a detached tag; returns `(tag, nonce ‖ ct)`.
    pub fn encrypt_detached(
        &self,
        plaintext: &[u8],
        additional_data: Option<&[u8]>,
    ) -> Result<([u8; TAG_SIZE], Vec<u8>)> {
        let cipher = XChaCha20Poly1305::new((&self.cipher_key).into());
        let nonce_bytes = gen_nonce();
        let nonce = XNonce::from_slice(&nonce_bytes);

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(nonce, additional_data.unwrap_or(&[]), &mut buffer)
            .map_err(|_| Error::Other(anyhow::anyhow!("AEAD encryption failed")))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + buffer.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&buffer);
        Ok((tag.into(), result))
    }

    /// Decrypt `nonce ‖ ct` against a detached tag.
    pub fn decrypt_detached(
        &self,
        data: &[u8],
        tag: &[u8; TAG_SIZE],
        additional_data: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        if data.len() < NONCE_SIZE {
            return Err(Error::Encoding(format!(
                "ciphertext too short: {} bytes (minimum {NONCE_SIZE})",
                data.len()
            )));
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let cipher = XChaCha20Poly1305::new((&self.cipher_key).into());

        let mut buffer = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(
                XNonce::from_slice(nonce_bytes),
                additional_data.unwrap_or(&[]),
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| {
                buffer.zeroize();
                Error::Integrity("AEAD verification failed".into())
            })?;
        Ok(buffer)
    }

    /// Fresh incremental keyed MAC seeded with this manager's MAC key.
    pub fn mac_builder(&self) -> Result<MacBuilder> {
        MacBuilder::new(&self.mac_key)
    }

    /// Wrap another object's symmetric key under this manager's cipher
    /// key (at-rest storage form).
    pub fn wrap_key(&self, key: &ObjectKey) -> Result<Vec<u8>> {
        self.encrypt(key.as_bytes(), None)
    }

    /// Unwrap a key previously wrapped with [`CryptoManager::wrap_key`].
    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<ObjectKey> {
        let mut plaintext = self.decrypt(wrapped, None)?;
        if plaintext.len() != KEY_SIZE {
            plaintext.zeroize();
            return Err(Error::Encoding(format!(
                "unwrapped key has wrong size: {} bytes (expected {KEY_SIZE})",
                plaintext.len()
            )));
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&plaintext);
        plaintext.zeroize();
        Ok(ObjectKey::from_bytes(bytes))
    }
}

impl Drop for CryptoManager {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
        self.mac_key.zeroize();
        self.asym_key_seed.zeroize();
    }
}

impl std::fmt::Debug for CryptoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoManager")
            .field("version", &self.version)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

/// Incremental keyed BLAKE2b-256.
pub struct MacBuilder {
    inner: Blake2bMac<U32>,
}

impl MacBuilder {
    fn new(key: &[u8; KEY_SIZE]) -> Result<Self> {
        let inner = <Blake2bMac<U32> as blake2::digest::KeyInit>::new_from_slice(key)
            .map_err(|e| Error::Other(anyhow::anyhow!("MAC key setup failed: {e}")))?;
        Ok(Self { inner })
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> [u8; MAC_SIZE] {
        self.inner.finalize().into_bytes().into()
    }
}

fn gen_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}
