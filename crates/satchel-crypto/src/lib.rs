//! satchel-crypto: client-side crypto core for Satchel E2EE sync
//!
//! Everything is encrypted on-device; the server only ever routes
//! opaque ciphertext.
//!
//! Key hierarchy:
//! ```text
//! Master Key (256-bit, Argon2id from password + per-user salt)
//!   └── context-labeled subkey tree (keyed BLAKE2b-256)
//!         "Main    " → account cipher / MAC / asym-seed triple
//!             ├── wraps per-collection keys and the identity keypair
//!             └── asym seed → Ed25519 login keypair
//!         "Col     " → per-collection cipher / MAC / asym-seed triple
//!         "ColItem " → per-item triple (item key wrapped by collection)
//! ```
//!
//! Content encryption is XChaCha20-Poly1305 with a fresh random 24-byte
//! nonce prefixed to every ciphertext. Revision identity is a keyed
//! BLAKE2b-256 MAC. Sharing converts Ed25519 identities to X25519 and
//! seals keys with an authenticated box.

pub mod asym;
pub mod fingerprint;
pub mod kdf;
pub mod manager;

pub use asym::{AsymmetricCryptoManager, SECRET_KEY_SIZE};
pub use fingerprint::{digest256, pretty_fingerprint, pretty_fingerprint_with_delimiter};
pub use kdf::{derive_key, derive_subkey, pad_context, KdfParams, MasterKey};
pub use manager::{CryptoManager, MacBuilder, ObjectKey};

/// Size of a symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 (and X25519 box) nonce
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of the per-user Argon2id salt
pub const SALT_SIZE: usize = 16;

/// Size of a keyed BLAKE2b MAC output
pub const MAC_SIZE: usize = 32;

/// Size of a KDF-tree context label
pub const CONTEXT_SIZE: usize = 8;

/// Size of an Ed25519 signature
pub const SIGNATURE_SIZE: usize = 64;
