//! satchel-core: shared plumbing for the Satchel E2EE sync core
//!
//! Everything the server or transport ever sees lives here: the error
//! taxonomy, URL-safe base64 helpers, identifier generation, and the
//! JSON wire shapes. No key material and no cryptography; those live
//! in `satchel-crypto` and above.

pub mod encoding;
pub mod error;
pub mod types;

pub use encoding::{from_base64, gen_uid, to_base64};
pub use error::{Error, Result};
pub use types::{
    AccessLevel, AccountData, EncryptedCollection, EncryptedRevision, UserProfile, WireInvitation,
};

/// Protocol version understood by this implementation.
///
/// Objects carrying a higher version are refused before any decryption
/// is attempted.
pub const CURRENT_VERSION: u8 = 1;
