//! Sharing envelopes
//!
//! Inviting a user to a collection wraps the collection key under the
//! recipient's public identity (authenticated box) and signs the whole
//! envelope with the inviter's long-term key. The recipient verifies
//! the signature chain, recovers the key, and re-wraps it under their
//! own account manager — from then on the shared collection is
//! indistinguishable from one they created, apart from the access
//! level the server enforces.
//!
//! Verifying the sender's pubkey fingerprint out-of-band is the
//! callers' trust anchor; this module only guarantees that envelope,
//! key, and sender identity are consistent.

use tracing::debug;
use zeroize::Zeroize;

use satchel_core::{from_base64, to_base64, AccessLevel, Error, Result, WireInvitation};
use satchel_crypto::{
    digest256, AsymmetricCryptoManager, CryptoManager, ObjectKey, KEY_SIZE, SIGNATURE_SIZE,
};

use crate::collection::Collection;

/// A signed invitation from inviter to invitee.
#[derive(Debug, Clone)]
pub struct SignedInvitation {
    collection_uid: String,
    access_level: AccessLevel,
    wrapped: Vec<u8>,
    sender_pub: [u8; KEY_SIZE],
    signature: [u8; SIGNATURE_SIZE],
}

impl SignedInvitation {
    /// Invite a recipient to a collection.
    ///
    /// Unwraps the collection key locally, seals it to the recipient's
    /// identity, and signs the envelope digest with the sender's key.
    pub fn invite(
        collection: &Collection,
        parent: &CryptoManager,
        sender: &AsymmetricCryptoManager,
        recipient_pub: &[u8; KEY_SIZE],
        access_level: AccessLevel,
    ) -> Result<Self> {
        let key = parent.unwrap_key(collection.encryption_key())?;
        let wrapped = sender.encrypt_sign(key.as_bytes(), recipient_pub)?;

        let digest = envelope_digest(collection.uid(), access_level, &wrapped);
        let signature = sender.sign_detached(&digest);

        debug!(collection = %collection.uid(), access = access_level.as_str(), "created invitation");
        Ok(Self {
            collection_uid: collection.uid().to_string(),
            access_level,
            wrapped,
            sender_pub: sender.pubkey(),
            signature,
        })
    }

    /// Check the signature chain binding this envelope to the claimed
    /// sender.
    pub fn verify(&self) -> Result<()> {
        let digest = envelope_digest(&self.collection_uid, self.access_level, &self.wrapped);
        AsymmetricCryptoManager::verify_detached(&digest, &self.signature, &self.sender_pub)
            .map_err(|e| match e {
                Error::Integrity(_) => Error::Integrity(format!(
                    "invitation for collection {}: signature does not verify",
                    self.collection_uid
                )),
                other => other,
            })
    }

    /// Accept the invitation: verify, recover the collection key, and
    /// re-wrap it under the recipient's main manager. The returned
    /// bytes become the recipient's `encryption_key` for the
    /// collection.
    ///
    /// Handing the envelope to anyone but the intended recipient fails
    /// with an integrity error.
    pub fn accept(
        &self,
        recipient: &AsymmetricCryptoManager,
        recipient_main: &CryptoManager,
    ) -> Result<Vec<u8>> {
        self.verify()?;

        let mut key_bytes = recipient.decrypt_verify(&self.wrapped, &self.sender_pub)?;
        if key_bytes.len() != KEY_SIZE {
            key_bytes.zeroize();
            return Err(Error::Encoding(format!(
                "invitation for collection {}: wrapped key has wrong size",
                self.collection_uid
            )));
        }
        let mut raw = [0u8; KEY_SIZE];
        raw.copy_from_slice(&key_bytes);
        key_bytes.zeroize();

        let key = ObjectKey::from_bytes(raw);
        raw.zeroize();

        debug!(collection = %self.collection_uid, "accepted invitation");
        recipient_main.wrap_key(&key)
    }

    pub fn collection_uid(&self) -> &str {
        &self.collection_uid
    }

    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    pub fn sender_pub(&self) -> &[u8; KEY_SIZE] {
        &self.sender_pub
    }

    pub fn to_wire(&self) -> WireInvitation {
        WireInvitation {
            collection_uid: self.collection_uid.clone(),
            access_level: self.access_level,
            wrapped: to_base64(&self.wrapped),
            sender_pub: to_base64(&self.sender_pub),
            signature: to_base64(&self.signature),
        }
    }

    pub fn from_wire(wire: &WireInvitation) -> Result<Self> {
        let sender_pub: [u8; KEY_SIZE] = from_base64(&wire.sender_pub)?
            .try_into()
            .map_err(|_| Error::Encoding("invitation: sender pubkey has wrong size".into()))?;
        let signature: [u8; SIGNATURE_SIZE] = from_base64(&wire.signature)?
            .try_into()
            .map_err(|_| Error::Encoding("invitation: signature has wrong size".into()))?;
        Ok(Self {
            collection_uid: wire.collection_uid.clone(),
            access_level: wire.access_level,
            wrapped: from_base64(&wire.wrapped)?,
            sender_pub,
            signature,
        })
    }
}

/// Digest the envelope is signed over: uid bytes, the canonical access
/// level token, then the wrapped key.
fn envelope_digest(collection_uid: &str, access_level: AccessLevel, wrapped: &[u8]) -> [u8; 32] {
    let mut input = Vec::with_capacity(collection_uid.len() + 3 + wrapped.len());
    input.extend_from_slice(collection_uid.as_bytes());
    input.extend_from_slice(access_level.as_str().as_bytes());
    input.extend_from_slice(wrapped);
    digest256(&input)
}
