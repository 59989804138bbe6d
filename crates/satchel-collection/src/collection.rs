//! Collection lifecycle
//!
//! A collection owns a wrapped 256-bit key; the crypto manager derived
//! from it (context `"Col     "`) is ephemeral, unwrapped on demand
//! and dropped after each operation. Revisions bind to the collection
//! through its uid bytes as MAC additional data, so a revision cannot
//! be replayed under a different collection.

use serde::{Deserialize, Serialize};
use tracing::debug;

use satchel_core::{
    from_base64, gen_uid, to_base64, AccessLevel, EncryptedCollection, Error, Result,
};
use satchel_crypto::{CryptoManager, ObjectKey};

use crate::revision::Revision;

/// User-visible collection metadata; encrypted into the revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMeta {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// A long-lived encrypted container of items.
#[derive(Debug)]
pub struct Collection {
    uid: String,
    version: u8,
    access_level: AccessLevel,
    ctag: Option<String>,
    stoken: Option<String>,
    encryption_key: Vec<u8>,
    content: Revision,
}

impl Collection {
    /// Create a collection under the account's main crypto manager:
    /// fresh uid, fresh key wrapped under the parent's cipher key, and
    /// an initial revision carrying the meta and content.
    pub fn create(parent: &CryptoManager, meta: &CollectionMeta, content: &[u8]) -> Result<Self> {
        let uid = gen_uid();
        let key = ObjectKey::generate();
        let encryption_key = parent.wrap_key(&key)?;
        let cm = CryptoManager::collection(&key, parent.version())?;

        let meta_bytes = serialize_meta(meta)?;
        let revision = Revision::create(
            &cm,
            &[uid.as_bytes()],
            Some(&meta_bytes),
            Some(content),
            false,
        )?;

        debug!(uid = %uid, "created collection");
        Ok(Self {
            uid,
            version: parent.version(),
            access_level: AccessLevel::Admin,
            ctag: None,
            stoken: None,
            encryption_key,
            content: revision,
        })
    }

    /// Unwrap the collection key and derive its manager. The manager is
    /// ephemeral; callers should not hold it beyond the operation.
    /// Unknown versions are refused before anything is decrypted.
    pub fn crypto_manager(&self, parent: &CryptoManager) -> Result<CryptoManager> {
        if self.version > satchel_core::CURRENT_VERSION {
            return Err(Error::Version {
                found: self.version,
                supported: satchel_core::CURRENT_VERSION,
            });
        }
        let key = parent.unwrap_key(&self.encryption_key)?;
        CryptoManager::collection(&key, self.version)
    }

    /// Check the current revision against this collection's identity.
    /// A failure rejects the entire object as tampered.
    pub fn verify(&self, parent: &CryptoManager) -> Result<()> {
        let cm = self.crypto_manager(parent)?;
        self.content.verify(&cm, &[self.uid.as_bytes()])
    }

    /// Verify, then decrypt and parse the collection meta.
    pub fn decrypt_meta(&self, parent: &CryptoManager) -> Result<CollectionMeta> {
        let cm = self.crypto_manager(parent)?;
        self.content.verify(&cm, &[self.uid.as_bytes()])?;
        let plaintext = self.content.decrypt_meta(&cm)?;
        deserialize_meta(&plaintext)
    }

    /// Verify, then decrypt the collection content.
    pub fn decrypt_content(&self, parent: &CryptoManager) -> Result<Vec<u8>> {
        let cm = self.crypto_manager(parent)?;
        self.content.verify(&cm, &[self.uid.as_bytes()])?;
        self.content.decrypt_content(&cm)
    }

    /// Replace the current revision with one carrying new meta and/or
    /// content. Unchanged parts are carried over ciphertext-verbatim;
    /// prior revisions are never mutated.
    pub fn update(
        &mut self,
        parent: &CryptoManager,
        meta: Option<&CollectionMeta>,
        content: Option<&[u8]>,
    ) -> Result<()> {
        let cm = self.crypto_manager(parent)?;

        let meta_ciphertext = match meta {
            Some(meta) => Some(cm.encrypt(&serialize_meta(meta)?, None)?),
            None => self.content.meta_ciphertext().cloned(),
        };
        let chunks = match content {
            Some(content) => Revision::chunkify(&cm, content)?,
            None => self.content.chunks().to_vec(),
        };

        self.content = Revision::with_parts(
            &cm,
            &[self.uid.as_bytes()],
            meta_ciphertext,
            chunks,
            self.content.deleted(),
        )?;
        debug!(uid = %self.uid, revision = %self.content.uid(), "updated collection");
        Ok(())
    }

    pub fn set_meta(&mut self, parent: &CryptoManager, meta: &CollectionMeta) -> Result<()> {
        self.update(parent, Some(meta), None)
    }

    pub fn set_content(&mut self, parent: &CryptoManager, content: &[u8]) -> Result<()> {
        self.update(parent, None, Some(content))
    }

    /// Tombstone the collection. The previous meta is preserved
    /// (re-encrypted under a fresh nonce) so listings can still render
    /// the deleted entry; chunks are cleared.
    pub fn remove(&mut self, parent: &CryptoManager) -> Result<()> {
        let cm = self.crypto_manager(parent)?;
        let meta_plaintext = self.content.decrypt_meta(&cm)?;
        let meta_ciphertext = cm.encrypt(&meta_plaintext, None)?;

        self.content = Revision::with_parts(
            &cm,
            &[self.uid.as_bytes()],
            Some(meta_ciphertext),
            Vec::new(),
            true,
        )?;
        debug!(uid = %self.uid, "tombstoned collection");
        Ok(())
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    pub fn ctag(&self) -> Option<&str> {
        self.ctag.as_deref()
    }

    pub fn stoken(&self) -> Option<&str> {
        self.stoken.as_deref()
    }

    pub fn is_deleted(&self) -> bool {
        self.content.deleted()
    }

    pub fn content(&self) -> &Revision {
        &self.content
    }

    pub(crate) fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    pub fn to_wire(&self) -> EncryptedCollection {
        EncryptedCollection {
            uid: self.uid.clone(),
            version: self.version,
            encryption_key: to_base64(&self.encryption_key),
            content: self.content.to_wire(),
            access_level: Some(self.access_level),
            ctag: self.ctag.clone(),
            stoken: self.stoken.clone(),
        }
    }

    pub fn from_wire(wire: &EncryptedCollection) -> Result<Self> {
        Ok(Self {
            uid: wire.uid.clone(),
            version: wire.version,
            access_level: wire.access_level.unwrap_or(AccessLevel::Admin),
            ctag: wire.ctag.clone(),
            stoken: wire.stoken.clone(),
            encryption_key: from_base64(&wire.encryption_key)?,
            content: Revision::from_wire(&wire.content)?,
        })
    }

    /// Construct a local copy of a shared collection after accepting an
    /// invitation: same identity and content, but the key is wrapped
    /// under the recipient's own main manager.
    pub fn adopt(
        wire: &EncryptedCollection,
        encryption_key: Vec<u8>,
        access_level: AccessLevel,
    ) -> Result<Self> {
        let mut collection = Self::from_wire(wire)?;
        collection.encryption_key = encryption_key;
        collection.access_level = access_level;
        Ok(collection)
    }
}

fn serialize_meta(meta: &CollectionMeta) -> Result<Vec<u8>> {
    serde_json::to_vec(meta).map_err(|e| Error::Encoding(format!("meta serialization: {e}")))
}

fn deserialize_meta(plaintext: &[u8]) -> Result<CollectionMeta> {
    serde_json::from_slice(plaintext).map_err(|e| Error::Encoding(format!("meta parse: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_core::CURRENT_VERSION;
    use satchel_crypto::MasterKey;

    fn main_cm() -> CryptoManager {
        CryptoManager::main(&MasterKey::from_bytes([1u8; 32]), CURRENT_VERSION).unwrap()
    }

    fn calendar_meta() -> CollectionMeta {
        CollectionMeta {
            collection_type: "COLTYPE".into(),
            name: "Calendar".into(),
            description: Some("Mine".into()),
            color: Some("#ffffff".into()),
        }
    }

    #[test]
    fn test_create_and_decrypt() {
        let parent = main_cm();
        let collection = Collection::create(&parent, &calendar_meta(), &[1, 2, 3, 5]).unwrap();

        assert!(collection.verify(&parent).is_ok());
        assert_eq!(collection.decrypt_meta(&parent).unwrap(), calendar_meta());
        assert_eq!(collection.decrypt_content(&parent).unwrap(), vec![1, 2, 3, 5]);
        assert_eq!(collection.access_level(), AccessLevel::Admin);
    }

    #[test]
    fn test_uid_is_alphanumeric() {
        let parent = main_cm();
        let collection = Collection::create(&parent, &calendar_meta(), &[]).unwrap();
        assert_eq!(collection.uid().len(), 32);
        assert!(collection.uid().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_set_meta_replaces_revision() {
        let parent = main_cm();
        let mut collection = Collection::create(&parent, &calendar_meta(), &[1, 2, 3, 5]).unwrap();
        let old_revision = collection.content().uid().to_string();

        let mut new_meta = calendar_meta();
        new_meta.name = "Calendar2".into();
        new_meta.color = Some("#000000".into());
        collection.set_meta(&parent, &new_meta).unwrap();

        assert_ne!(collection.content().uid(), old_revision);
        assert!(collection.verify(&parent).is_ok());
        assert_eq!(collection.decrypt_meta(&parent).unwrap(), new_meta);
        // content untouched by a meta-only update
        assert_eq!(collection.decrypt_content(&parent).unwrap(), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_set_content_preserves_meta() {
        let parent = main_cm();
        let mut collection = Collection::create(&parent, &calendar_meta(), b"old").unwrap();

        collection.set_content(&parent, b"new content").unwrap();

        assert!(collection.verify(&parent).is_ok());
        assert_eq!(collection.decrypt_content(&parent).unwrap(), b"new content");
        assert_eq!(collection.decrypt_meta(&parent).unwrap(), calendar_meta());
    }

    #[test]
    fn test_remove_preserves_meta() {
        let parent = main_cm();
        let mut collection = Collection::create(&parent, &calendar_meta(), b"data").unwrap();

        collection.remove(&parent).unwrap();

        assert!(collection.is_deleted());
        assert!(collection.verify(&parent).is_ok());
        assert_eq!(collection.decrypt_meta(&parent).unwrap(), calendar_meta());
        assert!(collection.decrypt_content(&parent).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_parent_rejected() {
        let parent = main_cm();
        let other = CryptoManager::main(&MasterKey::from_bytes([2u8; 32]), CURRENT_VERSION).unwrap();

        let collection = Collection::create(&parent, &calendar_meta(), &[]).unwrap();
        assert!(matches!(
            collection.verify(&other),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_wire_roundtrip() {
        let parent = main_cm();
        let collection = Collection::create(&parent, &calendar_meta(), &[9, 9, 9]).unwrap();

        let wire = collection.to_wire();
        let restored = Collection::from_wire(&wire).unwrap();

        assert_eq!(restored.uid(), collection.uid());
        assert!(restored.verify(&parent).is_ok());
        assert_eq!(restored.decrypt_meta(&parent).unwrap(), calendar_meta());
        assert_eq!(restored.decrypt_content(&parent).unwrap(), vec![9, 9, 9]);
    }

    #[test]
    fn test_unknown_version_refused_on_derive() {
        let parent = main_cm();
        let collection = Collection::create(&parent, &calendar_meta(), &[]).unwrap();
        let mut wire = collection.to_wire();
        wire.version = CURRENT_VERSION + 1;

        let restored = Collection::from_wire(&wire).unwrap();
        assert!(matches!(
            restored.crypto_manager(&parent),
            Err(Error::Version { .. })
        ));
    }
}
