//! Item lifecycle
//!
//! Items mirror collections one level down: the item key is wrapped
//! under its parent collection's cipher key and the derived manager
//! uses the `"ColItem "` context, so item and collection material can
//! never substitute for one another.

use serde::{Deserialize, Serialize};
use tracing::debug;

use satchel_core::{from_base64, gen_uid, to_base64, EncryptedCollection, Error, Result};
use satchel_crypto::{CryptoManager, ObjectKey};

use crate::revision::Revision;

/// Item metadata; extends the base `{type}` schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    #[serde(rename = "type")]
    pub item_type: String,
    pub name: Option<String>,
    pub mtime: Option<i64>,
}

/// An encrypted record inside a collection.
#[derive(Debug)]
pub struct Item {
    uid: String,
    version: u8,
    encryption_key: Vec<u8>,
    content: Revision,
}

impl Item {
    /// Create an item under a collection's crypto manager.
    pub fn create(collection_cm: &CryptoManager, meta: &ItemMeta, content: &[u8]) -> Result<Self> {
        let uid = gen_uid();
        let key = ObjectKey::generate();
        let encryption_key = collection_cm.wrap_key(&key)?;
        let cm = CryptoManager::item(&key, collection_cm.version())?;

        let meta_bytes = serialize_meta(meta)?;
        let revision = Revision::create(
            &cm,
            &[uid.as_bytes()],
            Some(&meta_bytes),
            Some(content),
            false,
        )?;

        debug!(uid = %uid, "created item");
        Ok(Self {
            uid,
            version: collection_cm.version(),
            encryption_key,
            content: revision,
        })
    }

    /// Unwrap the item key and derive its manager; refuses unknown
    /// versions before decrypting anything.
    pub fn crypto_manager(&self, collection_cm: &CryptoManager) -> Result<CryptoManager> {
        if self.version > satchel_core::CURRENT_VERSION {
            return Err(Error::Version {
                found: self.version,
                supported: satchel_core::CURRENT_VERSION,
            });
        }
        let key = collection_cm.unwrap_key(&self.encryption_key)?;
        CryptoManager::item(&key, self.version)
    }

    pub fn verify(&self, collection_cm: &CryptoManager) -> Result<()> {
        let cm = self.crypto_manager(collection_cm)?;
        self.content.verify(&cm, &[self.uid.as_bytes()])
    }

    pub fn decrypt_meta(&self, collection_cm: &CryptoManager) -> Result<ItemMeta> {
        let cm = self.crypto_manager(collection_cm)?;
        self.content.verify(&cm, &[self.uid.as_bytes()])?;
        let plaintext = self.content.decrypt_meta(&cm)?;
        deserialize_meta(&plaintext)
    }

    pub fn decrypt_content(&self, collection_cm: &CryptoManager) -> Result<Vec<u8>> {
        let cm = self.crypto_manager(collection_cm)?;
        self.content.verify(&cm, &[self.uid.as_bytes()])?;
        self.content.decrypt_content(&cm)
    }

    /// Replace the current revision; unchanged parts carry over.
    pub fn update(
        &mut self,
        collection_cm: &CryptoManager,
        meta: Option<&ItemMeta>,
        content: Option<&[u8]>,
    ) -> Result<()> {
        let cm = self.crypto_manager(collection_cm)?;

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
        debug!(uid = %self.uid, revision = %self.content.uid(), "updated item");
        Ok(())
    }

    pub fn set_meta(&mut self, collection_cm: &CryptoManager, meta: &ItemMeta) -> Result<()> {
        self.update(collection_cm, Some(meta), None)
    }

    pub fn set_content(&mut self, collection_cm: &CryptoManager, content: &[u8]) -> Result<()> {
        self.update(collection_cm, None, Some(content))
    }

    /// Tombstone the item, keeping its meta readable for listings.
    pub fn remove(&mut self, collection_cm: &CryptoManager) -> Result<()> {
        let cm = self.crypto_manager(collection_cm)?;
        let meta_plaintext = self.content.decrypt_meta(&cm)?;
        let meta_ciphertext = cm.encrypt(&meta_plaintext, None)?;

        self.content = Revision::with_parts(
            &cm,
            &[self.uid.as_bytes()],
            Some(meta_ciphertext),
            Vec::new(),
            true,
        )?;
        debug!(uid = %self.uid, "tombstoned item");
        Ok(())
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn is_deleted(&self) -> bool {
        self.content.deleted()
    }

    pub fn content(&self) -> &Revision {
        &self.content
    }

    pub fn to_wire(&self) -> EncryptedCollection {
        EncryptedCollection {
            uid: self.uid.clone(),
            version: self.version,
            encryption_key: to_base64(&self.encryption_key),
            content: self.content.to_wire(),
            access_level: None,
            ctag: None,
            stoken: None,
        }
    }

    pub fn from_wire(wire: &EncryptedCollection) -> Result<Self> {
        Ok(Self {
            uid: wire.uid.clone(),
            version: wire.version,
            encryption_key: from_base64(&wire.encryption_key)?,
            content: Revision::from_wire(&wire.content)?,
        })
    }
}

fn serialize_meta(meta: &ItemMeta) -> Result<Vec<u8>> {
    serde_json::to_vec(meta).map_err(|e| Error::Encoding(format!("meta serialization: {e}")))
}

fn deserialize_meta(plaintext: &[u8]) -> Result<ItemMeta> {
    serde_json::from_slice(plaintext).map_err(|e| Error::Encoding(format!("meta parse: {e}")))
}
