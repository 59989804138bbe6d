//! Encrypted, MAC-identified revisions
//!
//! A revision's uid doubles as its integrity tag: a keyed BLAKE2b-256
//! over a fixed byte feed, URL-safe base64 encoded. The feed order is
//! part of the protocol and must never change:
//!
//! ```text
//! 1. one byte: 0x01 if deleted, else 0x00
//! 2. the decoded raw bytes of each chunk reference, in order
//! 3. if meta is present, the final 16 bytes of the meta ciphertext
//!    (the AEAD tag — it already authenticates the meta under the
//!    cipher key, so the feed stays short and independent of meta size)
//! 4. each additional-data element, in order (e.g. the parent uid)
//! ```
//!
//! Revisions are value-like: every mutation of a collection or item
//! creates a fresh one; old revisions are never modified in place.

use subtle::ConstantTimeEq;

use satchel_core::{from_base64, to_base64, EncryptedRevision, Error, Result};
use satchel_crypto::{CryptoManager, MAC_SIZE, TAG_SIZE};

/// A content-addressed chunk: reference plus optionally inlined
/// ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Keyed MAC of the chunk plaintext, URL-safe base64.
    pub id: String,
    /// AEAD ciphertext, present when inlined (absent for chunks the
    /// server serves out-of-band).
    pub data: Option<Vec<u8>>,
}

/// One immutable snapshot of a collection's or item's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    uid: String,
    meta: Option<Vec<u8>>,
    chunks: Vec<Chunk>,
    deleted: bool,
}

impl Revision {
    /// Encrypt content and meta, then seal the revision under its MAC
    /// uid.
    ///
    /// `additional_data` binds the revision to its context (the parent
    /// object's uid bytes, in order).
    pub fn create(
        cm: &CryptoManager,
        additional_data: &[&[u8]],
        meta: Option<&[u8]>,
        content: Option<&[u8]>,
        deleted: bool,
    ) -> Result<Self> {
        let meta_ciphertext = match meta {
            Some(plaintext) => Some(cm.encrypt(plaintext, None)?),
            None => None,
        };
        let chunks = match content {
            Some(content) => Self::chunkify(cm, content)?,
            None => Vec::new(),
        };
        Self::with_parts(cm, additional_data, meta_ciphertext, chunks, deleted)
    }

    /// Assemble a revision from already-encrypted parts and compute its
    /// uid. Used by mutations that carry meta or chunks over unchanged.
    pub(crate) fn with_parts(
        cm: &CryptoManager,
        additional_data: &[&[u8]],
        meta: Option<Vec<u8>>,
        chunks: Vec<Chunk>,
        deleted: bool,
    ) -> Result<Self> {
        let mac = compute_mac(cm, additional_data, meta.as_deref(), &chunks, deleted)?;
        Ok(Self {
            uid: to_base64(&mac),
            meta,
            chunks,
            deleted,
        })
    }

    /// Encrypt content into chunk form.
    ///
    /// The chunk reference is the keyed MAC of the plaintext, so equal
    /// content deduplicates server-side without revealing it.
    pub(crate) fn chunkify(cm: &CryptoManager, content: &[u8]) -> Result<Vec<Chunk>> {
        let mut mac = cm.mac_builder()?;
        mac.update(content);
        let id = to_base64(&mac.finalize());
        let data = cm.encrypt(content, None)?;
        Ok(vec![Chunk {
            id,
            data: Some(data),
        }])
    }

    /// Recompute the MAC feed and compare against the stored uid in
    /// constant time. Mismatch means the revision (or its context) was
    /// tampered with.
    pub fn verify(&self, cm: &CryptoManager, additional_data: &[&[u8]]) -> Result<()> {
        let expected = compute_mac(cm, additional_data, self.meta.as_deref(), &self.chunks, self.deleted)?;
        let stored = from_base64(&self.uid)?;
        if stored.len() != MAC_SIZE || expected.ct_eq(&stored[..]).unwrap_u8() == 0 {
            return Err(Error::Integrity(format!(
                "revision {}: uid does not match content",
                self.uid
            )));
        }
        Ok(())
    }

    /// Decrypt the meta ciphertext. Absent meta is an encoding error;
    /// a failed AEAD check is an integrity error.
    pub fn decrypt_meta(&self, cm: &CryptoManager) -> Result<Vec<u8>> {
        let meta = self.meta.as_ref().ok_or_else(|| {
            Error::Encoding(format!("revision {}: no meta to decrypt", self.uid))
        })?;
        cm.decrypt(meta, None)
            .map_err(|_| Error::Integrity(format!("revision {}: meta failed authentication", self.uid)))
    }

    /// Decrypt and concatenate all chunks, re-checking each chunk's
    /// reference against its plaintext.
    pub fn decrypt_content(&self, cm: &CryptoManager) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        for chunk in &self.chunks {
            let data = chunk.data.as_ref().ok_or_else(|| {
                Error::Encoding(format!("chunk {}: no inline data", chunk.id))
            })?;
            let plaintext = cm
                .decrypt(data, None)
                .map_err(|_| Error::Integrity(format!("chunk {}: failed authentication", chunk.id)))?;

            let mut mac = cm.mac_builder()?;
            mac.update(&plaintext);
            let expected = mac.finalize();
            let stored = from_base64(&chunk.id)?;
            if stored.len() != MAC_SIZE || expected.ct_eq(&stored[..]).unwrap_u8() == 0 {
                return Err(Error::Integrity(format!(
                    "chunk {}: reference does not match plaintext",
                    chunk.id
                )));
            }
            content.extend_from_slice(&plaintext);
        }
        Ok(content)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn meta_ciphertext(&self) -> Option<&Vec<u8>> {
        self.meta.as_ref()
    }

    pub(crate) fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Wire form; inlines chunk data when present.
    pub fn to_wire(&self) -> EncryptedRevision {
        let chunks_data: Vec<String> = self
            .chunks
            .iter()
            .filter_map(|c| c.data.as_deref().map(to_base64))
            .collect();
        EncryptedRevision {
            uid: self.uid.clone(),
            meta: self.meta.as_deref().map(to_base64),
            chunks: self.chunks.iter().map(|c| c.id.clone()).collect(),
            deleted: self.deleted,
            chunks_data: (!chunks_data.is_empty()).then_some(chunks_data),
            chunks_urls: None,
        }
    }

    /// Reassemble from the wire. When `chunks_data` is present it must
    /// align one-to-one with `chunks`.
    pub fn from_wire(wire: &EncryptedRevision) -> Result<Self> {
        let meta = wire.meta.as_deref().map(from_base64).transpose()?;
        let chunks = match &wire.chunks_data {
            Some(data) => {
                if data.len() != wire.chunks.len() {
                    return Err(Error::Encoding(format!(
                        "revision {}: {} chunk refs but {} data entries",
                        wire.uid,
                        wire.chunks.len(),
                        data.len()
                    )));
                }
                wire.chunks
                    .iter()
                    .zip(data)
                    .map(|(id, d)| {
                        Ok(Chunk {
                            id: id.clone(),
                            data: Some(from_base64(d)?),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            None => wire
                .chunks
                .iter()
                .map(|id| Chunk {
                    id: id.clone(),
                    data: None,
                })
                .collect(),
        };
        Ok(Self {
            uid: wire.uid.clone(),
            meta,
            chunks,
            deleted: wire.deleted,
        })
    }
}

/// The protocol MAC feed; see the module docs for the ordering.
fn compute_mac(
    cm: &CryptoManager,
    additional_data: &[&[u8]],
    meta: Option<&[u8]>,
    chunks: &[Chunk],
    deleted: bool,
) -> Result<[u8; MAC_SIZE]> {
    let mut mac = cm.mac_builder()?;
    mac.update(&[u8::from(deleted)]);
    for chunk in chunks {
        mac.update(&from_base64(&chunk.id)?);
    }
    if let Some(meta) = meta {
        if meta.len() < TAG_SIZE {
            return Err(Error::Encoding(format!(
                "meta ciphertext too short: {} bytes",
                meta.len()
            )));
        }
        mac.update(&meta[meta.len() - TAG_SIZE..]);
    }
    for data in additional_data {
        mac.update(data);
    }
    Ok(mac.finalize())
}
