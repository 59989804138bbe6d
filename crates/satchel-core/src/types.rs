//! Transport-facing wire shapes
//!
//! The crypto core produces and consumes these JSON-serializable
//! structures; the transport moves them verbatim. Binary fields are
//! URL-safe unpadded base64 strings. The server stores and routes these
//! blobs without ever being able to read them.

use serde::{Deserialize, Serialize};

/// Access granted to a collection member.
///
/// Enforcement is server-side only; the crypto core treats every holder
/// of the collection key as equally capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessLevel {
    #[serde(rename = "adm")]
    Admin,
    #[serde(rename = "rw")]
    ReadWrite,
    #[serde(rename = "ro")]
    ReadOnly,
}

impl AccessLevel {
    /// The canonical wire token, also fed into invitation signatures.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Admin => "adm",
            AccessLevel::ReadWrite => "rw",
            AccessLevel::ReadOnly => "ro",
        }
    }
}

/// A revision as shipped to or from the server.
///
/// `chunks` carries the content-addressed references; `chunks_data`
/// inlines ciphertext for chunks being uploaded, while `chunks_urls`
/// appears on reads for chunks the server serves out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedRevision {
    pub uid: String,
    pub meta: Option<String>,
    pub chunks: Vec<String>,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_data: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_urls: Option<Vec<String>>,
}

/// A collection (or item) envelope as stored server-side.
///
/// `access_level`, `ctag` and `stoken` are only present on reads; they
/// are issued by the server and opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedCollection {
    pub uid: String,
    pub version: u8,
    pub encryption_key: String,
    pub content: EncryptedRevision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stoken: Option<String>,
}

/// A signed sharing envelope in transit between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireInvitation {
    pub collection_uid: String,
    pub access_level: AccessLevel,
    pub wrapped: String,
    pub sender_pub: String,
    pub signature: String,
}

/// Public account record as published to the server at signup.
///
/// `login_pubkey` authenticates challenge-response login;
/// `encrypted_content` holds the identity secret key, sealed under a
/// key the server never learns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: Option<String>,
    pub salt: String,
    pub login_pubkey: String,
    pub pubkey: String,
    pub encrypted_content: String,
}

/// Persisted account session blob.
///
/// Opaque export/import format; for a given protocol version it must
/// round-trip byte-identically, so field order here is canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    pub version: u8,
    pub key: String,
    pub user: UserProfile,
    pub server_url: String,
}
