use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the crypto core.
///
/// The core recovers from nothing: every variant is fatal for the
/// affected object. Messages identify the object (uid, kind) but never
/// its plaintext contents.
#[derive(Debug, Error)]
pub enum Error {
    /// AEAD verification failed, a revision uid did not match its
    /// recomputed MAC, or a signature did not verify.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Malformed base64, non-UTF-8 meta, or a JSON parse failure on
    /// decrypted metadata.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The object claims a protocol version this implementation does
    /// not understand; decryption is refused.
    #[error("unsupported version {found} (supported up to {supported})")]
    Version { found: u8, supported: u8 },

    /// Surfaced by the transport collaborator, never generated here.
    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
