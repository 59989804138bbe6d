//! Asymmetric crypto manager: Ed25519 identities with X25519 sharing
//!
//! One long-term Ed25519 keypair serves both signing and key
//! agreement. For sharing, the secret key's scalar and the recipient's
//! Edwards point are converted to X25519 and the payload is sealed
//! with an authenticated box (ECDH + XSalsa20-Poly1305), binding the
//! message to the sender's signing identity without a second keypair
//! per user.

use crypto_box::{
    aead::Aead, Nonce as BoxNonce, PublicKey as BoxPublicKey, SalsaBox, SecretKey as BoxSecretKey,
};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::RngCore;

use satchel_core::{Error, Result};

use crate::{KEY_SIZE, NONCE_SIZE, SIGNATURE_SIZE, TAG_SIZE};

/// Size of an Ed25519 secret key in the standard keypair layout
/// (seed ‖ public key).
pub const SECRET_KEY_SIZE: usize = 64;

/// Holds an Ed25519 keypair for signing and authenticated key sharing.
pub struct AsymmetricCryptoManager {
    signing_key: SigningKey,
}

impl AsymmetricCryptoManager {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed (a KDF-tree asym
    /// seed).
    pub fn from_seed(seed: &[u8; KEY_SIZE]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstitute from a 64-byte secret key; bytes `[32..64)` are the
    /// embedded public key (standard Ed25519 layout) and must match
    /// the seed half.
    pub fn from_secret_key(secret_key: &[u8; SECRET_KEY_SIZE]) -> Result<Self> {
        let signing_key = SigningKey::from_keypair_bytes(secret_key)
            .map_err(|_| Error::Encoding("invalid Ed25519 keypair bytes".into()))?;
        Ok(Self { signing_key })
    }

    pub fn pubkey(&self) -> [u8; KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The 64-byte secret key (seed ‖ public key), for sealing into the
    /// account's encrypted content blob.
    pub fn secret_key(&self) -> [u8; SECRET_KEY_SIZE] {
        self.signing_key.to_keypair_bytes()
    }

    /// Detached Ed25519 signature over the raw message.
    pub fn sign_detached(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Verify a detached signature. Failure is [`Error::Integrity`].
    pub fn verify_detached(
        message: &[u8],
        signature: &[u8; SIGNATURE_SIZE],
        pubkey: &[u8; KEY_SIZE],
    ) -> Result<()> {
        let verifying_key = VerifyingKey::from_bytes(pubkey)
            .map_err(|_| Error::Encoding("invalid Ed25519 public key".into()))?;
        verifying_key
            .verify_strict(message, &Signature::from_bytes(signature))
            .map_err(|_| Error::Integrity("signature verification failed".into()))
    }

    /// Authenticated public-key encryption to a recipient's Ed25519
    /// identity. Returns `nonce ‖ box ciphertext`.
    pub fn encrypt_sign(&self, message: &[u8], recipient_pub: &[u8; KEY_SIZE]) -> Result<Vec<u8>> {
        let sender_x = self.x25519_secret();
        let recipient_x = x25519_public(recipient_pub)?;
        let salsa_box = SalsaBox::new(&recipient_x, &sender_x);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = BoxNonce::from(nonce_bytes);

        let ciphertext = salsa_box
            .encrypt(&nonce, message)
            .map_err(|_| Error::Other(anyhow::anyhow!("box encryption failed")))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Inverse of [`encrypt_sign`](Self::encrypt_sign): decrypt and
    /// authenticate against the claimed sender. Tag failure (including
    /// a payload sealed for somebody else) is [`Error::Integrity`].
    pub fn decrypt_verify(&self, data: &[u8], sender_pub: &[u8; KEY_SIZE]) -> Result<Vec<u8>> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::Encoding(format!(
                "box ciphertext too short: {} bytes (minimum {})",
                data.len(),
                NONCE_SIZE + TAG_SIZE
            )));
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);

        let recipient_x = self.x25519_secret();
        let sender_x = x25519_public(sender_pub)?;
        let salsa_box = SalsaBox::new(&sender_x, &recipient_x);

        salsa_box
            .decrypt(BoxNonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Error::Integrity("box verification failed".into()))
    }

    /// The X25519 private scalar corresponding to this Ed25519 secret.
    fn x25519_secret(&self) -> BoxSecretKey {
        BoxSecretKey::from(self.signing_key.to_scalar_bytes())
    }
}

impl std::fmt::Debug for AsymmetricCryptoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsymmetricCryptoManager")
            .field("pubkey", &satchel_core::to_base64(&self.pubkey()))
            .finish()
    }
}

/// Convert an Ed25519 public key (Edwards point) to X25519
/// (Montgomery).
fn x25519_public(pubkey: &[u8; KEY_SIZE]) -> Result<BoxPublicKey> {
    let verifying_key = VerifyingKey::from_bytes(pubkey)
        .map_err(|_| Error::Encoding("invalid Ed25519 public key".into()))?;
    Ok(BoxPublicKey::from(verifying_key.to_montgomery().to_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let manager = AsymmetricCryptoManager::generate();
        let message = b"collection invitation payload";

        let signature = manager.sign_detached(message);
        assert!(
            AsymmetricCryptoManager::verify_detached(message, &signature, &manager.pubkey())
                .is_ok()
        );
    }

    #[test]
    fn test_verify_rejects_flipped_message_and_signature() {
        let manager = AsymmetricCryptoManager::generate();
        let message = b"original message";
        let signature = manager.sign_detached(message);
        let pubkey = manager.pubkey();

        assert!(matches!(
            AsymmetricCryptoManager::verify_detached(b"original messagf", &signature, &pubkey),
            Err(Error::Integrity(_))
        ));

        let mut bad_sig = signature;
        bad_sig[10] ^= 0x01;
        assert!(matches!(
            AsymmetricCryptoManager::verify_detached(message, &bad_sig, &pubkey),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_from_seed_deterministic() {
        let seed = [17u8; KEY_SIZE];
        let a = AsymmetricCryptoManager::from_seed(&seed);
        let b = AsymmetricCryptoManager::from_seed(&seed);
        assert_eq!(a.pubkey(), b.pubkey());
    }

    #[test]
    fn test_secret_key_embeds_pubkey_in_tail() {
        let manager = AsymmetricCryptoManager::generate();
        let secret_key = manager.secret_key();
        assert_eq!(&secret_key[32..], &manager.pubkey());
    }

    #[test]
    fn test_from_secret_key_roundtrip() {
        let original = AsymmetricCryptoManager::generate();
        let restored = AsymmetricCryptoManager::from_secret_key(&original.secret_key()).unwrap();

        assert_eq!(original.pubkey(), restored.pubkey());
        let sig = restored.sign_detached(b"still the same identity");
        assert!(AsymmetricCryptoManager::verify_detached(
            b"still the same identity",
            &sig,
            &original.pubkey()
        )
        .is_ok());
    }

    #[test]
    fn test_from_secret_key_rejects_mismatched_pubkey() {
        let a = AsymmetricCryptoManager::generate();
        let b = AsymmetricCryptoManager::generate();

        let mut forged = a.secret_key();
        forged[32..].copy_from_slice(&b.pubkey());
        assert!(matches!(
            AsymmetricCryptoManager::from_secret_key(&forged),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_encrypt_sign_decrypt_verify_roundtrip() {
        let sender = AsymmetricCryptoManager::generate();
        let recipient = AsymmetricCryptoManager::generate();
        let message = b"wrapped collection key";

        let sealed = sender.encrypt_sign(message, &recipient.pubkey()).unwrap();
        let opened = recipient.decrypt_verify(&sealed, &sender.pubkey()).unwrap();

        assert_eq!(opened, message);
    }

    #[test]
    fn test_wrong_recipient_cannot_decrypt() {
        let sender = AsymmetricCryptoManager::generate();
        let recipient = AsymmetricCryptoManager::generate();
        let eavesdropper = AsymmetricCryptoManager::generate();

        let sealed = sender.encrypt_sign(b"secret", &recipient.pubkey()).unwrap();
        assert!(matches!(
            eavesdropper.decrypt_verify(&sealed, &sender.pubkey()),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_wrong_claimed_sender_fails_authentication() {
        let sender = AsymmetricCryptoManager::generate();
        let recipient = AsymmetricCryptoManager::generate();
        let impostor = AsymmetricCryptoManager::generate();

        let sealed = sender.encrypt_sign(b"secret", &recipient.pubkey()).unwrap();
        assert!(matches!(
            recipient.decrypt_verify(&sealed, &impostor.pubkey()),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_tampered_box_fails() {
        let sender = AsymmetricCryptoManager::generate();
        let recipient = AsymmetricCryptoManager::generate();

        let mut sealed = sender.encrypt_sign(b"secret", &recipient.pubkey()).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(matches!(
            recipient.decrypt_verify(&sealed, &sender.pubkey()),
            Err(Error::Integrity(_))
        ));
    }
}
