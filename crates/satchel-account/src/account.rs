//! Account lifecycle: signup material, login, password change, session
//! export
//!
//! Key layout per account:
//! ```text
//! password + salt ──Argon2id──► master key (device-only)
//!   "Main    " tree over the master key
//!     ├─ cipher key: seals `encrypted_content`
//!     └─ asym seed:  deterministic login keypair (challenge-response)
//!
//! encrypted_content = AEAD( account key ‖ identity secret key )
//!   account key: random 256-bit root; the "Main    " tree over it
//!     wraps every per-collection key
//!   identity keypair: random Ed25519 for signing and sharing
//! ```
//! Because collections hang off the random account key rather than the
//! password-derived key, a password change only re-seals
//! `encrypted_content`; wrapped collection keys and outstanding
//! invitations stay valid. The server sees the salt, two public keys,
//! and ciphertext; it never sees the password, either root key, or the
//! identity secret.

use rand::RngCore;
use secrecy::SecretString;
use tracing::info;
use zeroize::Zeroize;

use satchel_core::{
    from_base64, to_base64, AccountData, Error, Result, UserProfile, CURRENT_VERSION,
};
use satchel_crypto::{
    derive_key, AsymmetricCryptoManager, CryptoManager, KdfParams, MasterKey, KEY_SIZE, SALT_SIZE,
    SECRET_KEY_SIZE, SIGNATURE_SIZE,
};

/// Plaintext layout of `encrypted_content`: account key then identity
/// secret key.
const CONTENT_SIZE: usize = KEY_SIZE + SECRET_KEY_SIZE;

/// A logged-in account: both root keys, the identity keypair, and the
/// profile as published to the server.
pub struct Account {
    user: UserProfile,
    master_key: MasterKey,
    account_key: MasterKey,
    identity: AsymmetricCryptoManager,
    version: u8,
    server_url: String,
}

impl Account {
    /// Prepare all signup key material offline.
    ///
    /// The resulting [`UserProfile`] (see [`Account::profile`]) is what
    /// gets published; everything else stays on the device.
    pub fn signup(
        username: &str,
        email: Option<&str>,
        password: &SecretString,
        server_url: &str,
        params: &KdfParams,
    ) -> Result<Self> {
        let mut salt = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut salt);

        let master_key = derive_key(password, &salt, params)?;
        let password_cm = CryptoManager::main(&master_key, CURRENT_VERSION)?;
        let login = AsymmetricCryptoManager::from_seed(password_cm.asym_key_seed());

        let mut account_key_bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut account_key_bytes);
        let account_key = MasterKey::from_bytes(account_key_bytes);
        account_key_bytes.zeroize();

        let identity = AsymmetricCryptoManager::generate();
        let encrypted_content = seal_content(&password_cm, &account_key, &identity)?;

        let user = UserProfile {
            username: username.to_string(),
            email: email.map(str::to_string),
            salt: to_base64(&salt),
            login_pubkey: to_base64(&login.pubkey()),
            pubkey: to_base64(&identity.pubkey()),
            encrypted_content: to_base64(&encrypted_content),
        };

        info!(username, "prepared signup key material");
        Ok(Self {
            user,
            master_key,
            account_key,
            identity,
            version: CURRENT_VERSION,
            server_url: server_url.to_string(),
        })
    }

    /// Log in against a fetched profile: re-derive the key hierarchy,
    /// sign the server's challenge, and unseal `encrypted_content`.
    pub fn login(
        user: UserProfile,
        password: &SecretString,
        challenge: &[u8],
        server_url: &str,
        params: &KdfParams,
    ) -> Result<(Self, [u8; SIGNATURE_SIZE])> {
        let salt = decode_salt(&user.salt)?;
        let master_key = derive_key(password, &salt, params)?;
        let password_cm = CryptoManager::main(&master_key, CURRENT_VERSION)?;

        let login = AsymmetricCryptoManager::from_seed(password_cm.asym_key_seed());
        if to_base64(&login.pubkey()) != user.login_pubkey {
            return Err(Error::Integrity(format!(
                "account {}: derived login key does not match profile (wrong password?)",
                user.username
            )));
        }
        let challenge_signature = login.sign_detached(challenge);

        let (account_key, identity) = unseal_content(&password_cm, &user)?;

        info!(username = %user.username, "logged in");
        Ok((
            Self {
                user,
                master_key,
                account_key,
                identity,
                version: CURRENT_VERSION,
                server_url: server_url.to_string(),
            },
            challenge_signature,
        ))
    }

    /// Derive new login and master keys from a new password and re-seal
    /// `encrypted_content`. Returns the updated profile to ship
    /// atomically; the in-memory account switches over immediately.
    ///
    /// The account key does not rotate, so wrapped collection keys and
    /// outstanding invitations are unaffected; the server is expected
    /// to invalidate login tokens.
    pub fn change_password(
        &mut self,
        new_password: &SecretString,
        params: &KdfParams,
    ) -> Result<UserProfile> {
        let salt = decode_salt(&self.user.salt)?;
        let new_master = derive_key(new_password, &salt, params)?;
        let password_cm = CryptoManager::main(&new_master, CURRENT_VERSION)?;
        let new_login = AsymmetricCryptoManager::from_seed(password_cm.asym_key_seed());

        let encrypted_content = seal_content(&password_cm, &self.account_key, &self.identity)?;

        self.master_key = new_master;
        self.user.login_pubkey = to_base64(&new_login.pubkey());
        self.user.encrypted_content = to_base64(&encrypted_content);

        info!(username = %self.user.username, "changed password");
        Ok(self.user.clone())
    }

    /// The manager that wraps per-collection keys (the `"Main    "`
    /// tree over the account key).
    pub fn main_crypto_manager(&self) -> Result<CryptoManager> {
        CryptoManager::main(&self.account_key, self.version)
    }

    /// The long-term identity keypair (signing and sharing).
    pub fn identity(&self) -> &AsymmetricCryptoManager {
        &self.identity
    }

    /// The profile as published to (or fetched from) the server.
    pub fn profile(&self) -> &UserProfile {
        &self.user
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// The fingerprint another user would compare out-of-band.
    pub fn fingerprint(&self) -> String {
        satchel_crypto::pretty_fingerprint(&self.identity.pubkey())
    }

    /// Export the session. Round-trips byte-identically through
    /// [`Account::restore`] for a given protocol version.
    pub fn save(&self) -> AccountData {
        AccountData {
            version: self.version,
            key: to_base64(self.master_key.as_bytes()),
            user: self.user.clone(),
            server_url: self.server_url.clone(),
        }
    }

    /// Import a previously saved session without the password.
    pub fn restore(data: AccountData) -> Result<Self> {
        if data.version > CURRENT_VERSION {
            return Err(Error::Version {
                found: data.version,
                supported: CURRENT_VERSION,
            });
        }

        let mut key_bytes = from_base64(&data.key)?;
        if key_bytes.len() != KEY_SIZE {
            key_bytes.zeroize();
            return Err(Error::Encoding(
                "account data: master key has wrong size".into(),
            ));
        }
        let mut raw = [0u8; KEY_SIZE];
        raw.copy_from_slice(&key_bytes);
        key_bytes.zeroize();
        let master_key = MasterKey::from_bytes(raw);
        raw.zeroize();

        let password_cm = CryptoManager::main(&master_key, data.version)?;
        let (account_key, identity) = unseal_content(&password_cm, &data.user)?;

        Ok(Self {
            user: data.user,
            master_key,
            account_key,
            identity,
            version: data.version,
            server_url: data.server_url,
        })
    }

    /// End the session, wiping both root key buffers.
    pub fn logout(mut self) {
        let username = self.user.username.clone();
        self.master_key.zeroize();
        self.account_key.zeroize();
        info!(username = %username, "logged out");
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.user.username)
            .field("version", &self.version)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

fn decode_salt(encoded: &str) -> Result<[u8; SALT_SIZE]> {
    from_base64(encoded)?
        .try_into()
        .map_err(|_| Error::Encoding("account salt has wrong size".into()))
}

/// Seal `account key ‖ identity secret key` under the password-derived
/// cipher key.
fn seal_content(
    password_cm: &CryptoManager,
    account_key: &MasterKey,
    identity: &AsymmetricCryptoManager,
) -> Result<Vec<u8>> {
    let mut content = [0u8; CONTENT_SIZE];
    content[..KEY_SIZE].copy_from_slice(account_key.as_bytes());
    content[KEY_SIZE..].copy_from_slice(&identity.secret_key());

    let sealed = password_cm.encrypt(&content, None);
    content.zeroize();
    sealed
}

/// Decrypt `encrypted_content` and check the embedded identity against
/// the published pubkey.
fn unseal_content(
    password_cm: &CryptoManager,
    user: &UserProfile,
) -> Result<(MasterKey, AsymmetricCryptoManager)> {
    let sealed = from_base64(&user.encrypted_content)?;
    let mut plaintext = password_cm.decrypt(&sealed, None).map_err(|_| {
        Error::Integrity(format!(
            "account {}: encrypted content failed authentication",
            user.username
        ))
    })?;

    if plaintext.len() != CONTENT_SIZE {
        plaintext.zeroize();
        return Err(Error::Encoding(format!(
            "account {}: content blob has wrong size",
            user.username
        )));
    }

    let mut account_key_bytes = [0u8; KEY_SIZE];
    account_key_bytes.copy_from_slice(&plaintext[..KEY_SIZE]);
    let account_key = MasterKey::from_bytes(account_key_bytes);
    account_key_bytes.zeroize();

    let mut secret_key = [0u8; SECRET_KEY_SIZE];
    secret_key.copy_from_slice(&plaintext[KEY_SIZE..]);
    plaintext.zeroize();

    let identity = AsymmetricCryptoManager::from_secret_key(&secret_key);
    secret_key.zeroize();
    let identity = identity?;

    if to_base64(&identity.pubkey()) != user.pubkey {
        return Err(Error::Integrity(format!(
            "account {}: identity pubkey does not match profile",
            user.username
        )));
    }
    Ok((account_key, identity))
}
