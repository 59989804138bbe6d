//! satchel-account: the account root of the key hierarchy
//!
//! The password never leaves the device: Argon2id turns it into the
//! master key, the KDF tree carves out the account's cipher/MAC keys
//! and the login keypair, and the long-term identity keypair travels
//! only inside an AEAD blob the server cannot open. Login is
//! challenge-response against the derived login key.

pub mod account;

pub use account::Account;
