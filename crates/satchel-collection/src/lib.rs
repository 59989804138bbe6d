//! satchel-collection: encrypted collections, items, and sharing
//!
//! A collection is a long-lived identity (random alphanumeric uid)
//! carrying a wrapped symmetric key and a current [`Revision`]. Items
//! hang off a parent collection the same way. Every mutation replaces
//! the current revision with a freshly created one whose uid is the
//! MAC of its content — identity and integrity tag in one.
//!
//! Sharing wraps a collection key to a recipient's public identity via
//! [`SignedInvitation`]; the recipient re-wraps it under their own
//! account key on accept.

pub mod collection;
pub mod invitation;
pub mod item;
pub mod revision;

pub use collection::{Collection, CollectionMeta};
pub use invitation::SignedInvitation;
pub use item::{Item, ItemMeta};
pub use revision::{Chunk, Revision};
