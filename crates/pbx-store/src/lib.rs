//! Filesystem-backed mailbox storage for Postbox.
//!
//! A [`Store`] is rooted at a directory that every participating process can
//! reach. Parties exchange payloads through it without any server: the
//! filesystem provides atomicity (rename, exclusive link) and access control
//! (permission bits).
//!
//! # Layout
//!
//! ```text
//! {root}/{name}                                       local object       0600
//! {root}/public/{id}/{name}                           public object      0644 (dirs 0755)
//! {root}/private/{id}/{name}                          private object     0600 (dirs 0700)
//! {root}/private/{id}/{incoming|outgoing}/{queue}/    pop-once queue     0600 (dirs 0700)
//! ```
//!
//! # Operations
//!
//! - Objects -- `write_local`/`read_local`, `send_*`/`get_*` addressed to any
//!   party, `store_*`/`load_*` addressed to the store's own identity.
//! - Queues -- `push`, `pop`, `size` and their incoming/outgoing shorthands.
//!   Pops return entries oldest first and hand each entry to at most one
//!   caller, across threads and processes.
//!
//! # Design Rules
//!
//! 1. Every caller-supplied name is checked before it touches a path.
//! 2. Writes are staged in hidden files and published with one rename.
//! 3. Permission bits are set explicitly, never left to the umask.
//! 4. Failures are returned to the caller, never logged and dropped.

mod disk;
pub mod error;
pub mod object;
pub mod paths;
pub mod queue;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use paths::{PathResolver, CLAIMED_DIR};
pub use store::Store;

// Re-export the vocabulary types so callers need only this crate.
pub use pbx_types::{
    Direction, EntryToken, PartyId, SequentialTokens, TokenSource, TypeError, UuidV7Tokens, Visibility,
};
