//! Foundation types for Postbox.
//!
//! Postbox lets identified parties exchange opaque payloads through a shared
//! directory tree. This crate holds the small vocabulary every other Postbox
//! crate speaks.
//!
//! # Key Types
//!
//! - [`PartyId`] -- Filename-safe identifier of a party (mailbox owner)
//! - [`Direction`] -- Incoming or outgoing side of a party's queues
//! - [`Visibility`] -- Local, public, or private storage tier
//! - [`EntryToken`] -- Time-ordered name of a single queue entry
//! - [`TokenSource`] -- Injectable generator of entry tokens

pub mod error;
pub mod names;
pub mod party;
pub mod route;
pub mod token;

pub use error::TypeError;
pub use names::validate_component;
pub use party::PartyId;
pub use route::{Direction, Visibility};
pub use token::{EntryToken, SequentialTokens, TokenSource, UuidV7Tokens};
