//! Hyperdrive - the core of a peer-to-peer versioned filesystem layered
//! on two append-only feeds: a metadata trie of filesystem entries and a
//! content feed of file payloads.

pub mod bootstrap;
pub mod content;
pub mod descriptor;
pub mod drive;
pub mod error;
pub mod events;
pub mod feed;
pub mod keys;
pub mod mount;
pub mod path;
pub mod stat;
pub mod stream;
pub mod trie;

pub use drive::{Drive, MountOptions, STDIO_CAP};
pub use error::{Error, Result};
pub use events::Event;
pub use keys::{KeyPair, PublicKey, SecretKey};
