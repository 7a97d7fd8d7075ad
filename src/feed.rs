//! The append-only block feed collaborator (§1, §3).
//!
//! The real implementation — a cryptographically verified, replicated
//! append-only log — is "assumed present" per spec.md and out of this
//! crate's scope. [`Feed`] is the seam the drive core is built against;
//! [`memory::MemoryFeed`] is a process-local implementation good enough to
//! run the drive standalone, the way the teacher's `Vfs` trait ships
//! alongside `InMemoryVfs`/`ShadowFS`.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, Result};
use crate::keys::{KeyPair, PublicKey};

/// Opaque duplex byte stream used by [`Feed::replicate`]. The actual peer
/// transport is out of scope; this is just the seam a real implementation
/// would plug a network connection into.
pub type ReplicationStream = std::pin::Pin<Box<dyn ReplicationDuplex>>;

/// Marker trait tying together the read/write halves a replication
/// transport needs.
pub trait ReplicationDuplex: AsyncRead + AsyncWrite + Send {}
impl<T: AsyncRead + AsyncWrite + Send + ?Sized> ReplicationDuplex for T {}

/// An append-only, block-addressed byte log.
///
/// Block `i` is immutable once [`Feed::append`] returns; `length` is the
/// number of blocks, `byte_length` the sum of their sizes.
#[async_trait]
pub trait Feed: Send + Sync {
    /// Number of blocks currently in the feed.
    fn length(&self) -> u64;

    /// Sum of the byte lengths of every block in the feed.
    fn byte_length(&self) -> u64;

    /// `true` iff this handle can append (i.e. was opened with the secret).
    fn is_writable(&self) -> bool;

    /// This feed's public key.
    fn public_key(&self) -> PublicKey;

    /// Append one block, returning its index.
    ///
    /// Fails with [`Error::BackendError`] if this handle is not writable.
    async fn append(&self, block: Vec<u8>) -> Result<u64>;

    /// Read block `index` verbatim.
    async fn get(&self, index: u64) -> Result<Vec<u8>>;

    /// Read `len` bytes starting at absolute byte offset `offset`, which
    /// may span multiple blocks.
    ///
    /// Short reads at EOF return fewer bytes than requested; a read
    /// starting at or past `byte_length()` returns an empty buffer.
    async fn read_range(&self, offset: u64, len: u64) -> Result<Vec<u8>>;

    /// Resolve once the feed has at least `at_least` blocks.
    ///
    /// Used by read-only content-state acquisition (§4.2) to wait for
    /// block 0 before trusting `length`/`byte_length`.
    async fn wait_for_length(&self, at_least: u64) -> Result<()>;

    /// Hand this feed to the storage backend's peer replication transport.
    /// Out of scope collaborator; the in-memory feed has no peers to
    /// replicate with.
    async fn replicate(&self, stream: ReplicationStream) -> Result<()>;

    /// Release any resources this handle holds (§4.5 "closing the drive
    /// with no argument closes all feeds through the backend").
    async fn close(&self) -> Result<()>;
}

/// Seam onto the storage backend that actually owns feed bytes (§1
/// "the storage backend for feed persistence" — assumed present).
///
/// [`crate::bootstrap`] calls this to obtain the metadata and content
/// feeds during bring-up (§4.1, §4.2) instead of constructing
/// [`memory::MemoryFeed`] directly, so a disk-backed or networked
/// implementation can be swapped in behind the trait.
#[async_trait]
pub trait FeedFactory: Send + Sync {
    /// Returns a handle to the feed for `keypair`'s public key: a brand
    /// new empty feed if this public key has never been opened through
    /// this factory, or a handle onto the existing one otherwise. The
    /// handle is writable iff `keypair` carries a secret.
    async fn open(&self, keypair: &KeyPair) -> Result<std::sync::Arc<dyn Feed>>;
}

pub mod memory {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::{watch, RwLock};

    #[derive(Default)]
    struct State {
        blocks: Vec<Vec<u8>>,
    }

    /// A process-local, in-memory [`Feed`].
    ///
    /// Two handles constructed from [`MemoryFeed::fork_readonly`] or
    /// cloned share the same underlying blocks, so a writer and readers
    /// observe the same append-only log the way two peers would via
    /// replication.
    pub struct MemoryFeed {
        public: PublicKey,
        writable: bool,
        state: Arc<RwLock<State>>,
        byte_length: Arc<AtomicU64>,
        length_tx: Arc<watch::Sender<u64>>,
    }

    impl MemoryFeed {
        /// Create a brand new, empty, writable feed for `keypair`.
        pub fn create(keypair: &KeyPair) -> Self {
            let (length_tx, _rx) = watch::channel(0);
            Self {
                public: keypair.public,
                writable: keypair.is_writable(),
                state: Arc::new(RwLock::new(State::default())),
                byte_length: Arc::new(AtomicU64::new(0)),
                length_tx: Arc::new(length_tx),
            }
        }

        /// A handle onto the same underlying blocks with `writable` set
        /// as requested, sharing state with every other handle derived
        /// from the same feed.
        pub fn handle(&self, writable: bool) -> Self {
            Self {
                public: self.public,
                writable,
                state: self.state.clone(),
                byte_length: self.byte_length.clone(),
                length_tx: self.length_tx.clone(),
            }
        }

        /// Derive a read-only handle onto the same underlying blocks.
        pub fn fork_readonly(&self) -> Self {
            self.handle(false)
        }
    }

    #[async_trait]
    impl Feed for MemoryFeed {
        fn length(&self) -> u64 {
            *self.length_tx.borrow()
        }

        fn byte_length(&self) -> u64 {
            self.byte_length.load(Ordering::Acquire)
        }

        fn is_writable(&self) -> bool {
            self.writable
        }

        fn public_key(&self) -> PublicKey {
            self.public
        }

        async fn append(&self, block: Vec<u8>) -> Result<u64> {
            if !self.writable {
                return Err(Error::BackendError("feed is not writable".into()));
            }
            let mut state = self.state.write().await;
            let index = state.blocks.len() as u64;
            self.byte_length.fetch_add(block.len() as u64, Ordering::AcqRel);
            state.blocks.push(block);
            self.length_tx.send_replace(state.blocks.len() as u64);
            Ok(index)
        }

        async fn get(&self, index: u64) -> Result<Vec<u8>> {
            let state = self.state.read().await;
            state
                .blocks
                .get(index as usize)
                .cloned()
                .ok_or_else(|| Error::BackendError(format!("block {index} out of range")))
        }

        async fn read_range(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
            let state = self.state.read().await;
            let byte_length = self.byte_length();
            if offset >= byte_length || len == 0 {
                return Ok(Vec::new());
            }
            let end = offset.saturating_add(len).min(byte_length);
            let mut out = Vec::with_capacity((end - offset) as usize);
            let mut cursor = 0u64;
            for block in &state.blocks {
                let block_start = cursor;
                let block_end = cursor + block.len() as u64;
                if block_end > offset && block_start < end {
                    let lo = offset.max(block_start) - block_start;
                    let hi = end.min(block_end) - block_start;
                    out.extend_from_slice(&block[lo as usize..hi as usize]);
                }
                cursor = block_end;
                if cursor >= end {
                    break;
                }
            }
            Ok(out)
        }

        async fn wait_for_length(&self, at_least: u64) -> Result<()> {
            let mut rx = self.length_tx.subscribe();
            loop {
                if *rx.borrow() >= at_least {
                    return Ok(());
                }
                rx.changed()
                    .await
                    .map_err(|_| Error::BackendError("feed closed before ready".into()))?;
            }
        }

        async fn replicate(&self, _stream: ReplicationStream) -> Result<()> {
            Err(Error::BackendError("in-memory feed has no peers to replicate with".into()))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    /// In-process [`FeedFactory`]: the first `open` for a public key
    /// creates the feed, every later `open` for the same key reconnects
    /// to it. Good enough to exercise bring-up/restore (§4.1) within one
    /// process; real peer discovery and persistence are out of scope.
    #[derive(Default)]
    pub struct MemoryFeedFactory {
        registry: tokio::sync::Mutex<std::collections::HashMap<PublicKey, MemoryFeed>>,
    }

    impl MemoryFeedFactory {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl FeedFactory for MemoryFeedFactory {
        async fn open(&self, keypair: &KeyPair) -> Result<std::sync::Arc<dyn Feed>> {
            let mut registry = self.registry.lock().await;
            if let Some(existing) = registry.get(&keypair.public) {
                return Ok(std::sync::Arc::new(existing.handle(keypair.is_writable())));
            }
            let feed = MemoryFeed::create(keypair);
            let handle = feed.handle(keypair.is_writable());
            registry.insert(keypair.public, feed);
            Ok(std::sync::Arc::new(handle))
        }
    }

}
