//! The authenticated, prefix-indexed trie collaborator (§1, §3).
//!
//! Like [`crate::feed`], the real trie — an authenticated, replicated
//! key/value structure with historical checkouts — is "assumed present"
//! and out of scope. [`Trie`] is the seam the drive core, mount resolver,
//! and content bootstrap are built against; [`memory::MemoryTrie`] is an
//! in-memory reference implementation.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::Result;

/// Reserved key under which the drive stores its header metadata (the
/// content feed's public key, per §6 "trie header block").
pub const HEADER_KEY: &str = "\u{0}header";

/// Authenticated prefix-indexed path → value mapping (§3 "Trie").
#[async_trait]
pub trait Trie: Send + Sync {
    /// Point lookup. `None` if `path` has no entry.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Unconditional insert/overwrite.
    async fn put(&self, path: &str, value: Vec<u8>) -> Result<()>;

    /// Insert only if `path` has no entry yet. Returns `true` if inserted,
    /// `false` if an entry already existed (compare-and-swap by presence,
    /// §3, used by `mkdir`/`symlink` uniqueness checks).
    async fn put_if_absent(&self, path: &str, value: Vec<u8>) -> Result<bool>;

    /// Remove `path`. Returns `true` if an entry existed.
    async fn del(&self, path: &str) -> Result<bool>;

    /// All entries whose key starts with `prefix`, in path order.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// This trie's current version. Versions start at 1 (§9 design note).
    fn version(&self) -> u64;

    /// A read-only view of this trie as of historical `version`.
    async fn checkout(&self, version: u64) -> Result<Arc<dyn Trie>>;

    /// Graft `foreign` at `path` (§4.12 "trie mount").
    async fn attach_mount(&self, path: String, foreign: Arc<dyn Trie>);

    /// Direct mount attachments on this trie, most specific first.
    fn mounts(&self) -> Vec<(String, Arc<dyn Trie>)>;

    /// Subscribe to path changes under `prefix` (§4.14). No deduplication.
    fn watch(&self, prefix: &str) -> broadcast::Receiver<String>;
}

/// Convenience extension for the header-metadata access pattern (§4.1,
/// §4.2): the content feed's public key lives under [`HEADER_KEY`] like
/// any other trie value.
#[async_trait]
pub trait TrieHeaderExt {
    async fn header_metadata(&self) -> Result<Option<Vec<u8>>>;
    async fn set_header_metadata(&self, bytes: Vec<u8>) -> Result<()>;
}

#[async_trait]
impl TrieHeaderExt for dyn Trie {
    async fn header_metadata(&self) -> Result<Option<Vec<u8>>> {
        self.get(HEADER_KEY).await
    }

    async fn set_header_metadata(&self, bytes: Vec<u8>) -> Result<()> {
        self.put(HEADER_KEY, bytes).await
    }
}

pub mod memory {
    use super::*;
    use crate::error::Error;
    use std::collections::BTreeMap;
    use tokio::sync::RwLock;

    type Snapshot = Arc<BTreeMap<String, Vec<u8>>>;

    struct Shared {
        versions: RwLock<Vec<Snapshot>>,
        mounts: RwLock<Vec<(String, Arc<dyn Trie>)>>,
        changes: broadcast::Sender<String>,
    }

    /// A live, mutable, versioned in-memory trie.
    pub struct MemoryTrie {
        shared: Arc<Shared>,
    }

    impl Default for MemoryTrie {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryTrie {
        /// A fresh trie at version 1, with no entries.
        pub fn new() -> Self {
            let (changes, _rx) = broadcast::channel(256);
            Self {
                shared: Arc::new(Shared {
                    versions: RwLock::new(vec![Arc::new(BTreeMap::new())]),
                    mounts: RwLock::new(Vec::new()),
                    changes,
                }),
            }
        }

        async fn current(&self) -> Snapshot {
            self.shared.versions.read().await.last().cloned().expect("at least one version")
        }

        async fn push_version(&self, next: BTreeMap<String, Vec<u8>>) {
            self.shared.versions.write().await.push(Arc::new(next));
        }

        fn notify(&self, path: &str) {
            let _ = self.shared.changes.send(path.to_string());
        }
    }

    #[async_trait]
    impl Trie for MemoryTrie {
        async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.current().await.get(path).cloned())
        }

        async fn put(&self, path: &str, value: Vec<u8>) -> Result<()> {
            let mut next = (*self.current().await).clone();
            next.insert(path.to_string(), value);
            self.push_version(next).await;
            self.notify(path);
            Ok(())
        }

        async fn put_if_absent(&self, path: &str, value: Vec<u8>) -> Result<bool> {
            let current = self.current().await;
            if current.contains_key(path) {
                return Ok(false);
            }
            let mut next = (*current).clone();
            next.insert(path.to_string(), value);
            self.push_version(next).await;
            self.notify(path);
            Ok(true)
        }

        async fn del(&self, path: &str) -> Result<bool> {
            let current = self.current().await;
            if !current.contains_key(path) {
                return Ok(false);
            }
            let mut next = (*current).clone();
            next.remove(path);
            self.push_version(next).await;
            self.notify(path);
            Ok(true)
        }

        async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
            let current = self.current().await;
            Ok(current
                .range(prefix.to_string()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        }

        fn version(&self) -> u64 {
            // version() is synchronous per the Trie contract; approximate
            // via try_read, which never contends in practice since writers
            // hold the lock only across a single clone-and-push.
            self.shared
                .versions
                .try_read()
                .map(|v| v.len() as u64)
                .unwrap_or(0)
        }

        async fn checkout(&self, version: u64) -> Result<Arc<dyn Trie>> {
            let versions = self.shared.versions.read().await;
            let idx = version.checked_sub(1).ok_or_else(|| {
                Error::BackendError("version 0 does not exist".into())
            })?;
            let snapshot = versions
                .get(idx as usize)
                .cloned()
                .ok_or_else(|| Error::BackendError(format!("no such version {version}")))?;
            let mounts = self.shared.mounts.read().await.clone();
            Ok(Arc::new(Checkout { snapshot, version, mounts }))
        }

        async fn attach_mount(&self, path: String, foreign: Arc<dyn Trie>) {
            let mut mounts = self.shared.mounts.write().await;
            mounts.retain(|(p, _)| p != &path);
            mounts.push((path.clone(), foreign));
            mounts.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
            drop(mounts);
            self.notify(&path);
        }

        fn mounts(&self) -> Vec<(String, Arc<dyn Trie>)> {
            self.shared.mounts.try_read().map(|m| m.clone()).unwrap_or_default()
        }

        fn watch(&self, prefix: &str) -> broadcast::Receiver<String> {
            let _ = prefix;
            self.shared.changes.subscribe()
        }
    }

    impl Clone for MemoryTrie {
        fn clone(&self) -> Self {
            Self { shared: self.shared.clone() }
        }
    }

    /// A read-only view of a [`MemoryTrie`] pinned to one historical
    /// version (§4.13).
    struct Checkout {
        snapshot: Snapshot,
        version: u64,
        mounts: Vec<(String, Arc<dyn Trie>)>,
    }

    #[async_trait]
    impl Trie for Checkout {
        async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.snapshot.get(path).cloned())
        }

        async fn put(&self, _path: &str, _value: Vec<u8>) -> Result<()> {
            Err(Error::BackendError("checkout is read-only".into()))
        }

        async fn put_if_absent(&self, _path: &str, _value: Vec<u8>) -> Result<bool> {
            Err(Error::BackendError("checkout is read-only".into()))
        }

        async fn del(&self, _path: &str) -> Result<bool> {
            Err(Error::BackendError("checkout is read-only".into()))
        }

        async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
            Ok(self
                .snapshot
                .range(prefix.to_string()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        }

        fn version(&self) -> u64 {
            self.version
        }

        async fn checkout(&self, version: u64) -> Result<Arc<dyn Trie>> {
            if version == self.version {
                return Ok(Arc::new(Checkout {
                    snapshot: self.snapshot.clone(),
                    version: self.version,
                    mounts: self.mounts.clone(),
                }));
            }
            Err(Error::BackendError("checkout of a checkout at a different version".into()))
        }

        async fn attach_mount(&self, _path: String, _foreign: Arc<dyn Trie>) {}

        fn mounts(&self) -> Vec<(String, Arc<dyn Trie>)> {
            self.mounts.clone()
        }

        fn watch(&self, _prefix: &str) -> broadcast::Receiver<String> {
            let (tx, rx) = broadcast::channel(1);
            std::mem::forget(tx);
            rx
        }
    }

}
