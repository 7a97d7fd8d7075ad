//! Per-trie content feed handle with its append-serialization lock (§3
//! "ContentState", §5).

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::feed::Feed;

/// Owns one content feed and the FIFO lock that serializes append
/// sessions on it.
///
/// The lock is held for the entire duration of a write stream or
/// descriptor write session (§3, §5); releasing it is handled by
/// [`ContentLock`]'s `Drop` impl so destroying a stream mid-write always
/// frees the lock (§9 "scoped guard").
pub struct ContentState {
    feed: Arc<dyn Feed>,
    lock: Arc<Mutex<()>>,
}

impl ContentState {
    pub fn new(feed: Arc<dyn Feed>) -> Self {
        Self { feed, lock: Arc::new(Mutex::new(())) }
    }

    /// The content feed this state wraps.
    pub fn feed(&self) -> &Arc<dyn Feed> {
        &self.feed
    }

    /// Acquire the FIFO append lock. Waits if another session is in
    /// flight; callers queue in arrival order (§5 "ordered by acquisition
    /// order on the shared content-feed lock").
    pub async fn acquire(&self) -> ContentLock {
        let guard = self.lock.clone().lock_owned().await;
        tracing::debug!(public_key = ?self.feed.public_key(), "content lock acquired");
        ContentLock { _guard: guard }
    }
}

/// RAII guard over the content-feed append lock. Dropping it — whether by
/// falling out of scope normally or because a write stream was destroyed
/// mid-write — releases the lock unconditionally.
pub struct ContentLock {
    _guard: OwnedMutexGuard<()>,
}

impl Drop for ContentLock {
    fn drop(&mut self) {
        tracing::debug!("content lock released");
    }
}
