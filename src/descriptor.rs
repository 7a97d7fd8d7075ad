//! Per-open-file descriptor state and read/write primitives (§2 item 3,
//! §4.6).

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::content::{ContentLock, ContentState};
use crate::error::{Error, Result};
use crate::stat::{self, FileStat, Owner, Stat, Time};
use crate::trie::Trie;

/// Intent a descriptor was opened with. Mirrors the POSIX `O_RDONLY` /
/// `O_WRONLY` / `O_CREAT` / `O_TRUNC` flags just enough for this crate's
/// needs (§4.5); there is no read/write combined mode since §1's
/// Non-goals rule out concurrent-writer consistency concerns a combined
/// mode would raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub write: bool,
    pub create: bool,
    pub truncate: bool,
}

impl OpenFlags {
    pub fn read_only() -> Self {
        Self { write: false, create: false, truncate: false }
    }

    pub fn write_only(create: bool, truncate: bool) -> Self {
        Self { write: true, create, truncate }
    }
}

struct State {
    stat: FileStat,
    position: u64,
}

/// Per-open-file state: current position, the stat snapshot being read or
/// extended, and (for writers) the content-feed lock held for the
/// descriptor's entire lifetime (§3 "Descriptor" lifecycle).
pub struct FileDescriptor {
    path: String,
    flags: OpenFlags,
    trie: Arc<dyn Trie>,
    content: Arc<ContentState>,
    state: Mutex<State>,
    write_lock: Option<ContentLock>,
}

impl FileDescriptor {
    /// Open a descriptor over an existing file stat for reading.
    pub fn open_read(path: String, trie: Arc<dyn Trie>, content: Arc<ContentState>, stat: FileStat) -> Self {
        Self {
            path,
            flags: OpenFlags::read_only(),
            trie,
            content,
            state: Mutex::new(State { stat, position: 0 }),
            write_lock: None,
        }
    }

    /// Open a descriptor for writing, starting a fresh append range at
    /// the content feed's current end (§4.6: "writes are legal only when
    /// the descriptor holds the content-feed lock and the file being
    /// written is the most recent append"). Acquires the feed lock for
    /// the descriptor's whole lifetime.
    pub async fn open_write(
        path: String,
        trie: Arc<dyn Trie>,
        content: Arc<ContentState>,
        owner: Owner,
        flags: OpenFlags,
    ) -> Self {
        let write_lock = content.acquire().await;
        let feed = content.feed();
        let now = Time::now();
        let stat = FileStat {
            owner,
            size: 0,
            blocks: 0,
            offset: feed.length(),
            byte_offset: feed.byte_length(),
            mtime: now,
            ctime: now,
            mount: None,
        };
        Self {
            path,
            flags,
            trie,
            content,
            state: Mutex::new(State { stat, position: 0 }),
            write_lock: Some(write_lock),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current stat snapshot (used to substitute an in-flight writer's
    /// size into `lstat`, §4.4 step 5).
    pub async fn stat(&self) -> FileStat {
        self.state.lock().await.stat.clone()
    }

    /// Read up to `length` bytes starting at `pos`, or the descriptor's
    /// cursor if `pos` is `None` (in which case the cursor advances by the
    /// number of bytes actually read).
    ///
    /// Short reads at EOF return the truncated count; reads starting at
    /// or past EOF return an empty buffer (§4.6).
    pub async fn read(&self, length: usize, pos: Option<u64>) -> Result<Vec<u8>> {
        let mut state = self.state.lock().await;
        let effective_pos = pos.unwrap_or(state.position);
        if effective_pos >= state.stat.size {
            return Ok(Vec::new());
        }
        let to_read = (length as u64).min(state.stat.size - effective_pos);
        let absolute = state.stat.byte_offset + effective_pos;
        let data = self.content.feed().read_range(absolute, to_read).await?;
        if pos.is_none() {
            state.position = effective_pos + data.len() as u64;
        }
        Ok(data)
    }

    /// Append `data` as one new content-feed block, recompute
    /// `size`/`blocks`, and commit the updated stat to the trie (§4.6).
    pub async fn write(&self, data: &[u8]) -> Result<usize> {
        if !self.flags.write {
            return Err(Error::BackendError("descriptor not opened for writing".into()));
        }
        let mut state = self.state.lock().await;
        let feed = self.content.feed();
        feed.append(data.to_vec()).await?;

        state.stat.size = feed.byte_length() - state.stat.byte_offset;
        state.stat.blocks = feed.length() - state.stat.offset;
        state.stat.mtime = Time::now();
        self.trie.put(&self.path, stat::encode(&Stat::File(state.stat.clone()))).await?;
        state.position += data.len() as u64;
        Ok(data.len())
    }

    /// Current cursor position.
    pub async fn position(&self) -> u64 {
        self.state.lock().await.position
    }
}
