//! Streaming read/write sessions (§4.7, §4.8).

use std::sync::Arc;

use crate::content::{ContentLock, ContentState};
use crate::error::Result;
use crate::events::{Event, Events};
use crate::feed::Feed;
use crate::stat::{FileStat, Owner, Stat, Time};
use crate::trie::Trie;

/// Default read-ahead watermark (§4.7).
pub const DEFAULT_HIGH_WATER_MARK: usize = 64 * 1024;

/// Byte-range options for [`crate::drive::Drive::create_read_stream`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadStreamOpts {
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub length: Option<u64>,
}

/// A bounded byte-range read session over a content feed (§4.7).
///
/// Plain chunked `async fn`s rather than a hand-rolled `AsyncRead`: the
/// only consumer that needs raw bytes is [`crate::drive::Drive::read_file`],
/// which just drains every chunk.
pub struct ReadStream {
    pub(crate) feed: Arc<dyn Feed>,
    pub(crate) base_offset: u64,
    pub(crate) remaining: u64,
    pub(crate) position: u64,
}

impl ReadStream {
    /// Read up to `max` bytes, or `None` once the range is exhausted.
    pub async fn read_chunk(&mut self, max: usize) -> Result<Option<Vec<u8>>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let take = (max as u64).min(self.remaining);
        let data = self.feed.read_range(self.base_offset + self.position, take).await?;
        if data.is_empty() {
            self.remaining = 0;
            return Ok(None);
        }
        self.position += data.len() as u64;
        self.remaining -= data.len() as u64;
        Ok(Some(data))
    }

    /// Drain the whole range into one buffer (`readFile`, §4.9).
    pub async fn collect(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.read_chunk(DEFAULT_HIGH_WATER_MARK).await? {
            out.extend(chunk);
        }
        Ok(out)
    }
}

/// A content-feed append session backing one file (§4.8).
///
/// Acquiring the [`ContentLock`] and snapshotting `offset`/`byte_offset`
/// happens once, at construction (`begin`), matching steps 2-4 of §4.8 in
/// order: lock, snapshot, `appending` event. Dropping the stream without
/// calling [`WriteStream::finish`] releases the lock via
/// [`ContentLock`]'s `Drop` without rolling back any bytes already
/// appended (§4.8 failure note, §9).
pub struct WriteStream {
    events: Events,
    name: String,
    trie: Arc<dyn Trie>,
    content: Arc<ContentState>,
    _lock: ContentLock,
    owner: Owner,
    offset: u64,
    byte_offset: u64,
}

impl WriteStream {
    pub(crate) async fn begin(
        events: Events,
        name: String,
        trie: Arc<dyn Trie>,
        content: Arc<ContentState>,
        owner: Owner,
    ) -> Self {
        let lock = content.acquire().await;
        let feed = content.feed();
        let offset = feed.length();
        let byte_offset = feed.byte_length();
        events.emit(Event::Appending { name: name.clone() });
        Self { events, name, trie, content, _lock: lock, owner, offset, byte_offset }
    }

    /// Append one chunk to the content feed.
    pub async fn write_chunk(&self, data: &[u8]) -> Result<()> {
        self.content.feed().append(data.to_vec()).await?;
        Ok(())
    }

    /// Compose and commit the final file stat, and emit `append` (§4.8
    /// step 6).
    pub async fn finish(self) -> Result<FileStat> {
        let feed = self.content.feed();
        let now = Time::now();
        let stat = FileStat {
            owner: self.owner,
            size: feed.byte_length() - self.byte_offset,
            blocks: feed.length() - self.offset,
            offset: self.offset,
            byte_offset: self.byte_offset,
            mtime: now,
            ctime: now,
            mount: None,
        };
        self.trie.put(&self.name, crate::stat::encode(&Stat::File(stat.clone()))).await?;
        self.events.emit(Event::Append { name: self.name });
        Ok(stat)
    }
}
