//! The drive core (§2 item 4, §4): two-feed bring-up, path resolution,
//! the descriptor table, and every POSIX-like operation built on top of
//! them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, OnceCell};

use crate::bootstrap::{self, ContentPlan};
use crate::content::ContentState;
use crate::descriptor::{FileDescriptor, OpenFlags};
use crate::error::{Error, Result};
use crate::events::{Event, Events};
use crate::feed::{Feed, FeedFactory, ReplicationStream};
use crate::keys::{KeyPair, PublicKey};
use crate::mount;
use crate::path;
use crate::stat::{self, DirectoryStat, FileStat, Mount, Owner, Stat, SymlinkStat, Time};
use crate::stream::{ReadStream, ReadStreamOpts, WriteStream};
use crate::trie::Trie;

/// File descriptors are numbered starting here so they never collide
/// with the standard streams (§6).
pub const STDIO_CAP: u64 = 20;

/// Options accepted by [`Drive::mount`] (§4.12).
#[derive(Default)]
pub struct MountOptions {
    /// `true` to mount a raw content feed rather than a foreign trie.
    pub hypercore: bool,
    pub version: Option<u64>,
    pub hash: Option<Vec<u8>>,
    /// The already-opened foreign trie to graft, required unless
    /// `hypercore` is set. Obtaining a trie handle for an arbitrary
    /// public key is an external collaborator capability (a trie
    /// "open-by-key" factory, analogous to [`FeedFactory`] for feeds)
    /// that spec.md does not define, so the caller supplies it directly.
    pub trie: Option<Arc<dyn Trie>>,
}

fn trie_identity(trie: &Arc<dyn Trie>) -> usize {
    Arc::as_ptr(trie) as *const () as usize
}

/// The Hyperdrive object: owns the metadata feed, the root trie, a
/// per-trie content-state cache, the open descriptor table, and the
/// in-flight writer map (§3 "Drive").
pub struct Drive {
    metadata_keypair: KeyPair,
    metadata_feed: Arc<dyn Feed>,
    trie: Arc<dyn Trie>,
    feeds: Arc<dyn FeedFactory>,
    ready: OnceCell<()>,
    root_content: Mutex<Option<Arc<ContentState>>>,
    // Keyed by the mounted trie's `Arc` data pointer rather than a
    // cryptographic identity: the `Trie` trait (§1) has no public-key
    // concept of its own to hash on, since that lives inside whatever
    // backs a real implementation. Pointer identity is exact as long as
    // the same `Arc<dyn Trie>` handle is reused across mount lookups,
    // which `mount::resolve` guarantees (§4.2).
    content_cache: moka::sync::Cache<usize, Arc<ContentState>>,
    descriptors: Mutex<Vec<Option<Arc<FileDescriptor>>>>,
    writing: Mutex<HashMap<String, Arc<FileDescriptor>>>,
    events: Events,
}

impl Drive {
    /// Open (creating if necessary) the drive for `metadata_keypair`,
    /// backed by `trie` and using `feeds` to acquire feed handles (§4.1).
    ///
    /// `trie` is supplied by the caller rather than constructed here:
    /// the trie is itself a persisted collaborator (assumed present per
    /// §1), so reopening the same drive means passing the same trie
    /// handle back in, the way a real backend would reconstruct it from
    /// storage.
    pub async fn open(metadata_keypair: KeyPair, trie: Arc<dyn Trie>, feeds: Arc<dyn FeedFactory>) -> Result<Arc<Drive>> {
        let metadata_feed = feeds.open(&metadata_keypair).await?;
        let drive = Arc::new(Drive {
            metadata_keypair,
            metadata_feed,
            trie,
            feeds,
            ready: OnceCell::new(),
            root_content: Mutex::new(None),
            content_cache: moka::sync::Cache::new(64),
            descriptors: Mutex::new(Vec::new()),
            writing: Mutex::new(HashMap::new()),
            events: Events::new(),
        });
        drive.ready().await?;
        Ok(drive)
    }

    /// Drive bring-up (§4.1), memoized: the first caller runs it, later
    /// callers join the cached result.
    pub async fn ready(&self) -> Result<()> {
        let outcome = self
            .ready
            .get_or_try_init(|| async {
                match bootstrap::bring_up(&self.metadata_keypair, &self.metadata_feed, &self.trie, &self.feeds).await {
                    Ok(ContentPlan::Eager(content)) => {
                        *self.root_content.lock().await = Some(content);
                        Ok(())
                    }
                    Ok(ContentPlan::Deferred) => Ok(()),
                    Err(e) => Err(e),
                }
            })
            .await;
        match outcome {
            Ok(_) => {
                tracing::info!(key = ?self.metadata_keypair.public, "drive ready");
                self.events.emit(Event::Ready);
                Ok(())
            }
            Err(e) => {
                tracing::error!(key = ?self.metadata_keypair.public, error = %e, "drive bring-up failed");
                self.events.emit(Event::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// This drive's metadata public key.
    pub fn key(&self) -> PublicKey {
        self.metadata_keypair.public
    }

    /// A discovery key derived from the metadata public key, suitable
    /// for peer discovery without revealing the key itself.
    pub fn discovery_key(&self) -> [u8; 32] {
        *blake3::hash(&self.metadata_keypair.public.0).as_bytes()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Delegate to the trie's watch on a subtree (§4.14). No dedup.
    pub fn watch(&self, prefix: &str) -> broadcast::Receiver<String> {
        self.trie.watch(prefix)
    }

    /// §4.2 `_getContent`, cached per trie.
    async fn content_for(&self, trie: &Arc<dyn Trie>) -> Result<Arc<ContentState>> {
        if Arc::ptr_eq(trie, &self.trie) {
            if let Some(content) = self.root_content.lock().await.clone() {
                return Ok(content);
            }
            let content = bootstrap::acquire_content_state(trie, self.metadata_keypair.secret.as_ref(), &self.feeds).await?;
            *self.root_content.lock().await = Some(content.clone());
            return Ok(content);
        }

        let key = trie_identity(trie);
        if let Some(content) = self.content_cache.get(&key) {
            return Ok(content);
        }
        let content = bootstrap::acquire_content_state(trie, None, &self.feeds).await?;
        self.content_cache.insert(key, content.clone());
        Ok(content)
    }

    /// The trie that actually owns `path`, crossing mount boundaries.
    pub fn owning_trie(&self, path: &str) -> Arc<dyn Trie> {
        mount::resolve(self.trie.clone(), &path::normalize(path)).trie
    }

    /// `lstat` (§4.4): follows no symlinks, synthesizes directory stats
    /// from trie prefixes, and substitutes an in-flight writer's size.
    pub async fn lstat(&self, name: &str) -> Result<Stat> {
        self.ready().await?;
        let norm = path::normalize(name);
        let resolved = mount::resolve(self.trie.clone(), &norm);

        if let Some(blob) = resolved.trie.get(&resolved.path).await? {
            let mut decoded = stat::decode(&blob)?;
            if let Stat::File(ref mut file) = decoded {
                if let Some(descriptor) = self.writing.lock().await.get(&norm).cloned() {
                    let live = descriptor.stat().await;
                    file.size = live.size;
                    file.blocks = live.blocks;
                }
            }
            return Ok(decoded);
        }

        let prefix = path::child_prefix(&resolved.path);
        let has_children = !resolved.trie.list(&prefix).await?.is_empty();
        if path::is_root(&resolved.path) || has_children {
            return Ok(Stat::Directory(DirectoryStat {
                owner: Owner::default(),
                mtime: Time::default(),
                ctime: Time::default(),
                mount: None,
            }));
        }
        Err(Error::FileNotFound)
    }

    /// `stat` (§4.4): follows exactly one level of symlink.
    pub async fn stat(&self, name: &str) -> Result<Stat> {
        let resolved = self.lstat(name).await?;
        if let Stat::Symlink(symlink) = &resolved {
            return self.lstat(&symlink.linkname).await;
        }
        Ok(resolved)
    }

    /// `mkdir` (§4.9): conditional put, fails `PathAlreadyExists`.
    pub async fn mkdir(&self, name: &str) -> Result<()> {
        self.ready().await?;
        let norm = path::normalize(name);
        let resolved = mount::resolve(self.trie.clone(), &norm);
        let now = Time::now();
        let blob = stat::encode(&Stat::Directory(DirectoryStat { owner: Owner::default(), mtime: now, ctime: now, mount: None }));
        if !resolved.trie.put_if_absent(&resolved.path, blob).await? {
            return Err(Error::PathAlreadyExists);
        }
        tracing::debug!(path = %norm, "mkdir");
        self.events.emit(Event::Update);
        Ok(())
    }

    /// `unlink` (§4.9): fails `FileNotFound` if absent.
    pub async fn unlink(&self, name: &str) -> Result<()> {
        self.ready().await?;
        let norm = path::normalize(name);
        let resolved = mount::resolve(self.trie.clone(), &norm);
        if !resolved.trie.del(&resolved.path).await? {
            return Err(Error::FileNotFound);
        }
        tracing::debug!(path = %norm, "unlink");
        self.events.emit(Event::Update);
        Ok(())
    }

    /// `rmdir` (§4.9): fails `DirectoryNotEmpty` if any child exists.
    pub async fn rmdir(&self, name: &str) -> Result<()> {
        self.ready().await?;
        let norm = path::normalize(name);
        let resolved = mount::resolve(self.trie.clone(), &norm);
        let prefix = path::child_prefix(&resolved.path);
        if !resolved.trie.list(&prefix).await?.is_empty() {
            return Err(Error::DirectoryNotEmpty);
        }
        resolved.trie.del(&resolved.path).await?;
        self.events.emit(Event::Update);
        Ok(())
    }

    /// `symlink(target, linkName)` (§4.11): fails `PathAlreadyExists` if
    /// `linkName` already resolves.
    pub async fn symlink(&self, target: &str, link_name: &str) -> Result<()> {
        self.ready().await?;
        let norm = path::normalize(link_name);
        let resolved = mount::resolve(self.trie.clone(), &norm);
        let blob = stat::encode(&Stat::Symlink(SymlinkStat { owner: Owner::default(), linkname: path::normalize(target) }));
        if !resolved.trie.put_if_absent(&resolved.path, blob).await? {
            return Err(Error::PathAlreadyExists);
        }
        self.events.emit(Event::Update);
        Ok(())
    }

    /// `create` (§4.9): returns the existing file stat if one exists,
    /// otherwise puts a fresh empty one.
    pub async fn create(&self, name: &str) -> Result<FileStat> {
        self.ready().await?;
        let norm = path::normalize(name);
        match self.lstat(&norm).await {
            Ok(Stat::File(existing)) => return Ok(existing),
            Ok(_) => return Err(Error::BackendError("path exists and is not a regular file".into())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let resolved = mount::resolve(self.trie.clone(), &norm);
        let content = self.content_for(&resolved.trie).await?;
        let _lock = content.acquire().await;
        let feed = content.feed();
        let now = Time::now();
        let stat = FileStat {
            owner: Owner::default(),
            size: 0,
            blocks: 0,
            offset: feed.length(),
            byte_offset: feed.byte_length(),
            mtime: now,
            ctime: now,
            mount: None,
        };
        resolved.trie.put(&resolved.path, stat::encode(&Stat::File(stat.clone()))).await?;
        self.events.emit(Event::Update);
        Ok(stat)
    }

    /// `truncate(name, size)` (§4.9).
    pub async fn truncate(&self, name: &str, size: u64) -> Result<()> {
        self.ready().await?;
        let norm = path::normalize(name);
        let existing = match self.lstat(&norm).await {
            Ok(Stat::File(f)) => f,
            Ok(_) => return Err(Error::BackendError("path exists and is not a regular file".into())),
            Err(e) if e.is_not_found() => self.create(&norm).await?,
            Err(e) => return Err(e),
        };
        if size == existing.size {
            return Ok(());
        }

        let resolved = mount::resolve(self.trie.clone(), &norm);
        let content = self.content_for(&resolved.trie).await?;
        let head_len = size.min(existing.size);
        let mut bytes = content.feed().read_range(existing.byte_offset, head_len).await?;
        if size > existing.size {
            bytes.resize(bytes.len() + (size - existing.size) as usize, 0);
        }
        self.rewrite(&resolved.trie, &resolved.path, &content, existing.owner, &bytes).await?;
        self.events.emit(Event::Update);
        Ok(())
    }

    /// Fresh-append-range rewrite shared by `truncate`'s shrink/grow
    /// paths: takes the content lock, appends `bytes` as a brand new
    /// range, and commits the resulting stat.
    async fn rewrite(
        &self,
        trie: &Arc<dyn Trie>,
        rel_path: &str,
        content: &Arc<ContentState>,
        owner: Owner,
        bytes: &[u8],
    ) -> Result<FileStat> {
        let _lock = content.acquire().await;
        let feed = content.feed();
        let offset = feed.length();
        let byte_offset = feed.byte_length();
        if !bytes.is_empty() {
            feed.append(bytes.to_vec()).await?;
        }
        let now = Time::now();
        let stat = FileStat {
            owner,
            size: feed.byte_length() - byte_offset,
            blocks: feed.length() - offset,
            offset,
            byte_offset,
            mtime: now,
            ctime: now,
            mount: None,
        };
        trie.put(rel_path, stat::encode(&Stat::File(stat.clone()))).await?;
        Ok(stat)
    }

    /// `readdir` (§4.10): first-path-segment projection, no dedup (§9).
    pub async fn read_dir(&self, name: &str) -> Result<Vec<String>> {
        self.ready().await?;
        let norm = path::normalize(name);
        let resolved = mount::resolve(self.trie.clone(), &norm);
        let prefix = path::child_prefix(&resolved.path);
        let entries = resolved.trie.list(&prefix).await?;
        Ok(entries.into_iter().filter_map(|(k, _)| path::first_segment_after(&prefix, &k)).collect())
    }

    /// `mount(path, key, opts)` (§4.12).
    pub async fn mount(&self, name: &str, key: PublicKey, opts: MountOptions) -> Result<()> {
        self.ready().await?;
        let norm = path::normalize(name);
        let resolved = mount::resolve(self.trie.clone(), &norm);
        let now = Time::now();

        if opts.hypercore {
            let feed = self.feeds.open(&KeyPair { public: key, secret: None }).await?;
            let stat = FileStat {
                owner: Owner::default(),
                size: feed.byte_length(),
                blocks: feed.length(),
                offset: 0,
                byte_offset: 0,
                mtime: now,
                ctime: now,
                mount: Some(Mount { key, version: opts.version, hash: opts.hash, hypercore: true }),
            };
            resolved.trie.put(&resolved.path, stat::encode(&Stat::File(stat))).await?;
        } else {
            let foreign = opts
                .trie
                .ok_or_else(|| Error::BackendError("trie mount requires a foreign trie handle".into()))?;
            let stat = Stat::Directory(DirectoryStat {
                owner: Owner::default(),
                mtime: now,
                ctime: now,
                mount: Some(Mount { key, version: opts.version, hash: opts.hash, hypercore: false }),
            });
            resolved.trie.put(&resolved.path, stat::encode(&stat)).await?;
            resolved.trie.attach_mount(resolved.path.clone(), foreign).await;
        }
        self.events.emit(Event::Update);
        Ok(())
    }

    /// `checkout(version)` (§4.13): a read-only drive sharing the
    /// parent's feeds and ContentState.
    pub async fn checkout(&self, version: u64) -> Result<Arc<Drive>> {
        self.ready().await?;
        let checkout_trie = self.trie.checkout(version).await?;
        let content = self.root_content.lock().await.clone();
        Ok(Arc::new(Drive {
            metadata_keypair: self.metadata_keypair.public_only(),
            metadata_feed: self.metadata_feed.clone(),
            trie: checkout_trie,
            feeds: self.feeds.clone(),
            ready: OnceCell::new_with(Some(())),
            root_content: Mutex::new(content),
            content_cache: moka::sync::Cache::new(64),
            descriptors: Mutex::new(Vec::new()),
            writing: Mutex::new(HashMap::new()),
            events: Events::new(),
        }))
    }

    /// `createReadStream` (§4.7).
    pub async fn create_read_stream(&self, name: &str, opts: ReadStreamOpts) -> Result<ReadStream> {
        self.ready().await?;
        let stat = self.stat(name).await?;
        let file = match stat {
            Stat::File(f) => f,
            _ => return Err(Error::BackendError("not a regular file".into())),
        };

        let (feed, base_byte_offset) = match file.mount.as_ref().filter(|m| m.hypercore) {
            Some(mount) => {
                let feed = self.feeds.open(&KeyPair { public: mount.key, secret: None }).await?;
                (feed, 0)
            }
            None => {
                let norm = path::normalize(name);
                let resolved = mount::resolve(self.trie.clone(), &norm);
                let content = self.content_for(&resolved.trie).await?;
                (content.feed().clone(), file.byte_offset)
            }
        };

        let start = opts.start.unwrap_or(0);
        let length = opts
            .length
            .or_else(|| opts.end.map(|end| end + 1 - start))
            .unwrap_or_else(|| file.size.saturating_sub(start));
        Ok(ReadStream { feed, base_offset: base_byte_offset + start, remaining: length, position: 0 })
    }

    /// `createWriteStream` (§4.8). `owner` seeds `mode`/`uid`/`gid` for a
    /// brand new file; overwriting an existing one should reuse its
    /// current owner, which callers get from [`Drive::lstat`] first.
    pub async fn create_write_stream(&self, name: &str, owner: Owner) -> Result<WriteStream> {
        self.ready().await?;
        let norm = path::normalize(name);
        let resolved = mount::resolve(self.trie.clone(), &norm);
        let content = self.content_for(&resolved.trie).await?;
        Ok(WriteStream::begin(self.events.clone(), resolved.path, resolved.trie, content, owner).await)
    }

    /// `writeFile` (§4.9): wraps `createWriteStream`, preserving the
    /// existing file's owner bits on overwrite.
    pub async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let owner = match self.lstat(name).await {
            Ok(Stat::File(f)) => f.owner,
            _ => Owner::default(),
        };
        let stream = self.create_write_stream(name, owner).await?;
        stream.write_chunk(data).await?;
        stream.finish().await?;
        Ok(())
    }

    /// `readFile` (§4.9): collects the read stream into one buffer.
    pub async fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let stream = self.create_read_stream(name, ReadStreamOpts::default()).await?;
        stream.collect().await
    }

    /// `open(path, flags)` (§4.5): builds a descriptor, returns its
    /// handle as `index + STDIO_CAP`.
    pub async fn open(&self, name: &str, flags: OpenFlags) -> Result<u64> {
        self.ready().await?;
        let norm = path::normalize(name);
        let resolved = mount::resolve(self.trie.clone(), &norm);
        let content = self.content_for(&resolved.trie).await?;

        let descriptor = if flags.write {
            let existing = match resolved.trie.get(&resolved.path).await? {
                Some(blob) => Some(stat::decode(&blob)?),
                None => None,
            };
            let owner = match &existing {
                Some(Stat::File(f)) => f.owner,
                Some(_) => return Err(Error::BackendError("path exists and is not a regular file".into())),
                None if flags.create => Owner::default(),
                None => return Err(Error::FileNotFound),
            };
            let descriptor =
                Arc::new(FileDescriptor::open_write(resolved.path.clone(), resolved.trie.clone(), content, owner, flags).await);
            self.writing.lock().await.insert(norm.clone(), descriptor.clone());
            descriptor
        } else {
            let file_stat = match resolved.trie.get(&resolved.path).await? {
                Some(blob) => match stat::decode(&blob)? {
                    Stat::File(f) => f,
                    _ => return Err(Error::BackendError("path is not a regular file".into())),
                },
                None => return Err(Error::FileNotFound),
            };
            // A hypercore-mounted file's bytes live in the foreign feed itself,
            // not this trie's own content feed (mirrors create_read_stream).
            let read_content = match file_stat.mount.as_ref().filter(|m| m.hypercore) {
                Some(mount) => {
                    let feed = self.feeds.open(&KeyPair { public: mount.key, secret: None }).await?;
                    Arc::new(ContentState::new(feed))
                }
                None => content,
            };
            Arc::new(FileDescriptor::open_read(resolved.path.clone(), resolved.trie.clone(), read_content, file_stat))
        };

        let mut descriptors = self.descriptors.lock().await;
        let index = match descriptors.iter().position(|slot| slot.is_none()) {
            Some(i) => {
                descriptors[i] = Some(descriptor);
                i
            }
            None => {
                descriptors.push(Some(descriptor));
                descriptors.len() - 1
            }
        };
        Ok(index as u64 + STDIO_CAP)
    }

    async fn descriptor(&self, fd: u64) -> Result<Arc<FileDescriptor>> {
        let index = fd.checked_sub(STDIO_CAP).ok_or(Error::BadFileDescriptor)? as usize;
        self.descriptors
            .lock()
            .await
            .get(index)
            .and_then(|slot| slot.clone())
            .ok_or(Error::BadFileDescriptor)
    }

    /// `read(fd, ...)` (§4.5).
    pub async fn read(&self, fd: u64, length: usize, pos: Option<u64>) -> Result<Vec<u8>> {
        self.descriptor(fd).await?.read(length, pos).await
    }

    /// `write(fd, ...)` (§4.5).
    pub async fn write(&self, fd: u64, data: &[u8]) -> Result<usize> {
        self.descriptor(fd).await?.write(data).await
    }

    /// `close(fd)` (§4.5): frees the slot and compacts trailing nulls.
    pub async fn close(&self, fd: u64) -> Result<()> {
        let index = fd.checked_sub(STDIO_CAP).ok_or(Error::BadFileDescriptor)? as usize;
        let descriptor = {
            let mut descriptors = self.descriptors.lock().await;
            let slot = descriptors.get_mut(index).ok_or(Error::BadFileDescriptor)?;
            let descriptor = slot.take().ok_or(Error::BadFileDescriptor)?;
            while matches!(descriptors.last(), Some(None)) {
                descriptors.pop();
            }
            descriptor
        };
        self.writing.lock().await.retain(|_, d| !Arc::ptr_eq(d, &descriptor));
        Ok(())
    }

    /// Closing the drive with no fd closes every feed this drive has
    /// touched, collecting errors and returning the last one (§9).
    pub async fn close_all(&self) -> Result<()> {
        let mut last = None;
        if let Err(e) = self.metadata_feed.close().await {
            last = Some(e);
        }
        if let Some(content) = self.root_content.lock().await.clone() {
            if let Err(e) = content.feed().close().await {
                last = Some(e);
            }
        }
        for content in self.content_cache.iter().map(|(_, v)| v) {
            if let Err(e) = content.feed().close().await {
                last = Some(e);
            }
        }
        match last {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// `replicate(opts)` (§6): delegates to the metadata feed's
    /// replication transport.
    pub async fn replicate(&self, stream: ReplicationStream) -> Result<()> {
        self.metadata_feed.replicate(stream).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::memory::MemoryFeedFactory;
    use crate::trie::memory::MemoryTrie;

    async fn fresh_drive() -> Arc<Drive> {
        let feeds: Arc<dyn FeedFactory> = Arc::new(MemoryFeedFactory::new());
        let trie: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        Drive::open(KeyPair::generate(), trie, feeds).await.unwrap()
    }

    #[tokio::test]
    async fn empty_drive_has_empty_root_directory() {
        let drive = fresh_drive().await;
        assert_eq!(drive.read_dir("/").await.unwrap(), Vec::<String>::new());
        assert!(matches!(drive.stat("/").await.unwrap(), Stat::Directory(_)));
    }

    #[tokio::test]
    async fn write_file_then_read_file_roundtrips() {
        let drive = fresh_drive().await;
        drive.write_file("/a.txt", b"hello").await.unwrap();
        assert_eq!(drive.read_file("/a.txt").await.unwrap(), b"hello");
        match drive.stat("/a.txt").await.unwrap() {
            Stat::File(f) => assert_eq!(f.size, 5),
            other => panic!("expected file stat, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rewriting_a_file_replaces_its_contents() {
        let drive = fresh_drive().await;
        drive.write_file("/a.txt", b"ABCDE").await.unwrap();
        drive.write_file("/a.txt", b"XY").await.unwrap();
        assert_eq!(drive.read_file("/a.txt").await.unwrap(), b"XY");
    }

    #[tokio::test]
    async fn mkdir_twice_fails_on_the_second_call() {
        let drive = fresh_drive().await;
        drive.mkdir("/d").await.unwrap();
        assert_eq!(drive.mkdir("/d").await.unwrap_err(), Error::PathAlreadyExists);
    }

    #[tokio::test]
    async fn rmdir_requires_empty_directory() {
        let drive = fresh_drive().await;
        drive.write_file("/d/f", b"x").await.unwrap();
        assert_eq!(drive.rmdir("/d").await.unwrap_err(), Error::DirectoryNotEmpty);
        drive.unlink("/d/f").await.unwrap();
        drive.rmdir("/d").await.unwrap();
    }

    #[tokio::test]
    async fn truncate_shrinks_and_grows_with_zero_fill() {
        let drive = fresh_drive().await;
        drive.write_file("/a", b"0123456789").await.unwrap();
        drive.truncate("/a", 4).await.unwrap();
        assert_eq!(drive.read_file("/a").await.unwrap(), b"0123");
        drive.truncate("/a", 6).await.unwrap();
        assert_eq!(drive.read_file("/a").await.unwrap(), b"0123\0\0");
    }

    #[tokio::test]
    async fn symlink_is_followed_by_stat_but_not_lstat() {
        let drive = fresh_drive().await;
        drive.write_file("/a.txt", b"hello").await.unwrap();
        drive.symlink("/a.txt", "/l").await.unwrap();

        match drive.lstat("/l").await.unwrap() {
            Stat::Symlink(s) => assert_eq!(s.linkname, "/a.txt"),
            other => panic!("expected symlink stat, got {other:?}"),
        }
        match drive.stat("/l").await.unwrap() {
            Stat::File(f) => assert_eq!(f.size, 5),
            other => panic!("expected file stat, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn descriptor_open_read_write_close_roundtrips() {
        let drive = fresh_drive().await;
        let fd = drive.open("/a", OpenFlags::write_only(true, false)).await.unwrap();
        assert!(fd >= STDIO_CAP);
        drive.write(fd, b"hello").await.unwrap();
        drive.close(fd).await.unwrap();

        let rfd = drive.open("/a", OpenFlags::read_only()).await.unwrap();
        let data = drive.read(rfd, 5, None).await.unwrap();
        assert_eq!(data, b"hello");
        drive.close(rfd).await.unwrap();
        assert!(drive.close(rfd).await.is_err());
    }

    #[tokio::test]
    async fn checkout_is_frozen_while_live_drive_advances() {
        let drive = fresh_drive().await;
        drive.write_file("/a.txt", b"v1").await.unwrap();
        let version = drive.owning_trie("/").version();
        drive.write_file("/a.txt", b"v2").await.unwrap();

        let checkout = drive.checkout(version).await.unwrap();
        assert_eq!(checkout.read_file("/a.txt").await.unwrap(), b"v1");
        assert_eq!(drive.read_file("/a.txt").await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn trie_mount_resolves_reads_through_the_foreign_trie() {
        let drive = fresh_drive().await;
        let foreign: Arc<dyn Trie> = Arc::new(MemoryTrie::new());
        foreign
            .put(
                "/x.txt",
                stat::encode(&Stat::File(FileStat {
                    owner: Owner::default(),
                    size: 0,
                    blocks: 0,
                    offset: 0,
                    byte_offset: 0,
                    mtime: Time::default(),
                    ctime: Time::default(),
                    mount: None,
                })),
            )
            .await
            .unwrap();

        drive
            .mount("/mnt", PublicKey([7; 32]), MountOptions { trie: Some(foreign), ..Default::default() })
            .await
            .unwrap();

        assert!(matches!(drive.lstat("/mnt/x.txt").await.unwrap(), Stat::File(_)));
    }
}
