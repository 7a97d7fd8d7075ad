//! Stat record types and their trie-value encoding (§3, §6).
//!
//! The wire layout is a tagged, length-delimited record using fixed-width
//! big-endian integers for numeric fields (mirroring the XDR-flavoured
//! fixed-width encodings this codebase's NFS attribute records use) and
//! explicit length prefixes for variable-length fields (linkname, mount
//! key). Bit-exact compatibility with any particular peer implementation's
//! schema is not attempted here since the wire format itself is an
//! internal collaborator detail; what §6 actually requires — a stable,
//! roundtrippable encoding shared by every drive that reads this trie — is
//! what this module provides.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};

use crate::error::{Error, Result};
use crate::keys::PublicKey;

/// Unix-epoch timestamp with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Time {
    pub seconds: i64,
    pub nanos: u32,
}

impl Time {
    /// The current wall-clock time.
    pub fn now() -> Self {
        let dur = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Time { seconds: dur.as_secs() as i64, nanos: dur.subsec_nanos() }
    }
}

/// A mount attachment carried by a [`Stat`] (§3 "Mount" variant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Public key of the foreign feed (trie or, if `hypercore`, content feed).
    pub key: PublicKey,
    /// Historical version to mount, if pinned.
    pub version: Option<u64>,
    /// Expected content hash, if pinned.
    pub hash: Option<Vec<u8>>,
    /// `true` if this mount roots a raw content feed rather than a trie.
    pub hypercore: bool,
}

/// Common ownership/permission bits carried by every stat variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Owner {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

/// A file's metadata record (§3 "File").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub owner: Owner,
    /// Size in bytes.
    pub size: u64,
    /// Number of content-feed blocks spanned.
    pub blocks: u64,
    /// Index of the first content-feed block.
    pub offset: u64,
    /// Byte index of the first byte within that block's feed.
    pub byte_offset: u64,
    pub mtime: Time,
    pub ctime: Time,
    pub mount: Option<Mount>,
}

impl FileStat {
    /// The half-open byte range `[byte_offset, byte_offset + size)` this
    /// stat references in its owning content feed (§3 invariant).
    pub fn byte_range(&self) -> (u64, u64) {
        (self.byte_offset, self.size)
    }
}

/// A directory's metadata record (§3 "Directory"). Has no content-feed
/// reference: directories are synthesized from trie prefixes, not stored
/// bytes, except when a trie mount is attached here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryStat {
    pub owner: Owner,
    pub mtime: Time,
    pub ctime: Time,
    pub mount: Option<Mount>,
}

/// A symlink's metadata record (§3 "Symlink").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkStat {
    pub owner: Owner,
    /// Target path, resolved at stat-time by the caller.
    pub linkname: String,
}

/// A decoded trie value: one of the three stat variants (§9 design note:
/// model as a tagged sum, not a bag of optional fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stat {
    File(FileStat),
    Directory(DirectoryStat),
    Symlink(SymlinkStat),
}

impl Stat {
    /// The mount attachment carried by this stat, if any.
    pub fn mount(&self) -> Option<&Mount> {
        match self {
            Stat::File(f) => f.mount.as_ref(),
            Stat::Directory(d) => d.mount.as_ref(),
            Stat::Symlink(_) => None,
        }
    }

    /// Size in bytes: a file's byte length, zero for directories and
    /// symlinks (matching POSIX `lstat` behaviour on most platforms for
    /// symlinks is out of scope; callers that need the symlink target's
    /// size resolve one level via [`crate::drive::Drive::stat`] instead).
    pub fn size(&self) -> u64 {
        match self {
            Stat::File(f) => f.size,
            _ => 0,
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Stat::File(_) => TAG_FILE,
            Stat::Directory(_) => TAG_DIRECTORY,
            Stat::Symlink(_) => TAG_SYMLINK,
        }
    }
}

const TAG_FILE: u8 = 1;
const TAG_DIRECTORY: u8 = 2;
const TAG_SYMLINK: u8 = 3;

fn write_owner<W: Write>(w: &mut W, owner: &Owner) -> io::Result<()> {
    w.write_u32::<BigEndian>(owner.mode)?;
    w.write_u32::<BigEndian>(owner.uid)?;
    w.write_u32::<BigEndian>(owner.gid)
}

fn read_owner<R: Read>(r: &mut R) -> io::Result<Owner> {
    Ok(Owner { mode: r.read_u32::<BigEndian>()?, uid: r.read_u32::<BigEndian>()?, gid: r.read_u32::<BigEndian>()? })
}

fn write_time<W: Write>(w: &mut W, t: &Time) -> io::Result<()> {
    w.write_i64::<BigEndian>(t.seconds)?;
    w.write_u32::<BigEndian>(t.nanos)
}

fn read_time<R: Read>(r: &mut R) -> io::Result<Time> {
    Ok(Time { seconds: r.read_i64::<BigEndian>()?, nanos: r.read_u32::<BigEndian>()? })
}

fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    w.write_u32::<BigEndian>(bytes.len() as u32)?;
    w.write_all(bytes)
}

fn read_bytes<R: Read>(r: &mut R) -> io::Result<Vec<u8>> {
    let len = r.read_u32::<BigEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_mount<W: Write>(w: &mut W, mount: &Option<Mount>) -> io::Result<()> {
    match mount {
        None => w.write_u8(0),
        Some(m) => {
            w.write_u8(1)?;
            w.write_all(&m.key.0)?;
            w.write_u8(if m.version.is_some() { 1 } else { 0 })?;
            if let Some(v) = m.version {
                w.write_u64::<BigEndian>(v)?;
            }
            write_bytes(w, m.hash.as_deref().unwrap_or(&[]))?;
            w.write_u8(if m.hash.is_some() { 1 } else { 0 })?;
            w.write_u8(m.hypercore as u8)
        }
    }
}

fn read_mount<R: Read>(r: &mut R) -> io::Result<Option<Mount>> {
    let present = r.read_u8()?;
    if present == 0 {
        return Ok(None);
    }
    let mut key = [0u8; 32];
    r.read_exact(&mut key)?;
    let has_version = r.read_u8()? != 0;
    let version = if has_version { Some(r.read_u64::<BigEndian>()?) } else { None };
    let hash_bytes = read_bytes(r)?;
    let has_hash = r.read_u8()? != 0;
    let hash = if has_hash { Some(hash_bytes) } else { None };
    let hypercore = r.read_u8()? != 0;
    Ok(Some(Mount { key: PublicKey(key), version, hash, hypercore }))
}

/// Encode a [`Stat`] to the blob stored as a trie value.
pub fn encode(stat: &Stat) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(stat.tag());
    match stat {
        Stat::File(f) => {
            write_owner(&mut buf, &f.owner).expect("write to Vec cannot fail");
            buf.write_u64::<BigEndian>(f.size).unwrap();
            buf.write_u64::<BigEndian>(f.blocks).unwrap();
            buf.write_u64::<BigEndian>(f.offset).unwrap();
            buf.write_u64::<BigEndian>(f.byte_offset).unwrap();
            write_time(&mut buf, &f.mtime).unwrap();
            write_time(&mut buf, &f.ctime).unwrap();
            write_mount(&mut buf, &f.mount).unwrap();
        }
        Stat::Directory(d) => {
            write_owner(&mut buf, &d.owner).unwrap();
            write_time(&mut buf, &d.mtime).unwrap();
            write_time(&mut buf, &d.ctime).unwrap();
            write_mount(&mut buf, &d.mount).unwrap();
        }
        Stat::Symlink(s) => {
            write_owner(&mut buf, &s.owner).unwrap();
            write_bytes(&mut buf, s.linkname.as_bytes()).unwrap();
        }
    }
    buf
}

/// Decode a trie value back into a [`Stat`].
///
/// Fails with [`Error::DecodeError`] on truncated or tag-corrupt input
/// (§7), never panics.
pub fn decode(blob: &[u8]) -> Result<Stat> {
    let mut cursor = Cursor::new(blob);
    let tag = cursor.read_u8().map_err(decode_err)?;
    match tag {
        TAG_FILE => {
            let owner = read_owner(&mut cursor).map_err(decode_err)?;
            let size = cursor.read_u64::<BigEndian>().map_err(decode_err)?;
            let blocks = cursor.read_u64::<BigEndian>().map_err(decode_err)?;
            let offset = cursor.read_u64::<BigEndian>().map_err(decode_err)?;
            let byte_offset = cursor.read_u64::<BigEndian>().map_err(decode_err)?;
            let mtime = read_time(&mut cursor).map_err(decode_err)?;
            let ctime = read_time(&mut cursor).map_err(decode_err)?;
            let mount = read_mount(&mut cursor).map_err(decode_err)?;
            Ok(Stat::File(FileStat { owner, size, blocks, offset, byte_offset, mtime, ctime, mount }))
        }
        TAG_DIRECTORY => {
            let owner = read_owner(&mut cursor).map_err(decode_err)?;
            let mtime = read_time(&mut cursor).map_err(decode_err)?;
            let ctime = read_time(&mut cursor).map_err(decode_err)?;
            let mount = read_mount(&mut cursor).map_err(decode_err)?;
            Ok(Stat::Directory(DirectoryStat { owner, mtime, ctime, mount }))
        }
        TAG_SYMLINK => {
            let owner = read_owner(&mut cursor).map_err(decode_err)?;
            let linkname_bytes = read_bytes(&mut cursor).map_err(decode_err)?;
            let linkname = String::from_utf8(linkname_bytes)
                .map_err(|e| Error::DecodeError(format!("linkname not utf8: {e}")))?;
            Ok(Stat::Symlink(SymlinkStat { owner, linkname }))
        }
        other => Err(Error::DecodeError(format!("unknown stat tag {other}"))),
    }
}

fn decode_err(e: io::Error) -> Error {
    Error::DecodeError(e.to_string())
}
