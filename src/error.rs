//! Error type shared by every drive operation.

use std::fmt;

/// Convenient result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by [`crate::drive::Drive`] and its collaborators.
///
/// Variants that have a POSIX analogue carry the matching errno via
/// [`Error::errno`] so compound operations can treat "not found" as
/// "absent, not a fault" without matching on the variant directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Stat lookup miss on a path that was required to exist.
    FileNotFound,
    /// Conditional put rejected: the path already has an entry.
    PathAlreadyExists,
    /// `rmdir` attempted on a directory that still has children.
    DirectoryNotEmpty,
    /// An invalid or freed file descriptor was passed to an operation.
    BadFileDescriptor,
    /// A stat blob in the trie failed to decode.
    DecodeError(String),
    /// Error surfaced by the feed or trie collaborator.
    BackendError(String),
}

impl Error {
    /// POSIX-style errno for variants that have one, `None` otherwise.
    ///
    /// `errno == 2` (`ENOENT`) is the signal compound operations
    /// (`truncate`, `create`, `symlink`, `createWriteStream`) use to treat
    /// a miss as "absent, not a fault".
    pub fn errno(&self) -> Option<i32> {
        match self {
            Error::FileNotFound => Some(2),
            Error::PathAlreadyExists => Some(17),
            Error::DirectoryNotEmpty => Some(39),
            Error::BadFileDescriptor => Some(9),
            Error::DecodeError(_) => None,
            Error::BackendError(_) => None,
        }
    }

    /// `true` iff this error represents a missing path (errno 2).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::FileNotFound)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FileNotFound => write!(f, "no such file or directory"),
            Error::PathAlreadyExists => write!(f, "path already exists"),
            Error::DirectoryNotEmpty => write!(f, "directory not empty"),
            Error::BadFileDescriptor => write!(f, "bad file descriptor"),
            Error::DecodeError(msg) => write!(f, "corrupt stat record: {msg}"),
            Error::BackendError(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
