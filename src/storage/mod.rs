//! The abstract filesystem collaborator (spec.md §6) and its default,
//! OS-backed implementation.
//!
//! [`ObjectStore`] is the "small interface" spec.md §6 asks for:
//! `stat`, `open` (split here into `open_read`/`open_write` since Rust
//! separates read/write capability at the type level, unlike Python's mode
//! strings), `listdir`, `mkdir`, `rmdir`, `remove`, `rename`. Unlike the
//! teacher crate's `StorageBackend<User>`, it carries no generic user-type
//! parameter — this crate has exactly one user type and the permission
//! check already happened in [`crate::auth`], so [`Server`](crate::Server)
//! is generic over `S: ObjectStore` directly rather than boxing it.

mod error;
mod fs;

pub use error::{ObjectStoreError, ObjectStoreErrorKind};
pub use fs::StdFilesystem;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Result type used throughout this module, following
/// `storage/storage_backend.rs`'s `Result<T>` alias.
pub type Result<T> = std::result::Result<T, ObjectStoreError>;

/// How an `open_write` call should position itself in the target file,
/// following `ftpd.py`'s `ftp_STOR`/`ftp_APPE` mode strings (`'w'`, `'r+'`
/// after seek, `'a'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// STOR with no REST: truncate (or create) and write from the start.
    Create,
    /// STOR preceded by REST: open for read+write and seek to the offset
    /// without truncating.
    Resume(u64),
    /// APPE: open in append mode: writes always land at the current EOF.
    Append,
}

/// Metadata about a single filesystem entry, following the teacher's
/// `storage::Metadata` trait but as a concrete struct — this crate has
/// exactly one storage backend shape (std::fs), so the trait-of-traits
/// indirection the teacher needs for pluggable metadata representations
/// (GCS objects, capability-sandboxed files, ...) isn't needed here.
#[derive(Debug, Clone, Copy)]
pub struct Metadata {
    pub len: u64,
    pub is_dir: bool,
    pub is_file: bool,
    pub modified: SystemTime,
    /// Raw Unix permission bits (`st_mode & 0o777`), used by the Listing
    /// Formatter to render the `drwxrwxrwx`-style mode string spec.md §4.6
    /// calls for.
    pub mode: u32,
}

/// A single entry produced by [`ObjectStore::list_dir`]: a file name (not a
/// full path) plus its metadata, following `storage_backend.rs`'s
/// `Fileinfo<P, M>`.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub metadata: Metadata,
}

/// The filesystem collaborator. An implementation backed by the OS
/// filesystem ([`StdFilesystem`]) is the default; other back-ends are
/// admissible (spec.md §6), following the teacher crate's
/// `StorageBackend<User>` trait, simplified to a single, object-safe,
/// already-resolved-path interface — path resolution and permission
/// checking happen one layer up in [`crate::auth::User::resolve`], so by
/// the time a call reaches here `path` is always a real filesystem path.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Returns metadata for `path`, or `NotFound` if it does not exist.
    async fn stat(&self, path: &Path) -> Result<Metadata>;

    /// Opens `path` for reading, seeked to `start` bytes from the
    /// beginning (REST support for RETR).
    async fn open_read(&self, path: &Path, start: u64) -> Result<Box<dyn AsyncRead + Send + Unpin>>;

    /// Opens `path` for writing per `mode` (STOR/STOR-with-REST/APPE).
    async fn open_write(&self, path: &Path, mode: WriteMode) -> Result<Box<dyn AsyncWrite + Send + Unpin>>;

    /// Lists the immediate children of a directory.
    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Creates a new, empty directory (MKD). Fails if it already exists.
    async fn mkdir(&self, path: &Path) -> Result<()>;

    /// Removes a single file (DELE).
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Recursively removes a directory tree (RMD), equivalent to
    /// `ftpd.py`'s `remove_dir`: `os.walk(top, topdown=False)` removing
    /// every file before removing the directories that contained them.
    async fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Renames/moves `from` to `to` (RNFR/RNTO).
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}

/// Joins a realpath directory with a single path component, used by
/// [`StdFilesystem::list_dir`] and test helpers.
pub(crate) fn join_name(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}
