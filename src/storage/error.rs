use derive_more::Display;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by [`super::ObjectStore`] implementations.
///
/// Mirrors the teacher crate's `storage/error.rs`: a kind plus an optional
/// boxed source, so a handler can match on `kind()` while still logging
/// the underlying cause.
#[derive(Debug, Error)]
#[error("storage error: {kind}")]
pub struct ObjectStoreError {
    kind: ObjectStoreErrorKind,
    #[source]
    source: Option<BoxError>,
}

impl ObjectStoreError {
    pub fn new<E>(kind: ObjectStoreErrorKind, error: E) -> Self
    where
        E: Into<BoxError>,
    {
        ObjectStoreError {
            kind,
            source: Some(error.into()),
        }
    }

    pub fn kind(&self) -> ObjectStoreErrorKind {
        self.kind
    }
}

impl From<ObjectStoreErrorKind> for ObjectStoreError {
    fn from(kind: ObjectStoreErrorKind) -> Self {
        ObjectStoreError { kind, source: None }
    }
}

/// The kinds a storage operation can fail with, following spec.md §7's
/// error catalog where it overlaps with filesystem concerns.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ObjectStoreErrorKind {
    /// Path does not exist.
    #[display("not found")]
    NotFound,
    /// Path exists but is the wrong kind (file where a directory was
    /// expected, or vice versa).
    #[display("permanent file not available")]
    PermanentFileNotAvailable,
    /// Directory is not empty (RMD on a non-empty directory).
    #[display("permanent directory not empty")]
    PermanentDirectoryNotEmpty,
    /// OS-level permission denied.
    #[display("permission denied")]
    PermissionDenied,
    /// Disk full / quota exceeded.
    #[display("insufficient storage space")]
    InsufficientStorageSpace,
    /// The underlying connection or handle was closed mid-operation.
    #[display("connection closed")]
    ConnectionClosed,
    /// Anything else, mapped to `451 Local error`.
    #[display("local error")]
    LocalError,
}

impl From<std::io::Error> for ObjectStoreError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        let kind = match err.kind() {
            NotFound => ObjectStoreErrorKind::NotFound,
            PermissionDenied => ObjectStoreErrorKind::PermissionDenied,
            AlreadyExists => ObjectStoreErrorKind::PermanentFileNotAvailable,
            ConnectionReset | BrokenPipe | ConnectionAborted => ObjectStoreErrorKind::ConnectionClosed,
            _ => match err.raw_os_error() {
                Some(libc::ENOTEMPTY) => ObjectStoreErrorKind::PermanentDirectoryNotEmpty,
                Some(libc::ENOTDIR) | Some(libc::EISDIR) | Some(libc::ENAMETOOLONG) | Some(libc::ELOOP) => {
                    ObjectStoreErrorKind::PermanentFileNotAvailable
                }
                Some(libc::ENOSPC) => ObjectStoreErrorKind::InsufficientStorageSpace,
                Some(libc::EROFS) => ObjectStoreErrorKind::PermissionDenied,
                _ => ObjectStoreErrorKind::LocalError,
            },
        };
        ObjectStoreError::new(kind, err)
    }
}
