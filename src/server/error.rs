//! Error kinds for the control-channel/session layer (spec.md §7),
//! following the teacher crate's `server/controlchan/error.rs` and this
//! crate's own `storage::ObjectStoreError` for the two-layer split noted in
//! SPEC_FULL.md §7.

use derive_more::Display;
use thiserror::Error;

use crate::storage::{ObjectStoreError, ObjectStoreErrorKind};

use super::reply::ReplyCode;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by command handlers and the session loop.
#[derive(Debug, Error)]
#[error("ftp session error: {kind}")]
pub struct FtpError {
    kind: FtpErrorKind,
    #[source]
    source: Option<BoxError>,
}

/// Error kinds named by spec.md §7, mapped to reply codes in
/// [`FtpErrorKind::reply_code`].
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum FtpErrorKind {
    #[display("malformed command or argument")]
    ProtocolSyntax,
    #[display("unsupported parameter")]
    UnsupportedParameter,
    #[display("not authenticated")]
    NotAuthenticated,
    #[display("authentication failed")]
    AuthFailed,
    #[display("permission denied")]
    PermissionDenied,
    #[display("not found")]
    NotFound,
    #[display("bad sequence of commands")]
    BadSequence,
    #[display("resource exhausted")]
    ResourceExhausted,
    #[display("timeout")]
    Timeout,
    #[display("transfer failed")]
    TransferFailed,
    #[display("filesystem error")]
    FilesystemError,
    #[display("internal error")]
    Internal,
}

impl FtpError {
    pub fn new(kind: FtpErrorKind) -> Self {
        FtpError { kind, source: None }
    }

    pub fn with_source<E: Into<BoxError>>(kind: FtpErrorKind, source: E) -> Self {
        FtpError { kind, source: Some(source.into()) }
    }

    pub fn kind(&self) -> FtpErrorKind {
        self.kind
    }

    /// The default `(code, message)` spec.md §4.8/§7 maps this kind to.
    /// Handlers that need a more specific message construct a `Reply`
    /// directly instead of going through this path.
    pub fn reply_code(&self) -> ReplyCode {
        match self.kind {
            FtpErrorKind::ProtocolSyntax => ReplyCode::CommandSyntaxError,
            FtpErrorKind::UnsupportedParameter => ReplyCode::CommandNotImplementedForParameter,
            FtpErrorKind::NotAuthenticated => ReplyCode::NotLoggedIn,
            FtpErrorKind::AuthFailed => ReplyCode::AuthFailed,
            FtpErrorKind::PermissionDenied | FtpErrorKind::NotFound | FtpErrorKind::FilesystemError => ReplyCode::FileError,
            FtpErrorKind::BadSequence => ReplyCode::BadCommandSequence,
            FtpErrorKind::ResourceExhausted => ReplyCode::ServiceNotAvailable,
            FtpErrorKind::Timeout => ReplyCode::ServiceNotAvailable,
            FtpErrorKind::TransferFailed => ReplyCode::ConnectionClosed,
            FtpErrorKind::Internal => ReplyCode::CommandSyntaxError,
        }
    }
}

impl From<FtpErrorKind> for FtpError {
    fn from(kind: FtpErrorKind) -> Self {
        FtpError { kind, source: None }
    }
}

impl From<std::io::Error> for FtpError {
    fn from(err: std::io::Error) -> Self {
        FtpError::with_source(FtpErrorKind::TransferFailed, err)
    }
}

/// Maps a storage-layer error onto the control-channel kind it surfaces
/// as, following SPEC_FULL.md §7's two-layer split.
impl From<ObjectStoreError> for FtpError {
    fn from(err: ObjectStoreError) -> Self {
        let kind = match err.kind() {
            ObjectStoreErrorKind::NotFound => FtpErrorKind::NotFound,
            ObjectStoreErrorKind::PermissionDenied => FtpErrorKind::PermissionDenied,
            ObjectStoreErrorKind::PermanentFileNotAvailable
            | ObjectStoreErrorKind::PermanentDirectoryNotEmpty
            | ObjectStoreErrorKind::InsufficientStorageSpace
            | ObjectStoreErrorKind::LocalError => FtpErrorKind::FilesystemError,
            ObjectStoreErrorKind::ConnectionClosed => FtpErrorKind::TransferFailed,
        };
        FtpError::with_source(kind, err)
    }
}

/// Top-level error returned by [`crate::Server::listen`] when the listening
/// socket itself cannot be set up; distinct from per-session [`FtpError`]s,
/// which never escape a session.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind control listener: {0}")]
    Bind(#[source] std::io::Error),
}
