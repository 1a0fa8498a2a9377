//! Error types for archive creation.
//!
//! Every failure is fatal to the call that triggered it. Validation
//! failures are reported before any byte of the affected entry reaches the
//! sink, so the archive is left exactly as it was. I/O failures in the
//! middle of an entry leave the archive [`ArchiveError::Aborted`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The destination directory of a new archive file is unusable.
    #[error("directory {}: {kind}", .path.display())]
    Directory {
        path: PathBuf,
        kind: DirectoryErrorKind,
    },

    /// A local file (archive destination or entry source) is unusable.
    #[error("file {}: {kind}", .path.display())]
    File { path: PathBuf, kind: FileErrorKind },

    /// Archive state or sink contract violation.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A header could not be parsed.
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// I/O error from the sink or an entry source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn directory(path: impl Into<PathBuf>, kind: DirectoryErrorKind) -> Self {
        Error::Directory {
            path: path.into(),
            kind,
        }
    }

    pub(crate) fn file(path: impl Into<PathBuf>, kind: FileErrorKind) -> Self {
        Error::File {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DirectoryErrorKind {
    #[error("does not exist")]
    NotExists,
    #[error("is not writeable")]
    NotWriteable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FileErrorKind {
    #[error("already exists")]
    Exists,
    #[error("does not exist")]
    NotExists,
    #[error("is not readable")]
    NotReadable,
    #[error("is not writeable")]
    NotWriteable,
}

/// Archive-state and sink-contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    #[error("no archive is open")]
    NotOpened,

    #[error("an archive is already open")]
    AlreadyOpen,

    #[error("in-archive path {path:?} is empty after sanitizing")]
    BadInArchivePath { path: String },

    #[error("in-archive path {path:?} is {len} bytes long (limit is 65535)")]
    LongInArchivePath { path: String, len: usize },

    #[error("in-archive path {path:?} was already added")]
    DuplicateEntry { path: String },

    #[error("source stream for {path:?} is not readable")]
    StreamNotReadable { path: String },

    #[error("output stream is not opened for writing")]
    StreamNotWriteable,

    #[error("output stream is not seekable; enable streaming mode to write it")]
    StreamNotSeekable,

    #[error("ZIP64 archives require a 64-bit platform")]
    Requires64BitPlatform,

    /// A value outgrew its classic field while ZIP64 mode is off.
    #[error("{field} of {path:?} does not fit a classic ZIP field; enable ZIP64")]
    Zip64Required { path: String, field: &'static str },

    #[error("archive was abandoned after a write failure")]
    Aborted,
}

/// Errors from parsing a binary header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("invalid {structure}: unexpected signature {found:#010x}")]
    BadSignature { structure: &'static str, found: u32 },

    #[error("invalid {structure}: need {needed} bytes, have {available}")]
    Truncated {
        structure: &'static str,
        needed: usize,
        available: usize,
    },
}
