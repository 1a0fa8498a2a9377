//! # zipfly
//!
//! A ZIP/ZIP64 archive writer.
//!
//! Entries are compressed and written one at a time from files, in-memory
//! buffers or any [`Read`](std::io::Read) source, so memory use stays at one
//! chunk per entry regardless of the entry's size.
//!
//! ## Features
//!
//! - ZIP64 extensions (on by default) for archives and members beyond 4 GiB
//! - STORE, DEFLATE (three levels) and BZIP2 compression
//! - Seekable output, where local headers are patched in place
//! - Streaming output to pipes and sockets, using data descriptors
//! - Path sanitizing and optional duplicate detection
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use zipfly::{ArchiveWriter, CompressionMethod, EntryOptions};
//!
//! let mut writer = ArchiveWriter::new();
//! writer.create(Cursor::new(Vec::new()))?;
//! writer.add_from_string(
//!     "hello, world\n",
//!     "docs/hello.txt",
//!     EntryOptions::new().method(CompressionMethod::Store),
//! )?;
//! let closed = writer.close()?;
//!
//! let bytes = closed.sink.into_inner();
//! assert_eq!(&bytes[0..4], b"PK\x03\x04");
//! # Ok::<(), zipfly::Error>(())
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{ArchiveError, DirectoryErrorKind, Error, FileErrorKind, HeaderError, Result};
pub use io::{FileSink, Sink, StreamSink};
pub use zip::{
    ArchiveWriter, ClosedArchive, CompressionLevel, CompressionMethod, DuplicateFilter,
    EntryOptions, HeaderKind, HeaderObserver, ZipFeatures,
};
