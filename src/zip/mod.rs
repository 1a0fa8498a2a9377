//! ZIP archive construction.
//!
//! ## Architecture
//!
//! - [`structures`]: binary layouts of the ZIP records and their encoders
//! - `path`: in-archive path sanitizing
//! - `compress`: store/deflate/bzip2 encoders and the chunked digest loop
//! - `entry`: one member, from provisional header to central directory record
//! - `writer`: the [`ArchiveWriter`] state machine
//!
//! ## Output layout
//!
//! ```text
//! [local header][data]([data descriptor])  ...one per entry
//! [central directory header]               ...one per entry
//! [zip64 end of central directory record]  (zip64 only)
//! [zip64 end of central directory locator] (zip64 only)
//! [end of central directory record]
//! ```
//!
//! Seekable sinks get each local header patched once the entry's sizes and
//! CRC are known. In streaming mode the local header carries zeros and the
//! real values follow the data in a data descriptor; nothing is ever
//! rewritten.

mod compress;
mod entry;
mod path;
pub mod structures;
mod writer;

pub use compress::{Digest, STREAM_CHUNK_SIZE};
pub use path::sanitize;
pub use structures::{
    dos_datetime, dos_datetime_from_unix, CentralDirectoryHeader, CompressionLevel,
    CompressionMethod, DataDescriptor, EndOfCentralDirectory, Field, HeaderKind, LocalFileHeader,
    Zip64EOCD, Zip64EOCDLocator, Zip64ExtraField,
};
pub use writer::{
    ArchiveWriter, ClosedArchive, DuplicateFilter, EntryOptions, HeaderObserver, ZipFeatures,
};
