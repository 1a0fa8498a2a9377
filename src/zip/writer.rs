use log::{debug, trace, warn};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufReader, Cursor, Read};
use std::path::Path;
use std::time::SystemTime;

use super::compress::{Digest, STREAM_CHUNK_SIZE};
use super::entry::{Entry, EntryWriter};
use super::path::sanitize;
use super::structures::{
    dos_datetime, CompressionLevel, CompressionMethod, EndOfCentralDirectory, HeaderKind,
    Zip64EOCD, Zip64EOCDLocator,
};
use crate::error::{ArchiveError, Error, FileErrorKind, Result};
use crate::io::{open_destination, FileSink, Sink};

/// Longest in-archive path the 16-bit name length field can describe.
const MAX_PATH_LEN: usize = 0xFFFF;

/// Archive-wide format switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipFeatures {
    /// Emit ZIP64 extra fields for every entry and the ZIP64 end records.
    pub zip64: bool,
    /// Single-pass output: no seeking, data descriptors after each entry.
    pub streaming: bool,
}

impl Default for ZipFeatures {
    fn default() -> Self {
        Self {
            zip64: true,
            streaming: false,
        }
    }
}

/// How repeated in-archive paths are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateFilter {
    /// Duplicates are written as separate entries.
    #[default]
    None,
    /// Compare sanitized paths.
    ByFullPath,
    /// Compare 64-bit hashes of sanitized paths; uses less memory.
    ByPathHash,
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum PathKey {
    Full(String),
    Hash(u64),
}

impl DuplicateFilter {
    fn key(&self, path: &str) -> Option<PathKey> {
        match self {
            DuplicateFilter::None => None,
            DuplicateFilter::ByFullPath => Some(PathKey::Full(path.to_owned())),
            DuplicateFilter::ByPathHash => {
                let mut hasher = DefaultHasher::new();
                path.hash(&mut hasher);
                Some(PathKey::Hash(hasher.finish()))
            }
        }
    }
}

/// Per-entry settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryOptions {
    pub method: CompressionMethod,
    pub level: CompressionLevel,
    /// Modification time; `None` means the time the entry is added.
    pub last_modified: Option<SystemTime>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: CompressionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    pub fn last_modified(mut self, time: SystemTime) -> Self {
        self.last_modified = Some(time);
        self
    }
}

/// Receives every header as it is produced.
///
/// `offset` is the header's absolute position in the sink, or `None` for
/// central directory records, which are only placed at close.
pub trait HeaderObserver {
    fn on_header(&mut self, kind: HeaderKind, offset: Option<u64>, bytes: &[u8]);
}

/// Summary handed back by [`ArchiveWriter::close`].
#[derive(Debug)]
pub struct ClosedArchive<S> {
    /// The released sink, flushed.
    pub sink: S,
    pub entries: u64,
    pub central_directory_offset: u64,
    pub central_directory_size: u64,
    /// Sink offset just past the end record. Equals the sink length when
    /// the archive is the last thing written to it.
    pub total_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unopened,
    Open,
    Closed,
    Aborted,
}

/// ZIP/ZIP64 archive writer.
///
/// ## Lifecycle
///
/// `new` → [`create`](Self::create) → `add_*` … → [`close`](Self::close).
/// `create` may be called again after `close` (or while open, which closes
/// the current archive first). An archive that is still open when the
/// writer is dropped is closed implicitly.
///
/// ## Example
///
/// ```
/// use std::io::Cursor;
/// use zipfly::{ArchiveWriter, EntryOptions};
///
/// let mut writer = ArchiveWriter::new();
/// writer.create(Cursor::new(Vec::new()))?;
/// writer.add_from_string("Zip64\nTest\n", "test.txt", EntryOptions::new())?;
/// let closed = writer.close()?;
///
/// assert_eq!(closed.entries, 1);
/// assert_eq!(closed.total_size, closed.sink.get_ref().len() as u64);
/// # Ok::<(), zipfly::Error>(())
/// ```
pub struct ArchiveWriter<S: Sink> {
    sink: Option<S>,
    state: State,
    features: ZipFeatures,
    duplicate_filter: DuplicateFilter,
    /// Absolute sink offset of the next byte to be written.
    write_cursor: u64,
    entry_count: u64,
    last_entry: Option<Digest>,
    central_directory: Vec<u8>,
    seen_paths: HashSet<PathKey>,
    observer: Option<Box<dyn HeaderObserver>>,
}

impl<S: Sink> Default for ArchiveWriter<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sink> ArchiveWriter<S> {
    pub fn new() -> Self {
        Self::with_duplicate_filter(DuplicateFilter::None)
    }

    pub fn with_duplicate_filter(duplicate_filter: DuplicateFilter) -> Self {
        Self {
            sink: None,
            state: State::Unopened,
            features: ZipFeatures::default(),
            duplicate_filter,
            write_cursor: 0,
            entry_count: 0,
            last_entry: None,
            central_directory: Vec::new(),
            seen_paths: HashSet::new(),
            observer: None,
        }
    }

    /// Attach a hook that sees every header as it is built.
    pub fn set_header_observer(&mut self, observer: Box<dyn HeaderObserver>) {
        self.observer = Some(observer);
    }

    pub fn features(&self) -> ZipFeatures {
        self.features
    }

    pub fn is_open(&self) -> bool {
        self.state == State::Open
    }

    /// Sink offset the next entry starts at.
    pub fn write_cursor(&self) -> u64 {
        self.write_cursor
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// CRC and sizes of the most recently added entry.
    pub fn last_entry(&self) -> Option<Digest> {
        self.last_entry
    }

    /// Switch ZIP64 and streaming mode. Not allowed while an archive is open.
    pub fn set_zip_feature(&mut self, zip64: bool, streaming: bool) -> Result<()> {
        if self.is_open() {
            return Err(ArchiveError::AlreadyOpen.into());
        }
        self.features = ZipFeatures { zip64, streaming };
        debug!("zip features: zip64={}, streaming={}", zip64, streaming);
        Ok(())
    }

    /// Start a new archive on `sink`.
    ///
    /// A still-open archive is closed first. The sink must be writable and,
    /// unless streaming mode is on, seekable.
    pub fn create(&mut self, mut sink: S) -> Result<()> {
        if self.is_open() {
            self.close()?;
        }

        if !sink.is_writable() {
            return Err(ArchiveError::StreamNotWriteable.into());
        }
        if self.features.zip64 && cfg!(not(target_pointer_width = "64")) {
            return Err(ArchiveError::Requires64BitPlatform.into());
        }

        if !self.features.streaming && !sink.is_seekable() {
            return Err(ArchiveError::StreamNotSeekable.into());
        }
        // Non-seekable sinks cannot report a position and are taken to
        // start at offset 0.
        let start = if sink.is_seekable() {
            sink.position()?
        } else {
            0
        };

        self.reset();
        self.write_cursor = start;
        self.sink = Some(sink);
        self.state = State::Open;
        debug!(
            "archive created (zip64={}, streaming={})",
            self.features.zip64, self.features.streaming
        );
        Ok(())
    }

    fn reset(&mut self) {
        self.write_cursor = 0;
        self.entry_count = 0;
        self.last_entry = None;
        self.central_directory.clear();
        self.seen_paths.clear();
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::Aborted => Err(ArchiveError::Aborted.into()),
            State::Unopened | State::Closed => Err(ArchiveError::NotOpened.into()),
        }
    }

    /// Add a local file, streamed from disk.
    ///
    /// The file's modification time is used unless `options` sets one.
    pub fn add_file(
        &mut self,
        local_path: impl AsRef<Path>,
        in_archive_path: &str,
        options: EntryOptions,
    ) -> Result<()> {
        let local_path = local_path.as_ref();
        self.ensure_open()?;

        let file = File::open(local_path).map_err(|e| {
            let kind = match e.kind() {
                std::io::ErrorKind::NotFound => FileErrorKind::NotExists,
                _ => FileErrorKind::NotReadable,
            };
            Error::file(local_path, kind)
        })?;
        let meta = file
            .metadata()
            .map_err(|_| Error::file(local_path, FileErrorKind::NotReadable))?;
        if !meta.is_file() {
            return Err(Error::file(local_path, FileErrorKind::NotReadable));
        }

        let options = EntryOptions {
            last_modified: options.last_modified.or_else(|| meta.modified().ok()),
            ..options
        };

        self.add_entry(BufReader::new(file), in_archive_path, options)
            .map_err(|e| match e {
                Error::Archive(ArchiveError::StreamNotReadable { .. }) => {
                    Error::file(local_path, FileErrorKind::NotReadable)
                }
                other => other,
            })
    }

    /// Add an entry from in-memory content.
    pub fn add_from_string(
        &mut self,
        content: impl AsRef<[u8]>,
        in_archive_path: &str,
        options: EntryOptions,
    ) -> Result<()> {
        self.add_entry(content.as_ref(), in_archive_path, options)
    }

    /// Add an entry read from `source` until end of stream.
    pub fn add_from_stream<R: Read>(
        &mut self,
        source: R,
        in_archive_path: &str,
        options: EntryOptions,
    ) -> Result<()> {
        self.add_entry(source, in_archive_path, options)
    }

    fn add_entry<R: Read>(
        &mut self,
        mut source: R,
        in_archive_path: &str,
        options: EntryOptions,
    ) -> Result<()> {
        self.ensure_open()?;

        let name = sanitize(in_archive_path).ok_or_else(|| ArchiveError::BadInArchivePath {
            path: in_archive_path.to_owned(),
        })?;
        if name.len() > MAX_PATH_LEN {
            return Err(ArchiveError::LongInArchivePath {
                path: in_archive_path.to_owned(),
                len: name.len(),
            }
            .into());
        }

        let key = self.duplicate_filter.key(&name);
        if key.as_ref().is_some_and(|k| self.seen_paths.contains(k)) {
            return Err(ArchiveError::DuplicateEntry {
                path: in_archive_path.to_owned(),
            }
            .into());
        }

        if !self.features.zip64 {
            let field = if self.entry_count >= u16::MAX as u64 {
                Some("entry count")
            } else if self.write_cursor >= u32::MAX as u64 {
                Some("local header offset")
            } else {
                None
            };
            if let Some(field) = field {
                return Err(ArchiveError::Zip64Required { path: name, field }.into());
            }
        }

        // Read ahead so an unreadable source is rejected before any byte of
        // the entry is written.
        let head = read_chunk(&mut source).map_err(|_| ArchiveError::StreamNotReadable {
            path: in_archive_path.to_owned(),
        })?;

        let dos_time = dos_datetime(options.last_modified.unwrap_or_else(SystemTime::now));
        let entry = Entry::new(
            name,
            options.method,
            options.level,
            dos_time,
            self.write_cursor,
            self.features.streaming,
        );
        trace!("adding {} at offset {}", entry.name(), self.write_cursor);

        let Some(sink) = self.sink.as_mut() else {
            return Err(ArchiveError::NotOpened.into());
        };
        let writer = EntryWriter::new(sink, self.features, self.observer.as_mut());
        let written = match writer.write(entry, Cursor::new(head).chain(source)) {
            Ok(written) => written,
            Err(e) => {
                self.abort();
                return Err(e);
            }
        };

        self.central_directory
            .extend_from_slice(&written.central_directory);
        self.write_cursor = written.end_offset;
        self.entry_count += 1;
        self.last_entry = Some(written.digest);
        if let Some(key) = key {
            self.seen_paths.insert(key);
        }
        Ok(())
    }

    /// Leave the archive unusable after a failed write.
    fn abort(&mut self) {
        warn!(
            "archive aborted after {} entries at offset {}",
            self.entry_count, self.write_cursor
        );
        self.sink = None;
        self.state = State::Aborted;
        self.reset();
    }

    /// Write the central directory and end records, flush and release the
    /// sink.
    pub fn close(&mut self) -> Result<ClosedArchive<S>> {
        self.ensure_open()?;
        match self.finish() {
            Ok(closed) => Ok(closed),
            Err(e) => {
                self.abort();
                Err(e)
            }
        }
    }

    fn finish(&mut self) -> Result<ClosedArchive<S>> {
        let zip64 = self.features.zip64;
        let Some(sink) = self.sink.as_mut() else {
            return Err(ArchiveError::NotOpened.into());
        };

        let cd_offset = if self.features.streaming {
            self.write_cursor
        } else {
            sink.position()?
        };
        let cd_size = self.central_directory.len() as u64;
        let entries = self.entry_count;

        if !zip64 && (cd_offset >= u32::MAX as u64 || cd_size >= u32::MAX as u64) {
            return Err(ArchiveError::Zip64Required {
                path: String::new(),
                field: "central directory",
            }
            .into());
        }

        sink.write_all(&self.central_directory)?;
        let mut end = cd_offset + cd_size;

        let mut records = Vec::with_capacity(3);
        if zip64 {
            records.push((
                HeaderKind::Zip64EndOfCentralDirectory,
                Zip64EOCD::for_archive(entries, cd_size, cd_offset).to_bytes(),
            ));
            records.push((
                HeaderKind::Zip64EndOfCentralDirectoryLocator,
                Zip64EOCDLocator::for_archive(cd_size, cd_offset).to_bytes(),
            ));
        }
        records.push((
            HeaderKind::EndOfCentralDirectory,
            EndOfCentralDirectory::for_archive(entries, cd_size, cd_offset, zip64).to_bytes(),
        ));

        for (kind, bytes) in &records {
            sink.write_all(bytes)?;
            if let Some(observer) = self.observer.as_mut() {
                observer.on_header(*kind, Some(end), bytes);
            }
            end += bytes.len() as u64;
        }
        sink.flush()?;

        let Some(sink) = self.sink.take() else {
            return Err(ArchiveError::NotOpened.into());
        };
        self.state = State::Closed;
        self.reset();
        debug!(
            "archive closed: {} entries, central directory {} bytes at {}",
            entries, cd_size, cd_offset
        );

        Ok(ClosedArchive {
            sink,
            entries,
            central_directory_offset: cd_offset,
            central_directory_size: cd_size,
            total_size: end,
        })
    }
}

impl ArchiveWriter<FileSink> {
    /// Start a new archive file at `path`.
    ///
    /// The parent directory must exist and be writable. An existing file is
    /// replaced only when `overwrite` is set.
    pub fn create_file(&mut self, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
        if self.is_open() {
            self.close()?;
        }
        let sink = open_destination(path.as_ref(), overwrite)?;
        self.create(sink)
    }
}

impl<S: Sink> Drop for ArchiveWriter<S> {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                warn!("implicit close of archive failed: {}", e);
            }
        }
    }
}

/// Fill one chunk from `source`, stopping early only at end of stream.
fn read_chunk<R: Read>(source: &mut R) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(STREAM_CHUNK_SIZE);
    source
        .by_ref()
        .take(STREAM_CHUNK_SIZE as u64)
        .read_to_end(&mut head)?;
    Ok(head)
}
