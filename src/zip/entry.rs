//! Construction of a single archive member.
//!
//! An [`Entry`] knows everything about a member except its checksum and
//! sizes, so it can only produce the provisional local header. Once its
//! data has been compressed it becomes a [`CompletedEntry`], which builds
//! the final local header, the data descriptor and the central directory
//! record.

use log::trace;
use std::io::Read;

use super::compress::{self, Digest};
use super::structures::{
    gpflag, CentralDirectoryHeader, CompressionLevel, CompressionMethod, DataDescriptor,
    EntryValues, HeaderKind, LocalFileHeader,
};
use super::writer::{HeaderObserver, ZipFeatures};
use crate::error::{ArchiveError, Result};
use crate::io::Sink;

/// An archive member whose data has not been written yet.
#[derive(Debug)]
pub(crate) struct Entry {
    name: String,
    method: CompressionMethod,
    level: CompressionLevel,
    flags: u16,
    dos_datetime: u32,
    offset: u64,
}

impl Entry {
    /// `name` must already be sanitized; `offset` is the absolute sink
    /// position of the local header.
    pub fn new(
        name: String,
        method: CompressionMethod,
        level: CompressionLevel,
        dos_datetime: u32,
        offset: u64,
        streaming: bool,
    ) -> Self {
        let mut flags = if streaming { gpflag::ADD } else { gpflag::NONE };
        if method == CompressionMethod::Deflate {
            flags |= level.deflate_flags();
        }
        if !name.is_ascii() {
            flags |= gpflag::EFS;
        }

        Self {
            name,
            method,
            level,
            flags,
            dos_datetime,
            offset,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn values(&self, digest: &Digest) -> EntryValues<'_> {
        EntryValues {
            file_name: &self.name,
            flags: self.flags,
            method: self.method,
            dos_datetime: self.dos_datetime,
            crc32: digest.crc32,
            compressed_size: digest.compressed_size,
            uncompressed_size: digest.uncompressed_size,
            local_header_offset: self.offset,
        }
    }

    /// Local header with zero CRC and sizes.
    pub fn provisional_local_header(&self, zip64: bool) -> LocalFileHeader {
        let zero = Digest {
            crc32: 0,
            uncompressed_size: 0,
            compressed_size: 0,
        };
        LocalFileHeader::for_entry(&self.values(&zero), zip64)
    }

    pub fn local_header_len(&self, zip64: bool) -> u64 {
        LocalFileHeader::encoded_len(self.name.len(), zip64) as u64
    }

    pub fn complete(self, digest: Digest) -> CompletedEntry {
        CompletedEntry {
            entry: self,
            digest,
        }
    }
}

/// An archive member with known checksum and sizes.
#[derive(Debug)]
pub(crate) struct CompletedEntry {
    entry: Entry,
    digest: Digest,
}

impl CompletedEntry {
    fn values(&self) -> EntryValues<'_> {
        self.entry.values(&self.digest)
    }

    pub fn local_header(&self, zip64: bool) -> LocalFileHeader {
        LocalFileHeader::for_entry(&self.values(), zip64)
    }

    pub fn data_descriptor(&self, zip64: bool) -> DataDescriptor {
        DataDescriptor::for_entry(&self.values(), zip64)
    }

    pub fn central_directory_header(&self, zip64: bool) -> CentralDirectoryHeader {
        CentralDirectoryHeader::for_entry(&self.values(), zip64)
    }

    /// Without ZIP64 every size must fit its 32-bit field, and
    /// `0xFFFFFFFF` is taken by the ZIP64 sentinel.
    fn check_classic_limits(&self) -> Result<()> {
        let limit = u32::MAX as u64;
        let field = if self.digest.uncompressed_size >= limit {
            "uncompressed size"
        } else if self.digest.compressed_size >= limit {
            "compressed size"
        } else {
            return Ok(());
        };

        Err(ArchiveError::Zip64Required {
            path: self.entry.name.clone(),
            field,
        }
        .into())
    }
}

/// What an entry left behind in the archive.
#[derive(Debug)]
pub(crate) struct WrittenEntry {
    /// This entry's central directory record.
    pub central_directory: Vec<u8>,
    /// Sink offset right after the entry's last byte.
    pub end_offset: u64,
    pub digest: Digest,
}

/// Writes one entry into a borrowed sink.
pub(crate) struct EntryWriter<'a, S: Sink> {
    sink: &'a mut S,
    features: ZipFeatures,
    observer: Option<&'a mut Box<dyn HeaderObserver>>,
}

impl<'a, S: Sink> EntryWriter<'a, S> {
    pub fn new(
        sink: &'a mut S,
        features: ZipFeatures,
        observer: Option<&'a mut Box<dyn HeaderObserver>>,
    ) -> Self {
        Self {
            sink,
            features,
            observer,
        }
    }

    fn notify(&mut self, kind: HeaderKind, offset: u64, bytes: &[u8]) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_header(kind, Some(offset), bytes);
        }
    }

    /// Write `entry` with the data read from `source`.
    ///
    /// Seekable sinks get the local header patched in place once the data is
    /// written; in streaming mode a provisional header goes out first and a
    /// data descriptor follows the data. Either way the sink is left right
    /// after the entry.
    pub fn write<R: Read>(mut self, entry: Entry, source: R) -> Result<WrittenEntry> {
        let zip64 = self.features.zip64;
        let start = entry.offset;

        let data_start = if self.features.streaming {
            let header = entry.provisional_local_header(zip64).to_bytes();
            self.sink.write_all(&header)?;
            self.notify(HeaderKind::LocalFileHeader, start, &header);
            start + header.len() as u64
        } else {
            let data_start = start + entry.local_header_len(zip64);
            self.sink.seek_to(data_start)?;
            data_start
        };

        let digest = compress::compress(entry.method, entry.level, source, &mut *self.sink)?;
        let entry = entry.complete(digest);
        if !zip64 {
            entry.check_classic_limits()?;
        }

        let mut end_offset = data_start + digest.compressed_size;
        if self.features.streaming {
            let descriptor = entry.data_descriptor(zip64).to_bytes();
            self.sink.write_all(&descriptor)?;
            self.notify(HeaderKind::DataDescriptor, end_offset, &descriptor);
            end_offset += descriptor.len() as u64;
        } else {
            let header = entry.local_header(zip64).to_bytes();
            self.sink.seek_to(start)?;
            self.sink.write_all(&header)?;
            self.sink.seek_to(end_offset)?;
            self.notify(HeaderKind::LocalFileHeader, start, &header);
        }

        trace!(
            "{}: offset {}, {} -> {} bytes, crc32 {:08x}",
            entry.entry.name,
            start,
            digest.uncompressed_size,
            digest.compressed_size,
            digest.crc32
        );

        let central_directory = entry.central_directory_header(zip64).to_bytes();
        if let Some(observer) = self.observer.as_mut() {
            observer.on_header(HeaderKind::CentralDirectoryHeader, None, &central_directory);
        }

        Ok(WrittenEntry {
            central_directory,
            end_offset,
            digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn entry(name: &str, method: CompressionMethod, level: CompressionLevel, streaming: bool) -> Entry {
        Entry::new(name.to_string(), method, level, 0, 0, streaming)
    }

    #[test]
    fn flags_follow_mode_and_level() {
        let e = entry("a", CompressionMethod::Deflate, CompressionLevel::Min, true);
        assert_eq!(e.flags, gpflag::ADD | gpflag::COMP1 | gpflag::COMP2);

        let e = entry("a", CompressionMethod::Deflate, CompressionLevel::Max, false);
        assert_eq!(e.flags, gpflag::COMP1);

        let e = entry("a", CompressionMethod::Deflate, CompressionLevel::Normal, false);
        assert_eq!(e.flags, gpflag::NONE);

        // level bits are deflate-only
        let e = entry("a", CompressionMethod::Bzip2, CompressionLevel::Min, false);
        assert_eq!(e.flags, gpflag::NONE);

        let e = entry("ä.txt", CompressionMethod::Store, CompressionLevel::Normal, false);
        assert_eq!(e.flags, gpflag::EFS);
    }

    #[test]
    fn provisional_header_has_zero_sizes() {
        let e = entry("a.txt", CompressionMethod::Store, CompressionLevel::Normal, true);
        let header = e.provisional_local_header(false);
        assert_eq!(header.crc32, 0);
        assert_eq!(header.compressed_size, 0);
        assert_eq!(header.uncompressed_size, 0);
        assert_eq!(e.local_header_len(false), 35);
        assert_eq!(e.local_header_len(true), 67);
    }

    #[test]
    fn seekable_write_patches_header() {
        let mut sink = Cursor::new(Vec::new());
        let features = ZipFeatures {
            zip64: false,
            streaming: false,
        };
        let e = entry("a.txt", CompressionMethod::Store, CompressionLevel::Normal, false);

        let written = EntryWriter::new(&mut sink, features, None)
            .write(e, &b"hello"[..])
            .unwrap();

        let bytes = sink.into_inner();
        assert_eq!(written.end_offset, 35 + 5);
        assert_eq!(bytes.len(), 40);

        let header = LocalFileHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.crc32, crc32fast::hash(b"hello"));
        assert_eq!(header.uncompressed_size, 5);
        assert_eq!(&bytes[35..], b"hello");

        let (central, _) = CentralDirectoryHeader::from_bytes(&written.central_directory).unwrap();
        assert_eq!(central.crc32, header.crc32);
        assert_eq!(central.local_header_offset, 0);
    }

    #[test]
    fn streaming_write_appends_descriptor() {
        let mut sink = Cursor::new(Vec::new());
        let features = ZipFeatures {
            zip64: true,
            streaming: true,
        };
        let e = entry("a.txt", CompressionMethod::Store, CompressionLevel::Normal, true);

        let written = EntryWriter::new(&mut sink, features, None)
            .write(e, &b"hello"[..])
            .unwrap();

        let bytes = sink.into_inner();
        assert_eq!(written.end_offset, bytes.len() as u64);
        assert_eq!(bytes.len(), 67 + 5 + 24);

        let header = LocalFileHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.crc32, 0);
        assert_eq!(header.flags & gpflag::ADD, gpflag::ADD);

        let descriptor = DataDescriptor::from_bytes(&bytes[72..], true).unwrap();
        assert_eq!(descriptor.crc32, crc32fast::hash(b"hello"));
        assert_eq!(descriptor.compressed_size, 5);
        assert_eq!(descriptor.uncompressed_size, 5);
    }

    fn completed(uncompressed_size: u64, compressed_size: u64) -> CompletedEntry {
        entry("big.bin", CompressionMethod::Store, CompressionLevel::Normal, false).complete(
            Digest {
                crc32: 0,
                uncompressed_size,
                compressed_size,
            },
        )
    }

    fn limit_field(entry: &CompletedEntry) -> Option<&'static str> {
        match entry.check_classic_limits() {
            Ok(()) => None,
            Err(crate::Error::Archive(ArchiveError::Zip64Required { path, field })) => {
                assert_eq!(path, "big.bin");
                Some(field)
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn classic_limits_reject_oversized_entries() {
        let max = u32::MAX as u64;

        assert_eq!(limit_field(&completed(max - 1, max - 1)), None);
        assert_eq!(
            limit_field(&completed(max + 1, 10)),
            Some("uncompressed size")
        );
        assert_eq!(limit_field(&completed(10, max + 1)), Some("compressed size"));
    }

    #[test]
    fn classic_limits_reserve_the_sentinel() {
        let max = u32::MAX as u64;

        assert_eq!(limit_field(&completed(max, 10)), Some("uncompressed size"));
        assert_eq!(limit_field(&completed(10, max)), Some("compressed size"));
    }
}
