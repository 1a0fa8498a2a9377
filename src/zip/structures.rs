//! Binary layout of the ZIP structures written by this crate.
//!
//! Every structure can be built (`to_bytes`) and parsed back
//! (`from_bytes`). All integers are little-endian. The `for_entry` and
//! `for_archive` constructors take the archive's ZIP64 flag and decide
//! which fields carry real values and which carry sentinels.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

use time::OffsetDateTime;

use crate::error::{HeaderError, Result};

pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;
pub const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4b50;
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;
pub const ZIP64_EXTRA_TAG: u16 = 0x0001;

/// Host MS-DOS (upper byte 0), APPNOTE version 6.3.
pub const VERSION_MADE_BY: u16 = 63;
pub const VERSION_NEEDED: u16 = 46;

/// External attributes: MS-DOS archive bit.
pub const EXTERNAL_ATTRIBUTES: u32 = 32;

pub const SENTINEL_16: u16 = 0xFFFF;
pub const SENTINEL_32: u32 = 0xFFFF_FFFF;

/// General purpose bit flags.
pub mod gpflag {
    pub const NONE: u16 = 0x0000;
    /// Compression option bit 1.
    pub const COMP1: u16 = 0x0002;
    /// Compression option bit 2.
    pub const COMP2: u16 = 0x0004;
    /// CRC and sizes follow the data in a data descriptor.
    pub const ADD: u16 = 0x0008;
    /// File name is UTF-8.
    pub const EFS: u16 = 0x0800;
}

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMethod {
    Store,
    #[default]
    Deflate,
    Bzip2,
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(CompressionMethod::Store),
            8 => Some(CompressionMethod::Deflate),
            12 => Some(CompressionMethod::Bzip2),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Store => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Bzip2 => 12,
        }
    }
}

/// Compression level hint; only deflate honours it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    Min,
    #[default]
    Normal,
    Max,
}

impl CompressionLevel {
    /// zlib level used for deflate.
    pub fn deflate_level(&self) -> u32 {
        match self {
            CompressionLevel::Min => 1,
            CompressionLevel::Normal => 6,
            CompressionLevel::Max => 9,
        }
    }

    /// Deflate option bits of the general purpose flag.
    pub fn deflate_flags(&self) -> u16 {
        match self {
            CompressionLevel::Min => gpflag::COMP1 | gpflag::COMP2,
            CompressionLevel::Normal => gpflag::NONE,
            CompressionLevel::Max => gpflag::COMP1,
        }
    }
}

/// Pack a timestamp into the DOS format: date word in the upper 16 bits,
/// time word in the lower 16. Evaluated in UTC.
pub fn dos_datetime(time: SystemTime) -> u32 {
    let secs = match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    };
    dos_datetime_from_unix(secs)
}

pub fn dos_datetime_from_unix(secs: i64) -> u32 {
    let Ok(dt) = OffsetDateTime::from_unix_timestamp(secs) else {
        return 0;
    };
    if dt.year() < 1980 {
        return 0;
    }

    let year = (dt.year() - 1980).min(127) as u32;
    let date = (year << 9) | ((dt.month() as u32) << 5) | dt.day() as u32;
    let time =
        ((dt.hour() as u32) << 11) | ((dt.minute() as u32) << 5) | ((dt.second() as u32) >> 1);

    (date << 16) | time
}

/// Saturate a size to a classic 32-bit field.
fn classic32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(SENTINEL_32)
}

/// Little-endian byte packer.
struct Packer(Vec<u8>);

impl Packer {
    fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    fn u16(&mut self, v: u16) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u32(&mut self, v: u32) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u64(&mut self, v: u64) -> &mut Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.0.extend_from_slice(v);
        self
    }

    fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

fn check_len(structure: &'static str, data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(HeaderError::Truncated {
            structure,
            needed,
            available: data.len(),
        }
        .into());
    }
    Ok(())
}

fn read_signature(structure: &'static str, data: &[u8], expected: u32) -> Result<()> {
    let found = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if found != expected {
        return Err(HeaderError::BadSignature { structure, found }.into());
    }
    Ok(())
}

/// Find the ZIP64 block in an extra field area, skipping other tags.
fn find_zip64_extra(extra: &[u8]) -> Result<Option<Zip64ExtraField>> {
    let mut pos = 0;
    while pos + 4 <= extra.len() {
        let tag = u16::from_le_bytes([extra[pos], extra[pos + 1]]);
        let size = u16::from_le_bytes([extra[pos + 2], extra[pos + 3]]) as usize;
        if tag == ZIP64_EXTRA_TAG {
            return Zip64ExtraField::from_bytes(&extra[pos..]).map(Some);
        }
        pos += 4 + size;
    }
    Ok(None)
}

/// Values describing one entry, shared by its local header, data
/// descriptor and central directory header.
#[derive(Debug, Clone, Copy)]
pub struct EntryValues<'a> {
    pub file_name: &'a str,
    pub flags: u16,
    pub method: CompressionMethod,
    pub dos_datetime: u32,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
}

impl EntryValues<'_> {
    fn zip64_extra(&self) -> Zip64ExtraField {
        Zip64ExtraField {
            uncompressed_size: self.uncompressed_size,
            compressed_size: self.compressed_size,
            local_header_offset: self.local_header_offset,
            disk_number: 0,
        }
    }
}

/// ZIP64 extended information extra field - 32 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64ExtraField {
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub local_header_offset: u64,
    pub disk_number: u32,
}

impl Zip64ExtraField {
    pub const SIZE: usize = 32;
    /// Size of the block after tag and size fields.
    pub const BLOCK_SIZE: u16 = 28;

    pub fn to_bytes(&self) -> Vec<u8> {
        Packer::with_capacity(Self::SIZE)
            .u16(ZIP64_EXTRA_TAG)
            .u16(Self::BLOCK_SIZE)
            .u64(self.uncompressed_size)
            .u64(self.compressed_size)
            .u64(self.local_header_offset)
            .u32(self.disk_number)
            .finish()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        const NAME: &str = "ZIP64 extra field";
        check_len(NAME, data, Self::SIZE)?;

        let mut cursor = Cursor::new(data);
        let tag = cursor.read_u16::<LittleEndian>()?;
        let size = cursor.read_u16::<LittleEndian>()?;
        if tag != ZIP64_EXTRA_TAG || size != Self::BLOCK_SIZE {
            return Err(HeaderError::BadSignature {
                structure: NAME,
                found: (tag as u32) | ((size as u32) << 16),
            }
            .into());
        }

        Ok(Self {
            uncompressed_size: cursor.read_u64::<LittleEndian>()?,
            compressed_size: cursor.read_u64::<LittleEndian>()?,
            local_header_offset: cursor.read_u64::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// Local File Header (LFH) - 30 bytes plus name and extra field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub dos_datetime: u32,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name: String,
    pub zip64: Option<Zip64ExtraField>,
}

impl LocalFileHeader {
    pub const FIXED_SIZE: usize = 30;

    pub fn for_entry(values: &EntryValues<'_>, zip64: bool) -> Self {
        let (compressed_size, uncompressed_size, extra) = if zip64 {
            (SENTINEL_32, SENTINEL_32, Some(values.zip64_extra()))
        } else {
            (
                classic32(values.compressed_size),
                classic32(values.uncompressed_size),
                None,
            )
        };

        Self {
            version_needed: VERSION_NEEDED,
            flags: values.flags,
            method: values.method.as_u16(),
            dos_datetime: values.dos_datetime,
            crc32: values.crc32,
            compressed_size,
            uncompressed_size,
            file_name: values.file_name.to_owned(),
            zip64: extra,
        }
    }

    /// Encoded length for a name of `name_len` bytes.
    pub fn encoded_len(name_len: usize, zip64: bool) -> usize {
        Self::FIXED_SIZE + name_len + if zip64 { Zip64ExtraField::SIZE } else { 0 }
    }

    pub fn len(&self) -> usize {
        Self::encoded_len(self.file_name.len(), self.zip64.is_some())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let extra = self.zip64.map(|z| z.to_bytes()).unwrap_or_default();

        Packer::with_capacity(self.len())
            .u32(LOCAL_FILE_HEADER_SIGNATURE)
            .u16(self.version_needed)
            .u16(self.flags)
            .u16(self.method)
            .u32(self.dos_datetime)
            .u32(self.crc32)
            .u32(self.compressed_size)
            .u32(self.uncompressed_size)
            .u16(self.file_name.len() as u16)
            .u16(extra.len() as u16)
            .bytes(self.file_name.as_bytes())
            .bytes(&extra)
            .finish()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        const NAME: &str = "local file header";
        check_len(NAME, data, Self::FIXED_SIZE)?;
        read_signature(NAME, data, LOCAL_FILE_HEADER_SIGNATURE)?;

        let mut cursor = Cursor::new(&data[4..]);
        let version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let method = cursor.read_u16::<LittleEndian>()?;
        let dos_datetime = cursor.read_u32::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
        let name_len = cursor.read_u16::<LittleEndian>()? as usize;
        let extra_len = cursor.read_u16::<LittleEndian>()? as usize;

        let name_end = Self::FIXED_SIZE + name_len;
        check_len(NAME, data, name_end + extra_len)?;

        Ok(Self {
            version_needed,
            flags,
            method,
            dos_datetime,
            crc32,
            compressed_size,
            uncompressed_size,
            file_name: String::from_utf8_lossy(&data[Self::FIXED_SIZE..name_end]).into_owned(),
            zip64: find_zip64_extra(&data[name_end..name_end + extra_len])?,
        })
    }
}

/// Data descriptor - 16 bytes, or 24 with ZIP64 sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub zip64: bool,
}

impl DataDescriptor {
    pub const SIZE: usize = 16;
    pub const ZIP64_SIZE: usize = 24;

    pub fn for_entry(values: &EntryValues<'_>, zip64: bool) -> Self {
        Self {
            crc32: values.crc32,
            compressed_size: values.compressed_size,
            uncompressed_size: values.uncompressed_size,
            zip64,
        }
    }

    pub fn len(&self) -> usize {
        if self.zip64 {
            Self::ZIP64_SIZE
        } else {
            Self::SIZE
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packer = Packer::with_capacity(self.len());
        packer.u32(DATA_DESCRIPTOR_SIGNATURE).u32(self.crc32);
        if self.zip64 {
            packer.u64(self.compressed_size).u64(self.uncompressed_size);
        } else {
            packer
                .u32(classic32(self.compressed_size))
                .u32(classic32(self.uncompressed_size));
        }
        packer.finish()
    }

    /// Parse a descriptor; the width is not self-describing, so the caller
    /// says which one to expect.
    pub fn from_bytes(data: &[u8], zip64: bool) -> Result<Self> {
        const NAME: &str = "data descriptor";
        check_len(NAME, data, if zip64 { Self::ZIP64_SIZE } else { Self::SIZE })?;
        read_signature(NAME, data, DATA_DESCRIPTOR_SIGNATURE)?;

        let mut cursor = Cursor::new(&data[4..]);
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let (compressed_size, uncompressed_size) = if zip64 {
            (
                cursor.read_u64::<LittleEndian>()?,
                cursor.read_u64::<LittleEndian>()?,
            )
        } else {
            (
                cursor.read_u32::<LittleEndian>()? as u64,
                cursor.read_u32::<LittleEndian>()? as u64,
            )
        };

        Ok(Self {
            crc32,
            compressed_size,
            uncompressed_size,
            zip64,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes plus name and extra field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub dos_datetime: u32,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub local_header_offset: u32,
    pub file_name: String,
    pub zip64: Option<Zip64ExtraField>,
}

impl CentralDirectoryHeader {
    pub const FIXED_SIZE: usize = 46;

    pub fn for_entry(values: &EntryValues<'_>, zip64: bool) -> Self {
        let (compressed_size, uncompressed_size, disk_number_start, offset, extra) = if zip64 {
            // The true values live only in the extra field.
            (
                SENTINEL_32,
                SENTINEL_32,
                SENTINEL_16,
                SENTINEL_32,
                Some(values.zip64_extra()),
            )
        } else {
            (
                classic32(values.compressed_size),
                classic32(values.uncompressed_size),
                0,
                classic32(values.local_header_offset),
                None,
            )
        };

        Self {
            version_made_by: VERSION_MADE_BY,
            version_needed: VERSION_NEEDED,
            flags: values.flags,
            method: values.method.as_u16(),
            dos_datetime: values.dos_datetime,
            crc32: values.crc32,
            compressed_size,
            uncompressed_size,
            disk_number_start,
            internal_attrs: 0,
            external_attrs: EXTERNAL_ATTRIBUTES,
            local_header_offset: offset,
            file_name: values.file_name.to_owned(),
            zip64: extra,
        }
    }

    pub fn len(&self) -> usize {
        Self::FIXED_SIZE
            + self.file_name.len()
            + if self.zip64.is_some() {
                Zip64ExtraField::SIZE
            } else {
                0
            }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let extra = self.zip64.map(|z| z.to_bytes()).unwrap_or_default();

        Packer::with_capacity(self.len())
            .u32(CENTRAL_DIRECTORY_SIGNATURE)
            .u16(self.version_made_by)
            .u16(self.version_needed)
            .u16(self.flags)
            .u16(self.method)
            .u32(self.dos_datetime)
            .u32(self.crc32)
            .u32(self.compressed_size)
            .u32(self.uncompressed_size)
            .u16(self.file_name.len() as u16)
            .u16(extra.len() as u16)
            .u16(0) // comment length
            .u16(self.disk_number_start)
            .u16(self.internal_attrs)
            .u32(self.external_attrs)
            .u32(self.local_header_offset)
            .bytes(self.file_name.as_bytes())
            .bytes(&extra)
            .finish()
    }

    /// Parse one header; returns it with its encoded length so callers can
    /// walk a concatenated central directory.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize)> {
        const NAME: &str = "central directory header";
        check_len(NAME, data, Self::FIXED_SIZE)?;
        read_signature(NAME, data, CENTRAL_DIRECTORY_SIGNATURE)?;

        let mut cursor = Cursor::new(&data[4..]);
        let version_made_by = cursor.read_u16::<LittleEndian>()?;
        let version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let method = cursor.read_u16::<LittleEndian>()?;
        let dos_datetime = cursor.read_u32::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
        let name_len = cursor.read_u16::<LittleEndian>()? as usize;
        let extra_len = cursor.read_u16::<LittleEndian>()? as usize;
        let comment_len = cursor.read_u16::<LittleEndian>()? as usize;
        let disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let external_attrs = cursor.read_u32::<LittleEndian>()?;
        let local_header_offset = cursor.read_u32::<LittleEndian>()?;

        let name_end = Self::FIXED_SIZE + name_len;
        let extra_end = name_end + extra_len;
        let total = extra_end + comment_len;
        check_len(NAME, data, total)?;

        let header = Self {
            version_made_by,
            version_needed,
            flags,
            method,
            dos_datetime,
            crc32,
            compressed_size,
            uncompressed_size,
            disk_number_start,
            internal_attrs,
            external_attrs,
            local_header_offset,
            file_name: String::from_utf8_lossy(&data[Self::FIXED_SIZE..name_end]).into_owned(),
            zip64: find_zip64_extra(&data[name_end..extra_end])?,
        };
        Ok((header, total))
    }
}

/// ZIP64 End of Central Directory - 56 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIZE: usize = 56;
    /// Record size as stored: everything after the size field itself.
    pub const RECORD_SIZE: u64 = 44;

    pub fn for_archive(entries: u64, cd_size: u64, cd_offset: u64) -> Self {
        Self {
            eocd64_size: Self::RECORD_SIZE,
            version_made_by: VERSION_MADE_BY,
            version_needed: VERSION_NEEDED,
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: entries,
            total_entries: entries,
            cd_size,
            cd_offset,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        Packer::with_capacity(Self::SIZE)
            .u32(ZIP64_EOCD_SIGNATURE)
            .u64(self.eocd64_size)
            .u16(self.version_made_by)
            .u16(self.version_needed)
            .u32(self.disk_number)
            .u32(self.disk_with_cd)
            .u64(self.disk_entries)
            .u64(self.total_entries)
            .u64(self.cd_size)
            .u64(self.cd_offset)
            .finish()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        const NAME: &str = "ZIP64 end of central directory record";
        check_len(NAME, data, Self::SIZE)?;
        read_signature(NAME, data, ZIP64_EOCD_SIGNATURE)?;

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>()?,
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            disk_with_cd: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIZE: usize = 20;

    /// The ZIP64 record is written directly after the central directory.
    pub fn for_archive(cd_size: u64, cd_offset: u64) -> Self {
        Self {
            disk_with_eocd64: 0,
            eocd64_offset: cd_offset + cd_size,
            total_disks: 1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        Packer::with_capacity(Self::SIZE)
            .u32(ZIP64_LOCATOR_SIGNATURE)
            .u32(self.disk_with_eocd64)
            .u64(self.eocd64_offset)
            .u32(self.total_disks)
            .finish()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        const NAME: &str = "ZIP64 end of central directory locator";
        check_len(NAME, data, Self::SIZE)?;
        read_signature(NAME, data, ZIP64_LOCATOR_SIGNATURE)?;

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// End of Central Directory (EOCD) - 22 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIZE: usize = 22;

    /// With ZIP64 on every field is a sentinel pointing at the ZIP64 record.
    pub fn for_archive(entries: u64, cd_size: u64, cd_offset: u64, zip64: bool) -> Self {
        if zip64 {
            return Self {
                disk_number: SENTINEL_16,
                disk_with_cd: SENTINEL_16,
                disk_entries: SENTINEL_16,
                total_entries: SENTINEL_16,
                cd_size: SENTINEL_32,
                cd_offset: SENTINEL_32,
                comment_len: 0,
            };
        }

        let entries = u16::try_from(entries).unwrap_or(SENTINEL_16);
        Self {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: entries,
            total_entries: entries,
            cd_size: classic32(cd_size),
            cd_offset: classic32(cd_offset),
            comment_len: 0,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        Packer::with_capacity(Self::SIZE)
            .u32(EOCD_SIGNATURE)
            .u16(self.disk_number)
            .u16(self.disk_with_cd)
            .u16(self.disk_entries)
            .u16(self.total_entries)
            .u32(self.cd_size)
            .u32(self.cd_offset)
            .u16(self.comment_len)
            .finish()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        const NAME: &str = "end of central directory record";
        check_len(NAME, data, Self::SIZE)?;
        read_signature(NAME, data, EOCD_SIGNATURE)?;

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == SENTINEL_16
            || self.total_entries == SENTINEL_16
            || self.cd_size == SENTINEL_32
            || self.cd_offset == SENTINEL_32
    }
}

/// The structures a [`HeaderObserver`](super::HeaderObserver) can be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    LocalFileHeader,
    DataDescriptor,
    CentralDirectoryHeader,
    Zip64EndOfCentralDirectory,
    Zip64EndOfCentralDirectoryLocator,
    EndOfCentralDirectory,
}

/// One field of a header layout. `width == 0` marks a variable-length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub width: usize,
}

const fn field(name: &'static str, width: usize) -> Field {
    Field { name, width }
}

const LFH_FIELDS: &[Field] = &[
    field("local file header signature", 4),
    field("version needed to extract", 2),
    field("general purpose bit flag", 2),
    field("compression method", 2),
    field("last mod file time + date", 4),
    field("crc-32", 4),
    field("compressed size", 4),
    field("uncompressed size", 4),
    field("file name length", 2),
    field("extra field length", 2),
    field("file name", 0),
    field("extra field", 0),
];

const DD_FIELDS: &[Field] = &[
    field("data descriptor signature", 4),
    field("crc-32", 4),
    field("compressed size", 0),
    field("uncompressed size", 0),
];

const CDH_FIELDS: &[Field] = &[
    field("central file header signature", 4),
    field("version made by", 2),
    field("version needed to extract", 2),
    field("general purpose bit flag", 2),
    field("compression method", 2),
    field("last mod file time + date", 4),
    field("crc-32", 4),
    field("compressed size", 4),
    field("uncompressed size", 4),
    field("file name length", 2),
    field("extra field length", 2),
    field("file comment length", 2),
    field("disk number start", 2),
    field("internal file attributes", 2),
    field("external file attributes", 4),
    field("relative offset of local header", 4),
    field("file name", 0),
    field("extra field", 0),
    field("file comment", 0),
];

const ZIP64_EOCD_FIELDS: &[Field] = &[
    field("zip64 end of central dir signature", 4),
    field("size of zip64 end of central directory record", 8),
    field("version made by", 2),
    field("version needed to extract", 2),
    field("number of this disk", 4),
    field("disk with start of central directory", 4),
    field("entries on this disk", 8),
    field("total entries", 8),
    field("size of the central directory", 8),
    field("offset of start of central directory", 8),
];

const ZIP64_LOCATOR_FIELDS: &[Field] = &[
    field("zip64 end of central dir locator signature", 4),
    field("disk with zip64 end of central directory", 4),
    field("offset of zip64 end of central directory", 8),
    field("total number of disks", 4),
];

const EOCD_FIELDS: &[Field] = &[
    field("end of central dir signature", 4),
    field("number of this disk", 2),
    field("disk with start of central directory", 2),
    field("entries on this disk", 2),
    field("total entries", 2),
    field("size of the central directory", 4),
    field("offset of start of central directory", 4),
    field("ZIP file comment length", 2),
];

impl HeaderKind {
    pub fn name(&self) -> &'static str {
        match self {
            HeaderKind::LocalFileHeader => "LOCAL FILE HEADER",
            HeaderKind::DataDescriptor => "DATA DESCRIPTOR",
            HeaderKind::CentralDirectoryHeader => "CENTRAL DIRECTORY HEADER",
            HeaderKind::Zip64EndOfCentralDirectory => "ZIP64 END OF CENTRAL DIRECTORY RECORD",
            HeaderKind::Zip64EndOfCentralDirectoryLocator => {
                "ZIP64 END OF CENTRAL DIRECTORY LOCATOR"
            }
            HeaderKind::EndOfCentralDirectory => "END OF CENTRAL DIRECTORY RECORD",
        }
    }

    /// Field layout in write order.
    pub fn fields(&self) -> &'static [Field] {
        match self {
            HeaderKind::LocalFileHeader => LFH_FIELDS,
            HeaderKind::DataDescriptor => DD_FIELDS,
            HeaderKind::CentralDirectoryHeader => CDH_FIELDS,
            HeaderKind::Zip64EndOfCentralDirectory => ZIP64_EOCD_FIELDS,
            HeaderKind::Zip64EndOfCentralDirectoryLocator => ZIP64_LOCATOR_FIELDS,
            HeaderKind::EndOfCentralDirectory => EOCD_FIELDS,
        }
    }
}
