//! Independent ZIP reader used to check written archives.
//!
//! Reads the archive from its end the way an unzip tool does: end of
//! central directory, then the ZIP64 records when present, then the central
//! directory, then each member's local header and data.

#![allow(dead_code)]

use byteorder::{LittleEndian, ReadBytesExt};
use bzip2::read::BzDecoder;
use flate2::read::DeflateDecoder;
use std::io::{Cursor, Read};

pub const EOCD_SIZE: usize = 22;
pub const LOCATOR_SIZE: usize = 20;
pub const EOCD64_SIZE: usize = 56;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eocd {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eocd64 {
    pub record_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
    /// Offset stored in the locator.
    pub locator_target: u64,
    /// Where the record actually is.
    pub record_offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub dos_time: u16,
    pub dos_date: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub external_attrs: u32,
    pub local_header_offset: u64,
    /// Raw 32-bit size fields, to check for sentinels.
    pub raw_sizes: (u32, u32),
    pub has_zip64_extra: bool,
}

#[derive(Debug)]
pub struct Archive {
    pub bytes: Vec<u8>,
    pub eocd: Eocd,
    pub eocd64: Option<Eocd64>,
    pub members: Vec<Member>,
}

impl Archive {
    pub fn parse(bytes: Vec<u8>) -> Archive {
        assert!(bytes.len() >= EOCD_SIZE, "archive too short");
        let eocd_offset = bytes.len() - EOCD_SIZE;
        let eocd = parse_eocd(&bytes[eocd_offset..]);

        let is_zip64 = eocd.total_entries == 0xFFFF
            || eocd.cd_size == 0xFFFF_FFFF
            || eocd.cd_offset == 0xFFFF_FFFF;

        let (eocd64, cd_offset, cd_size, entries) = if is_zip64 {
            let record = parse_eocd64(&bytes, eocd_offset);
            (
                Some(record),
                record.cd_offset,
                record.cd_size,
                record.total_entries,
            )
        } else {
            (
                None,
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        let cd = &bytes[cd_offset as usize..(cd_offset + cd_size) as usize];
        let mut cursor = Cursor::new(cd);
        let members = (0..entries).map(|_| parse_cdfh(&mut cursor)).collect();
        assert_eq!(cursor.position(), cd_size, "central directory size mismatch");

        Archive {
            bytes,
            eocd,
            eocd64,
            members,
        }
    }

    pub fn member(&self, name: &str) -> &Member {
        self.members
            .iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| panic!("no member named {name}"))
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    /// Offset of the member's data, from its local header.
    pub fn data_offset(&self, member: &Member) -> usize {
        let start = member.local_header_offset as usize;
        let mut cursor = Cursor::new(&self.bytes[start..]);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 0x0403_4b50);
        cursor.set_position(26);
        let name_len = cursor.read_u16::<LittleEndian>().unwrap() as usize;
        let extra_len = cursor.read_u16::<LittleEndian>().unwrap() as usize;
        start + 30 + name_len + extra_len
    }

    pub fn local_header(&self, member: &Member) -> LocalHeader {
        let start = member.local_header_offset as usize;
        let mut cursor = Cursor::new(&self.bytes[start..]);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 0x0403_4b50);
        let _version_needed = cursor.read_u16::<LittleEndian>().unwrap();
        let flags = cursor.read_u16::<LittleEndian>().unwrap();
        let method = cursor.read_u16::<LittleEndian>().unwrap();
        let _time = cursor.read_u16::<LittleEndian>().unwrap();
        let _date = cursor.read_u16::<LittleEndian>().unwrap();
        let crc32 = cursor.read_u32::<LittleEndian>().unwrap();
        let compressed_size = cursor.read_u32::<LittleEndian>().unwrap();
        let uncompressed_size = cursor.read_u32::<LittleEndian>().unwrap();
        let name_len = cursor.read_u16::<LittleEndian>().unwrap() as usize;
        let extra_len = cursor.read_u16::<LittleEndian>().unwrap() as usize;
        let mut name = vec![0u8; name_len];
        cursor.read_exact(&mut name).unwrap();

        LocalHeader {
            flags,
            method,
            crc32,
            compressed_size,
            uncompressed_size,
            name: String::from_utf8(name).unwrap(),
            extra_len,
        }
    }

    /// The data descriptor following the member's data, if any.
    pub fn data_descriptor(&self, member: &Member) -> Option<Descriptor> {
        let end = self.data_offset(member) + member.compressed_size as usize;
        let mut cursor = Cursor::new(&self.bytes[end..]);
        if cursor.read_u32::<LittleEndian>().ok()? != 0x0807_4b50 {
            return None;
        }
        let crc32 = cursor.read_u32::<LittleEndian>().unwrap();
        let (compressed_size, uncompressed_size) = if self.eocd64.is_some() {
            (
                cursor.read_u64::<LittleEndian>().unwrap(),
                cursor.read_u64::<LittleEndian>().unwrap(),
            )
        } else {
            (
                cursor.read_u32::<LittleEndian>().unwrap() as u64,
                cursor.read_u32::<LittleEndian>().unwrap() as u64,
            )
        };
        Some(Descriptor {
            crc32,
            compressed_size,
            uncompressed_size,
        })
    }

    /// Decompressed contents of a member, CRC-checked.
    pub fn read(&self, name: &str) -> Vec<u8> {
        let member = self.member(name);
        let start = self.data_offset(member);
        let data = &self.bytes[start..start + member.compressed_size as usize];

        let mut out = Vec::new();
        match member.method {
            0 => out.extend_from_slice(data),
            8 => {
                DeflateDecoder::new(data).read_to_end(&mut out).unwrap();
            }
            12 => {
                BzDecoder::new(data).read_to_end(&mut out).unwrap();
            }
            other => panic!("unsupported method {other}"),
        }

        assert_eq!(out.len() as u64, member.uncompressed_size);
        assert_eq!(crc32fast::hash(&out), member.crc32, "crc mismatch for {name}");
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeader {
    pub flags: u16,
    pub method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: String,
    pub extra_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

fn parse_eocd(data: &[u8]) -> Eocd {
    let mut cursor = Cursor::new(data);
    assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 0x0605_4b50);
    let eocd = Eocd {
        disk_number: cursor.read_u16::<LittleEndian>().unwrap(),
        disk_with_cd: cursor.read_u16::<LittleEndian>().unwrap(),
        disk_entries: cursor.read_u16::<LittleEndian>().unwrap(),
        total_entries: cursor.read_u16::<LittleEndian>().unwrap(),
        cd_size: cursor.read_u32::<LittleEndian>().unwrap(),
        cd_offset: cursor.read_u32::<LittleEndian>().unwrap(),
    };
    let comment_len = cursor.read_u16::<LittleEndian>().unwrap();
    assert_eq!(comment_len, 0);
    eocd
}

fn parse_eocd64(bytes: &[u8], eocd_offset: usize) -> Eocd64 {
    let locator_offset = eocd_offset - LOCATOR_SIZE;
    let mut cursor = Cursor::new(&bytes[locator_offset..eocd_offset]);
    assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 0x0706_4b50);
    let _disk = cursor.read_u32::<LittleEndian>().unwrap();
    let locator_target = cursor.read_u64::<LittleEndian>().unwrap();
    let total_disks = cursor.read_u32::<LittleEndian>().unwrap();
    assert_eq!(total_disks, 1);

    let record_offset = locator_offset - EOCD64_SIZE;
    let mut cursor = Cursor::new(&bytes[record_offset..locator_offset]);
    assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 0x0606_4b50);
    let record_size = cursor.read_u64::<LittleEndian>().unwrap();
    let version_made_by = cursor.read_u16::<LittleEndian>().unwrap();
    let version_needed = cursor.read_u16::<LittleEndian>().unwrap();
    let _disk = cursor.read_u32::<LittleEndian>().unwrap();
    let _disk_with_cd = cursor.read_u32::<LittleEndian>().unwrap();
    let disk_entries = cursor.read_u64::<LittleEndian>().unwrap();
    let total_entries = cursor.read_u64::<LittleEndian>().unwrap();
    assert_eq!(disk_entries, total_entries);

    Eocd64 {
        record_size,
        version_made_by,
        version_needed,
        total_entries,
        cd_size: cursor.read_u64::<LittleEndian>().unwrap(),
        cd_offset: cursor.read_u64::<LittleEndian>().unwrap(),
        locator_target,
        record_offset: record_offset as u64,
    }
}

fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Member {
    assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 0x0201_4b50);
    let version_made_by = cursor.read_u16::<LittleEndian>().unwrap();
    let version_needed = cursor.read_u16::<LittleEndian>().unwrap();
    let flags = cursor.read_u16::<LittleEndian>().unwrap();
    let method = cursor.read_u16::<LittleEndian>().unwrap();
    let dos_time = cursor.read_u16::<LittleEndian>().unwrap();
    let dos_date = cursor.read_u16::<LittleEndian>().unwrap();
    let crc32 = cursor.read_u32::<LittleEndian>().unwrap();
    let raw_compressed = cursor.read_u32::<LittleEndian>().unwrap();
    let raw_uncompressed = cursor.read_u32::<LittleEndian>().unwrap();
    let name_len = cursor.read_u16::<LittleEndian>().unwrap() as usize;
    let extra_len = cursor.read_u16::<LittleEndian>().unwrap() as u64;
    let comment_len = cursor.read_u16::<LittleEndian>().unwrap() as i64;
    let _disk_number_start = cursor.read_u16::<LittleEndian>().unwrap();
    let _internal_attrs = cursor.read_u16::<LittleEndian>().unwrap();
    let external_attrs = cursor.read_u32::<LittleEndian>().unwrap();
    let raw_offset = cursor.read_u32::<LittleEndian>().unwrap();

    let mut name = vec![0u8; name_len];
    cursor.read_exact(&mut name).unwrap();

    let mut compressed_size = raw_compressed as u64;
    let mut uncompressed_size = raw_uncompressed as u64;
    let mut local_header_offset = raw_offset as u64;
    let mut has_zip64_extra = false;

    let extra_end = cursor.position() + extra_len;
    while cursor.position() + 4 <= extra_end {
        let header_id = cursor.read_u16::<LittleEndian>().unwrap();
        let field_size = cursor.read_u16::<LittleEndian>().unwrap() as u64;
        let field_end = cursor.position() + field_size;

        if header_id == 0x0001 {
            has_zip64_extra = true;
            // Values are present only for fields set to 0xFFFFFFFF
            if raw_uncompressed == 0xFFFF_FFFF {
                uncompressed_size = cursor.read_u64::<LittleEndian>().unwrap();
            }
            if raw_compressed == 0xFFFF_FFFF {
                compressed_size = cursor.read_u64::<LittleEndian>().unwrap();
            }
            if raw_offset == 0xFFFF_FFFF {
                local_header_offset = cursor.read_u64::<LittleEndian>().unwrap();
            }
        }
        cursor.set_position(field_end);
    }
    cursor.set_position(extra_end);
    cursor.set_position((cursor.position() as i64 + comment_len) as u64);

    Member {
        name: String::from_utf8(name).unwrap(),
        version_made_by,
        version_needed,
        flags,
        method,
        dos_time,
        dos_date,
        crc32,
        compressed_size,
        uncompressed_size,
        external_attrs,
        local_header_offset,
        raw_sizes: (raw_compressed, raw_uncompressed),
        has_zip64_extra,
    }
}
