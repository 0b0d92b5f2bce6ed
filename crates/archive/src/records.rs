//! ZIP record layouts (PKZIP APPNOTE 6.3, sections 4.3.7 to 4.3.16).
//!
//! Only what a streaming writer needs: local headers with the "sizes follow
//! in a data descriptor" flag, signed data descriptors, central directory
//! headers and the end of central directory record. All integers are
//! little-endian.

use bytes::{BufMut, Bytes, BytesMut};
use time::{OffsetDateTime, UtcOffset};

pub(crate) const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
pub(crate) const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;
pub(crate) const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
pub(crate) const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

/// 2.0: deflate compression.
const VERSION_NEEDED: u16 = 20;
/// Bit 3 (CRC and sizes in data descriptor) and bit 11 (UTF-8 names).
const GENERAL_PURPOSE_FLAGS: u16 = 0x0008 | 0x0800;
const METHOD_DEFLATE: u16 = 8;

const LOCAL_HEADER_LEN: usize = 30;
const DATA_DESCRIPTOR_LEN: usize = 16;
const CENTRAL_HEADER_LEN: usize = 46;
const END_OF_CENTRAL_DIRECTORY_LEN: usize = 22;

/// MS-DOS packed date and time, the only timestamp the base format knows.
///
/// Two-second resolution, years 1980 to 2107. Anything earlier is clamped to
/// 1980-01-01 00:00:00, anything later to the last representable year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DosTimestamp {
    pub time: u16,
    pub date: u16,
}
impl From<OffsetDateTime> for DosTimestamp {
    fn from(value: OffsetDateTime) -> Self {
        let value = value.to_offset(UtcOffset::UTC);
        if value.year() < 1980 {
            return Self { time: 0, date: (1 << 5) | 1 };
        }
        let year = (value.year().min(2107) - 1980) as u16;
        let month = u8::from(value.month()) as u16;
        let date = (year << 9) | (month << 5) | value.day() as u16;
        let time = ((value.hour() as u16) << 11) | ((value.minute() as u16) << 5) | (value.second() as u16 / 2);
        Self { time, date }
    }
}

/// Everything the central directory needs to know about a written entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EntryRecord {
    pub name: String,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub header_offset: u32,
}

pub(crate) fn local_header(name: &str, stamp: DosTimestamp) -> Bytes {
    let mut buf = BytesMut::with_capacity(LOCAL_HEADER_LEN + name.len());
    buf.put_u32_le(LOCAL_FILE_HEADER_SIGNATURE);
    buf.put_u16_le(VERSION_NEEDED);
    buf.put_u16_le(GENERAL_PURPOSE_FLAGS);
    buf.put_u16_le(METHOD_DEFLATE);
    buf.put_u16_le(stamp.time);
    buf.put_u16_le(stamp.date);
    // CRC-32, compressed and uncompressed sizes are deferred to the
    // data descriptor.
    buf.put_u32_le(0);
    buf.put_u32_le(0);
    buf.put_u32_le(0);
    buf.put_u16_le(name.len() as u16);
    buf.put_u16_le(0);
    buf.put_slice(name.as_bytes());
    buf.freeze()
}

pub(crate) fn data_descriptor(record: &EntryRecord) -> Bytes {
    let mut buf = BytesMut::with_capacity(DATA_DESCRIPTOR_LEN);
    buf.put_u32_le(DATA_DESCRIPTOR_SIGNATURE);
    buf.put_u32_le(record.crc32);
    buf.put_u32_le(record.compressed_size);
    buf.put_u32_le(record.uncompressed_size);
    buf.freeze()
}

pub(crate) fn central_directory(records: &[EntryRecord], stamp: DosTimestamp) -> Bytes {
    let capacity = records.iter().map(|r| CENTRAL_HEADER_LEN + r.name.len()).sum();
    let mut buf = BytesMut::with_capacity(capacity);
    for record in records {
        buf.put_u32_le(CENTRAL_DIRECTORY_SIGNATURE);
        // Version made by: MS-DOS attribute compatibility, PKZIP 2.0.
        buf.put_u16_le(VERSION_NEEDED);
        buf.put_u16_le(VERSION_NEEDED);
        buf.put_u16_le(GENERAL_PURPOSE_FLAGS);
        buf.put_u16_le(METHOD_DEFLATE);
        buf.put_u16_le(stamp.time);
        buf.put_u16_le(stamp.date);
        buf.put_u32_le(record.crc32);
        buf.put_u32_le(record.compressed_size);
        buf.put_u32_le(record.uncompressed_size);
        buf.put_u16_le(record.name.len() as u16);
        // Extra field, comment, disk number start, internal and external attributes.
        buf.put_u16_le(0);
        buf.put_u16_le(0);
        buf.put_u16_le(0);
        buf.put_u16_le(0);
        buf.put_u32_le(0);
        buf.put_u32_le(record.header_offset);
        buf.put_slice(record.name.as_bytes());
    }
    buf.freeze()
}

pub(crate) fn end_of_central_directory(entries: u16, directory_size: u32, directory_offset: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(END_OF_CENTRAL_DIRECTORY_LEN);
    buf.put_u32_le(END_OF_CENTRAL_DIRECTORY_SIGNATURE);
    // Single disk archive.
    buf.put_u16_le(0);
    buf.put_u16_le(0);
    buf.put_u16_le(entries);
    buf.put_u16_le(entries);
    buf.put_u32_le(directory_size);
    buf.put_u32_le(directory_offset);
    buf.put_u16_le(0);
    buf.freeze()
}
