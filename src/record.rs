//! Fixed-layout structures read from, and written to, a `.mes` record file:
//! the file header that opens every file, and the per-record header that
//! precedes each record's payload.
//!
//! Field order matches the layout the original recorder used on disk; both
//! structures are read and written in little-endian byte order, distinct
//! from the big-endian `Head` field of the wire envelope (see [`crate::codec`]).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Length in bytes of [`PacketFileHeader::RECORD_NAME_LEN`]'s backing array.
const RECORD_NAME_LEN: usize = 64;
/// Length in bytes of the file header's trailing free-form metadata.
const FILE_INFO_LEN: usize = 60;
/// Length in bytes of a per-record header's free-form metadata.
const RECORD_INFO_LEN: usize = 16;

/// The fixed-size prelude that opens every `.mes` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketFileHeader {
    /// Four-byte magic identifying the file format.
    pub file_type: [u8; 4],
    /// Number of distinct record streams multiplexed in this file.
    pub stream_quan: u32,
    /// Number of records following the header.
    pub records_in_file: u32,
    /// Recording start time.
    pub record_time: u32,
    /// Human-readable recording name, NUL-padded.
    pub record_name: [u8; RECORD_NAME_LEN],
    /// Time the file was last modified.
    pub last_change_time: u32,
    /// Free-form per-file metadata.
    pub info: [u8; FILE_INFO_LEN],
}

impl PacketFileHeader {
    /// Size in bytes of the encoded header. Fixed at compile time.
    pub const SIZE: usize = 4 + 4 + 4 + 4 + RECORD_NAME_LEN + 4 + FILE_INFO_LEN;

    /// Reads a file header from `r`.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut file_type = [0u8; 4];
        r.read_exact(&mut file_type)?;
        let stream_quan = r.read_u32::<LittleEndian>()?;
        let records_in_file = r.read_u32::<LittleEndian>()?;
        let record_time = r.read_u32::<LittleEndian>()?;
        let mut record_name = [0u8; RECORD_NAME_LEN];
        r.read_exact(&mut record_name)?;
        let last_change_time = r.read_u32::<LittleEndian>()?;
        let mut info = [0u8; FILE_INFO_LEN];
        r.read_exact(&mut info)?;

        Ok(PacketFileHeader {
            file_type,
            stream_quan,
            records_in_file,
            record_time,
            record_name,
            last_change_time,
            info,
        })
    }

    /// Writes the header to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.file_type)?;
        w.write_u32::<LittleEndian>(self.stream_quan)?;
        w.write_u32::<LittleEndian>(self.records_in_file)?;
        w.write_u32::<LittleEndian>(self.record_time)?;
        w.write_all(&self.record_name)?;
        w.write_u32::<LittleEndian>(self.last_change_time)?;
        w.write_all(&self.info)?;
        Ok(())
    }
}

/// The fixed-size header preceding every record's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Millisecond timestamp, relative to the start of the recording.
    pub time: u32,
    /// Number of payload bytes following this header.
    pub data_size: u32,
    /// Which multiplexed stream this record belongs to.
    pub stream_num: u32,
    /// Free-form per-record metadata.
    pub info: [u8; RECORD_INFO_LEN],
}

impl PacketHeader {
    /// Size in bytes of the encoded header.
    pub const SIZE: usize = 4 + 4 + 4 + RECORD_INFO_LEN;

    /// Reads a record header from `r`.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let time = r.read_u32::<LittleEndian>()?;
        let data_size = r.read_u32::<LittleEndian>()?;
        let stream_num = r.read_u32::<LittleEndian>()?;
        let mut info = [0u8; RECORD_INFO_LEN];
        r.read_exact(&mut info)?;

        Ok(PacketHeader {
            time,
            data_size,
            stream_num,
            info,
        })
    }

    /// Writes the header to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.time)?;
        w.write_u32::<LittleEndian>(self.data_size)?;
        w.write_u32::<LittleEndian>(self.stream_num)?;
        w.write_all(&self.info)?;
        Ok(())
    }

    /// Total size on disk of this header plus its payload.
    pub fn record_size(&self) -> usize {
        Self::SIZE + self.data_size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file_header(records: u32) -> PacketFileHeader {
        PacketFileHeader {
            file_type: *b"MES1",
            stream_quan: 1,
            records_in_file: records,
            record_time: 0,
            record_name: [0u8; RECORD_NAME_LEN],
            last_change_time: 0,
            info: [0u8; FILE_INFO_LEN],
        }
    }

    #[test]
    fn file_header_round_trips() {
        let header = sample_file_header(2);
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), PacketFileHeader::SIZE);

        let decoded = PacketFileHeader::read_from(&mut &buf[..]).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn record_header_round_trips() {
        let header = PacketHeader {
            time: 1234,
            data_size: 6,
            stream_num: 0,
            info: [0u8; RECORD_INFO_LEN],
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), PacketHeader::SIZE);

        let decoded = PacketHeader::read_from(&mut &buf[..]).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.record_size(), PacketHeader::SIZE + 6);
    }
}
