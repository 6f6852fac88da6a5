//! Locates record boundaries inside an in-memory copy of a `.mes` file.
//!
//! Mirrors the recurrence in the original implementation's stream analyzer:
//! the file header is read once, then each record's range is computed from
//! the previous record's end, aborting the instant the cumulative offset
//! would exceed the buffer.

use crate::error::IndexError;
use crate::record::{PacketFileHeader, PacketHeader};

/// A half-open byte range `[begin, end)` into the file buffer.
pub type Range = std::ops::Range<usize>;

/// The computed index of a `.mes` buffer: the file header's range plus one
/// range per record, in file order.
#[derive(Debug, Clone)]
pub struct Index {
    header_range: Range,
    records: Vec<Range>,
    declared_count: u32,
}

impl Index {
    /// Reads the buffer's file header and computes the byte range of every
    /// record that follows it.
    ///
    /// Fails if the buffer is shorter than a file header, or if a record's
    /// cumulative byte range would run past the end of the buffer. On
    /// failure no partial index is returned: callers must discard it, as
    /// the source recurrence does when `doCalcIndex` aborts partway through.
    pub fn build(buffer: &[u8]) -> Result<Index, IndexError> {
        if buffer.len() < PacketFileHeader::SIZE {
            return Err(IndexError::ShortHeader(buffer.len(), PacketFileHeader::SIZE));
        }

        let header = PacketFileHeader::read_from(&mut &buffer[..])?;
        let header_range = 0..PacketFileHeader::SIZE;

        let mut records = Vec::with_capacity(header.records_in_file as usize);
        let mut begin = header_range.end;

        for i in 0..header.records_in_file as usize {
            if begin + PacketHeader::SIZE > buffer.len() {
                return Err(IndexError::Overrun {
                    index: i,
                    offset: begin + PacketHeader::SIZE,
                    buffer_size: buffer.len(),
                });
            }

            let record_header = PacketHeader::read_from(&mut &buffer[begin..])?;
            let end = begin + record_header.record_size();

            if end > buffer.len() {
                return Err(IndexError::Overrun {
                    index: i,
                    offset: end,
                    buffer_size: buffer.len(),
                });
            }

            records.push(begin..end);
            begin = end;
        }

        Ok(Index {
            header_range,
            records,
            declared_count: header.records_in_file,
        })
    }

    /// The byte range of the file header.
    pub fn header_range(&self) -> Range {
        self.header_range.clone()
    }

    /// The byte range of record `i`, or `None` if out of bounds.
    pub fn packet_range(&self, i: usize) -> Option<Range> {
        let range = self.records.get(i).cloned();
        if range.is_none() {
            log::warn!("required packet index is out of range: {i}");
        }
        range
    }

    /// A read-only view of record `i`'s header, or `None` if out of bounds.
    pub fn packet_header(&self, i: usize, buffer: &[u8]) -> Option<PacketHeader> {
        let range = self.packet_range(i)?;
        PacketHeader::read_from(&mut &buffer[range]).ok()
    }

    /// The number of records the file header declares. Equal to
    /// `self.len()` for any buffer that indexed successfully.
    pub fn packet_count(&self) -> u32 {
        self.declared_count
    }

    /// The number of records actually indexed.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index contains no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{PacketFileHeader, PacketHeader};

    fn push_record(buf: &mut Vec<u8>, time: u32, data: &[u8]) {
        let header = PacketHeader {
            time,
            data_size: data.len() as u32,
            stream_num: 0,
            info: [0u8; 16],
        };
        header.write_to(buf).unwrap();
        buf.extend_from_slice(data);
    }

    fn sample_file(records: u32, bodies: &[(u32, &[u8])]) -> Vec<u8> {
        let header = PacketFileHeader {
            file_type: *b"MES1",
            stream_quan: 1,
            records_in_file: records,
            record_time: 0,
            record_name: [0u8; 64],
            last_change_time: 0,
            info: [0u8; 60],
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        for (time, data) in bodies {
            push_record(&mut buf, *time, data);
        }
        buf
    }

    #[test]
    fn indexes_a_well_formed_file() {
        let buf = sample_file(2, &[(0, b"abc"), (25, b"x")]);
        let index = Index::build(&buf).unwrap();

        assert_eq!(index.packet_count(), 2);
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.packet_range(0).unwrap().len(),
            PacketHeader::SIZE + 3
        );
        assert_eq!(
            index.packet_range(1).unwrap().len(),
            PacketHeader::SIZE + 1
        );
    }

    #[test]
    fn rejects_overrunning_declared_size() {
        let mut buf = sample_file(2, &[(0, b"abc")]);
        // Declares 2 records but only one is physically present: the
        // second record's header read would run past the buffer.
        let index = Index::build(&mut buf);
        assert!(index.is_err());
    }

    #[test]
    fn out_of_bounds_range_is_none() {
        let buf = sample_file(1, &[(0, b"abc")]);
        let index = Index::build(&buf).unwrap();
        assert!(index.packet_range(5).is_none());
    }

    #[test]
    fn packet_header_reads_the_record_at_index() {
        let buf = sample_file(2, &[(0, b"abc"), (25, b"x")]);
        let index = Index::build(&buf).unwrap();

        let header = index.packet_header(1, &buf).unwrap();
        assert_eq!(header.time, 25);
        assert_eq!(header.data_size, 1);
    }

    #[test]
    fn packet_header_out_of_bounds_is_none() {
        let buf = sample_file(1, &[(0, b"abc")]);
        let index = Index::build(&buf).unwrap();
        assert!(index.packet_header(5, &buf).is_none());
    }

    #[test]
    fn short_buffer_is_an_error() {
        let buf = vec![0u8; 4];
        assert!(matches!(
            Index::build(&buf),
            Err(IndexError::ShortHeader(4, _))
        ));
    }
}
