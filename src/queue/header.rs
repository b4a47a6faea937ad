//! Header Codec: the fixed 16-byte record describing the queue's logical state.

use crate::error::{QueueError, Result};

/// Size in bytes of the fixed header at the start of every queue file.
pub const HEADER_SIZE: u64 = 16;

/// Smallest legal file length. The creation path always writes this size
/// before any reader can observe a zeroed, pre-header file.
pub const MIN_FILE_SIZE: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub file_length: u32,
    pub element_count: u32,
    pub first_offset: u32,
    pub last_offset: u32,
}

impl Header {
    pub fn empty(file_length: u32) -> Self {
        Self {
            file_length,
            element_count: 0,
            first_offset: 0,
            last_offset: 0,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..4].copy_from_slice(&self.file_length.to_be_bytes());
        buf[4..8].copy_from_slice(&self.element_count.to_be_bytes());
        buf[8..12].copy_from_slice(&self.first_offset.to_be_bytes());
        buf[12..16].copy_from_slice(&self.last_offset.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE as usize {
            return Err(QueueError::CorruptHeader(format!(
                "header truncated: got {} bytes, need {HEADER_SIZE}",
                bytes.len()
            )));
        }

        let file_length = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        let element_count = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        let first_offset = u32::from_be_bytes(bytes[8..12].try_into().unwrap());
        let last_offset = u32::from_be_bytes(bytes[12..16].try_into().unwrap());

        if u64::from(file_length) < MIN_FILE_SIZE {
            return Err(QueueError::CorruptHeader(format!(
                "file length {file_length} below minimum {MIN_FILE_SIZE}"
            )));
        }

        if (element_count == 0) != (first_offset == 0) {
            return Err(QueueError::CorruptHeader(format!(
                "elementCount ({element_count}) and firstOffset ({first_offset}) disagree on emptiness"
            )));
        }

        for (name, offset) in [("firstOffset", first_offset), ("lastOffset", last_offset)] {
            let in_range = offset == 0 || (HEADER_SIZE as u32..file_length).contains(&offset);
            if !in_range {
                return Err(QueueError::CorruptHeader(format!(
                    "{name} {offset} out of range [{HEADER_SIZE}, {file_length})"
                )));
            }
        }

        Ok(Self {
            file_length,
            element_count,
            first_offset,
            last_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_populated_header() {
        let header = Header {
            file_length: 8192,
            element_count: 3,
            first_offset: 16,
            last_offset: 4000,
        };
        let decoded = Header::decode(&header.encode()).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn empty_header_round_trips() {
        let header = Header::empty(MIN_FILE_SIZE as u32);
        let decoded = Header::decode(&header.encode()).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn rejects_file_length_below_minimum() {
        let header = Header {
            file_length: 100,
            element_count: 0,
            first_offset: 0,
            last_offset: 0,
        };
        assert!(matches!(
            Header::decode(&header.encode()),
            Err(QueueError::CorruptHeader(_))
        ));
    }

    #[test]
    fn rejects_emptiness_mismatch() {
        let header = Header {
            file_length: MIN_FILE_SIZE as u32,
            element_count: 0,
            first_offset: 20,
            last_offset: 20,
        };
        assert!(matches!(
            Header::decode(&header.encode()),
            Err(QueueError::CorruptHeader(_))
        ));
    }

    #[test]
    fn rejects_offset_out_of_range() {
        let header = Header {
            file_length: MIN_FILE_SIZE as u32,
            element_count: 1,
            first_offset: MIN_FILE_SIZE as u32 + 10,
            last_offset: MIN_FILE_SIZE as u32 + 10,
        };
        assert!(matches!(
            Header::decode(&header.encode()),
            Err(QueueError::CorruptHeader(_))
        ));
    }

    #[test]
    fn rejects_truncated_bytes() {
        assert!(matches!(
            Header::decode(&[0u8; 8]),
            Err(QueueError::CorruptHeader(_))
        ));
    }
}
