//! WAL record framing and checksums

use std::io;

use crc32fast::Hasher;

/// Length prefix + type + sequence number + checksum
pub(crate) const MIN_RECORD_SIZE: usize = 4 + 1 + 8 + 4;

/// Computes the CRC32 (IEEE) checksum of `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// WAL record types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// A committed store transaction
    Commit = 1,
}

impl RecordType {
    /// Convert from u8, returns None for unknown values
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(RecordType::Commit),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A single framed WAL record.
///
/// The payload is opaque to the log; the store encodes its mutation batch
/// into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    pub record_type: RecordType,
    /// Monotonic, contiguous, never reused
    pub sequence_number: u64,
    pub payload: Vec<u8>,
}

impl WalRecord {
    pub fn new(record_type: RecordType, sequence_number: u64, payload: Vec<u8>) -> Self {
        Self {
            record_type,
            sequence_number,
            payload,
        }
    }

    /// Create a commit record
    pub fn commit(sequence_number: u64, payload: Vec<u8>) -> Self {
        Self::new(RecordType::Commit, sequence_number, payload)
    }

    /// Serialize the complete record, including length prefix and checksum.
    pub fn serialize(&self) -> Vec<u8> {
        let record_length = (MIN_RECORD_SIZE + self.payload.len()) as u32;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.push(self.record_type.as_u8());
        record.extend_from_slice(&self.sequence_number.to_le_bytes());
        record.extend_from_slice(&self.payload);

        // Checksum covers the length field and body
        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());

        record
    }

    /// Deserialize a record from bytes, verifying its checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record too short",
            ));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if record_length < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record length: {}", record_length),
            ));
        }

        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = compute_checksum(&data[0..checksum_offset]);

        if computed_checksum != stored_checksum {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let record_type = RecordType::from_u8(data[4]).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record type: {}", data[4]),
            )
        })?;

        let mut seq_buf = [0u8; 8];
        seq_buf.copy_from_slice(&data[5..13]);
        let sequence_number = u64::from_le_bytes(seq_buf);

        Ok((
            WalRecord {
                record_type,
                sequence_number,
                payload: data[13..checksum_offset].to_vec(),
            },
            record_length,
        ))
    }
}
