//! The unit of work passed from the splitter to the decoder workers.

use bytes::Bytes;

/// The record delimiter. Records are single-newline terminated.
pub const DELIMITER: u8 = b'\n';

/// One undecoded line of input, delimiter included.
///
/// A `Record` moves through the work queue by value and is consumed by
/// exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based position of the line in the input
    index: u64,
    /// Raw line bytes, including the trailing `\n`
    bytes: Bytes,
}

impl Record {
    pub fn new(index: u64, bytes: impl Into<Bytes>) -> Self {
        Self {
            index,
            bytes: bytes.into(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// The raw line, delimiter included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
