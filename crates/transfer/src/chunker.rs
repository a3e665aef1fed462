use std::ops::Range;

use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// One contiguous byte-range segment of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position within the chunk sequence.
    pub index: usize,
    /// Byte range within the payload (exclusive upper bound).
    pub range: Range<usize>,
    /// The bytes of this segment.
    pub data: Vec<u8>,
}

impl Chunk {
    /// Length of this segment in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if this segment carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Splits `payload` into ordered, size-bounded chunks and their byte ranges.
///
/// The ranges partition the payload exactly: contiguous, non-overlapping,
/// with the last chunk absorbing any remainder. A payload no larger than
/// `chunk_size` yields exactly one chunk.
///
/// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
pub fn split(
    payload: &[u8],
    chunk_size: usize,
) -> Result<(Vec<Chunk>, Vec<Range<usize>>), TransferError> {
    if payload.is_empty() {
        return Err(TransferError::EmptyPayload);
    }
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };

    let len = payload.len();
    let full_chunks = len / chunk_size;
    let total_chunks = full_chunks + usize::from(len % chunk_size != 0);

    let mut chunks = Vec::with_capacity(total_chunks);
    let mut ranges = Vec::with_capacity(total_chunks);
    for index in 0..total_chunks {
        let lower = index * chunk_size;
        let upper = if index < total_chunks - 1 {
            (index + 1) * chunk_size
        } else {
            len
        };
        chunks.push(Chunk {
            index,
            range: lower..upper,
            data: payload[lower..upper].to_vec(),
        });
        ranges.push(lower..upper);
    }
    Ok((chunks, ranges))
}
