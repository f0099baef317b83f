//! Chunk types and operations
//!
//! This module splits a payload into the ordered, contiguous, size-bounded
//! chunks that are committed to by the merkle tree and uploaded one by one.

mod chunker;
pub(crate) mod error;
mod policy;

use std::fmt;
use std::ops::Range;

use alloy_primitives::B256;
use bytes::Bytes;

use crate::hash::sha256;

pub use chunker::{Chunker, split};
pub use error::ChunkError;
pub use policy::{Boundaries, ChunkPolicy, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};

/// A contiguous slice of a payload together with its SHA-256 digest.
///
/// Chunks produced for one payload are 0-indexed and cover it exactly:
/// `chunk[i].end() == chunk[i + 1].start()`, the first starts at 0 and the
/// last ends at the payload length.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    index: usize,
    start: u64,
    data: Bytes,
    digest: B256,
}

impl Chunk {
    /// Create a chunk at `start` within its payload, hashing `data`.
    pub fn new(index: usize, start: u64, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let digest = sha256(&data);
        Self {
            index,
            start,
            data,
            digest,
        }
    }

    /// Position of this chunk in the payload's chunk sequence
    #[inline]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Offset of the first byte
    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Offset one past the last byte
    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }

    /// The byte range `[start, end)` this chunk covers
    #[inline]
    pub fn range(&self) -> Range<u64> {
        self.start..self.end()
    }

    /// The chunk contents
    #[inline]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Number of bytes in the chunk
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the chunk is empty (only possible for an empty payload)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// SHA-256 of the contents
    #[inline]
    pub const fn digest(&self) -> B256 {
        self.digest
    }

    /// Consume the chunk, returning its contents
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("index", &self.index)
            .field("range", &self.range())
            .field("digest", &self.digest)
            .finish()
    }
}
