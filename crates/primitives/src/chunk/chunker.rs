//! Streaming chunker over a reader of known length.

use std::io::Read;

use bytes::{Bytes, BytesMut};

use super::error::ChunkError;
use super::policy::{Boundaries, ChunkPolicy};
use super::Chunk;

/// Splits a reader of declared length into [`Chunk`]s.
///
/// The reader is consumed strictly forward and only one chunk's bytes are held
/// at a time, so memory use is bounded by the policy's maximum chunk size.
/// If the reader runs dry before the declared length, the iterator yields
/// [`ChunkError::SourceRead`] and stops.
///
/// ```
/// use weft_primitives::{ChunkPolicy, Chunker};
///
/// let data = vec![1u8; 300 * 1024];
/// let chunks: Vec<_> = Chunker::new(data.as_slice(), data.len() as u64, ChunkPolicy::default())
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(chunks.len(), 2);
/// ```
#[derive(Debug)]
pub struct Chunker<R> {
    reader: R,
    total: u64,
    boundaries: Boundaries,
    next_index: usize,
    failed: bool,
}

impl<R: Read> Chunker<R> {
    /// Create a chunker over `reader`, which must yield `total` bytes.
    pub const fn new(reader: R, total: u64, policy: ChunkPolicy) -> Self {
        Self {
            reader,
            total,
            boundaries: policy.boundaries(total),
            next_index: 0,
            failed: false,
        }
    }

    /// Declared length of the source
    #[inline]
    pub const fn total(&self) -> u64 {
        self.total
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = Result<Chunk, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let range = self.boundaries.next()?;
        let len = (range.end - range.start) as usize;

        let mut buf = BytesMut::zeroed(len);
        if let Err(e) = self.reader.read_exact(&mut buf) {
            self.failed = true;
            return Some(Err(ChunkError::from_io(range.start, self.total, e)));
        }

        let chunk = Chunk::new(self.next_index, range.start, buf.freeze());
        self.next_index += 1;
        Some(Ok(chunk))
    }
}

/// Split an in-memory payload into chunks without copying.
pub fn split(data: impl Into<Bytes>, policy: &ChunkPolicy) -> Vec<Chunk> {
    let data = data.into();
    policy
        .boundaries(data.len() as u64)
        .enumerate()
        .map(|(index, range)| {
            Chunk::new(
                index,
                range.start,
                data.slice(range.start as usize..range.end as usize),
            )
        })
        .collect()
}
