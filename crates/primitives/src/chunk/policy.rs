//! Deterministic chunk sizing.

use std::ops::Range;

use super::error::ChunkError;

/// Largest chunk the network accepts (256 KiB).
pub const MAX_CHUNK_SIZE: usize = 256 * 1024;

/// Smallest chunk emitted when a payload spans more than one chunk (32 KiB).
pub const MIN_CHUNK_SIZE: usize = 32 * 1024;

/// Chunk sizing policy.
///
/// A payload of length `L <= max` is a single chunk. Longer payloads are cut
/// into `max`-sized chunks, except that when the bytes left after a full
/// chunk would be fewer than `min`, the last two chunks share the remainder
/// evenly (the first takes the odd byte). Since `min <= max / 2`, both halves
/// are at least `min`. A payload that is an exact multiple of `max` never ends
/// with an empty chunk, so the count is always `ceil(L / max)`.
///
/// Deserializing goes through [`ChunkPolicy::new`], so an invalid policy is
/// rejected when it is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawPolicy"))]
pub struct ChunkPolicy {
    max_size: usize,
    min_size: usize,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawPolicy {
    max_size: usize,
    min_size: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RawPolicy> for ChunkPolicy {
    type Error = ChunkError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        Self::new(raw.max_size, raw.min_size)
    }
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            max_size: MAX_CHUNK_SIZE,
            min_size: MIN_CHUNK_SIZE,
        }
    }
}

impl ChunkPolicy {
    /// Create a policy, requiring `0 < min_size <= max_size / 2`.
    pub fn new(max_size: usize, min_size: usize) -> Result<Self, ChunkError> {
        if min_size == 0 {
            return Err(ChunkError::invalid_policy("min_size must be non-zero"));
        }
        if min_size > max_size / 2 {
            return Err(ChunkError::invalid_policy(format!(
                "min_size {min_size} exceeds half of max_size {max_size}"
            )));
        }
        Ok(Self { max_size, min_size })
    }

    /// Maximum chunk size in bytes
    #[inline]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Minimum size of a chunk in a multi-chunk payload
    #[inline]
    pub const fn min_size(&self) -> usize {
        self.min_size
    }

    /// Number of chunks a payload of `total` bytes splits into.
    #[inline]
    pub const fn chunk_count(&self, total: u64) -> usize {
        if total == 0 {
            1
        } else {
            total.div_ceil(self.max_size as u64) as usize
        }
    }

    /// The byte ranges of every chunk of a `total`-byte payload, in order.
    pub const fn boundaries(&self, total: u64) -> Boundaries {
        Boundaries {
            max: self.max_size as u64,
            min: self.min_size as u64,
            total,
            cursor: 0,
            done: false,
        }
    }
}

/// Iterator over the chunk ranges of a payload. See [`ChunkPolicy::boundaries`].
#[derive(Debug, Clone)]
pub struct Boundaries {
    max: u64,
    min: u64,
    total: u64,
    cursor: u64,
    done: bool,
}

impl Iterator for Boundaries {
    type Item = Range<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let start = self.cursor;
        let rest = self.total - start;
        if rest <= self.max {
            self.done = true;
            return Some(start..self.total);
        }

        let leftover = rest - self.max;
        let size = if leftover < self.min {
            rest.div_ceil(2)
        } else {
            self.max
        };

        self.cursor += size;
        Some(start..self.cursor)
    }
}
