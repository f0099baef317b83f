//! Tree construction and proof generation.

use std::io::Read;
use std::ops::Range;

use alloy_primitives::B256;
use bytes::{BufMut, BytesMut};
use rayon::prelude::*;

use super::constants::{BRANCH_PROOF_SIZE, LEAF_PROOF_SIZE, encode_note};
use super::error::MerkleError;
use super::node::MerkleNode;
use super::proof::Proof;
use crate::chunk::{Chunk, ChunkPolicy, Chunker};
use crate::error::Result;

/// A merkle tree over the chunks of one payload.
///
/// Leaves are combined pairwise, level by level; when a level has an odd
/// number of nodes the last one is carried up unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    root: MerkleNode,
    ranges: Vec<Range<u64>>,
}

impl MerkleTree {
    /// Build the tree over an ordered, contiguous run of chunks.
    ///
    /// Leaves are hashed in parallel.
    pub fn build(chunks: &[Chunk]) -> std::result::Result<Self, MerkleError> {
        check_contiguous(chunks.iter().map(Chunk::range))?;

        let leaves: Vec<MerkleNode> = chunks
            .par_iter()
            .map(|chunk| MerkleNode::leaf(chunk.digest(), chunk.start(), chunk.end()))
            .collect();
        let ranges = chunks.iter().map(Chunk::range).collect();

        Self::from_leaves(leaves, ranges)
    }

    /// Build the tree by streaming `total` bytes from `reader`.
    ///
    /// Only one chunk is held in memory at a time.
    pub fn from_reader<R: Read>(reader: R, total: u64, policy: ChunkPolicy) -> Result<Self> {
        let count = policy.chunk_count(total);
        let mut leaves = Vec::with_capacity(count);
        let mut ranges = Vec::with_capacity(count);
        for chunk in Chunker::new(reader, total, policy) {
            let chunk = chunk?;
            leaves.push(MerkleNode::leaf(chunk.digest(), chunk.start(), chunk.end()));
            ranges.push(chunk.range());
        }
        Ok(Self::from_leaves(leaves, ranges)?)
    }

    /// Build the tree from chunk digests and their byte ranges.
    ///
    /// For callers that hash chunks themselves, e.g. while reading them from
    /// an async source.
    pub fn from_digests(
        digests: impl IntoIterator<Item = (B256, Range<u64>)>,
    ) -> std::result::Result<Self, MerkleError> {
        let (leaves, ranges): (Vec<_>, Vec<_>) = digests
            .into_iter()
            .map(|(digest, range)| (MerkleNode::leaf(digest, range.start, range.end), range))
            .unzip();
        check_contiguous(ranges.iter().cloned())?;
        Self::from_leaves(leaves, ranges)
    }

    fn from_leaves(
        mut level: Vec<MerkleNode>,
        ranges: Vec<Range<u64>>,
    ) -> std::result::Result<Self, MerkleError> {
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut nodes = level.into_iter();
            while let Some(left) = nodes.next() {
                match nodes.next() {
                    Some(right) => next.push(MerkleNode::branch(left, right)),
                    None => next.push(left),
                }
            }
            level = next;
        }

        let root = level.pop().ok_or(MerkleError::Empty)?;
        Ok(Self { root, ranges })
    }

    /// The `data_root`
    #[inline]
    pub const fn root(&self) -> B256 {
        self.root.id()
    }

    /// The root node
    #[inline]
    pub const fn root_node(&self) -> &MerkleNode {
        &self.root
    }

    /// Total payload size in bytes
    #[inline]
    pub const fn data_size(&self) -> u64 {
        self.root.max_offset()
    }

    /// Number of leaves
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.ranges.len()
    }

    /// Byte range of chunk `index`
    pub fn chunk_range(&self, index: usize) -> Option<Range<u64>> {
        self.ranges.get(index).cloned()
    }

    /// Byte ranges of all chunks, in order
    pub fn chunk_ranges(&self) -> &[Range<u64>] {
        &self.ranges
    }

    /// Generate the data path for chunk `index`.
    pub fn proof(&self, index: usize) -> Option<Proof> {
        let range = self.ranges.get(index)?;
        // Last byte of the chunk; an empty payload has only offset 0.
        let target = range.end.saturating_sub(1);

        let mut path = BytesMut::with_capacity(LEAF_PROOF_SIZE + 2 * BRANCH_PROOF_SIZE);
        let mut node = &self.root;
        loop {
            match node {
                MerkleNode::Branch {
                    boundary,
                    left,
                    right,
                    ..
                } => {
                    path.put_slice(left.id().as_slice());
                    path.put_slice(right.id().as_slice());
                    path.put_slice(&encode_note(*boundary));
                    node = if target < *boundary { &**left } else { &**right };
                }
                MerkleNode::Leaf {
                    data_hash,
                    max_offset,
                    ..
                } => {
                    path.put_slice(data_hash.as_slice());
                    path.put_slice(&encode_note(*max_offset));
                    break;
                }
            }
        }

        Some(Proof::new(target, path.freeze()))
    }

    /// Data paths for every chunk, in chunk order.
    pub fn proofs(&self) -> Vec<Proof> {
        (0..self.chunk_count())
            .into_par_iter()
            .filter_map(|index| self.proof(index))
            .collect()
    }
}

fn check_contiguous(
    ranges: impl Iterator<Item = Range<u64>>,
) -> std::result::Result<(), MerkleError> {
    let mut expected = 0u64;
    let mut seen = 0usize;
    for (index, range) in ranges.enumerate() {
        if range.start != expected {
            return Err(MerkleError::NonContiguous {
                index,
                expected,
                actual: range.start,
            });
        }
        expected = range.end;
        seen += 1;
    }
    if seen == 0 {
        return Err(MerkleError::Empty);
    }
    Ok(())
}
