use alloy_primitives::B256;

use super::constants::encode_note;
use crate::hash::{sha256, sha256_concat};

/// A node of the merkle tree.
///
/// Children are owned, so a tree is acyclic by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerkleNode {
    /// One chunk
    Leaf {
        /// Node id
        id: B256,
        /// SHA-256 of the chunk bytes
        data_hash: B256,
        /// Offset of the chunk's first byte
        min_offset: u64,
        /// Offset one past the chunk's last byte
        max_offset: u64,
    },
    /// Two adjacent subtrees
    Branch {
        /// Node id
        id: B256,
        /// Offset separating the left subtree from the right one
        boundary: u64,
        /// The right subtree's `max_offset`
        max_offset: u64,
        /// Lower offsets
        left: Box<MerkleNode>,
        /// Higher offsets
        right: Box<MerkleNode>,
    },
}

impl MerkleNode {
    /// Hash a chunk into a leaf.
    pub fn leaf(data_hash: B256, min_offset: u64, max_offset: u64) -> Self {
        Self::Leaf {
            id: leaf_id(&data_hash, max_offset),
            data_hash,
            min_offset,
            max_offset,
        }
    }

    /// Join two adjacent subtrees.
    pub fn branch(left: Self, right: Self) -> Self {
        let boundary = left.max_offset();
        Self::Branch {
            id: branch_id(&left.id(), &right.id(), boundary),
            boundary,
            max_offset: right.max_offset(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// The node id
    #[inline]
    pub const fn id(&self) -> B256 {
        match self {
            Self::Leaf { id, .. } | Self::Branch { id, .. } => *id,
        }
    }

    /// Offset one past the last byte covered by this node
    #[inline]
    pub const fn max_offset(&self) -> u64 {
        match self {
            Self::Leaf { max_offset, .. } | Self::Branch { max_offset, .. } => *max_offset,
        }
    }

    /// Whether this is a leaf
    #[inline]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

pub(crate) fn leaf_id(data_hash: &B256, max_offset: u64) -> B256 {
    let note = encode_note(max_offset);
    sha256_concat(&[sha256(data_hash.as_slice()).as_slice(), sha256(&note).as_slice()])
}

pub(crate) fn branch_id(left: &B256, right: &B256, boundary: u64) -> B256 {
    let note = encode_note(boundary);
    sha256_concat(&[
        sha256(left.as_slice()).as_slice(),
        sha256(right.as_slice()).as_slice(),
        sha256(&note).as_slice(),
    ])
}
