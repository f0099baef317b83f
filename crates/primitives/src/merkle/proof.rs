//! Data paths and their verification.

use alloy_primitives::B256;
use bytes::Bytes;

use super::constants::{BRANCH_PROOF_SIZE, HASH_SIZE, LEAF_PROOF_SIZE, decode_note};
use super::error::MerkleError;
use super::node::{branch_id, leaf_id};
use crate::hash::sha256;

/// Inclusion proof for a single chunk.
///
/// `offset` is any byte inside the chunk; the tree emits the chunk's last byte
/// (`end - 1`), which is also what nodes expect alongside a chunk upload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proof {
    /// A byte offset within the proven chunk
    pub offset: u64,
    /// Serialized path: one entry per branch from the root, then the leaf
    #[cfg_attr(feature = "serde", serde(with = "crate::encoding::b64"))]
    pub data_path: Bytes,
}

/// What a valid proof establishes about its chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvenChunk {
    /// SHA-256 of the chunk bytes
    pub data_hash: B256,
    /// Offset of the chunk's first byte
    pub start: u64,
    /// Offset one past the chunk's last byte
    pub end: u64,
}

impl ProvenChunk {
    /// Chunk size in bytes
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the proven chunk is empty
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

impl Proof {
    /// Create a proof from its parts
    pub const fn new(offset: u64, data_path: Bytes) -> Self {
        Self { offset, data_path }
    }

    /// Number of branches on the path (the leaf's depth)
    pub const fn depth(&self) -> usize {
        self.data_path.len().saturating_sub(LEAF_PROOF_SIZE) / BRANCH_PROOF_SIZE
    }

    /// The chunk digest claimed by the leaf entry, if the path is long enough
    pub fn data_hash(&self) -> Option<B256> {
        let len = self.data_path.len();
        (len >= LEAF_PROOF_SIZE).then(|| {
            let leaf = &self.data_path[len - LEAF_PROOF_SIZE..];
            B256::from_slice(&leaf[..HASH_SIZE])
        })
    }

    /// Walk the path from `root`, checking every node id and narrowing the
    /// byte range around `offset`.
    ///
    /// Succeeds only if the path leads from `root` to a leaf whose range
    /// contains `offset` and whose end agrees with the narrowed bounds.
    pub fn verify(&self, root: &B256, data_size: u64) -> Result<ProvenChunk, MerkleError> {
        if self.offset >= data_size {
            return Err(MerkleError::offset_out_of_range(self.offset, data_size));
        }

        let path = self.data_path.as_ref();
        if path.len() < LEAF_PROOF_SIZE || (path.len() - LEAF_PROOF_SIZE) % BRANCH_PROOF_SIZE != 0 {
            return Err(MerkleError::InvalidProofLength(path.len()));
        }

        let mut expected = *root;
        let mut left_bound = 0u64;
        let mut right_bound = data_size;

        let (branches, leaf) = path.split_at(path.len() - LEAF_PROOF_SIZE);
        for entry in branches.chunks_exact(BRANCH_PROOF_SIZE) {
            let left = B256::from_slice(&entry[..HASH_SIZE]);
            let right = B256::from_slice(&entry[HASH_SIZE..2 * HASH_SIZE]);
            let boundary = decode_note(&entry[2 * HASH_SIZE..])?;

            if branch_id(&left, &right, boundary) != expected {
                return Err(MerkleError::invalid_proof("branch hash mismatch"));
            }
            if boundary <= left_bound || boundary >= right_bound {
                return Err(MerkleError::invalid_proof(format!(
                    "boundary {boundary} outside [{left_bound}, {right_bound})"
                )));
            }

            if self.offset < boundary {
                expected = left;
                right_bound = boundary;
            } else {
                expected = right;
                left_bound = boundary;
            }
        }

        let data_hash = B256::from_slice(&leaf[..HASH_SIZE]);
        let end = decode_note(&leaf[HASH_SIZE..])?;
        if leaf_id(&data_hash, end) != expected {
            return Err(MerkleError::invalid_proof("leaf hash mismatch"));
        }
        if end != right_bound {
            return Err(MerkleError::invalid_proof(format!(
                "leaf ends at {end}, path bounds end at {right_bound}"
            )));
        }

        Ok(ProvenChunk {
            data_hash,
            start: left_bound,
            end,
        })
    }

    /// Verify the path and check that `chunk` is the proven chunk.
    pub fn verify_chunk(
        &self,
        root: &B256,
        data_size: u64,
        chunk: &[u8],
    ) -> Result<ProvenChunk, MerkleError> {
        let proven = self.verify(root, data_size)?;
        if proven.len() != chunk.len() as u64 {
            return Err(MerkleError::chunk_mismatch(format!(
                "size {} != proven size {}",
                chunk.len(),
                proven.len()
            )));
        }
        if sha256(chunk) != proven.data_hash {
            return Err(MerkleError::chunk_mismatch("digest differs"));
        }
        Ok(proven)
    }
}
