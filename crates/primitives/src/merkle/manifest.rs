//! A persisted summary of a payload's chunk layout and proofs.

use std::ops::Range;

use alloy_primitives::B256;
use bytes::Bytes;

use super::error::MerkleError;
use super::proof::{Proof, ProvenChunk};
use super::tree::MerkleTree;

/// One chunk's position and data path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManifestEntry {
    /// Offset of the first byte
    pub start: u64,
    /// Offset one past the last byte
    pub end: u64,
    /// Serialized merkle proof
    #[cfg_attr(feature = "serde", serde(with = "crate::encoding::b64"))]
    pub data_path: Bytes,
}

impl ManifestEntry {
    /// Byte range of the chunk
    #[inline]
    pub const fn range(&self) -> Range<u64> {
        self.start..self.end
    }

    /// Chunk size in bytes
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the chunk is empty
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// The proof nodes expect alongside this chunk
    pub fn proof(&self) -> Proof {
        Proof::new(self.end.saturating_sub(1), self.data_path.clone())
    }
}

/// Everything needed to upload a payload's chunks without the merkle tree.
///
/// A manifest holds the `data_root`, the payload size and, per chunk, its
/// byte range and data path. It holds no chunk bytes, so it stays small and
/// can be persisted next to an upload's progress and reloaded to resume.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkManifest {
    #[cfg_attr(feature = "serde", serde(with = "crate::encoding::b64_b256"))]
    data_root: B256,
    data_size: u64,
    chunks: Vec<ManifestEntry>,
}

impl ChunkManifest {
    /// Derive the manifest of a tree.
    pub fn from_tree(tree: &MerkleTree) -> Self {
        let chunks = tree
            .chunk_ranges()
            .iter()
            .zip(tree.proofs())
            .map(|(range, proof)| ManifestEntry {
                start: range.start,
                end: range.end,
                data_path: proof.data_path,
            })
            .collect();

        Self {
            data_root: tree.root(),
            data_size: tree.data_size(),
            chunks,
        }
    }

    /// The payload's `data_root`
    #[inline]
    pub const fn data_root(&self) -> B256 {
        self.data_root
    }

    /// Payload size in bytes
    #[inline]
    pub const fn data_size(&self) -> u64 {
        self.data_size
    }

    /// Number of chunks
    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the manifest lists no chunks
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Entry for chunk `index`
    pub fn entry(&self, index: usize) -> Option<&ManifestEntry> {
        self.chunks.get(index)
    }

    /// All entries, in chunk order
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.chunks
    }

    /// Check `chunk` against the proof recorded for `index`.
    pub fn verify_chunk(&self, index: usize, chunk: &[u8]) -> Result<ProvenChunk, MerkleError> {
        let entry = self
            .chunks
            .get(index)
            .ok_or_else(|| MerkleError::invalid_proof(format!("no chunk {index} in manifest")))?;
        let proven = entry
            .proof()
            .verify_chunk(&self.data_root, self.data_size, chunk)?;
        if proven.start != entry.start {
            return Err(MerkleError::chunk_mismatch(format!(
                "proof places chunk {index} at {}, manifest at {}",
                proven.start, entry.start
            )));
        }
        Ok(proven)
    }
}

impl From<&MerkleTree> for ChunkManifest {
    fn from(tree: &MerkleTree) -> Self {
        Self::from_tree(tree)
    }
}

impl MerkleTree {
    /// The manifest of this tree
    pub fn manifest(&self) -> ChunkManifest {
        ChunkManifest::from_tree(self)
    }
}
