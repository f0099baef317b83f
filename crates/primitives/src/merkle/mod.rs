//! Merkle tree over payload chunks.
//!
//! Every node binds a byte offset into its id, so the root (the payload's
//! `data_root`) commits both to chunk contents and to their order. A proof for
//! one chunk, the "data path", is the sequence of sibling pairs from the root
//! down to the chunk's leaf and can be checked against `data_root` without any
//! other chunk.
//!
//! ```text
//! leaf   = H( H(data_hash) ++ H(note(end)) )
//! branch = H( H(left.id) ++ H(right.id) ++ H(note(left.max_offset)) )
//! ```
//!
//! where `H` is SHA-256 and `note(x)` is `x` as a 32-byte big-endian integer.

mod constants;
mod error;
mod manifest;
mod node;
mod proof;
mod tree;

pub use constants::{BRANCH_PROOF_SIZE, HASH_SIZE, LEAF_PROOF_SIZE, NOTE_SIZE};
pub use error::MerkleError;
pub use manifest::{ChunkManifest, ManifestEntry};
pub use node::MerkleNode;
pub use proof::{Proof, ProvenChunk};
pub use tree::MerkleTree;

pub(crate) use constants::{decode_note, encode_note};

#[cfg(test)]
mod tests;
