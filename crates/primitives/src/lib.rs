//! Core primitives for permanent storage transactions
//!
//! This crate provides the deterministic building blocks a client needs before
//! any network call is made: splitting a payload into chunks, building the
//! merkle tree that commits to those chunks, and hashing structured data into a
//! signature base.
//!
//! ## Key Components
//!
//! - **Chunks**: Size-bounded, offset-addressed slices of a payload ([`Chunk`], [`Chunker`])
//! - **Merkle Tree**: The `data_root` commitment and per-chunk proofs ([`MerkleTree`], [`Proof`])
//! - **Manifest**: A tree's chunk ranges and proofs without the payload ([`ChunkManifest`])
//! - **Deep Hash**: Recursive, length-bound hashing of nested byte lists ([`deep_hash()`])
//! - **Addresses**: 32-byte identifiers rendered as unpadded base64url ([`WalletAddress`], [`TxId`])
//!
//! ## Usage Examples
//!
//! ```
//! use weft_primitives::{ChunkPolicy, MerkleTree, split};
//!
//! let data = vec![7u8; 600 * 1024];
//! let chunks = split(data, &ChunkPolicy::default());
//! assert_eq!(chunks.len(), 3);
//!
//! let tree = MerkleTree::build(&chunks).unwrap();
//! let proof = tree.proof(1).unwrap();
//! let proven = proof.verify(&tree.root(), tree.data_size()).unwrap();
//! assert_eq!(proven.data_hash, chunks[1].digest());
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

// Re-export dependencies that are part of our public API
pub use bytes;

pub mod address;
pub mod chunk;
pub mod deep_hash;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod merkle;

// Re-export core constants
pub use chunk::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};

// Re-export core types
pub use address::{TxId, WalletAddress};
pub use error::{PrimitivesError, Result};

// Core chunk functionality
pub use chunk::{Chunk, ChunkPolicy, Chunker, split};

// Core merkle functionality
pub use merkle::{ChunkManifest, ManifestEntry, MerkleNode, MerkleTree, Proof, ProvenChunk};

// Deep hash
pub use deep_hash::{B384, DeepHashItem, deep_hash};
