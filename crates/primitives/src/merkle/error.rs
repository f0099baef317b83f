use thiserror::Error;

/// Errors specific to merkle tree construction and proof validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// No chunks were supplied
    #[error("cannot build a merkle tree from zero chunks")]
    Empty,

    /// Chunks are out of order or leave a gap
    #[error("chunk {index} starts at {actual}, expected {expected}")]
    NonContiguous {
        index: usize,
        expected: u64,
        actual: u64,
    },

    /// The data path is not `k` branch entries followed by one leaf entry
    #[error("invalid data path length {0}")]
    InvalidProofLength(usize),

    /// A hash on the data path does not match
    #[error("proof verification failed: {0}")]
    InvalidProof(String),

    /// The proven offset lies outside the payload
    #[error("offset {offset} outside payload of {data_size} bytes")]
    OffsetOutOfRange { offset: u64, data_size: u64 },

    /// The chunk bytes do not match the proven leaf
    #[error("chunk does not match proof: {0}")]
    ChunkMismatch(String),
}

impl MerkleError {
    pub fn invalid_proof<S: Into<String>>(msg: S) -> Self {
        Self::InvalidProof(msg.into())
    }

    pub fn chunk_mismatch<S: Into<String>>(msg: S) -> Self {
        Self::ChunkMismatch(msg.into())
    }

    pub const fn offset_out_of_range(offset: u64, data_size: u64) -> Self {
        Self::OffsetOutOfRange { offset, data_size }
    }
}
