//! Error types for the weft-uploader crate
//!
//! Errors are scoped to the chunk they concern where there is one. Only
//! [`UploadError::TransientNetwork`], [`UploadError::Network`] and rate-limit
//! or server-side rejections are worth retrying; everything else stops the
//! upload with its state intact.

use std::time::Duration;

use thiserror::Error;
use weft_primitives::{PrimitivesError, TxId};
use weft_transaction::TransactionError;

use crate::network::NetworkError;

/// Result type for upload operations
pub type Result<T> = std::result::Result<T, UploadError>;

/// Boxed error from a [`crate::StateStore`] implementation
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors uploading a transaction and its chunks
#[derive(Error, Debug)]
pub enum UploadError {
    /// A chunk failed local proof validation or the node rejected it as invalid
    #[error("chunk {index} failed validation: {reason}")]
    ChunkValidation {
        /// Chunk index
        index: usize,
        /// Local or node-reported reason
        reason: String,
    },

    /// A chunk POST failed in a way that may succeed on retry
    #[error("chunk {index} failed transiently (attempt {attempts}): {reason}")]
    TransientNetwork {
        /// Chunk index
        index: usize,
        /// Transient failures recorded for this chunk so far
        attempts: u32,
        /// Status or transport error
        reason: String,
    },

    /// A chunk kept failing transiently
    #[error("chunk {index} still failing after {attempts} attempts")]
    RetriesExhausted {
        /// Chunk index
        index: usize,
        /// Transient failures recorded for this chunk
        attempts: u32,
    },

    /// An earlier fatal error on this chunk stopped the upload
    #[error("upload stopped at chunk {index}")]
    Aborted {
        /// Chunk that failed
        index: usize,
    },

    /// Reading a chunk's bytes from the source failed
    #[error("reading chunk {index} from source failed: {source}")]
    SourceRead {
        /// Chunk index
        index: usize,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The node rejected the transaction's anchor; rebuild and re-sign
    #[error("stale anchor: {0}")]
    StaleAnchor(String),

    /// The node rejected a request
    #[error("rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },

    /// State, manifest, transaction and source disagree
    #[error("state mismatch: {0}")]
    StateMismatch(String),

    /// The operation needs a source that supports random access
    #[error("parallel upload requires a random-access source")]
    RandomAccessRequired,

    /// The requested item does not exist on the node
    #[error("{0} not found")]
    NotFound(String),

    /// Confirmation did not arrive before the deadline
    #[error("transaction {id} not confirmed after {waited:?}")]
    ConfirmationTimeout {
        /// Transaction id
        id: TxId,
        /// How long we waited
        waited: Duration,
    },

    /// A request outside a chunk upload failed at the transport level
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Persisting or loading upload state failed
    #[error("state store error: {0}")]
    Store(#[source] StoreError),

    /// Encoding or decoding JSON failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transaction validation, signing or verification failed
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Chunking or merkle errors
    #[error(transparent)]
    Primitives(#[from] PrimitivesError),
}

impl UploadError {
    pub fn chunk_validation<S: Into<String>>(index: usize, reason: S) -> Self {
        Self::ChunkValidation {
            index,
            reason: reason.into(),
        }
    }

    pub fn state_mismatch<S: Into<String>>(msg: S) -> Self {
        Self::StateMismatch(msg.into())
    }

    pub fn store<E: Into<StoreError>>(err: E) -> Self {
        Self::Store(err.into())
    }

    /// Whether retrying the failed operation may succeed
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::TransientNetwork { .. } | Self::Network(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The chunk this error concerns, if any
    pub const fn chunk_index(&self) -> Option<usize> {
        match self {
            Self::ChunkValidation { index, .. }
            | Self::TransientNetwork { index, .. }
            | Self::RetriesExhausted { index, .. }
            | Self::Aborted { index }
            | Self::SourceRead { index, .. } => Some(*index),
            _ => None,
        }
    }
}
