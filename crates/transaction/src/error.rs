//! Error types for the weft-transaction crate

use thiserror::Error;
use weft_primitives::{PrimitivesError, TxId, encoding::EncodingError, merkle::MerkleError};

/// Result type for transaction operations
pub type Result<T> = std::result::Result<T, TransactionError>;

/// Errors building, signing or verifying a transaction
#[derive(Error, Debug)]
pub enum TransactionError {
    /// A field failed validation
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// Name of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The transaction format is not supported
    #[error("unsupported transaction format {0}")]
    UnsupportedFormat(u8),

    /// The signer failed to produce a signature
    #[error("signing failed: {0}")]
    Signer(#[from] alloy_signer::Error),

    /// The signature is malformed or was not made by the owner
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The id is not the hash of the signature
    #[error("transaction id mismatch: expected {expected}, got {actual}")]
    IdMismatch {
        /// Hash of the signature
        expected: TxId,
        /// The id carried by the transaction
        actual: TxId,
    },

    /// Errors from chunking or the merkle tree
    #[error(transparent)]
    Primitives(#[from] PrimitivesError),
}

impl TransactionError {
    pub fn invalid_field<S: Into<String>>(field: &'static str, reason: S) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn invalid_signature<S: Into<String>>(msg: S) -> Self {
        Self::InvalidSignature(msg.into())
    }
}

impl From<MerkleError> for TransactionError {
    fn from(err: MerkleError) -> Self {
        Self::Primitives(err.into())
    }
}

impl From<EncodingError> for TransactionError {
    fn from(err: EncodingError) -> Self {
        Self::Primitives(err.into())
    }
}
