//! Error types for the weft-primitives crate
//!
//! The crate uses a two-level error hierarchy:
//!
//! - `PrimitivesError`: The top-level error type that wraps all other errors
//! - Component-specific errors: More detailed errors from specific subsystems
//!   (like `MerkleError` and `ChunkError`)
//!
//! ## Example Usage
//!
//! ```
//! use weft_primitives::error::{PrimitivesError, Result};
//!
//! fn fallible_operation() -> Result<()> {
//!     Ok(())
//! }
//!
//! match fallible_operation() {
//!     Ok(_) => println!("Operation succeeded"),
//!     Err(PrimitivesError::Merkle(err)) => println!("Merkle error: {err}"),
//!     Err(PrimitivesError::Chunk(err)) => println!("Chunk error: {err}"),
//!     Err(other) => println!("Other error: {other}"),
//! }
//! ```

use thiserror::Error;

/// Result type for operations in the primitives crate
pub type Result<T> = std::result::Result<T, PrimitivesError>;

/// Main error type for the primitives crate
#[derive(Error, Debug)]
pub enum PrimitivesError {
    /// Errors from merkle tree construction or proof validation
    #[error(transparent)]
    Merkle(#[from] crate::merkle::MerkleError),

    /// Errors from chunking a data source
    #[error(transparent)]
    Chunk(#[from] crate::chunk::ChunkError),

    /// Errors decoding base64url or fixed-size values
    #[error(transparent)]
    Encoding(#[from] crate::encoding::EncodingError),

    /// Input/output errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
