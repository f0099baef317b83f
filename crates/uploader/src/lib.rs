//! Resumable chunked uploads and a node client for permanent storage.
//!
//! Payloads too large to travel inside a transaction are uploaded chunk by
//! chunk, each with a merkle proof against the transaction's `data_root`.
//! Progress survives restarts and transient node failures.
//!
//! # Core Types
//!
//! - [`ChunkedUploader`]: Uploads one transaction's chunks, in order or in parallel
//! - [`UploadState`]: Persistable progress, with [`StateStore`] to keep it
//! - [`NodeClient`]: Submit transactions, upload payloads, query the node
//! - [`TagQuery`]: Tag search expressions
//!
//! # Traits
//!
//! - [`Network`]: GET and POST against a node, over HTTP or a test double
//! - [`ChunkSource`]: Range reads from memory, a file or a forward-only reader
//! - [`StateStore`]: Save and load upload state and manifests
//!
//! # Features
//!
//! - `std` (default): Standard library support
//! - `http` (default): [`HttpNetwork`] over reqwest
//! - `parallel` (default): Bounded parallel uploads with futures
//!
//! # Example
//!
//! ```no_run
//! use alloy_primitives::B256;
//! use bytes::Bytes;
//! use url::Url;
//! use weft_primitives::{ChunkPolicy, MerkleTree, split};
//! use weft_transaction::{TransactionBuilder, Wallet};
//! use weft_uploader::{NodeClient, UploaderConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NodeClient::connect(UploaderConfig::new(Url::parse("http://127.0.0.1:1984")?))?;
//! let wallet = Wallet::from_bytes(&B256::repeat_byte(0x11))?;
//!
//! let data = Bytes::from(vec![7u8; 4 << 20]);
//! let tree = MerkleTree::build(&split(data.clone(), &ChunkPolicy::default()))?;
//! let tx = TransactionBuilder::new()
//!     .last_tx(client.anchor().await?)
//!     .reward(client.price(data.len() as u64, None).await?)
//!     .with_tree(&tree)
//!     .sign(&wallet)?;
//!
//! let id = client.submit_with_data(&tx, data).await?;
//! client.wait_for_confirmation(&id).await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod client;
mod config;
mod error;
mod network;
mod query;
mod source;
mod state;
mod store;
mod uploader;

// Bounded parallel uploads (requires futures)
#[cfg(feature = "parallel")]
mod parallel;

#[cfg(test)]
mod testing;

pub use client::{Confirmation, NodeClient, NodeInfo, SubmitOutcome, TxStatus};
pub use config::{
    ConfirmationPolicy, DEFAULT_CONCURRENCY, DEFAULT_INLINE_THRESHOLD, RetryPolicy, UploaderConfig,
};
pub use error::{Result, StoreError, UploadError};
#[cfg(feature = "http")]
pub use network::HttpNetwork;
pub use network::{Network, NetworkError, Response};
pub use query::TagQuery;
pub use source::{ChunkSource, FileSource, ReaderSource};
pub use state::{ChunkStatus, UploadPhase, UploadState};
pub use store::{FileStateStore, FileStoreError, MemoryStateStore, StateStore};
pub use uploader::{CHUNK_PATH, ChunkOutcome, ChunkUpload, ChunkedUploader, Progress, classify};
