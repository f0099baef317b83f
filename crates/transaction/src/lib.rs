//! Transactions for permanent storage
//!
//! A transaction commits to a payload through its `data_root` and is signed
//! over a deep hash of its fields. This crate builds, validates, signs and
//! verifies transactions and converts them to and from their wire JSON.
//!
//! ## Key Components
//!
//! - **Builder**: Field validation and payload commitment ([`TransactionBuilder`])
//! - **Transaction**: Immutable signed transactions ([`Transaction`])
//! - **Signers**: The [`Signer`] seam and a local secp256k1 key ([`Wallet`])
//! - **Amounts**: Non-negative winston values ([`Winston`])
//!
//! ## Re-signing
//!
//! A signed transaction is never mutated. Changing a field, e.g. a fresh
//! anchor after the node reports the old one as stale, means going back to
//! a builder and signing again:
//!
//! ```
//! use alloy_primitives::B256;
//! use weft_transaction::{TransactionBuilder, Wallet};
//!
//! let wallet = Wallet::from_bytes(&B256::repeat_byte(0x11)).unwrap();
//! let first = TransactionBuilder::new().reward(10u64).sign(&wallet).unwrap();
//!
//! let anchor = "A".repeat(43);
//! let second = first.clone().into_builder().last_tx(&anchor).sign(&wallet).unwrap();
//! assert_ne!(first.id(), second.id());
//! second.verify().unwrap();
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod builder;
pub mod error;
pub mod signer;
pub mod tag;
pub mod transaction;
pub mod winston;

pub use builder::TransactionBuilder;
pub use error::{Result, TransactionError};
pub use signer::{Signer, verify_signature};
#[cfg(feature = "local-signer")]
pub use signer::Wallet;
pub use tag::Tag;
pub use transaction::{FORMAT, Transaction, UnsignedTransaction};
pub use winston::{WINSTON_PER_AR, Winston};
