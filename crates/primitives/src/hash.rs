//! Hash functions used throughout the protocol.
//!
//! Merkle nodes, chunk digests, addresses and transaction ids use SHA-256;
//! the deep hash uses SHA-384.

use alloy_primitives::B256;
use digest::Digest;
use sha2::{Sha256, Sha384};

use crate::deep_hash::B384;

/// SHA-256 of a single byte slice.
#[inline]
pub fn sha256(data: &[u8]) -> B256 {
    B256::from_slice(Sha256::digest(data).as_slice())
}

/// SHA-256 over the concatenation of `parts`, without allocating the concatenation.
#[inline]
pub fn sha256_concat(parts: &[&[u8]]) -> B256 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    B256::from_slice(hasher.finalize().as_slice())
}

/// SHA-384 of a single byte slice.
#[inline]
pub fn sha384(data: &[u8]) -> B384 {
    B384::from_slice(Sha384::digest(data).as_slice())
}

/// SHA-384 over the concatenation of `parts`.
#[inline]
pub fn sha384_concat(parts: &[&[u8]]) -> B384 {
    let mut hasher = Sha384::new();
    for part in parts {
        hasher.update(part);
    }
    B384::from_slice(hasher.finalize().as_slice())
}
