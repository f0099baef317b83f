//! 32-byte identifiers used on the network
//!
//! This module provides [`WalletAddress`], the SHA-256 of an owner's public key,
//! and [`TxId`], the SHA-256 of a transaction signature. Both render as
//! unpadded base64url, which is how nodes expect them in paths and JSON bodies.
//!
//! ## Example Usage
//!
//! ```
//! use weft_primitives::{TxId, WalletAddress};
//!
//! let address = WalletAddress::from_owner(b"an owner public key");
//! let parsed: WalletAddress = address.to_string().parse().unwrap();
//! assert_eq!(address, parsed);
//!
//! let id = TxId::from_signature(b"a signature");
//! assert_eq!(id.to_string().len(), 43);
//! ```

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use alloy_primitives::B256;

use crate::encoding::{self, EncodingError};
use crate::hash::sha256;

macro_rules! b64_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub B256);

        impl $name {
            /// Creates a new identifier from raw bytes
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(B256::new(bytes))
            }

            /// Returns the underlying bytes
            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_slice()
            }

            /// Creates an identifier from a slice, checking the length
            pub fn from_slice(slice: &[u8]) -> Result<Self, EncodingError> {
                B256::try_from(slice)
                    .map(Self)
                    .map_err(|_| EncodingError::InvalidLength {
                        expected: 32,
                        actual: slice.len(),
                    })
            }

            /// Checks if this identifier is all zeros
            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&encoding::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = EncodingError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                encoding::decode_b256(s).map(Self)
            }
        }

        impl Deref for $name {
            type Target = B256;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<B256> for $name {
            fn from(value: B256) -> Self {
                Self(value)
            }
        }

        impl From<$name> for B256 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                self.as_bytes()
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

b64_identifier! {
    /// The address of a wallet: SHA-256 of the owner's public key.
    WalletAddress
}

b64_identifier! {
    /// A transaction identifier: SHA-256 of the transaction signature.
    TxId
}

impl WalletAddress {
    /// Derive the address owned by a public key.
    pub fn from_owner(owner: &[u8]) -> Self {
        Self(sha256(owner))
    }
}

impl TxId {
    /// Derive the id of a transaction from its signature.
    pub fn from_signature(signature: &[u8]) -> Self {
        Self(sha256(signature))
    }
}
