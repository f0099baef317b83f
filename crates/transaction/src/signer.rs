//! Signing keys and signature verification.
//!
//! Transactions are signed over their deep hash. The [`Signer`] trait keeps
//! key material behind a narrow interface: callers only ever see the owner
//! (public key) and signatures.
//!
//! The scheme is secp256k1 ECDSA over `sha256(message)`. The owner is the
//! 33-byte compressed SEC1 public key and signatures are 65 bytes
//! (`r || s || v`).

use alloy_primitives::{B256, Signature};
use bytes::Bytes;
use k256::ecdsa::VerifyingKey;
use weft_primitives::{WalletAddress, hash::sha256};

use crate::error::{Result, TransactionError};

/// Length of an owner public key
pub const OWNER_LENGTH: usize = 33;

/// Length of a signature
pub const SIGNATURE_LENGTH: usize = 65;

/// Something that can sign transactions.
pub trait Signer {
    /// The owner public key, as carried in the `owner` field
    fn public_key(&self) -> Bytes;

    /// Sign `message`.
    fn sign(&self, message: &[u8]) -> Result<Bytes>;

    /// The wallet address of this signer: the hash of its public key
    fn address(&self) -> WalletAddress {
        WalletAddress::from_owner(&self.public_key())
    }
}

impl<S: Signer + ?Sized> Signer for &S {
    fn public_key(&self) -> Bytes {
        (**self).public_key()
    }

    fn sign(&self, message: &[u8]) -> Result<Bytes> {
        (**self).sign(message)
    }

    fn address(&self) -> WalletAddress {
        (**self).address()
    }
}

/// Check that `signature` over `message` was made by `owner`.
pub fn verify_signature(owner: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    let key = VerifyingKey::from_sec1_bytes(owner)
        .map_err(|_| TransactionError::invalid_field("owner", "not a secp256k1 public key"))?;
    let signature = Signature::from_raw(signature)
        .map_err(|e| TransactionError::invalid_signature(e.to_string()))?;

    let recovered = signature
        .recover_from_prehash(&prehash(message))
        .map_err(|e| TransactionError::invalid_signature(e.to_string()))?;
    if recovered != key {
        return Err(TransactionError::invalid_signature("not signed by owner"));
    }
    Ok(())
}

fn prehash(message: &[u8]) -> B256 {
    sha256(message)
}

#[cfg(feature = "local-signer")]
pub use local::Wallet;

#[cfg(feature = "local-signer")]
mod local {
    use alloy_primitives::B256;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use bytes::Bytes;

    use super::{Signer, prehash};
    use crate::error::{Result, TransactionError};

    /// A secp256k1 key held in memory.
    #[derive(Clone, Debug)]
    pub struct Wallet {
        inner: PrivateKeySigner,
        owner: Bytes,
    }

    impl Wallet {
        /// Load a wallet from a 32-byte secret key.
        pub fn from_bytes(secret: &B256) -> Result<Self> {
            PrivateKeySigner::from_bytes(secret)
                .map(Self::from)
                .map_err(|e| TransactionError::invalid_field("key", e.to_string()))
        }
    }

    impl From<PrivateKeySigner> for Wallet {
        fn from(inner: PrivateKeySigner) -> Self {
            let owner = Bytes::copy_from_slice(
                inner
                    .credential()
                    .verifying_key()
                    .to_encoded_point(true)
                    .as_bytes(),
            );
            Self { inner, owner }
        }
    }

    impl Signer for Wallet {
        fn public_key(&self) -> Bytes {
            self.owner.clone()
        }

        fn sign(&self, message: &[u8]) -> Result<Bytes> {
            let signature = self.inner.sign_hash_sync(&prehash(message))?;
            Ok(Bytes::copy_from_slice(&signature.as_bytes()))
        }
    }
}
