//! Assembling and validating transactions.

use std::fmt::Display;

use alloy_primitives::B256;
use bytes::Bytes;
use weft_primitives::{
    ChunkManifest, ChunkPolicy, MerkleTree, WalletAddress, encoding, split,
};

use crate::error::{Result, TransactionError};
use crate::signer::Signer;
use crate::transaction::{Fields, Transaction, UnsignedTransaction};
use crate::{Tag, Winston};

/// Accepted anchor lengths: empty, a transaction id, or a block hash.
const ANCHOR_LENGTHS: [usize; 3] = [0, 32, 48];

/// Builder for [`Transaction`]s.
///
/// Values are taken in their textual form where the network uses one
/// (base64url for addresses and anchors, decimal for amounts) and validated
/// together in [`TransactionBuilder::build`].
///
/// ```
/// use alloy_primitives::B256;
/// use weft_transaction::{Signer, TransactionBuilder, Wallet};
///
/// let wallet = Wallet::from_bytes(&B256::repeat_byte(0x11)).unwrap();
/// let tx = TransactionBuilder::from_data(b"hello weave".to_vec())
///     .reward(1000u64)
///     .tag("Content-Type", "text/plain")
///     .sign(&wallet)
///     .unwrap();
///
/// assert_eq!(tx.data_size(), 11);
/// assert_eq!(tx.owner_address(), wallet.address());
/// tx.verify().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    target: Option<String>,
    quantity: Option<String>,
    reward: Option<String>,
    last_tx: Option<String>,
    tags: Vec<Tag>,
    data: Option<Bytes>,
    data_size: Option<u64>,
    data_root: Option<B256>,
}

impl TransactionBuilder {
    /// An empty builder: no payload, no transfer, zero reward.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder carrying `data` inline; `data_root` is computed on build.
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self::new().data(data)
    }

    pub(crate) fn from_parts(fields: Fields, data: Option<Bytes>) -> Self {
        Self {
            target: fields.target.map(|t| t.to_string()),
            quantity: Some(fields.quantity.to_string()),
            reward: Some(fields.reward.to_string()),
            last_tx: Some(encoding::encode(&fields.last_tx)),
            tags: fields.tags,
            data,
            data_size: Some(fields.data_size),
            data_root: fields.data_root,
        }
    }

    /// Recipient address (base64url)
    pub fn target(mut self, target: impl Display) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// Amount transferred to the target, in winston
    pub fn quantity(mut self, quantity: impl Display) -> Self {
        self.quantity = Some(quantity.to_string());
        self
    }

    /// Fee, in winston
    pub fn reward(mut self, reward: impl Display) -> Self {
        self.reward = Some(reward.to_string());
        self
    }

    /// Anchor (base64url), as returned by the node's anchor endpoint
    pub fn last_tx(mut self, anchor: impl Display) -> Self {
        self.last_tx = Some(anchor.to_string());
        self
    }

    /// Append a tag
    pub fn tag(mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    /// Append tags
    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Carry `data` inline and commit to it.
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        self.data_size = Some(data.len() as u64);
        self.data_root = None;
        self.data = Some(data);
        self
    }

    /// Set the payload commitment directly
    pub fn data_root(mut self, data_root: B256, data_size: u64) -> Self {
        self.data_root = Some(data_root);
        self.data_size = Some(data_size);
        self
    }

    /// Declare the payload size without a root
    pub fn data_size(mut self, data_size: u64) -> Self {
        self.data_size = Some(data_size);
        self
    }

    /// Commit to the payload a merkle tree was built over.
    pub fn with_tree(self, tree: &MerkleTree) -> Self {
        self.data_root(tree.root(), tree.data_size())
    }

    /// Commit to the payload a manifest describes, for streamed uploads.
    pub fn with_manifest(self, manifest: &ChunkManifest) -> Self {
        self.data_root(manifest.data_root(), manifest.data_size())
    }

    /// Validate every field.
    pub fn build(self) -> Result<UnsignedTransaction> {
        let target = self
            .target
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<WalletAddress>()
                    .map_err(|e| TransactionError::invalid_field("target", e.to_string()))
            })
            .transpose()?;
        let quantity = parse_amount(self.quantity.as_deref(), "quantity")?;
        let reward = parse_amount(self.reward.as_deref(), "reward")?;

        if !quantity.is_zero() && target.is_none() {
            return Err(TransactionError::invalid_field(
                "quantity",
                "a transfer requires a target",
            ));
        }

        let last_tx = match self.last_tx.as_deref() {
            None | Some("") => Bytes::new(),
            Some(anchor) => Bytes::from(
                encoding::decode(anchor)
                    .map_err(|e| TransactionError::invalid_field("last_tx", e.to_string()))?,
            ),
        };
        if !ANCHOR_LENGTHS.contains(&last_tx.len()) {
            return Err(TransactionError::invalid_field(
                "last_tx",
                format!("{} bytes is not an anchor length", last_tx.len()),
            ));
        }

        if self.tags.iter().any(|tag| tag.name.is_empty()) {
            return Err(TransactionError::invalid_field("tags", "empty tag name"));
        }

        let data_size = self.data_size.unwrap_or_default();
        let mut data_root = self.data_root;
        if let Some(data) = &self.data {
            if data.len() as u64 != data_size {
                return Err(TransactionError::invalid_field(
                    "data",
                    format!("{} bytes, data_size is {data_size}", data.len()),
                ));
            }
            if data_root.is_none() && !data.is_empty() {
                let tree = MerkleTree::build(&split(data.clone(), &ChunkPolicy::default()))?;
                data_root = Some(tree.root());
            }
        }
        if data_size > 0 && data_root.is_none() {
            return Err(TransactionError::invalid_field(
                "data_root",
                "required when data_size is non-zero",
            ));
        }

        Ok(UnsignedTransaction {
            fields: Fields {
                target,
                quantity,
                reward,
                last_tx,
                tags: self.tags,
                data_size,
                data_root,
            },
            data: self.data,
        })
    }

    /// Validate and sign.
    pub fn sign<S: Signer>(self, signer: &S) -> Result<Transaction> {
        self.build()?.sign(signer)
    }
}

fn parse_amount(value: Option<&str>, field: &'static str) -> Result<Winston> {
    value.map_or(Ok(Winston::ZERO), |value| {
        value.parse().map_err(|e| match e {
            TransactionError::InvalidField { reason, .. } => {
                TransactionError::invalid_field(field, reason)
            }
            other => other,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Wallet;
    use weft_primitives::MAX_CHUNK_SIZE;

    fn field_of(err: TransactionError) -> &'static str {
        match err {
            TransactionError::InvalidField { field, .. } => field,
            other => panic!("expected InvalidField, got {other:?}"),
        }
    }

    fn target() -> WalletAddress {
        WalletAddress::new([7u8; 32])
    }

    #[test]
    fn test_defaults_are_empty() {
        let unsigned = TransactionBuilder::new().build().unwrap();
        assert_eq!(unsigned.data_size(), 0);
        assert_eq!(unsigned.data_root(), None);
        assert_eq!(unsigned.fields.quantity, Winston::ZERO);
        assert!(unsigned.fields.last_tx.is_empty());
    }

    #[test]
    fn test_rejects_bad_amounts() {
        let err = TransactionBuilder::new()
            .target(target())
            .quantity("-1")
            .build()
            .unwrap_err();
        assert_eq!(field_of(err), "quantity");

        let err = TransactionBuilder::new().reward("ten").build().unwrap_err();
        assert_eq!(field_of(err), "reward");
    }

    #[test]
    fn test_rejects_malformed_target() {
        let short = encoding::encode([1u8; 31]);
        let err = TransactionBuilder::new().target(short).build().unwrap_err();
        assert_eq!(field_of(err), "target");

        let err = TransactionBuilder::new().target("***").build().unwrap_err();
        assert_eq!(field_of(err), "target");
    }

    #[test]
    fn test_transfer_requires_target() {
        let err = TransactionBuilder::new().quantity(5u64).build().unwrap_err();
        assert_eq!(field_of(err), "quantity");

        let ok = TransactionBuilder::new()
            .target(target())
            .quantity(5u64)
            .build()
            .unwrap();
        assert_eq!(ok.fields.target, Some(target()));
    }

    #[test]
    fn test_data_size_requires_root() {
        let err = TransactionBuilder::new().data_size(10).build().unwrap_err();
        assert_eq!(field_of(err), "data_root");
    }

    #[test]
    fn test_rejects_empty_tag_name() {
        let err = TransactionBuilder::new().tag("", "v").build().unwrap_err();
        assert_eq!(field_of(err), "tags");
    }

    #[test]
    fn test_rejects_bad_anchor() {
        let err = TransactionBuilder::new()
            .last_tx(encoding::encode([0u8; 20]))
            .build()
            .unwrap_err();
        assert_eq!(field_of(err), "last_tx");

        let block_hash = encoding::encode([9u8; 48]);
        let ok = TransactionBuilder::new().last_tx(block_hash).build().unwrap();
        assert_eq!(ok.fields.last_tx.len(), 48);
    }

    #[test]
    fn test_from_data_commits_to_payload() {
        let data = vec![3u8; 2 * MAX_CHUNK_SIZE + 5];
        let tree = MerkleTree::build(&split(data.clone(), &ChunkPolicy::default())).unwrap();

        let unsigned = TransactionBuilder::from_data(data).build().unwrap();
        assert_eq!(unsigned.data_root(), Some(tree.root()));
        assert_eq!(unsigned.data_size(), tree.data_size());

        let empty = TransactionBuilder::from_data(Vec::new()).build().unwrap();
        assert_eq!(empty.data_root(), None);
        assert_eq!(empty.data_size(), 0);
    }

    #[test]
    fn test_with_manifest_matches_from_data() {
        let data = vec![5u8; MAX_CHUNK_SIZE + 100];
        let manifest = MerkleTree::build(&split(data.clone(), &ChunkPolicy::default()))
            .unwrap()
            .manifest();
        let wallet = Wallet::from_bytes(&B256::repeat_byte(0x11)).unwrap();

        let streamed = TransactionBuilder::new()
            .with_manifest(&manifest)
            .sign(&wallet)
            .unwrap();
        let inline = TransactionBuilder::from_data(data).sign(&wallet).unwrap();

        assert_eq!(streamed.data_root(), inline.data_root());
        assert_eq!(streamed.signature_data(), inline.signature_data());
        assert_eq!(streamed.id(), inline.id());
    }
}
