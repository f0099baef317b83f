//! Unsigned and signed transactions.

use std::str::FromStr;

use alloy_primitives::B256;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use weft_primitives::{
    B384, ChunkPolicy, DeepHashItem, MerkleTree, TxId, WalletAddress, deep_hash,
    encoding::{self, b64},
    split,
};

use crate::builder::TransactionBuilder;
use crate::error::{Result, TransactionError};
use crate::signer::{Signer, verify_signature};
use crate::{Tag, Winston};

/// The only transaction format this crate produces and accepts.
pub const FORMAT: u8 = 2;

/// Fields covered by the signature, apart from the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fields {
    pub(crate) target: Option<WalletAddress>,
    pub(crate) quantity: Winston,
    pub(crate) reward: Winston,
    pub(crate) last_tx: Bytes,
    pub(crate) tags: Vec<Tag>,
    pub(crate) data_size: u64,
    pub(crate) data_root: Option<B256>,
}

impl Fields {
    /// Deep hash of `[format, owner, target, quantity, reward, last_tx, tags,
    /// data_size, data_root]`, numbers as decimal strings.
    fn signature_data(&self, owner: &[u8]) -> B384 {
        let format = FORMAT.to_string();
        let quantity = self.quantity.to_string();
        let reward = self.reward.to_string();
        let data_size = self.data_size.to_string();
        let target = self.target.as_ref().map(|t| t.as_bytes()).unwrap_or_default();
        let data_root = self.data_root.as_ref().map(|r| r.as_slice()).unwrap_or_default();

        let tags = DeepHashItem::list(self.tags.iter().map(|tag| {
            DeepHashItem::list([DeepHashItem::blob(&tag.name), DeepHashItem::blob(&tag.value)])
        }));

        deep_hash(&DeepHashItem::list([
            DeepHashItem::blob(format.as_bytes()),
            DeepHashItem::blob(owner),
            DeepHashItem::blob(target),
            DeepHashItem::blob(quantity.as_bytes()),
            DeepHashItem::blob(reward.as_bytes()),
            DeepHashItem::blob(&self.last_tx),
            tags,
            DeepHashItem::blob(data_size.as_bytes()),
            DeepHashItem::blob(data_root),
        ]))
    }
}

/// A validated transaction that has not been signed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub(crate) fields: Fields,
    pub(crate) data: Option<Bytes>,
}

impl UnsignedTransaction {
    /// The message `owner` would sign.
    pub fn signature_data(&self, owner: &[u8]) -> B384 {
        self.fields.signature_data(owner)
    }

    /// Payload size in bytes
    pub const fn data_size(&self) -> u64 {
        self.fields.data_size
    }

    /// Merkle root of the payload, absent for an empty payload
    pub const fn data_root(&self) -> Option<B256> {
        self.fields.data_root
    }

    /// Sign with `signer`, fixing every field.
    pub fn sign<S: Signer>(self, signer: &S) -> Result<Transaction> {
        let owner = signer.public_key();
        let message = self.fields.signature_data(&owner);
        let signature = signer.sign(message.as_slice())?;
        let id = TxId::from_signature(&signature);

        Ok(Transaction {
            fields: self.fields,
            owner,
            signature,
            id,
            data: self.data,
        })
    }
}

/// A signed transaction.
///
/// Fields are read-only. To change one, go back to a builder with
/// [`Transaction::into_builder`] and sign again, which yields a new id.
///
/// Inline `data` is not covered by the signature; [`Transaction::verify`]
/// checks it against `data_root` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "TransactionJson", try_from = "TransactionJson")]
pub struct Transaction {
    fields: Fields,
    owner: Bytes,
    signature: Bytes,
    id: TxId,
    data: Option<Bytes>,
}

impl Transaction {
    /// Transaction format
    pub const fn format(&self) -> u8 {
        FORMAT
    }

    /// Transaction id: the hash of the signature
    pub const fn id(&self) -> TxId {
        self.id
    }

    /// Owner public key
    pub const fn owner(&self) -> &Bytes {
        &self.owner
    }

    /// Address of the owner
    pub fn owner_address(&self) -> WalletAddress {
        WalletAddress::from_owner(&self.owner)
    }

    /// Recipient of `quantity`, if any
    pub const fn target(&self) -> Option<WalletAddress> {
        self.fields.target
    }

    /// Amount transferred to `target`
    pub const fn quantity(&self) -> Winston {
        self.fields.quantity
    }

    /// Fee paid to the network
    pub const fn reward(&self) -> Winston {
        self.fields.reward
    }

    /// Anchor: a recent block hash or the owner's last transaction id
    pub const fn last_tx(&self) -> &Bytes {
        &self.fields.last_tx
    }

    /// Tags
    pub fn tags(&self) -> &[Tag] {
        &self.fields.tags
    }

    /// Payload size in bytes
    pub const fn data_size(&self) -> u64 {
        self.fields.data_size
    }

    /// Merkle root of the payload
    pub const fn data_root(&self) -> Option<B256> {
        self.fields.data_root
    }

    /// Signature over [`Transaction::signature_data`]
    pub const fn signature(&self) -> &Bytes {
        &self.signature
    }

    /// Inline payload, if carried
    pub const fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    /// The deep hash the owner signed
    pub fn signature_data(&self) -> B384 {
        self.fields.signature_data(&self.owner)
    }

    /// Drop the inline payload, e.g. before uploading it chunk by chunk.
    pub fn without_data(mut self) -> Self {
        self.data = None;
        self
    }

    /// Attach an inline payload. It must match `data_size` and `data_root`.
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Result<Self> {
        self.data = Some(data.into());
        self.verify_data()?;
        Ok(self)
    }

    /// Check the signature, the id and any inline payload.
    ///
    /// Anything that alters a signed field, the id or the payload after
    /// signing is rejected.
    pub fn verify(&self) -> Result<()> {
        verify_signature(&self.owner, self.signature_data().as_slice(), &self.signature)?;

        let expected = TxId::from_signature(&self.signature);
        if expected != self.id {
            return Err(TransactionError::IdMismatch {
                expected,
                actual: self.id,
            });
        }

        self.verify_data()
    }

    fn verify_data(&self) -> Result<()> {
        let Some(data) = &self.data else {
            return Ok(());
        };
        if data.len() as u64 != self.fields.data_size {
            return Err(TransactionError::invalid_field(
                "data",
                format!("{} bytes, data_size is {}", data.len(), self.fields.data_size),
            ));
        }
        if data.is_empty() {
            return Ok(());
        }
        let tree = MerkleTree::build(&split(data.clone(), &ChunkPolicy::default()))?;
        if Some(tree.root()) != self.fields.data_root {
            return Err(TransactionError::invalid_field("data", "does not match data_root"));
        }
        Ok(())
    }

    /// Return to a builder holding the same fields, to change and re-sign.
    pub fn into_builder(self) -> TransactionBuilder {
        TransactionBuilder::from_parts(self.fields, self.data)
    }
}

/// Wire form of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransactionJson {
    format: u8,
    id: TxId,
    #[serde(with = "b64")]
    last_tx: Bytes,
    #[serde(with = "b64")]
    owner: Bytes,
    tags: Vec<Tag>,
    target: String,
    quantity: Winston,
    #[serde(default, with = "b64")]
    data: Bytes,
    #[serde(with = "encoding::decimal")]
    data_size: u64,
    data_root: String,
    reward: Winston,
    #[serde(with = "b64")]
    signature: Bytes,
}

impl From<Transaction> for TransactionJson {
    fn from(tx: Transaction) -> Self {
        Self {
            format: FORMAT,
            id: tx.id,
            last_tx: tx.fields.last_tx,
            owner: tx.owner,
            tags: tx.fields.tags,
            target: tx.fields.target.map(|t| t.to_string()).unwrap_or_default(),
            quantity: tx.fields.quantity,
            data: tx.data.unwrap_or_default(),
            data_size: tx.fields.data_size,
            data_root: tx.fields.data_root.map(encoding::encode).unwrap_or_default(),
            reward: tx.fields.reward,
            signature: tx.signature,
        }
    }
}

impl TryFrom<TransactionJson> for Transaction {
    type Error = TransactionError;

    fn try_from(json: TransactionJson) -> Result<Self> {
        if json.format != FORMAT {
            return Err(TransactionError::UnsupportedFormat(json.format));
        }

        let target = optional_b256(&json.target, "target")?.map(WalletAddress::from);
        let data_root = optional_b256(&json.data_root, "data_root")?;
        let data = (!json.data.is_empty()).then_some(json.data);

        Ok(Self {
            fields: Fields {
                target,
                quantity: json.quantity,
                reward: json.reward,
                last_tx: json.last_tx,
                tags: json.tags,
                data_size: json.data_size,
                data_root,
            },
            owner: json.owner,
            signature: json.signature,
            id: json.id,
            data,
        })
    }
}

fn optional_b256(value: &str, field: &'static str) -> Result<Option<B256>> {
    if value.is_empty() {
        return Ok(None);
    }
    WalletAddress::from_str(value)
        .map(|address| Some(address.0))
        .map_err(|e| TransactionError::invalid_field(field, e.to_string()))
}
