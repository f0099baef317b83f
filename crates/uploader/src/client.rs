//! Node client: transaction submission, lookups and uploads.

use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, info, warn};
use weft_primitives::{
    ChunkManifest, MerkleTree, PrimitivesError, TxId, WalletAddress, encoding, hash::sha256,
};
use weft_transaction::{Transaction, TransactionError, Winston};

use crate::config::UploaderConfig;
use crate::error::{Result, UploadError};
use crate::network::{Network, Response};
use crate::query::TagQuery;
use crate::source::ChunkSource;
use crate::state::UploadState;
use crate::store::{MemoryStateStore, StateStore};
use crate::uploader::ChunkedUploader;

/// How the node took a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Newly accepted
    Accepted,
    /// The node already had it
    AlreadyProcessed,
}

/// Where a transaction is on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Known but not yet mined
    Pending,
    /// Mined
    Confirmed(Confirmation),
    /// Unknown to the node
    NotFound,
}

/// Block inclusion details of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Confirmation {
    /// Height of the including block
    pub block_height: u64,
    /// Independent hash of the including block
    pub block_indep_hash: String,
    /// Blocks mined on top, plus one
    pub number_of_confirmations: u64,
}

/// Summary of the node's view of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeInfo {
    /// Network name
    pub network: String,
    /// Node software release
    #[serde(default)]
    pub release: u64,
    /// Current block height
    pub height: u64,
    /// Hash of the current block
    pub current: String,
    /// Number of blocks the node holds
    #[serde(default)]
    pub blocks: u64,
    /// Number of connected peers
    #[serde(default)]
    pub peers: u64,
}

/// A client for one node.
#[derive(Debug)]
pub struct NodeClient<N> {
    network: N,
    config: UploaderConfig,
}

#[cfg(feature = "http")]
impl NodeClient<crate::network::HttpNetwork> {
    /// Connect over HTTP to the node named in `config`.
    pub fn connect(config: UploaderConfig) -> Result<Self> {
        let network =
            crate::network::HttpNetwork::new(config.node.clone(), config.request_timeout())?;
        Ok(Self::new(network, config))
    }
}

impl<N: Network> NodeClient<N> {
    /// Create a client over `network`
    pub const fn new(network: N, config: UploaderConfig) -> Self {
        Self { network, config }
    }

    /// The transport
    pub const fn network(&self) -> &N {
        &self.network
    }

    /// The configuration
    pub const fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Verify and POST a transaction.
    ///
    /// The transaction is sent as is: with its data inline if it carries any,
    /// as a header only otherwise. A 400 naming the anchor becomes
    /// [`UploadError::StaleAnchor`]; refresh it, rebuild and re-sign.
    pub async fn submit(&self, tx: &Transaction) -> Result<SubmitOutcome> {
        tx.verify()?;
        let body = serde_json::to_vec(tx)?;
        let response = self.network.post("tx", body.into()).await?;

        match response.status {
            208 => {
                debug!(tx = %tx.id(), "transaction already processed");
                Ok(SubmitOutcome::AlreadyProcessed)
            }
            _ if response.is_success() => {
                info!(
                    tx = %tx.id(),
                    data_size = tx.data_size(),
                    inline = tx.data().is_some(),
                    "transaction submitted"
                );
                Ok(SubmitOutcome::Accepted)
            }
            400 if is_anchor_rejection(&response) => Err(UploadError::StaleAnchor(response.text())),
            status => Err(UploadError::Rejected {
                status,
                body: response.text(),
            }),
        }
    }

    /// Submit `tx` with its payload.
    ///
    /// Payloads up to the configured inline threshold travel inside the
    /// transaction. Larger ones are submitted as a header and then uploaded
    /// chunk by chunk with the configured retry policy and concurrency.
    pub async fn submit_with_data(&self, tx: &Transaction, data: Bytes) -> Result<TxId>
    where
        N: Sync,
    {
        if tx.data_size() <= self.config.inline_threshold {
            let tx = tx.clone().with_data(data)?;
            self.submit(&tx).await?;
            return Ok(tx.id());
        }

        let manifest = self.manifest_for(&data).await?;
        let header = tx.clone().without_data();
        let mut uploader = ChunkedUploader::new(&self.network, &header, manifest, data)?;
        self.submit(&header).await?;
        self.drive(&mut uploader, None::<&MemoryStateStore>).await?;
        Ok(header.id())
    }

    /// Upload the chunks of an already submitted transaction, resuming from
    /// `store` if it holds progress for it.
    ///
    /// On a fresh start the manifest is built by reading `source` once, so a
    /// forward-only source must be resumed from a stored manifest or uploaded
    /// through [`ChunkedUploader`] directly.
    pub async fn upload_chunks<S, St>(
        &self,
        tx: &Transaction,
        source: S,
        store: &St,
    ) -> Result<UploadState>
    where
        N: Sync,
        S: ChunkSource + Sync,
        St: StateStore + Sync,
    {
        let id = tx.id();
        let state = store.load_state(&id).await.map_err(UploadError::store)?;
        let manifest = store.load_manifest(&id).await.map_err(UploadError::store)?;

        let mut uploader = match (state, manifest) {
            (Some(state), Some(manifest)) => {
                if tx.data_root() != Some(manifest.data_root()) {
                    return Err(UploadError::state_mismatch(
                        "stored manifest does not match the transaction",
                    ));
                }
                info!(
                    tx = %id,
                    accepted = state.uploaded_chunks(),
                    total = state.total_chunks,
                    "resuming upload"
                );
                ChunkedUploader::resume(&self.network, state, manifest, source)?
            }
            (Some(state), None) => {
                warn!(
                    tx = %id,
                    accepted = state.uploaded_chunks(),
                    "stored state has no manifest"
                );
                return Err(UploadError::state_mismatch(
                    "stored state has no manifest to resume from",
                ));
            }
            (None, Some(manifest)) => ChunkedUploader::new(&self.network, tx, manifest, source)?,
            (None, None) => {
                let manifest = self.manifest_for(&source).await?;
                ChunkedUploader::new(&self.network, tx, manifest, source)?
            }
        };

        store
            .save_manifest(&id, uploader.manifest())
            .await
            .map_err(UploadError::store)?;
        self.drive(&mut uploader, Some(store)).await?;
        Ok(uploader.into_state())
    }

    async fn drive<S, St>(
        &self,
        uploader: &mut ChunkedUploader<&N, S>,
        store: Option<&St>,
    ) -> Result<()>
    where
        N: Sync,
        S: ChunkSource + Sync,
        St: StateStore + Sync,
    {
        let retry = &self.config.retry;
        #[cfg(feature = "parallel")]
        if self.config.concurrency > 1 && uploader.source.random_access() {
            return uploader
                .drive_parallel(self.config.concurrency, retry, store)
                .await;
        }
        uploader.drive(retry, store).await
    }

    /// Build the chunk manifest of `source` under the configured policy,
    /// reading it once in order.
    pub async fn manifest_for<S: ChunkSource>(&self, source: &S) -> Result<ChunkManifest> {
        let policy = self.config.chunk_policy;
        let mut digests = Vec::with_capacity(policy.chunk_count(source.len()));
        for (index, range) in policy.boundaries(source.len()).enumerate() {
            let bytes = source
                .read(range.clone())
                .await
                .map_err(|source| UploadError::SourceRead { index, source })?;
            digests.push((sha256(&bytes), range));
        }
        let tree = MerkleTree::from_digests(digests).map_err(PrimitivesError::from)?;
        Ok(tree.manifest())
    }

    /// Fetch the status of transaction `id`.
    pub async fn status(&self, id: &TxId) -> Result<TxStatus> {
        let response = self.network.get(&format!("tx/{id}/status")).await?;
        match response.status {
            200 => Ok(TxStatus::Confirmed(response.json()?)),
            202 => Ok(TxStatus::Pending),
            404 => Ok(TxStatus::NotFound),
            status => Err(rejected(status, &response)),
        }
    }

    /// Poll the status of `id` until it is mined or the configured timeout
    /// passes.
    pub async fn wait_for_confirmation(&self, id: &TxId) -> Result<Confirmation> {
        let policy = self.config.confirmation;
        let poll = async {
            let mut interval = tokio::time::interval(
                policy
                    .poll_interval()
                    .max(std::time::Duration::from_millis(1)),
            );
            loop {
                interval.tick().await;
                match self.status(id).await {
                    Ok(TxStatus::Confirmed(confirmation)) => return Ok(confirmation),
                    Ok(status) => debug!(tx = %id, ?status, "not confirmed yet"),
                    Err(err) if err.is_retryable() => {
                        warn!(tx = %id, error = %err, "status poll failed");
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        tokio::time::timeout(policy.timeout(), poll)
            .await
            .map_err(|_| UploadError::ConfirmationTimeout {
                id: *id,
                waited: policy.timeout(),
            })?
    }

    /// Fetch and verify transaction `id`. Data is not included.
    pub async fn transaction(&self, id: &TxId) -> Result<Transaction> {
        let response = self.network.get(&format!("tx/{id}")).await?;
        match response.status {
            200 => {
                let tx: Transaction = response.json()?;
                if tx.id() != *id {
                    return Err(TransactionError::IdMismatch {
                        expected: *id,
                        actual: tx.id(),
                    }
                    .into());
                }
                tx.verify()?;
                Ok(tx)
            }
            404 => Err(UploadError::NotFound(format!("transaction {id}"))),
            status => Err(rejected(status, &response)),
        }
    }

    /// Fetch the payload of transaction `id`.
    pub async fn data(&self, id: &TxId) -> Result<Bytes> {
        let response = self.network.get(&format!("tx/{id}/data")).await?;
        match response.status {
            200 => {
                let data = encoding::decode(response.text().trim()).map_err(PrimitivesError::from)?;
                Ok(data.into())
            }
            404 => Err(UploadError::NotFound(format!("data of {id}"))),
            status => Err(rejected(status, &response)),
        }
    }

    /// Fetch a fresh anchor for `last_tx`.
    pub async fn anchor(&self) -> Result<String> {
        let response = self.network.get("tx_anchor").await?;
        ok_text(&response)
    }

    /// Fetch the id of the last transaction sent from `address`, empty if
    /// there is none.
    pub async fn last_transaction(&self, address: &WalletAddress) -> Result<String> {
        let response = self.network.get(&format!("wallet/{address}/last_tx")).await?;
        ok_text(&response)
    }

    /// Fetch the fee for storing `bytes` bytes, optionally in a transfer to
    /// `target`.
    pub async fn price(&self, bytes: u64, target: Option<&WalletAddress>) -> Result<Winston> {
        let path = match target {
            Some(target) => format!("price/{bytes}/{target}"),
            None => format!("price/{bytes}"),
        };
        let response = self.network.get(&path).await?;
        Ok(ok_text(&response)?.parse()?)
    }

    /// Fetch the balance of `address`.
    pub async fn balance(&self, address: &WalletAddress) -> Result<Winston> {
        let response = self.network.get(&format!("wallet/{address}/balance")).await?;
        Ok(ok_text(&response)?.parse()?)
    }

    /// Fetch the node's view of the chain.
    pub async fn info(&self) -> Result<NodeInfo> {
        let response = self.network.get("info").await?;
        if !response.is_success() {
            return Err(rejected(response.status, &response));
        }
        Ok(response.json()?)
    }

    /// Ids of transactions matching `query`.
    pub async fn search(&self, query: &TagQuery) -> Result<Vec<TxId>> {
        let body = serde_json::to_vec(query)?;
        let response = self.network.post("arql", body.into()).await?;
        match response.status {
            // The node answers an empty result with no body.
            204 => Ok(Vec::new()),
            _ if response.is_success() && response.body.is_empty() => Ok(Vec::new()),
            _ if response.is_success() => Ok(response.json()?),
            status => Err(rejected(status, &response)),
        }
    }
}

fn is_anchor_rejection(response: &Response) -> bool {
    let body = response.text().to_ascii_lowercase();
    body.contains("anchor") || body.contains("last_tx")
}

fn rejected(status: u16, response: &Response) -> UploadError {
    UploadError::Rejected {
        status,
        body: response.text(),
    }
}

fn ok_text(response: &Response) -> Result<String> {
    if response.is_success() {
        Ok(response.text().trim().to_owned())
    } else {
        Err(rejected(response.status, response))
    }
}
