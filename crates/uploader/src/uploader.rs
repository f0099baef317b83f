//! The resumable chunk upload state machine.
//!
//! A [`ChunkedUploader`] walks a payload's chunks in index order. Each step
//! reads one chunk from its [`ChunkSource`], checks it against the proof in
//! the [`ChunkManifest`] and POSTs it to the node together with that proof.
//! The node's answer is classified:
//!
//! | response                                   | outcome                    |
//! |--------------------------------------------|----------------------------|
//! | 2xx                                        | accepted                   |
//! | 208, or a 4xx saying the chunk is stored   | accepted, counted once     |
//! | 4xx naming an invalid proof, size, offset  | fatal [`UploadError::ChunkValidation`] |
//! | other 4xx, 429, 5xx, transport errors      | transient, retried         |
//!
//! Progress lives in an [`UploadState`] that can be persisted after every
//! step; a new uploader built from that state and the manifest continues
//! where the old one stopped.

use alloy_primitives::B256;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use weft_primitives::{ChunkManifest, encoding};
use weft_transaction::Transaction;

use crate::config::RetryPolicy;
use crate::error::{Result, UploadError};
use crate::network::{Network, Response};
use crate::source::ChunkSource;
use crate::state::UploadState;
use crate::store::{MemoryStateStore, StateStore};

/// Path chunks are POSTed to.
pub const CHUNK_PATH: &str = "chunk";

/// Node error reasons meaning the chunk itself is unacceptable.
const FATAL_REASONS: [&str; 7] = [
    "invalid_proof",
    "chunk_too_big",
    "data_path_too_big",
    "offset_too_big",
    "data_size_too_big",
    "chunk_proof_ratio_not_attractive",
    "invalid_json",
];

/// Node error reasons meaning the chunk is already stored.
const STORED_REASONS: [&str; 2] = ["already_accepted", "chunk_already_stored"];

/// Body of a chunk POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkUpload {
    /// Root the proof leads to
    #[serde(with = "encoding::b64_b256")]
    pub data_root: B256,
    /// Payload size
    #[serde(with = "encoding::decimal")]
    pub data_size: u64,
    /// Merkle proof of the chunk
    #[serde(with = "encoding::b64")]
    pub data_path: Bytes,
    /// Chunk bytes
    #[serde(with = "encoding::b64")]
    pub chunk: Bytes,
    /// Offset of the chunk's last byte
    #[serde(with = "encoding::decimal")]
    pub offset: u64,
}

/// How a node answered a chunk POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Stored now
    Accepted,
    /// Stored by an earlier request
    AlreadyAccepted,
    /// May succeed on retry
    Transient(String),
    /// Will not succeed
    Fatal(String),
}

/// Classify a node response to a chunk POST.
pub fn classify(response: &Response) -> ChunkOutcome {
    match response.status {
        208 => ChunkOutcome::AlreadyAccepted,
        status if response.is_success() => {
            debug!(status, "chunk stored");
            ChunkOutcome::Accepted
        }
        429 => ChunkOutcome::Transient("rate limited".into()),
        500..=599 => ChunkOutcome::Transient(format!("status {}", response.status)),
        400..=499 => {
            let reason = error_reason(response);
            if STORED_REASONS.contains(&reason.as_str()) {
                ChunkOutcome::AlreadyAccepted
            } else if FATAL_REASONS.contains(&reason.as_str()) {
                ChunkOutcome::Fatal(reason)
            } else {
                ChunkOutcome::Transient(reason)
            }
        }
        status => ChunkOutcome::Fatal(format!("unexpected status {status}")),
    }
}

/// The `error` field of a JSON error body, or the body as text.
fn error_reason(response: &Response) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    response
        .json::<ErrorBody>()
        .map(|body| body.error)
        .unwrap_or_else(|_| response.text().trim().to_owned())
}

/// Result of one attempt at one chunk, before it is applied to state.
#[derive(Debug)]
pub(crate) enum Attempt {
    Stored { already: bool },
    Transient(String),
    Fatal(UploadError),
}

/// Read chunk `index` and check it against its proof.
pub(crate) async fn read_chunk<S: ChunkSource>(
    source: &S,
    manifest: &ChunkManifest,
    index: usize,
) -> Result<Bytes> {
    let entry = manifest
        .entry(index)
        .ok_or_else(|| UploadError::state_mismatch(format!("no chunk {index} in manifest")))?;
    let chunk = source
        .read(entry.range())
        .await
        .map_err(|source| UploadError::SourceRead { index, source })?;
    manifest
        .verify_chunk(index, &chunk)
        .map_err(|e| UploadError::chunk_validation(index, e.to_string()))?;
    Ok(chunk)
}

/// POST an already validated chunk `index`.
pub(crate) async fn send_chunk<N: Network>(
    network: &N,
    manifest: &ChunkManifest,
    index: usize,
    chunk: Bytes,
) -> Attempt {
    let Some(entry) = manifest.entry(index) else {
        return Attempt::Fatal(UploadError::state_mismatch(format!(
            "no chunk {index} in manifest"
        )));
    };

    let upload = ChunkUpload {
        data_root: manifest.data_root(),
        data_size: manifest.data_size(),
        data_path: entry.data_path.clone(),
        chunk,
        offset: entry.proof().offset,
    };
    let body = match serde_json::to_vec(&upload) {
        Ok(body) => body,
        Err(e) => return Attempt::Fatal(e.into()),
    };

    match network.post(CHUNK_PATH, body.into()).await {
        Err(e) => Attempt::Transient(e.to_string()),
        Ok(response) => match classify(&response) {
            ChunkOutcome::Accepted => Attempt::Stored { already: false },
            ChunkOutcome::AlreadyAccepted => Attempt::Stored { already: true },
            ChunkOutcome::Transient(reason) => Attempt::Transient(reason),
            ChunkOutcome::Fatal(reason) if (400..500).contains(&response.status) => {
                Attempt::Fatal(UploadError::chunk_validation(index, reason))
            }
            ChunkOutcome::Fatal(_) => Attempt::Fatal(UploadError::Rejected {
                status: response.status,
                body: response.text(),
            }),
        },
    }
}

/// Persist `state` if there is a store.
pub(crate) async fn persist<St: StateStore>(store: Option<&St>, state: &UploadState) -> Result<()> {
    if let Some(store) = store {
        store.save_state(state).await.map_err(UploadError::store)?;
    }
    Ok(())
}

/// A snapshot of upload progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Chunk handled by the step that produced this snapshot
    pub chunk: Option<usize>,
    /// Accepted chunks
    pub uploaded: usize,
    /// All chunks
    pub total: usize,
    /// `uploaded / total * 100`
    pub pct: f64,
}

/// Uploads one transaction's chunks.
#[derive(Debug)]
pub struct ChunkedUploader<N, S> {
    pub(crate) network: N,
    pub(crate) source: S,
    pub(crate) manifest: ChunkManifest,
    pub(crate) state: UploadState,
    /// Bytes of a chunk that failed transiently, kept for its retry.
    retained: Option<(usize, Bytes)>,
}

impl<N: Network, S: ChunkSource> ChunkedUploader<N, S> {
    /// Start uploading the chunks of `tx`.
    ///
    /// The manifest must commit to the same `data_root` and `data_size` as the
    /// transaction, and the source must have that many bytes.
    pub fn new(network: N, tx: &Transaction, manifest: ChunkManifest, source: S) -> Result<Self> {
        if tx.data_root() != Some(manifest.data_root()) || tx.data_size() != manifest.data_size() {
            return Err(UploadError::state_mismatch(
                "manifest does not match the transaction's data_root and data_size",
            ));
        }
        let state = UploadState::new(tx.id(), &manifest);
        Self::resume(network, state, manifest, source)
    }

    /// Continue from a saved state without rebuilding the tree.
    ///
    /// A state that stopped on a fatal error stays stopped; see
    /// [`ChunkedUploader::reset_failure`].
    pub fn resume(
        network: N,
        state: UploadState,
        manifest: ChunkManifest,
        source: S,
    ) -> Result<Self> {
        state.check_manifest(&manifest)?;
        if source.len() != manifest.data_size() {
            return Err(UploadError::state_mismatch(format!(
                "source has {} bytes, manifest {}",
                source.len(),
                manifest.data_size()
            )));
        }
        debug!(
            tx = %state.transaction_id,
            accepted = state.uploaded_chunks(),
            total = state.total_chunks,
            "uploader ready"
        );
        Ok(Self {
            network,
            source,
            manifest,
            state,
            retained: None,
        })
    }

    /// Upload the lowest-index chunk not yet accepted.
    ///
    /// Never sleeps: a transient failure is recorded and returned as
    /// [`UploadError::TransientNetwork`] for the caller to back off, and the
    /// chunk's bytes are kept so the retry does not read the source again.
    /// Fatal errors record the chunk in `failed_chunk` and every later call
    /// returns [`UploadError::Aborted`]; all earlier progress is kept.
    pub async fn upload_chunk(&mut self) -> Result<Progress> {
        if let Some(index) = self.state.failed_chunk {
            return Err(UploadError::Aborted { index });
        }
        let Some(index) = self.state.next_pending() else {
            return Ok(self.progress(None));
        };

        let chunk = match self.retained.take() {
            Some((retained, chunk)) if retained == index => chunk,
            _ => match read_chunk(&self.source, &self.manifest, index).await {
                Ok(chunk) => chunk,
                Err(err) => return self.apply(index, Attempt::Fatal(err)),
            },
        };

        let attempt = send_chunk(&self.network, &self.manifest, index, chunk.clone()).await;
        if matches!(attempt, Attempt::Transient(_)) {
            self.retained = Some((index, chunk));
        }
        self.apply(index, attempt)
    }

    /// Clear a recorded fatal failure so the failed chunk is attempted again.
    /// Returns the chunk that had failed.
    pub fn reset_failure(&mut self) -> Option<usize> {
        let index = self.state.clear_failure()?;
        info!(tx = %self.state.transaction_id, index, "clearing failed chunk");
        Some(index)
    }

    fn apply(&mut self, index: usize, attempt: Attempt) -> Result<Progress> {
        let tx = self.state.transaction_id;
        match attempt {
            Attempt::Stored { already } => {
                self.state.mark_accepted(index, &self.manifest);
                debug!(
                    %tx,
                    index,
                    already,
                    uploaded = self.state.uploaded_chunks(),
                    total = self.state.total_chunks,
                    "chunk accepted"
                );
                Ok(self.progress(Some(index)))
            }
            Attempt::Transient(reason) => {
                let attempts = self.state.record_failure(index);
                warn!(%tx, index, attempts, %reason, "chunk upload failed, will retry");
                Err(UploadError::TransientNetwork {
                    index,
                    attempts,
                    reason,
                })
            }
            Attempt::Fatal(err) => {
                self.state.mark_failed(index);
                warn!(%tx, index, error = %err, "chunk upload failed");
                Err(err)
            }
        }
    }

    /// Upload every remaining chunk, backing off between transient failures.
    pub async fn run(&mut self, retry: &RetryPolicy) -> Result<()> {
        self.drive(retry, None::<&MemoryStateStore>).await
    }

    /// Like [`ChunkedUploader::run`], saving the manifest once and the state
    /// after every step.
    pub async fn run_with_store<St: StateStore>(
        &mut self,
        retry: &RetryPolicy,
        store: &St,
    ) -> Result<()> {
        store
            .save_manifest(&self.state.transaction_id, &self.manifest)
            .await
            .map_err(UploadError::store)?;
        self.drive(retry, Some(store)).await
    }

    pub(crate) async fn drive<St: StateStore>(
        &mut self,
        retry: &RetryPolicy,
        store: Option<&St>,
    ) -> Result<()> {
        persist(store, &self.state).await?;

        while !self.state.is_complete() {
            match self.upload_chunk().await {
                Ok(_) => persist(store, &self.state).await?,
                Err(UploadError::TransientNetwork { index, attempts, .. }) => {
                    if !retry.allows(attempts) {
                        self.state.mark_failed(index);
                        persist(store, &self.state).await?;
                        return Err(UploadError::RetriesExhausted { index, attempts });
                    }
                    persist(store, &self.state).await?;
                    tokio::time::sleep(retry.delay_for(attempts)).await;
                }
                Err(err) => {
                    persist(store, &self.state).await?;
                    return Err(err);
                }
            }
        }

        info!(
            tx = %self.state.transaction_id,
            chunks = self.state.total_chunks,
            bytes = self.state.data_size,
            "upload complete"
        );
        Ok(())
    }
}

impl<N, S> ChunkedUploader<N, S> {
    fn progress(&self, chunk: Option<usize>) -> Progress {
        Progress {
            chunk,
            uploaded: self.state.uploaded_chunks(),
            total: self.state.total_chunks,
            pct: self.state.pct_complete(),
        }
    }

    /// Whether every chunk is accepted
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Accepted chunks as a percentage
    pub fn pct_complete(&self) -> f64 {
        self.state.pct_complete()
    }

    /// Number of accepted chunks
    pub fn uploaded_chunks(&self) -> usize {
        self.state.uploaded_chunks()
    }

    /// Number of chunks
    pub const fn total_chunks(&self) -> usize {
        self.state.total_chunks
    }

    /// Current state
    pub const fn state(&self) -> &UploadState {
        &self.state
    }

    /// The manifest being uploaded
    pub const fn manifest(&self) -> &ChunkManifest {
        &self.manifest
    }

    /// Stop, returning the state for persistence or a later resume
    pub fn into_state(self) -> UploadState {
        self.state
    }
}
