//! Bounded parallel chunk uploads.
//!
//! Up to `concurrency` chunks are in flight at once, each with its own retry
//! loop. Acknowledgements arrive in any order; the shared [`UploadState`] only
//! ever gains accepted chunks, so every snapshot persisted along the way is a
//! valid point to resume from.

use std::pin::pin;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::RetryPolicy;
use crate::error::{Result, UploadError};
use crate::network::Network;
use crate::source::ChunkSource;
use crate::state::UploadState;
use crate::store::{MemoryStateStore, StateStore};
use crate::uploader::{Attempt, ChunkedUploader, persist, read_chunk, send_chunk};

impl<N, S> ChunkedUploader<N, S>
where
    N: Network + Sync,
    S: ChunkSource + Sync,
{
    /// Upload every remaining chunk with up to `concurrency` requests in
    /// flight.
    ///
    /// Needs a random-access source. Stops at the first fatal error or
    /// exhausted chunk and drops the requests still in flight.
    pub async fn run_parallel(&mut self, concurrency: usize, retry: &RetryPolicy) -> Result<()> {
        self.drive_parallel(concurrency, retry, None::<&MemoryStateStore>)
            .await
    }

    /// Like [`ChunkedUploader::run_parallel`], saving the manifest once and a
    /// state snapshot after every chunk settles.
    pub async fn run_parallel_with_store<St: StateStore + Sync>(
        &mut self,
        concurrency: usize,
        retry: &RetryPolicy,
        store: &St,
    ) -> Result<()> {
        store
            .save_manifest(&self.state.transaction_id, &self.manifest)
            .await
            .map_err(UploadError::store)?;
        self.drive_parallel(concurrency, retry, Some(store)).await
    }

    pub(crate) async fn drive_parallel<St: StateStore + Sync>(
        &mut self,
        concurrency: usize,
        retry: &RetryPolicy,
        store: Option<&St>,
    ) -> Result<()> {
        if let Some(index) = self.state.failed_chunk {
            return Err(UploadError::Aborted { index });
        }
        if !self.source.random_access() {
            return Err(UploadError::RandomAccessRequired);
        }

        let tx = self.state.transaction_id;
        let pending: Vec<usize> = self.state.pending().collect();
        info!(%tx, pending = pending.len(), concurrency, "starting parallel upload");

        let state = Mutex::new(self.state.clone());
        let mut outcome = Ok(());
        {
            let (network, source, manifest) = (&self.network, &self.source, &self.manifest);
            let state = &state;
            let mut settled = pin!(
                stream::iter(pending)
                    .map(move |index| async move {
                        let chunk = match read_chunk(source, manifest, index).await {
                            Ok(chunk) => chunk,
                            Err(err) => {
                                state.lock().mark_failed(index);
                                return Err(err);
                            }
                        };
                        loop {
                            match send_chunk(network, manifest, index, chunk.clone()).await {
                                Attempt::Stored { .. } => {
                                    state.lock().mark_accepted(index, manifest);
                                    return Ok(index);
                                }
                                Attempt::Transient(reason) => {
                                    let attempts = state.lock().record_failure(index);
                                    warn!(
                                        %tx,
                                        index,
                                        attempts,
                                        %reason,
                                        "chunk upload failed, will retry"
                                    );
                                    if !retry.allows(attempts) {
                                        state.lock().mark_failed(index);
                                        return Err(UploadError::RetriesExhausted {
                                            index,
                                            attempts,
                                        });
                                    }
                                    tokio::time::sleep(retry.delay_for(attempts)).await;
                                }
                                Attempt::Fatal(err) => {
                                    state.lock().mark_failed(index);
                                    return Err(err);
                                }
                            }
                        }
                    })
                    .buffer_unordered(concurrency.max(1))
            );

            while let Some(result) = settled.next().await {
                let snapshot: UploadState = state.lock().clone();
                if let Err(err) = persist(store, &snapshot).await {
                    outcome = Err(err);
                    break;
                }
                if let Err(err) = result {
                    warn!(%tx, error = %err, "parallel upload stopped");
                    outcome = Err(err);
                    break;
                }
            }
        }
        self.state = state.into_inner();
        outcome?;

        if self.state.is_complete() {
            info!(%tx, chunks = self.state.total_chunks, "upload complete");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy_primitives::B256;
    use bytes::Bytes;
    use weft_primitives::{ChunkManifest, ChunkPolicy, MerkleTree, split};
    use weft_transaction::{Transaction, TransactionBuilder, Wallet};

    use super::*;
    use crate::source::ReaderSource;
    use crate::testing::{Reply, StubNetwork, random_data};

    fn signed(data: &Bytes) -> (Transaction, ChunkManifest) {
        let tree =
            MerkleTree::build(&split(data.clone(), &ChunkPolicy::new(64, 16).unwrap())).unwrap();
        let wallet = Wallet::from_bytes(&B256::repeat_byte(0x11)).unwrap();
        let tx = TransactionBuilder::new()
            .reward(1u64)
            .with_tree(&tree)
            .sign(&wallet)
            .unwrap();
        (tx, tree.manifest())
    }

    #[tokio::test]
    async fn test_out_of_order_acks_complete() {
        let data = Bytes::from(random_data(12 * 64));
        let (tx, manifest) = signed(&data);
        let stub = StubNetwork::new();
        // Early chunks answer last.
        for index in 0..4 {
            let offset = manifest.entry(index).unwrap().end - 1;
            stub.delay_chunk(offset, Duration::from_millis(40 - 10 * index as u64));
        }
        stub.script_chunk(manifest.entry(7).unwrap().end - 1, [Reply::status(503)]);
        let store = MemoryStateStore::new();

        let mut uploader = ChunkedUploader::new(&stub, &tx, manifest, data).unwrap();
        uploader
            .run_parallel_with_store(4, &RetryPolicy::immediate(3), &store)
            .await
            .unwrap();

        assert!(uploader.is_complete());
        assert_eq!(uploader.state().retries(7), 1);
        assert_eq!(uploader.state().last_persisted_offset, 12 * 64);
        assert_eq!(stub.chunk_offsets().len(), 13);

        let saved = store.load_state(&tx.id()).await.unwrap().unwrap();
        assert_eq!(&saved, uploader.state());
    }

    #[tokio::test]
    async fn test_fatal_error_keeps_accepted_chunks() {
        let data = Bytes::from(random_data(8 * 64));
        let (tx, manifest) = signed(&data);
        let stub = StubNetwork::new();
        stub.script_chunk(
            manifest.entry(5).unwrap().end - 1,
            [Reply::body(400, "invalid_proof")],
        );

        let mut uploader = ChunkedUploader::new(&stub, &tx, manifest, data).unwrap();
        let err = uploader
            .run_parallel(2, &RetryPolicy::immediate(0))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::ChunkValidation { index: 5, .. }));
        assert_eq!(uploader.state().failed_chunk, Some(5));
        assert!(uploader.state().accepted.contains(&0));
        assert!(!uploader.state().accepted.contains(&5));
    }

    #[tokio::test]
    async fn test_forward_only_source_is_refused() {
        let data = Bytes::from(random_data(3 * 64));
        let (tx, manifest) = signed(&data);
        let source = ReaderSource::new(std::io::Cursor::new(data.to_vec()), data.len() as u64);
        let stub = StubNetwork::new();

        let mut uploader = ChunkedUploader::new(&stub, &tx, manifest, source).unwrap();
        assert!(matches!(
            uploader.run_parallel(4, &RetryPolicy::default()).await,
            Err(UploadError::RandomAccessRequired)
        ));
        assert!(stub.chunk_offsets().is_empty());
    }
}
