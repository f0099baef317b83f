//! Persistable progress of a chunked upload.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use strum::Display;
use weft_primitives::{ChunkManifest, TxId};

use crate::error::{Result, UploadError};

/// Where an upload is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UploadPhase {
    /// No chunk has been attempted
    NotStarted,
    /// Some chunks remain
    Uploading,
    /// Every chunk is accepted
    Complete,
    /// Stopped on a fatal error
    Failed,
}

/// Status of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    /// Not attempted yet
    Pending,
    /// The node holds it
    Accepted,
    /// Failed transiently this many times and not yet accepted
    Failed(u32),
}

/// Progress of one transaction's chunk upload.
///
/// Only chunk POST outcomes change it: an accepted chunk is added to
/// `accepted` (never removed), a transient failure bumps its retry count and a
/// fatal one records `failed_chunk`. It serializes to JSON and can be stored
/// and reloaded to resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadState {
    /// Transaction being uploaded
    pub transaction_id: TxId,
    /// Its `data_root`
    #[serde(with = "weft_primitives::encoding::b64_b256")]
    pub data_root: B256,
    /// Its `data_size`
    pub data_size: u64,
    /// Size of a full chunk
    pub chunk_size: u64,
    /// Number of chunks
    pub total_chunks: usize,
    /// Accepted chunk indices, in order
    pub accepted: BTreeSet<usize>,
    /// Transient failures per chunk
    pub retry_counts: BTreeMap<usize, u32>,
    /// End offset of the longest accepted prefix
    pub last_persisted_offset: u64,
    /// Chunk that caused a fatal error
    pub failed_chunk: Option<usize>,
}

impl UploadState {
    /// Fresh state for uploading `manifest`'s chunks of transaction `id`.
    pub fn new(transaction_id: TxId, manifest: &ChunkManifest) -> Self {
        let chunk_size = manifest.entries().first().map_or(0, |entry| entry.len());
        Self {
            transaction_id,
            data_root: manifest.data_root(),
            data_size: manifest.data_size(),
            chunk_size,
            total_chunks: manifest.len(),
            accepted: BTreeSet::new(),
            retry_counts: BTreeMap::new(),
            last_persisted_offset: 0,
            failed_chunk: None,
        }
    }

    /// Check that this state belongs to `manifest`.
    pub fn check_manifest(&self, manifest: &ChunkManifest) -> Result<()> {
        if self.data_root != manifest.data_root() {
            return Err(UploadError::state_mismatch("data_root differs from manifest"));
        }
        if self.data_size != manifest.data_size() || self.total_chunks != manifest.len() {
            return Err(UploadError::state_mismatch(format!(
                "state has {} bytes in {} chunks, manifest {} bytes in {} chunks",
                self.data_size,
                self.total_chunks,
                manifest.data_size(),
                manifest.len()
            )));
        }
        if let Some(&index) = self.accepted.iter().next_back() {
            if index >= self.total_chunks {
                return Err(UploadError::state_mismatch(format!(
                    "accepted chunk {index} out of range"
                )));
            }
        }
        Ok(())
    }

    /// Current phase
    pub fn phase(&self) -> UploadPhase {
        if self.is_complete() {
            UploadPhase::Complete
        } else if self.failed_chunk.is_some() {
            UploadPhase::Failed
        } else if self.accepted.is_empty() && self.retry_counts.is_empty() {
            UploadPhase::NotStarted
        } else {
            UploadPhase::Uploading
        }
    }

    /// Status of chunk `index`
    pub fn status(&self, index: usize) -> ChunkStatus {
        if self.accepted.contains(&index) {
            ChunkStatus::Accepted
        } else {
            match self.retry_counts.get(&index) {
                Some(&count) if count > 0 => ChunkStatus::Failed(count),
                _ => ChunkStatus::Pending,
            }
        }
    }

    /// Lowest chunk index not yet accepted
    pub fn next_pending(&self) -> Option<usize> {
        self.pending().next()
    }

    /// Every chunk index not yet accepted, in order
    pub fn pending(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.total_chunks).filter(|index| !self.accepted.contains(index))
    }

    /// Record chunk `index` as held by the node. Returns `false` if it
    /// already was.
    pub fn mark_accepted(&mut self, index: usize, manifest: &ChunkManifest) -> bool {
        if !self.accepted.insert(index) {
            return false;
        }
        let prefix = self.accepted.iter().zip(0..).take_while(|(a, i)| *a == i).count();
        if let Some(entry) = prefix.checked_sub(1).and_then(|last| manifest.entry(last)) {
            self.last_persisted_offset = entry.end;
        }
        true
    }

    /// Record a transient failure of chunk `index`, returning the new count.
    pub fn record_failure(&mut self, index: usize) -> u32 {
        let count = self.retry_counts.entry(index).or_insert(0);
        *count += 1;
        *count
    }

    /// Transient failures recorded for chunk `index`
    pub fn retries(&self, index: usize) -> u32 {
        self.retry_counts.get(&index).copied().unwrap_or(0)
    }

    /// Record a fatal error on chunk `index`. It stays recorded until
    /// [`UploadState::clear_failure`].
    pub const fn mark_failed(&mut self, index: usize) {
        self.failed_chunk = Some(index);
    }

    /// Forget the recorded fatal error, returning the chunk it was on.
    pub const fn clear_failure(&mut self) -> Option<usize> {
        self.failed_chunk.take()
    }

    /// Number of accepted chunks
    pub fn uploaded_chunks(&self) -> usize {
        self.accepted.len()
    }

    /// Whether every chunk is accepted
    pub fn is_complete(&self) -> bool {
        self.accepted.len() == self.total_chunks
    }

    /// Accepted chunks as a percentage of all chunks
    pub fn pct_complete(&self) -> f64 {
        if self.total_chunks == 0 {
            return 100.0;
        }
        self.accepted.len() as f64 / self.total_chunks as f64 * 100.0
    }
}
