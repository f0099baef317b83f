//! Persistence for upload state and manifests.
//!
//! An upload is resumable from two records keyed by transaction id: the
//! [`ChunkManifest`], written once when the upload starts, and the
//! [`UploadState`], rewritten as chunks are accepted.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use weft_primitives::{ChunkManifest, TxId};

use crate::state::UploadState;

/// A trait for storing and loading upload progress.
pub trait StateStore {
    /// The error type returned by store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Loads the state of an upload, if one was saved.
    fn load_state(
        &self,
        id: &TxId,
    ) -> impl Future<Output = Result<Option<UploadState>, Self::Error>> + Send;

    /// Saves or replaces the state of an upload.
    fn save_state(
        &self,
        state: &UploadState,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Loads the manifest of an upload, if one was saved.
    fn load_manifest(
        &self,
        id: &TxId,
    ) -> impl Future<Output = Result<Option<ChunkManifest>, Self::Error>> + Send;

    /// Saves the manifest of an upload.
    fn save_manifest(
        &self,
        id: &TxId,
        manifest: &ChunkManifest,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Removes everything stored for an upload.
    fn remove(&self, id: &TxId) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Keeps upload records in memory.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<TxId, UploadState>>,
    manifests: Mutex<HashMap<TxId, ChunkManifest>>,
}

impl MemoryStateStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    type Error = Infallible;

    async fn load_state(&self, id: &TxId) -> Result<Option<UploadState>, Self::Error> {
        Ok(self.states.lock().get(id).cloned())
    }

    async fn save_state(&self, state: &UploadState) -> Result<(), Self::Error> {
        self.states
            .lock()
            .insert(state.transaction_id, state.clone());
        Ok(())
    }

    async fn load_manifest(&self, id: &TxId) -> Result<Option<ChunkManifest>, Self::Error> {
        Ok(self.manifests.lock().get(id).cloned())
    }

    async fn save_manifest(&self, id: &TxId, manifest: &ChunkManifest) -> Result<(), Self::Error> {
        self.manifests.lock().insert(*id, manifest.clone());
        Ok(())
    }

    async fn remove(&self, id: &TxId) -> Result<(), Self::Error> {
        self.states.lock().remove(id);
        self.manifests.lock().remove(id);
        Ok(())
    }
}

/// Errors from [`FileStateStore`].
#[derive(Error, Debug)]
pub enum FileStoreError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be encoded or decoded
    #[error("invalid record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keeps upload records as JSON files in a directory.
///
/// Each upload has `<id>.state.json` and `<id>.manifest.json`. Writes go to a
/// temporary file that is then renamed over the record.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Use `dir`, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Directory holding the records
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: &TxId, kind: &str) -> PathBuf {
        self.dir.join(format!("{id}.{kind}.json"))
    }

    async fn read<T: serde::de::DeserializeOwned>(
        &self,
        path: PathBuf,
    ) -> Result<Option<T>, FileStoreError> {
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: PathBuf, bytes: Vec<u8>) -> Result<(), FileStoreError> {
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove_file(path: PathBuf) -> Result<(), FileStoreError> {
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl StateStore for FileStateStore {
    type Error = FileStoreError;

    async fn load_state(&self, id: &TxId) -> Result<Option<UploadState>, Self::Error> {
        self.read(self.path(id, "state")).await
    }

    async fn save_state(&self, state: &UploadState) -> Result<(), Self::Error> {
        let bytes = serde_json::to_vec(state)?;
        self.write(self.path(&state.transaction_id, "state"), bytes)
            .await
    }

    async fn load_manifest(&self, id: &TxId) -> Result<Option<ChunkManifest>, Self::Error> {
        self.read(self.path(id, "manifest")).await
    }

    async fn save_manifest(&self, id: &TxId, manifest: &ChunkManifest) -> Result<(), Self::Error> {
        let bytes = serde_json::to_vec(manifest)?;
        self.write(self.path(id, "manifest"), bytes).await
    }

    async fn remove(&self, id: &TxId) -> Result<(), Self::Error> {
        Self::remove_file(self.path(id, "state")).await?;
        Self::remove_file(self.path(id, "manifest")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_primitives::{ChunkPolicy, MerkleTree, split};

    fn sample() -> (UploadState, ChunkManifest) {
        let policy = ChunkPolicy::new(64, 16).unwrap();
        let manifest = MerkleTree::build(&split(vec![9u8; 300], &policy))
            .unwrap()
            .manifest();
        let mut state = UploadState::new(TxId::new([3u8; 32]), &manifest);
        state.mark_accepted(0, &manifest);
        state.record_failure(1);
        (state, manifest)
    }

    async fn exercise<S: StateStore>(store: &S) {
        let (state, manifest) = sample();
        let id = state.transaction_id;

        assert!(store.load_state(&id).await.unwrap().is_none());
        store.save_manifest(&id, &manifest).await.unwrap();
        store.save_state(&state).await.unwrap();
        assert_eq!(store.load_state(&id).await.unwrap(), Some(state.clone()));
        assert_eq!(store.load_manifest(&id).await.unwrap(), Some(manifest));

        let mut next = state;
        next.mark_accepted(1, &store.load_manifest(&id).await.unwrap().unwrap());
        store.save_state(&next).await.unwrap();
        assert_eq!(store.load_state(&id).await.unwrap(), Some(next));

        store.remove(&id).await.unwrap();
        assert!(store.load_state(&id).await.unwrap().is_none());
        assert!(store.load_manifest(&id).await.unwrap().is_none());
        store.remove(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store() {
        exercise(&MemoryStateStore::new()).await;
    }

    #[tokio::test]
    async fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path().join("uploads")).await.unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).await.unwrap();
        let id = TxId::new([4u8; 32]);
        tokio::fs::write(store.path(&id, "state"), b"{not json")
            .await
            .unwrap();
        assert!(matches!(
            store.load_state(&id).await,
            Err(FileStoreError::Json(_))
        ));
    }
}
