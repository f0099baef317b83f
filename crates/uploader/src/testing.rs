//! A scripted in-process node for tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use rand::RngCore;

use crate::network::{Network, NetworkError, Response};
use crate::uploader::{CHUNK_PATH, ChunkUpload};

/// One scripted answer.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Respond(Response),
    Fail(NetworkError),
}

impl Reply {
    pub(crate) fn status(status: u16) -> Self {
        Self::Respond(Response::new(status, Bytes::new()))
    }

    pub(crate) fn body(status: u16, body: impl Into<Bytes>) -> Self {
        Self::Respond(Response::new(status, body))
    }

    pub(crate) fn json(status: u16, value: serde_json::Value) -> Self {
        Self::body(status, value.to_string())
    }

    fn into_result(self) -> Result<Response, NetworkError> {
        match self {
            Self::Respond(response) => Ok(response),
            Self::Fail(err) => Err(err),
        }
    }
}

/// Node stub. Chunk POSTs are answered from a per-offset script and default to
/// 200; other requests are answered from a per-route script and default to
/// 404. A route's last scripted reply repeats.
#[derive(Debug, Default)]
pub(crate) struct StubNetwork {
    chunk_replies: Mutex<HashMap<u64, VecDeque<Reply>>>,
    chunk_delays: Mutex<HashMap<u64, Duration>>,
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    chunks: Mutex<Vec<ChunkUpload>>,
    posts: Mutex<Vec<(String, Bytes)>>,
}

impl StubNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue replies for the chunk whose last byte is at `offset`.
    pub(crate) fn script_chunk(&self, offset: u64, replies: impl IntoIterator<Item = Reply>) {
        self.chunk_replies
            .lock()
            .entry(offset)
            .or_default()
            .extend(replies);
    }

    /// Hold the reply for the chunk at `offset` for `delay`.
    pub(crate) fn delay_chunk(&self, offset: u64, delay: Duration) {
        self.chunk_delays.lock().insert(offset, delay);
    }

    /// Queue replies for `"GET path"` or `"POST path"`.
    pub(crate) fn route(&self, route: &str, replies: impl IntoIterator<Item = Reply>) {
        self.routes
            .lock()
            .entry(route.to_owned())
            .or_default()
            .extend(replies);
    }

    /// Offsets of every chunk POST, in arrival order.
    pub(crate) fn chunk_offsets(&self) -> Vec<u64> {
        self.chunks.lock().iter().map(|c| c.offset).collect()
    }

    /// Every chunk POST body, in arrival order.
    pub(crate) fn chunks(&self) -> Vec<ChunkUpload> {
        self.chunks.lock().clone()
    }

    /// Every non-chunk POST as `(path, body)`.
    pub(crate) fn posts(&self) -> Vec<(String, Bytes)> {
        self.posts.lock().clone()
    }

    fn answer_route(&self, route: String) -> Result<Response, NetworkError> {
        let mut routes = self.routes.lock();
        let reply = match routes.get_mut(&route) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        reply.unwrap_or_else(|| Reply::status(404)).into_result()
    }

    fn answer_chunk(&self, body: &Bytes) -> (Duration, Result<Response, NetworkError>) {
        let upload: ChunkUpload = match serde_json::from_slice(body) {
            Ok(upload) => upload,
            Err(_) => return (Duration::ZERO, Ok(Response::new(400, "invalid_json"))),
        };
        let offset = upload.offset;
        self.chunks.lock().push(upload);

        let delay = self
            .chunk_delays
            .lock()
            .get(&offset)
            .copied()
            .unwrap_or_default();
        let reply = self
            .chunk_replies
            .lock()
            .get_mut(&offset)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Reply::status(200));
        (delay, reply.into_result())
    }
}

impl Network for StubNetwork {
    async fn get(&self, path: &str) -> Result<Response, NetworkError> {
        self.answer_route(format!("GET {path}"))
    }

    async fn post(&self, path: &str, body: Bytes) -> Result<Response, NetworkError> {
        if path == CHUNK_PATH {
            let (delay, result) = self.answer_chunk(&body);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            return result;
        }
        self.posts.lock().push((path.to_owned(), body));
        self.answer_route(format!("POST {path}"))
    }
}

pub(crate) fn random_data(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::rng().fill_bytes(&mut data);
    data
}

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
