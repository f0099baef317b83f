//! Transport to a network node.
//!
//! [`Network`] is the seam between the upload logic and HTTP. The uploader and
//! node client only need "GET a path" and "POST a JSON body to a path", and
//! tests swap in a scripted implementation.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A node response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Raw body
    pub body: Bytes,
}

impl Response {
    /// Create a response
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    #[inline]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The body as (lossy) UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Transport-level failures. A response with any status is not an error here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The request timed out
    #[error("request timed out")]
    Timeout,

    /// The connection failed or the response could not be read
    #[error("transport error: {0}")]
    Transport(String),

    /// The request path does not form a valid URL
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// A node reachable by path.
pub trait Network {
    /// GET `path`, relative to the node's base URL.
    fn get(&self, path: &str) -> impl Future<Output = Result<Response, NetworkError>> + Send;

    /// POST a JSON `body` to `path`.
    fn post(
        &self,
        path: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<Response, NetworkError>> + Send;
}

impl<N: Network + Sync> Network for &N {
    fn get(&self, path: &str) -> impl Future<Output = Result<Response, NetworkError>> + Send {
        (**self).get(path)
    }

    fn post(
        &self,
        path: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<Response, NetworkError>> + Send {
        (**self).post(path, body)
    }
}

impl<N: Network + Send + Sync> Network for Arc<N> {
    fn get(&self, path: &str) -> impl Future<Output = Result<Response, NetworkError>> + Send {
        (**self).get(path)
    }

    fn post(
        &self,
        path: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<Response, NetworkError>> + Send {
        (**self).post(path, body)
    }
}

#[cfg(feature = "http")]
pub use http::HttpNetwork;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use bytes::Bytes;
    use reqwest::header::CONTENT_TYPE;
    use url::Url;

    use super::{Network, NetworkError, Response};

    /// [`Network`] over HTTP(S) using reqwest.
    #[derive(Debug, Clone)]
    pub struct HttpNetwork {
        client: reqwest::Client,
        base: Url,
    }

    impl HttpNetwork {
        /// Connect to the node at `base` with a per-request timeout.
        pub fn new(base: Url, timeout: Duration) -> Result<Self, NetworkError> {
            let client = reqwest::Client::builder()
                .user_agent(concat!("weft/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .map_err(|e| NetworkError::Transport(e.to_string()))?;
            Ok(Self { client, base })
        }

        /// The node's base URL
        pub const fn base(&self) -> &Url {
            &self.base
        }

        fn url(&self, path: &str) -> Result<Url, NetworkError> {
            self.base
                .join(path.trim_start_matches('/'))
                .map_err(|e| NetworkError::InvalidUrl(format!("{path}: {e}")))
        }

        async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, NetworkError> {
            let response = request.send().await.map_err(transport)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(transport)?;
            Ok(Response { status, body })
        }
    }

    impl Network for HttpNetwork {
        async fn get(&self, path: &str) -> Result<Response, NetworkError> {
            let url = self.url(path)?;
            tracing::trace!(%url, "GET");
            self.send(self.client.get(url)).await
        }

        async fn post(&self, path: &str, body: Bytes) -> Result<Response, NetworkError> {
            let url = self.url(path)?;
            tracing::trace!(%url, len = body.len(), "POST");
            self.send(
                self.client
                    .post(url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(body),
            )
            .await
        }
    }

    fn transport(err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout
        } else {
            NetworkError::Transport(err.to_string())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_paths_join_base() {
            let base = Url::parse("http://127.0.0.1:1984/").unwrap();
            let network = HttpNetwork::new(base, Duration::from_secs(5)).unwrap();
            assert_eq!(
                network.url("/tx/abc/status").unwrap().as_str(),
                "http://127.0.0.1:1984/tx/abc/status"
            );
            assert_eq!(network.url("chunk").unwrap().as_str(), "http://127.0.0.1:1984/chunk");
        }
    }
}
