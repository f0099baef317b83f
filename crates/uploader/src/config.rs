//! Upload and client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;
use weft_primitives::{ChunkPolicy, MAX_CHUNK_SIZE};

/// Payloads at or below this size are sent inline with the transaction.
pub const DEFAULT_INLINE_THRESHOLD: u64 = MAX_CHUNK_SIZE as u64;

/// Default number of chunks in flight for parallel uploads.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Retry and backoff for transient chunk failures.
///
/// The delay before retry `n` (1-based) is `base_delay * 2^(n-1)`, capped at
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Transient failures tolerated per chunk before giving up
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound on any delay, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Create a retry policy
    pub const fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay_ms: base_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
        }
    }

    /// Retry immediately, up to `max_retries` times
    pub const fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let delay = self.base_delay_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Whether another attempt is allowed after `failures` transient failures
    #[inline]
    pub const fn allows(&self, failures: u32) -> bool {
        failures <= self.max_retries
    }
}

/// Polling for transaction confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationPolicy {
    /// Interval between status requests, in milliseconds
    pub poll_interval_ms: u64,
    /// Give up after this long, in milliseconds
    pub timeout_ms: u64,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            timeout_ms: 30 * 60 * 1000,
        }
    }
}

impl ConfirmationPolicy {
    /// Interval between polls
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Overall deadline
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for a node client and its uploads.
///
/// ```
/// use weft_uploader::UploaderConfig;
///
/// let config: UploaderConfig =
///     serde_json::from_str(r#"{ "node": "http://127.0.0.1:1984/", "concurrency": 4 }"#).unwrap();
/// assert_eq!(config.concurrency, 4);
/// assert_eq!(config.retry.max_retries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Base URL of the node
    pub node: Url,
    /// Per-request timeout, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Largest payload sent inline with its transaction
    #[serde(default = "default_inline_threshold")]
    pub inline_threshold: u64,
    /// Chunks in flight for parallel uploads
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Chunk sizing
    #[serde(default)]
    pub chunk_policy: ChunkPolicy,
    /// Retry and backoff for chunk uploads
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Confirmation polling
    #[serde(default)]
    pub confirmation: ConfirmationPolicy,
}

const fn default_request_timeout_ms() -> u64 {
    30_000
}

const fn default_inline_threshold() -> u64 {
    DEFAULT_INLINE_THRESHOLD
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl UploaderConfig {
    /// Defaults for the node at `node`
    pub fn new(node: Url) -> Self {
        Self {
            node,
            request_timeout_ms: default_request_timeout_ms(),
            inline_threshold: default_inline_threshold(),
            concurrency: default_concurrency(),
            chunk_policy: ChunkPolicy::default(),
            retry: RetryPolicy::default(),
            confirmation: ConfirmationPolicy::default(),
        }
    }

    /// Per-request timeout
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(200), Duration::from_millis(1000));
    }

    #[test]
    fn test_allows_up_to_max_retries() {
        let policy = RetryPolicy::immediate(2);
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_config_defaults() {
        let config = UploaderConfig::new(Url::parse("http://localhost:1984").unwrap());
        assert_eq!(config.inline_threshold, MAX_CHUNK_SIZE as u64);
        assert_eq!(config.chunk_policy, ChunkPolicy::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));

        let json = serde_json::to_string(&config).unwrap();
        let back: UploaderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_invalid_chunk_policy_is_rejected() {
        let config = UploaderConfig::new(Url::parse("http://localhost:1984").unwrap());
        let mut json = serde_json::to_value(&config).unwrap();
        json["chunk_policy"] = serde_json::json!({"max_size": 0, "min_size": 0});

        let err = serde_json::from_value::<UploaderConfig>(json).unwrap_err();
        assert!(err.to_string().contains("invalid chunk policy"));
    }
}
