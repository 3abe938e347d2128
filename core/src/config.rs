//! Client-side settings: where the API lives, how long answers stay fresh,
//! how long unused answers are kept, and how often a failed read is retried.

use std::time::Duration;

/// Default location of the tasks API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/tasks";

/// Per-request client-side timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long each kind of cached view is served without refetching, and how
/// long it may then sit stale before it is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub list: Duration,
    pub item: Duration,
    pub ping: Duration,
    pub list_gc: Duration,
    pub item_gc: Duration,
    pub ping_gc: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(5 * 60),
            item: Duration::from_secs(5 * 60),
            ping: Duration::from_secs(30),
            list_gc: Duration::from_secs(10 * 60),
            item_gc: Duration::from_secs(5 * 60),
            ping_gc: Duration::from_secs(60),
        }
    }
}

/// Retries for failed reads. Writes are never retried.
///
/// The n-th retry waits `base_delay * 2^n`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub list: u32,
    pub item: u32,
    pub ping: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            list: 3,
            item: 3,
            ping: 1,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            list: 0,
            item: 0,
            ping: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (zero-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Everything a [`TaskStore`](crate::TaskStore) needs besides a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub freshness: FreshnessPolicy,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            freshness: FreshnessPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_windows() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.freshness.list, Duration::from_secs(300));
        assert_eq!(config.freshness.item, Duration::from_secs(300));
        assert_eq!(config.freshness.ping, Duration::from_secs(30));
        assert_eq!(config.freshness.list_gc, Duration::from_secs(600));
        assert_eq!(config.freshness.ping_gc, Duration::from_secs(60));
        assert_eq!((config.retry.list, config.retry.item, config.retry.ping), (3, 3, 1));
    }

    #[test]
    fn retry_delay_doubles_up_to_the_cap() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.delay(0), Duration::from_secs(1));
        assert_eq!(retry.delay(1), Duration::from_secs(2));
        assert_eq!(retry.delay(2), Duration::from_secs(4));
        assert_eq!(retry.delay(10), Duration::from_secs(30));
        assert_eq!(retry.delay(40), Duration::from_secs(30));
    }
}
