//! Per-client token-bucket rate limiting
//!
//! Each policy owns one registry. Buckets are created full on first sight,
//! refilled lazily on every check and dropped by a periodic sweep once idle.
//!
//! The DashMap shard lock is held for the whole check, and the sweep takes
//! the same lock, so a bucket cannot be evicted in the middle of a check.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::core::constants::{
    DEFAULT_RATE_LIMIT_API_BURST, DEFAULT_RATE_LIMIT_API_RATE, DEFAULT_RATE_LIMIT_BATCH_BURST,
    DEFAULT_RATE_LIMIT_BATCH_RATE, DEFAULT_RATE_LIMIT_GLOBAL_BURST,
    DEFAULT_RATE_LIMIT_GLOBAL_RATE, DEFAULT_RATE_LIMIT_LOGIN_BURST,
    DEFAULT_RATE_LIMIT_LOGIN_RATE,
};

/// Named token-bucket policy
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitPolicy {
    /// Policy name used in logs
    pub name: &'static str,
    /// Machine-readable rejection code
    pub code: &'static str,
    /// Human-readable rejection message
    pub message: &'static str,
    /// Bucket capacity (maximum burst)
    pub burst: u32,
    /// Refill rate in tokens per second
    pub rate: f64,
}

impl RateLimitPolicy {
    /// Applies to every request
    pub fn global(rate: f64, burst: u32) -> Self {
        Self {
            name: "global",
            code: "RATE_LIMIT_EXCEEDED",
            message: "Too many requests, please try again later",
            burst,
            rate,
        }
    }

    /// Credential endpoints
    pub fn login(rate: f64, burst: u32) -> Self {
        Self {
            name: "login",
            code: "LOGIN_RATE_LIMIT_EXCEEDED",
            message: "Too many login attempts, please try again later",
            burst,
            rate,
        }
    }

    /// Authenticated API surface
    pub fn api(rate: f64, burst: u32) -> Self {
        Self {
            name: "api",
            code: "API_RATE_LIMIT_EXCEEDED",
            message: "API rate limit exceeded, please try again later",
            burst,
            rate,
        }
    }

    /// Batch, import and export operations
    pub fn batch(rate: f64, burst: u32) -> Self {
        Self {
            name: "batch",
            code: "BATCH_RATE_LIMIT_EXCEEDED",
            message: "Too many batch operations, please try again later",
            burst,
            rate,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::global(DEFAULT_RATE_LIMIT_GLOBAL_RATE, DEFAULT_RATE_LIMIT_GLOBAL_BURST)
    }
}

/// Default policy set: global 200/100s, login 10/5s, api 100/50s, batch 5/2s
pub fn default_policies() -> [RateLimitPolicy; 4] {
    [
        RateLimitPolicy::default(),
        RateLimitPolicy::login(DEFAULT_RATE_LIMIT_LOGIN_RATE, DEFAULT_RATE_LIMIT_LOGIN_BURST),
        RateLimitPolicy::api(DEFAULT_RATE_LIMIT_API_RATE, DEFAULT_RATE_LIMIT_API_BURST),
        RateLimitPolicy::batch(DEFAULT_RATE_LIMIT_BATCH_RATE, DEFAULT_RATE_LIMIT_BATCH_BURST),
    ]
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

/// Token buckets for one policy, keyed by client
pub struct RateLimiterRegistry {
    policy: RateLimitPolicy,
    idle_timeout: Duration,
    buckets: DashMap<String, Bucket>,
}

impl RateLimiterRegistry {
    pub fn new(policy: RateLimitPolicy, idle_timeout: Duration) -> Self {
        Self {
            policy,
            idle_timeout,
            buckets: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Take one token for `client_key`. Never blocks.
    pub fn allow(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let capacity = f64::from(self.policy.burst);

        let mut bucket = match self.buckets.get_mut(client_key) {
            Some(bucket) => bucket,
            None => self
                .buckets
                .entry(client_key.to_string())
                .or_insert_with(|| Bucket {
                    tokens: capacity,
                    last_refill: now,
                    last_seen: now,
                }),
        };

        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.policy.rate).min(capacity);
        bucket.last_refill = now;
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Remove buckets idle longer than the idle timeout. Returns the count.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) <= self.idle_timeout);
        before.saturating_sub(self.buckets.len())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn contains(&self, client_key: &str) -> bool {
        self.buckets.contains_key(client_key)
    }

    /// Run `sweep` every `interval` until shutdown.
    pub fn start_sweep_task(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!(policy = registry.policy.name, "Rate limit sweeper shutting down");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let evicted = registry.sweep();
                        if evicted > 0 {
                            tracing::debug!(
                                policy = registry.policy.name,
                                evicted,
                                remaining = registry.len(),
                                "Evicted idle rate limit buckets"
                            );
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(300);

    fn login_registry() -> RateLimiterRegistry {
        RateLimiterRegistry::new(RateLimitPolicy::login(5.0, 10), IDLE)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_refill() {
        let registry = login_registry();

        for _ in 0..10 {
            assert!(registry.allow("ip:10.0.0.1"));
        }
        assert!(!registry.allow("ip:10.0.0.1"));

        tokio::time::advance(Duration::from_secs(1)).await;
        for _ in 0..5 {
            assert!(registry.allow("ip:10.0.0.1"));
        }
        assert!(!registry.allow("ip:10.0.0.1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_capped_at_capacity() {
        let registry = login_registry();

        assert!(registry.allow("ip:10.0.0.2"));
        tokio::time::advance(Duration::from_secs(60)).await;

        let admitted = (0..20).filter(|_| registry.allow("ip:10.0.0.2")).count();
        assert_eq!(admitted, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let registry = RateLimiterRegistry::new(RateLimitPolicy::batch(2.0, 5), IDLE);

        for _ in 0..5 {
            assert!(registry.allow("user:1"));
        }
        assert!(!registry.allow("user:1"));
        assert!(registry.allow("user:2"));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_request_consumes_nothing() {
        let registry = RateLimiterRegistry::new(RateLimitPolicy::batch(2.0, 1), IDLE);

        assert!(registry.allow("ip:a"));
        assert!(!registry.allow("ip:a"));
        assert!(!registry.allow("ip:a"));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(registry.allow("ip:a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_idle_bucket() {
        let registry = login_registry();

        for _ in 0..10 {
            registry.allow("ip:10.0.0.3");
        }
        assert!(!registry.allow("ip:10.0.0.3"));

        tokio::time::advance(Duration::from_secs(240)).await;
        registry.allow("ip:10.0.0.4");
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(registry.sweep(), 1);
        assert!(!registry.contains("ip:10.0.0.3"));
        assert!(registry.contains("ip:10.0.0.4"));

        let admitted = (0..11).filter(|_| registry.allow("ip:10.0.0.3")).count();
        assert_eq!(admitted, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_task_runs_on_interval() {
        let registry = Arc::new(login_registry());
        let (tx, rx) = watch::channel(false);
        let handle = registry.start_sweep_task(Duration::from_secs(60), rx);

        registry.allow("ip:10.0.0.5");
        tokio::time::sleep(Duration::from_secs(301)).await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(registry.is_empty());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn test_default_policies() {
        let [global, login, api, batch] = default_policies();
        assert_eq!((global.burst, global.rate), (200, 100.0));
        assert_eq!((login.burst, login.rate), (10, 5.0));
        assert_eq!((api.burst, api.rate), (100, 50.0));
        assert_eq!((batch.burst, batch.rate), (5, 2.0));
        assert_eq!(batch.code, "BATCH_RATE_LIMIT_EXCEEDED");
    }
}
