//! Read-through caching with per-key miss collapsing

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::CacheService;
use super::mutex::MutexRegistry;

/// TTLs for one cached namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    /// Base TTL for found values, jittered on write
    pub positive: Duration,
    /// TTL for the "confirmed absent" marker, never jittered
    pub negative: Duration,
}

enum Lookup<T> {
    Hit(T),
    Absent,
    Miss,
}

/// Cache-aside reader
///
/// A found value is stored as JSON. A load that finds nothing is stored as
/// an empty payload, which later reads report as `Ok(None)` without calling
/// the loader again.
pub struct CacheAsideService {
    cache: Arc<CacheService>,
    locks: Arc<MutexRegistry>,
    jitter: f64,
}

impl CacheAsideService {
    /// `jitter_percent` spreads positive TTLs by up to that percentage either way.
    pub fn new(cache: Arc<CacheService>, locks: Arc<MutexRegistry>, jitter_percent: u8) -> Self {
        Self {
            cache,
            locks,
            jitter: f64::from(jitter_percent.min(100)) / 100.0,
        }
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    /// Return the cached value for `key`, or run `load` once and cache its result.
    ///
    /// For a given key at most one `load` runs at a time in this process;
    /// callers arriving meanwhile wait on the key lock and then read what
    /// the loader stored. Errors from `load` are returned as-is and nothing
    /// is cached. Cache store failures are logged and treated as misses.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &str,
        policy: TtlPolicy,
        load: F,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        match self.lookup(key).await {
            Lookup::Hit(value) => return Ok(Some(value)),
            Lookup::Absent => return Ok(None),
            Lookup::Miss => {}
        }

        let _guard = self.locks.acquire(key).await;

        // Another task may have filled the key while we waited
        match self.lookup(key).await {
            Lookup::Hit(value) => return Ok(Some(value)),
            Lookup::Absent => return Ok(None),
            Lookup::Miss => {}
        }

        tracing::debug!(key, "Cache miss, loading");
        let loaded = load().await?;

        match &loaded {
            Some(value) => match serde_json::to_vec(value) {
                Ok(bytes) => {
                    let ttl = self.jittered(policy.positive);
                    self.store(key, bytes, ttl).await;
                }
                Err(e) => tracing::warn!(key, error = %e, "Failed to encode cache value"),
            },
            None => self.store(key, Vec::new(), policy.negative).await,
        }

        Ok(loaded)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        match self.cache.get_raw(key).await {
            Ok(Some(bytes)) if bytes.is_empty() => {
                tracing::trace!(key, "Negative cache hit");
                Lookup::Absent
            }
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    tracing::trace!(key, "Cache hit");
                    Lookup::Hit(value)
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Undecodable cache entry, reloading");
                    Lookup::Miss
                }
            },
            Ok(None) => Lookup::Miss,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, falling back to source");
                Lookup::Miss
            }
        }
    }

    async fn store(&self, key: &str, bytes: Vec<u8>, ttl: Duration) {
        if let Err(e) = self.cache.set_raw(key, bytes, Some(ttl)).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return base;
        }
        let factor = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        base.mul_f64(1.0 + factor)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;

    use super::*;
    use crate::core::config::{CacheBackendType, CacheConfig};
    use crate::data::cache::testing::FailingBackend;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u64,
        name: String,
    }

    const POLICY: TtlPolicy = TtlPolicy {
        positive: Duration::from_secs(1800),
        negative: Duration::from_secs(60),
    };

    async fn service(jitter_percent: u8) -> CacheAsideService {
        let config = CacheConfig {
            backend: CacheBackendType::Memory,
            max_entries: 1000,
            redis_url: None,
        };
        let cache = Arc::new(CacheService::new(&config).await.unwrap());
        CacheAsideService::new(cache, Arc::new(MutexRegistry::new()), jitter_percent)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_load_once() {
        let aside = Arc::new(service(10).await);
        let loads = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let aside = Arc::clone(&aside);
            let loads = Arc::clone(&loads);
            handles.push(tokio::spawn(async move {
                aside
                    .get_or_load("project:1", POLICY, move || async move {
                        let n = loads.fetch_add(1, Ordering::SeqCst) + 1;
                        tokio::time::sleep(Duration::from_millis(25)).await;
                        Ok::<_, String>(Some(Item {
                            id: 1,
                            name: format!("load-{n}"),
                        }))
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        let expected = Some(Item {
            id: 1,
            name: "load-1".to_string(),
        });
        assert!(results.iter().all(|r| *r == expected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_entry_absorbs_lookups_until_expiry() {
        let aside = service(10).await;
        let loads = AtomicUsize::new(0);
        let counter = &loads;
        let missing = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<Option<Item>, String>(None)
        };

        assert_eq!(aside.get_or_load("project:404", POLICY, missing).await, Ok(None));
        assert_eq!(aside.get_or_load("project:404", POLICY, missing).await, Ok(None));
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(aside.get_or_load("project:404", POLICY, missing).await, Ok(None));
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(aside.get_or_load("project:404", POLICY, missing).await, Ok(None));
        assert_eq!(aside.get_or_load("project:404", POLICY, missing).await, Ok(None));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_error_is_not_cached() {
        let aside = service(10).await;

        let first: Result<Option<Item>, String> = aside
            .get_or_load("languages", POLICY, || async { Err("db down".to_string()) })
            .await;
        assert_eq!(first, Err("db down".to_string()));
        assert!(!aside.cache().exists("languages").await.unwrap());

        let second = aside
            .get_or_load("languages", POLICY, || async {
                Ok::<_, String>(Some(Item {
                    id: 2,
                    name: "en".to_string(),
                }))
            })
            .await
            .unwrap();
        assert_eq!(second.map(|i| i.id), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_positive_ttl_is_jittered_within_bounds() {
        let aside = service(10).await;
        let policy = TtlPolicy {
            positive: Duration::from_secs(100),
            negative: Duration::from_secs(10),
        };

        for id in 0..20u64 {
            let key = format!("project:{id}");
            aside
                .get_or_load(&key, policy, || async move {
                    Ok::<_, String>(Some(Item {
                        id,
                        name: "p".to_string(),
                    }))
                })
                .await
                .unwrap();
            let ttl = aside.cache().ttl(&key).await.unwrap().unwrap();
            assert!(ttl >= Duration::from_secs(90) && ttl <= Duration::from_secs(110));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_ttl_is_exact() {
        let aside = service(10).await;

        let _ = aside
            .get_or_load("user:9", POLICY, || async { Ok::<Option<Item>, String>(None) })
            .await;
        assert_eq!(
            aside.cache().ttl("user:9").await.unwrap(),
            Some(Duration::from_secs(60))
        );
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_reloaded() {
        let aside = service(0).await;
        aside
            .cache()
            .set_raw("project:3", b"not json".to_vec(), None)
            .await
            .unwrap();

        let value = aside
            .get_or_load("project:3", POLICY, || async {
                Ok::<_, String>(Some(Item {
                    id: 3,
                    name: "fresh".to_string(),
                }))
            })
            .await
            .unwrap();
        assert_eq!(value.unwrap().name, "fresh");
    }

    #[tokio::test]
    async fn test_store_outage_falls_back_to_load() {
        let cache = Arc::new(CacheService::with_backend(Arc::new(FailingBackend)));
        let aside = CacheAsideService::new(cache, Arc::new(MutexRegistry::new()), 10);
        let loads = AtomicUsize::new(0);
        let counter = &loads;

        for _ in 0..3 {
            let value = aside
                .get_or_load("project:1", POLICY, move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(Some(Item {
                        id: 1,
                        name: "direct".to_string(),
                    }))
                })
                .await
                .unwrap();
            assert_eq!(value.unwrap().name, "direct");
        }
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }
}
