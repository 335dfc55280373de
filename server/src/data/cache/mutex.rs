//! Per-key mutual exclusion for collapsing concurrent cache misses
//!
//! Lock identity lives in the `Arc<Mutex<()>>`, not in map presence. A task
//! that locked a handle stays correct even if the map entry is removed while
//! it holds the lock; the next acquirer simply gets a fresh lock once nobody
//! references the old one.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tokio::task::JoinHandle;

/// Registry of lazily created per-key locks
#[derive(Default)]
pub struct MutexRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MutexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `key`, waiting for any current holder.
    ///
    /// Create-if-absent runs under the map shard lock, so every concurrent
    /// caller for a key receives the same lock object. Dropping the returned
    /// guard releases the lock and removes the entry when no other task
    /// references it. Dropping this future while it waits (request
    /// cancellation) leaves the holder unaffected.
    pub async fn acquire(&self, key: &str) -> KeyGuard<'_> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = Arc::clone(&lock).lock_owned().await;

        KeyGuard {
            registry: self,
            key: key.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Drop entries nobody references (left behind by cancelled waiters).
    pub fn sweep(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
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
                            tracing::debug!("Cache lock sweeper shutting down");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let removed = registry.sweep();
                        if removed > 0 {
                            tracing::debug!(removed, "Swept orphaned cache locks");
                        }
                    }
                }
            }
        })
    }

    fn release(&self, key: &str, lock: &Arc<Mutex<()>>) {
        // Map + this guard = 2. Anything above means another task is
        // waiting on (or about to lock) the same handle.
        self.locks
            .remove_if(key, |_, current| {
                Arc::ptr_eq(current, lock) && Arc::strong_count(current) <= 2
            });
    }
}

/// Held lock for one key. Releases on drop, including unwinds.
pub struct KeyGuard<'a> {
    registry: &'a MutexRegistry,
    key: String,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the owned guard's Arc no longer counts
        drop(self.guard.take());
        self.registry.release(&self.key, &self.lock);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let registry = MutexRegistry::new();

        {
            let guard = registry.acquire("project:1").await;
            assert_eq!(guard.key(), "project:1");
            assert_eq!(registry.len(), 1);
        }

        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_same_lock_for_concurrent_callers() {
        let registry = Arc::new(MutexRegistry::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire("languages").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let registry = MutexRegistry::new();

        let _a = registry.acquire("project:1").await;
        let b = tokio::time::timeout(Duration::from_millis(100), registry.acquire("project:2"))
            .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_release_on_panic() {
        let registry = Arc::new(MutexRegistry::new());

        let r = Arc::clone(&registry);
        let result = tokio::spawn(async move {
            let _guard = r.acquire("dashboard:stats").await;
            panic!("load blew up");
        })
        .await;
        assert!(result.is_err());

        assert!(registry.is_empty());
        let reacquired =
            tokio::time::timeout(Duration::from_millis(100), registry.acquire("dashboard:stats"))
                .await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_is_swept() {
        let registry = MutexRegistry::new();

        let holder = registry.acquire("languages").await;
        let waiter =
            tokio::time::timeout(Duration::from_millis(20), registry.acquire("languages")).await;
        assert!(waiter.is_err());

        // Holder saw no waiter clone after the timeout dropped it
        drop(holder);
        assert_eq!(registry.sweep(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_removes_unreferenced_entries() {
        let registry = MutexRegistry::new();
        registry
            .locks
            .insert("orphan".to_string(), Arc::new(Mutex::new(())));
        let _held = registry.acquire("held").await;

        assert_eq!(registry.sweep(), 1);
        assert_eq!(registry.len(), 1);
    }
}
