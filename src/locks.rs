//! In-process keyed mutexes serializing read-decide-write sequences.
//!
//! Keys are namespaced strings (`code:CNF`, `venue:12`, `file:2025-03`,
//! `order:7`). Guards are acquired in sorted key order so that two callers
//! asking for overlapping key sets cannot deadlock. An entry is dropped from
//! the map once its last guard is released and nobody is waiting on it.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default, Clone)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Holds every lock it was created with until dropped
#[derive(Debug)]
pub struct KeyedGuard {
    guards: Vec<OwnedMutexGuard<()>>,
    keys: Vec<String>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        self.guards.clear();
        for key in &self.keys {
            // Waiters and holders each keep a clone of the handle
            self.locks
                .remove_if(key, |_, handle| Arc::strong_count(handle) == 1);
        }
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code_key(prefix: &str) -> String {
        format!("code:{}", prefix)
    }

    pub fn venue_key(venue_id: i32) -> String {
        format!("venue:{}", venue_id)
    }

    pub fn file_key(period: &str) -> String {
        format!("file:{}", period)
    }

    pub fn order_key(order_id: i32) -> String {
        format!("order:{}", order_id)
    }

    fn handle(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn lock(&self, key: String) -> KeyedGuard {
        self.lock_all(vec![key]).await
    }

    pub async fn lock_all(&self, mut keys: Vec<String>) -> KeyedGuard {
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            let handle = self.handle(key);
            guards.push(handle.lock_owned().await);
        }
        KeyedGuard {
            guards,
            keys,
            locks: self.locks.clone(),
        }
    }

    /// Number of keys currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_mutually_exclusive() {
        let locks = KeyedLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(KeyedLocks::venue_key(1)).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(KeyedLocks::venue_key(1)).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock(KeyedLocks::venue_key(2)),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn overlapping_key_sets_in_any_order_complete() {
        let locks = KeyedLocks::new();
        let l1 = locks.clone();
        let l2 = locks.clone();

        let t1 = tokio::spawn(async move {
            for _ in 0..50 {
                let _g = l1
                    .lock_all(vec![KeyedLocks::venue_key(1), KeyedLocks::venue_key(2)])
                    .await;
            }
        });
        let t2 = tokio::spawn(async move {
            for _ in 0..50 {
                let _g = l2
                    .lock_all(vec![KeyedLocks::venue_key(2), KeyedLocks::venue_key(1)])
                    .await;
            }
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            t1.await.unwrap();
            t2.await.unwrap();
        })
        .await
        .expect("lock ordering deadlocked");
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn released_keys_are_evicted() {
        let locks = KeyedLocks::new();
        let guard = locks
            .lock_all(vec![KeyedLocks::file_key("2025-03"), KeyedLocks::venue_key(4)])
            .await;
        assert_eq!(locks.len(), 2);
        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn key_with_a_waiter_survives_release() {
        let locks = KeyedLocks::new();
        let first = locks.lock(KeyedLocks::order_key(9)).await;

        let waiter_locks = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = waiter_locks.lock(KeyedLocks::order_key(9)).await;
        });
        // Let the waiter clone the handle and park on it
        while Arc::strong_count(&locks.handle(&KeyedLocks::order_key(9))) < 4 {
            tokio::task::yield_now().await;
        }

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter acquired the lock")
            .unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn duplicate_keys_are_locked_once() {
        let locks = KeyedLocks::new();
        let guard = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock_all(vec![KeyedLocks::code_key("CNF"), KeyedLocks::code_key("CNF")]),
        )
        .await;
        assert!(guard.is_ok());
    }
}
