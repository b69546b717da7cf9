//! Read cache for allowances and balances
//!
//! Entries stay fresh for a configured window. Invalidating a key also bumps
//! its epoch so a read that was already in flight cannot write back a value
//! observed before the invalidation. `clear` drops every epoch and bumps a
//! cache-wide generation instead, which fences in-flight reads the same way.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use evm_client::{ChainClient, ReadCall};
use swiftswap_core::{ClientError, U256};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::allowance::{AllowanceGatekeeper, BalanceTracker};

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: U256,
    fetched_at: Instant,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<ReadCall, Entry>,
    epochs: HashMap<ReadCall, u64>,
    generation: u64,
}

impl CacheInner {
    fn stamp(&self, call: &ReadCall) -> (u64, u64) {
        (self.generation, self.epochs.get(call).copied().unwrap_or(0))
    }
}

/// Freshness-windowed cache of `uint256` reads
#[derive(Debug)]
pub struct ReadCache {
    freshness: Duration,
    inner: Mutex<CacheInner>,
}

impl ReadCache {
    pub fn new(freshness: Duration) -> Self {
        Self {
            freshness,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Return the cached value if fresh, otherwise read through `client`
    pub async fn get(&self, client: &dyn ChainClient, call: &ReadCall) -> Result<U256, ClientError> {
        let stamp = {
            let inner = self.inner.lock().await;
            if let Some(entry) = inner.entries.get(call) {
                if entry.fetched_at.elapsed() < self.freshness {
                    return Ok(entry.value);
                }
            }
            inner.stamp(call)
        };

        tracing::debug!("Cache miss for {} on {}", call.name(), call.target());
        let value = client.read(call).await?;

        let mut inner = self.inner.lock().await;
        if inner.stamp(call) == stamp {
            inner.entries.insert(
                call.clone(),
                Entry {
                    value,
                    fetched_at: Instant::now(),
                },
            );
        } else {
            tracing::trace!("Discarding stale {} read on {}", call.name(), call.target());
        }
        Ok(value)
    }

    /// Cached value regardless of age
    pub async fn peek(&self, call: &ReadCall) -> Option<U256> {
        self.inner.lock().await.entries.get(call).map(|e| e.value)
    }

    /// Drop the entry so the next `get` reads from the chain
    pub async fn invalidate(&self, call: &ReadCall) {
        let mut inner = self.inner.lock().await;
        inner.entries.remove(call);
        *inner.epochs.entry(call.clone()).or_insert(0) += 1;
    }

    /// Drop every entry and every per-key epoch
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.epochs.clear();
        inner.generation += 1;
    }
}

/// The caches a confirmed transaction may make stale
#[derive(Clone)]
pub struct StateCaches {
    pub allowances: Arc<AllowanceGatekeeper>,
    pub balances: Arc<BalanceTracker>,
}

impl StateCaches {
    pub fn new(allowance_freshness: Duration, balance_freshness: Duration) -> Self {
        Self {
            allowances: Arc::new(AllowanceGatekeeper::new(allowance_freshness)),
            balances: Arc::new(BalanceTracker::new(balance_freshness)),
        }
    }

    /// Route an invalidation to the cache holding this kind of read
    pub async fn invalidate(&self, call: &ReadCall) {
        match call {
            ReadCall::Allowance { .. } => self.allowances.cache().invalidate(call).await,
            ReadCall::BalanceOf { .. } => self.balances.cache().invalidate(call).await,
            // Quotes are never cached
            ReadCall::GetQuote { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeChainClient;
    use swiftswap_core::Address;

    fn balance_call() -> ReadCall {
        ReadCall::BalanceOf {
            token: Address::repeat_byte(1),
            owner: Address::repeat_byte(9),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_served_from_cache() {
        let client = FakeChainClient::new();
        let call = balance_call();
        client.set_read(call.clone(), U256::from(5));

        let cache = ReadCache::new(Duration::from_secs(10));
        assert_eq!(cache.get(&client, &call).await.unwrap(), U256::from(5));

        client.set_read(call.clone(), U256::from(6));
        assert_eq!(cache.get(&client, &call).await.unwrap(), U256::from(5));
        assert_eq!(client.read_count(&call), 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get(&client, &call).await.unwrap(), U256::from(6));
        assert_eq!(client.read_count(&call), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let client = FakeChainClient::new();
        let call = balance_call();
        client.set_read(call.clone(), U256::from(5));

        let cache = ReadCache::new(Duration::from_secs(10));
        cache.get(&client, &call).await.unwrap();
        client.set_read(call.clone(), U256::from(7));

        cache.invalidate(&call).await;
        assert_eq!(cache.peek(&call).await, None);
        assert_eq!(cache.get(&client, &call).await.unwrap(), U256::from(7));
        assert_eq!(client.read_count(&call), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inflight_read_does_not_repopulate_after_invalidate() {
        let client = Arc::new(FakeChainClient::new());
        let call = balance_call();
        client.set_read(call.clone(), U256::from(5));
        client.gate_reads(true);

        let cache = Arc::new(ReadCache::new(Duration::from_secs(10)));
        let task = {
            let (client, cache, call) = (client.clone(), cache.clone(), call.clone());
            tokio::spawn(async move { cache.get(client.as_ref(), &call).await })
        };

        client.wait_for_reads(&call, 1).await;
        cache.invalidate(&call).await;
        client.gate_reads(false);

        // The caller still gets its answer, but the cache stays empty
        assert_eq!(task.await.unwrap().unwrap(), U256::from(5));
        assert_eq!(cache.peek(&call).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_epochs_and_fences_inflight_reads() {
        let client = Arc::new(FakeChainClient::new());
        let cache = Arc::new(ReadCache::new(Duration::from_secs(10)));
        for byte in 1..=5u8 {
            cache
                .invalidate(&ReadCall::BalanceOf {
                    token: Address::repeat_byte(byte),
                    owner: Address::repeat_byte(9),
                })
                .await;
        }
        assert_eq!(cache.inner.lock().await.epochs.len(), 5);

        // Never invalidated, so its epoch is 0 both before and after clear
        let call = ReadCall::BalanceOf {
            token: Address::repeat_byte(0x42),
            owner: Address::repeat_byte(9),
        };
        client.set_read(call.clone(), U256::from(5));
        client.gate_reads(true);
        let task = {
            let (client, cache, call) = (client.clone(), cache.clone(), call.clone());
            tokio::spawn(async move { cache.get(client.as_ref(), &call).await })
        };
        client.wait_for_reads(&call, 1).await;

        cache.clear().await;
        assert!(cache.inner.lock().await.epochs.is_empty());

        client.gate_reads(false);
        assert_eq!(task.await.unwrap().unwrap(), U256::from(5));
        assert_eq!(cache.peek(&call).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_caches_route_invalidation() {
        let client = FakeChainClient::new();
        let caches = StateCaches::new(Duration::from_secs(10), Duration::from_secs(10));
        let call = balance_call();
        client.set_read(call.clone(), U256::from(3));

        caches.balances.cache().get(&client, &call).await.unwrap();
        assert!(caches.balances.cache().peek(&call).await.is_some());

        caches.invalidate(&call).await;
        assert!(caches.balances.cache().peek(&call).await.is_none());
    }
}
