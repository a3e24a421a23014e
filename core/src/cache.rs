//! Query cache keyed by hierarchical resource keys.
//!
//! # Design
//! Reads store the JSON form of their result under a `QueryKey`. An entry is
//! served while it is fresh; once it is invalidated or older than the stale
//! time the next read refetches. Invalidating a key invalidates every cached
//! key it prefixes, so `inventory` covers `inventory/summary` and each
//! `inventory/transactions/<limit>`.
//!
//! Each key carries a generation bumped by invalidation. A fetch records the
//! generation it started under and only stores its result if nothing
//! invalidated the key meanwhile, so a value computed before a write finished
//! is never cached as fresh.
//!
//! Invalidated keys are broadcast to subscribers, letting views refetch.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::error::ApiError;
use crate::types::{DrugId, PatientId};

const INVALIDATION_CHANNEL_CAPACITY: usize = 64;

/// Stable identifier of a cached read, as a list of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// `true` when `self` equals `other` or is a prefix of it.
    pub fn matches(&self, other: &QueryKey) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn patients() -> Self {
        Self::new(["patients"])
    }

    pub fn drugs() -> Self {
        Self::new(["drugs"])
    }

    /// Prefix of every delivery read, patient-scoped ones included.
    pub fn deliveries() -> Self {
        Self::new(["deliveries"])
    }

    pub fn patient_deliveries(patient_id: PatientId) -> Self {
        Self::new(["deliveries".to_string(), "patient".to_string(), patient_id.to_string()])
    }

    pub fn stats() -> Self {
        Self::new(["stats"])
    }

    /// Prefix of every inventory read.
    pub fn inventory() -> Self {
        Self::new(["inventory"])
    }

    pub fn inventory_drugs() -> Self {
        Self::new(["inventory", "drugs"])
    }

    pub fn inventory_summary() -> Self {
        Self::new(["inventory", "summary"])
    }

    pub fn inventory_transactions(limit: Option<u32>) -> Self {
        Self::new([
            "inventory".to_string(),
            "transactions".to_string(),
            limit_segment(limit),
        ])
    }

    pub fn drug_batches_root() -> Self {
        Self::new(["drug-batches"])
    }

    pub fn drug_batches(drug_id: Option<DrugId>, limit: Option<u32>) -> Self {
        Self::new(["drug-batches".to_string(), drug_segment(drug_id), limit_segment(limit)])
    }

    pub fn drug_removals_root() -> Self {
        Self::new(["drug-removals"])
    }

    pub fn drug_removals(drug_id: Option<DrugId>, limit: Option<u32>) -> Self {
        Self::new(["drug-removals".to_string(), drug_segment(drug_id), limit_segment(limit)])
    }
}

fn drug_segment(drug_id: Option<DrugId>) -> String {
    drug_id.map_or_else(|| "all".to_string(), |id| id.to_string())
}

fn limit_segment(limit: Option<u32>) -> String {
    limit.map_or_else(|| "all".to_string(), |limit| limit.to_string())
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// A cached value with timestamp and staleness information.
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    fetched_at: Instant,
    is_stale: bool,
}

impl CacheEntry {
    fn new(data: Value) -> Self {
        Self {
            data,
            fetched_at: Instant::now(),
            is_stale: false,
        }
    }

    fn check_staleness(&mut self, stale_time: Duration) -> bool {
        if self.fetched_at.elapsed() >= stale_time {
            self.is_stale = true;
        }
        self.is_stale
    }
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
    generation: u64,
}

/// Process-wide cache of read results.
pub struct QueryCache {
    slots: RwLock<HashMap<QueryKey, Slot>>,
    stale_time: Duration,
    invalidation_tx: broadcast::Sender<QueryKey>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("stale_time", &self.stale_time)
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        let (invalidation_tx, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);
        Self {
            slots: RwLock::new(HashMap::new()),
            stale_time,
            invalidation_tx,
        }
    }

    /// Return the cached value for `key` while fresh, otherwise run `fetcher`
    /// and cache its result. Fetch failures are returned and leave the cache
    /// unchanged.
    pub async fn fetch<V, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<V, ApiError>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>>,
    {
        let generation = {
            let mut slots = self.slots.write().await;
            let slot = slots.entry(key.clone()).or_default();
            if let Some(entry) = slot.entry.as_mut() {
                if !entry.check_staleness(self.stale_time) {
                    debug!(%key, "cache hit");
                    return decode(entry.data.clone());
                }
            }
            slot.generation
        };

        debug!(%key, "fetching");
        let value = fetcher().await?;
        let data = serde_json::to_value(&value).map_err(|e| ApiError::Serialization(e.to_string()))?;

        let mut slots = self.slots.write().await;
        let slot = slots.entry(key.clone()).or_default();
        if slot.generation == generation {
            slot.entry = Some(CacheEntry::new(data));
        } else {
            debug!(%key, "invalidated while fetching, result not cached");
        }
        Ok(value)
    }

    /// Cached value for `key`, stale or not.
    pub async fn peek<V: DeserializeOwned>(&self, key: &QueryKey) -> Option<V> {
        let slots = self.slots.read().await;
        let entry = slots.get(key)?.entry.as_ref()?;
        decode(entry.data.clone()).ok()
    }

    /// `true` when the next read of `key` will hit the network.
    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        let mut slots = self.slots.write().await;
        match slots.get_mut(key).and_then(|slot| slot.entry.as_mut()) {
            Some(entry) => entry.check_staleness(self.stale_time),
            None => true,
        }
    }

    /// Mark every key matching `prefix` stale and notify subscribers.
    /// Returns how many cached keys matched.
    pub async fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut matched = 0;
        {
            let mut slots = self.slots.write().await;
            for (key, slot) in slots.iter_mut().filter(|(key, _)| prefix.matches(key)) {
                slot.generation += 1;
                if let Some(entry) = slot.entry.as_mut() {
                    entry.is_stale = true;
                }
                matched += 1;
                debug!(%key, "invalidated");
            }
        }
        // No receivers is fine.
        let _ = self.invalidation_tx.send(prefix.clone());
        matched
    }

    /// Receive every key passed to `invalidate` from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.invalidation_tx.subscribe()
    }

    /// Drop every entry. In-flight fetches will not store their results.
    pub async fn clear(&self) {
        let mut slots = self.slots.write().await;
        for slot in slots.values_mut() {
            slot.generation += 1;
            slot.entry = None;
        }
    }
}

fn decode<V: DeserializeOwned>(data: Value) -> Result<V, ApiError> {
    serde_json::from_value(data).map_err(|e| ApiError::Deserialization(e.to_string()))
}
