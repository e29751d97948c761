//! Query cache.
//!
//! Cached values are JSON documents addressed by a [`QueryKey`]. A value is
//! either fresh or stale; stale values are re-fetched on the next read.
//! Reads go through [`QueryCache::fetch`], which runs the fetcher as a task
//! that [`QueryCache::cancel`] can abort. A cancelled fetch never writes its
//! result.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::error::ApiError;

/// Structured cache key, e.g. `["comments", "<discussion id>"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Whether `self` is `prefix` or nested under it.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// One element of a cached list: either confirmed by the server or still
/// waiting on a create mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry<T, P> {
    Saved(T),
    Pending(P),
}

impl<T, P> Entry<T, P> {
    pub fn saved(&self) -> Option<&T> {
        match self {
            Entry::Saved(item) => Some(item),
            Entry::Pending(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Entry::Pending(_))
    }
}

/// Read-modify-write step for [`QueryCache::update`]. Receives the current
/// value and returns the new one (`None` removes the entry).
pub type Updater<'a> = Box<dyn FnOnce(Option<&Value>) -> Option<Value> + Send + 'a>;

/// Fetcher handed to [`QueryCache::fetch`].
pub type Fetcher = BoxFuture<'static, Result<Value, ApiError>>;

#[async_trait]
pub trait QueryCache: Send + Sync {
    async fn get(&self, key: &QueryKey) -> Option<Value>;

    /// Store `value` as fresh data.
    async fn set(&self, key: &QueryKey, value: Value);

    async fn remove(&self, key: &QueryKey);

    /// Atomically replace the value under `key`, returning the previous one.
    async fn update(&self, key: &QueryKey, updater: Updater<'_>) -> Option<Value>;

    /// True when there is no value or it was invalidated.
    async fn is_stale(&self, key: &QueryKey) -> bool;

    /// Mark every query under `prefix` stale.
    async fn invalidate(&self, prefix: &QueryKey);

    /// Abort every in-flight fetch under `prefix`.
    async fn cancel(&self, prefix: &QueryKey);

    /// Run `fetcher` and store its result as fresh data, unless the fetch is
    /// cancelled first. A read of `key` while a fetch is in flight joins it.
    async fn fetch(&self, key: &QueryKey, fetcher: Fetcher) -> Result<Value, ApiError>;
}

/// Return the cached value when fresh, fetch otherwise. A cancelled fetch
/// falls back to whatever the cache holds by then.
pub async fn read_through<T: DeserializeOwned>(
    cache: &dyn QueryCache,
    key: &QueryKey,
    fetcher: Fetcher,
) -> Result<T, ApiError> {
    if !cache.is_stale(key).await {
        if let Some(value) = cache.get(key).await {
            return decode(value);
        }
    }

    match cache.fetch(key, fetcher).await {
        Ok(value) => decode(value),
        Err(ApiError::Cancelled) => match cache.get(key).await {
            Some(value) => decode(value),
            None => Err(ApiError::Cancelled),
        },
        Err(e) => Err(e),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

type SharedFetch = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

/// A fetch that later reads of the same key join instead of restarting.
struct InFlight {
    generation: u64,
    handle: AbortHandle,
    result: SharedFetch,
}

#[derive(Default)]
struct Slot {
    value: Option<Value>,
    stale: bool,
    /// Bumped by every fetch start and every cancel; a fetch only writes if
    /// the generation it started with is still current.
    generation: u64,
    in_flight: Option<InFlight>,
}

impl Slot {
    fn is_empty(&self) -> bool {
        self.value.is_none() && self.in_flight.is_none()
    }
}

/// [`QueryCache`] backed by a map behind an async mutex.
#[derive(Default)]
pub struct MemoryQueryCache {
    slots: Mutex<HashMap<QueryKey, Slot>>,
}

impl MemoryQueryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueryCache for MemoryQueryCache {
    async fn get(&self, key: &QueryKey) -> Option<Value> {
        self.slots.lock().await.get(key)?.value.clone()
    }

    async fn set(&self, key: &QueryKey, value: Value) {
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(key.clone()).or_default();
        slot.value = Some(value);
        slot.stale = false;
    }

    async fn remove(&self, key: &QueryKey) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(key) {
            slot.value = None;
            if slot.is_empty() {
                slots.remove(key);
            }
        }
    }

    async fn update(&self, key: &QueryKey, updater: Updater<'_>) -> Option<Value> {
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(key.clone()).or_default();
        let previous = slot.value.take();
        slot.value = updater(previous.as_ref());
        slot.stale = false;
        if slot.is_empty() {
            slots.remove(key);
        }
        previous
    }

    async fn is_stale(&self, key: &QueryKey) -> bool {
        match self.slots.lock().await.get(key) {
            Some(slot) => slot.stale || slot.value.is_none(),
            None => true,
        }
    }

    async fn invalidate(&self, prefix: &QueryKey) {
        let mut slots = self.slots.lock().await;
        for (key, slot) in slots.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
            debug!(key = %key, "query invalidated");
            slot.stale = true;
        }
    }

    async fn cancel(&self, prefix: &QueryKey) {
        let mut slots = self.slots.lock().await;
        for (key, slot) in slots.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
            slot.generation += 1;
            if let Some(in_flight) = slot.in_flight.take() {
                debug!(key = %key, "in-flight query cancelled");
                in_flight.handle.abort();
            }
        }
    }

    async fn fetch(&self, key: &QueryKey, fetcher: Fetcher) -> Result<Value, ApiError> {
        // The task is spawned and registered under one lock, so a cancel
        // either sees it or runs before it exists.
        let (generation, result) = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(key.clone()).or_default();
            match &slot.in_flight {
                Some(in_flight) => {
                    debug!(key = %key, "joining in-flight query");
                    (in_flight.generation, in_flight.result.clone())
                }
                None => {
                    slot.generation += 1;
                    let task = tokio::spawn(fetcher);
                    let handle = task.abort_handle();
                    let result = task
                        .map(|joined| match joined {
                            Ok(result) => result,
                            Err(e) if e.is_cancelled() => Err(ApiError::Cancelled),
                            Err(e) => Err(ApiError::Transport(format!("Query task failed: {e}"))),
                        })
                        .boxed()
                        .shared();
                    slot.in_flight = Some(InFlight {
                        generation: slot.generation,
                        handle,
                        result: result.clone(),
                    });
                    (slot.generation, result)
                }
            }
        };

        let outcome = result.await;

        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(key).filter(|s| s.generation == generation) else {
            return Err(ApiError::Cancelled);
        };
        // Only the first caller to come back settles the slot; joined
        // callers just return the shared outcome.
        if slot.in_flight.take().is_none() {
            return outcome;
        }

        match outcome {
            Ok(value) => {
                slot.value = Some(value.clone());
                slot.stale = false;
                debug!(key = %key, "query fetched");
                Ok(value)
            }
            Err(e) => {
                if slot.is_empty() {
                    slots.remove(key);
                }
                Err(e)
            }
        }
    }
}
