//! Cache-Aside Fetch Service
//!
//! Wraps one remote resource with the shared cache. Concurrent misses for the
//! same key are collapsed into a single remote read whose result (or error) is
//! handed to every waiting caller.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::SharedCache;
use crate::error::{AppError, Result};
use crate::remote::RemoteSource;

// == Resource ==
/// A remote read-model addressable by a cache key and an API path.
pub trait Resource: Sized + Send + 'static {
    /// Cache key of the unparameterized resource.
    const CACHE_KEY: &'static str;
    /// API path of the unparameterized resource.
    const PATH: &'static str;

    /// Shapes the raw payload before it is cached.
    fn normalize(payload: Value) -> Value {
        payload
    }

    /// Decodes a (normalized) payload.
    fn decode(payload: Value) -> Result<Self>;

    /// Cache-busting version announced by the payload, if any.
    fn version_hint(_payload: &Value) -> Option<u64> {
        None
    }

    fn cache_key(param: Option<&str>) -> String {
        match param {
            Some(param) => format!("{}:{}", Self::CACHE_KEY, param),
            None => Self::CACHE_KEY.to_string(),
        }
    }

    fn path(param: Option<&str>) -> String {
        match param {
            Some(param) => format!("{}/{}", Self::PATH, param),
            None => Self::PATH.to_string(),
        }
    }
}

type SharedRead = Shared<BoxFuture<'static, Result<Value>>>;

/// A remote read in progress, stamped with the cache generation it started in.
#[derive(Clone)]
struct PendingFetch {
    generation: u64,
    read: SharedRead,
}

// == Fetch Service ==
pub struct FetchService<R> {
    cache: SharedCache,
    remote: Arc<dyn RemoteSource>,
    in_flight: Arc<Mutex<HashMap<String, PendingFetch>>>,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for FetchService<R> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            remote: self.remote.clone(),
            in_flight: self.in_flight.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> FetchService<R> {
    pub fn new(cache: SharedCache, remote: Arc<dyn RemoteSource>) -> Self {
        Self {
            cache,
            remote,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            _resource: PhantomData,
        }
    }

    // == Fetch ==
    /// Returns the resource, from cache when fresh, otherwise from the remote.
    pub async fn fetch(&self) -> Result<R> {
        self.fetch_with(None).await
    }

    /// Like [`fetch`](Self::fetch) for a parameterized key (`<key>:<param>`).
    pub async fn fetch_with(&self, param: Option<&str>) -> Result<R> {
        let payload = self.load(R::cache_key(param), R::path(param)).await?;
        R::decode(payload)
    }

    // == Invalidate ==
    /// Drops this resource's cached payload.
    pub async fn invalidate(&self) {
        self.cache.write().await.invalidate(Some(R::CACHE_KEY));
    }

    pub async fn invalidate_with(&self, param: &str) {
        self.cache
            .write()
            .await
            .invalidate(Some(&R::cache_key(Some(param))));
    }

    /// Number of remote reads currently in flight.
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    async fn load(&self, key: String, path: String) -> Result<Value> {
        let read = {
            // Holding the table lock across the cache check means a caller
            // either sees the cached result or the still-registered fetch.
            let mut in_flight = self.in_flight.lock().await;

            let (hit, generation) = {
                let mut cache = self.cache.write().await;
                (cache.get::<Value>(&key), cache.generation())
            };
            if let Some(payload) = hit {
                debug!(key = %key, "cache hit");
                return Ok(payload);
            }

            let joinable = in_flight
                .get(&key)
                .filter(|pending| pending.generation == generation)
                .map(|pending| pending.read.clone());

            match joinable {
                Some(read) => {
                    debug!(key = %key, "joining in-flight fetch");
                    read
                }
                None => {
                    if in_flight.contains_key(&key) {
                        debug!(key = %key, "in-flight fetch predates an invalidation, refetching");
                    }
                    debug!(key = %key, path = %path, "cache miss, fetching");
                    let read = self.spawn_fetch(key.clone(), path, generation);
                    in_flight.insert(
                        key,
                        PendingFetch {
                            generation,
                            read: read.clone(),
                        },
                    );
                    read
                }
            }
        };

        read.await
    }

    /// Runs the remote read on its own task so it completes, and populates
    /// the cache, even if every caller stops waiting.
    ///
    /// The result is cached only if nothing was invalidated since `generation`;
    /// otherwise it may predate a successful write and is handed to the
    /// waiting callers without being stored.
    fn spawn_fetch(&self, key: String, path: String, generation: u64) -> SharedRead {
        let cache = self.cache.clone();
        let remote = self.remote.clone();
        let in_flight = self.in_flight.clone();

        let task = tokio::spawn(async move {
            let result = remote.get_json(&path).await.map(R::normalize);

            match &result {
                Ok(payload) => {
                    let mut store = cache.write().await;
                    if store.generation() != generation {
                        debug!(key = %key, "cache invalidated during fetch, result not stored");
                    } else {
                        if let Some(version) = R::version_hint(payload) {
                            store.apply_remote_version(version);
                        }
                        store.set(key.clone(), payload.clone());
                    }
                }
                Err(err) => warn!(key = %key, error = %err, "remote read failed"),
            }

            // Released on both paths, unless a newer read already took the slot.
            let mut in_flight = in_flight.lock().await;
            if in_flight
                .get(&key)
                .is_some_and(|pending| pending.generation == generation)
            {
                in_flight.remove(&key);
            }
            result
        });

        async move {
            task.await
                .unwrap_or_else(|err| Err(AppError::Internal(format!("fetch task failed: {err}"))))
        }
        .boxed()
        .shared()
    }
}

// == Payload Helpers ==
/// Any non-array list payload becomes `[]`.
pub fn coerce_list(payload: Value) -> Value {
    if payload.is_array() {
        payload
    } else {
        warn!(kind = json_kind(&payload), "expected a list payload, using empty list");
        Value::Array(Vec::new())
    }
}

/// Decodes each list element, skipping the ones that do not fit `T`.
pub fn decode_list<T: serde::de::DeserializeOwned>(payload: Value) -> Vec<T> {
    let Value::Array(items) = payload else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(error = %err, "skipping malformed list item");
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeRemote;
    use super::*;
    use crate::cache::CacheStore;
    use serde_json::json;
    use std::time::Duration;

    /// Minimal list resource for exercising the generic service.
    #[derive(Debug, PartialEq)]
    struct Flavours(Vec<String>);

    impl Resource for Flavours {
        const CACHE_KEY: &'static str = "global_flavours";
        const PATH: &'static str = "/flavours";

        fn normalize(payload: Value) -> Value {
            coerce_list(payload)
        }

        fn decode(payload: Value) -> Result<Self> {
            Ok(Flavours(decode_list(payload)))
        }
    }

    fn service(remote: Arc<FakeRemote>) -> (FetchService<Flavours>, SharedCache) {
        let cache = CacheStore::in_memory(Duration::from_secs(900)).shared();
        (FetchService::new(cache.clone(), remote), cache)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let remote = Arc::new(FakeRemote::default());
        remote.serve("/flavours", Ok(json!(["mint", "cherry"])));
        let (service, cache) = service(remote.clone());

        let first = service.fetch().await.unwrap();
        let second = service.fetch().await.unwrap();

        assert_eq!(first, Flavours(vec!["mint".into(), "cherry".into()]));
        assert_eq!(first, second);
        assert_eq!(remote.calls(), 1);
        assert!(cache.read().await.contains("global_flavours"));
    }

    #[tokio::test]
    async fn test_concurrent_fetches_collapse() {
        let remote = Arc::new(FakeRemote::with_delay(Duration::from_millis(50)));
        remote.serve("/flavours", Ok(json!(["mint"])));
        let (service, _) = service(remote.clone());

        let (a, b, c) = tokio::join!(service.fetch(), service.fetch(), service.fetch());

        assert_eq!(remote.calls(), 1);
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(c.unwrap(), Flavours(vec!["mint".into()]));
        assert_eq!(service.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_failure_shared_and_not_cached() {
        let remote = Arc::new(FakeRemote::with_delay(Duration::from_millis(50)));
        remote.serve("/flavours", Err(AppError::Network("connection reset".into())));
        let (service, cache) = service(remote.clone());

        let (a, b) = tokio::join!(service.fetch(), service.fetch());

        assert_eq!(remote.calls(), 1);
        assert_eq!(a.unwrap_err(), AppError::Network("connection reset".into()));
        assert_eq!(b.unwrap_err(), AppError::Network("connection reset".into()));
        assert!(cache.read().await.is_empty());
        assert_eq!(service.in_flight().await, 0);

        // Next caller retries from scratch
        remote.serve("/flavours", Ok(json!(["lemon"])));
        assert_eq!(service.fetch().await.unwrap(), Flavours(vec!["lemon".into()]));
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test]
    async fn test_non_array_payload_coerced() {
        let remote = Arc::new(FakeRemote::default());
        remote.serve("/flavours", Ok(json!({"error": "oops"})));
        let (service, cache) = service(remote);

        assert_eq!(service.fetch().await.unwrap(), Flavours(vec![]));
        let cached: Option<Value> = cache.write().await.get("global_flavours");
        assert_eq!(cached, Some(json!([])));
    }

    #[tokio::test]
    async fn test_malformed_items_skipped() {
        let remote = Arc::new(FakeRemote::default());
        remote.serve("/flavours", Ok(json!(["mint", 42, "lime"])));
        let (service, _) = service(remote);

        assert_eq!(
            service.fetch().await.unwrap(),
            Flavours(vec!["mint".into(), "lime".into()])
        );
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let remote = Arc::new(FakeRemote::default());
        remote.serve("/flavours", Ok(json!(["mint"])));
        let (service, _) = service(remote.clone());

        service.fetch().await.unwrap();
        service.invalidate().await;
        service.fetch().await.unwrap();

        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test]
    async fn test_parameterized_keys_are_independent() {
        let remote = Arc::new(FakeRemote::default());
        remote.serve("/flavours", Ok(json!(["mint"])));
        remote.serve("/flavours/sour", Ok(json!(["lime"])));
        let (service, cache) = service(remote.clone());

        service.fetch().await.unwrap();
        let sour = service.fetch_with(Some("sour")).await.unwrap();

        assert_eq!(sour, Flavours(vec!["lime".into()]));
        assert_eq!(remote.calls(), 2);
        assert!(cache.read().await.contains("global_flavours:sour"));

        service.invalidate_with("sour").await;
        assert!(!cache.read().await.contains("global_flavours:sour"));
        assert!(cache.read().await.contains("global_flavours"));
    }

    #[tokio::test]
    async fn test_write_during_read_is_not_cached() {
        let remote = Arc::new(FakeRemote::with_delay(Duration::from_millis(100)));
        remote.serve("/flavours", Ok(json!(["old"])));
        let (service, cache) = service(remote.clone());

        let early = tokio::spawn({
            let service = service.clone();
            async move { service.fetch().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A write lands while the first read is still in flight
        remote.serve("/flavours", Ok(json!(["old", "new"])));
        cache.write().await.invalidate(None);

        let after_write = service.fetch().await.unwrap();
        assert_eq!(after_write, Flavours(vec!["old".into(), "new".into()]));
        assert_eq!(remote.calls(), 2, "must not join the pre-write read");

        // Callers that asked before the write still get their answer
        assert_eq!(early.await.unwrap().unwrap(), Flavours(vec!["old".into()]));

        let later = service.fetch().await.unwrap();
        assert_eq!(later, Flavours(vec!["old".into(), "new".into()]));
        assert_eq!(remote.calls(), 2);
        assert_eq!(service.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_version_change_during_read_discards_result() {
        let remote = Arc::new(FakeRemote::with_delay(Duration::from_millis(50)));
        remote.serve("/flavours", Ok(json!(["mint"])));
        let (service, cache) = service(remote.clone());

        let pending = tokio::spawn({
            let service = service.clone();
            async move { service.fetch().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.write().await.set_version(9);

        assert_eq!(pending.await.unwrap().unwrap(), Flavours(vec!["mint".into()]));
        assert!(!cache.read().await.contains("global_flavours"));
        assert_eq!(service.in_flight().await, 0);

        service.fetch().await.unwrap();
        assert_eq!(remote.calls(), 2);
        assert!(cache.read().await.contains("global_flavours"));
    }

    #[tokio::test]
    async fn test_fetch_completes_after_caller_gives_up() {
        let remote = Arc::new(FakeRemote::with_delay(Duration::from_millis(50)));
        remote.serve("/flavours", Ok(json!(["mint"])));
        let (service, cache) = service(remote.clone());

        let abandoned = tokio::time::timeout(Duration::from_millis(5), service.fetch()).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.read().await.contains("global_flavours"));
        assert_eq!(service.in_flight().await, 0);
    }
}
