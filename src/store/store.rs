//! In-memory cache store keyed by [`ResourceKey`].
//!
//! The store is the single shared mutable resource of the application. All
//! mutation goes through `fetch`/`set`/`invalidate`/`sweep`; views observe
//! entries through subscriptions and never touch entries directly.

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::key::{ResourceKey, Verb};
use crate::api::error::ApiError;

/// Boxed future produced by a loader.
pub type LoaderFuture = BoxFuture<'static, Result<Value, ApiError>>;

/// A reusable fetch function for one resource key. Queries register these so
/// invalidation can refetch without the view's involvement.
pub type Loader = Arc<dyn Fn() -> LoaderFuture + Send + Sync>;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
  #[default]
  Idle,
  Loading,
  Success,
  Error,
}

/// Read-only view of one cache entry.
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
  pub status: FetchStatus,
  pub data: Option<Value>,
  pub error: Option<ApiError>,
  pub fetched_at: Option<DateTime<Utc>>,
  pub is_stale: bool,
  pub version: u64,
}

#[derive(Default)]
struct Entry {
  status: FetchStatus,
  data: Option<Value>,
  error: Option<ApiError>,
  fetched_at: Option<DateTime<Utc>>,
  /// Explicitly marked stale by invalidation.
  invalidated: bool,
  version: u64,
  loader: Option<Loader>,
  /// Present while a load is in flight; dropped on completion, which wakes
  /// every attached waiter.
  done: Option<watch::Sender<()>>,
  subscribers: Vec<(u64, mpsc::UnboundedSender<()>)>,
}

impl Entry {
  fn notify(&mut self) {
    self.version += 1;
    self.subscribers.retain(|(_, tx)| tx.send(()).is_ok());
  }
}

struct StoreInner {
  entries: Mutex<HashMap<ResourceKey, Entry>>,
  clock: Arc<dyn Clock>,
  stale_after: Duration,
  expire_after: Duration,
  halted: AtomicBool,
  next_subscriber_id: AtomicU64,
}

/// Shared cache store. Cheap to clone; all clones see the same entries.
#[derive(Clone)]
pub struct CacheStore {
  inner: Arc<StoreInner>,
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new(
      Arc::new(SystemClock),
      Duration::minutes(5),
      Duration::minutes(10),
    )
  }
}

impl CacheStore {
  pub fn new(clock: Arc<dyn Clock>, stale_after: Duration, expire_after: Duration) -> Self {
    Self {
      inner: Arc::new(StoreInner {
        entries: Mutex::new(HashMap::new()),
        clock,
        stale_after,
        expire_after,
        halted: AtomicBool::new(false),
        next_subscriber_id: AtomicU64::new(1),
      }),
    }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ResourceKey, Entry>> {
    self.inner.entries.lock().expect("cache store lock poisoned")
  }

  fn is_fresh(&self, entry: &Entry) -> bool {
    if entry.invalidated || entry.status != FetchStatus::Success {
      return false;
    }
    match entry.fetched_at {
      Some(at) => self.inner.clock.now() - at <= self.inner.stale_after,
      None => false,
    }
  }

  /// Stop issuing network fetches. Cached data stays readable.
  pub fn halt(&self) {
    self.inner.halted.store(true, Ordering::SeqCst);
  }

  /// Allow fetches again (a new session was established).
  pub fn resume(&self) {
    self.inner.halted.store(false, Ordering::SeqCst);
  }

  pub fn is_halted(&self) -> bool {
    self.inner.halted.load(Ordering::SeqCst)
  }

  /// Read the current state of an entry, if one exists.
  pub fn snapshot(&self, key: &ResourceKey) -> Option<EntrySnapshot> {
    let entries = self.lock();
    entries.get(key).map(|entry| EntrySnapshot {
      status: entry.status,
      data: entry.data.clone(),
      error: entry.error.clone(),
      fetched_at: entry.fetched_at,
      is_stale: !self.is_fresh(entry),
      version: entry.version,
    })
  }

  /// Register the loader used to (re)fetch this key. Invalidation and
  /// `refresh` use it; the last registration wins.
  pub fn register_loader(&self, key: &ResourceKey, loader: Loader) {
    let mut entries = self.lock();
    entries.entry(key.clone()).or_default().loader = Some(loader);
  }

  /// Subscribe to updates for a key. The subscription unregisters itself on
  /// drop; a dropped subscriber never blocks an in-flight fetch from
  /// completing and populating the cache for everyone else.
  pub fn subscribe(&self, key: &ResourceKey) -> Subscription {
    let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
    let (tx, rx) = mpsc::unbounded_channel();
    {
      let mut entries = self.lock();
      entries
        .entry(key.clone())
        .or_default()
        .subscribers
        .push((id, tx));
    }
    Subscription {
      store: self.clone(),
      key: key.clone(),
      id,
      rx,
    }
  }

  fn unsubscribe(&self, key: &ResourceKey, id: u64) {
    let mut entries = self.lock();
    if let Some(entry) = entries.get_mut(key) {
      entry.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }
  }

  /// Start a load for `key` unless one is already in flight (attaching to
  /// it instead) or fetches are halted. Returns a receiver that resolves
  /// when the load settles, or `None` when nothing was started.
  fn start_load(&self, key: &ResourceKey, loader: Loader) -> Option<watch::Receiver<()>> {
    if self.is_halted() {
      debug!(key = %key, "fetch suppressed: store is halted");
      return None;
    }

    let rx = {
      let mut entries = self.lock();
      let entry = entries.entry(key.clone()).or_default();
      if let Some(done) = &entry.done {
        // A load is already running; share it.
        return Some(done.subscribe());
      }
      let (done_tx, done_rx) = watch::channel(());
      entry.done = Some(done_tx);
      entry.loader = Some(loader.clone());
      entry.status = FetchStatus::Loading;
      entry.notify();
      done_rx
    };

    debug!(key = %key, "fetch started");
    let store = self.clone();
    let key = key.clone();
    tokio::spawn(async move {
      let result = loader().await;
      store.settle(&key, result);
    });

    Some(rx)
  }

  /// Record the outcome of a load. Serialized per key behind the store
  /// lock; the entry's `done` sender is dropped here, waking any waiters.
  fn settle(&self, key: &ResourceKey, result: Result<Value, ApiError>) {
    let unauthenticated = matches!(&result, Err(e) if e.is_unauthenticated());

    {
      let mut entries = self.lock();
      let entry = entries.entry(key.clone()).or_default();
      entry.fetched_at = Some(self.inner.clock.now());
      match result {
        Ok(value) => {
          entry.status = FetchStatus::Success;
          entry.data = Some(value);
          entry.error = None;
          entry.invalidated = false;
        }
        Err(err) => {
          debug!(key = %key, error = %err, "fetch failed");
          // Keep the last good payload so views can keep rendering it.
          entry.status = FetchStatus::Error;
          entry.error = Some(err);
        }
      }
      entry.done = None;
      entry.notify();
    }

    if unauthenticated {
      warn!(key = %key, "got 401, halting further fetches");
      self.halt();
    }
  }

  /// Fetch the value for `key`.
  ///
  /// Fresh entries are served directly. Stale entries are served
  /// immediately while a background refetch runs (stale-while-revalidate).
  /// Otherwise the caller awaits the (possibly shared) in-flight load. At
  /// most one load per key runs at any time.
  pub async fn fetch(&self, key: &ResourceKey, loader: Loader) -> Result<Value, ApiError> {
    // Fast path: fresh, or stale-but-present.
    {
      let entries = self.lock();
      if let Some(entry) = entries.get(key) {
        if let Some(data) = &entry.data {
          if self.is_fresh(entry) {
            return Ok(data.clone());
          }
          let stale = data.clone();
          drop(entries);
          self.start_load(key, loader);
          return Ok(stale);
        }
      }
    }

    // Miss: start or attach, then wait for the entry to settle.
    let Some(mut rx) = self.start_load(key, loader) else {
      return Err(ApiError::Api {
        status: 401,
        body: "fetches are halted until a session is re-established".into(),
      });
    };

    loop {
      if let Some(result) = self.settled_result(key) {
        return result;
      }
      // Err means the sender was dropped, i.e. the load settled.
      if rx.changed().await.is_err() {
        if let Some(result) = self.settled_result(key) {
          return result;
        }
        return Err(ApiError::Transport("fetch was abandoned".into()));
      }
    }
  }

  fn settled_result(&self, key: &ResourceKey) -> Option<Result<Value, ApiError>> {
    let entries = self.lock();
    let entry = entries.get(key)?;
    match entry.status {
      FetchStatus::Success => entry.data.clone().map(Ok),
      FetchStatus::Error => entry.error.clone().map(Err),
      _ => None,
    }
  }

  /// Kick off a background refetch for `key` using its registered loader,
  /// unless the entry is already fresh or a load is in flight.
  pub fn refresh(&self, key: &ResourceKey) {
    let loader = {
      let entries = self.lock();
      match entries.get(key) {
        Some(entry) if !self.is_fresh(entry) => entry.loader.clone(),
        _ => None,
      }
    };
    if let Some(loader) = loader {
      self.start_load(key, loader);
    }
  }

  /// Force a refetch even if the entry is fresh (manual refresh).
  pub fn refetch(&self, key: &ResourceKey) {
    let loader = {
      let entries = self.lock();
      entries.get(key).and_then(|entry| entry.loader.clone())
    };
    if let Some(loader) = loader {
      self.start_load(key, loader);
    }
  }

  /// Write a value directly, as if it had just been fetched.
  pub fn set(&self, key: &ResourceKey, value: Value) {
    let mut entries = self.lock();
    let entry = entries.entry(key.clone()).or_default();
    entry.status = FetchStatus::Success;
    entry.data = Some(value);
    entry.error = None;
    entry.invalidated = false;
    entry.fetched_at = Some(self.inner.clock.now());
    entry.notify();
  }

  /// Mark every entry matching `pred` stale. Entries with live subscribers
  /// refetch immediately through their registered loader; the rest refetch
  /// on next access.
  pub fn invalidate<P: Fn(&ResourceKey) -> bool>(&self, pred: P) {
    let mut to_refetch = Vec::new();
    let mut marked = 0usize;
    {
      let mut entries = self.lock();
      for (key, entry) in entries.iter_mut() {
        if !pred(key) {
          continue;
        }
        entry.invalidated = true;
        entry.notify();
        marked += 1;
        if !entry.subscribers.is_empty()
          && entry.done.is_none()
          && entry.loader.is_some()
        {
          to_refetch.push(key.clone());
        }
      }
    }
    if marked > 0 {
      info!(marked, refetching = to_refetch.len(), "cache invalidated");
    }
    for key in to_refetch {
      self.refresh(&key);
    }
  }

  /// Invalidate by statically declared (verb, path-template prefix) rules.
  pub fn invalidate_rules(&self, rules: &[(Verb, &'static str)]) {
    self.invalidate(|key| rules.iter().any(|(verb, prefix)| key.matches(*verb, prefix)));
  }

  /// Evict entries nobody is watching that have outlived the expiry window.
  /// Entries with subscribers or an in-flight load are never touched, so no
  /// subscriber can observe data loss.
  pub fn sweep(&self) {
    let now = self.inner.clock.now();
    let expire_after = self.inner.expire_after;
    let mut entries = self.lock();
    let before = entries.len();
    entries.retain(|_, entry| {
      if !entry.subscribers.is_empty() || entry.done.is_some() {
        return true;
      }
      match entry.fetched_at {
        Some(at) => now - at <= expire_after,
        // Never fetched and nobody watching: nothing worth keeping.
        None => false,
      }
    });
    let evicted = before - entries.len();
    if evicted > 0 {
      debug!(evicted, "cache swept");
    }
  }

  #[cfg(test)]
  fn subscriber_count(&self, key: &ResourceKey) -> usize {
    let entries = self.lock();
    entries.get(key).map(|e| e.subscribers.len()).unwrap_or(0)
  }

  #[cfg(test)]
  fn contains(&self, key: &ResourceKey) -> bool {
    self.lock().contains_key(key)
  }
}

/// A registered observer of one cache entry. Dropping it detaches the
/// observer; any in-flight fetch still completes into the cache.
pub struct Subscription {
  store: CacheStore,
  key: ResourceKey,
  id: u64,
  rx: mpsc::UnboundedReceiver<()>,
}

impl Subscription {
  pub fn key(&self) -> &ResourceKey {
    &self.key
  }

  /// Drain pending change notifications. Returns true if there were any.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while self.rx.try_recv().is_ok() {
      changed = true;
    }
    changed
  }

  /// Wait for the next change notification (headless/test driver).
  pub async fn changed(&mut self) -> bool {
    self.rx.recv().await.is_some()
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.store.unsubscribe(&self.key, self.id);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::clock::ManualClock;
  use serde_json::json;
  use std::sync::atomic::AtomicU32;
  use std::time::Duration as StdDuration;

  fn test_store(clock: Arc<ManualClock>) -> CacheStore {
    CacheStore::new(clock, Duration::minutes(5), Duration::minutes(10))
  }

  fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new("2026-01-01T00:00:00Z".parse().unwrap()))
  }

  fn counting_loader(counter: Arc<AtomicU32>, value: Value) -> Loader {
    Arc::new(move || {
      let counter = counter.clone();
      let value = value.clone();
      Box::pin(async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        Ok(value)
      })
    })
  }

  fn products_key() -> ResourceKey {
    ResourceKey::get("/api/v1/products").query("page", 1)
  }

  #[tokio::test]
  async fn test_concurrent_fetches_share_one_load() {
    let store = test_store(manual_clock());
    let key = products_key();
    let calls = Arc::new(AtomicU32::new(0));
    let loader = counting_loader(calls.clone(), json!([1, 2, 3]));

    let mut handles = Vec::new();
    for _ in 0..8 {
      let store = store.clone();
      let key = key.clone();
      let loader = loader.clone();
      handles.push(tokio::spawn(
        async move { store.fetch(&key, loader).await },
      ));
    }
    for handle in handles {
      let value = handle.await.unwrap().unwrap();
      assert_eq!(value, json!([1, 2, 3]));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fresh_entry_is_served_without_network() {
    let store = test_store(manual_clock());
    let key = products_key();
    let calls = Arc::new(AtomicU32::new(0));
    let loader = counting_loader(calls.clone(), json!("payload"));

    store.fetch(&key, loader.clone()).await.unwrap();
    store.fetch(&key, loader.clone()).await.unwrap();
    store.fetch(&key, loader).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_stale_entry_served_while_revalidating() {
    let clock = manual_clock();
    let store = test_store(clock.clone());
    let key = products_key();
    let calls = Arc::new(AtomicU32::new(0));
    let loader = counting_loader(calls.clone(), json!("v1"));

    store.fetch(&key, loader).await.unwrap();
    clock.advance(Duration::minutes(6));

    // Stale: the old value comes back immediately, a refetch runs behind it.
    let loader2 = counting_loader(calls.clone(), json!("v2"));
    let served = store.fetch(&key, loader2).await.unwrap();
    assert_eq!(served, json!("v1"));

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let snapshot = store.snapshot(&key).unwrap();
    assert_eq!(snapshot.data, Some(json!("v2")));
  }

  #[tokio::test]
  async fn test_invalidate_refetches_subscribed_keys() {
    let store = test_store(manual_clock());
    let key = products_key();
    let calls = Arc::new(AtomicU32::new(0));
    let loader = counting_loader(calls.clone(), json!("data"));

    store.fetch(&key, loader).await.unwrap();
    let _sub = store.subscribe(&key);

    store.invalidate_rules(&[(Verb::Get, "/api/v1/products")]);
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    // The subscribed key refetched immediately.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let snapshot = store.snapshot(&key).unwrap();
    assert_eq!(snapshot.status, FetchStatus::Success);
    assert!(!snapshot.is_stale);
  }

  #[tokio::test]
  async fn test_invalidate_marks_unwatched_keys_for_next_access() {
    let store = test_store(manual_clock());
    let key = products_key();
    let calls = Arc::new(AtomicU32::new(0));
    let loader = counting_loader(calls.clone(), json!("data"));

    store.fetch(&key, loader.clone()).await.unwrap();
    store.invalidate_rules(&[(Verb::Get, "/api/v1/products")]);

    // No subscriber: nothing refetched yet.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.snapshot(&key).unwrap().is_stale);

    // Next access revalidates instead of trusting the cached value.
    store.fetch(&key, loader).await.unwrap();
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_unrelated_keys_survive_invalidation() {
    let store = test_store(manual_clock());
    let orders = ResourceKey::get("/api/v1/orders");
    let calls = Arc::new(AtomicU32::new(0));
    store
      .fetch(&orders, counting_loader(calls.clone(), json!("orders")))
      .await
      .unwrap();

    store.invalidate_rules(&[(Verb::Get, "/api/v1/products")]);
    assert!(!store.snapshot(&orders).unwrap().is_stale);
  }

  #[tokio::test]
  async fn test_sweep_evicts_only_unwatched_expired_entries() {
    let clock = manual_clock();
    let store = test_store(clock.clone());
    let watched = ResourceKey::get("/api/v1/products");
    let unwatched = ResourceKey::get("/api/v1/orders");
    let calls = Arc::new(AtomicU32::new(0));

    store
      .fetch(&watched, counting_loader(calls.clone(), json!(1)))
      .await
      .unwrap();
    store
      .fetch(&unwatched, counting_loader(calls.clone(), json!(2)))
      .await
      .unwrap();
    let _sub = store.subscribe(&watched);

    clock.advance(Duration::minutes(11));
    store.sweep();

    assert!(store.contains(&watched));
    assert!(!store.contains(&unwatched));
  }

  #[tokio::test]
  async fn test_dropped_subscription_detaches_but_fetch_completes() {
    let store = test_store(manual_clock());
    let key = products_key();
    let calls = Arc::new(AtomicU32::new(0));

    let sub = store.subscribe(&key);
    assert_eq!(store.subscriber_count(&key), 1);

    store.register_loader(&key, counting_loader(calls.clone(), json!("late")));
    store.refetch(&key);
    drop(sub);
    assert_eq!(store.subscriber_count(&key), 0);

    tokio::time::sleep(StdDuration::from_millis(50)).await;
    // The fetch still populated the cache for future subscribers.
    assert_eq!(store.snapshot(&key).unwrap().data, Some(json!("late")));
  }

  #[tokio::test]
  async fn test_unauthenticated_error_halts_fetches() {
    let store = test_store(manual_clock());
    let key = products_key();
    let loader: Loader = Arc::new(|| {
      Box::pin(async {
        Err(ApiError::Api {
          status: 401,
          body: "token expired".into(),
        })
      })
    });

    let err = store.fetch(&key, loader).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(store.is_halted());

    // Further fetches are suppressed until resume().
    let calls = Arc::new(AtomicU32::new(0));
    let counting = counting_loader(calls.clone(), json!("x"));
    let other = ResourceKey::get("/api/v1/orders");
    let _ = store.fetch(&other, counting).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    store.resume();
    let calls2 = Arc::new(AtomicU32::new(0));
    store
      .fetch(&other, counting_loader(calls2.clone(), json!("y")))
      .await
      .unwrap();
    assert_eq!(calls2.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fetch_error_keeps_last_good_value() {
    let clock = manual_clock();
    let store = test_store(clock.clone());
    let key = products_key();
    let calls = Arc::new(AtomicU32::new(0));

    store
      .fetch(&key, counting_loader(calls.clone(), json!("good")))
      .await
      .unwrap();
    clock.advance(Duration::minutes(6));

    let failing: Loader = Arc::new(|| {
      Box::pin(async {
        Err(ApiError::Api {
          status: 500,
          body: "boom".into(),
        })
      })
    });
    // Stale value served; the background refetch fails.
    let served = store.fetch(&key, failing).await.unwrap();
    assert_eq!(served, json!("good"));
    tokio::time::sleep(StdDuration::from_millis(20)).await;

    let snapshot = store.snapshot(&key).unwrap();
    assert_eq!(snapshot.status, FetchStatus::Error);
    assert_eq!(snapshot.data, Some(json!("good")));
    assert_eq!(snapshot.error.unwrap().status(), Some(500));
  }

  #[tokio::test]
  async fn test_subscription_sees_set() {
    let store = test_store(manual_clock());
    let key = products_key();
    let mut sub = store.subscribe(&key);

    store.set(&key, json!({"seeded": true}));
    assert!(sub.changed().await);
    assert_eq!(
      store.snapshot(&key).unwrap().data,
      Some(json!({"seeded": true}))
    );
  }
}
