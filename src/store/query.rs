//! Poll-based query handles over the cache store.
//!
//! A `Query<T>` ties one UI unit to one cache entry: it registers the
//! loader, subscribes to entry updates, and exposes a typed snapshot that
//! views poll on each tick.
//!
//! # Example
//!
//! ```ignore
//! let mut query = queries::products(&store, &api, 1, 50);
//!
//! // In the tick handler
//! if query.poll() {
//!     // State changed, re-render
//! }
//!
//! // In render
//! if let Some(page) = query.data() {
//!     render_rows(&page.data);
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use super::key::ResourceKey;
use super::store::{CacheStore, FetchStatus, Loader, Subscription};
use crate::api::error::ApiError;

/// A live subscription to one keyed resource.
///
/// Parameter changes are handled by dropping the query and building a new
/// one with the new key; the old subscription unregisters on drop.
pub struct Query<T> {
  store: CacheStore,
  sub: Subscription,
  status: FetchStatus,
  data: Option<T>,
  error: Option<ApiError>,
  decoded_version: u64,
}

impl<T> Query<T>
where
  T: Serialize + DeserializeOwned + Send + 'static,
{
  /// Create a query for `key`, register its fetcher, and kick off a load
  /// unless the cache already holds a fresh value.
  pub fn new<F, Fut>(store: &CacheStore, key: ResourceKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let loader: Loader = Arc::new(move || {
      let fut = fetcher();
      Box::pin(async move {
        let value = fut.await?;
        serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
      })
    });

    store.register_loader(&key, loader);
    let sub = store.subscribe(&key);
    store.refresh(&key);

    let mut query = Self {
      store: store.clone(),
      sub,
      status: FetchStatus::Idle,
      data: None,
      error: None,
      decoded_version: 0,
    };
    query.sync();
    query
  }

  /// The resource key this query observes.
  pub fn key(&self) -> &ResourceKey {
    self.sub.key()
  }

  /// Current position in the idle -> loading -> success/error machine.
  pub fn status(&self) -> FetchStatus {
    self.status
  }

  /// Last successfully decoded payload. Stays available while a
  /// revalidation is in flight, so views keep rendering stale data instead
  /// of flashing a spinner.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.status == FetchStatus::Loading
  }

  pub fn is_error(&self) -> bool {
    self.status == FetchStatus::Error
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.error.as_ref()
  }

  /// Force a refetch regardless of freshness.
  pub fn refetch(&mut self) {
    self.store.refetch(self.sub.key());
  }

  /// Drain change notifications and refresh the typed snapshot.
  /// Returns true if anything changed; call from the view's tick.
  pub fn poll(&mut self) -> bool {
    if !self.sub.poll() {
      return false;
    }
    self.sync();
    true
  }

  /// Wait for the next store notification, then refresh the snapshot.
  /// Headless driver for tests and scripts; the TUI uses `poll`.
  pub async fn changed(&mut self) -> bool {
    if !self.sub.changed().await {
      return false;
    }
    self.sync();
    true
  }

  fn sync(&mut self) {
    let Some(snapshot) = self.store.snapshot(self.sub.key()) else {
      self.status = FetchStatus::Idle;
      self.data = None;
      self.error = None;
      return;
    };

    self.status = snapshot.status;
    self.error = snapshot.error;

    match snapshot.data {
      Some(value) => {
        if snapshot.version != self.decoded_version {
          self.decoded_version = snapshot.version;
          match serde_json::from_value(value) {
            Ok(decoded) => self.data = Some(decoded),
            Err(err) => {
              self.status = FetchStatus::Error;
              self.error = Some(ApiError::Decode(err.to_string()));
            }
          }
        }
      }
      None => self.data = None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::key::Verb;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  fn key() -> ResourceKey {
    ResourceKey::get("/api/v1/products").query("page", 1)
  }

  #[tokio::test]
  async fn test_query_success() {
    let store = CacheStore::default();
    let mut query = Query::new(&store, key(), || async { Ok(vec![1, 2, 3]) });
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(query.poll());
    assert_eq!(query.status(), FetchStatus::Success);
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_changed_awaits_the_next_update() {
    let store = CacheStore::default();
    let mut query = Query::new(&store, key(), || async { Ok(7u32) });

    // First notification is the load starting, then the settle.
    while query.is_loading() || query.data().is_none() {
      assert!(query.changed().await);
    }
    assert_eq!(query.data(), Some(&7));
  }

  #[tokio::test]
  async fn test_query_error() {
    let store = CacheStore::default();
    let mut query: Query<Vec<i32>> = Query::new(&store, key(), || async {
      Err(ApiError::Api {
        status: 500,
        body: "boom".into(),
      })
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(query.is_error());
    assert_eq!(query.error().and_then(|e| e.status()), Some(500));
  }

  #[tokio::test]
  async fn test_two_queries_share_one_fetch() {
    let store = CacheStore::default();
    let calls = Arc::new(AtomicU32::new(0));

    let make = |store: &CacheStore| {
      let calls = calls.clone();
      Query::new(store, key(), move || {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(20)).await;
          Ok(vec![42])
        }
      })
    };

    let mut a = make(&store);
    let mut b = make(&store);
    tokio::time::sleep(Duration::from_millis(50)).await;
    a.poll();
    b.poll();

    assert_eq!(a.data(), Some(&vec![42]));
    assert_eq!(b.data(), Some(&vec![42]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_invalidation_transitions_back_to_loading() {
    let store = CacheStore::default();
    let calls = Arc::new(AtomicU32::new(0));
    let calls_for_query = calls.clone();

    let mut query = Query::new(&store, key(), move || {
      let calls = calls_for_query.clone();
      async move {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![n])
      }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&vec![0]));

    store.invalidate_rules(&[(Verb::Get, "/api/v1/products")]);
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert_eq!(query.status(), FetchStatus::Success);
    assert_eq!(query.data(), Some(&vec![1]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_data_survives_refetch() {
    let store = CacheStore::default();
    let mut query = Query::new(&store, key(), || async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok("payload".to_string())
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    query.poll();
    assert_eq!(query.data().map(String::as_str), Some("payload"));

    query.refetch();
    query.poll();
    // Loading again, but the stale payload is still renderable.
    assert!(query.is_loading());
    assert_eq!(query.data().map(String::as_str), Some("payload"));
  }
}
