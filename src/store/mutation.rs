//! Poll-based mutation handles with declarative cache invalidation.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::key::Verb;
use super::store::CacheStore;
use crate::api::error::ApiError;

/// Cache keys a mutation dirties, declared as (verb, path-template prefix)
/// pairs. Declared statically per mutation type, never derived at runtime.
pub type InvalidationRule = &'static [(Verb, &'static str)];

/// State of a mutation handle.
#[derive(Debug, Clone, Default)]
pub enum MutationState<T> {
  #[default]
  Idle,
  Running,
  Success(T),
  Error(ApiError),
}

type OpFuture<T> = BoxFuture<'static, Result<T, ApiError>>;
type OpFn<I, T> = Arc<dyn Fn(I) -> OpFuture<T> + Send + Sync>;

/// A write operation against the backend.
///
/// `mutate` spawns the request; the view polls for the outcome on tick. On
/// success the declared invalidation rule is applied to the store, strictly
/// after success, so dependent refetches never interleave with the write.
/// On failure nothing is invalidated: the cache keeps the last known server
/// state and the caller can retry. Repeated `mutate` calls repeat the side
/// effect; there is no retry and no idempotence guarantee here.
pub struct Mutation<I, T> {
  store: CacheStore,
  invalidates: InvalidationRule,
  op: OpFn<I, T>,
  state: MutationState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
}

impl<I, T> Mutation<I, T>
where
  I: Send + 'static,
  T: Send + 'static,
{
  pub fn new<F, Fut>(store: &CacheStore, invalidates: InvalidationRule, op: F) -> Self
  where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      store: store.clone(),
      invalidates,
      op: Arc::new(move |input| Box::pin(op(input))),
      state: MutationState::Idle,
      receiver: None,
    }
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_running(&self) -> bool {
    matches!(self.state, MutationState::Running)
  }

  pub fn is_success(&self) -> bool {
    matches!(self.state, MutationState::Success(_))
  }

  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      MutationState::Error(err) => Some(err),
      _ => None,
    }
  }

  /// Forget the last outcome (e.g. when the user edits the form again).
  pub fn reset(&mut self) {
    self.state = MutationState::Idle;
    self.receiver = None;
  }

  /// Fire the mutation. The outcome arrives via `poll`.
  pub fn mutate(&mut self, input: I) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Running;

    let store = self.store.clone();
    let invalidates = self.invalidates;
    let future = (self.op)(input);
    tokio::spawn(async move {
      let result = future.await;
      if result.is_ok() {
        // Success observed first; only then are dependents refetched.
        debug!(rules = invalidates.len(), "mutation succeeded, invalidating");
        store.invalidate_rules(invalidates);
      }
      let _ = tx.send(result);
    });
  }

  /// Poll for the outcome. Returns true if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = MutationState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(err)) => {
        self.state = MutationState::Error(err);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = MutationState::Error(ApiError::Transport(
          "mutation task was dropped".into(),
        ));
        self.receiver = None;
        true
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{Loader, ResourceKey};
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  const PRODUCT_RULES: InvalidationRule = &[(Verb::Get, "/api/v1/products")];

  fn seeded_store() -> (CacheStore, ResourceKey) {
    let store = CacheStore::default();
    let key = ResourceKey::get("/api/v1/products").query("page", 1);
    store.set(&key, json!(["cappuccino", "latte"]));
    (store, key)
  }

  #[tokio::test]
  async fn test_success_marks_dependent_keys_stale() {
    let (store, key) = seeded_store();
    let mut mutation: Mutation<(), u64> =
      Mutation::new(&store, PRODUCT_RULES, |_| async { Ok(7) });

    mutation.mutate(());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(mutation.poll());
    assert!(mutation.is_success());

    // The next read of the collection must revalidate (not trust the cache).
    assert!(store.snapshot(&key).unwrap().is_stale);
  }

  #[tokio::test]
  async fn test_success_refetches_subscribed_keys() {
    let (store, key) = seeded_store();
    let refetches = Arc::new(AtomicU32::new(0));
    let refetches_in_loader = refetches.clone();
    let loader: Loader = Arc::new(move || {
      let refetches = refetches_in_loader.clone();
      Box::pin(async move {
        refetches.fetch_add(1, Ordering::SeqCst);
        Ok(json!(["espresso"]))
      })
    });
    store.register_loader(&key, loader);
    let _sub = store.subscribe(&key);

    let mut mutation: Mutation<(), ()> =
      Mutation::new(&store, PRODUCT_RULES, |_| async { Ok(()) });
    mutation.mutate(());
    tokio::time::sleep(Duration::from_millis(20)).await;
    mutation.poll();

    assert_eq!(refetches.load(Ordering::SeqCst), 1);
    assert_eq!(store.snapshot(&key).unwrap().data, Some(json!(["espresso"])));
  }

  #[tokio::test]
  async fn test_failure_leaves_cache_untouched() {
    let (store, key) = seeded_store();
    let before = store.snapshot(&key).unwrap();

    // Delete rejected by the backend, e.g. a category that still has
    // products.
    let mut mutation: Mutation<(), ()> = Mutation::new(&store, PRODUCT_RULES, |_| async {
      Err(ApiError::Api {
        status: 409,
        body: "category has products".into(),
      })
    });
    mutation.mutate(());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(mutation.poll());

    assert_eq!(mutation.error().and_then(|e| e.status()), Some(409));
    let after = store.snapshot(&key).unwrap();
    assert!(!after.is_stale);
    assert_eq!(after.data, before.data);
  }

  #[tokio::test]
  async fn test_reset_clears_outcome() {
    let store = CacheStore::default();
    let mut mutation: Mutation<u32, u32> =
      Mutation::new(&store, &[], |n| async move { Ok(n * 2) });

    mutation.mutate(21);
    tokio::time::sleep(Duration::from_millis(10)).await;
    mutation.poll();
    assert!(mutation.is_success());

    mutation.reset();
    assert!(matches!(mutation.state(), MutationState::Idle));
  }
}
