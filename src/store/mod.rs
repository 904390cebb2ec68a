//! Client-side cache core: resource keys, the keyed cache store, and the
//! query/mutation handles views build on.
//!
//! - at most one in-flight load per key (concurrent callers attach)
//! - stale-while-revalidate freshness policy with configurable windows
//! - explicit pub/sub: any driver (TUI or headless test) polls or awaits
//! - declarative invalidation rules applied after successful mutations
//! - tick-driven garbage collection of unwatched entries

mod clock;
mod key;
mod mutation;
mod query;
mod store;

pub use clock::{Clock, SystemClock};
pub use key::{ResourceKey, Verb};
pub use mutation::{InvalidationRule, Mutation, MutationState};
pub use query::Query;
pub use store::{CacheStore, EntrySnapshot, FetchStatus, Loader, Subscription};
