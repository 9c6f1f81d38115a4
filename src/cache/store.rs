//! Resource cache store.
//!
//! One store holds every entry of a resource group, keyed by [`CacheKey`].
//! It owns:
//! - entry status, data and error, published to subscribers through a
//!   `watch` channel per entry
//! - in-flight de-duplication: identical requests share one future
//! - store-wide sequence numbers so an older completion never overwrites a
//!   newer one, even across eviction and reset
//! - retention-based eviction of entries nobody subscribes to
//! - the tag graph used for invalidation
//! - bookkeeping of running mutations for the activity aggregator

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, trace, warn};

use super::entry::{CacheEntry, EntryOptions, Status};
use super::key::{canonical_string, CacheKey};
use super::tags::{Tag, TagGraph};
use crate::error::{ApiError, ApiResult};

/// In-flight request shared by every caller that asked for it.
pub type SharedFetch = Shared<BoxFuture<'static, ApiResult<Value>>>;

/// Re-issues the last request of an entry after invalidation.
pub type Refetcher = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Called after every status transition in the store.
pub type StatusListener = Arc<dyn Fn() + Send + Sync>;

/// Result of reducing an incoming response into an entry.
#[derive(Debug, Clone)]
pub struct Settled {
  pub data: Value,
  pub tags: Vec<Tag>,
}

impl Settled {
  /// Reducer that stores the incoming value as-is and provides no tags.
  pub fn replace(_existing: Option<Value>, incoming: Value) -> ApiResult<Settled> {
    Ok(Settled {
      data: incoming,
      tags: Vec::new(),
    })
  }
}

/// Store-wide defaults.
#[derive(Debug, Clone)]
pub struct StoreConfig {
  /// Retention for unsubscribed entries unless the endpoint overrides it
  pub keep_unused_for: Duration,
  /// Fulfilled entries older than this are refetched on next query
  pub stale_after: Option<Duration>,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      keep_unused_for: Duration::from_secs(60),
      stale_after: None,
    }
  }
}

struct Slot {
  entry: CacheEntry,
  options: EntryOptions,
  /// Requests running for this slot. A completion whose sequence number is
  /// missing here started before the slot was evicted or reset.
  pending: HashSet<u64>,
  applied_seq: u64,
  eviction_generation: u64,
  refetcher: Option<Refetcher>,
  notifier: watch::Sender<CacheEntry>,
}

impl Slot {
  fn new(options: EntryOptions) -> Self {
    let (notifier, _) = watch::channel(CacheEntry::default());
    Self {
      entry: CacheEntry::default(),
      options,
      pending: HashSet::new(),
      applied_seq: 0,
      eviction_generation: 0,
      refetcher: None,
      notifier,
    }
  }

  fn settle_status(&mut self) {
    self.entry.status = if !self.pending.is_empty() {
      Status::Pending
    } else if self.entry.error.is_some() {
      Status::Rejected
    } else if self.entry.data.is_some() {
      Status::Fulfilled
    } else {
      Status::Idle
    };
  }

  fn publish(&self) {
    self.notifier.send_replace(self.entry.clone());
  }
}

struct InFlight {
  seq: u64,
  shared: SharedFetch,
}

struct MutationRecord {
  name: &'static str,
  blocking: bool,
}

#[derive(Default)]
struct StoreInner {
  entries: HashMap<CacheKey, Slot>,
  inflight: HashMap<String, InFlight>,
  next_seq: u64,
  mutations: HashMap<u64, MutationRecord>,
  next_mutation: u64,
  tags: TagGraph,
}

struct StoreShared {
  name: &'static str,
  config: StoreConfig,
  inner: Mutex<StoreInner>,
  listeners: Mutex<Vec<StatusListener>>,
}

/// Keyed cache of request results for one resource group.
#[derive(Clone)]
pub struct ResourceStore {
  shared: Arc<StoreShared>,
}

impl ResourceStore {
  pub fn new(name: &'static str, config: StoreConfig) -> Self {
    Self {
      shared: Arc::new(StoreShared {
        name,
        config,
        inner: Mutex::new(StoreInner::default()),
        listeners: Mutex::new(Vec::new()),
      }),
    }
  }

  pub fn name(&self) -> &'static str {
    self.shared.name
  }

  pub fn config(&self) -> &StoreConfig {
    &self.shared.config
  }

  /// Entry options built from the store defaults.
  pub fn default_options(&self) -> EntryOptions {
    EntryOptions {
      keep_unused_for: self.shared.config.keep_unused_for,
      blocking: true,
    }
  }

  fn lock(&self) -> MutexGuard<'_, StoreInner> {
    self
      .shared
      .inner
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  /// Snapshot of an entry; an unknown key reads as an idle entry.
  pub fn get(&self, key: &CacheKey) -> CacheEntry {
    self
      .lock()
      .entries
      .get(key)
      .map(|slot| slot.entry.clone())
      .unwrap_or_default()
  }

  pub fn contains(&self, key: &CacheKey) -> bool {
    self.lock().entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Tags currently provided by an entry.
  pub fn tags_of(&self, key: &CacheKey) -> Vec<Tag> {
    self.lock().tags.tags_of(key).to_vec()
  }

  /// Create the entry if needed and apply the owning endpoint's options.
  pub fn ensure(&self, key: &CacheKey, options: EntryOptions) -> CacheEntry {
    let mut inner = self.lock();
    let slot = inner
      .entries
      .entry(key.clone())
      .or_insert_with(|| Slot::new(options));
    slot.options = options;
    slot.entry.clone()
  }

  /// Install the closure used to refetch an entry after invalidation.
  pub fn set_refetcher(&self, key: &CacheKey, refetcher: Refetcher) {
    if let Some(slot) = self.lock().entries.get_mut(key) {
      slot.refetcher = Some(refetcher);
    }
  }

  /// Start (or join) a request for `key`.
  ///
  /// Requests with the same key and the same full arguments share one
  /// in-flight future; `fetcher` is only invoked when nothing is in flight.
  /// On completion `reducer` combines the entry's current data with the
  /// response; its result becomes the entry's data and tags.
  ///
  /// The request runs in its own task: dropping the returned future does
  /// not cancel it.
  pub fn fetch<F, Fut, R>(
    &self,
    key: &CacheKey,
    request_args: Value,
    options: EntryOptions,
    fetcher: F,
    reducer: R,
  ) -> SharedFetch
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    R: FnOnce(Option<Value>, Value) -> ApiResult<Settled> + Send + 'static,
  {
    let request_id = format!("{}|{}", key.digest(), canonical_string(&request_args));

    let (seq, tx, shared) = {
      let mut guard = self.lock();
      let inner = &mut *guard;

      if let Some(existing) = inner.inflight.get(&request_id) {
        debug!(store = self.name(), key = %key, "joining in-flight request");
        return existing.shared.clone();
      }

      inner.next_seq += 1;
      let seq = inner.next_seq;

      let slot = inner
        .entries
        .entry(key.clone())
        .or_insert_with(|| Slot::new(options));
      slot.options.blocking = options.blocking;
      slot.pending.insert(seq);
      slot.eviction_generation += 1;
      slot.entry.status = Status::Pending;
      slot.publish();

      let (tx, rx) = oneshot::channel::<ApiResult<Value>>();
      let shared = rx
        .map(|received| {
          received.unwrap_or_else(|_| Err(ApiError::network("request task ended without a result")))
        })
        .boxed()
        .shared();
      inner.inflight.insert(
        request_id.clone(),
        InFlight {
          seq,
          shared: shared.clone(),
        },
      );

      (seq, tx, shared)
    };

    debug!(store = self.name(), key = %key, seq, "request started");
    self.notify_listeners();

    let request = fetcher();
    let store = self.clone();
    let key = key.clone();
    tokio::spawn(async move {
      let result = request.await;
      let outcome = store.complete(&key, &request_id, seq, request_args, result, reducer);
      // Every waiter may be gone already
      let _ = tx.send(outcome);
    });

    shared
  }

  fn complete<R>(
    &self,
    key: &CacheKey,
    request_id: &str,
    seq: u64,
    request_args: Value,
    result: ApiResult<Value>,
    reducer: R,
  ) -> ApiResult<Value>
  where
    R: FnOnce(Option<Value>, Value) -> ApiResult<Settled>,
  {
    let (outcome, eviction) = {
      let mut guard = self.lock();
      let inner = &mut *guard;
      // A newer identical request may own the slot since a reset
      if inner.inflight.get(request_id).is_some_and(|running| running.seq == seq) {
        inner.inflight.remove(request_id);
      }

      let Some(slot) = inner
        .entries
        .get_mut(key)
        .filter(|slot| slot.pending.contains(&seq))
      else {
        debug!(store = self.name(), key = %key, seq, "entry evicted or reset, discarding result");
        return result.and_then(|incoming| reducer(None, incoming).map(|settled| settled.data));
      };
      slot.pending.remove(&seq);

      let outcome = if seq < slot.applied_seq {
        debug!(
          store = self.name(),
          key = %key,
          seq,
          applied = slot.applied_seq,
          "discarding out-of-order completion"
        );
        match (result, &slot.entry.data) {
          (Ok(_), Some(current)) => Ok(current.clone()),
          (Ok(incoming), None) => reducer(None, incoming).map(|settled| settled.data),
          (Err(err), _) => Err(err),
        }
      } else {
        slot.applied_seq = seq;
        match result.and_then(|incoming| reducer(slot.entry.data.clone(), incoming)) {
          Ok(Settled { data, tags }) => {
            trace!(store = self.name(), key = %key, seq, tags = ?tags, "request fulfilled");
            slot.entry.data = Some(data.clone());
            slot.entry.error = None;
            slot.entry.fetched_at = Some(Utc::now());
            slot.entry.stale = false;
            slot.entry.last_args = Some(request_args);
            inner.tags.provide(key, &tags);
            Ok(data)
          }
          Err(err) => {
            warn!(store = self.name(), key = %key, seq, error = %err, "request rejected");
            slot.entry.error = Some(err.clone());
            Err(err)
          }
        }
      };

      slot.settle_status();
      slot.publish();

      let eviction = if slot.entry.subscribers == 0 && slot.pending.is_empty() {
        slot.eviction_generation += 1;
        Some((slot.eviction_generation, slot.options.keep_unused_for))
      } else {
        None
      };

      (outcome, eviction)
    };

    self.notify_listeners();
    if let Some((generation, after)) = eviction {
      self.schedule_eviction(key.clone(), generation, after);
    }
    outcome
  }

  /// Subscribe to an entry, creating it when needed. Dropping the returned
  /// [`Subscription`] unsubscribes.
  pub fn subscribe(&self, key: &CacheKey, options: EntryOptions) -> Subscription {
    let receiver = {
      let mut inner = self.lock();
      let slot = inner
        .entries
        .entry(key.clone())
        .or_insert_with(|| Slot::new(options));
      slot.entry.subscribers += 1;
      slot.eviction_generation += 1;
      slot.publish();
      slot.notifier.subscribe()
    };

    trace!(store = self.name(), key = %key, "subscribed");
    Subscription {
      store: self.clone(),
      key: key.clone(),
      receiver,
    }
  }

  fn release(&self, key: &CacheKey) {
    let eviction = {
      let mut inner = self.lock();
      let Some(slot) = inner.entries.get_mut(key) else {
        return;
      };
      slot.entry.subscribers = slot.entry.subscribers.saturating_sub(1);
      slot.publish();
      if slot.entry.subscribers == 0 {
        slot.eviction_generation += 1;
        Some((slot.eviction_generation, slot.options.keep_unused_for))
      } else {
        None
      }
    };

    trace!(store = self.name(), key = %key, "unsubscribed");
    if let Some((generation, after)) = eviction {
      self.schedule_eviction(key.clone(), generation, after);
    }
  }

  fn schedule_eviction(&self, key: CacheKey, generation: u64, after: Duration) {
    if after.is_zero() {
      self.evict_if_unused(&key, generation);
      return;
    }

    match tokio::runtime::Handle::try_current() {
      Ok(handle) => {
        let store = self.clone();
        handle.spawn(async move {
          tokio::time::sleep(after).await;
          store.evict_if_unused(&key, generation);
        });
      }
      Err(_) => self.evict_if_unused(&key, generation),
    }
  }

  fn evict_if_unused(&self, key: &CacheKey, generation: u64) {
    let was_pending = {
      let mut guard = self.lock();
      let inner = &mut *guard;
      match inner.entries.get(key) {
        Some(slot) if slot.entry.subscribers == 0 && slot.eviction_generation == generation => {
          let was_pending = !slot.pending.is_empty();
          // Later identical requests must not join results that will be dropped
          let orphaned = slot.pending.clone();
          inner.inflight.retain(|_, running| !orphaned.contains(&running.seq));
          inner.entries.remove(key);
          inner.tags.remove(key);
          debug!(store = self.name(), key = %key, "entry evicted");
          was_pending
        }
        _ => return,
      }
    };

    if was_pending {
      self.notify_listeners();
    }
  }

  /// Mark every entry providing one of `tags` as stale.
  ///
  /// Returns the refetchers of the entries that currently have subscribers;
  /// unsubscribed entries refetch on their next query or subscription.
  pub fn invalidate(&self, tags: &[Tag]) -> Vec<Refetcher> {
    if tags.is_empty() {
      return Vec::new();
    }

    let mut guard = self.lock();
    let inner = &mut *guard;
    let keys = inner.tags.matching(tags);

    let mut refetchers = Vec::new();
    for key in &keys {
      let Some(slot) = inner.entries.get_mut(key) else {
        continue;
      };
      slot.entry.stale = true;
      slot.publish();
      if slot.entry.subscribers > 0 {
        if let Some(refetcher) = &slot.refetcher {
          refetchers.push(Arc::clone(refetcher));
        }
      }
    }

    debug!(
      store = self.name(),
      tags = ?tags,
      stale = keys.len(),
      refetching = refetchers.len(),
      "tags invalidated"
    );
    refetchers
  }

  /// Record a running mutation until the guard is dropped.
  pub fn begin_mutation(&self, name: &'static str, blocking: bool) -> MutationGuard {
    let id = {
      let mut inner = self.lock();
      let id = inner.next_mutation;
      inner.next_mutation += 1;
      inner.mutations.insert(id, MutationRecord { name, blocking });
      id
    };

    debug!(store = self.name(), mutation = name, blocking, "mutation started");
    self.notify_listeners();
    MutationGuard {
      store: self.clone(),
      id,
    }
  }

  fn end_mutation(&self, id: u64) {
    let removed = self.lock().mutations.remove(&id);
    if let Some(record) = removed {
      debug!(store = self.name(), mutation = record.name, "mutation finished");
      self.notify_listeners();
    }
  }

  pub fn pending_mutations(&self) -> usize {
    self.lock().mutations.len()
  }

  /// Whether any blocking request or mutation is in flight, ignoring
  /// endpoints listed in `excluded`.
  pub fn has_blocking_activity(&self, excluded: &BTreeSet<String>) -> bool {
    let inner = self.lock();

    let queries = inner.entries.iter().any(|(key, slot)| {
      !slot.pending.is_empty() && slot.options.blocking && !excluded.contains(key.endpoint())
    });
    if queries {
      return true;
    }

    inner
      .mutations
      .values()
      .any(|m| m.blocking && !excluded.contains(m.name))
  }

  /// Register a callback run after every status transition.
  pub fn add_listener(&self, listener: StatusListener) {
    self
      .shared
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(listener);
  }

  fn notify_listeners(&self) {
    let listeners = self
      .shared
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();
    for listener in listeners {
      listener();
    }
  }

  /// Drop every cached result.
  ///
  /// Subscribed entries survive as idle entries so their subscribers keep
  /// receiving updates; completions of requests started before the reset
  /// are discarded.
  pub fn reset(&self) {
    {
      let mut guard = self.lock();
      let inner = &mut *guard;
      inner.entries.retain(|_, slot| slot.entry.subscribers > 0);
      for slot in inner.entries.values_mut() {
        let subscribers = slot.entry.subscribers;
        slot.entry = CacheEntry {
          subscribers,
          ..CacheEntry::default()
        };
        slot.pending.clear();
        slot.publish();
      }
      inner.inflight.clear();
      inner.tags.clear();
    }

    debug!(store = self.name(), "store reset");
    self.notify_listeners();
  }
}

/// Live subscription to one cache entry.
pub struct Subscription {
  store: ResourceStore,
  key: CacheKey,
  receiver: watch::Receiver<CacheEntry>,
}

impl Subscription {
  pub fn key(&self) -> &CacheKey {
    &self.key
  }

  /// Latest snapshot without marking it seen.
  pub fn current(&self) -> CacheEntry {
    self.receiver.borrow().clone()
  }

  /// Whether the entry changed since the last `take`.
  pub fn has_changed(&self) -> bool {
    self.receiver.has_changed().unwrap_or(false)
  }

  /// Latest snapshot, marking it seen.
  pub fn take(&mut self) -> CacheEntry {
    self.receiver.borrow_and_update().clone()
  }

  /// Wait for the next change.
  pub async fn changed(&mut self) -> Option<CacheEntry> {
    self.receiver.changed().await.ok()?;
    Some(self.take())
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.store.release(&self.key);
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("store", &self.store.name())
      .field("key", &self.key)
      .finish_non_exhaustive()
  }
}

/// Marks a mutation as running while alive.
pub struct MutationGuard {
  store: ResourceStore,
  id: u64,
}

impl Drop for MutationGuard {
  fn drop(&mut self) {
    self.store.end_mutation(self.id);
  }
}
