//! Global "is anything loading" flag.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::debug;

use crate::cache::ResourceStore;

struct ActivityInner {
  excluded: BTreeSet<String>,
  stores: Mutex<Vec<ResourceStore>>,
  flag: watch::Sender<bool>,
}

impl ActivityInner {
  fn recompute(&self) {
    // Computed under the channel lock so concurrent recomputes cannot
    // publish out of order
    self.flag.send_if_modified(|current| {
      let stores = self
        .stores
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
      let loading = stores
        .iter()
        .any(|store| store.has_blocking_activity(&self.excluded));
      if *current == loading {
        return false;
      }
      debug!(loading, "activity flag changed");
      *current = loading;
      true
    });
  }
}

/// Aggregates in-flight work across every registered resource store.
#[derive(Clone)]
pub struct ActivityAggregator {
  inner: Arc<ActivityInner>,
}

impl ActivityAggregator {
  /// `excluded` lists endpoint names that never count as loading.
  pub fn new(excluded: impl IntoIterator<Item = String>) -> Self {
    let (flag, _) = watch::channel(false);
    Self {
      inner: Arc::new(ActivityInner {
        excluded: excluded.into_iter().collect(),
        stores: Mutex::new(Vec::new()),
        flag,
      }),
    }
  }

  /// Start tracking a store. The flag is recomputed on each of its status
  /// transitions.
  pub fn register(&self, store: &ResourceStore) {
    self
      .inner
      .stores
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(store.clone());

    let weak = Arc::downgrade(&self.inner);
    store.add_listener(Arc::new(move || {
      if let Some(inner) = weak.upgrade() {
        inner.recompute();
      }
    }));

    debug!(store = store.name(), "store registered for activity tracking");
    self.inner.recompute();
  }

  pub fn is_any_loading(&self) -> bool {
    *self.inner.flag.borrow()
  }

  /// Receiver that only wakes when the flag flips.
  pub fn watch(&self) -> watch::Receiver<bool> {
    self.inner.flag.subscribe()
  }

  pub fn excluded(&self) -> &BTreeSet<String> {
    &self.inner.excluded
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheKey, EntryOptions, Settled, StoreConfig};
  use serde_json::json;
  use std::time::Duration;

  fn aggregator() -> (ActivityAggregator, ResourceStore) {
    let activity = ActivityAggregator::new(["saveWatchProgress".to_string()]);
    let store = ResourceStore::new("api", StoreConfig::default());
    activity.register(&store);
    (activity, store)
  }

  #[tokio::test]
  async fn test_excluded_mutation_does_not_flip() {
    let (activity, store) = aggregator();
    let mut rx = activity.watch();

    let heartbeat = store.begin_mutation("saveWatchProgress", true);
    assert!(!activity.is_any_loading());
    assert!(!rx.has_changed().unwrap());

    let write = store.begin_mutation("createComment", true);
    assert!(activity.is_any_loading());
    assert!(rx.has_changed().unwrap());
    rx.borrow_and_update();

    drop(write);
    assert!(!activity.is_any_loading());
    drop(heartbeat);
    assert!(rx.has_changed().unwrap());
  }

  #[tokio::test]
  async fn test_pending_query_counts_until_settled() {
    let (activity, store) = aggregator();
    let key = CacheKey::from_value("searchReviews", &json!({"keyword": "x"}));

    let pending = store.fetch(
      &key,
      json!({}),
      EntryOptions::default(),
      || async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(json!([]))
      },
      Settled::replace,
    );
    assert!(activity.is_any_loading());

    pending.await.unwrap();
    assert!(!activity.is_any_loading());
  }

  #[tokio::test]
  async fn test_non_blocking_query_is_ignored() {
    let (activity, store) = aggregator();
    let key = CacheKey::from_value("prefetchComments", &json!({}));
    let options = EntryOptions {
      blocking: false,
      ..EntryOptions::default()
    };

    let pending = store.fetch(&key, json!({}), options, || async { Ok(json!(1)) }, Settled::replace);
    assert!(!activity.is_any_loading());
    pending.await.unwrap();
  }

  #[tokio::test]
  async fn test_any_registered_store_counts() {
    let activity = ActivityAggregator::new(Vec::new());
    let first = ResourceStore::new("catalog", StoreConfig::default());
    let second = ResourceStore::new("admin", StoreConfig::default());
    activity.register(&first);
    activity.register(&second);

    let guard = second.begin_mutation("updateUserStatus", true);
    assert!(activity.is_any_loading());
    drop(guard);
    assert!(!activity.is_any_loading());
  }
}
