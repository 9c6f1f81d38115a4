//! Process-wide application state: resource stores, activity flag, error
//! surface and auth. Built once with [`ApplicationState::init`] and passed
//! around explicitly.

mod activity;
mod auth;
mod error_surface;

pub use activity::ActivityAggregator;
pub use auth::{AuthSlice, AuthState, Role, SessionUser};
pub use error_surface::{ErrorState, ErrorSurface, DEFAULT_TITLE};

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::{ResourceStore, StoreConfig};
use crate::config::Config;

/// Everything an observer can select from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSnapshot {
  pub loading: bool,
  pub error: ErrorState,
  pub auth: AuthState,
}

#[derive(Clone)]
pub struct ApplicationState {
  store: ResourceStore,
  groups: Arc<Mutex<Vec<ResourceStore>>>,
  activity: ActivityAggregator,
  errors: ErrorSurface,
  auth: AuthSlice,
}

impl ApplicationState {
  pub fn init(config: &Config) -> Self {
    let store = ResourceStore::new("api", config.cache.store_config());
    let activity = ActivityAggregator::new(config.activity.exclude.iter().cloned());
    activity.register(&store);

    info!(
      keep_unused_for_secs = config.cache.keep_unused_for_secs,
      excluded = ?activity.excluded(),
      "application state initialized"
    );

    Self {
      store,
      groups: Arc::new(Mutex::new(Vec::new())),
      activity,
      errors: ErrorSurface::new(),
      auth: AuthSlice::new(),
    }
  }

  /// The main resource store.
  pub fn store(&self) -> &ResourceStore {
    &self.store
  }

  pub fn activity(&self) -> &ActivityAggregator {
    &self.activity
  }

  pub fn errors(&self) -> &ErrorSurface {
    &self.errors
  }

  pub fn auth(&self) -> &AuthSlice {
    &self.auth
  }

  /// Create an additional resource store tracked by the activity flag.
  pub fn register_group(&self, name: &'static str, config: StoreConfig) -> ResourceStore {
    let store = ResourceStore::new(name, config);
    self.activity.register(&store);
    self
      .groups
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(store.clone());
    store
  }

  /// Sign out and drop every cached result of the previous user.
  pub fn sign_out(&self) {
    self.auth.sign_out();
    self.store.reset();
    let groups = self
      .groups
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();
    for group in groups {
      group.reset();
    }
  }

  pub fn snapshot(&self) -> AppSnapshot {
    AppSnapshot {
      loading: self.activity.is_any_loading(),
      error: self.errors.current(),
      auth: self.auth.current(),
    }
  }

  /// Call `callback` whenever the value picked by `selector` changes.
  ///
  /// Must be called from within a tokio runtime. The callback runs on a
  /// background task until the returned [`Observer`] is dropped.
  pub fn observe<T, S, C>(&self, selector: S, mut callback: C) -> Observer
  where
    T: PartialEq + Send + 'static,
    S: Fn(&AppSnapshot) -> T + Send + 'static,
    C: FnMut(&T) + Send + 'static,
  {
    let mut loading = self.activity.watch();
    let mut errors = self.errors.watch();
    let mut auth = self.auth.watch();
    let mut last = selector(&read(&mut loading, &mut errors, &mut auth));

    let task = tokio::spawn(async move {
      loop {
        let open = tokio::select! {
          changed = loading.changed() => changed.is_ok(),
          changed = errors.changed() => changed.is_ok(),
          changed = auth.changed() => changed.is_ok(),
        };
        if !open {
          break;
        }

        let next = selector(&read(&mut loading, &mut errors, &mut auth));
        if next != last {
          callback(&next);
          last = next;
        }
      }
    });

    Observer { task }
  }
}

fn read(
  loading: &mut watch::Receiver<bool>,
  errors: &mut watch::Receiver<ErrorState>,
  auth: &mut watch::Receiver<AuthState>,
) -> AppSnapshot {
  AppSnapshot {
    loading: *loading.borrow_and_update(),
    error: errors.borrow_and_update().clone(),
    auth: auth.borrow_and_update().clone(),
  }
}

/// Handle of a running [`ApplicationState::observe`] callback.
pub struct Observer {
  task: JoinHandle<()>,
}

impl Observer {
  pub fn unsubscribe(self) {}
}

impl Drop for Observer {
  fn drop(&mut self) {
    self.task.abort();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheKey, EntryOptions, Settled};
  use serde_json::json;
  use std::time::Duration;
  use tokio::sync::mpsc;

  fn config() -> Config {
    Config::parse(
      "backend:\n  url: http://localhost/\nactivity:\n  exclude: [saveWatchProgress]\n",
    )
    .unwrap()
  }

  async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Option<T> {
    tokio::time::timeout(Duration::from_millis(200), rx.recv())
      .await
      .ok()
      .flatten()
  }

  #[tokio::test]
  async fn test_observer_fires_on_change_only() {
    let state = ApplicationState::init(&config());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _observer = state.observe(
      |snapshot| snapshot.error.is_open,
      move |open| {
        let _ = tx.send(*open);
      },
    );

    state.errors().show("first", None, None);
    assert_eq!(next(&mut rx).await, Some(true));

    // Still open: overwriting the message is not a change of the selection
    state.errors().show("second", None, None);
    state.errors().hide();
    assert_eq!(next(&mut rx).await, Some(false));
  }

  #[tokio::test]
  async fn test_unsubscribe_stops_callbacks() {
    let state = ApplicationState::init(&config());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let observer = state.observe(
      |snapshot| snapshot.loading,
      move |loading| {
        let _ = tx.send(*loading);
      },
    );
    observer.unsubscribe();

    let _guard = state.store().begin_mutation("createComment", true);
    assert!(state.activity().is_any_loading());
    assert_eq!(next(&mut rx).await, None);
  }

  #[tokio::test]
  async fn test_registered_group_counts_towards_loading() {
    let state = ApplicationState::init(&config());
    let admin = state.register_group("admin", StoreConfig::default());

    let guard = admin.begin_mutation("updateUserStatus", true);
    assert!(state.snapshot().loading);
    drop(guard);

    let excluded = admin.begin_mutation("saveWatchProgress", true);
    assert!(!state.snapshot().loading);
    drop(excluded);
  }

  #[tokio::test]
  async fn test_sign_out_drops_cached_data() {
    let state = ApplicationState::init(&config());
    state.auth().sign_in(SessionUser {
      id: "u1".to_string(),
      username: "ada".to_string(),
      role: Role::User,
    });

    let key = CacheKey::from_value("getUserProfile", &json!({}));
    state
      .store()
      .fetch(&key, json!({}), EntryOptions::default(), || async { Ok(json!({"id": "u1"})) }, Settled::replace)
      .await
      .unwrap();
    assert!(state.store().contains(&key));

    state.sign_out();
    assert!(!state.auth().current().is_authenticated);
    assert!(!state.store().contains(&key));
  }

  #[tokio::test]
  async fn test_sign_out_during_fetch_keeps_later_request_loading() {
    let state = ApplicationState::init(&config());
    let key = CacheKey::from_value("getUserProfile", &json!({}));
    let _watching = state.store().subscribe(&key, EntryOptions::default());

    let previous_user = state.store().fetch(
      &key,
      json!({}),
      EntryOptions::default(),
      || async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(json!({"id": "u1"}))
      },
      Settled::replace,
    );
    state.sign_out();

    let next_user = state.store().fetch(
      &key,
      json!({}),
      EntryOptions::default(),
      || async {
        tokio::time::sleep(Duration::from_millis(80)).await;
        Ok(json!({"id": "u2"}))
      },
      Settled::replace,
    );

    previous_user.await.unwrap();
    assert!(state.store().get(&key).is_pending());
    assert_eq!(state.store().get(&key).data, None);
    assert!(state.activity().is_any_loading());

    assert_eq!(next_user.await.unwrap(), json!({"id": "u2"}));
    assert_eq!(state.store().get(&key).data, Some(json!({"id": "u2"})));
    assert!(!state.activity().is_any_loading());
  }
}
