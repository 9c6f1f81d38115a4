//! Consumer-side handle on one cached query.
//!
//! Inspired by TanStack Query, a `Query<E>` subscribes to the cache entry of
//! an endpoint, starts fetches on background tasks and exposes the entry's
//! loading state and last good data to the render loop.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::<ListMovieComments>::new(api.clone(), args);
//!
//! // Start fetching
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // Entry changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success => render_data(query.data()),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{Api, QueryEndpoint};
use crate::cache::{CacheEntry, CacheKey, Status, Subscription};
use crate::error::{ApiError, ApiResult};

/// The state of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
  /// Query has not been started
  Idle,
  /// A request for the entry is in flight
  Loading,
  /// Last request succeeded
  Success,
  /// Last request failed. Previously loaded data stays available.
  Error(ApiError),
}

impl QueryState {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// Subscription to one endpoint's cache entry with fetch helpers.
///
/// Dropping the query unsubscribes; requests it started keep running and
/// still land in the cache.
pub struct Query<E: QueryEndpoint> {
  api: Api,
  args: E::Args,
  key: Option<CacheKey>,
  subscription: Option<Subscription>,
  entry: CacheEntry,
  data: Option<E::Output>,
  failure: Option<ApiError>,
  sender: mpsc::UnboundedSender<ApiResult<E::Output>>,
  receiver: mpsc::UnboundedReceiver<ApiResult<E::Output>>,
}

impl<E: QueryEndpoint> Query<E> {
  /// Subscribe to the entry for `args`. Nothing is fetched until `fetch()`.
  pub fn new(api: Api, args: E::Args) -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    let mut query = Self {
      api,
      args,
      key: None,
      subscription: None,
      entry: CacheEntry::default(),
      data: None,
      failure: None,
      sender,
      receiver,
    };
    query.resubscribe();
    query
  }

  fn resubscribe(&mut self) {
    self.subscription = None;
    self.failure = None;
    match Api::cache_key::<E>(&self.args).and_then(|key| {
      let subscription = self.api.subscribe::<E>(&self.args)?;
      Ok((key, subscription))
    }) {
      Ok((key, mut subscription)) => {
        self.key = Some(key);
        self.apply(subscription.take());
        self.subscription = Some(subscription);
      }
      Err(err) => {
        self.key = None;
        self.entry = CacheEntry::default();
        self.data = None;
        self.failure = Some(err);
      }
    }
  }

  fn apply(&mut self, entry: CacheEntry) {
    match entry.decode::<E::Output>() {
      Ok(data) => {
        self.data = data;
        self.failure = None;
      }
      Err(err) => self.failure = Some(err),
    }
    self.entry = entry;
  }

  pub fn args(&self) -> &E::Args {
    &self.args
  }

  pub fn key(&self) -> Option<&CacheKey> {
    self.key.as_ref()
  }

  /// Snapshot of the underlying cache entry.
  pub fn entry(&self) -> &CacheEntry {
    &self.entry
  }

  pub fn state(&self) -> QueryState {
    if let Some(err) = &self.failure {
      return QueryState::Error(err.clone());
    }
    match self.entry.status {
      Status::Idle => QueryState::Idle,
      Status::Pending => QueryState::Loading,
      Status::Fulfilled => QueryState::Success,
      Status::Rejected => QueryState::Error(
        self
          .entry
          .error
          .clone()
          .unwrap_or_else(|| ApiError::network("request failed")),
      ),
    }
  }

  /// Last good data, kept when a later request fails.
  pub fn data(&self) -> Option<&E::Output> {
    self.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.failure.is_none() && self.entry.is_pending()
  }

  pub fn is_success(&self) -> bool {
    self.state().is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state().is_error()
  }

  pub fn error(&self) -> Option<ApiError> {
    self.state().error().cloned()
  }

  /// Read through the cache with the current arguments.
  pub fn fetch(&mut self) {
    let api = self.api.clone();
    let args = self.args.clone();
    self.spawn(async move { api.query::<E>(args).await });
  }

  /// Refetch from scratch, ignoring the cached result. Accumulating lists
  /// restart from their first page.
  pub fn refetch(&mut self) {
    self.args = E::refetch_args(self.args.clone());
    let api = self.api.clone();
    let args = self.args.clone();
    self.spawn(async move { api.refetch::<E>(args).await });
  }

  /// Switch to new arguments and fetch.
  ///
  /// A different cache key moves the subscription to the new entry; the
  /// same key (another page of an accumulating list) keeps it and lets the
  /// endpoint's refetch rule decide.
  pub fn set_args(&mut self, args: E::Args) {
    let same_key = match (Api::cache_key::<E>(&args), &self.key) {
      (Ok(next), Some(current)) => next == *current,
      _ => false,
    };
    self.args = args;
    if !same_key {
      debug!(endpoint = E::NAME, "query arguments moved to another entry");
      self.resubscribe();
    }
    self.fetch();
  }

  fn spawn<F>(&mut self, request: F)
  where
    F: std::future::Future<Output = ApiResult<E::Output>> + Send + 'static,
  {
    if self.subscription.is_none() {
      return;
    }
    self.failure = None;
    let tx = self.sender.clone();
    tokio::spawn(async move {
      // Ignore send errors - the query may have been dropped
      let _ = tx.send(request.await);
    });
  }

  /// Pick up entry changes and finished requests.
  ///
  /// Returns `true` if anything changed. Call this in your event loop tick
  /// handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    let next = match self.subscription.as_mut() {
      Some(subscription) if subscription.has_changed() => Some(subscription.take()),
      _ => None,
    };
    if let Some(entry) = next {
      self.apply(entry);
      changed = true;
    }

    while let Ok(result) = self.receiver.try_recv() {
      let Err(err) = result else {
        continue;
      };
      // Request failures are already on the entry; keep the ones that
      // never reached it
      if self.entry.error.as_ref() != Some(&err) && !self.entry.is_fulfilled() {
        self.failure = Some(err);
        changed = true;
      }
    }

    changed
  }
}

impl<E: QueryEndpoint> std::fmt::Debug for Query<E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("endpoint", &E::NAME)
      .field("key", &self.key)
      .field("status", &self.entry.status)
      .field("failure", &self.failure)
      .finish_non_exhaustive()
  }
}
