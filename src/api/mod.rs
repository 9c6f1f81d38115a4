//! Backend endpoints and the client that runs them through the resource
//! store.

pub mod comments;
mod endpoint;
mod envelope;
#[cfg(test)]
pub(crate) mod fake;
pub mod reviews;
mod transport;
pub mod types;
pub mod users;
pub mod watch;

pub use endpoint::{ApiRequest, MutationEndpoint, QueryEndpoint};
pub use envelope::{decode, unwrap_data, UNSPECIFIED_CODE};
pub use transport::{HttpTransport, Transport};

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

use crate::cache::{CacheKey, EntryOptions, Refetcher, ResourceStore, Settled, Subscription, Tag};
use crate::error::{ApiError, ApiResult};

struct ApiInner {
  transport: Arc<dyn Transport>,
  store: ResourceStore,
}

/// Runs endpoint declarations against a transport, caching query results
/// in a resource store.
#[derive(Clone)]
pub struct Api {
  inner: Arc<ApiInner>,
}

impl Api {
  pub fn new(transport: Arc<dyn Transport>, store: ResourceStore) -> Self {
    Self {
      inner: Arc::new(ApiInner { transport, store }),
    }
  }

  pub fn store(&self) -> &ResourceStore {
    &self.inner.store
  }

  pub fn cache_key<E: QueryEndpoint>(args: &E::Args) -> ApiResult<CacheKey> {
    let value = E::cache_args(args).map_err(ApiError::malformed)?;
    Ok(CacheKey::from_value(E::NAME, &value))
  }

  fn options<E: QueryEndpoint>(&self) -> EntryOptions {
    EntryOptions {
      keep_unused_for: E::KEEP_UNUSED_FOR.unwrap_or(self.inner.store.config().keep_unused_for),
      blocking: E::BLOCKING,
    }
  }

  /// Read through the cache.
  ///
  /// A fulfilled entry is served as-is unless it is stale, older than the
  /// configured age limit, or the endpoint asks for a refetch (a different
  /// page of an accumulating list). A stale entry refetches with the
  /// endpoint's refetch arguments.
  pub async fn query<E: QueryEndpoint>(&self, args: E::Args) -> ApiResult<E::Output> {
    let key = Self::cache_key::<E>(&args)?;
    let entry = self.inner.store.ensure(&key, self.options::<E>());
    self.install_refetcher::<E>(&key);

    let previous: Option<E::Args> = entry
      .last_args
      .clone()
      .and_then(|value| serde_json::from_value(value).ok());
    let expired = self
      .inner
      .store
      .config()
      .stale_after
      .is_some_and(|max_age| entry.is_older_than(max_age));

    if entry.is_fulfilled() && !entry.stale && !expired && !E::force_refetch(&args, previous.as_ref()) {
      if let Some(output) = entry.decode::<E::Output>()? {
        trace!(endpoint = E::NAME, key = %key, "served from cache");
        return Ok(output);
      }
    }

    let args = if entry.stale { E::refetch_args(args) } else { args };
    let value = self.start::<E>(&key, args)?.await?;
    decode(value)
  }

  /// Fetch bypassing the cached result.
  pub async fn refetch<E: QueryEndpoint>(&self, args: E::Args) -> ApiResult<E::Output> {
    let key = Self::cache_key::<E>(&args)?;
    self.inner.store.ensure(&key, self.options::<E>());
    self.install_refetcher::<E>(&key);
    let value = self.start::<E>(&key, args)?.await?;
    decode(value)
  }

  /// Subscribe to the entry `args` map to. The entry is kept alive and
  /// refetched on invalidation while the subscription lives. An entry
  /// invalidated while nobody watched it is refetched here.
  pub fn subscribe<E: QueryEndpoint>(&self, args: &E::Args) -> ApiResult<Subscription> {
    let key = Self::cache_key::<E>(args)?;
    let subscription = self.inner.store.subscribe(&key, self.options::<E>());
    self.install_refetcher::<E>(&key);

    let entry = subscription.current();
    if entry.stale && !entry.is_pending() {
      debug!(endpoint = E::NAME, key = %key, "refetching stale entry on subscribe");
      tokio::spawn(self.restart::<E>(&key));
    }
    Ok(subscription)
  }

  fn start<E: QueryEndpoint>(
    &self,
    key: &CacheKey,
    args: E::Args,
  ) -> ApiResult<crate::cache::SharedFetch> {
    let request_args = serde_json::to_value(&args).map_err(ApiError::malformed)?;
    let request = E::request(&args)?;
    debug!(endpoint = E::NAME, request = %request, "query issued");

    let transport = Arc::clone(&self.inner.transport);
    let fetcher = move || async move {
      let raw = transport.execute(request).await?;
      unwrap_data(raw)
    };

    let reducer = move |existing: Option<Value>, incoming: Value| -> ApiResult<Settled> {
      let response: E::Response = decode(incoming)?;
      let incoming = E::transform(response);
      let existing = existing.and_then(|value| serde_json::from_value::<E::Output>(value).ok());
      let merged = E::merge(existing, incoming, &args);
      let tags = E::provides_tags(&args, &merged);
      let data = serde_json::to_value(&merged).map_err(ApiError::malformed)?;
      Ok(Settled { data, tags })
    };

    Ok(
      self
        .inner
        .store
        .fetch(key, request_args, self.options::<E>(), fetcher, reducer),
    )
  }

  fn install_refetcher<E: QueryEndpoint>(&self, key: &CacheKey) {
    let api: Weak<ApiInner> = Arc::downgrade(&self.inner);
    let target = key.clone();

    let refetcher: Refetcher = Arc::new(move || match api.upgrade() {
      Some(inner) => Api { inner }.restart::<E>(&target),
      None => async {}.boxed(),
    });

    self.inner.store.set_refetcher(key, refetcher);
  }

  /// Re-issue the last applied request of an entry with the endpoint's
  /// refetch arguments. The request is started before this returns.
  fn restart<E: QueryEndpoint>(&self, key: &CacheKey) -> BoxFuture<'static, ()> {
    let last_args = self.inner.store.get(key).last_args;
    let Some(args) = last_args.and_then(|value| serde_json::from_value::<E::Args>(value).ok()) else {
      debug!(endpoint = E::NAME, key = %key, "nothing to refetch yet");
      return async {}.boxed();
    };

    match self.start::<E>(key, E::refetch_args(args)) {
      Ok(pending) => {
        let key = key.clone();
        async move {
          if let Err(err) = pending.await {
            warn!(endpoint = E::NAME, key = %key, error = %err, "refetch of stale entry failed");
          }
        }
        .boxed()
      }
      Err(err) => {
        warn!(endpoint = E::NAME, key = %key, error = %err, "could not refetch");
        async {}.boxed()
      }
    }
  }

  /// Run a mutation, then invalidate the tags it declares.
  pub async fn mutate<M: MutationEndpoint>(&self, args: M::Args) -> ApiResult<M::Output> {
    let _running = self.inner.store.begin_mutation(M::NAME, M::BLOCKING);
    let request = M::request(&args)?;
    debug!(mutation = M::NAME, request = %request, "mutation issued");

    let raw = self.inner.transport.execute(request).await?;
    let output: M::Output = decode(unwrap_data(raw)?)?;

    let tags = M::invalidates_tags(&args, &output);
    self.invalidate(&tags);
    Ok(output)
  }

  /// Mark entries stale and refetch the subscribed ones. Returns the number
  /// of refetches started.
  pub fn invalidate(&self, tags: &[Tag]) -> usize {
    let refetchers = self.inner.store.invalidate(tags);
    let started = refetchers.len();
    for refetch in refetchers {
      tokio::spawn(refetch());
    }
    started
  }
}
