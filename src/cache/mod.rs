//! Resource cache for request results.
//!
//! This module provides an endpoint-agnostic cache that:
//! - Keys entries by endpoint name + canonical arguments
//! - De-duplicates identical in-flight requests
//! - Merges pages of accumulating lists
//! - Links entries to invalidation tags
//! - Evicts entries nobody has used for a while

mod entry;
mod key;
pub mod paginate;
mod store;
mod tags;

pub use entry::{CacheEntry, EntryOptions, Status};
pub use key::{canonical_string, canonicalize, CacheKey};
pub use paginate::{Identified, PageRequest, PageResponse, Paginated};
pub use store::{
  MutationGuard, Refetcher, ResourceStore, Settled, SharedFetch, StatusListener, StoreConfig,
  Subscription,
};
pub use tags::{Tag, TagGraph};
