//! Data layer of the marquee front end: a keyed request cache with in-flight
//! de-duplication, page merging and tag invalidation, plus the global
//! loading flag and error surface built on top of it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod query;
pub mod state;

pub use api::Api;
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use query::{Query, QueryState};
pub use state::ApplicationState;
