//! Client-side data layer for a project and task tracker: HTTP transport with
//! interceptors, a reactive aggregation store, list views and optimistic
//! mutations.

pub mod api;
pub mod config;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;
pub mod views;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, CollectionQuery, TrackerApi};
pub use store::{AggregationStore, FetchOutcome, MutationOutcome, StoreSnapshot};
pub use transport::{DataError, DataErrorKind, HttpClient};
