//! Optimistic reminder store.
//!
//! [`ReminderStore`] keeps a local cache of list and detail queries against a
//! [`ReminderApi`](callme_core::api::ReminderApi), applies mutations to that
//! cache before the server confirms them, and rolls them back when it does
//! not. The generic snapshot machinery lives in [`cache`].

pub mod cache;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{Cached, QueryKey, ReminderStore, StoreConfig};
