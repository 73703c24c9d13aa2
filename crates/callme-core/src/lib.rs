//! Core types and trait definitions for callme.
//!
//! This crate is deliberately free of HTTP and runtime dependencies. The
//! optimistic store and the dashboard depend on it; it depends on neither.

pub mod api;
pub mod call_attempt;
pub mod error;
pub mod filter;
pub mod input;
pub mod reminder;
pub mod validate;

pub use error::{RemoteError, Result};
