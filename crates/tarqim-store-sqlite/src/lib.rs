//! SQLite backend for the Tarqim archive store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Identity-key uniqueness and the
//! terminal compare-and-swap both live in SQL here, not in service code.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
