//! Core types and trait definitions for the tarqim archive.
//!
//! This crate is deliberately free of parsing and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod annotation;
pub mod error;
pub mod ids;
pub mod ingestion;
pub mod material;
pub mod store;

pub use error::{Error, Result};
