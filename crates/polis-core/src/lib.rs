//! Core types and portfolio logic for the Polis policy lifecycle engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod claim;
pub mod duplicate;
pub mod error;
pub mod notification;
pub mod policy;
pub mod renewal;
pub mod service;
pub mod settings;
pub mod snapshot;
pub mod status;
pub mod store;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
