//! Domain types for settree: setting nodes, history entries, actors, and the
//! [`store::DocumentStore`] contract that storage backends implement.
//!
//! No HTTP or database code lives here; every other crate builds on it.

// Backends implement the store trait with native `async fn`.
#![allow(async_fn_in_trait)]

pub mod actor;
pub mod error;
pub mod history;
pub mod path;
pub mod setting;
pub mod store;

pub use error::{Error, Result};
