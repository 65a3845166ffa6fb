//! JSON REST API for settree.
//!
//! Exposes an axum [`Router`] backed by a [`SettingsEngine`] over any
//! [`DocumentStore`]. Mutating requests name their actor through the
//! `x-actor-id`/`x-actor-name` headers; auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", settree_api::api_router(engine.clone()))
//! ```

pub mod actor;
pub mod bulk;
pub mod error;
pub mod history;
pub mod settings;
pub mod targets;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use settree_core::store::DocumentStore;
use settree_engine::SettingsEngine;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Arc<SettingsEngine<S>>) -> Router<()>
where
  S: DocumentStore + 'static,
{
  Router::new()
    // Settings
    .route("/settings", get(settings::list::<S>).post(settings::create::<S>))
    .route("/settings/tree", get(settings::tree::<S>))
    .route(
      "/settings/{id}",
      get(settings::get_one::<S>)
        .patch(settings::patch::<S>)
        .delete(settings::remove::<S>),
    )
    .route("/settings/{id}/duplicate", post(settings::duplicate::<S>))
    .route("/settings/{id}/value", get(settings::value::<S>))
    // Bulk
    .route("/settings/import", post(bulk::import::<S>))
    .route("/settings/bulk", post(bulk::create::<S>))
    .route("/settings/reorder", post(bulk::reorder::<S>))
    // History
    .route("/settings/{id}/history", get(history::list::<S>))
    .route("/settings/{id}/revert", post(history::revert::<S>))
    .route("/history/{id}", get(history::get_one::<S>))
    // Targets
    .route("/targets/{target}/settings", get(targets::list::<S>))
    .with_state(engine)
}
