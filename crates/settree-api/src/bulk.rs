//! Handlers for multi-node writes.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/settings/import` | Body: `{"text":"A\n\tB"}` or `{"lines":[…]}` |
//! | `POST` | `/settings/bulk` | Body: `{"names":[…]}`; one atomic batch |
//! | `POST` | `/settings/reorder` | Body: `[{"id":"…","order":0}, …]` |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use settree_core::{setting::OrderUpdate, store::DocumentStore};
use settree_engine::SettingsEngine;
use uuid::Uuid;

use crate::{actor::RequestActor, error::ApiError};

// ─── Import ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBody {
  pub lines:       Option<Vec<String>>,
  pub text:        Option<String>,
  pub parent_id:   Option<Uuid>,
  #[serde(default)]
  pub description: String,
}

/// `POST /settings/import`
pub async fn import<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  RequestActor(actor): RequestActor,
  Json(body): Json<ImportBody>,
) -> Result<impl IntoResponse, ApiError> {
  let lines: Vec<String> = match (body.lines, body.text) {
    (Some(lines), _) => lines,
    (None, Some(text)) => text.lines().map(str::to_owned).collect(),
    (None, None) => {
      return Err(ApiError::BadRequest("either lines or text is required".into()));
    }
  };

  let created = engine
    .import_hierarchy(lines, body.parent_id, &body.description, &actor)
    .await?;
  Ok((StatusCode::CREATED, Json(created)))
}

// ─── Bulk create ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkBody {
  pub names:       Vec<String>,
  pub parent_id:   Option<Uuid>,
  #[serde(default)]
  pub description: String,
}

/// `POST /settings/bulk`
pub async fn create<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  RequestActor(actor): RequestActor,
  Json(body): Json<BulkBody>,
) -> Result<impl IntoResponse, ApiError> {
  let created = engine
    .bulk_create(body.names, body.parent_id, &body.description, &actor)
    .await?;
  Ok((StatusCode::CREATED, Json(created)))
}

// ─── Reorder ──────────────────────────────────────────────────────────────────

/// `POST /settings/reorder`
pub async fn reorder<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  RequestActor(actor): RequestActor,
  Json(updates): Json<Vec<OrderUpdate>>,
) -> Result<StatusCode, ApiError> {
  engine.reorder(&updates, &actor).await?;
  Ok(StatusCode::NO_CONTENT)
}
