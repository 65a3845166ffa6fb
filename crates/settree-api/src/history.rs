//! Handlers for history read-back and revert.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/settings/:id/history` | Newest first |
//! | `POST` | `/settings/:id/revert` | Body: `{"historyId":"…"}` |
//! | `GET`  | `/history/:id` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use settree_core::{history::HistoryEntry, setting::SettingNode, store::DocumentStore};
use settree_engine::SettingsEngine;
use uuid::Uuid;

use crate::{actor::RequestActor, error::ApiError};

/// `GET /settings/:id/history`
pub async fn list<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
  Ok(Json(engine.history(id).await?))
}

/// `GET /history/:id`
pub async fn get_one<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<HistoryEntry>, ApiError> {
  let entry = engine
    .history_entry(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("history entry {id} not found")))?;
  Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertBody {
  pub history_id: Uuid,
}

/// `POST /settings/:id/revert`
pub async fn revert<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Path(id): Path<Uuid>,
  RequestActor(actor): RequestActor,
  Json(body): Json<RevertBody>,
) -> Result<Json<SettingNode>, ApiError> {
  engine.revert(id, body.history_id, &actor).await?;
  let node = engine
    .get(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("setting {id} not found")))?;
  Ok(Json(node))
}
