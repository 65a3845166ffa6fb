//! `GET /targets/:target/settings`: the settings assigned to one target.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use settree_core::{setting::SettingNode, store::DocumentStore};
use settree_engine::SettingsEngine;

use crate::error::ApiError;

pub async fn list<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Path(target): Path<String>,
) -> Result<Json<Vec<SettingNode>>, ApiError> {
  Ok(Json(engine.list_by_target(&target).await?))
}
