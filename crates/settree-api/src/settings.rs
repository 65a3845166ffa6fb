//! Handlers for `/settings` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/settings` | Optional `?parent=<id>`; roots otherwise |
//! | `POST`   | `/settings` | Body: `{"name":"…","type":"variable"}` |
//! | `GET`    | `/settings/tree` | Optional `?parent=<id>` |
//! | `GET`    | `/settings/:id` | 404 if not found |
//! | `PATCH`  | `/settings/:id` | Partial body; returns the updated node |
//! | `DELETE` | `/settings/:id` | Cascades; returns `{"deleted": n}` |
//! | `POST`   | `/settings/:id/duplicate` | Body: `{"deep":true}` |
//! | `GET`    | `/settings/:id/value` | Resolves `inheritedFrom` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use settree_core::{
  setting::{NewSetting, SettingNode, SettingPatch},
  store::DocumentStore,
};
use settree_engine::{SettingTree, SettingsEngine};
use uuid::Uuid;

use crate::{actor::RequestActor, error::ApiError};

fn not_found(id: Uuid) -> ApiError { ApiError::NotFound(format!("setting {id} not found")) }

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ParentParams {
  pub parent: Option<Uuid>,
}

/// `GET /settings[?parent=<id>]`
pub async fn list<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Query(params): Query<ParentParams>,
) -> Result<Json<Vec<SettingNode>>, ApiError> {
  Ok(Json(engine.list_by_parent(params.parent).await?))
}

/// `GET /settings/tree[?parent=<id>]`
pub async fn tree<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Query(params): Query<ParentParams>,
) -> Result<Json<Vec<SettingTree>>, ApiError> {
  Ok(Json(engine.load_tree(params.parent).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /settings`
pub async fn create<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  RequestActor(actor): RequestActor,
  Json(body): Json<NewSetting>,
) -> Result<impl IntoResponse, ApiError> {
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  let node = engine.create(body, &actor).await?;
  Ok((StatusCode::CREATED, Json(node)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /settings/:id`
pub async fn get_one<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SettingNode>, ApiError> {
  let node = engine.get(id).await?.ok_or_else(|| not_found(id))?;
  Ok(Json(node))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /settings/:id`
pub async fn patch<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Path(id): Path<Uuid>,
  RequestActor(actor): RequestActor,
  Json(body): Json<SettingPatch>,
) -> Result<Json<SettingNode>, ApiError> {
  if body.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  engine.get(id).await?.ok_or_else(|| not_found(id))?;
  engine.update(id, body, &actor).await?;
  let node = engine.get(id).await?.ok_or_else(|| not_found(id))?;
  Ok(Json(node))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /settings/:id`
pub async fn remove<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Path(id): Path<Uuid>,
  RequestActor(actor): RequestActor,
) -> Result<Json<Value>, ApiError> {
  let deleted = engine.remove(id, &actor).await?;
  Ok(Json(json!({ "deleted": deleted })))
}

// ─── Duplicate ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct DuplicateBody {
  #[serde(default)]
  pub deep: bool,
}

/// `POST /settings/:id/duplicate`
pub async fn duplicate<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Path(id): Path<Uuid>,
  RequestActor(actor): RequestActor,
  Json(body): Json<DuplicateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let copy = engine.duplicate(id, &actor, body.deep).await?;
  Ok((StatusCode::CREATED, Json(copy)))
}

// ─── Value ────────────────────────────────────────────────────────────────────

/// `GET /settings/:id/value`
pub async fn value<S: DocumentStore>(
  State(engine): State<Arc<SettingsEngine<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
  let value = engine.resolve_value(id).await?;
  Ok(Json(json!({ "id": id, "value": value })))
}
