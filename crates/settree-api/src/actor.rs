//! Request-scoped actor extraction.
//!
//! Callers identify themselves with `x-actor-id` and, optionally,
//! `x-actor-name`. No verification happens here; put authentication in
//! front of the router.

use axum::{extract::FromRequestParts, http::request::Parts};
use settree_core::actor::Actor;

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// The [`Actor`] a mutating request is performed on behalf of.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

impl<St: Send + Sync> FromRequestParts<St> for RequestActor {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    let header = |name: &str| {
      parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
    };

    let id = header(ACTOR_ID_HEADER)
      .ok_or_else(|| ApiError::BadRequest(format!("missing {ACTOR_ID_HEADER} header")))?;
    let name = header(ACTOR_NAME_HEADER).unwrap_or_else(|| id.clone());
    Ok(RequestActor(Actor { id, name }))
  }
}
