use std::sync::Arc;

use axum::{
  Json,
  extract::{FromRequestParts, OptionalFromRequestParts, State},
  http::{StatusCode, header, request::Parts},
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{Role, user},
  prelude::*,
  state::AppState,
};

/// Authenticated caller, resolved from `Authorization: Token <key>`.
pub struct Auth {
  pub user: user::Model,
  pub key: String,
}

fn token(parts: &Parts) -> Option<&str> {
  let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, key) = value.split_once(' ')?;
  matches!(scheme, "Token" | "Bearer").then(|| key.trim())
}

async fn resolve(app: &AppState, key: &str) -> Result<Auth> {
  let user = app.sv().user.by_token(key).await?.ok_or(Error::Unauthorized)?;
  Ok(Auth { user, key: key.to_string() })
}

impl FromRequestParts<Arc<AppState>> for Auth {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let key = token(parts).ok_or(Error::Unauthorized)?;
    resolve(app, key).await
  }
}

/// Missing credentials mean anonymous, a bad token is still rejected.
impl OptionalFromRequestParts<Arc<AppState>> for Auth {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Option<Self>> {
    match token(parts) {
      Some(key) => resolve(app, key).await.map(Some),
      None => Ok(None),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct RegisterReq {
  pub username: String,
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct RegisterRes {
  pub token: String,
  pub user: user::Model,
}

pub async fn register(
  State(app): State<Arc<AppState>>,
  Json(req): Json<RegisterReq>,
) -> Result<(StatusCode, Json<RegisterRes>)> {
  let (user, token) = app
    .sv()
    .user
    .register(&req.username, &req.email, &req.password, req.role)
    .await?;

  Ok((StatusCode::CREATED, Json(RegisterRes { token: token.key, user })))
}

#[derive(Debug, Deserialize)]
pub struct LoginReq {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRes {
  pub token: String,
  pub user_id: i64,
}

pub async fn login(
  State(app): State<Arc<AppState>>,
  Json(req): Json<LoginReq>,
) -> Result<Json<LoginRes>> {
  let (user, token) = app.sv().user.login(&req.username, &req.password).await?;
  Ok(Json(LoginRes { token: token.key, user_id: user.id }))
}

pub async fn logout(
  State(app): State<Arc<AppState>>,
  auth: Auth,
) -> Result<StatusCode> {
  app.sv().user.logout(&auth.key).await?;
  debug!("User {} logged out", auth.user.id);
  Ok(StatusCode::NO_CONTENT)
}
