//! Registration, login and logout.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, TimeDelta, Utc};
use escale_core::{
  account::{Login, MSG_EMAIL_TAKEN, Registration, normalize_email},
  session::NewSession,
  store::MarketplaceStore,
  user::{NewUser, SessionUser, User},
};
use serde::Serialize;

use crate::{
  AppState,
  auth::{
    Authenticated, bearer_token, hash_password, new_session_token, token_digest,
    verify_password,
  },
  error::{Error, Result, store},
};

/// Body returned by register and login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
  pub user:       SessionUser,
}

async fn open_session<S>(state: &AppState<S>, user: &User) -> Result<SessionResponse>
where
  S: MarketplaceStore,
{
  let ttl_hours = state.config.session_ttl_hours;
  let expires_at = TimeDelta::try_hours(i64::from(ttl_hours))
    .and_then(|ttl| Utc::now().checked_add_signed(ttl))
    .ok_or_else(|| Error::Internal(format!("session lifetime out of range: {ttl_hours}h")))?;

  let issued = new_session_token();
  let session = state
    .store
    .create_session(NewSession {
      token_hash: issued.token_hash,
      user_id: user.id,
      expires_at,
    })
    .await
    .map_err(store)?;
  Ok(SessionResponse {
    token:      issued.token,
    expires_at: session.expires_at,
    user:       user.session_user(),
  })
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<SessionResponse>)>
where
  S: MarketplaceStore,
{
  form.validate()?;
  let email = normalize_email(&form.email);
  if state.store.get_user_by_email(&email).await.map_err(store)?.is_some() {
    return Err(Error::Conflict(MSG_EMAIL_TAKEN.into()));
  }

  let user = state
    .store
    .create_user(NewUser {
      email,
      password_hash: hash_password(&form.password)?,
      first_name: form.first_name.trim().to_owned(),
      last_name: form.last_name.trim().to_owned(),
      phone: form.phone(),
      role: form.role(),
    })
    .await
    .map_err(store)?;
  tracing::info!(user_id = user.id, role = %user.role, "account registered");

  let session = open_session(&state, &user).await?;
  Ok((StatusCode::CREATED, Json(session)))
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(form): Json<Login>,
) -> Result<Json<SessionResponse>>
where
  S: MarketplaceStore,
{
  form.validate()?;
  let user = state
    .store
    .get_user_by_email(&normalize_email(&form.email))
    .await
    .map_err(store)?
    .filter(|u| verify_password(&form.password, &u.password_hash))
    .ok_or(Error::Unauthorized)?;

  let session = open_session(&state, &user).await?;
  tracing::debug!(user_id = user.id, "logged in");
  Ok(Json(session))
}

/// `POST /auth/logout`. Always 204, whether or not the token was live.
pub async fn logout<S>(State(state): State<AppState<S>>, headers: HeaderMap) -> Result<StatusCode>
where
  S: MarketplaceStore,
{
  if let Some(token) = bearer_token(&headers) {
    state.store.delete_session(&token_digest(token)).await.map_err(store)?;
  }
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/me`
pub async fn me(Authenticated(user): Authenticated) -> Json<SessionUser> {
  Json(user.session_user())
}
