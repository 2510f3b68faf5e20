//! The traveler profile page.

use axum::{Json, extract::State};
use escale_core::{
  account::{MSG_WRONG_PASSWORD, ProfileEdit},
  store::MarketplaceStore,
  user::User,
};

use crate::{
  AppState,
  auth::{Authenticated, hash_password, verify_password},
  error::{Error, Result, store},
};

/// `GET /account/profile`
pub async fn show(Authenticated(user): Authenticated) -> Json<User> { Json(user) }

/// `PUT /account/profile`
///
/// Names and phone are written as given, and an empty phone clears it. A
/// password change needs the current password, a matching confirmation and
/// at least 8 characters.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Json(edit): Json<ProfileEdit>,
) -> Result<Json<User>>
where
  S: MarketplaceStore,
{
  let mut update = edit.identity_update();
  if let Some(new_password) = edit.validate_password_change()? {
    let current = edit.current_password.as_deref().unwrap_or_default();
    if !verify_password(current, &user.password_hash) {
      return Err(Error::BadRequest(MSG_WRONG_PASSWORD.into()));
    }
    update.password_hash = Some(hash_password(new_password)?);
  }

  if !update.is_empty() {
    state.store.update_user(user.id, update).await.map_err(store)?;
  }

  let user = state
    .store
    .get_user(user.id)
    .await
    .map_err(store)?
    .ok_or_else(|| Error::NotFound(format!("Utilisateur introuvable : {}", user.id)))?;
  Ok(Json(user))
}
