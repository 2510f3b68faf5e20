pub mod agency;
pub mod auth;
pub mod bookings;
pub mod conversations;
pub mod profile;
pub mod quotes;
pub mod reviews;
pub mod search;

use axum::Json;
use escale_core::{catalog::Agency, store::MarketplaceStore, user::User};
use serde_json::{Value, json};

use crate::{
  AppState,
  error::{Error, Result, store},
};

/// `GET /health`
pub async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// Trim a free-text form field, dropping it when blank.
pub(super) fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

/// The agency `user` speaks for. Non-agency accounts are refused.
pub(super) async fn agency_of<S>(state: &AppState<S>, user: &User) -> Result<Agency>
where
  S: MarketplaceStore,
{
  if user.role != escale_core::user::Role::Agency {
    return Err(Error::Forbidden("Réservé aux agences".into()));
  }
  state
    .store
    .get_agency_by_user(user.id)
    .await
    .map_err(store)?
    .ok_or_else(|| Error::NotFound("Aucune agence associée à ce compte".into()))
}
