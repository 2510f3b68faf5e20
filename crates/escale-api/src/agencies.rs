//! Handlers for public agency endpoints. Posting a review needs an account
//! and lives in the server.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use escale_core::{catalog::Agency, messaging::Review, store::MarketplaceStore};

use crate::error::ApiError;

/// `GET /agencies/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Agency>, ApiError>
where
  S: MarketplaceStore,
{
  let agency = store
    .get_agency(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("Agence introuvable : {id}")))?;
  Ok(Json(agency))
}

/// `GET /agencies/{id}/reviews`, newest first.
pub async fn reviews<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Review>>, ApiError>
where
  S: MarketplaceStore,
{
  if store.get_agency(id).await.map_err(ApiError::store)?.is_none() {
    return Err(ApiError::NotFound(format!("Agence introuvable : {id}")));
  }
  let reviews = store.reviews_for_agency(id).await.map_err(ApiError::store)?;
  Ok(Json(reviews))
}
