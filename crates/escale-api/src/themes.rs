//! Handlers for `/themes` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use escale_core::{catalog::Theme, store::MarketplaceStore};

use crate::error::ApiError;

/// `GET /themes`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<Theme>>, ApiError>
where
  S: MarketplaceStore,
{
  let themes = store.list_themes().await.map_err(ApiError::store)?;
  Ok(Json(themes))
}

/// `GET /themes/{slug}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(slug): Path<String>,
) -> Result<Json<Theme>, ApiError>
where
  S: MarketplaceStore,
{
  let theme = store
    .get_theme_by_slug(&slug)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("Thématique introuvable : {slug}")))?;
  Ok(Json(theme))
}
