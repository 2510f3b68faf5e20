//! Handlers for `/destinations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/destinations` | Sidebar filters, see [`CatalogueParams`] |
//! | `GET`  | `/destinations/{key}` | Id or slug; 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use escale_core::{
  catalog::{Destination, DestinationPage},
  store::MarketplaceStore,
};

use crate::{error::ApiError, params::CatalogueParams};

/// `GET /destinations`
///
/// Optional filters: `continent`, `theme`, `budget_min`, `budget_max`,
/// `duration` and `search`.
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<CatalogueParams>,
) -> Result<Json<Vec<Destination>>, ApiError>
where
  S: MarketplaceStore,
{
  let query = params.into_query()?;
  let destinations = store.advanced_search(&query).await.map_err(ApiError::store)?;
  Ok(Json(destinations))
}

/// `GET /destinations/{key}`
pub async fn page<S>(
  State(store): State<Arc<S>>,
  Path(key): Path<String>,
) -> Result<Json<DestinationPage>, ApiError>
where
  S: MarketplaceStore,
{
  let page = store
    .destination_page(&key)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("Destination introuvable : {key}")))?;
  Ok(Json(page))
}
