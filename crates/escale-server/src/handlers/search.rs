//! Catalogue search with history, and saved search preferences.

use axum::{
  Json,
  extract::{Query, State},
};
use escale_api::CatalogueParams;
use escale_core::{
  catalog::Destination,
  search::{
    DEFAULT_HISTORY_LIMIT, NewSearch, SearchHistory, SearchPreference, SearchPreferenceUpdate,
  },
  store::MarketplaceStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Authenticated, MaybeAuthenticated},
  error::{Error, Result, store},
};

pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
  pub limit: Option<usize>,
}

/// `GET /search`
///
/// Same filters as `/api/destinations`. Every search is kept in the history,
/// linked to the caller when they are signed in.
pub async fn run<S>(
  State(state): State<AppState<S>>,
  MaybeAuthenticated(user): MaybeAuthenticated,
  Query(params): Query<CatalogueParams>,
) -> Result<Json<Vec<Destination>>>
where
  S: MarketplaceStore,
{
  let query = params.into_query()?;
  let results = state.store.advanced_search(&query).await.map_err(store)?;

  let entry = NewSearch {
    user_id:      user.map(|u| u.id),
    search_query: query.text.clone().unwrap_or_default(),
    filters:      query.filters_json()?,
  };
  if let Err(e) = state.store.save_search(entry).await {
    tracing::warn!(error = %e, "failed to save search history");
  }

  tracing::debug!(results = results.len(), "search served");
  Ok(Json(results))
}

/// `GET /account/search-history?limit`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SearchHistory>>>
where
  S: MarketplaceStore,
{
  let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);
  let history = state.store.search_history_for_user(user.id, limit).await.map_err(store)?;
  Ok(Json(history))
}

/// `GET /account/preferences`. `null` until the user saves any.
pub async fn preferences<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
) -> Result<Json<Option<SearchPreference>>>
where
  S: MarketplaceStore,
{
  let prefs = state.store.get_search_preferences(user.id).await.map_err(store)?;
  Ok(Json(prefs))
}

/// `PUT /account/preferences`. Fields left out keep their saved value.
pub async fn update_preferences<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Json(update): Json<SearchPreferenceUpdate>,
) -> Result<Json<SearchPreference>>
where
  S: MarketplaceStore,
{
  if let (Some(min), Some(max)) = (update.preferred_budget_min, update.preferred_budget_max)
    && min > max
  {
    return Err(Error::BadRequest("Le budget minimum dépasse le budget maximum".into()));
  }

  state.store.update_search_preferences(user.id, update).await.map_err(store)?;
  let prefs = state
    .store
    .get_search_preferences(user.id)
    .await
    .map_err(store)?
    .ok_or_else(|| {
      Error::Internal(format!("preferences missing after upsert for user {}", user.id))
    })?;
  Ok(Json(prefs))
}
