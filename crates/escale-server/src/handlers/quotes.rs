//! Traveler quote requests and the offers agencies send back.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::NaiveDate;
use escale_core::{
  search::DurationRange,
  store::MarketplaceStore,
  trip::{AccommodationType, NewQuoteRequest, Quote, QuoteRequest, QuoteRequestStatus},
  user::User,
};
use serde::Deserialize;

use super::non_blank;
use crate::{
  AppState,
  auth::Authenticated,
  error::{Error, Result, store},
};

/// The quote form on a destination page.
#[derive(Debug, Deserialize)]
pub struct QuoteRequestForm {
  pub destination_id:     i64,
  pub departure_date:     Option<NaiveDate>,
  /// Kept as typed, e.g. `"8-14 jours"`, once it parses as a range.
  pub duration:           Option<String>,
  #[serde(default = "one_traveler")]
  pub travelers_count:    i64,
  pub budget:             Option<f64>,
  pub accommodation_type: Option<AccommodationType>,
  pub message:            Option<String>,
}

fn one_traveler() -> i64 { 1 }

/// The quote request `id`, provided it belongs to `user`.
pub(super) async fn owned_request<S>(
  state: &AppState<S>,
  user: &User,
  id: i64,
) -> Result<QuoteRequest>
where
  S: MarketplaceStore,
{
  state
    .store
    .get_quote_request(id)
    .await
    .map_err(store)?
    .filter(|r| r.user_id == user.id)
    .ok_or_else(|| Error::NotFound(format!("Demande de devis introuvable : {id}")))
}

/// `GET /account/quote-requests`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
) -> Result<Json<Vec<QuoteRequest>>>
where
  S: MarketplaceStore,
{
  let requests = state.store.quote_requests_for_user(user.id).await.map_err(store)?;
  Ok(Json(requests))
}

/// `POST /account/quote-requests`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Json(form): Json<QuoteRequestForm>,
) -> Result<(StatusCode, Json<QuoteRequest>)>
where
  S: MarketplaceStore,
{
  if form.travelers_count < 1 {
    return Err(Error::BadRequest("Il faut au moins un voyageur".into()));
  }
  if form.budget.is_some_and(|b| !b.is_finite() || b <= 0.0) {
    return Err(Error::BadRequest("Le budget doit être positif".into()));
  }
  let duration = non_blank(form.duration);
  if let Some(raw) = &duration {
    raw.parse::<DurationRange>()?;
  }

  let destination_id = form.destination_id;
  if state.store.get_destination(destination_id).await.map_err(store)?.is_none() {
    return Err(Error::NotFound(format!("Destination introuvable : {destination_id}")));
  }

  let request = state
    .store
    .create_quote_request(NewQuoteRequest {
      user_id: user.id,
      destination_id,
      departure_date: form.departure_date,
      duration,
      travelers_count: form.travelers_count,
      budget: form.budget,
      accommodation_type: form.accommodation_type,
      message: non_blank(form.message),
      status: QuoteRequestStatus::Pending,
    })
    .await
    .map_err(store)?;
  tracing::info!(request_id = request.id, destination_id, "quote request submitted");

  Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /account/quote-requests/{id}/quotes`
pub async fn offers<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Quote>>>
where
  S: MarketplaceStore,
{
  let request = owned_request(&state, &user, id).await?;
  let quotes = state.store.quotes_for_request(request.id).await.map_err(store)?;
  Ok(Json(quotes))
}
