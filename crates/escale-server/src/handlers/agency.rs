//! The agency side of the quote pipeline. Agency-role accounts only.

use axum::{Json, extract::State, http::StatusCode};
use escale_core::{
  store::MarketplaceStore,
  trip::{NewQuote, Quote, QuoteRequest, QuoteRequestStatus, QuoteStatus},
};
use serde::Deserialize;

use super::{agency_of, non_blank};
use crate::{
  AppState,
  auth::Authenticated,
  error::{Error, Result, store},
};

/// Days an offer stays open when the agency does not say.
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;
/// Longest validity an agency may give an offer.
pub const MAX_VALIDITY_DAYS: i64 = 365;

#[derive(Debug, Deserialize)]
pub struct QuoteForm {
  pub quote_request_id: i64,
  pub price:            f64,
  pub description:      Option<String>,
  pub validity_period:  Option<i64>,
}

/// `GET /agency/quote-requests`. Requests for destinations the agency
/// serves, newest first.
pub async fn inbox<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
) -> Result<Json<Vec<QuoteRequest>>>
where
  S: MarketplaceStore,
{
  let agency = agency_of(&state, &user).await?;
  let requests = state.store.quote_requests_for_agency(agency.id).await.map_err(store)?;
  Ok(Json(requests))
}

/// `POST /agency/quotes`
///
/// Answering a pending request moves it to `processing`.
pub async fn create_quote<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Json(form): Json<QuoteForm>,
) -> Result<(StatusCode, Json<Quote>)>
where
  S: MarketplaceStore,
{
  let agency = agency_of(&state, &user).await?;

  if !form.price.is_finite() || form.price <= 0.0 {
    return Err(Error::BadRequest("Le prix doit être positif".into()));
  }
  let validity_period = form.validity_period.unwrap_or(DEFAULT_VALIDITY_DAYS);
  if !(1..=MAX_VALIDITY_DAYS).contains(&validity_period) {
    return Err(Error::BadRequest(format!(
      "La durée de validité doit être comprise entre 1 et {MAX_VALIDITY_DAYS} jours"
    )));
  }

  let request_id = form.quote_request_id;
  let request = state
    .store
    .quote_requests_for_agency(agency.id)
    .await
    .map_err(store)?
    .into_iter()
    .find(|r| r.id == request_id)
    .ok_or_else(|| Error::NotFound(format!("Demande de devis introuvable : {request_id}")))?;
  if matches!(request.status, QuoteRequestStatus::Completed | QuoteRequestStatus::Cancelled) {
    return Err(Error::Conflict("Cette demande est close".into()));
  }

  let quote = state
    .store
    .create_quote(NewQuote {
      quote_request_id: request.id,
      agency_id: agency.id,
      price: form.price,
      description: non_blank(form.description),
      validity_period,
      status: QuoteStatus::Pending,
    })
    .await
    .map_err(store)?;

  if request.status == QuoteRequestStatus::Pending {
    state
      .store
      .set_quote_request_status(request.id, QuoteRequestStatus::Processing)
      .await
      .map_err(store)?;
  }
  tracing::info!(quote_id = quote.id, request_id, agency_id = agency.id, "quote sent");

  Ok((StatusCode::CREATED, Json(quote)))
}
