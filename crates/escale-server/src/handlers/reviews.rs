//! `POST /agencies/{id}/reviews`

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use escale_core::{
  messaging::{MAX_RATING, MIN_RATING, NewReview, Review},
  store::MarketplaceStore,
  trip::BookingStatus,
  user::Role,
};
use serde::Deserialize;

use super::non_blank;
use crate::{
  AppState,
  auth::Authenticated,
  error::{Error, Result, store},
};

#[derive(Debug, Deserialize)]
pub struct ReviewForm {
  pub rating:     i64,
  pub title:      Option<String>,
  pub content:    Option<String>,
  /// A booking made with this agency; marks the review as verified.
  pub booking_id: Option<i64>,
}

pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(agency_id): Path<i64>,
  Json(form): Json<ReviewForm>,
) -> Result<(StatusCode, Json<Review>)>
where
  S: MarketplaceStore,
{
  if user.role != Role::Traveler {
    return Err(Error::Forbidden("Seuls les voyageurs peuvent laisser un avis".into()));
  }
  if !(MIN_RATING..=MAX_RATING).contains(&form.rating) {
    return Err(Error::BadRequest(format!(
      "La note doit être comprise entre {MIN_RATING} et {MAX_RATING}"
    )));
  }
  if state.store.get_agency(agency_id).await.map_err(store)?.is_none() {
    return Err(Error::NotFound(format!("Agence introuvable : {agency_id}")));
  }

  let is_verified = match form.booking_id {
    None => false,
    Some(booking_id) => {
      let booking = state
        .store
        .get_booking(booking_id)
        .await
        .map_err(store)?
        .filter(|b| b.user_id == user.id)
        .ok_or_else(|| Error::NotFound(format!("Réservation introuvable : {booking_id}")))?;
      let quote = state.store.get_quote(booking.quote_id).await.map_err(store)?;
      if quote.is_none_or(|q| q.agency_id != agency_id) {
        return Err(Error::BadRequest("Cette réservation ne concerne pas cette agence".into()));
      }
      booking.status != BookingStatus::Cancelled
    }
  };

  let review = state
    .store
    .create_review(NewReview {
      user_id: user.id,
      agency_id,
      booking_id: form.booking_id,
      rating: form.rating,
      title: non_blank(form.title),
      content: non_blank(form.content),
      is_verified,
    })
    .await
    .map_err(store)?;
  tracing::info!(review_id = review.id, agency_id, rating = review.rating, "review posted");

  Ok((StatusCode::CREATED, Json(review)))
}
