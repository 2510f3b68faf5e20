//! Booking a quote and paying for it.
//!
//! Payments go through a mock provider: every payment is recorded as
//! completed, and the booking's payment status is recomputed by the store.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::Utc;
use escale_core::{
  store::MarketplaceStore,
  trip::{
    Booking, BookingStatus, NewBooking, NewPayment, Payment, PaymentStatus, QuoteRequestStatus,
    QuoteStatus, TransactionStatus,
  },
  user::User,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{non_blank, quotes::owned_request};
use crate::{
  AppState,
  auth::Authenticated,
  error::{Error, Result, store},
};

const DEFAULT_PAYMENT_METHOD: &str = "card";

#[derive(Debug, Deserialize)]
pub struct BookingForm {
  pub quote_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaymentForm {
  pub amount:         f64,
  pub payment_method: Option<String>,
  pub transaction_id: Option<String>,
}

/// A recorded payment together with the booking it updated.
#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
  pub payment: Payment,
  pub booking: Booking,
}

async fn owned_booking<S>(state: &AppState<S>, user: &User, id: i64) -> Result<Booking>
where
  S: MarketplaceStore,
{
  state
    .store
    .get_booking(id)
    .await
    .map_err(store)?
    .filter(|b| b.user_id == user.id)
    .ok_or_else(|| Error::NotFound(format!("Réservation introuvable : {id}")))
}

/// `GET /account/bookings`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
) -> Result<Json<Vec<Booking>>>
where
  S: MarketplaceStore,
{
  let bookings = state.store.bookings_for_user(user.id).await.map_err(store)?;
  Ok(Json(bookings))
}

/// `POST /account/bookings`
///
/// Books a quote answering one of the caller's requests. The accepted quote
/// closes the request and turns down the other pending offers.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Json(form): Json<BookingForm>,
) -> Result<(StatusCode, Json<Booking>)>
where
  S: MarketplaceStore,
{
  let not_found = || Error::NotFound(format!("Devis introuvable : {}", form.quote_id));
  let quote = state.store.get_quote(form.quote_id).await.map_err(store)?.ok_or_else(not_found)?;
  let request = match owned_request(&state, &user, quote.quote_request_id).await {
    Err(Error::NotFound(_)) => return Err(not_found()),
    other => other?,
  };

  if matches!(quote.status, QuoteStatus::Rejected | QuoteStatus::Expired) {
    return Err(Error::Conflict("Ce devis n'est plus disponible".into()));
  }
  if quote.is_lapsed(Utc::now()) {
    state.store.set_quote_status(quote.id, QuoteStatus::Expired).await.map_err(store)?;
    return Err(Error::Conflict("Ce devis a expiré".into()));
  }
  let already_booked = state
    .store
    .bookings_for_user(user.id)
    .await
    .map_err(store)?
    .iter()
    .any(|b| b.quote_id == quote.id && b.status != BookingStatus::Cancelled);
  if already_booked {
    return Err(Error::Conflict("Ce devis a déjà été réservé".into()));
  }

  let booking = state
    .store
    .create_booking(NewBooking {
      user_id:        user.id,
      quote_id:       quote.id,
      total_price:    quote.price,
      status:         BookingStatus::Pending,
      payment_status: PaymentStatus::Pending,
    })
    .await
    .map_err(store)?;

  state.store.set_quote_status(quote.id, QuoteStatus::Accepted).await.map_err(store)?;
  state
    .store
    .set_quote_request_status(request.id, QuoteRequestStatus::Completed)
    .await
    .map_err(store)?;
  for other in state.store.quotes_for_request(request.id).await.map_err(store)? {
    if other.id != quote.id && other.status == QuoteStatus::Pending {
      state.store.set_quote_status(other.id, QuoteStatus::Rejected).await.map_err(store)?;
    }
  }
  tracing::info!(booking_id = booking.id, quote_id = quote.id, "quote booked");

  Ok((StatusCode::CREATED, Json(booking)))
}

/// `GET /account/bookings/{id}/payments`
pub async fn payments<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Payment>>>
where
  S: MarketplaceStore,
{
  let booking = owned_booking(&state, &user, id).await?;
  let payments = state.store.payments_for_booking(booking.id).await.map_err(store)?;
  Ok(Json(payments))
}

/// `POST /account/bookings/{id}/payments`
pub async fn pay<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<i64>,
  Json(form): Json<PaymentForm>,
) -> Result<(StatusCode, Json<PaymentReceipt>)>
where
  S: MarketplaceStore,
{
  if !form.amount.is_finite() || form.amount <= 0.0 {
    return Err(Error::BadRequest("Le montant doit être positif".into()));
  }
  let booking = owned_booking(&state, &user, id).await?;
  match (booking.status, booking.payment_status) {
    (BookingStatus::Cancelled, _) => {
      return Err(Error::Conflict("Cette réservation est annulée".into()));
    }
    (_, PaymentStatus::Completed | PaymentStatus::Refunded) => {
      return Err(Error::Conflict("Cette réservation est déjà réglée".into()));
    }
    _ => {}
  }

  let transaction_id = non_blank(form.transaction_id)
    .unwrap_or_else(|| format!("txn_{}", Uuid::new_v4().simple()));
  let payment = state
    .store
    .record_payment(NewPayment {
      booking_id:     booking.id,
      amount:         form.amount,
      payment_method: non_blank(form.payment_method)
        .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_owned()),
      transaction_id: Some(transaction_id),
      status:         TransactionStatus::Completed,
    })
    .await
    .map_err(store)?;

  let booking = owned_booking(&state, &user, id).await?;
  tracing::info!(
    booking_id = booking.id,
    amount = payment.amount,
    payment_status = %booking.payment_status,
    "payment recorded"
  );
  Ok((StatusCode::CREATED, Json(PaymentReceipt { payment, booking })))
}
