//! The trip pipeline: quote requests, agency quotes, bookings and payments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Declares a snake_case status enum whose text form is both the serde
/// representation and the database column value.
macro_rules! status_enum {
  ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(
      Debug,
      Clone,
      Copy,
      PartialEq,
      Eq,
      Default,
      Serialize,
      Deserialize,
      strum::AsRefStr,
      strum::EnumString,
      strum::Display,
    )]
    #[serde(rename_all = "snake_case")]
    #[strum(serialize_all = "snake_case")]
    pub enum $name {
      #[default]
      $($variant),+
    }
  };
}

status_enum! {
  /// Where a traveler's brief stands.
  QuoteRequestStatus { Pending, Processing, Completed, Cancelled }
}

status_enum! {
  QuoteStatus { Pending, Accepted, Rejected, Expired }
}

status_enum! {
  BookingStatus { Pending, Confirmed, Cancelled, Completed }
}

status_enum! {
  /// Aggregate payment state of a booking.
  PaymentStatus { Pending, Partial, Completed, Refunded }
}

status_enum! {
  /// State of a single payment transaction.
  TransactionStatus { Pending, Completed, Failed, Refunded }
}

/// Accommodation standard requested in a quote request.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
  strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccommodationType {
  Economique,
  #[default]
  Standard,
  Superieur,
  Luxe,
}

// ─── Quote requests ──────────────────────────────────────────────────────────

/// A traveler-submitted trip brief sent to the agencies serving a destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
  pub id:                 i64,
  pub user_id:            i64,
  pub destination_id:     i64,
  pub departure_date:     Option<NaiveDate>,
  /// Free text from the quote form, e.g. `"8-14 jours"`.
  pub duration:           Option<String>,
  pub travelers_count:    i64,
  pub budget:             Option<f64>,
  pub accommodation_type: Option<AccommodationType>,
  pub message:            Option<String>,
  pub status:             QuoteRequestStatus,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuoteRequest {
  pub user_id:            i64,
  pub destination_id:     i64,
  pub departure_date:     Option<NaiveDate>,
  pub duration:           Option<String>,
  pub travelers_count:    i64,
  pub budget:             Option<f64>,
  pub accommodation_type: Option<AccommodationType>,
  pub message:            Option<String>,
  pub status:             QuoteRequestStatus,
}

// ─── Quotes ──────────────────────────────────────────────────────────────────

/// An agency's priced answer to a quote request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
  pub id:               i64,
  pub quote_request_id: i64,
  pub agency_id:        i64,
  pub price:            f64,
  pub description:      Option<String>,
  /// Days the offer stays valid after `created_at`.
  pub validity_period:  i64,
  pub status:           QuoteStatus,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

impl Quote {
  /// Whether the offer is past its validity window at `now`. A window that
  /// ends beyond the representable range never lapses.
  pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
    self.expires_at().is_some_and(|end| end < now)
  }

  /// End of the validity window, `None` when it cannot be represented.
  pub fn expires_at(&self) -> Option<DateTime<Utc>> {
    chrono::TimeDelta::try_days(self.validity_period)
      .and_then(|window| self.created_at.checked_add_signed(window))
  }
}

#[derive(Debug, Clone)]
pub struct NewQuote {
  pub quote_request_id: i64,
  pub agency_id:        i64,
  pub price:            f64,
  pub description:      Option<String>,
  pub validity_period:  i64,
  pub status:           QuoteStatus,
}

// ─── Bookings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
  pub id:             i64,
  pub user_id:        i64,
  pub quote_id:       i64,
  pub total_price:    f64,
  pub status:         BookingStatus,
  pub payment_status: PaymentStatus,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
  pub user_id:        i64,
  pub quote_id:       i64,
  pub total_price:    f64,
  pub status:         BookingStatus,
  pub payment_status: PaymentStatus,
}

// ─── Payments ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
  pub id:             i64,
  pub booking_id:     i64,
  pub amount:         f64,
  pub payment_method: String,
  pub transaction_id: Option<String>,
  pub status:         TransactionStatus,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
  pub booking_id:     i64,
  pub amount:         f64,
  pub payment_method: String,
  pub transaction_id: Option<String>,
  pub status:         TransactionStatus,
}

/// Derive a booking's payment status from its payment history.
///
/// Any refunded transaction marks the booking refunded; otherwise the sum of
/// completed transactions is compared against `total`.
pub fn payment_status_for(total: f64, payments: &[Payment]) -> PaymentStatus {
  if payments.iter().any(|p| p.status == TransactionStatus::Refunded) {
    return PaymentStatus::Refunded;
  }
  let paid: f64 = payments
    .iter()
    .filter(|p| p.status == TransactionStatus::Completed)
    .map(|p| p.amount)
    .sum();
  if paid <= 0.0 {
    PaymentStatus::Pending
  } else if paid < total {
    PaymentStatus::Partial
  } else {
    PaymentStatus::Completed
  }
}
