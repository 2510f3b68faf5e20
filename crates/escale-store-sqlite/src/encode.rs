//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with microsecond precision.
//! Status enums are stored as their snake_case names. Booleans are 0/1.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use escale_core::{
  catalog::{Agency, Destination, DestinationHighlight, Itinerary, Theme},
  messaging::{Conversation, Message, Review},
  search::{SearchHistory, SearchPreference, SearchPreferenceUpdate},
  session::Session,
  trip::{Booking, Payment, Quote, QuoteRequest},
  user::{User, UserUpdate},
};
use rusqlite::{
  Row,
  types::{Type, Value},
};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Current time truncated to what the store can represent, so a value read
/// back equals the value written.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

// ─── Column readers ──────────────────────────────────────────────────────────

fn conversion_failure<E>(row: &Row<'_>, column: &str, err: E) -> rusqlite::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  let idx = row.as_ref().column_index(column).unwrap_or_default();
  rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn dt_column(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
  let raw: String = row.get(column)?;
  DateTime::parse_from_rfc3339(&raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| conversion_failure(row, column, e))
}

fn date_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
  let raw: Option<String> = row.get(column)?;
  raw
    .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
    .transpose()
    .map_err(|e| conversion_failure(row, column, e))
}

/// Read a text column through the type's `FromStr` (status enums).
fn parsed_column<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  let raw: String = row.get(column)?;
  raw.parse().map_err(|e| conversion_failure(row, column, e))
}

fn opt_parsed_column<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<T>>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  let raw: Option<String> = row.get(column)?;
  raw
    .map(|s| s.parse())
    .transpose()
    .map_err(|e| conversion_failure(row, column, e))
}

// ─── Row mapping ─────────────────────────────────────────────────────────────

/// A domain type that can be read from a `SELECT *`-shaped row of its table.
pub trait FromRow: Sized {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl FromRow for User {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get("id")?,
      email:         row.get("email")?,
      password_hash: row.get("password_hash")?,
      first_name:    row.get("first_name")?,
      last_name:     row.get("last_name")?,
      phone:         row.get("phone")?,
      role:          parsed_column(row, "role")?,
      created_at:    dt_column(row, "created_at")?,
      updated_at:    dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for Agency {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get("id")?,
      user_id:         row.get("user_id")?,
      name:            row.get("name")?,
      description:     row.get("description")?,
      location:        row.get("location")?,
      logo_url:        row.get("logo_url")?,
      cover_image_url: row.get("cover_image_url")?,
      rating:          row.get("rating")?,
      reviews_count:   row.get("reviews_count")?,
      is_verified:     row.get("is_verified")?,
      created_at:      dt_column(row, "created_at")?,
      updated_at:      dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for Destination {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get("id")?,
      name:                 row.get("name")?,
      slug:                 row.get("slug")?,
      description:          row.get("description")?,
      long_description:     row.get("long_description")?,
      continent:            row.get("continent")?,
      country:              row.get("country")?,
      image_url:            row.get("image_url")?,
      climate:              row.get("climate")?,
      best_time_to_visit:   row.get("best_time_to_visit")?,
      languages:            row.get("languages")?,
      currency:             row.get("currency")?,
      recommended_duration: row.get("recommended_duration")?,
      created_at:           dt_column(row, "created_at")?,
      updated_at:           dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for DestinationHighlight {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get("id")?,
      destination_id: row.get("destination_id")?,
      highlight:      row.get("highlight")?,
    })
  }
}

impl FromRow for Theme {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get("id")?,
      name:        row.get("name")?,
      slug:        row.get("slug")?,
      description: row.get("description")?,
      image_url:   row.get("image_url")?,
      created_at:  dt_column(row, "created_at")?,
      updated_at:  dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for Itinerary {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get("id")?,
      agency_id:      row.get("agency_id")?,
      destination_id: row.get("destination_id")?,
      title:          row.get("title")?,
      description:    row.get("description")?,
      duration:       row.get("duration")?,
      price_from:     row.get("price_from")?,
      image_url:      row.get("image_url")?,
      is_featured:    row.get("is_featured")?,
      created_at:     dt_column(row, "created_at")?,
      updated_at:     dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for QuoteRequest {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get("id")?,
      user_id:            row.get("user_id")?,
      destination_id:     row.get("destination_id")?,
      departure_date:     date_column(row, "departure_date")?,
      duration:           row.get("duration")?,
      travelers_count:    row.get("travelers_count")?,
      budget:             row.get("budget")?,
      accommodation_type: opt_parsed_column(row, "accommodation_type")?,
      message:            row.get("message")?,
      status:             parsed_column(row, "status")?,
      created_at:         dt_column(row, "created_at")?,
      updated_at:         dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for Quote {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get("id")?,
      quote_request_id: row.get("quote_request_id")?,
      agency_id:        row.get("agency_id")?,
      price:            row.get("price")?,
      description:      row.get("description")?,
      validity_period:  row.get("validity_period")?,
      status:           parsed_column(row, "status")?,
      created_at:       dt_column(row, "created_at")?,
      updated_at:       dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for Booking {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get("id")?,
      user_id:        row.get("user_id")?,
      quote_id:       row.get("quote_id")?,
      total_price:    row.get("total_price")?,
      status:         parsed_column(row, "status")?,
      payment_status: parsed_column(row, "payment_status")?,
      created_at:     dt_column(row, "created_at")?,
      updated_at:     dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for Payment {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get("id")?,
      booking_id:     row.get("booking_id")?,
      amount:         row.get("amount")?,
      payment_method: row.get("payment_method")?,
      transaction_id: row.get("transaction_id")?,
      status:         parsed_column(row, "status")?,
      created_at:     dt_column(row, "created_at")?,
    })
  }
}

impl FromRow for Conversation {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get("id")?,
      traveler_id:      row.get("traveler_id")?,
      agency_id:        row.get("agency_id")?,
      quote_request_id: row.get("quote_request_id")?,
      created_at:       dt_column(row, "created_at")?,
      updated_at:       dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for Message {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get("id")?,
      conversation_id: row.get("conversation_id")?,
      sender_id:       row.get("sender_id")?,
      content:         row.get("content")?,
      is_read:         row.get("is_read")?,
      created_at:      dt_column(row, "created_at")?,
    })
  }
}

impl FromRow for Review {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get("id")?,
      user_id:     row.get("user_id")?,
      agency_id:   row.get("agency_id")?,
      booking_id:  row.get("booking_id")?,
      rating:      row.get("rating")?,
      title:       row.get("title")?,
      content:     row.get("content")?,
      is_verified: row.get("is_verified")?,
      created_at:  dt_column(row, "created_at")?,
      updated_at:  dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for SearchHistory {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get("id")?,
      user_id:      row.get("user_id")?,
      search_query: row.get("search_query")?,
      filters:      row.get("filters")?,
      created_at:   dt_column(row, "created_at")?,
    })
  }
}

impl FromRow for SearchPreference {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                            row.get("id")?,
      user_id:                       row.get("user_id")?,
      preferred_destinations:        row.get("preferred_destinations")?,
      preferred_themes:              row.get("preferred_themes")?,
      preferred_duration:            row.get("preferred_duration")?,
      preferred_budget_min:          row.get("preferred_budget_min")?,
      preferred_budget_max:          row.get("preferred_budget_max")?,
      preferred_accommodation_types: row.get("preferred_accommodation_types")?,
      created_at:                    dt_column(row, "created_at")?,
      updated_at:                    dt_column(row, "updated_at")?,
    })
  }
}

impl FromRow for Session {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      token_hash: row.get("token_hash")?,
      user_id:    row.get("user_id")?,
      created_at: dt_column(row, "created_at")?,
      expires_at: dt_column(row, "expires_at")?,
    })
  }
}

// ─── Partial updates ─────────────────────────────────────────────────────────

/// `(column, value)` pairs for an `UPDATE … SET` built from a partial update.
pub type Assignments = Vec<(&'static str, Value)>;

fn push_text(out: &mut Assignments, column: &'static str, value: Option<String>) {
  if let Some(v) = value {
    out.push((column, Value::Text(v)));
  }
}

fn push_real(out: &mut Assignments, column: &'static str, value: Option<f64>) {
  if let Some(v) = value {
    out.push((column, Value::Real(v)));
  }
}

pub fn user_assignments(update: UserUpdate) -> Assignments {
  let mut out = Assignments::new();
  push_text(&mut out, "email", update.email);
  push_text(&mut out, "password_hash", update.password_hash);
  push_text(&mut out, "first_name", update.first_name);
  push_text(&mut out, "last_name", update.last_name);
  if let Some(phone) = update.phone {
    out.push(("phone", phone.map_or(Value::Null, Value::Text)));
  }
  push_text(&mut out, "role", update.role.map(|r| r.to_string()));
  out
}

pub fn preference_assignments(update: SearchPreferenceUpdate) -> Assignments {
  let mut out = Assignments::new();
  push_text(&mut out, "preferred_destinations", update.preferred_destinations);
  push_text(&mut out, "preferred_themes", update.preferred_themes);
  push_text(&mut out, "preferred_duration", update.preferred_duration);
  push_real(&mut out, "preferred_budget_min", update.preferred_budget_min);
  push_real(&mut out, "preferred_budget_max", update.preferred_budget_max);
  push_text(
    &mut out,
    "preferred_accommodation_types",
    update.preferred_accommodation_types,
  );
  out
}
