//! [`SqliteStore`], the SQLite implementation of [`MarketplaceStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, Params, params, types::Value};

use escale_core::{
  catalog::{
    Agency, Destination, DestinationHighlight, Itinerary, NewAgency, NewDestination,
    NewItinerary, NewTheme, Theme,
  },
  messaging::{Conversation, Message, NewConversation, NewMessage, NewReview, Review},
  search::{
    DestinationQuery, NewSearch, SearchHistory, SearchPreference, SearchPreferenceUpdate,
  },
  session::{NewSession, Session},
  store::MarketplaceStore,
  trip::{
    Booking, NewBooking, NewPayment, NewQuote, NewQuoteRequest, Payment, Quote,
    QuoteRequest, QuoteRequestStatus, QuoteStatus, payment_status_for,
  },
  user::{NewUser, User, UserUpdate},
};

use crate::{
  Error, Result,
  encode::{
    Assignments, FromRow, encode_date, encode_dt, now, preference_assignments,
    user_assignments,
  },
  query::{destination_search, name_search, register_functions},
  schema::SCHEMA,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn fetch_all<T: FromRow>(
  conn: &Connection,
  sql: &str,
  params: impl Params,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map(params, T::from_row)?.collect();
  rows
}

pub(crate) fn fetch_one<T: FromRow>(
  conn: &Connection,
  sql: &str,
  params: impl Params,
) -> rusqlite::Result<Option<T>> {
  conn.query_row(sql, params, T::from_row).optional()
}

/// `UPDATE table SET … , updated_at = now WHERE key = key_value`.
fn update_columns(
  conn: &Connection,
  table: &str,
  key: &str,
  key_value: i64,
  mut assignments: Assignments,
) -> rusqlite::Result<usize> {
  assignments.push(("updated_at", Value::Text(encode_dt(now()))));
  let set = assignments
    .iter()
    .map(|(column, _)| format!("{column} = ?"))
    .collect::<Vec<_>>()
    .join(", ");
  let sql = format!("UPDATE {table} SET {set} WHERE {key} = ?");
  let values = assignments
    .into_iter()
    .map(|(_, value)| value)
    .chain(std::iter::once(Value::Integer(key_value)));
  conn.execute(&sql, rusqlite::params_from_iter(values))
}

fn count(n: i64) -> usize { usize::try_from(n).unwrap_or_default() }

// ─── Catalogue inserts ───────────────────────────────────────────────────────
//
// Shared by the trait methods and the demo seed, which runs them inside one
// transaction.

pub(crate) fn insert_user(
  conn: &Connection,
  input: &NewUser,
  at: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO users (
       email, password_hash, first_name, last_name, phone, role,
       created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    params![
      input.email,
      input.password_hash,
      input.first_name,
      input.last_name,
      input.phone,
      input.role.to_string(),
      at,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_destination(
  conn: &Connection,
  input: &NewDestination,
  at: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO destinations (
       name, slug, description, long_description, continent, country,
       image_url, climate, best_time_to_visit, languages, currency,
       recommended_duration, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
    params![
      input.name,
      input.slug,
      input.description,
      input.long_description,
      input.continent,
      input.country,
      input.image_url,
      input.climate,
      input.best_time_to_visit,
      input.languages,
      input.currency,
      input.recommended_duration,
      at,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_highlight(
  conn: &Connection,
  destination_id: i64,
  highlight: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO destination_highlights (destination_id, highlight) VALUES (?1, ?2)",
    params![destination_id, highlight],
  )?;
  Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_theme(
  conn: &Connection,
  input: &NewTheme,
  at: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO themes (name, slug, description, image_url, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    params![input.name, input.slug, input.description, input.image_url, at],
  )?;
  Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_agency(
  conn: &Connection,
  input: &NewAgency,
  at: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO agencies (
       user_id, name, description, location, logo_url, cover_image_url,
       rating, reviews_count, is_verified, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
    params![
      input.user_id,
      input.name,
      input.description,
      input.location,
      input.logo_url,
      input.cover_image_url,
      input.rating,
      input.reviews_count,
      input.is_verified,
      at,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub(crate) fn link_agency(
  conn: &Connection,
  agency_id: i64,
  destination_id: i64,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT OR IGNORE INTO agency_destinations (agency_id, destination_id) VALUES (?1, ?2)",
    params![agency_id, destination_id],
  )?;
  Ok(())
}

pub(crate) fn insert_itinerary(
  conn: &Connection,
  input: &NewItinerary,
  at: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO itineraries (
       agency_id, destination_id, title, description, duration, price_from,
       image_url, is_featured, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
    params![
      input.agency_id,
      input.destination_id,
      input.title,
      input.description,
      input.duration,
      input.price_from,
      input.image_url,
      input.is_featured,
      at,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub(crate) fn tag_theme(
  conn: &Connection,
  itinerary_id: i64,
  theme_id: i64,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT OR IGNORE INTO itinerary_themes (itinerary_id, theme_id) VALUES (?1, ?2)",
    params![itinerary_id, theme_id],
  )?;
  Ok(())
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Escale marketplace store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── MarketplaceStore impl ───────────────────────────────────────────────────

impl MarketplaceStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let at = now();
    let at_str = encode_dt(at);

    let (id, input) = self
      .conn
      .call(move |conn| {
        let id = insert_user(conn, &input, &at_str)?;
        Ok((id, input))
      })
      .await?;

    Ok(User {
      id,
      email:         input.email,
      password_hash: input.password_hash,
      first_name:    input.first_name,
      last_name:     input.last_name,
      phone:         input.phone,
      role:          input.role,
      created_at:    at,
      updated_at:    at,
    })
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(fetch_one(conn, "SELECT * FROM users WHERE id = ?1", [id])?))
        .await?,
    )
  }

  async fn get_user_by_email<'a>(&'a self, email: &'a str) -> Result<Option<User>> {
    let email = email.trim().to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_one(conn, "SELECT * FROM users WHERE email = ?1", [email])?)
        })
        .await?,
    )
  }

  async fn update_user(&self, id: i64, update: UserUpdate) -> Result<bool> {
    if update.is_empty() {
      return Ok(false);
    }
    let assignments = user_assignments(update);
    let changed = self
      .conn
      .call(move |conn| Ok(update_columns(conn, "users", "id", id, assignments)?))
      .await?;
    Ok(changed > 0)
  }

  // ── Destinations & themes ─────────────────────────────────────────────────

  async fn create_destination(&self, input: NewDestination) -> Result<Destination> {
    let at = now();
    let at_str = encode_dt(at);

    let (id, input) = self
      .conn
      .call(move |conn| {
        let id = insert_destination(conn, &input, &at_str)?;
        Ok((id, input))
      })
      .await?;

    Ok(Destination {
      id,
      name:                 input.name,
      slug:                 input.slug,
      description:          input.description,
      long_description:     input.long_description,
      continent:            input.continent,
      country:              input.country,
      image_url:            input.image_url,
      climate:              input.climate,
      best_time_to_visit:   input.best_time_to_visit,
      languages:            input.languages,
      currency:             input.currency,
      recommended_duration: input.recommended_duration,
      created_at:           at,
      updated_at:           at,
    })
  }

  async fn add_highlight(
    &self,
    destination_id: i64,
    highlight: String,
  ) -> Result<DestinationHighlight> {
    let (id, highlight) = self
      .conn
      .call(move |conn| {
        let id = insert_highlight(conn, destination_id, &highlight)?;
        Ok((id, highlight))
      })
      .await?;

    Ok(DestinationHighlight { id, destination_id, highlight })
  }

  async fn list_destinations(&self) -> Result<Vec<Destination>> {
    Ok(
      self
        .conn
        .call(|conn| {
          Ok(fetch_all(conn, "SELECT * FROM destinations ORDER BY name, id", [])?)
        })
        .await?,
    )
  }

  async fn get_destination(&self, id: i64) -> Result<Option<Destination>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_one(conn, "SELECT * FROM destinations WHERE id = ?1", [id])?)
        })
        .await?,
    )
  }

  async fn get_destination_by_slug<'a>(&'a self, slug: &'a str) -> Result<Option<Destination>> {
    let slug = slug.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_one(conn, "SELECT * FROM destinations WHERE slug = ?1", [slug])?)
        })
        .await?,
    )
  }

  async fn destination_highlights(
    &self,
    destination_id: i64,
  ) -> Result<Vec<DestinationHighlight>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM destination_highlights WHERE destination_id = ?1 ORDER BY id",
            [destination_id],
          )?)
        })
        .await?,
    )
  }

  async fn search_destinations<'a>(&'a self, text: &'a str) -> Result<Vec<Destination>> {
    let (sql, values) = name_search(text);
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(conn, &sql, rusqlite::params_from_iter(values))?)
        })
        .await?,
    )
  }

  async fn advanced_search<'a>(
    &'a self,
    query: &'a DestinationQuery,
  ) -> Result<Vec<Destination>> {
    query.validate()?;
    let (sql, values) = destination_search(query);
    tracing::debug!(%sql, params = values.len(), "destination search");

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(conn, &sql, rusqlite::params_from_iter(values))?)
        })
        .await?,
    )
  }

  async fn create_theme(&self, input: NewTheme) -> Result<Theme> {
    let at = now();
    let at_str = encode_dt(at);

    let (id, input) = self
      .conn
      .call(move |conn| {
        let id = insert_theme(conn, &input, &at_str)?;
        Ok((id, input))
      })
      .await?;

    Ok(Theme {
      id,
      name:        input.name,
      slug:        input.slug,
      description: input.description,
      image_url:   input.image_url,
      created_at:  at,
      updated_at:  at,
    })
  }

  async fn list_themes(&self) -> Result<Vec<Theme>> {
    Ok(
      self
        .conn
        .call(|conn| Ok(fetch_all(conn, "SELECT * FROM themes ORDER BY name, id", [])?))
        .await?,
    )
  }

  async fn get_theme_by_slug<'a>(&'a self, slug: &'a str) -> Result<Option<Theme>> {
    let slug = slug.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| Ok(fetch_one(conn, "SELECT * FROM themes WHERE slug = ?1", [slug])?))
        .await?,
    )
  }

  // ── Agencies & itineraries ────────────────────────────────────────────────

  async fn create_agency(&self, input: NewAgency) -> Result<Agency> {
    let at = now();
    let at_str = encode_dt(at);

    let (id, input) = self
      .conn
      .call(move |conn| {
        let id = insert_agency(conn, &input, &at_str)?;
        Ok((id, input))
      })
      .await?;

    Ok(Agency {
      id,
      user_id:         input.user_id,
      name:            input.name,
      description:     input.description,
      location:        input.location,
      logo_url:        input.logo_url,
      cover_image_url: input.cover_image_url,
      rating:          input.rating,
      reviews_count:   input.reviews_count,
      is_verified:     input.is_verified,
      created_at:      at,
      updated_at:      at,
    })
  }

  async fn get_agency(&self, id: i64) -> Result<Option<Agency>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(fetch_one(conn, "SELECT * FROM agencies WHERE id = ?1", [id])?))
        .await?,
    )
  }

  async fn get_agency_by_user(&self, user_id: i64) -> Result<Option<Agency>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_one(
            conn,
            "SELECT * FROM agencies WHERE user_id = ?1 ORDER BY id LIMIT 1",
            [user_id],
          )?)
        })
        .await?,
    )
  }

  async fn link_agency_destination(&self, agency_id: i64, destination_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        link_agency(conn, agency_id, destination_id)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn agencies_for_destination(&self, destination_id: i64) -> Result<Vec<Agency>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT a.* FROM agencies a
             JOIN agency_destinations ad ON ad.agency_id = a.id
             WHERE ad.destination_id = ?1
             ORDER BY a.rating DESC, a.id",
            [destination_id],
          )?)
        })
        .await?,
    )
  }

  async fn create_itinerary(&self, input: NewItinerary) -> Result<Itinerary> {
    let at = now();
    let at_str = encode_dt(at);

    let (id, input) = self
      .conn
      .call(move |conn| {
        let id = insert_itinerary(conn, &input, &at_str)?;
        Ok((id, input))
      })
      .await?;

    Ok(Itinerary {
      id,
      agency_id:      input.agency_id,
      destination_id: input.destination_id,
      title:          input.title,
      description:    input.description,
      duration:       input.duration,
      price_from:     input.price_from,
      image_url:      input.image_url,
      is_featured:    input.is_featured,
      created_at:     at,
      updated_at:     at,
    })
  }

  async fn tag_itinerary(&self, itinerary_id: i64, theme_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        tag_theme(conn, itinerary_id, theme_id)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn itineraries_for_destination(&self, destination_id: i64) -> Result<Vec<Itinerary>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM itineraries WHERE destination_id = ?1
             ORDER BY is_featured DESC, price_from, id",
            [destination_id],
          )?)
        })
        .await?,
    )
  }

  // ── Quote requests & quotes ───────────────────────────────────────────────

  async fn create_quote_request(&self, input: NewQuoteRequest) -> Result<QuoteRequest> {
    let at = now();
    let at_str = encode_dt(at);
    let departure = input.departure_date.map(encode_date);
    let accommodation = input.accommodation_type.map(|a| a.to_string());
    let status = input.status.to_string();

    let (id, input) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO quote_requests (
             user_id, destination_id, departure_date, duration, travelers_count,
             budget, accommodation_type, message, status, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
          params![
            input.user_id,
            input.destination_id,
            departure,
            input.duration,
            input.travelers_count,
            input.budget,
            accommodation,
            input.message,
            status,
            at_str,
          ],
        )?;
        Ok((conn.last_insert_rowid(), input))
      })
      .await?;

    Ok(QuoteRequest {
      id,
      user_id:            input.user_id,
      destination_id:     input.destination_id,
      departure_date:     input.departure_date,
      duration:           input.duration,
      travelers_count:    input.travelers_count,
      budget:             input.budget,
      accommodation_type: input.accommodation_type,
      message:            input.message,
      status:             input.status,
      created_at:         at,
      updated_at:         at,
    })
  }

  async fn get_quote_request(&self, id: i64) -> Result<Option<QuoteRequest>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_one(conn, "SELECT * FROM quote_requests WHERE id = ?1", [id])?)
        })
        .await?,
    )
  }

  async fn quote_requests_for_user(&self, user_id: i64) -> Result<Vec<QuoteRequest>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM quote_requests WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
            [user_id],
          )?)
        })
        .await?,
    )
  }

  async fn quote_requests_for_agency(&self, agency_id: i64) -> Result<Vec<QuoteRequest>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM quote_requests
             WHERE destination_id IN (
               SELECT destination_id FROM agency_destinations WHERE agency_id = ?1
             )
             ORDER BY created_at DESC, id DESC",
            [agency_id],
          )?)
        })
        .await?,
    )
  }

  async fn set_quote_request_status(&self, id: i64, status: QuoteRequestStatus) -> Result<bool> {
    let assignments = vec![("status", Value::Text(status.to_string()))];
    let changed = self
      .conn
      .call(move |conn| Ok(update_columns(conn, "quote_requests", "id", id, assignments)?))
      .await?;
    Ok(changed > 0)
  }

  async fn create_quote(&self, input: NewQuote) -> Result<Quote> {
    let at = now();
    let at_str = encode_dt(at);
    let status = input.status.to_string();

    let (id, input) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO quotes (
             quote_request_id, agency_id, price, description, validity_period,
             status, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          params![
            input.quote_request_id,
            input.agency_id,
            input.price,
            input.description,
            input.validity_period,
            status,
            at_str,
          ],
        )?;
        Ok((conn.last_insert_rowid(), input))
      })
      .await?;

    Ok(Quote {
      id,
      quote_request_id: input.quote_request_id,
      agency_id:        input.agency_id,
      price:            input.price,
      description:      input.description,
      validity_period:  input.validity_period,
      status:           input.status,
      created_at:       at,
      updated_at:       at,
    })
  }

  async fn get_quote(&self, id: i64) -> Result<Option<Quote>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(fetch_one(conn, "SELECT * FROM quotes WHERE id = ?1", [id])?))
        .await?,
    )
  }

  async fn quotes_for_request(&self, quote_request_id: i64) -> Result<Vec<Quote>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM quotes WHERE quote_request_id = ?1
             ORDER BY created_at DESC, id DESC",
            [quote_request_id],
          )?)
        })
        .await?,
    )
  }

  async fn set_quote_status(&self, id: i64, status: QuoteStatus) -> Result<bool> {
    let assignments = vec![("status", Value::Text(status.to_string()))];
    let changed = self
      .conn
      .call(move |conn| Ok(update_columns(conn, "quotes", "id", id, assignments)?))
      .await?;
    Ok(changed > 0)
  }

  // ── Bookings & payments ───────────────────────────────────────────────────

  async fn create_booking(&self, input: NewBooking) -> Result<Booking> {
    let at = now();
    let at_str = encode_dt(at);
    let status = input.status.to_string();
    let payment_status = input.payment_status.to_string();

    let (id, input) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO bookings (
             user_id, quote_id, total_price, status, payment_status,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          params![
            input.user_id,
            input.quote_id,
            input.total_price,
            status,
            payment_status,
            at_str,
          ],
        )?;
        Ok((conn.last_insert_rowid(), input))
      })
      .await?;

    Ok(Booking {
      id,
      user_id:        input.user_id,
      quote_id:       input.quote_id,
      total_price:    input.total_price,
      status:         input.status,
      payment_status: input.payment_status,
      created_at:     at,
      updated_at:     at,
    })
  }

  async fn get_booking(&self, id: i64) -> Result<Option<Booking>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(fetch_one(conn, "SELECT * FROM bookings WHERE id = ?1", [id])?))
        .await?,
    )
  }

  async fn bookings_for_user(&self, user_id: i64) -> Result<Vec<Booking>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM bookings WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
            [user_id],
          )?)
        })
        .await?,
    )
  }

  async fn record_payment(&self, input: NewPayment) -> Result<Payment> {
    let at = now();
    let at_str = encode_dt(at);
    let booking_id = input.booking_id;
    let status = input.status.to_string();

    let recorded = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(booking) =
          fetch_one::<Booking>(&tx, "SELECT * FROM bookings WHERE id = ?1", [booking_id])?
        else {
          return Ok(None);
        };

        tx.execute(
          "INSERT INTO payments (
             booking_id, amount, payment_method, transaction_id, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![
            input.booking_id,
            input.amount,
            input.payment_method,
            input.transaction_id,
            status,
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();

        let history: Vec<Payment> = fetch_all(
          &tx,
          "SELECT * FROM payments WHERE booking_id = ?1 ORDER BY created_at, id",
          [booking_id],
        )?;
        let payment_status = payment_status_for(booking.total_price, &history);
        update_columns(
          &tx,
          "bookings",
          "id",
          booking_id,
          vec![("payment_status", Value::Text(payment_status.to_string()))],
        )?;
        tx.commit()?;
        Ok(Some((id, input)))
      })
      .await?;

    let Some((id, input)) = recorded else {
      return Err(Error::NotFound { entity: "booking", id: booking_id });
    };

    Ok(Payment {
      id,
      booking_id,
      amount:         input.amount,
      payment_method: input.payment_method,
      transaction_id: input.transaction_id,
      status:         input.status,
      created_at:     at,
    })
  }

  async fn payments_for_booking(&self, booking_id: i64) -> Result<Vec<Payment>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM payments WHERE booking_id = ?1 ORDER BY created_at, id",
            [booking_id],
          )?)
        })
        .await?,
    )
  }

  // ── Conversations & messages ──────────────────────────────────────────────

  async fn create_conversation(&self, input: NewConversation) -> Result<Conversation> {
    let at = now();
    let at_str = encode_dt(at);

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO conversations (
             traveler_id, agency_id, quote_request_id, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?4)",
          params![input.traveler_id, input.agency_id, input.quote_request_id, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Conversation {
      id,
      traveler_id:      input.traveler_id,
      agency_id:        input.agency_id,
      quote_request_id: input.quote_request_id,
      created_at:       at,
      updated_at:       at,
    })
  }

  async fn get_conversation(&self, id: i64) -> Result<Option<Conversation>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_one(conn, "SELECT * FROM conversations WHERE id = ?1", [id])?)
        })
        .await?,
    )
  }

  async fn conversations_for_user(&self, user_id: i64) -> Result<Vec<Conversation>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM conversations
             WHERE traveler_id = ?1
                OR agency_id IN (SELECT id FROM agencies WHERE user_id = ?1)
             ORDER BY updated_at DESC, id DESC",
            [user_id],
          )?)
        })
        .await?,
    )
  }

  async fn create_message(&self, input: NewMessage) -> Result<Message> {
    let at = now();
    let at_str = encode_dt(at);

    let (id, input) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO messages (conversation_id, sender_id, content, is_read, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![
            input.conversation_id,
            input.sender_id,
            input.content,
            input.is_read,
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
          "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
          params![input.conversation_id, at_str],
        )?;
        tx.commit()?;
        Ok((id, input))
      })
      .await?;

    Ok(Message {
      id,
      conversation_id: input.conversation_id,
      sender_id:       input.sender_id,
      content:         input.content,
      is_read:         input.is_read,
      created_at:      at,
    })
  }

  async fn messages_for_conversation(&self, conversation_id: i64) -> Result<Vec<Message>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY created_at, id",
            [conversation_id],
          )?)
        })
        .await?,
    )
  }

  async fn mark_conversation_read(&self, conversation_id: i64, reader_id: i64) -> Result<usize> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.execute(
            "UPDATE messages SET is_read = 1
             WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0",
            params![conversation_id, reader_id],
          )?)
        })
        .await?,
    )
  }

  async fn unread_count(&self, conversation_id: i64, reader_id: i64) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM messages
           WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0",
          params![conversation_id, reader_id],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count(n))
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  async fn create_review(&self, input: NewReview) -> Result<Review> {
    let at = now();
    let at_str = encode_dt(at);

    let (id, input) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO reviews (
             user_id, agency_id, booking_id, rating, title, content, is_verified,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          params![
            input.user_id,
            input.agency_id,
            input.booking_id,
            input.rating,
            input.title,
            input.content,
            input.is_verified,
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
          "UPDATE agencies SET
             rating        = (SELECT COALESCE(AVG(rating), 0) FROM reviews WHERE agency_id = ?1),
             reviews_count = (SELECT COUNT(*) FROM reviews WHERE agency_id = ?1),
             updated_at    = ?2
           WHERE id = ?1",
          params![input.agency_id, at_str],
        )?;
        tx.commit()?;
        Ok((id, input))
      })
      .await?;

    Ok(Review {
      id,
      user_id:     input.user_id,
      agency_id:   input.agency_id,
      booking_id:  input.booking_id,
      rating:      input.rating,
      title:       input.title,
      content:     input.content,
      is_verified: input.is_verified,
      created_at:  at,
      updated_at:  at,
    })
  }

  async fn reviews_for_agency(&self, agency_id: i64) -> Result<Vec<Review>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM reviews WHERE agency_id = ?1 ORDER BY created_at DESC, id DESC",
            [agency_id],
          )?)
        })
        .await?,
    )
  }

  // ── Search history & preferences ──────────────────────────────────────────

  async fn save_search(&self, input: NewSearch) -> Result<SearchHistory> {
    let at = now();
    let at_str = encode_dt(at);

    let (id, input) = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO search_history (user_id, search_query, filters, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![input.user_id, input.search_query, input.filters, at_str],
        )?;
        Ok((conn.last_insert_rowid(), input))
      })
      .await?;

    Ok(SearchHistory {
      id,
      user_id:      input.user_id,
      search_query: input.search_query,
      filters:      input.filters,
      created_at:   at,
    })
  }

  async fn search_history_for_user(
    &self,
    user_id: i64,
    limit: usize,
  ) -> Result<Vec<SearchHistory>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_all(
            conn,
            "SELECT * FROM search_history WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
            [user_id, limit],
          )?)
        })
        .await?,
    )
  }

  async fn update_search_preferences(
    &self,
    user_id: i64,
    update: SearchPreferenceUpdate,
  ) -> Result<bool> {
    let at_str = encode_dt(now());

    Ok(
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let exists = tx
            .query_row(
              "SELECT 1 FROM search_preferences WHERE user_id = ?1",
              [user_id],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

          let written = if exists {
            if update.is_empty() {
              false
            } else {
              let assignments = preference_assignments(update);
              update_columns(&tx, "search_preferences", "user_id", user_id, assignments)? > 0
            }
          } else {
            tx.execute(
              "INSERT INTO search_preferences (
                 user_id, preferred_destinations, preferred_themes, preferred_duration,
                 preferred_budget_min, preferred_budget_max,
                 preferred_accommodation_types, created_at, updated_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
              params![
                user_id,
                update.preferred_destinations,
                update.preferred_themes,
                update.preferred_duration,
                update.preferred_budget_min,
                update.preferred_budget_max,
                update.preferred_accommodation_types,
                at_str,
              ],
            )?;
            true
          };
          tx.commit()?;
          Ok(written)
        })
        .await?,
    )
  }

  async fn get_search_preferences(&self, user_id: i64) -> Result<Option<SearchPreference>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(fetch_one(
            conn,
            "SELECT * FROM search_preferences WHERE user_id = ?1",
            [user_id],
          )?)
        })
        .await?,
    )
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, input: NewSession) -> Result<Session> {
    let at = now();
    let at_str = encode_dt(at);
    let expires_str = encode_dt(input.expires_at);

    let input = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![input.token_hash, input.user_id, at_str, expires_str],
        )?;
        Ok(input)
      })
      .await?;

    Ok(Session {
      token_hash: input.token_hash,
      user_id:    input.user_id,
      created_at: at,
      expires_at: input.expires_at,
    })
  }

  async fn session_user<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> Result<Option<User>> {
    let token_hash = token_hash.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          let session: Option<Session> =
            fetch_one(conn, "SELECT * FROM sessions WHERE token_hash = ?1", [token_hash])?;
          let Some(session) = session.filter(|s| !s.is_expired(now)) else {
            return Ok(None);
          };
          Ok(fetch_one(conn, "SELECT * FROM users WHERE id = ?1", [session.user_id])?)
        })
        .await?,
    )
  }

  async fn delete_session<'a>(&'a self, token_hash: &'a str) -> Result<bool> {
    let token_hash = token_hash.to_owned();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
    let now_str = encode_dt(now);
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now_str])?)
        })
        .await?,
    )
  }
}
