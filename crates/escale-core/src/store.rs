//! The `MarketplaceStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `escale-store-sqlite`).
//! Higher layers (`escale-api`, `escale-server`) depend on this abstraction,
//! not on any concrete backend.
//!
//! Every operation is a single query or a short statement batch. Referential
//! integrity is the backend's job; a dangling foreign key surfaces as
//! `Self::Error`.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  catalog::{
    Agency, Destination, DestinationHighlight, DestinationPage, Itinerary,
    NewAgency, NewDestination, NewItinerary, NewTheme, Theme,
  },
  messaging::{
    Conversation, Message, NewConversation, NewMessage, NewReview, Review,
  },
  search::{
    DestinationQuery, NewSearch, SearchHistory, SearchPreference,
    SearchPreferenceUpdate,
  },
  session::{NewSession, Session},
  trip::{
    Booking, NewBooking, NewPayment, NewQuote, NewQuoteRequest, Payment, Quote,
    QuoteRequest, QuoteRequestStatus, QuoteStatus,
  },
  user::{NewUser, User, UserUpdate},
};

/// Abstraction over an Escale marketplace backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait MarketplaceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Exact match on the stored (normalised) email.
  fn get_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Write the provided fields and refresh `updated_at`.
  ///
  /// Returns `false` without touching the row when `update` is empty, and
  /// `false` when no user has this id.
  fn update_user(
    &self,
    id: i64,
    update: UserUpdate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Destinations & themes ─────────────────────────────────────────────

  fn create_destination(
    &self,
    input: NewDestination,
  ) -> impl Future<Output = Result<Destination, Self::Error>> + Send + '_;

  fn add_highlight(
    &self,
    destination_id: i64,
    highlight: String,
  ) -> impl Future<Output = Result<DestinationHighlight, Self::Error>> + Send + '_;

  /// All destinations ordered by name.
  fn list_destinations(
    &self,
  ) -> impl Future<Output = Result<Vec<Destination>, Self::Error>> + Send + '_;

  fn get_destination(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Destination>, Self::Error>> + Send + '_;

  fn get_destination_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Destination>, Self::Error>> + Send + 'a;

  fn destination_highlights(
    &self,
    destination_id: i64,
  ) -> impl Future<Output = Result<Vec<DestinationHighlight>, Self::Error>> + Send + '_;

  /// Destinations matching every filter in `query`, distinct and ordered by
  /// name. See [`DestinationQuery`] for the matching rules.
  fn advanced_search<'a>(
    &'a self,
    query: &'a DestinationQuery,
  ) -> impl Future<Output = Result<Vec<Destination>, Self::Error>> + Send + 'a;

  /// Case-insensitive substring search over name, country and continent.
  /// Blank text lists everything.
  fn search_destinations<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<Vec<Destination>, Self::Error>> + Send + 'a;

  /// Continent and/or theme filter.
  fn filter_destinations(
    &self,
    continent: Option<String>,
    theme: Option<String>,
  ) -> impl Future<Output = Result<Vec<Destination>, Self::Error>> + Send + '_ {
    async move {
      let query = DestinationQuery { continent, theme, ..DestinationQuery::default() };
      self.advanced_search(&query).await
    }
  }

  fn create_theme(
    &self,
    input: NewTheme,
  ) -> impl Future<Output = Result<Theme, Self::Error>> + Send + '_;

  /// All themes ordered by name.
  fn list_themes(&self) -> impl Future<Output = Result<Vec<Theme>, Self::Error>> + Send + '_;

  fn get_theme_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Theme>, Self::Error>> + Send + 'a;

  // ── Agencies & itineraries ────────────────────────────────────────────

  fn create_agency(
    &self,
    input: NewAgency,
  ) -> impl Future<Output = Result<Agency, Self::Error>> + Send + '_;

  fn get_agency(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Agency>, Self::Error>> + Send + '_;

  /// The agency an agency-role user speaks for.
  fn get_agency_by_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Option<Agency>, Self::Error>> + Send + '_;

  /// Declare that `agency_id` serves `destination_id`. Idempotent.
  fn link_agency_destination(
    &self,
    agency_id: i64,
    destination_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Agencies serving a destination, best rated first.
  fn agencies_for_destination(
    &self,
    destination_id: i64,
  ) -> impl Future<Output = Result<Vec<Agency>, Self::Error>> + Send + '_;

  fn create_itinerary(
    &self,
    input: NewItinerary,
  ) -> impl Future<Output = Result<Itinerary, Self::Error>> + Send + '_;

  /// Attach a theme to an itinerary. Idempotent.
  fn tag_itinerary(
    &self,
    itinerary_id: i64,
    theme_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Itineraries for a destination: featured first, then cheapest first.
  fn itineraries_for_destination(
    &self,
    destination_id: i64,
  ) -> impl Future<Output = Result<Vec<Itinerary>, Self::Error>> + Send + '_;

  /// Assemble the destination page for an id or a slug. Returns `None` if
  /// the destination does not exist.
  fn destination_page<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<DestinationPage>, Self::Error>> + Send + 'a {
    async move {
      let destination = match key.parse::<i64>() {
        Ok(id) => self.get_destination(id).await?,
        Err(_) => self.get_destination_by_slug(key).await?,
      };
      let Some(destination) = destination else {
        return Ok(None);
      };
      let highlights = self.destination_highlights(destination.id).await?;
      let agencies = self.agencies_for_destination(destination.id).await?;
      let itineraries = self.itineraries_for_destination(destination.id).await?;
      Ok(Some(DestinationPage { destination, highlights, agencies, itineraries }))
    }
  }

  // ── Quote requests & quotes ───────────────────────────────────────────

  fn create_quote_request(
    &self,
    input: NewQuoteRequest,
  ) -> impl Future<Output = Result<QuoteRequest, Self::Error>> + Send + '_;

  fn get_quote_request(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<QuoteRequest>, Self::Error>> + Send + '_;

  /// A traveler's quote requests, newest first.
  fn quote_requests_for_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<QuoteRequest>, Self::Error>> + Send + '_;

  /// Quote requests for destinations the agency serves, newest first.
  fn quote_requests_for_agency(
    &self,
    agency_id: i64,
  ) -> impl Future<Output = Result<Vec<QuoteRequest>, Self::Error>> + Send + '_;

  /// Returns `false` when no quote request has this id.
  fn set_quote_request_status(
    &self,
    id: i64,
    status: QuoteRequestStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn create_quote(
    &self,
    input: NewQuote,
  ) -> impl Future<Output = Result<Quote, Self::Error>> + Send + '_;

  fn get_quote(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Quote>, Self::Error>> + Send + '_;

  /// Quotes answering one request, newest first.
  fn quotes_for_request(
    &self,
    quote_request_id: i64,
  ) -> impl Future<Output = Result<Vec<Quote>, Self::Error>> + Send + '_;

  fn set_quote_status(
    &self,
    id: i64,
    status: QuoteStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Bookings & payments ───────────────────────────────────────────────

  fn create_booking(
    &self,
    input: NewBooking,
  ) -> impl Future<Output = Result<Booking, Self::Error>> + Send + '_;

  fn get_booking(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Booking>, Self::Error>> + Send + '_;

  /// A traveler's bookings, newest first.
  fn bookings_for_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<Booking>, Self::Error>> + Send + '_;

  /// Record a payment and recompute the booking's `payment_status` (see
  /// [`crate::trip::payment_status_for`]).
  fn record_payment(
    &self,
    input: NewPayment,
  ) -> impl Future<Output = Result<Payment, Self::Error>> + Send + '_;

  /// Payments for a booking, oldest first.
  fn payments_for_booking(
    &self,
    booking_id: i64,
  ) -> impl Future<Output = Result<Vec<Payment>, Self::Error>> + Send + '_;

  // ── Conversations & messages ──────────────────────────────────────────

  fn create_conversation(
    &self,
    input: NewConversation,
  ) -> impl Future<Output = Result<Conversation, Self::Error>> + Send + '_;

  fn get_conversation(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Conversation>, Self::Error>> + Send + '_;

  /// Conversations where the user is the traveler or owns the agency, most
  /// recently active first.
  fn conversations_for_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<Conversation>, Self::Error>> + Send + '_;

  /// Insert a message and bump the conversation's `updated_at`.
  fn create_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// Messages of a conversation, oldest first.
  fn messages_for_conversation(
    &self,
    conversation_id: i64,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// Mark every message not sent by `reader_id` as read. Returns the number
  /// of messages that changed.
  fn mark_conversation_read(
    &self,
    conversation_id: i64,
    reader_id: i64,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Unread messages in a conversation that were not sent by `reader_id`.
  fn unread_count(
    &self,
    conversation_id: i64,
    reader_id: i64,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// Insert a review, then recompute the agency's average rating and review
  /// count.
  fn create_review(
    &self,
    input: NewReview,
  ) -> impl Future<Output = Result<Review, Self::Error>> + Send + '_;

  /// Reviews of an agency, newest first.
  fn reviews_for_agency(
    &self,
    agency_id: i64,
  ) -> impl Future<Output = Result<Vec<Review>, Self::Error>> + Send + '_;

  // ── Search history & preferences ──────────────────────────────────────

  fn save_search(
    &self,
    input: NewSearch,
  ) -> impl Future<Output = Result<SearchHistory, Self::Error>> + Send + '_;

  /// A user's most recent searches, newest first.
  fn search_history_for_user(
    &self,
    user_id: i64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SearchHistory>, Self::Error>> + Send + '_;

  /// Update the provided fields of an existing preference row, or insert a
  /// new one. Returns `false` when a row exists and `update` is empty.
  fn update_search_preferences(
    &self,
    user_id: i64,
    update: SearchPreferenceUpdate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn get_search_preferences(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Option<SearchPreference>, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// The user owning an unexpired session, if any.
  fn session_user<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Returns `false` when there was no such session.
  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete every session expired at `now`; returns how many were removed.
  fn purge_expired_sessions(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
