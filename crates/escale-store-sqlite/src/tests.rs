//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, NaiveDate, Utc};
use escale_core::{
  catalog::{NewAgency, NewDestination, NewItinerary, NewTheme},
  messaging::{NewConversation, NewMessage, NewReview},
  search::{DestinationQuery, DurationRange, NewSearch, SearchPreferenceUpdate},
  session::NewSession,
  store::MarketplaceStore,
  trip::{
    AccommodationType, BookingStatus, NewBooking, NewPayment, NewQuote, NewQuoteRequest,
    PaymentStatus, QuoteRequestStatus, QuoteStatus, TransactionStatus,
  },
  user::{NewUser, Role, User, UserUpdate},
};

use crate::{DemoPasswords, Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, email: &str, role: Role) -> User {
  s.create_user(NewUser {
    email: email.into(),
    password_hash: "$argon2id$test".into(),
    first_name: "Jean".into(),
    last_name: "Dupont".into(),
    phone: None,
    role,
  })
  .await
  .unwrap()
}

fn destination(name: &str, continent: &str) -> NewDestination {
  NewDestination {
    name: name.into(),
    slug: name.to_lowercase(),
    continent: continent.into(),
    country: name.into(),
    description: Some(format!("Découvrez {name}")),
    ..Default::default()
  }
}

async fn agency(s: &SqliteStore, owner: i64, name: &str) -> i64 {
  s.create_agency(NewAgency {
    user_id: owner,
    name: name.into(),
    location: "Paris, France".into(),
    ..Default::default()
  })
  .await
  .unwrap()
  .id
}

async fn itinerary(
  s: &SqliteStore,
  agency_id: i64,
  destination_id: i64,
  duration: &str,
  price: f64,
) -> i64 {
  s.create_itinerary(NewItinerary {
    agency_id,
    destination_id,
    title: format!("{duration} à {price}"),
    duration: duration.into(),
    price_from: price,
    ..Default::default()
  })
  .await
  .unwrap()
  .id
}

fn quote_request(user_id: i64, destination_id: i64) -> NewQuoteRequest {
  NewQuoteRequest {
    user_id,
    destination_id,
    departure_date: NaiveDate::from_ymd_opt(2025, 6, 15),
    duration: Some("8-14 jours".into()),
    travelers_count: 2,
    budget: Some(3000.0),
    accommodation_type: Some(AccommodationType::Superieur),
    message: Some("Voyage de noces".into()),
    status: QuoteRequestStatus::Pending,
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_user() {
  let s = store().await;
  let created = user(&s, "jean@example.com", Role::Traveler).await;

  let fetched = s.get_user(created.id).await.unwrap().unwrap();
  assert_eq!(fetched.email, "jean@example.com");
  assert_eq!(fetched.role, Role::Traveler);
  assert_eq!(fetched.created_at, created.created_at);

  assert!(s.get_user(created.id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn email_lookup_ignores_case() {
  let s = store().await;
  user(&s, "jean@example.com", Role::Traveler).await;
  let found = s.get_user_by_email("Jean@Example.com").await.unwrap();
  assert!(found.is_some());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  user(&s, "jean@example.com", Role::Traveler).await;
  let again = s
    .create_user(NewUser {
      email: "JEAN@example.com".into(),
      password_hash: "x".into(),
      first_name: "J".into(),
      last_name: "D".into(),
      phone: None,
      role: Role::Traveler,
    })
    .await;
  assert!(matches!(again, Err(Error::Database(_))));
}

#[tokio::test]
async fn update_user_writes_only_given_fields() {
  let s = store().await;
  let u = user(&s, "jean@example.com", Role::Traveler).await;

  let update = UserUpdate { phone: Some(Some("0601020304".into())), ..Default::default() };
  assert!(s.update_user(u.id, update).await.unwrap());

  let fetched = s.get_user(u.id).await.unwrap().unwrap();
  assert_eq!(fetched.phone.as_deref(), Some("0601020304"));
  assert_eq!(fetched.first_name, "Jean");
  assert!(fetched.updated_at >= u.updated_at);

  let clear = UserUpdate { phone: Some(None), ..Default::default() };
  assert!(s.update_user(u.id, clear).await.unwrap());
  assert_eq!(s.get_user(u.id).await.unwrap().unwrap().phone, None);
}

#[tokio::test]
async fn empty_or_missing_user_update_returns_false() {
  let s = store().await;
  let u = user(&s, "jean@example.com", Role::Traveler).await;
  assert!(!s.update_user(u.id, UserUpdate::default()).await.unwrap());

  let update = UserUpdate { first_name: Some("Paul".into()), ..Default::default() };
  assert!(!s.update_user(u.id + 100, update).await.unwrap());
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn destinations_are_listed_by_name() {
  let s = store().await;
  s.create_destination(destination("Maroc", "Afrique")).await.unwrap();
  s.create_destination(destination("France", "Europe")).await.unwrap();
  s.create_destination(destination("Japon", "Asie")).await.unwrap();

  let names: Vec<String> =
    s.list_destinations().await.unwrap().into_iter().map(|d| d.name).collect();
  assert_eq!(names, ["France", "Japon", "Maroc"]);
}

#[tokio::test]
async fn destination_page_resolves_id_and_slug() {
  let s = store().await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let d = s.create_destination(destination("Japon", "Asie")).await.unwrap();
  s.add_highlight(d.id, "Kyoto et ses temples".into()).await.unwrap();
  let a = agency(&s, owner.id, "Nihon Discovery").await;
  s.link_agency_destination(a, d.id).await.unwrap();
  s.link_agency_destination(a, d.id).await.unwrap();
  itinerary(&s, a, d.id, "12 jours", 2950.0).await;
  s.create_itinerary(NewItinerary {
    agency_id: a,
    destination_id: d.id,
    title: "Japon Essentiel".into(),
    duration: "14 jours".into(),
    price_from: 3200.0,
    is_featured: true,
    ..Default::default()
  })
  .await
  .unwrap();

  let page = s.destination_page("japon").await.unwrap().unwrap();
  assert_eq!(page.destination.id, d.id);
  assert_eq!(page.highlights.len(), 1);
  assert_eq!(page.agencies.len(), 1);
  assert_eq!(page.itineraries[0].title, "Japon Essentiel");
  assert_eq!(page.itineraries[1].price_from, 2950.0);

  let by_id = s.destination_page(&d.id.to_string()).await.unwrap().unwrap();
  assert_eq!(by_id.destination.slug, "japon");

  assert!(s.destination_page("atlantide").await.unwrap().is_none());
}

#[tokio::test]
async fn agencies_are_ordered_by_rating() {
  let s = store().await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let d = s.create_destination(destination("France", "Europe")).await.unwrap();
  for (name, rating) in [("Découverte Hexagonale", 4.6), ("France Authentique", 4.8)] {
    let a = s
      .create_agency(NewAgency {
        user_id: owner.id,
        name: name.into(),
        location: "France".into(),
        rating,
        ..Default::default()
      })
      .await
      .unwrap();
    s.link_agency_destination(a.id, d.id).await.unwrap();
  }
  let agencies = s.agencies_for_destination(d.id).await.unwrap();
  assert_eq!(agencies[0].name, "France Authentique");
}

// ─── Filtering ───────────────────────────────────────────────────────────────

/// France (Europe): 12 days at 2450 tagged culture, 8 days at 1950.
/// Maroc (Afrique): 10 days at 1450 tagged aventure.
async fn filter_fixture() -> SqliteStore {
  let s = store().await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let a = agency(&s, owner.id, "Agence").await;
  let culture = s
    .create_theme(NewTheme { name: "Culture".into(), slug: "culture".into(), ..Default::default() })
    .await
    .unwrap();
  let aventure = s
    .create_theme(NewTheme {
      name: "Aventure".into(),
      slug: "aventure".into(),
      ..Default::default()
    })
    .await
    .unwrap();

  let france = s.create_destination(destination("France", "Europe")).await.unwrap();
  let tour = itinerary(&s, a, france.id, "12 jours", 2450.0).await;
  itinerary(&s, a, france.id, "8 jours", 1950.0).await;
  s.tag_itinerary(tour, culture.id).await.unwrap();
  s.tag_itinerary(tour, culture.id).await.unwrap();

  let maroc = s.create_destination(destination("Maroc", "Afrique")).await.unwrap();
  let desert = itinerary(&s, a, maroc.id, "10 jours", 1450.0).await;
  s.tag_itinerary(desert, aventure.id).await.unwrap();

  s
}

async fn names(s: &SqliteStore, query: DestinationQuery) -> Vec<String> {
  s.advanced_search(&query).await.unwrap().into_iter().map(|d| d.name).collect()
}

#[tokio::test]
async fn continent_filter_accepts_keys() {
  let s = filter_fixture().await;
  let q = DestinationQuery { continent: Some("afrique".into()), ..Default::default() };
  assert_eq!(names(&s, q).await, ["Maroc"]);
}

#[tokio::test]
async fn theme_filter_uses_itinerary_tags() {
  let s = filter_fixture().await;
  let found = s.filter_destinations(None, Some("culture".into())).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].name, "France");
}

#[tokio::test]
async fn budget_filter_is_per_itinerary() {
  let s = filter_fixture().await;
  let q = DestinationQuery { budget_max: Some(2000.0), ..Default::default() };
  assert_eq!(names(&s, q).await, ["France", "Maroc"]);

  let q = DestinationQuery { budget_min: Some(2000.0), ..Default::default() };
  assert_eq!(names(&s, q).await, ["France"]);
}

#[tokio::test]
async fn itinerary_filters_must_hold_on_one_itinerary() {
  let s = filter_fixture().await;
  // France's culture trip costs 2450; its cheap trip is untagged.
  let q = DestinationQuery {
    theme: Some("culture".into()),
    budget_max: Some(2000.0),
    ..Default::default()
  };
  assert!(names(&s, q).await.is_empty());
}

#[tokio::test]
async fn duration_filter_reads_leading_day_count() {
  let s = filter_fixture().await;
  let q = DestinationQuery { duration: Some(DurationRange::new(1, Some(8))), ..Default::default() };
  assert_eq!(names(&s, q).await, ["France"]);

  let q = DestinationQuery { duration: Some(DurationRange::new(10, None)), ..Default::default() };
  assert_eq!(names(&s, q).await, ["France", "Maroc"]);
}

#[tokio::test]
async fn filters_combine_conjunctively() {
  let s = filter_fixture().await;
  let q = DestinationQuery {
    continent: Some("europe".into()),
    duration: Some(DurationRange::new(8, Some(14))),
    budget_max: Some(1500.0),
    ..Default::default()
  };
  assert!(names(&s, q).await.is_empty());

  let q = DestinationQuery {
    text: Some("maroc".into()),
    theme: Some("aventure".into()),
    ..Default::default()
  };
  assert_eq!(names(&s, q).await, ["Maroc"]);
}

#[tokio::test]
async fn text_search_covers_continent() {
  let s = filter_fixture().await;
  let found = s.search_destinations("europ").await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].name, "France");
}

#[tokio::test]
async fn quick_search_ignores_descriptions() {
  let s = store().await;
  s.create_destination(NewDestination {
    description: Some("Plus proche que le Japon".into()),
    ..destination("France", "Europe")
  })
  .await
  .unwrap();
  s.create_destination(destination("Japon", "Asie")).await.unwrap();

  let found: Vec<String> =
    s.search_destinations("japon").await.unwrap().into_iter().map(|d| d.name).collect();
  assert_eq!(found, ["Japon"]);

  let q = DestinationQuery { text: Some("japon".into()), ..Default::default() };
  assert_eq!(names(&s, q).await, ["France", "Japon"]);
}

#[tokio::test]
async fn accented_text_matches_in_any_case() {
  let s = store().await;
  s.create_destination(destination("Égypte", "Afrique")).await.unwrap();
  s.create_destination(destination("Maroc", "Afrique")).await.unwrap();

  for text in ["ÉGYPTE", "égypte", "gYpT"] {
    let found = s.search_destinations(text).await.unwrap();
    assert_eq!(found.len(), 1, "{text}");
    assert_eq!(found[0].name, "Égypte");
  }

  let q = DestinationQuery { text: Some("ÉGY".into()), ..Default::default() };
  assert_eq!(names(&s, q).await, ["Égypte"]);
  let q = DestinationQuery { continent: Some("AFRIQUE".into()), ..Default::default() };
  assert_eq!(names(&s, q).await, ["Maroc", "Égypte"]);
}

#[tokio::test]
async fn inverted_budget_is_an_error() {
  let s = filter_fixture().await;
  let q = DestinationQuery {
    budget_min: Some(3000.0),
    budget_max: Some(1000.0),
    ..Default::default()
  };
  assert!(matches!(s.advanced_search(&q).await, Err(Error::Core(_))));
}

// ─── Quote requests, quotes, bookings ────────────────────────────────────────

#[tokio::test]
async fn quote_request_roundtrip_and_listing() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  let d = s.create_destination(destination("Japon", "Asie")).await.unwrap();

  let first = s.create_quote_request(quote_request(traveler.id, d.id)).await.unwrap();
  let second = s.create_quote_request(quote_request(traveler.id, d.id)).await.unwrap();

  let listed = s.quote_requests_for_user(traveler.id).await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].id, second.id);
  assert_eq!(listed[1].id, first.id);
  assert_eq!(listed[1].departure_date, NaiveDate::from_ymd_opt(2025, 6, 15));
  assert_eq!(listed[1].accommodation_type, Some(AccommodationType::Superieur));
  assert_eq!(listed[1].status, QuoteRequestStatus::Pending);
}

#[tokio::test]
async fn agency_sees_requests_for_served_destinations() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let a = agency(&s, owner.id, "Nihon Discovery").await;
  let japon = s.create_destination(destination("Japon", "Asie")).await.unwrap();
  let maroc = s.create_destination(destination("Maroc", "Afrique")).await.unwrap();
  s.link_agency_destination(a, japon.id).await.unwrap();

  s.create_quote_request(quote_request(traveler.id, japon.id)).await.unwrap();
  s.create_quote_request(quote_request(traveler.id, maroc.id)).await.unwrap();

  let inbox = s.quote_requests_for_agency(a).await.unwrap();
  assert_eq!(inbox.len(), 1);
  assert_eq!(inbox[0].destination_id, japon.id);
  assert_eq!(s.get_agency_by_user(owner.id).await.unwrap().unwrap().id, a);
}

#[tokio::test]
async fn quote_statuses_update() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let a = agency(&s, owner.id, "Agence").await;
  let d = s.create_destination(destination("France", "Europe")).await.unwrap();
  let request = s.create_quote_request(quote_request(traveler.id, d.id)).await.unwrap();

  let quote = s
    .create_quote(NewQuote {
      quote_request_id: request.id,
      agency_id: a,
      price: 2800.0,
      description: None,
      validity_period: 14,
      status: QuoteStatus::Pending,
    })
    .await
    .unwrap();
  assert_eq!(s.quotes_for_request(request.id).await.unwrap().len(), 1);

  assert!(s.set_quote_status(quote.id, QuoteStatus::Accepted).await.unwrap());
  assert!(
    s.set_quote_request_status(request.id, QuoteRequestStatus::Completed).await.unwrap()
  );
  assert!(!s.set_quote_status(quote.id + 1, QuoteStatus::Rejected).await.unwrap());

  assert_eq!(s.get_quote(quote.id).await.unwrap().unwrap().status, QuoteStatus::Accepted);
  assert_eq!(
    s.get_quote_request(request.id).await.unwrap().unwrap().status,
    QuoteRequestStatus::Completed
  );
}

#[tokio::test]
async fn stored_quotes_lapse_after_their_window() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let a = agency(&s, owner.id, "Agence").await;
  let d = s.create_destination(destination("France", "Europe")).await.unwrap();
  let request = s.create_quote_request(quote_request(traveler.id, d.id)).await.unwrap();

  let offer = |validity_period| NewQuote {
    quote_request_id: request.id,
    agency_id: a,
    price: 1900.0,
    description: None,
    validity_period,
    status: QuoteStatus::Pending,
  };

  let week = s.create_quote(offer(7)).await.unwrap();
  let stored = s.get_quote(week.id).await.unwrap().unwrap();
  let end = stored.created_at + Duration::days(7);
  assert!(!stored.is_lapsed(end));
  assert!(stored.is_lapsed(end + Duration::seconds(1)));

  let endless = s.create_quote(offer(100_000_000)).await.unwrap();
  let stored = s.get_quote(endless.id).await.unwrap().unwrap();
  assert_eq!(stored.validity_period, 100_000_000);
  assert!(!stored.is_lapsed(Utc::now() + Duration::days(3650)));
}

#[tokio::test]
async fn payments_drive_booking_payment_status() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let a = agency(&s, owner.id, "Agence").await;
  let d = s.create_destination(destination("France", "Europe")).await.unwrap();
  let request = s.create_quote_request(quote_request(traveler.id, d.id)).await.unwrap();
  let quote = s
    .create_quote(NewQuote {
      quote_request_id: request.id,
      agency_id: a,
      price: 1200.0,
      description: None,
      validity_period: 7,
      status: QuoteStatus::Accepted,
    })
    .await
    .unwrap();
  let booking = s
    .create_booking(NewBooking {
      user_id: traveler.id,
      quote_id: quote.id,
      total_price: 1200.0,
      status: BookingStatus::Confirmed,
      payment_status: PaymentStatus::Pending,
    })
    .await
    .unwrap();

  let pay = |amount: f64, status: TransactionStatus| NewPayment {
    booking_id: booking.id,
    amount,
    payment_method: "card".into(),
    transaction_id: None,
    status,
  };

  s.record_payment(pay(400.0, TransactionStatus::Completed)).await.unwrap();
  let b = s.get_booking(booking.id).await.unwrap().unwrap();
  assert_eq!(b.payment_status, PaymentStatus::Partial);

  s.record_payment(pay(800.0, TransactionStatus::Failed)).await.unwrap();
  s.record_payment(pay(800.0, TransactionStatus::Completed)).await.unwrap();
  let b = s.get_booking(booking.id).await.unwrap().unwrap();
  assert_eq!(b.payment_status, PaymentStatus::Completed);

  let history = s.payments_for_booking(booking.id).await.unwrap();
  assert_eq!(history.len(), 3);
  assert_eq!(history[0].amount, 400.0);

  assert_eq!(s.bookings_for_user(traveler.id).await.unwrap().len(), 1);

  let missing = s
    .record_payment(NewPayment {
      booking_id: booking.id + 1,
      ..pay(10.0, TransactionStatus::Completed)
    })
    .await;
  assert!(matches!(missing, Err(Error::NotFound { entity: "booking", .. })));
}

// ─── Conversations & reviews ─────────────────────────────────────────────────

#[tokio::test]
async fn new_message_moves_conversation_to_top() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let a1 = agency(&s, owner.id, "France Authentique").await;
  let a2 = agency(&s, owner.id, "Découverte Hexagonale").await;

  let older = s
    .create_conversation(NewConversation {
      traveler_id: traveler.id,
      agency_id: a1,
      quote_request_id: None,
    })
    .await
    .unwrap();
  let newer = s
    .create_conversation(NewConversation {
      traveler_id: traveler.id,
      agency_id: a2,
      quote_request_id: None,
    })
    .await
    .unwrap();
  assert_eq!(s.conversations_for_user(traveler.id).await.unwrap()[0].id, newer.id);

  s.create_message(NewMessage {
    conversation_id: older.id,
    sender_id: owner.id,
    content: "Bonjour, voici notre proposition".into(),
    is_read: false,
  })
  .await
  .unwrap();

  let listed = s.conversations_for_user(traveler.id).await.unwrap();
  assert_eq!(listed[0].id, older.id);
  assert!(listed[0].updated_at > older.updated_at);

  // The agency owner sees the same threads.
  assert_eq!(s.conversations_for_user(owner.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn reading_marks_only_the_other_side() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let a = agency(&s, owner.id, "Agence").await;
  let c = s
    .create_conversation(NewConversation {
      traveler_id: traveler.id,
      agency_id: a,
      quote_request_id: None,
    })
    .await
    .unwrap();

  let thread = [(traveler.id, "Bonjour"), (owner.id, "Bonjour !"), (owner.id, "Des questions ?")];
  for (sender, text) in thread {
    s.create_message(NewMessage {
      conversation_id: c.id,
      sender_id: sender,
      content: text.into(),
      is_read: false,
    })
    .await
    .unwrap();
  }

  assert_eq!(s.unread_count(c.id, traveler.id).await.unwrap(), 2);
  assert_eq!(s.mark_conversation_read(c.id, traveler.id).await.unwrap(), 2);
  assert_eq!(s.unread_count(c.id, traveler.id).await.unwrap(), 0);
  assert_eq!(s.unread_count(c.id, owner.id).await.unwrap(), 1);

  let thread = s.messages_for_conversation(c.id).await.unwrap();
  assert_eq!(thread[0].content, "Bonjour");
  assert!(!thread[0].is_read);
  assert!(thread[2].is_read);
}

#[tokio::test]
async fn review_recomputes_agency_rating() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let a = agency(&s, owner.id, "Agence").await;

  for rating in [5, 4] {
    s.create_review(NewReview {
      user_id: traveler.id,
      agency_id: a,
      booking_id: None,
      rating,
      title: Some("Super".into()),
      content: None,
      is_verified: false,
    })
    .await
    .unwrap();
  }

  let agency = s.get_agency(a).await.unwrap().unwrap();
  assert_eq!(agency.reviews_count, 2);
  assert!((agency.rating - 4.5).abs() < f64::EPSILON);
  assert_eq!(s.reviews_for_agency(a).await.unwrap()[0].rating, 4);
}

#[tokio::test]
async fn out_of_range_rating_is_rejected() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  let owner = user(&s, "agence@example.com", Role::Agency).await;
  let a = agency(&s, owner.id, "Agence").await;
  let review = s
    .create_review(NewReview {
      user_id: traveler.id,
      agency_id: a,
      booking_id: None,
      rating: 6,
      title: None,
      content: None,
      is_verified: false,
    })
    .await;
  assert!(review.is_err());
  assert_eq!(s.get_agency(a).await.unwrap().unwrap().reviews_count, 0);
}

// ─── Search history & preferences ────────────────────────────────────────────

#[tokio::test]
async fn search_history_is_newest_first_and_limited() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  for q in ["japon", "maroc", "france"] {
    s.save_search(NewSearch { user_id: Some(traveler.id), search_query: q.into(), filters: None })
      .await
      .unwrap();
  }
  s.save_search(NewSearch { user_id: None, search_query: "anonyme".into(), filters: None })
    .await
    .unwrap();

  let history = s.search_history_for_user(traveler.id, 2).await.unwrap();
  let queries: Vec<&str> = history.iter().map(|h| h.search_query.as_str()).collect();
  assert_eq!(queries, ["france", "maroc"]);
}

#[tokio::test]
async fn preferences_insert_then_partial_update() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  assert!(s.get_search_preferences(traveler.id).await.unwrap().is_none());

  let first = SearchPreferenceUpdate {
    preferred_themes: Some("culture".into()),
    preferred_budget_max: Some(3000.0),
    ..Default::default()
  };
  assert!(s.update_search_preferences(traveler.id, first).await.unwrap());

  let second = SearchPreferenceUpdate {
    preferred_duration: Some("8-14".into()),
    ..Default::default()
  };
  assert!(s.update_search_preferences(traveler.id, second).await.unwrap());
  assert!(
    !s.update_search_preferences(traveler.id, SearchPreferenceUpdate::default())
      .await
      .unwrap()
  );

  let prefs = s.get_search_preferences(traveler.id).await.unwrap().unwrap();
  assert_eq!(prefs.preferred_themes.as_deref(), Some("culture"));
  assert_eq!(prefs.preferred_duration.as_deref(), Some("8-14"));
  assert_eq!(prefs.preferred_budget_max, Some(3000.0));
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn expired_sessions_are_ignored_and_purged() {
  let s = store().await;
  let traveler = user(&s, "voyageur@example.com", Role::Traveler).await;
  let now = Utc::now();

  s.create_session(NewSession {
    token_hash: "live".into(),
    user_id: traveler.id,
    expires_at: now + Duration::hours(1),
  })
  .await
  .unwrap();
  s.create_session(NewSession {
    token_hash: "stale".into(),
    user_id: traveler.id,
    expires_at: now - Duration::hours(1),
  })
  .await
  .unwrap();

  assert_eq!(s.session_user("live", now).await.unwrap().unwrap().id, traveler.id);
  assert!(s.session_user("stale", now).await.unwrap().is_none());
  assert!(s.session_user("unknown", now).await.unwrap().is_none());

  // A session is dead from the instant it expires.
  let end = now + Duration::hours(1);
  assert!(s.session_user("live", end - Duration::seconds(1)).await.unwrap().is_some());
  assert!(s.session_user("live", end).await.unwrap().is_none());

  assert_eq!(s.purge_expired_sessions(now).await.unwrap(), 1);
  assert!(s.delete_session("live").await.unwrap());
  assert!(!s.delete_session("live").await.unwrap());
}

// ─── Seed ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn demo_seed_is_idempotent() {
  let s = store().await;
  let passwords = DemoPasswords {
    traveler_hash: "$argon2id$traveler".into(),
    agency_hash:   "$argon2id$agency".into(),
  };

  let summary = s.seed_demo(&passwords).await.unwrap();
  assert!(!summary.skipped);
  assert_eq!(summary.destinations, 3);
  assert_eq!(summary.themes, 6);
  assert_eq!(summary.agencies, 4);
  assert_eq!(summary.itineraries, 7);
  assert_eq!(summary.users, 5);

  let again = s.seed_demo(&passwords).await.unwrap();
  assert!(again.skipped);
  assert_eq!(s.list_destinations().await.unwrap().len(), 3);

  let agent = s.get_user_by_email("agence@example.com").await.unwrap().unwrap();
  assert_eq!(agent.role, Role::Agency);
  let agency = s.get_agency_by_user(agent.id).await.unwrap().unwrap();
  assert_eq!(agency.name, "France Authentique");

  let q = DestinationQuery { theme: Some("plage".into()), ..Default::default() };
  let beach: Vec<String> =
    s.advanced_search(&q).await.unwrap().into_iter().map(|d| d.name).collect();
  assert_eq!(beach, ["Maroc"]);
}

#[tokio::test]
async fn failed_demo_seed_leaves_nothing_behind() {
  let s = store().await;
  // Occupies the slug of the second catalogue destination.
  s.create_destination(destination("Japon", "Asie")).await.unwrap();

  let passwords = DemoPasswords {
    traveler_hash: "$argon2id$traveler".into(),
    agency_hash:   "$argon2id$agency".into(),
  };
  assert!(matches!(s.seed_demo(&passwords).await, Err(Error::Database(_))));

  let names: Vec<String> =
    s.list_destinations().await.unwrap().into_iter().map(|d| d.name).collect();
  assert_eq!(names, ["Japon"]);
  assert!(s.list_themes().await.unwrap().is_empty());
  assert!(s.get_user_by_email("voyageur@example.com").await.unwrap().is_none());
  assert!(s.get_user_by_email("agence@example.com").await.unwrap().is_none());
}
