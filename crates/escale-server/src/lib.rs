//! HTTP server for the Escale travel marketplace.
//!
//! Mounts the public catalogue API from `escale-api` under `/api` and adds
//! everything that needs to know the caller: registration and login, the
//! traveler account pages, the agency inbox and saved searches. Backed by any
//! [`MarketplaceStore`].

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  http::{Method, header},
  routing::{get, post},
};
use escale_core::store::MarketplaceStore;
use serde::Deserialize;
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use handlers::{
  agency, auth as account_auth, bookings, conversations, profile, quotes, reviews, search,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ESCALE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// Lifetime of a login session.
  pub session_ttl_hours: u32,
  /// Load the demo catalogue and accounts at startup when the store is empty.
  pub seed_demo_data:    bool,
  /// Allow cross-origin requests from any origin.
  pub cors_allow_any:    bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "127.0.0.1".to_owned(),
      port:              8080,
      store_path:        PathBuf::from("~/.local/share/escale/escale.db"),
      session_ttl_hours: 720,
      seed_demo_data:    false,
      cors_allow_any:    true,
    }
  }
}

/// Longest session lifetime the server accepts, one year.
pub const MAX_SESSION_TTL_HOURS: u32 = 24 * 365;

impl ServerConfig {
  /// Reject values the server cannot run with.
  pub fn validate(&self) -> Result<(), escale_core::Error> {
    if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session_ttl_hours) {
      return Err(escale_core::Error::validation(format!(
        "session_ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}, got {}",
        self.session_ttl_hours
      )));
    }
    Ok(())
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: MarketplaceStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MarketplaceStore + Clone + 'static,
{
  let api = escale_api::api_router(state.store.clone());
  let cors_allow_any = state.config.cors_allow_any;

  let app = Router::new()
    .route("/health", get(handlers::health))
    // Authentication
    .route("/auth/register", post(account_auth::register::<S>))
    .route("/auth/login", post(account_auth::login::<S>))
    .route("/auth/logout", post(account_auth::logout::<S>))
    .route("/auth/me", get(account_auth::me))
    // Traveler account
    .route("/account/profile", get(profile::show).put(profile::update::<S>))
    .route(
      "/account/quote-requests",
      get(quotes::list::<S>).post(quotes::create::<S>),
    )
    .route("/account/quote-requests/{id}/quotes", get(quotes::offers::<S>))
    .route("/account/bookings", get(bookings::list::<S>).post(bookings::create::<S>))
    .route(
      "/account/bookings/{id}/payments",
      get(bookings::payments::<S>).post(bookings::pay::<S>),
    )
    .route(
      "/account/conversations",
      get(conversations::list::<S>).post(conversations::create::<S>),
    )
    .route(
      "/account/conversations/{id}/messages",
      get(conversations::messages::<S>).post(conversations::send::<S>),
    )
    .route("/account/search-history", get(search::history::<S>))
    .route(
      "/account/preferences",
      get(search::preferences::<S>).put(search::update_preferences::<S>),
    )
    // Reviews
    .route("/agencies/{id}/reviews", post(reviews::create::<S>))
    // Agency side
    .route("/agency/quote-requests", get(agency::inbox::<S>))
    .route("/agency/quotes", post(agency::create_quote::<S>))
    // Search
    .route("/search", get(search::run::<S>))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http());

  if cors_allow_any {
    app.layer(
      CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
  } else {
    app
  }
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
  };
  use escale_store_sqlite::{DemoPasswords, SqliteStore};
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let hash = auth::hash_password("password123").unwrap();
    store
      .seed_demo(&DemoPasswords { traveler_hash: hash.clone(), agency_hash: hash })
      .await
      .unwrap();
    AppState {
      store:  Arc::new(store),
      config: Arc::new(ServerConfig::default()),
    }
  }

  async fn send(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
      return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn login(state: &AppState<SqliteStore>, email: &str) -> String {
    let resp = send(
      state,
      "POST",
      "/auth/login",
      None,
      Some(json!({ "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await["token"].as_str().unwrap().to_owned()
  }

  // ── Authentication ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn health_is_public() {
    let state = make_state().await;
    let resp = send(&state, "GET", "/health", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn catalogue_is_nested_under_api() {
    let state = make_state().await;
    let resp = send(&state, "GET", "/api/destinations/france", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["itineraries"].as_array().unwrap().len(), 3);
  }

  #[tokio::test]
  async fn login_returns_session_user() {
    let state = make_state().await;
    let resp = send(
      &state,
      "POST",
      "/auth/login",
      None,
      Some(json!({ "email": "Voyageur@Example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["user"]["name"], "Jean Dupont");
    assert_eq!(body["user"]["role"], "traveler");
    assert!(body["user"].get("password_hash").is_none());

    let token = body["token"].as_str().unwrap();
    let me = send(&state, "GET", "/auth/me", Some(token), None).await;
    assert_eq!(json_body(me).await["email"], "voyageur@example.com");
  }

  #[test]
  fn session_lifetime_is_bounded() {
    assert!(ServerConfig::default().validate().is_ok());
    for hours in [0, MAX_SESSION_TTL_HOURS + 1, u32::MAX] {
      let config = ServerConfig { session_ttl_hours: hours, ..ServerConfig::default() };
      assert!(config.validate().is_err(), "{hours}h");
    }
  }

  #[tokio::test]
  async fn unrepresentable_session_lifetime_fails_cleanly() {
    let mut state = make_state().await;
    state.config =
      Arc::new(ServerConfig { session_ttl_hours: u32::MAX, ..ServerConfig::default() });
    let resp = send(
      &state,
      "POST",
      "/auth/login",
      None,
      Some(json!({ "email": "voyageur@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[tokio::test]
  async fn bad_credentials_are_401() {
    let state = make_state().await;
    let resp = send(
      &state,
      "POST",
      "/auth/login",
      None,
      Some(json!({ "email": "voyageur@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"], "Identifiants incorrects");

    let resp = send(
      &state,
      "POST",
      "/auth/login",
      None,
      Some(json!({ "email": "", "password": "" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "Veuillez remplir tous les champs");
  }

  #[tokio::test]
  async fn account_pages_require_a_session() {
    let state = make_state().await;
    let resp = send(&state, "GET", "/account/profile", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn register_then_duplicate() {
    let state = make_state().await;
    let form = json!({
      "email": "marie@example.com",
      "password": "motdepasse",
      "confirm_password": "motdepasse",
      "first_name": "Marie",
      "last_name": "Curie",
    });
    let resp = send(&state, "POST", "/auth/register", None, Some(form.clone())).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["user"]["name"], "Marie Curie");
    assert!(body["token"].is_string());

    let resp = send(&state, "POST", "/auth/register", None, Some(form)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["error"], "Cet email est déjà utilisé");

    let short = json!({
      "email": "paul@example.com",
      "password": "court",
      "first_name": "Paul",
      "last_name": "Martin",
    });
    let resp = send(&state, "POST", "/auth/register", None, Some(short)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn logout_revokes_the_session() {
    let state = make_state().await;
    let token = login(&state, "voyageur@example.com").await;
    let resp = send(&state, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&state, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let again = send(&state, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(again.status(), StatusCode::NO_CONTENT);
  }

  // ── Profile ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn profile_update_and_password_change() {
    let state = make_state().await;
    let token = login(&state, "voyageur@example.com").await;

    let resp = send(
      &state,
      "PUT",
      "/account/profile",
      Some(&token),
      Some(json!({ "phone": "0601020304" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["phone"], "0601020304");

    let resp =
      send(&state, "PUT", "/account/profile", Some(&token), Some(json!({ "phone": "" }))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["phone"], Value::Null);

    let resp = send(
      &state,
      "PUT",
      "/account/profile",
      Some(&token),
      Some(json!({
        "current_password": "pas-le-bon",
        "new_password": "nouveau-mdp",
        "confirm_password": "nouveau-mdp",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(
      &state,
      "PUT",
      "/account/profile",
      Some(&token),
      Some(json!({
        "current_password": "password123",
        "new_password": "nouveau-mdp",
        "confirm_password": "nouveau-mdp",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(
      &state,
      "POST",
      "/auth/login",
      None,
      Some(json!({ "email": "voyageur@example.com", "password": "nouveau-mdp" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
  }

  // ── Trip pipeline ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn quote_request_to_paid_booking() {
    let state = make_state().await;
    let traveler = login(&state, "voyageur@example.com").await;
    let agent = login(&state, "agence@example.com").await;

    // Traveler asks for a quote on France (destination 1).
    let resp = send(
      &state,
      "POST",
      "/account/quote-requests",
      Some(&traveler),
      Some(json!({
        "destination_id": 1,
        "departure_date": "2025-06-15",
        "duration": "8-14 jours",
        "travelers_count": 2,
        "budget": 3000.0,
        "accommodation_type": "superieur",
        "message": "Voyage de noces",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let request = json_body(resp).await;
    assert_eq!(request["status"], "pending");
    let request_id = request["id"].as_i64().unwrap();

    let resp = send(&state, "GET", "/account/quote-requests", Some(&traveler), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

    // Travelers cannot answer quote requests.
    let resp = send(
      &state,
      "POST",
      "/agency/quotes",
      Some(&traveler),
      Some(json!({ "quote_request_id": request_id, "price": 2800.0 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // France Authentique sees and answers it.
    let resp = send(&state, "GET", "/agency/quote-requests", Some(&agent), None).await;
    let inbox = json_body(resp).await;
    assert_eq!(inbox[0]["id"].as_i64(), Some(request_id));

    let resp = send(
      &state,
      "POST",
      "/agency/quotes",
      Some(&agent),
      Some(json!({ "quote_request_id": request_id, "price": 2800.0, "validity_period": 14 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let quote_id = json_body(resp).await["id"].as_i64().unwrap();

    let resp = send(
      &state,
      "GET",
      &format!("/account/quote-requests/{request_id}/quotes"),
      Some(&traveler),
      None,
    )
    .await;
    assert_eq!(json_body(resp).await[0]["price"], 2800.0);

    // Booking copies the price and closes the request.
    let resp = send(
      &state,
      "POST",
      "/account/bookings",
      Some(&traveler),
      Some(json!({ "quote_id": quote_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let booking = json_body(resp).await;
    assert_eq!(booking["total_price"], 2800.0);
    assert_eq!(booking["payment_status"], "pending");
    let booking_id = booking["id"].as_i64().unwrap();

    let resp = send(
      &state,
      "POST",
      "/account/bookings",
      Some(&traveler),
      Some(json!({ "quote_id": quote_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&state, "GET", "/account/quote-requests", Some(&traveler), None).await;
    assert_eq!(json_body(resp).await[0]["status"], "completed");

    // Deposit, then balance.
    let uri = format!("/account/bookings/{booking_id}/payments");
    let resp = send(
      &state,
      "POST",
      &uri,
      Some(&traveler),
      Some(json!({ "amount": 800.0, "payment_method": "card" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["booking"]["payment_status"], "partial");

    let resp = send(
      &state,
      "POST",
      &uri,
      Some(&traveler),
      Some(json!({ "amount": 2000.0, "payment_method": "card" })),
    )
    .await;
    let receipt = json_body(resp).await;
    assert_eq!(receipt["booking"]["payment_status"], "completed");
    assert!(receipt["payment"]["transaction_id"].as_str().unwrap().starts_with("txn_"));

    let resp = send(&state, "GET", &uri, Some(&traveler), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);

    // Other users cannot see the booking's payments.
    let resp = send(&state, "GET", &uri, Some(&agent), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn unknown_destination_is_rejected() {
    let state = make_state().await;
    let token = login(&state, "voyageur@example.com").await;
    let resp = send(
      &state,
      "POST",
      "/account/quote-requests",
      Some(&token),
      Some(json!({ "destination_id": 99, "travelers_count": 2 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn quote_validity_is_bounded() {
    let state = make_state().await;
    let traveler = login(&state, "voyageur@example.com").await;
    let agent = login(&state, "agence@example.com").await;

    let resp = send(
      &state,
      "POST",
      "/account/quote-requests",
      Some(&traveler),
      Some(json!({ "destination_id": 1, "travelers_count": 2 })),
    )
    .await;
    let request_id = json_body(resp).await["id"].as_i64().unwrap();

    for days in [0, 366, 100_000_000] {
      let resp = send(
        &state,
        "POST",
        "/agency/quotes",
        Some(&agent),
        Some(json!({ "quote_request_id": request_id, "price": 1900.0, "validity_period": days })),
      )
      .await;
      assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{days} days");
    }

    let resp = send(
      &state,
      "POST",
      "/agency/quotes",
      Some(&agent),
      Some(json!({ "quote_request_id": request_id, "price": 1900.0, "validity_period": 365 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let quote_id = json_body(resp).await["id"].as_i64().unwrap();

    let resp = send(
      &state,
      "POST",
      "/account/bookings",
      Some(&traveler),
      Some(json!({ "quote_id": quote_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }

  // ── Messaging ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn conversation_flow_and_unread_counts() {
    let state = make_state().await;
    let traveler = login(&state, "voyageur@example.com").await;
    let agent = login(&state, "agence@example.com").await;

    let resp = send(
      &state,
      "POST",
      "/account/conversations",
      Some(&traveler),
      Some(json!({ "agency_id": 1, "message": "Bonjour, une question sur la Loire" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let conversation_id = json_body(resp).await["id"].as_i64().unwrap();
    let uri = format!("/account/conversations/{conversation_id}/messages");

    let resp = send(&state, "GET", "/account/conversations", Some(&agent), None).await;
    let inbox = json_body(resp).await;
    assert_eq!(inbox[0]["agency_name"], "France Authentique");
    assert_eq!(inbox[0]["unread_count"], 1);
    assert_eq!(inbox[0]["last_message"]["content"], "Bonjour, une question sur la Loire");

    // Reading marks the traveler's message read for the agency.
    let resp = send(&state, "GET", &uri, Some(&agent), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);
    let resp = send(&state, "GET", "/account/conversations", Some(&agent), None).await;
    assert_eq!(json_body(resp).await[0]["unread_count"], 0);

    let resp = send(
      &state,
      "POST",
      &uri,
      Some(&agent),
      Some(json!({ "content": "Avec plaisir !" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&state, "POST", &uri, Some(&traveler), Some(json!({ "content": "  " }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // A third party is kept out.
    let outsider = send(
      &state,
      "POST",
      "/auth/register",
      None,
      Some(json!({
        "email": "curieux@example.com",
        "password": "password123",
        "first_name": "Curieux",
        "last_name": "Voisin",
      })),
    )
    .await;
    let outsider = json_body(outsider).await["token"].as_str().unwrap().to_owned();
    let resp = send(&state, "GET", &uri, Some(&outsider), None).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  // ── Reviews ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn review_updates_agency_rating() {
    let state = make_state().await;
    let traveler = login(&state, "voyageur@example.com").await;

    let resp = send(
      &state,
      "POST",
      "/agencies/3/reviews",
      Some(&traveler),
      Some(json!({ "rating": 4, "title": "Très bien", "content": "Guide passionnant" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["is_verified"], false);

    let resp = send(&state, "GET", "/api/agencies/3", None, None).await;
    let agency = json_body(resp).await;
    assert_eq!(agency["reviews_count"], 1);
    assert_eq!(agency["rating"], 4.0);

    let resp = send(
      &state,
      "POST",
      "/agencies/3/reviews",
      Some(&traveler),
      Some(json!({ "rating": 9 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  // ── Search ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn search_is_saved_to_history() {
    let state = make_state().await;
    let token = login(&state, "voyageur@example.com").await;

    let resp = send(&state, "GET", "/search?q=japon", Some(&token), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await[0]["name"], "Japon");

    let uri = "/search?continent=afrique&duration=8-14";
    let resp = send(&state, "GET", uri, Some(&token), None).await;
    assert_eq!(json_body(resp).await[0]["name"], "Maroc");

    // Anonymous searches are recorded without a user.
    let resp = send(&state, "GET", "/search?q=france", None, None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&state, "GET", "/account/search-history?limit=1", Some(&token), None).await;
    let history = json_body(resp).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["search_query"], "");
    assert!(history[0]["filters"].as_str().unwrap().contains("afrique"));

    let resp = send(&state, "GET", "/account/search-history", Some(&token), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn preferences_roundtrip() {
    let state = make_state().await;
    let token = login(&state, "voyageur@example.com").await;

    let resp = send(&state, "GET", "/account/preferences", Some(&token), None).await;
    assert_eq!(json_body(resp).await, Value::Null);

    let resp = send(
      &state,
      "PUT",
      "/account/preferences",
      Some(&token),
      Some(json!({ "preferred_themes": "culture,gastronomie", "preferred_budget_max": 3000.0 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let prefs = json_body(resp).await;
    assert_eq!(prefs["preferred_themes"], "culture,gastronomie");
    assert_eq!(prefs["preferred_budget_max"], 3000.0);
  }
}
