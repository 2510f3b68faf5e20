//! Public JSON catalogue API for Escale.
//!
//! Exposes a read-only axum [`Router`] backed by any
//! [`escale_core::store::MarketplaceStore`]. Accounts, sessions and anything
//! that needs to know the caller live in `escale-server`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", escale_api::api_router(store.clone()))
//! ```

pub mod agencies;
pub mod destinations;
pub mod error;
pub mod params;
pub mod themes;

use std::sync::Arc;

use axum::{Router, routing::get};
use escale_core::store::MarketplaceStore;

pub use error::ApiError;
pub use params::CatalogueParams;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: MarketplaceStore + 'static,
{
  Router::new()
    // Destinations
    .route("/destinations", get(destinations::list::<S>))
    .route("/destinations/{key}", get(destinations::page::<S>))
    // Themes
    .route("/themes", get(themes::list::<S>))
    .route("/themes/{slug}", get(themes::get_one::<S>))
    // Agencies
    .route("/agencies/{id}", get(agencies::get_one::<S>))
    .route("/agencies/{id}/reviews", get(agencies::reviews::<S>))
    .with_state(store)
}

// ─── Router tests ────────────────────────────────────────────────────────────
