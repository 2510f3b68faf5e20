//! Catalogue rows: destinations, themes, agencies and their itineraries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Destinations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
  pub id:                   i64,
  pub name:                 String,
  /// URL-safe unique key, e.g. `"japon"`.
  pub slug:                 String,
  pub description:          Option<String>,
  pub long_description:     Option<String>,
  pub continent:            String,
  pub country:              String,
  pub image_url:            Option<String>,
  pub climate:              Option<String>,
  pub best_time_to_visit:   Option<String>,
  pub languages:            Option<String>,
  pub currency:             Option<String>,
  pub recommended_duration: Option<String>,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDestination {
  pub name:                 String,
  pub slug:                 String,
  pub description:          Option<String>,
  pub long_description:     Option<String>,
  pub continent:            String,
  pub country:              String,
  pub image_url:            Option<String>,
  pub climate:              Option<String>,
  pub best_time_to_visit:   Option<String>,
  pub languages:            Option<String>,
  pub currency:             Option<String>,
  pub recommended_duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationHighlight {
  pub id:             i64,
  pub destination_id: i64,
  pub highlight:      String,
}

// ─── Themes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
  pub id:          i64,
  pub name:        String,
  pub slug:        String,
  pub description: Option<String>,
  pub image_url:   Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTheme {
  pub name:        String,
  pub slug:        String,
  pub description: Option<String>,
  pub image_url:   Option<String>,
}

// ─── Agencies ────────────────────────────────────────────────────────────────

/// A local travel agency. `rating` and `reviews_count` are maintained by the
/// store from the `reviews` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
  pub id:              i64,
  /// The agency-role user who speaks for this agency.
  pub user_id:         i64,
  pub name:            String,
  pub description:     Option<String>,
  pub location:        String,
  pub logo_url:        Option<String>,
  pub cover_image_url: Option<String>,
  pub rating:          f64,
  pub reviews_count:   i64,
  pub is_verified:     bool,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAgency {
  pub user_id:         i64,
  pub name:            String,
  pub description:     Option<String>,
  pub location:        String,
  pub logo_url:        Option<String>,
  pub cover_image_url: Option<String>,
  /// Rating carried over from an external source; replaced by the local
  /// average once the first review is recorded.
  #[serde(default)]
  pub rating:          f64,
  #[serde(default)]
  pub reviews_count:   i64,
  #[serde(default)]
  pub is_verified:     bool,
}

// ─── Itineraries ─────────────────────────────────────────────────────────────

/// An agency-authored trip template tied to a destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
  pub id:             i64,
  pub agency_id:      i64,
  pub destination_id: i64,
  pub title:          String,
  pub description:    Option<String>,
  /// Free text such as `"12 jours"`; the leading integer is the day count.
  pub duration:       String,
  pub price_from:     f64,
  pub image_url:      Option<String>,
  pub is_featured:    bool,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

impl Itinerary {
  pub fn days(&self) -> Option<u32> { crate::search::leading_days(&self.duration) }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewItinerary {
  pub agency_id:      i64,
  pub destination_id: i64,
  pub title:          String,
  pub description:    Option<String>,
  pub duration:       String,
  pub price_from:     f64,
  pub image_url:      Option<String>,
  #[serde(default)]
  pub is_featured:    bool,
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// Everything the destination page shows, assembled on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationPage {
  pub destination: Destination,
  pub highlights:  Vec<DestinationHighlight>,
  /// Agencies serving the destination, best rated first.
  pub agencies:    Vec<Agency>,
  /// Featured itineraries first, then cheapest first.
  pub itineraries: Vec<Itinerary>,
}
