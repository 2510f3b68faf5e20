//! Catalogue search: destination filters, duration ranges, saved searches
//! and per-user search preferences.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Duration ranges ─────────────────────────────────────────────────────────

/// An inclusive range of trip lengths in days. `max == None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DurationRange {
  pub min: u32,
  pub max: Option<u32>,
}

impl DurationRange {
  pub const fn new(min: u32, max: Option<u32>) -> Self { Self { min, max } }

  pub fn contains(&self, days: u32) -> bool {
    days >= self.min && self.max.is_none_or(|max| days <= max)
  }
}

impl FromStr for DurationRange {
  type Err = Error;

  /// Accepts the filter sidebar values (`1-7`, `22+`), the quote form values
  /// (`8-14 jours`) and the named buckets `court`, `moyen` and `long`.
  fn from_str(s: &str) -> Result<Self> {
    let unknown = || Error::UnknownDuration(s.to_owned());
    let lowered = s.trim().to_lowercase();
    let spec = lowered.trim_end_matches("jours").trim_end_matches("jour").trim();

    match spec {
      "court" => return Ok(Self::new(1, Some(7))),
      "moyen" => return Ok(Self::new(8, Some(14))),
      "long" => return Ok(Self::new(15, Some(100))),
      _ => {}
    }

    if let Some(min) = spec.strip_suffix('+') {
      let min = min.trim().parse().map_err(|_| unknown())?;
      return Ok(Self::new(min, None));
    }

    let (min, max) = spec.split_once('-').ok_or_else(unknown)?;
    let min: u32 = min.trim().parse().map_err(|_| unknown())?;
    let max: u32 = max.trim().parse().map_err(|_| unknown())?;
    if min > max {
      return Err(unknown());
    }
    Ok(Self::new(min, Some(max)))
  }
}

impl fmt::Display for DurationRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.max {
      Some(max) => write!(f, "{}-{}", self.min, max),
      None => write!(f, "{}+", self.min),
    }
  }
}

impl From<DurationRange> for String {
  fn from(r: DurationRange) -> Self { r.to_string() }
}

impl TryFrom<String> for DurationRange {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

/// The day count at the start of a free-text duration: `"12 jours"` → 12.
pub fn leading_days(duration: &str) -> Option<u32> {
  let digits: String = duration
    .trim_start()
    .chars()
    .take_while(char::is_ascii_digit)
    .collect();
  digits.parse().ok()
}

// ─── Continents ──────────────────────────────────────────────────────────────

/// Filter keys used by the catalogue sidebar and the labels stored on
/// destinations.
pub const CONTINENTS: &[(&str, &str)] = &[
  ("europe", "Europe"),
  ("asie", "Asie"),
  ("afrique", "Afrique"),
  ("amerique_nord", "Amérique du Nord"),
  ("amerique_sud", "Amérique du Sud"),
  ("oceanie", "Océanie"),
];

/// Resolve a sidebar key to its stored label. Anything else is returned as
/// given, so callers may also filter by label directly.
pub fn continent_label(key: &str) -> String {
  let key = key.trim();
  CONTINENTS
    .iter()
    .find(|(k, _)| k.eq_ignore_ascii_case(key))
    .map(|(_, label)| (*label).to_owned())
    .unwrap_or_else(|| key.to_owned())
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::MarketplaceStore::advanced_search`].
///
/// Destination-level filters (`text`, `continent`) apply to the destination
/// row. Itinerary-level filters (`theme`, budget, `duration`) match when a
/// single itinerary of the destination satisfies all of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationQuery {
  /// Case-insensitive substring over name, country, continent and
  /// description.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub text:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub continent:  Option<String>,
  /// Theme slug.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub theme:      Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub budget_min: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub budget_max: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub duration:   Option<DurationRange>,
}

impl DestinationQuery {
  pub fn validate(&self) -> Result<()> {
    if let (Some(min), Some(max)) = (self.budget_min, self.budget_max)
      && min > max
    {
      return Err(Error::InvalidBudget { min, max });
    }
    Ok(())
  }

  /// Whether any itinerary-level constraint is present.
  pub fn constrains_itineraries(&self) -> bool {
    self.theme.is_some()
      || self.budget_min.is_some()
      || self.budget_max.is_some()
      || self.duration.is_some()
  }

  pub fn is_empty(&self) -> bool {
    self.text.is_none() && self.continent.is_none() && !self.constrains_itineraries()
  }

  /// JSON form of the non-text filters, as kept in search history.
  pub fn filters_json(&self) -> Result<Option<String>> {
    let filters = Self { text: None, ..self.clone() };
    if filters.is_empty() {
      return Ok(None);
    }
    Ok(Some(serde_json::to_string(&filters)?))
  }
}

// ─── History ─────────────────────────────────────────────────────────────────

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHistory {
  pub id:           i64,
  /// `None` for anonymous searches.
  pub user_id:      Option<i64>,
  pub search_query: String,
  /// JSON-encoded filters, see [`DestinationQuery::filters_json`].
  pub filters:      Option<String>,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSearch {
  pub user_id:      Option<i64>,
  pub search_query: String,
  pub filters:      Option<String>,
}

// ─── Preferences ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPreference {
  pub id:                            i64,
  pub user_id:                       i64,
  pub preferred_destinations:        Option<String>,
  pub preferred_themes:              Option<String>,
  pub preferred_duration:            Option<String>,
  pub preferred_budget_min:          Option<f64>,
  pub preferred_budget_max:          Option<f64>,
  pub preferred_accommodation_types: Option<String>,
  pub created_at:                    DateTime<Utc>,
  pub updated_at:                    DateTime<Utc>,
}

/// Partial update of a user's preferences. `None` fields are left untouched
/// on update and stored as NULL on first insert.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPreferenceUpdate {
  pub preferred_destinations:        Option<String>,
  pub preferred_themes:              Option<String>,
  pub preferred_duration:            Option<String>,
  pub preferred_budget_min:          Option<f64>,
  pub preferred_budget_max:          Option<f64>,
  pub preferred_accommodation_types: Option<String>,
}

impl SearchPreferenceUpdate {
  pub fn is_empty(&self) -> bool {
    self.preferred_destinations.is_none()
      && self.preferred_themes.is_none()
      && self.preferred_duration.is_none()
      && self.preferred_budget_min.is_none()
      && self.preferred_budget_max.is_none()
      && self.preferred_accommodation_types.is_none()
  }
}
