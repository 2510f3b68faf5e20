//! Catalogue query-string parameters shared by `/destinations` and the
//! server's `/search`.

use escale_core::search::{DestinationQuery, DurationRange};
use serde::Deserialize;

use crate::error::ApiError;

/// Raw filter sidebar values. HTML forms submit empty strings for untouched
/// fields, so every value arrives as text and blanks are dropped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogueParams {
  pub continent:  Option<String>,
  /// Theme slug.
  pub theme:      Option<String>,
  pub budget_min: Option<String>,
  pub budget_max: Option<String>,
  /// `1-7`, `8-14`, `15-21`, `22+`, `8-14 jours`, `court`, …
  pub duration:   Option<String>,
  #[serde(alias = "q")]
  pub search:     Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn budget(value: Option<String>) -> Result<Option<f64>, ApiError> {
  present(value)
    .map(|raw| {
      raw
        .parse::<f64>()
        .ok()
        .filter(|b| b.is_finite() && *b >= 0.0)
        .ok_or_else(|| ApiError::BadRequest(format!("Budget invalide : {raw}")))
    })
    .transpose()
}

impl CatalogueParams {
  pub fn into_query(self) -> Result<DestinationQuery, ApiError> {
    let duration = present(self.duration)
      .map(|raw| {
        raw
          .parse::<DurationRange>()
          .map_err(|_| ApiError::BadRequest(format!("Durée inconnue : {raw}")))
      })
      .transpose()?;

    let query = DestinationQuery {
      text: present(self.search),
      continent: present(self.continent),
      theme: present(self.theme),
      budget_min: budget(self.budget_min)?,
      budget_max: budget(self.budget_max)?,
      duration,
    };
    query.validate().map_err(|_| {
      ApiError::BadRequest("Le budget minimum dépasse le budget maximum".to_owned())
    })?;
    Ok(query)
  }
}
