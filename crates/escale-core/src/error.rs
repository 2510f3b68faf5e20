//! Error types for `escale-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A form failed validation. The message is user-facing.
  #[error("{0}")]
  Validation(String),

  #[error("unknown duration range: {0:?}")]
  UnknownDuration(String),

  #[error("invalid budget range: {min} > {max}")]
  InvalidBudget { min: f64, max: f64 },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
