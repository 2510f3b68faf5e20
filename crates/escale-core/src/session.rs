//! Login sessions. Only a digest of the bearer token is ever stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  /// Hex SHA-256 of the token handed to the client.
  pub token_hash: String,
  pub user_id:    i64,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

#[derive(Debug, Clone)]
pub struct NewSession {
  pub token_hash: String,
  pub user_id:    i64,
  pub expires_at: DateTime<Utc>,
}
