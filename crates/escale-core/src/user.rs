//! User accounts: travelers, agency staff and administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a user account is allowed to do on the marketplace.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
  strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  #[default]
  Traveler,
  Agency,
  Admin,
}

/// A persisted user row.
///
/// `password_hash` is an argon2 PHC string and is never serialised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:            i64,
  pub email:         String,
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
  pub phone:         Option<String>,
  pub role:          Role,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl User {
  /// Display name: first and last name joined by a space.
  pub fn display_name(&self) -> String {
    match (self.first_name.trim(), self.last_name.trim()) {
      ("", last) => last.to_owned(),
      (first, "") => first.to_owned(),
      (first, last) => format!("{first} {last}"),
    }
  }

  pub fn session_user(&self) -> SessionUser {
    SessionUser {
      id:    self.id,
      name:  self.display_name(),
      email: self.email.clone(),
      role:  self.role,
    }
  }
}

/// Input to [`crate::store::MarketplaceStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  pub password_hash: String,
  pub first_name:    String,
  pub last_name:     String,
  pub phone:         Option<String>,
  pub role:          Role,
}

/// A partial update of a user row. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
  pub email:         Option<String>,
  pub password_hash: Option<String>,
  pub first_name:    Option<String>,
  pub last_name:     Option<String>,
  /// `Some(None)` clears the number.
  pub phone:         Option<Option<String>>,
  pub role:          Option<Role>,
}

impl UserUpdate {
  pub fn is_empty(&self) -> bool {
    self.email.is_none()
      && self.password_hash.is_none()
      && self.first_name.is_none()
      && self.last_name.is_none()
      && self.phone.is_none()
      && self.role.is_none()
  }
}

/// The public identity returned by login and kept by the client between
/// requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
  pub id:    i64,
  pub name:  String,
  pub email: String,
  pub role:  Role,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(first: &str, last: &str) -> User {
    User {
      id:            7,
      email:         "jean@example.com".into(),
      password_hash: "$argon2id$secret".into(),
      first_name:    first.into(),
      last_name:     last.into(),
      phone:         None,
      role:          Role::Traveler,
      created_at:    Utc::now(),
      updated_at:    Utc::now(),
    }
  }

  #[test]
  fn display_name_joins_parts() {
    assert_eq!(user("Jean", "Dupont").display_name(), "Jean Dupont");
    assert_eq!(user("", "Dupont").display_name(), "Dupont");
    assert_eq!(user("Jean", " ").display_name(), "Jean");
  }

  #[test]
  fn password_hash_is_not_serialised() {
    let json = serde_json::to_value(user("Jean", "Dupont")).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["role"], "traveler");
  }

  #[test]
  fn role_parses_from_column_text() {
    assert_eq!("agency".parse::<Role>().unwrap(), Role::Agency);
    assert_eq!(Role::Admin.as_ref(), "admin");
    assert!("pilot".parse::<Role>().is_err());
  }
}
