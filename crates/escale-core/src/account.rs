//! Account forms: registration, login and profile edits.
//!
//! Validation messages are user-facing and shown verbatim by the client.

use serde::Deserialize;

use crate::{
  Error, Result,
  user::{Role, UserUpdate},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub const MSG_REQUIRED_FIELDS: &str = "Veuillez remplir tous les champs obligatoires";
pub const MSG_LOGIN_FIELDS: &str = "Veuillez remplir tous les champs";
pub const MSG_PASSWORD_MISMATCH: &str = "Les mots de passe ne correspondent pas";
pub const MSG_PASSWORD_TOO_SHORT: &str =
  "Le mot de passe doit contenir au moins 8 caractères";
pub const MSG_EMAIL_TAKEN: &str = "Cet email est déjà utilisé";
pub const MSG_BAD_CREDENTIALS: &str = "Identifiants incorrects";
pub const MSG_CURRENT_PASSWORD: &str = "Veuillez saisir votre mot de passe actuel";
pub const MSG_WRONG_PASSWORD: &str = "Mot de passe actuel incorrect";
pub const MSG_NEW_PASSWORD_MISMATCH: &str = "Les nouveaux mots de passe ne correspondent pas";
pub const MSG_NEW_PASSWORD_TOO_SHORT: &str =
  "Le nouveau mot de passe doit contenir au moins 8 caractères";

/// Lower-cased, trimmed form used for storage and lookup.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn blank(s: &str) -> bool { s.trim().is_empty() }

fn non_blank(s: Option<String>) -> Option<String> {
  s.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

// ─── Registration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  pub email:            String,
  pub password:         String,
  pub confirm_password: Option<String>,
  pub first_name:       String,
  pub last_name:        String,
  pub phone:            Option<String>,
  pub role:             Option<Role>,
}

impl Registration {
  pub fn validate(&self) -> Result<()> {
    if blank(&self.email)
      || self.password.is_empty()
      || blank(&self.first_name)
      || blank(&self.last_name)
    {
      return Err(Error::validation(MSG_REQUIRED_FIELDS));
    }
    if let Some(confirm) = &self.confirm_password
      && confirm != &self.password
    {
      return Err(Error::validation(MSG_PASSWORD_MISMATCH));
    }
    if self.password.chars().count() < MIN_PASSWORD_LEN {
      return Err(Error::validation(MSG_PASSWORD_TOO_SHORT));
    }
    if self.role == Some(Role::Admin) {
      return Err(Error::validation("Ce rôle ne peut pas être choisi à l'inscription"));
    }
    Ok(())
  }

  pub fn role(&self) -> Role { self.role.unwrap_or_default() }

  pub fn phone(&self) -> Option<String> { non_blank(self.phone.clone()) }
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Login {
  pub email:    String,
  pub password: String,
}

impl Login {
  pub fn validate(&self) -> Result<()> {
    if blank(&self.email) || self.password.is_empty() {
      return Err(Error::validation(MSG_LOGIN_FIELDS));
    }
    Ok(())
  }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// The profile page form. Password fields are only considered when a new
/// password or its confirmation is present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileEdit {
  pub first_name:       Option<String>,
  pub last_name:        Option<String>,
  pub phone:            Option<String>,
  pub current_password: Option<String>,
  pub new_password:     Option<String>,
  pub confirm_password: Option<String>,
}

impl ProfileEdit {
  pub fn wants_password_change(&self) -> bool {
    self.new_password.as_deref().is_some_and(|p| !p.is_empty())
      || self.confirm_password.as_deref().is_some_and(|p| !p.is_empty())
  }

  /// Validate the password section. Returns the new password when a change
  /// was requested and is acceptable.
  pub fn validate_password_change(&self) -> Result<Option<&str>> {
    if !self.wants_password_change() {
      return Ok(None);
    }
    if self.current_password.as_deref().is_none_or(str::is_empty) {
      return Err(Error::validation(MSG_CURRENT_PASSWORD));
    }
    let new = self.new_password.as_deref().unwrap_or_default();
    if Some(new) != self.confirm_password.as_deref() {
      return Err(Error::validation(MSG_NEW_PASSWORD_MISMATCH));
    }
    if new.chars().count() < MIN_PASSWORD_LEN {
      return Err(Error::validation(MSG_NEW_PASSWORD_TOO_SHORT));
    }
    Ok(Some(new))
  }

  /// The non-password part of the edit as a store update. Blank names are
  /// ignored rather than written. A blank phone clears the stored number.
  pub fn identity_update(&self) -> UserUpdate {
    UserUpdate {
      first_name: non_blank(self.first_name.clone()),
      last_name: non_blank(self.last_name.clone()),
      phone: self.phone.clone().map(|p| non_blank(Some(p))),
      ..UserUpdate::default()
    }
  }
}
