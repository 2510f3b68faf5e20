//! Demo catalogue: the destinations, themes, agencies and itineraries the
//! site ships with, plus the two demo accounts.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension as _};
use serde::Deserialize;

use escale_core::{
  catalog::{NewAgency, NewDestination, NewItinerary, NewTheme},
  user::{NewUser, Role, User},
};

use crate::{
  Error, Result, SqliteStore,
  encode::{encode_dt, now},
  store::{
    fetch_one, insert_agency, insert_destination, insert_highlight, insert_itinerary,
    insert_theme, insert_user, link_agency, tag_theme,
  },
};

const CATALOGUE: &str = include_str!("catalogue.json");

/// Pre-computed password hashes for the demo accounts. Hashing is the
/// server's concern, so the store only ever sees PHC strings.
#[derive(Debug, Clone)]
pub struct DemoPasswords {
  pub traveler_hash: String,
  pub agency_hash:   String,
}

/// What [`SqliteStore::seed_demo`] inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
  pub destinations: usize,
  pub themes:       usize,
  pub agencies:     usize,
  pub itineraries:  usize,
  pub users:        usize,
  /// The catalogue was already present; nothing was written.
  pub skipped:      bool,
}

// ─── Catalogue file ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Catalogue {
  themes:       Vec<NewTheme>,
  travelers:    Vec<Account>,
  destinations: Vec<DestinationSeed>,
}

#[derive(Deserialize)]
struct Account {
  email:      String,
  first_name: String,
  last_name:  String,
}

#[derive(Deserialize)]
struct DestinationSeed {
  #[serde(flatten)]
  destination: NewDestination,
  highlights:  Vec<String>,
  agencies:    Vec<AgencySeed>,
  itineraries: Vec<ItinerarySeed>,
}

#[derive(Deserialize)]
struct AgencySeed {
  name:            String,
  description:     Option<String>,
  location:        String,
  logo_url:        Option<String>,
  cover_image_url: Option<String>,
  rating:          f64,
  reviews_count:   i64,
  is_verified:     bool,
  owner:           Account,
}

#[derive(Deserialize)]
struct ItinerarySeed {
  /// Name of an agency declared on the same destination.
  agency:      String,
  title:       String,
  description: Option<String>,
  duration:    String,
  price_from:  f64,
  image_url:   Option<String>,
  is_featured: bool,
  /// Theme slugs.
  themes:      Vec<String>,
}

// ─── Seeding ─────────────────────────────────────────────────────────────────

impl SqliteStore {
  /// Load the demo catalogue in one transaction. Does nothing when its first
  /// destination is already present, so it is safe to run on every start.
  pub async fn seed_demo(&self, passwords: &DemoPasswords) -> Result<SeedSummary> {
    let catalogue: Catalogue = serde_json::from_str(CATALOGUE)?;
    let passwords = passwords.clone();

    let summary = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let loaded = load(&tx, catalogue, &passwords);
        if loaded.is_ok() {
          tx.commit()?;
        }
        Ok(loaded)
      })
      .await??;

    if summary.skipped {
      tracing::debug!("demo catalogue already present");
    } else {
      tracing::info!(
        destinations = summary.destinations,
        themes = summary.themes,
        agencies = summary.agencies,
        itineraries = summary.itineraries,
        users = summary.users,
        "demo catalogue loaded"
      );
    }
    Ok(summary)
  }
}

fn load(
  conn: &Connection,
  catalogue: Catalogue,
  passwords: &DemoPasswords,
) -> Result<SeedSummary> {
  let Catalogue { themes, travelers, destinations } = catalogue;

  if let Some(first) = destinations.first() {
    let present: Option<i64> = conn
      .query_row(
        "SELECT id FROM destinations WHERE slug = ?1",
        [&first.destination.slug],
        |row| row.get(0),
      )
      .optional()?;
    if present.is_some() {
      return Ok(SeedSummary { skipped: true, ..SeedSummary::default() });
    }
  }

  let at = encode_dt(now());
  let mut summary = SeedSummary::default();

  let mut theme_ids = HashMap::new();
  for theme in &themes {
    theme_ids.insert(theme.slug.as_str(), insert_theme(conn, theme, &at)?);
    summary.themes += 1;
  }

  for account in travelers {
    let (_, created) =
      ensure_user(conn, account, Role::Traveler, &passwords.traveler_hash, &at)?;
    summary.users += usize::from(created);
  }

  for seed in destinations {
    let destination_id = insert_destination(conn, &seed.destination, &at)?;
    summary.destinations += 1;

    for highlight in &seed.highlights {
      insert_highlight(conn, destination_id, highlight)?;
    }

    let mut agency_ids = HashMap::new();
    for agency in seed.agencies {
      let (owner_id, created) =
        ensure_user(conn, agency.owner, Role::Agency, &passwords.agency_hash, &at)?;
      summary.users += usize::from(created);

      let agency = NewAgency {
        user_id:         owner_id,
        name:            agency.name,
        description:     agency.description,
        location:        agency.location,
        logo_url:        agency.logo_url,
        cover_image_url: agency.cover_image_url,
        rating:          agency.rating,
        reviews_count:   agency.reviews_count,
        is_verified:     agency.is_verified,
      };
      let agency_id = insert_agency(conn, &agency, &at)?;
      link_agency(conn, agency_id, destination_id)?;
      agency_ids.insert(agency.name, agency_id);
      summary.agencies += 1;
    }

    for itinerary in seed.itineraries {
      let agency_id = *agency_ids.get(&itinerary.agency).ok_or_else(|| {
        Error::Core(escale_core::Error::validation(format!(
          "catalogue itinerary {:?} names unknown agency {:?}",
          itinerary.title, itinerary.agency
        )))
      })?;

      let itinerary_id = insert_itinerary(
        conn,
        &NewItinerary {
          agency_id,
          destination_id,
          title: itinerary.title.clone(),
          description: itinerary.description,
          duration: itinerary.duration,
          price_from: itinerary.price_from,
          image_url: itinerary.image_url,
          is_featured: itinerary.is_featured,
        },
        &at,
      )?;

      for slug in &itinerary.themes {
        match theme_ids.get(slug.as_str()) {
          Some(&theme_id) => tag_theme(conn, itinerary_id, theme_id)?,
          None => {
            tracing::warn!(%slug, itinerary = %itinerary.title, "unknown theme in catalogue")
          }
        }
      }
      summary.itineraries += 1;
    }
  }

  Ok(summary)
}

/// Id of the user with this email, inserting it when missing. The flag is
/// `true` when a row was inserted.
fn ensure_user(
  conn: &Connection,
  account: Account,
  role: Role,
  password_hash: &str,
  at: &str,
) -> Result<(i64, bool)> {
  let existing: Option<User> =
    fetch_one(conn, "SELECT * FROM users WHERE email = ?1", [&account.email])?;
  if let Some(user) = existing {
    return Ok((user.id, false));
  }
  let user = NewUser {
    email: account.email,
    password_hash: password_hash.to_owned(),
    first_name: account.first_name,
    last_name: account.last_name,
    phone: None,
    role,
  };
  Ok((insert_user(conn, &user, at)?, true))
}
