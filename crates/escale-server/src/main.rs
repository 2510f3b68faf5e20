//! escale-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and serves the marketplace over HTTP.
//!
//! # Demo data
//!
//! ```
//! cargo run -p escale-server -- seed
//! ```
//!
//! loads the demo catalogue and the `voyageur@example.com` and
//! `agence@example.com` accounts, both with the password `password123`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use escale_core::store::MarketplaceStore as _;
use escale_server::{AppState, ServerConfig, auth::hash_password};
use escale_store_sqlite::{DemoPasswords, SqliteStore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEMO_PASSWORD: &str = "password123";

#[derive(Parser)]
#[command(author, version, about = "Escale travel marketplace server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve HTTP (the default).
  Serve,
  /// Load the demo catalogue and accounts, then exit.
  Seed,
  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let command = cli.command.unwrap_or(Command::Serve);

  if let Command::HashPassword = command {
    let password = read_password()?;
    println!("{}", hash_password(&password)?);
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ESCALE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.validate().context("invalid configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let seed_only = matches!(command, Command::Seed);
  if seed_only || server_cfg.seed_demo_data {
    seed(&store).await?;
    if seed_only {
      return Ok(());
    }
  }

  let purged = store
    .purge_expired_sessions(Utc::now())
    .await
    .context("failed to purge expired sessions")?;
  if purged > 0 {
    tracing::info!(purged, "removed expired sessions");
  }

  let state = AppState {
    store:  Arc::new(store),
    config: Arc::new(server_cfg.clone()),
  };

  let app = escale_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn seed(store: &SqliteStore) -> anyhow::Result<()> {
  let hash = hash_password(DEMO_PASSWORD)?;
  let passwords = DemoPasswords { traveler_hash: hash.clone(), agency_hash: hash };
  let summary = store.seed_demo(&passwords).await.context("failed to seed demo data")?;
  if summary.skipped {
    tracing::info!("demo data already present");
  } else {
    tracing::info!(
      destinations = summary.destinations,
      agencies = summary.agencies,
      itineraries = summary.itineraries,
      users = summary.users,
      "demo data loaded"
    );
  }
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
