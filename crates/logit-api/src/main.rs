//! logit-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `LOGIT_*` environment variables, opens the SQLite ledger store, and serves
//! the JSON API over HTTP.
//!
//! Nested keys use a double underscore, e.g.
//! `LOGIT_LEDGER__POLICY__CLOCK_SKEW_SECS=30`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use logit_api::{AppState, ServerConfig, geocode::ServerGeocoder};
use logit_ledger::Ledger;
use logit_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Logit driver ledger server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("LOGIT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let geocoder = ServerGeocoder::from_config(&server_cfg.geocoder)
    .context("failed to build geocoder")?;
  if matches!(geocoder, ServerGeocoder::Disabled) {
    tracing::warn!("no geocoder API key configured; partial end locations will be rejected");
  }

  let ledger = Ledger::new(store, geocoder, server_cfg.ledger.clone());
  let app = logit_api::router(AppState::new(ledger));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
