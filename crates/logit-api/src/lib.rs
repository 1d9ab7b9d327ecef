//! JSON API for the Logit driver ledger.
//!
//! Exposes an axum [`Router`] backed by a [`Ledger`]. Authentication happens
//! upstream; this layer only reads the forwarded principal headers (see
//! [`auth`]).
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/record` | Body: [`RecordInput`](logit_core::record::RecordInput); 201 |
//! | `POST`   | `/records/sync` | Body: array of record inputs; 201 |
//! | `GET`    | `/record/latest` | Active record with notes |
//! | `DELETE` | `/record/{id}` | Tombstone the active record; 204 |
//! | `GET`    | `/records` | `?from&to[&driver_id]` |
//! | `POST`   | `/record/note` | Body: [`notes::AddNoteBody`]; 201 |
//! | `PUT`    | `/vehicles/{id}` | Register a vehicle for the acting driver; 204 |

pub mod auth;
pub mod error;
pub mod geocode;
pub mod notes;
pub mod records;
pub mod vehicles;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use logit_core::external::Geocoder;
use logit_ledger::{Ledger, LedgerConfig, LedgerStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use geocode::GeocoderConfig;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LOGIT_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub ledger:     LedgerConfig,
  #[serde(default)]
  pub geocoder:   GeocoderConfig,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, G> {
  pub ledger: Arc<Ledger<S, G>>,
}

impl<S, G> AppState<S, G> {
  pub fn new(ledger: Ledger<S, G>) -> Self { Self { ledger: Arc::new(ledger) } }
}

impl<S, G> Clone for AppState<S, G> {
  fn clone(&self) -> Self { Self { ledger: Arc::clone(&self.ledger) } }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S, G>(state: AppState<S, G>) -> Router
where
  S: LedgerStore,
  G: Geocoder + 'static,
{
  Router::new()
    // Records
    .route("/record", post(records::create::<S, G>))
    .route("/record/latest", get(records::latest::<S, G>))
    .route("/record/{id}", delete(records::delete_latest::<S, G>))
    .route("/records", get(records::list::<S, G>))
    .route("/records/sync", post(records::sync::<S, G>))
    // Notes
    .route("/record/note", post(notes::create::<S, G>))
    // Vehicles
    .route("/vehicles/{id}", put(vehicles::register::<S, G>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
