//! The server's [`Geocoder`]: the Google Geocoding API when an API key is
//! configured, otherwise a geocoder that refuses every lookup.

use std::time::Duration;

use logit_core::{external::Geocoder, record::Coordinates};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
  /// Google API key. Geocoding is disabled without one.
  pub api_key:      Option<String>,
  pub base_url:     String,
  pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
  fn default() -> Self {
    Self {
      api_key:      None,
      base_url:     "https://maps.googleapis.com/maps/api/geocode".into(),
      timeout_secs: 10,
    }
  }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
  #[error("geocoding is not configured")]
  Disabled,

  #[error("geocoding request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("geocoder answered {0}")]
  Status(String),

  #[error("no geocoding result")]
  NoResult,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
  status:  String,
  #[serde(default)]
  results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
  formatted_address: String,
  geometry:          Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
  location: Coordinates,
}

impl GeocodeResponse {
  fn first(self) -> Result<GeocodeResult, GeocodeError> {
    match self.status.as_str() {
      "OK" => self.results.into_iter().next().ok_or(GeocodeError::NoResult),
      "ZERO_RESULTS" => Err(GeocodeError::NoResult),
      _ => Err(GeocodeError::Status(self.status)),
    }
  }
}

// ─── Google client ───────────────────────────────────────────────────────────

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GoogleGeocoder {
  client:   Client,
  base_url: String,
  api_key:  String,
}

impl GoogleGeocoder {
  pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, GeocodeError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_owned(),
      api_key: api_key.to_owned(),
    })
  }

  async fn lookup(&self, param: &str, value: String) -> Result<GeocodeResult, GeocodeError> {
    let response: GeocodeResponse = self
      .client
      .get(format!("{}/json", self.base_url))
      .query(&[(param, value), ("key", self.api_key.clone())])
      .send()
      .await?
      .error_for_status()?
      .json()
      .await?;
    response.first()
  }
}

// ─── Server geocoder ─────────────────────────────────────────────────────────

pub enum ServerGeocoder {
  Disabled,
  Google(GoogleGeocoder),
}

impl ServerGeocoder {
  pub fn from_config(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
    match config.api_key.as_deref().filter(|k| !k.is_empty()) {
      Some(key) => Ok(Self::Google(GoogleGeocoder::new(
        &config.base_url,
        key,
        Duration::from_secs(config.timeout_secs),
      )?)),
      None => Ok(Self::Disabled),
    }
  }
}

impl Geocoder for ServerGeocoder {
  type Error = GeocodeError;

  async fn resolve_coordinates(&self, address: &str) -> Result<Coordinates, GeocodeError> {
    match self {
      Self::Disabled => Err(GeocodeError::Disabled),
      Self::Google(g) => Ok(g.lookup("address", address.to_owned()).await?.geometry.location),
    }
  }

  async fn resolve_address(&self, coordinates: Coordinates) -> Result<String, GeocodeError> {
    match self {
      Self::Disabled => Err(GeocodeError::Disabled),
      Self::Google(g) => {
        let latlng = format!("{},{}", coordinates.lat, coordinates.lng);
        Ok(g.lookup("latlng", latlng).await?.formatted_address)
      }
    }
  }
}
