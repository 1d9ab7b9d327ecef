//! Record types: the fundamental unit of the driver ledger.
//!
//! A record is one WORK or REST interval for a driver. Once written, only two
//! things can change about it: its `active` flag and its `deleted_at`
//! tombstone.

use chrono::{DateTime, SubsecRound as _, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
  Work,
  Rest,
}

impl RecordKind {
  /// The kind that must follow this one in a driver's timeline.
  pub fn next(self) -> Self {
    match self {
      Self::Work => Self::Rest,
      Self::Rest => Self::Work,
    }
  }
}

// ─── Location ────────────────────────────────────────────────────────────────

/// A point on the Earth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  pub lat: f64,
  pub lng: f64,
}

impl Coordinates {
  pub fn is_valid(&self) -> bool {
    self.lat.is_finite()
      && self.lng.is_finite()
      && (-90.0..=90.0).contains(&self.lat)
      && (-180.0..=180.0).contains(&self.lng)
  }
}

/// A place, known by address, by coordinates, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub coordinates: Option<Coordinates>,
}

impl Location {
  pub fn new(address: impl Into<String>, coordinates: Coordinates) -> Self {
    Self {
      address:     Some(address.into()),
      coordinates: Some(coordinates),
    }
  }

  pub fn from_address(address: impl Into<String>) -> Self {
    Self { address: Some(address.into()), coordinates: None }
  }

  pub fn from_coordinates(coordinates: Coordinates) -> Self {
    Self { address: None, coordinates: Some(coordinates) }
  }

  /// The address, if present and not blank.
  pub fn address(&self) -> Option<&str> {
    self.address.as_deref().map(str::trim).filter(|a| !a.is_empty())
  }

  pub fn is_empty(&self) -> bool {
    self.address().is_none() && self.coordinates.is_none()
  }

  /// Both halves are known.
  pub fn is_complete(&self) -> bool {
    self.address().is_some() && self.coordinates.is_some()
  }

  /// Whether `self` and `other` name the same place.
  ///
  /// Addresses are authoritative when both sides carry one; coordinates are
  /// compared exactly only when an address is missing on either side.
  pub fn same_place(&self, other: &Location) -> bool {
    match (self.address(), other.address()) {
      (Some(a), Some(b)) => a == b,
      _ => match (self.coordinates, other.coordinates) {
        (Some(a), Some(b)) => a == b,
        _ => false,
      },
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A single work/rest interval for one driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub record_id:      Uuid,
  pub driver_id:      Uuid,
  pub kind:           RecordKind,
  /// Server-trusted instant the period starts.
  pub time:           DateTime<Utc>,
  /// Length of the period. Zero while the period is still open.
  #[serde(with = "duration_secs")]
  pub duration:       TimeDelta,
  pub start_location: Location,
  pub end_location:   Location,
  pub vehicle_id:     Uuid,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_mileage:  Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub end_mileage:    Option<f64>,
  /// Set when `time` was entered on a device rather than observed live.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub client_time:    Option<DateTime<Utc>>,
  pub created_at:     DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deleted_at:     Option<DateTime<Utc>>,
  /// Present (and `true`) only on the driver's current record.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub active:         bool,
}

impl Record {
  /// Build an inactive, not-yet-persisted record from client input.
  ///
  /// Timestamps are truncated to whole microseconds, the precision records
  /// are stored at.
  pub fn from_input(
    driver_id: Uuid,
    input: RecordInput,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self {
      record_id: Uuid::new_v4(),
      driver_id,
      kind: input.kind,
      time: input.time.trunc_subsecs(6),
      duration: input.duration,
      start_location: input.start_location,
      end_location: input.end_location,
      vehicle_id: input.vehicle_id,
      start_mileage: input.start_mileage,
      end_mileage: input.end_mileage,
      client_time: input.client_time.map(|t| t.trunc_subsecs(6)),
      created_at: created_at.trunc_subsecs(6),
      deleted_at: None,
      active: false,
    }
  }

  /// When the period ends, if its duration is known.
  pub fn end_time(&self) -> Option<DateTime<Utc>> {
    (self.duration > TimeDelta::zero()).then(|| self.time + self.duration)
  }

  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }
}

// ─── RecordInput ─────────────────────────────────────────────────────────────

/// Input to `CreateRecord` and each element of a `SyncRecords` batch.
/// The driver comes from the acting principal, never from the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordInput {
  pub kind:           RecordKind,
  pub time:           DateTime<Utc>,
  #[serde(with = "duration_secs")]
  pub duration:       TimeDelta,
  pub start_location: Location,
  pub end_location:   Location,
  pub vehicle_id:     Uuid,
  #[serde(default)]
  pub start_mileage:  Option<f64>,
  #[serde(default)]
  pub end_mileage:    Option<f64>,
  #[serde(default)]
  pub client_time:    Option<DateTime<Utc>>,
}

// ─── Serde helpers ───────────────────────────────────────────────────────────

/// Serialises a [`TimeDelta`] as a whole number of seconds.
pub mod duration_secs {
  use chrono::TimeDelta;
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  pub fn serialize<S: Serializer>(
    d: &TimeDelta,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(d.num_seconds())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<TimeDelta, D::Error> {
    let secs = i64::deserialize(deserializer)?;
    TimeDelta::try_seconds(secs)
      .ok_or_else(|| D::Error::custom(format!("duration out of range: {secs}")))
  }
}
