//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that text comparison in SQL agrees with time order. Locations and note
//! payloads are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use logit_core::{
  note::{Note, NoteVariant},
  record::{Location, Record, RecordKind},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Kind ────────────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<RecordKind> {
  s.parse()
    .map_err(|_| logit_core::Error::UnknownRecordKind(s.to_owned()).into())
}

// ─── Location ────────────────────────────────────────────────────────────────

pub fn encode_location(loc: &Location) -> Result<String> {
  Ok(serde_json::to_string(loc)?)
}

pub fn decode_location(s: &str) -> Result<Location> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that produces a [`RawRecord`].
pub const RECORD_COLUMNS: &str = "record_id, driver_id, kind, time, duration_secs,
  start_location, end_location, vehicle_id, start_mileage, end_mileage,
  client_time, created_at, deleted_at, active";

/// Raw values read directly from a `records` row.
pub struct RawRecord {
  pub record_id:      String,
  pub driver_id:      String,
  pub kind:           String,
  pub time:           String,
  pub duration_secs:  i64,
  pub start_location: String,
  pub end_location:   String,
  pub vehicle_id:     String,
  pub start_mileage:  Option<f64>,
  pub end_mileage:    Option<f64>,
  pub client_time:    Option<String>,
  pub created_at:     String,
  pub deleted_at:     Option<String>,
  pub active:         bool,
}

impl RawRecord {
  /// Row mapper for queries selecting [`RECORD_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:      row.get(0)?,
      driver_id:      row.get(1)?,
      kind:           row.get(2)?,
      time:           row.get(3)?,
      duration_secs:  row.get(4)?,
      start_location: row.get(5)?,
      end_location:   row.get(6)?,
      vehicle_id:     row.get(7)?,
      start_mileage:  row.get(8)?,
      end_mileage:    row.get(9)?,
      client_time:    row.get(10)?,
      created_at:     row.get(11)?,
      deleted_at:     row.get(12)?,
      active:         row.get(13)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    let duration = TimeDelta::try_seconds(self.duration_secs).ok_or_else(|| {
      Error::DateParse(format!("duration out of range: {}", self.duration_secs))
    })?;

    Ok(Record {
      record_id: decode_uuid(&self.record_id)?,
      driver_id: decode_uuid(&self.driver_id)?,
      kind: decode_kind(&self.kind)?,
      time: decode_dt(&self.time)?,
      duration,
      start_location: decode_location(&self.start_location)?,
      end_location: decode_location(&self.end_location)?,
      vehicle_id: decode_uuid(&self.vehicle_id)?,
      start_mileage: self.start_mileage,
      end_mileage: self.end_mileage,
      client_time: self.client_time.as_deref().map(decode_dt).transpose()?,
      created_at: decode_dt(&self.created_at)?,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
      active: self.active,
    })
  }
}

/// Raw strings read directly from a `notes` row.
pub struct RawNote {
  pub note_id:    String,
  pub record_id:  String,
  pub kind:       String,
  pub comment:    String,
  pub data_json:  String,
  pub created_at: String,
}

impl RawNote {
  pub fn into_note(self) -> Result<Note> {
    let data: serde_json::Value = serde_json::from_str(&self.data_json)?;
    Ok(Note {
      note_id:    decode_uuid(&self.note_id)?,
      record_id:  decode_uuid(&self.record_id)?,
      comment:    self.comment,
      created_at: decode_dt(&self.created_at)?,
      variant:    NoteVariant::from_parts(&self.kind, data)?,
    })
  }
}
