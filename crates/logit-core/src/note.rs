//! Notes: immutable annotations attached to exactly one record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  record::{Location, Record},
};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The note discriminant as sent by clients and stored in the `kind` column.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoteKind {
  System,
  #[serde(rename = "others")]
  #[strum(serialize = "others")]
  OtherWork,
  Modification,
  Trip,
}

// ─── Variant payloads ────────────────────────────────────────────────────────

/// A sub-trip inside a WORK record, run on behalf of a transport operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDetail {
  pub transport_operator_id: Uuid,
  pub start_time:            DateTime<Utc>,
  pub end_time:              DateTime<Utc>,
  pub start_location:        Location,
  pub end_location:          Location,
}

/// The typed part of a note. The `kind` tag doubles as the stored
/// discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NoteVariant {
  /// Generated by the server.
  System,
  #[serde(rename = "others")]
  OtherWork,
  /// A manual edit, and who made it.
  Modification { by: Uuid },
  Trip(TripDetail),
}

impl NoteVariant {
  pub fn kind(&self) -> NoteKind {
    match self {
      Self::System => NoteKind::System,
      Self::OtherWork => NoteKind::OtherWork,
      Self::Modification { .. } => NoteKind::Modification,
      Self::Trip(_) => NoteKind::Trip,
    }
  }

  /// The discriminant string stored in the `kind` column.
  /// Must match the serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::System => "system",
      Self::OtherWork => "others",
      Self::Modification { .. } => "modification",
      Self::Trip(_) => "trip",
    }
  }

  /// Serialise the variant fields (without the tag) for the `data_json`
  /// column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let mut full = serde_json::to_value(self)?;
    if let Some(obj) = full.as_object_mut() {
      obj.remove("kind");
    }
    Ok(full)
  }

  /// Rebuild a variant from the discriminant and JSON payload stored in the
  /// database.
  pub fn from_parts(
    discriminant: &str,
    data: serde_json::Value,
  ) -> Result<Self> {
    discriminant
      .parse::<NoteKind>()
      .map_err(|_| Error::UnknownNoteKind(discriminant.to_owned()))?;

    let mut obj: serde_json::Map<String, serde_json::Value> = match data {
      serde_json::Value::Null => serde_json::Map::new(),
      other => serde_json::from_value(other)?,
    };
    obj.insert("kind".into(), serde_json::Value::from(discriminant));
    Ok(serde_json::from_value(serde_json::Value::Object(obj))?)
  }
}

// ─── Note ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
  pub note_id:    Uuid,
  pub record_id:  Uuid,
  #[serde(default)]
  pub comment:    String,
  pub created_at: DateTime<Utc>,
  #[serde(flatten)]
  pub variant:    NoteVariant,
}

/// Client-supplied fields for `AddNote`. Which ones are required depends on
/// the [`NoteKind`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePayload {
  #[serde(default)]
  pub comment:               String,
  /// Modification notes only; defaults to the acting user.
  #[serde(default)]
  pub by:                    Option<Uuid>,
  #[serde(default)]
  pub transport_operator_id: Option<Uuid>,
  #[serde(default)]
  pub start_time:            Option<DateTime<Utc>>,
  #[serde(default)]
  pub end_time:              Option<DateTime<Utc>>,
  #[serde(default)]
  pub start_location:        Option<Location>,
  #[serde(default)]
  pub end_location:          Option<Location>,
}

/// A record bundled with its notes as the read model for the ledger's query
/// operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
  #[serde(flatten)]
  pub record: Record,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub notes:  Vec<Note>,
}
