//! Error types for `logit-core`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown record kind: {0:?}")]
  UnknownRecordKind(String),

  #[error("unknown note kind discriminant: {0:?}")]
  UnknownNoteKind(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Validation outcomes ─────────────────────────────────────────────────────

/// A structurally invalid input field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{field}: {reason}")]
pub struct FieldError {
  pub field:  String,
  pub reason: String,
}

impl FieldError {
  pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
    Self { field: field.into(), reason: reason.into() }
  }
}

/// The continuity rule a candidate broke against the record it extends, or
/// the reason a delete was refused.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConflictKind {
  /// Same kind as the previous record (two WORK or two REST in a row).
  TypeConflict,
  /// Starts before the previous record.
  TimeOrderConflict,
  /// Start location differs from the previous record's end location.
  LocationMismatch,
  /// Start odometer differs from the previous record's end odometer.
  MileageMismatch,
  /// Previous record's time plus duration does not meet this record's time.
  DurationMismatch,
  /// Delete targeted a record that is not the driver's active one.
  NotLatest,
  AlreadyDeleted,
}

/// Either half of a rejected candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
  #[error("invalid field {0}")]
  Invalid(FieldError),
  #[error("conflict with previous record: {0}")]
  Conflict(ConflictKind),
}

impl From<FieldError> for Violation {
  fn from(e: FieldError) -> Self { Self::Invalid(e) }
}

impl From<ConflictKind> for Violation {
  fn from(k: ConflictKind) -> Self { Self::Conflict(k) }
}
