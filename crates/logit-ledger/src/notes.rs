//! Note construction for `AddNote`.

use chrono::{DateTime, SubsecRound as _, Utc};
use logit_core::{
  FieldError,
  auth::Principal,
  note::{Note, NoteKind, NotePayload, NoteVariant, TripDetail},
  record::{Location, Record},
};
use uuid::Uuid;

use crate::{LedgerError, Result};

/// Build the note `actor` asked to attach to `record`.
///
/// Ownership of `record` is checked by the caller. System notes are reserved
/// for elevated principals.
pub fn build_note(
  kind: NoteKind,
  record: &Record,
  actor: &Principal,
  payload: NotePayload,
  now: DateTime<Utc>,
) -> Result<Note> {
  let variant = match kind {
    NoteKind::System => {
      if !actor.is_elevated() {
        return Err(LedgerError::Unauthorized);
      }
      NoteVariant::System
    }
    NoteKind::OtherWork => NoteVariant::OtherWork,
    NoteKind::Modification => NoteVariant::Modification {
      by: payload.by.unwrap_or(actor.user_id),
    },
    NoteKind::Trip => NoteVariant::Trip(trip_detail(&payload)?),
  };

  Ok(Note {
    note_id: Uuid::new_v4(),
    record_id: record.record_id,
    comment: payload.comment,
    created_at: now.trunc_subsecs(6),
    variant,
  })
}

fn required<T: Clone>(field: &str, value: &Option<T>) -> Result<T> {
  value
    .clone()
    .ok_or_else(|| FieldError::new(field, "required for trip notes").into())
}

fn required_location(field: &str, value: &Option<Location>) -> Result<Location> {
  let location = required(field, value)?;
  if location.is_empty() {
    return Err(FieldError::new(field, "required for trip notes").into());
  }
  Ok(location)
}

fn trip_detail(payload: &NotePayload) -> Result<TripDetail> {
  let transport_operator_id = required("transport_operator_id", &payload.transport_operator_id)?;
  if transport_operator_id.is_nil() {
    return Err(FieldError::new("transport_operator_id", "required for trip notes").into());
  }

  Ok(TripDetail {
    transport_operator_id,
    start_time: required("start_time", &payload.start_time)?,
    end_time: required("end_time", &payload.end_time)?,
    start_location: required_location("start_location", &payload.start_location)?,
    end_location: required_location("end_location", &payload.end_location)?,
  })
}
