//! The continuity validator.
//!
//! Pure functions: a candidate [`Record`] is checked first on its own
//! (required fields, mileage pair, clock policy) and then against the record
//! it extends. The first violated rule wins.
//!
//! Filling in a partially specified end location needs the geocoder and so
//! happens outside this module; [`end_location_completion`] only reports
//! which half is missing.

use chrono::{DateTime, Utc};

use crate::{
  ConflictKind, FieldError, Violation,
  policy::ContinuityPolicy,
  record::{Coordinates, Location, Record},
};

/// Validate `candidate` against `previous`, the driver's record immediately
/// before it (or `None` if this is the driver's first record).
pub fn validate(
  candidate: &Record,
  previous: Option<&Record>,
  now: DateTime<Utc>,
  policy: &ContinuityPolicy,
) -> Result<(), Violation> {
  check_fields(candidate, now, policy)?;
  if let Some(prev) = previous {
    check_continuity(candidate, prev, policy)?;
  }
  Ok(())
}

// ─── Field-level checks ──────────────────────────────────────────────────────

pub fn check_fields(
  record: &Record,
  now: DateTime<Utc>,
  policy: &ContinuityPolicy,
) -> Result<(), FieldError> {
  if record.vehicle_id.is_nil() {
    return Err(FieldError::new("vehicle_id", "required"));
  }
  if record.duration < chrono::TimeDelta::zero() {
    return Err(FieldError::new("duration", "must not be negative"));
  }

  check_location("start_location", &record.start_location)?;
  check_location("end_location", &record.end_location)?;

  check_mileage("start_mileage", record.start_mileage)?;
  check_mileage("end_mileage", record.end_mileage)?;
  if let (Some(start), Some(end)) = (record.start_mileage, record.end_mileage)
    && start > end
  {
    return Err(FieldError::new(
      "end_mileage",
      "must not be less than start_mileage",
    ));
  }

  match record.client_time {
    // Live capture: the device clock must agree with ours.
    None => {
      if (record.time - now).abs() > policy.clock_skew() {
        return Err(FieldError::new(
          "time",
          format!(
            "differs from server time by more than {}s",
            policy.clock_skew_secs
          ),
        ));
      }
    }
    // Entered by hand: trusted, but never ahead of us.
    Some(_) => {
      if record.time > now {
        return Err(FieldError::new("time", "cannot be in the future"));
      }
    }
  }

  Ok(())
}

fn check_location(field: &str, loc: &Location) -> Result<(), FieldError> {
  if loc.is_empty() {
    return Err(FieldError::new(field, "address or coordinates required"));
  }
  if let Some(c) = loc.coordinates
    && !c.is_valid()
  {
    return Err(FieldError::new(field, "coordinates out of range"));
  }
  Ok(())
}

fn check_mileage(field: &str, value: Option<f64>) -> Result<(), FieldError> {
  match value {
    Some(v) if !v.is_finite() || v < 0.0 => {
      Err(FieldError::new(field, "must be a non-negative number"))
    }
    _ => Ok(()),
  }
}

// ─── Continuity checks ───────────────────────────────────────────────────────

/// Check `candidate` against the record it follows.
pub fn check_continuity(
  candidate: &Record,
  previous: &Record,
  policy: &ContinuityPolicy,
) -> Result<(), ConflictKind> {
  if candidate.kind == previous.kind {
    return Err(ConflictKind::TypeConflict);
  }
  if candidate.time < previous.time {
    return Err(ConflictKind::TimeOrderConflict);
  }
  if !candidate.start_location.same_place(&previous.end_location) {
    return Err(ConflictKind::LocationMismatch);
  }
  if let (Some(start), Some(end)) = (candidate.start_mileage, previous.end_mileage)
    && !policy.mileage_matches(start, end)
  {
    return Err(ConflictKind::MileageMismatch);
  }
  // An open period (zero duration) has no known end to compare against.
  if let Some(end) = previous.end_time()
    && (end - candidate.time).abs() > policy.gap_tolerance()
  {
    return Err(ConflictKind::DurationMismatch);
  }
  Ok(())
}

// ─── End-location completion ─────────────────────────────────────────────────

/// The half of an end location the geocoder must supply.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
  /// Address known; resolve its coordinates.
  Coordinates(String),
  /// Coordinates known; resolve their address.
  Address(Coordinates),
}

/// What, if anything, must be resolved before `record.end_location` is
/// complete. `None` when both halves are present or both are missing (the
/// latter is a field error caught by [`check_fields`]).
pub fn end_location_completion(record: &Record) -> Option<Completion> {
  let loc = &record.end_location;
  match (loc.address(), loc.coordinates) {
    (Some(addr), None) => Some(Completion::Coordinates(addr.to_owned())),
    (None, Some(coords)) => Some(Completion::Address(coords)),
    _ => None,
  }
}
