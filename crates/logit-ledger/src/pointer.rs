//! The active-pointer manager.
//!
//! Exactly two transactions ever move a driver's active flag. [`promote`]
//! appends records and hands the flag to the last one; [`demote`] tombstones
//! the active record and hands the flag back to its predecessor. Each runs
//! as one [`RecordStore::with_transaction`] unit, so a lost race surfaces as
//! a transient store error and nothing is written.

use chrono::{DateTime, Utc};
use logit_core::{record::Record, store::RecordStore};

/// Flag the last of `records` active and clear every other flag.
pub fn activate_last(records: &mut [Record]) {
  let last = records.len().saturating_sub(1);
  for (i, record) in records.iter_mut().enumerate() {
    record.active = i == last;
  }
}

/// Persist `records` (already flagged by [`activate_last`]) and clear the
/// flag on `previous`, the driver's active record when the chain was read.
pub async fn promote<S: RecordStore>(
  store: &S,
  previous: Option<&Record>,
  records: Vec<Record>,
) -> Result<(), S::Error> {
  let previous = previous.map(|p| (p.record_id, p.driver_id));

  store
    .with_transaction(move |w| {
      if let Some((record_id, driver_id)) = previous {
        w.set_active(record_id, driver_id, false)?;
      }
      w.insert_batch(&records)
    })
    .await
}

/// Tombstone `deleted` at `at` and make `restore` the active record.
pub async fn demote<S: RecordStore>(
  store: &S,
  deleted: &Record,
  restore: Option<&Record>,
  at: DateTime<Utc>,
) -> Result<(), S::Error> {
  let deleted_id = deleted.record_id;
  let restore = restore.map(|r| (r.record_id, r.driver_id));

  store
    .with_transaction(move |w| {
      w.soft_delete(deleted_id, at)?;
      if let Some((record_id, driver_id)) = restore {
        w.set_active(record_id, driver_id, true)?;
      }
      Ok(())
    })
    .await
}
