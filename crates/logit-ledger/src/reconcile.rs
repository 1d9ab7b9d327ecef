//! Batch sync reconciliation.
//!
//! An offline client may flush its records in any order. The batch is sorted
//! by nominal time and threaded through the continuity check one record at a
//! time, starting from the driver's active record; the first failure rejects
//! the whole batch. A single create is a batch of one.

use logit_core::{
  ConflictKind,
  policy::ContinuityPolicy,
  record::Record,
  validate::check_continuity,
};

/// A prepared record and its position in the submitted batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
  pub index:  usize,
  pub record: Record,
}

/// Order a batch by nominal time. Ties keep their submission order.
pub fn order(batch: Vec<Record>) -> Vec<Pending> {
  let mut pending: Vec<Pending> = batch
    .into_iter()
    .enumerate()
    .map(|(index, record)| Pending { index, record })
    .collect();
  pending.sort_by_key(|p| p.record.time);
  pending
}

/// Thread `batch` (already ordered) through the continuity check, starting
/// from `cursor`. Reports the submission index of the first record that does
/// not follow its predecessor.
pub fn thread(
  cursor: Option<&Record>,
  batch: &[Pending],
  policy: &ContinuityPolicy,
) -> Result<(), (usize, ConflictKind)> {
  let mut cursor = cursor;
  for pending in batch {
    if let Some(previous) = cursor {
      check_continuity(&pending.record, previous, policy)
        .map_err(|kind| (pending.index, kind))?;
    }
    cursor = Some(&pending.record);
  }
  Ok(())
}
