//! The store traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g. `logit-store-sqlite`).
//! The ledger engine depends on these abstractions, not on any concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{note::Note, record::Record};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Bound on backend error types.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// `true` when the failure is transient: a lost race on a driver's active
  /// pointer, a busy database, an aborted transaction. Only these are worth
  /// retrying.
  fn is_transient(&self) -> bool;
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RecordStore::query_records`].
#[derive(Debug, Clone)]
pub struct RecordQuery {
  pub driver_id:       Uuid,
  /// Inclusive lower bound on `time`.
  pub from:            DateTime<Utc>,
  /// Inclusive upper bound on `time`.
  pub to:              DateTime<Utc>,
  pub include_deleted: bool,
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Write operations available inside [`RecordStore::with_transaction`].
///
/// `set_active` and `soft_delete` are compare-and-swap updates: if the row is
/// not in the expected state (someone else flipped it first) they fail with a
/// transient error and the whole transaction rolls back.
pub trait RecordWriter {
  type Error;

  /// Append one record.
  fn insert(&mut self, record: &Record) -> Result<(), Self::Error>;

  /// Append records in order.
  fn insert_batch(&mut self, records: &[Record]) -> Result<(), Self::Error> {
    for record in records {
      self.insert(record)?;
    }
    Ok(())
  }

  /// Flip `active` on exactly one non-deleted record of `driver_id`.
  fn set_active(
    &mut self,
    record_id: Uuid,
    driver_id: Uuid,
    active: bool,
  ) -> Result<(), Self::Error>;

  /// Tombstone the driver's active record at `at`, clearing its flag.
  fn soft_delete(
    &mut self,
    record_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<(), Self::Error>;
}

// ─── Record store ────────────────────────────────────────────────────────────

/// Persistence for records.
///
/// Rows are never physically removed. All methods return `Send` futures so
/// the trait can be used in multi-threaded async runtimes (e.g. tokio with
/// `axum`).
pub trait RecordStore: Send + Sync {
  type Error: StoreError;

  /// The record currently flagged active for `driver_id`.
  fn get_active(
    &self,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Point lookup, tombstoned or not.
  fn get_record(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// The driver's newest non-deleted records, newest first (by `time`, then
  /// insertion order).
  fn recent_records(
    &self,
    driver_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;

  /// Range query by nominal time, ascending.
  fn query_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// Run `f` as one atomic unit of work. Commits if `f` returns `Ok`; rolls
  /// back otherwise, including when `f` panics.
  fn with_transaction<F, T>(
    &self,
    f: F,
  ) -> impl Future<Output = Result<T, Self::Error>> + Send + '_
  where
    F: FnOnce(&mut dyn RecordWriter<Error = Self::Error>) -> Result<T, Self::Error>
      + Send
      + 'static,
    T: Send + 'static;
}

// ─── Note store ──────────────────────────────────────────────────────────────

/// Persistence for notes. Notes are append-only.
pub trait NoteStore: Send + Sync {
  type Error: StoreError;

  fn insert_note<'a>(
    &'a self,
    note: &'a Note,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// All notes attached to any of `record_ids`, oldest first.
  fn notes_for_records<'a>(
    &'a self,
    record_ids: &'a [Uuid],
  ) -> impl Future<Output = Result<Vec<Note>, Self::Error>> + Send + 'a;
}
