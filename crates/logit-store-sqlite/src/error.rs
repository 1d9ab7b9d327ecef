//! Error type for `logit-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] logit_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The active flag of this record was not in the expected state: another
  /// transaction moved the driver's active pointer first.
  #[error("active state of record {0} changed concurrently")]
  ActiveContention(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn sqlite_is_transient(e: &rusqlite::Error) -> bool {
  matches!(
    e.sqlite_error_code(),
    Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
  )
}

impl logit_core::store::StoreError for Error {
  fn is_transient(&self) -> bool {
    match self {
      Error::ActiveContention(_) => true,
      Error::Sqlite(e) => sqlite_is_transient(e),
      Error::Database(tokio_rusqlite::Error::Rusqlite(e)) => sqlite_is_transient(e),
      _ => false,
    }
  }
}
