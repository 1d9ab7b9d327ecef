//! Error type for `logit-ledger`.

use logit_core::{ConflictKind, FieldError, store::StoreError};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum LedgerError {
  /// Structurally invalid input. `index` is the position in the submitted
  /// batch, when the input was a batch.
  #[error("invalid {}: {}", .error.field, .error.reason)]
  Validation {
    error: FieldError,
    index: Option<usize>,
  },

  /// A continuity rule was broken, or a delete targeted the wrong record.
  #[error("conflict: {kind}")]
  Conflict {
    kind:  ConflictKind,
    index: Option<usize>,
  },

  #[error("not authorized")]
  Unauthorized,

  #[error("{0} not found")]
  NotFound(String),

  /// A transient store failure. Write paths retry these internally.
  #[error("store contention: {0}")]
  Contention(#[source] BoxError),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("store operation timed out")]
  Timeout,

  #[error("gave up after {0} attempts")]
  RetriesExhausted(u32),

  /// The active flag and the chronological order disagree about which
  /// record is the driver's latest.
  #[error("ledger inconsistency: {0}")]
  Inconsistent(String),
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

impl LedgerError {
  pub fn invalid(error: FieldError) -> Self { Self::Validation { error, index: None } }

  pub fn conflict(kind: ConflictKind) -> Self { Self::Conflict { kind, index: None } }

  /// Attach a batch position to a validation or conflict error.
  pub fn at(self, position: Option<usize>) -> Self {
    match self {
      Self::Validation { error, .. } => Self::Validation { error, index: position },
      Self::Conflict { kind, .. } => Self::Conflict { kind, index: position },
      other => other,
    }
  }

  /// Classify a store failure by whether it is worth retrying.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    if e.is_transient() {
      Self::Contention(Box::new(e))
    } else {
      Self::Store(Box::new(e))
    }
  }
}

impl From<FieldError> for LedgerError {
  fn from(e: FieldError) -> Self { Self::invalid(e) }
}

impl From<ConflictKind> for LedgerError {
  fn from(k: ConflictKind) -> Self { Self::conflict(k) }
}
