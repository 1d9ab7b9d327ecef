//! Engine configuration.

use std::time::Duration;

use logit_core::policy::ContinuityPolicy;
use serde::Deserialize;

/// Tunables for [`Ledger`](crate::Ledger), deserialised from the `[ledger]`
/// table of the server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
  pub policy:           ContinuityPolicy,
  /// Upper bound on any single store call.
  pub store_timeout_ms: u64,
  /// Extra attempts a write gets after losing a race on the active pointer.
  pub retry_budget:     u32,
}

impl Default for LedgerConfig {
  fn default() -> Self {
    Self {
      policy:           ContinuityPolicy::default(),
      store_timeout_ms: 5_000,
      retry_budget:     3,
    }
  }
}

impl LedgerConfig {
  pub fn store_timeout(&self) -> Duration {
    Duration::from_millis(self.store_timeout_ms)
  }
}
