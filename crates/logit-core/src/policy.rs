//! Tolerances applied by the continuity validator.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Policy values for continuity checks. Overridable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuityPolicy {
  /// How far a live-captured record's time may stray from the server clock.
  pub clock_skew_secs:    i64,
  /// How far `previous.time + previous.duration` may stray from the next
  /// record's time.
  pub gap_tolerance_secs: i64,
  /// Absolute tolerance when comparing odometer readings.
  pub mileage_epsilon:    f64,
}

impl Default for ContinuityPolicy {
  fn default() -> Self {
    Self {
      clock_skew_secs:    10,
      gap_tolerance_secs: 10,
      mileage_epsilon:    1e-9,
    }
  }
}

impl ContinuityPolicy {
  pub fn clock_skew(&self) -> TimeDelta { TimeDelta::seconds(self.clock_skew_secs) }

  pub fn gap_tolerance(&self) -> TimeDelta {
    TimeDelta::seconds(self.gap_tolerance_secs)
  }

  pub fn mileage_matches(&self, a: f64, b: f64) -> bool {
    (a - b).abs() <= self.mileage_epsilon
  }
}
