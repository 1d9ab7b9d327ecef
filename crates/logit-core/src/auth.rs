//! The acting principal, as forwarded by the upstream auth middleware.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles a user may hold. Supplied by the upstream auth layer; the ledger
/// only asks whether a principal holds one.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  Super,
  Admin,
  TransportOperatorSuper,
  TransportOperatorAdmin,
  Driver,
  /// Registered, with no other identity yet.
  User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub user_id: Uuid,
  pub roles:   Vec<Role>,
}

impl Principal {
  pub fn new(user_id: Uuid, roles: impl IntoIterator<Item = Role>) -> Self {
    Self { user_id, roles: roles.into_iter().collect() }
  }

  pub fn driver(user_id: Uuid) -> Self { Self::new(user_id, [Role::Driver]) }

  pub fn has_role(&self, role: Role) -> bool { self.roles.contains(&role) }

  /// May act on records owned by other drivers.
  pub fn is_elevated(&self) -> bool {
    self.has_role(Role::Super) || self.has_role(Role::Admin)
  }

  /// Owner of the driver's records, or elevated.
  pub fn may_act_for(&self, driver_id: Uuid) -> bool {
    self.user_id == driver_id || self.is_elevated()
  }
}
