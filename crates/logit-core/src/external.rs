//! Collaborators the ledger consumes but does not own.

use std::future::Future;

use uuid::Uuid;

use crate::record::Coordinates;

/// Address ⇄ coordinate resolution, used to complete partially specified end
/// locations.
pub trait Geocoder: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn resolve_coordinates<'a>(
    &'a self,
    address: &'a str,
  ) -> impl Future<Output = Result<Coordinates, Self::Error>> + Send + 'a;

  fn resolve_address(
    &self,
    coordinates: Coordinates,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}

/// Which vehicles a driver may log against.
pub trait VehicleRegistry: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn vehicle_exists(
    &self,
    vehicle_id: Uuid,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Make `vehicle_id` available to `driver_id`; idempotent.
  fn register_vehicle(
    &self,
    vehicle_id: Uuid,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
