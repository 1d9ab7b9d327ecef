//! Handler for `PUT /vehicles/{id}`.

use axum::{
  extract::{Path, State},
  http::StatusCode,
};
use logit_core::external::Geocoder;
use logit_ledger::LedgerStore;
use uuid::Uuid;

use crate::{AppState, ApiError, auth::Acting};

/// `PUT /vehicles/{id}`: idempotent; 204.
pub async fn register<S, G>(
  State(state): State<AppState<S, G>>,
  acting: Acting,
  Path(vehicle_id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: LedgerStore,
  G: Geocoder,
{
  let driver = acting.driver()?;
  state.ledger.register_vehicle(driver, vehicle_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
