//! Handlers for record endpoints.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use logit_core::{external::Geocoder, note::AnnotatedRecord, record::RecordInput};
use logit_ledger::LedgerStore;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, ApiError, auth::Acting};

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /record`: returns 201 + the stored record.
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  acting: Acting,
  Json(input): Json<RecordInput>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
  G: Geocoder,
{
  let driver = acting.driver()?;
  let record = state.ledger.create_record(driver.user_id, input).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `POST /records/sync`: body is an array of record inputs in any order.
/// Returns 201 + the accepted chain, oldest first.
pub async fn sync<S, G>(
  State(state): State<AppState<S, G>>,
  acting: Acting,
  Json(inputs): Json<Vec<RecordInput>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
  G: Geocoder,
{
  let driver = acting.driver()?;
  let records = state.ledger.sync_records(driver.user_id, inputs).await?;
  Ok((StatusCode::CREATED, Json(records)))
}

// ─── Latest ──────────────────────────────────────────────────────────────────

/// `GET /record/latest`
pub async fn latest<S, G>(
  State(state): State<AppState<S, G>>,
  acting: Acting,
) -> Result<Json<AnnotatedRecord>, ApiError>
where
  S: LedgerStore,
  G: Geocoder,
{
  let driver = acting.driver()?;
  Ok(Json(state.ledger.get_latest_record(driver.user_id).await?))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /record/{id}`: 204 on success.
pub async fn delete_latest<S, G>(
  State(state): State<AppState<S, G>>,
  acting: Acting,
  Path(record_id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: LedgerStore,
  G: Geocoder,
{
  let actor = acting.driver_or_elevated()?;
  state.ledger.delete_latest_record(actor, record_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Inclusive lower bound on record time.
  pub from:      DateTime<Utc>,
  /// Inclusive upper bound. Defaults to now.
  pub to:        Option<DateTime<Utc>>,
  /// Whose records to list. Defaults to the caller; anyone else's requires
  /// an elevated role.
  pub driver_id: Option<Uuid>,
}

/// `GET /records?from=<t>[&to=<t>][&driver_id=<id>]`
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  acting: Acting,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AnnotatedRecord>>, ApiError>
where
  S: LedgerStore,
  G: Geocoder,
{
  let actor = acting.driver_or_elevated()?;
  let driver_id = params.driver_id.unwrap_or(actor.user_id);
  if !actor.may_act_for(driver_id) {
    return Err(logit_ledger::LedgerError::Unauthorized.into());
  }

  let records = state.ledger.list_records(driver_id, params.from, params.to).await?;
  Ok(Json(records))
}
