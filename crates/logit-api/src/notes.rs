//! Handler for `POST /record/note`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use logit_core::{
  external::Geocoder,
  note::{NoteKind, NotePayload},
};
use logit_ledger::LedgerStore;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, ApiError, auth::Acting};

/// JSON body accepted by `POST /record/note`. Which payload fields are
/// required depends on `kind`.
#[derive(Debug, Deserialize)]
pub struct AddNoteBody {
  pub record_id: Uuid,
  pub kind:      NoteKind,
  #[serde(flatten)]
  pub payload:   NotePayload,
}

/// `POST /record/note`: returns 201 + the stored note.
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  acting: Acting,
  Json(body): Json<AddNoteBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
  G: Geocoder,
{
  let actor = acting.driver_or_elevated()?;
  let note = state
    .ledger
    .add_note(actor, body.kind, body.record_id, body.payload)
    .await?;
  Ok((StatusCode::CREATED, Json(note)))
}
