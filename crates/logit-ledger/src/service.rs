//! [`Ledger`], the operations exposed to the API layer.

use std::{collections::HashMap, future::Future};

use chrono::{DateTime, Utc};
use logit_core::{
  ConflictKind, FieldError,
  auth::Principal,
  external::{Geocoder, VehicleRegistry},
  note::{AnnotatedRecord, Note, NoteKind, NotePayload},
  record::{Record, RecordInput},
  store::{NoteStore, RecordQuery, RecordStore},
  validate::{Completion, check_fields, end_location_completion},
};
use uuid::Uuid;

use crate::{
  LedgerConfig, LedgerError, Result, notes,
  pointer,
  reconcile::{self, Pending},
};

// ─── Store bound ─────────────────────────────────────────────────────────────

/// Everything the ledger needs from its backing store.
pub trait LedgerStore: RecordStore + NoteStore + VehicleRegistry + 'static {}

impl<T> LedgerStore for T where T: RecordStore + NoteStore + VehicleRegistry + 'static {}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// The driver record ledger over store `S` and geocoder `G`.
pub struct Ledger<S, G> {
  store:    S,
  geocoder: G,
  config:   LedgerConfig,
}

impl<S, G> Ledger<S, G>
where
  S: LedgerStore,
  G: Geocoder,
{
  pub fn new(store: S, geocoder: G, config: LedgerConfig) -> Self {
    Self { store, geocoder, config }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &LedgerConfig { &self.config }

  // ── Operations ─────────────────────────────────────────────────────────

  /// Append one live or hand-entered record to the driver's chain.
  pub async fn create_record(&self, driver_id: Uuid, input: RecordInput) -> Result<Record> {
    let mut committed = self.append(driver_id, vec![input], false).await?;
    committed
      .pop()
      .ok_or_else(|| LedgerError::Inconsistent("create committed no record".into()))
  }

  /// Append an unordered batch of offline-captured records, all or nothing.
  /// Returns the records in chain order; the last one is active.
  pub async fn sync_records(
    &self,
    driver_id: Uuid,
    inputs: Vec<RecordInput>,
  ) -> Result<Vec<Record>> {
    if inputs.is_empty() {
      return Err(FieldError::new("records", "batch must not be empty").into());
    }
    self.append(driver_id, inputs, true).await
  }

  /// The driver's active record with its notes.
  pub async fn get_latest_record(&self, driver_id: Uuid) -> Result<AnnotatedRecord> {
    let (active, _) = self.checked_head(driver_id).await?;
    let record =
      active.ok_or_else(|| LedgerError::NotFound(format!("latest record of driver {driver_id}")))?;

    let mut annotated = self.annotate(vec![record]).await?;
    annotated
      .pop()
      .ok_or_else(|| LedgerError::Inconsistent("annotation dropped a record".into()))
  }

  /// Tombstone `record_id`, which must be its driver's active record, and
  /// reactivate the record before it.
  pub async fn delete_latest_record(&self, actor: &Principal, record_id: Uuid) -> Result<()> {
    self
      .with_retry("delete", || self.try_delete(actor, record_id))
      .await
  }

  /// Non-deleted records with `time` in `[from, to]`, ascending, with notes.
  /// `to` defaults to now.
  pub async fn list_records(
    &self,
    driver_id: Uuid,
    from: DateTime<Utc>,
    to: Option<DateTime<Utc>>,
  ) -> Result<Vec<AnnotatedRecord>> {
    let to = to.unwrap_or_else(Utc::now);
    if from > to {
      return Err(FieldError::new("from", "must not be after to").into());
    }

    let query = RecordQuery { driver_id, from, to, include_deleted: false };
    let records = self
      .timed(self.store.query_records(&query))
      .await?
      .map_err(LedgerError::from_store)?;
    self.annotate(records).await
  }

  /// Attach a note of `kind` to `record_id` on behalf of `actor`.
  pub async fn add_note(
    &self,
    actor: &Principal,
    kind: NoteKind,
    record_id: Uuid,
    payload: NotePayload,
  ) -> Result<Note> {
    let record = self.require_record(record_id).await?;
    if !actor.may_act_for(record.driver_id) {
      tracing::info!(%record_id, actor = %actor.user_id, "note refused: not the record owner");
      return Err(LedgerError::Unauthorized);
    }

    let note = notes::build_note(kind, &record, actor, payload, Utc::now())?;
    self
      .store
      .insert_note(&note)
      .await
      .map_err(LedgerError::from_store)?;

    tracing::info!(note_id = %note.note_id, %record_id, %kind, "note attached");
    Ok(note)
  }

  /// Make `vehicle_id` available to the acting driver.
  pub async fn register_vehicle(&self, actor: &Principal, vehicle_id: Uuid) -> Result<()> {
    if vehicle_id.is_nil() {
      return Err(FieldError::new("vehicle_id", "required").into());
    }
    self
      .store
      .register_vehicle(vehicle_id, actor.user_id)
      .await
      .map_err(|e| LedgerError::Store(Box::new(e)))
  }

  // ── Write path ─────────────────────────────────────────────────────────

  /// Shared by create and sync. `indexed` reports batch positions on errors.
  async fn append(
    &self,
    driver_id: Uuid,
    inputs: Vec<RecordInput>,
    indexed: bool,
  ) -> Result<Vec<Record>> {
    let now = Utc::now();
    let position = |i: usize| indexed.then_some(i);

    let mut prepared = Vec::with_capacity(inputs.len());
    let mut known_vehicles: Vec<Uuid> = Vec::new();
    for (i, input) in inputs.into_iter().enumerate() {
      let record = self
        .prepare(driver_id, input, now, &mut known_vehicles)
        .await
        .map_err(|e| e.at(position(i)))?;
      prepared.push(record);
    }
    let batch = reconcile::order(prepared);

    let committed = self
      .with_retry("append", || self.try_commit(driver_id, &batch))
      .await
      .map_err(|e| match e {
        LedgerError::Conflict { kind, index } => LedgerError::Conflict {
          kind,
          index: index.filter(|_| indexed),
        },
        other => other,
      })?;

    tracing::info!(%driver_id, count = committed.len(), "records committed");
    Ok(committed)
  }

  /// Field checks, vehicle check and end-location completion for one input.
  /// Runs once per submission, outside the retry loop.
  async fn prepare(
    &self,
    driver_id: Uuid,
    input: RecordInput,
    now: DateTime<Utc>,
    known_vehicles: &mut Vec<Uuid>,
  ) -> Result<Record> {
    let mut record = Record::from_input(driver_id, input, now);
    check_fields(&record, now, &self.config.policy)?;

    if !known_vehicles.contains(&record.vehicle_id) {
      let exists = self
        .timed(self.store.vehicle_exists(record.vehicle_id, driver_id))
        .await?
        .map_err(|e| LedgerError::Store(Box::new(e)))?;
      if !exists {
        return Err(FieldError::new("vehicle_id", "unknown vehicle for this driver").into());
      }
      known_vehicles.push(record.vehicle_id);
    }

    self.complete_end_location(&mut record).await?;
    Ok(record)
  }

  async fn complete_end_location(&self, record: &mut Record) -> Result<()> {
    fn unresolved(e: &dyn std::error::Error) -> LedgerError {
      tracing::warn!(error = %e, "geocoding failed");
      LedgerError::invalid(FieldError::new("end_location", format!("could not be resolved: {e}")))
    }

    match end_location_completion(record) {
      Some(Completion::Coordinates(address)) => {
        let coordinates = self
          .timed(self.geocoder.resolve_coordinates(&address))
          .await?
          .map_err(|e| unresolved(&e))?;
        if !coordinates.is_valid() {
          return Err(FieldError::new("end_location", "resolved coordinates out of range").into());
        }
        record.end_location.coordinates = Some(coordinates);
      }
      Some(Completion::Address(coordinates)) => {
        let address = self
          .timed(self.geocoder.resolve_address(coordinates))
          .await?
          .map_err(|e| unresolved(&e))?;
        record.end_location.address = Some(address);
      }
      None => {}
    }
    Ok(())
  }

  /// One attempt: read the active record, thread the batch from it, promote.
  async fn try_commit(&self, driver_id: Uuid, batch: &[Pending]) -> Result<Vec<Record>> {
    let previous = self
      .timed(self.store.get_active(driver_id))
      .await?
      .map_err(LedgerError::from_store)?;

    reconcile::thread(previous.as_ref(), batch, &self.config.policy).map_err(|(index, kind)| {
      tracing::info!(%driver_id, index, %kind, "submission breaks continuity");
      LedgerError::Conflict { kind, index: Some(index) }
    })?;

    let mut records: Vec<Record> = batch.iter().map(|p| p.record.clone()).collect();
    pointer::activate_last(&mut records);

    // Not timed: dropping the future would not stop the commit.
    pointer::promote(&self.store, previous.as_ref(), records.clone())
      .await
      .map_err(LedgerError::from_store)?;
    Ok(records)
  }

  async fn try_delete(&self, actor: &Principal, record_id: Uuid) -> Result<()> {
    let target = self.require_record(record_id).await?;
    if !actor.may_act_for(target.driver_id) {
      return Err(LedgerError::Unauthorized);
    }
    if target.is_deleted() {
      return Err(ConflictKind::AlreadyDeleted.into());
    }

    let (_, recent) = self.checked_head(target.driver_id).await?;
    if !target.active {
      return Err(ConflictKind::NotLatest.into());
    }
    let restore = recent.get(1);

    pointer::demote(&self.store, &target, restore, Utc::now())
      .await
      .map_err(LedgerError::from_store)?;

    tracing::info!(
      %record_id,
      driver_id = %target.driver_id,
      restored = ?restore.map(|r| r.record_id),
      "record deleted"
    );
    Ok(())
  }

  // ── Helpers ────────────────────────────────────────────────────────────

  /// Bound `fut` by the configured store timeout. Only for reads and
  /// collaborator calls; committing transactions always run to completion.
  async fn timed<F: Future>(&self, fut: F) -> Result<F::Output> {
    tokio::time::timeout(self.config.store_timeout(), fut)
      .await
      .map_err(|_| {
        tracing::warn!(timeout_ms = self.config.store_timeout_ms, "store call timed out");
        LedgerError::Timeout
      })
  }

  /// Run `attempt` until it stops failing with contention, for at most
  /// `retry_budget` extra attempts.
  async fn with_retry<T, F, Fut>(&self, op: &'static str, mut attempt: F) -> Result<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let attempts = self.config.retry_budget.saturating_add(1);
    for n in 1..=attempts {
      match attempt().await {
        Err(LedgerError::Contention(e)) => {
          tracing::warn!(op, attempt = n, error = %e, "transient store failure");
        }
        other => return other,
      }
    }
    tracing::error!(op, attempts, "retry budget exhausted");
    Err(LedgerError::RetriesExhausted(attempts))
  }

  async fn require_record(&self, record_id: Uuid) -> Result<Record> {
    self
      .timed(self.store.get_record(record_id))
      .await?
      .map_err(LedgerError::from_store)?
      .ok_or_else(|| LedgerError::NotFound(format!("record {record_id}")))
  }

  /// The driver's active record and two newest non-deleted records, after
  /// asserting that the active record is the newest one.
  async fn checked_head(&self, driver_id: Uuid) -> Result<(Option<Record>, Vec<Record>)> {
    let active = self
      .timed(self.store.get_active(driver_id))
      .await?
      .map_err(LedgerError::from_store)?;
    let recent = self
      .timed(self.store.recent_records(driver_id, 2))
      .await?
      .map_err(LedgerError::from_store)?;

    let active_id = active.as_ref().map(|r| r.record_id);
    let latest_id = recent.first().map(|r| r.record_id);
    if active_id != latest_id {
      tracing::error!(
        %driver_id,
        active = ?active_id,
        latest = ?latest_id,
        "active record is not the latest record"
      );
      return Err(LedgerError::Inconsistent(format!(
        "driver {driver_id}: active record {active_id:?} differs from latest {latest_id:?}"
      )));
    }
    Ok((active, recent))
  }

  async fn annotate(&self, records: Vec<Record>) -> Result<Vec<AnnotatedRecord>> {
    let ids: Vec<Uuid> = records.iter().map(|r| r.record_id).collect();
    let notes = self
      .timed(self.store.notes_for_records(&ids))
      .await?
      .map_err(LedgerError::from_store)?;

    let mut by_record: HashMap<Uuid, Vec<Note>> = HashMap::new();
    for note in notes {
      by_record.entry(note.record_id).or_default().push(note);
    }

    Ok(
      records
        .into_iter()
        .map(|record| {
          let notes = by_record.remove(&record.record_id).unwrap_or_default();
          AnnotatedRecord { record, notes }
        })
        .collect(),
    )
  }
}
