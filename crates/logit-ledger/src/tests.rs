//! Ledger behaviour against an in-memory SQLite store.

use std::{
  sync::atomic::{AtomicU32, Ordering},
  time::Duration,
};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use logit_core::{
  ConflictKind,
  auth::{Principal, Role},
  external::{Geocoder, VehicleRegistry},
  note::{Note, NoteKind, NotePayload, NoteVariant},
  record::{Coordinates, Location, Record, RecordInput, RecordKind},
  store::{NoteStore, RecordQuery, RecordStore, RecordWriter},
};
use logit_store_sqlite::{Error as SqliteError, SqliteStore};
use uuid::Uuid;

use crate::{Ledger, LedgerConfig, LedgerError};

// ─── Fixtures ────────────────────────────────────────────────────────────────

const PORT: Coordinates = Coordinates { lat: -36.84, lng: 174.77 };

#[derive(Debug, thiserror::Error)]
#[error("no geocoding match")]
struct NoMatch;

/// Knows one address, and names every coordinate "Geocoded Ave".
struct StubGeocoder {
  delay: Option<Duration>,
}

impl Geocoder for StubGeocoder {
  type Error = NoMatch;

  async fn resolve_coordinates(&self, address: &str) -> Result<Coordinates, NoMatch> {
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    if address == "Port" { Ok(PORT) } else { Err(NoMatch) }
  }

  async fn resolve_address(&self, _coordinates: Coordinates) -> Result<String, NoMatch> {
    Ok("Geocoded Ave".into())
  }
}

struct Fixture {
  ledger:  Ledger<SqliteStore, StubGeocoder>,
  driver:  Uuid,
  vehicle: Uuid,
}

async fn fixture_with(config: LedgerConfig, delay: Option<Duration>) -> Fixture {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let driver = Uuid::new_v4();
  let vehicle = Uuid::new_v4();
  store.register_vehicle(vehicle, driver).await.unwrap();
  Fixture {
    ledger: Ledger::new(store, StubGeocoder { delay }, config),
    driver,
    vehicle,
  }
}

async fn fixture() -> Fixture { fixture_with(LedgerConfig::default(), None).await }

fn at(hour: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

fn loc(address: &str) -> Location {
  Location::new(address, Coordinates { lat: 0.0, lng: f64::from(address.len() as u8) })
}

/// A hand-entered one-hour record from `from` to `to`.
fn hand_entered(vehicle: Uuid, kind: RecordKind, hour: u32, from: &str, to: &str) -> RecordInput {
  RecordInput {
    kind,
    time: at(hour),
    duration: TimeDelta::hours(1),
    start_location: loc(from),
    end_location: loc(to),
    vehicle_id: vehicle,
    start_mileage: None,
    end_mileage: None,
    client_time: Some(at(hour)),
  }
}

impl Fixture {
  fn input(&self, kind: RecordKind, hour: u32, from: &str, to: &str) -> RecordInput {
    hand_entered(self.vehicle, kind, hour, from, to)
  }

  fn me(&self) -> Principal { Principal::driver(self.driver) }

  async fn all_records(&self) -> Vec<Record> {
    let query = RecordQuery {
      driver_id:       self.driver,
      from:            at(0),
      to:              Utc::now(),
      include_deleted: true,
    };
    self.ledger.store().query_records(&query).await.unwrap()
  }

  async fn active_id(&self) -> Option<Uuid> {
    self
      .ledger
      .store()
      .get_active(self.driver)
      .await
      .unwrap()
      .map(|r| r.record_id)
  }

  /// At most one active record, and live records alternate in kind.
  async fn assert_chain_invariants(&self) {
    let records = self.all_records().await;
    assert!(records.iter().filter(|r| r.active).count() <= 1);
    let live: Vec<_> = records.iter().filter(|r| !r.is_deleted()).collect();
    assert!(live.windows(2).all(|w| w[0].kind != w[1].kind));
  }
}

/// What a [`FaultyStore`] gets wrong.
#[derive(Default)]
struct Faults {
  /// Fail every transaction as a lost active-pointer race.
  contend:      bool,
  /// Acknowledge each commit this long after it lands.
  commit_delay: Option<Duration>,
  /// Stall every `get_active` read.
  read_delay:   Option<Duration>,
}

/// Delegates to SQLite, counting transactions and active-record reads.
struct FaultyStore {
  inner:        SqliteStore,
  faults:       Faults,
  transactions: AtomicU32,
  active_reads: AtomicU32,
}

impl RecordStore for FaultyStore {
  type Error = SqliteError;

  async fn get_active(&self, driver_id: Uuid) -> Result<Option<Record>, SqliteError> {
    self.active_reads.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = self.faults.read_delay {
      tokio::time::sleep(delay).await;
    }
    self.inner.get_active(driver_id).await
  }

  async fn get_record(&self, record_id: Uuid) -> Result<Option<Record>, SqliteError> {
    self.inner.get_record(record_id).await
  }

  async fn recent_records(&self, driver_id: Uuid, limit: usize) -> Result<Vec<Record>, SqliteError> {
    self.inner.recent_records(driver_id, limit).await
  }

  async fn query_records(&self, query: &RecordQuery) -> Result<Vec<Record>, SqliteError> {
    self.inner.query_records(query).await
  }

  async fn with_transaction<F, T>(&self, f: F) -> Result<T, SqliteError>
  where
    F: FnOnce(&mut dyn RecordWriter<Error = SqliteError>) -> Result<T, SqliteError>
      + Send
      + 'static,
    T: Send + 'static,
  {
    self.transactions.fetch_add(1, Ordering::SeqCst);
    if self.faults.contend {
      return Err(SqliteError::ActiveContention(Uuid::nil()));
    }
    let outcome = self.inner.with_transaction(f).await;
    if let Some(delay) = self.faults.commit_delay {
      tokio::time::sleep(delay).await;
    }
    outcome
  }
}

impl NoteStore for FaultyStore {
  type Error = SqliteError;

  async fn insert_note(&self, note: &Note) -> Result<(), SqliteError> {
    self.inner.insert_note(note).await
  }

  async fn notes_for_records(&self, record_ids: &[Uuid]) -> Result<Vec<Note>, SqliteError> {
    self.inner.notes_for_records(record_ids).await
  }
}

impl VehicleRegistry for FaultyStore {
  type Error = SqliteError;

  async fn vehicle_exists(&self, vehicle_id: Uuid, driver_id: Uuid) -> Result<bool, SqliteError> {
    self.inner.vehicle_exists(vehicle_id, driver_id).await
  }

  async fn register_vehicle(&self, vehicle_id: Uuid, driver_id: Uuid) -> Result<(), SqliteError> {
    self.inner.register_vehicle(vehicle_id, driver_id).await
  }
}

struct FaultyFixture {
  ledger:  Ledger<FaultyStore, StubGeocoder>,
  driver:  Uuid,
  vehicle: Uuid,
}

async fn faulty_fixture(config: LedgerConfig, faults: Faults) -> FaultyFixture {
  let inner = SqliteStore::open_in_memory().await.expect("in-memory store");
  let driver = Uuid::new_v4();
  let vehicle = Uuid::new_v4();
  inner.register_vehicle(vehicle, driver).await.unwrap();
  let store = FaultyStore {
    inner,
    faults,
    transactions: AtomicU32::new(0),
    active_reads: AtomicU32::new(0),
  };
  FaultyFixture {
    ledger: Ledger::new(store, StubGeocoder { delay: None }, config),
    driver,
    vehicle,
  }
}

impl FaultyFixture {
  fn transactions(&self) -> u32 { self.ledger.store().transactions.load(Ordering::SeqCst) }

  fn active_reads(&self) -> u32 { self.ledger.store().active_reads.load(Ordering::SeqCst) }

  async fn active_id(&self) -> Option<Uuid> {
    self
      .ledger
      .store()
      .inner
      .get_active(self.driver)
      .await
      .unwrap()
      .map(|r| r.record_id)
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_record_needs_no_chain() {
  let f = fixture().await;
  let r1 = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Rest, 8, "Anywhere", "Elsewhere"))
    .await
    .unwrap();
  assert!(r1.active);
  assert_eq!(f.active_id().await, Some(r1.record_id));
}

#[tokio::test]
async fn next_record_starts_where_previous_ended() {
  let f = fixture().await;
  let r1 = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap();

  let err = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Rest, 9, "C", "D"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    LedgerError::Conflict { kind: ConflictKind::LocationMismatch, index: None }
  ));

  let r2 = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Rest, 9, "B", "C"))
    .await
    .unwrap();
  assert_eq!(r2.start_location, r1.end_location);
  assert_eq!(f.active_id().await, Some(r2.record_id));

  let stored_r1 = f.ledger.store().get_record(r1.record_id).await.unwrap().unwrap();
  assert!(!stored_r1.active);
  f.assert_chain_invariants().await;
}

#[tokio::test]
async fn mileage_must_carry_over() {
  let f = fixture().await;
  let mut first = f.input(RecordKind::Work, 8, "A", "B");
  first.start_mileage = Some(40.0);
  first.end_mileage = Some(100.0);
  f.ledger.create_record(f.driver, first).await.unwrap();

  let mut next = f.input(RecordKind::Rest, 9, "B", "C");
  next.start_mileage = Some(90.0);
  let err = f.ledger.create_record(f.driver, next.clone()).await.unwrap_err();
  assert!(matches!(err, LedgerError::Conflict { kind: ConflictKind::MileageMismatch, .. }));

  next.start_mileage = Some(100.0);
  f.ledger.create_record(f.driver, next).await.unwrap();
}

#[tokio::test]
async fn same_kind_twice_is_a_type_conflict() {
  let f = fixture().await;
  f.ledger
    .create_record(f.driver, f.input(RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap();
  let err = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Work, 9, "B", "C"))
    .await
    .unwrap_err();
  assert!(matches!(err, LedgerError::Conflict { kind: ConflictKind::TypeConflict, .. }));
  assert_eq!(f.all_records().await.len(), 1);
}

#[tokio::test]
async fn live_capture_must_match_server_clock() {
  let f = fixture().await;
  let mut live = f.input(RecordKind::Work, 8, "A", "B");
  live.client_time = None;
  let err = f.ledger.create_record(f.driver, live.clone()).await.unwrap_err();
  assert!(matches!(err, LedgerError::Validation { ref error, .. } if error.field == "time"));

  live.time = Utc::now();
  f.ledger.create_record(f.driver, live).await.unwrap();
}

#[tokio::test]
async fn unknown_vehicle_is_rejected() {
  let f = fixture().await;
  let mut input = f.input(RecordKind::Work, 8, "A", "B");
  input.vehicle_id = Uuid::new_v4();
  let err = f.ledger.create_record(f.driver, input).await.unwrap_err();
  assert!(matches!(err, LedgerError::Validation { ref error, .. } if error.field == "vehicle_id"));
}

#[tokio::test]
async fn partial_end_location_is_geocoded() {
  let f = fixture().await;
  let mut input = f.input(RecordKind::Work, 8, "A", "B");
  input.end_location = Location::from_address("Port");
  let r1 = f.ledger.create_record(f.driver, input).await.unwrap();
  assert_eq!(r1.end_location, Location::new("Port", PORT));

  let mut input = f.input(RecordKind::Rest, 9, "Port", "B");
  input.end_location = Location::from_coordinates(PORT);
  let r2 = f.ledger.create_record(f.driver, input).await.unwrap();
  assert_eq!(r2.end_location.address(), Some("Geocoded Ave"));
}

#[tokio::test]
async fn unresolvable_end_location_is_a_validation_error() {
  let f = fixture().await;
  let mut input = f.input(RecordKind::Work, 8, "A", "B");
  input.end_location = Location::from_address("Atlantis");
  let err = f.ledger.create_record(f.driver, input).await.unwrap_err();
  assert!(matches!(err, LedgerError::Validation { ref error, .. } if error.field == "end_location"));
  assert!(f.all_records().await.is_empty());
}

#[tokio::test]
async fn slow_collaborator_times_out() {
  let config = LedgerConfig { store_timeout_ms: 250, ..LedgerConfig::default() };
  let f = fixture_with(config, Some(Duration::from_secs(5))).await;
  let mut input = f.input(RecordKind::Work, 8, "A", "B");
  input.end_location = Location::from_address("Port");
  let err = f.ledger.create_record(f.driver, input).await.unwrap_err();
  assert!(matches!(err, LedgerError::Timeout));
  assert!(f.all_records().await.is_empty());
}

#[tokio::test]
async fn concurrent_creates_from_one_predecessor_yield_one_winner() {
  let f = fixture().await;
  f.ledger
    .create_record(f.driver, f.input(RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap();

  let (a, b) = tokio::join!(
    f.ledger.create_record(f.driver, f.input(RecordKind::Rest, 9, "B", "C")),
    f.ledger.create_record(f.driver, f.input(RecordKind::Rest, 9, "B", "D")),
  );

  let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
  assert_eq!(winners, 1);
  let loser = if a.is_ok() { b.unwrap_err() } else { a.unwrap_err() };
  assert!(matches!(loser, LedgerError::Conflict { kind: ConflictKind::TypeConflict, .. }));
  f.assert_chain_invariants().await;
}

#[tokio::test]
async fn created_record_reads_back_unchanged() {
  let f = fixture().await;
  let mut input = f.input(RecordKind::Work, 8, "A", "B");
  input.time += TimeDelta::nanoseconds(1_234_567);
  input.client_time = Some(input.time);

  let created = f.ledger.create_record(f.driver, input).await.unwrap();
  let latest = f.ledger.get_latest_record(f.driver).await.unwrap();
  assert_eq!(latest.record, created);
}

#[tokio::test]
async fn slow_commit_is_reported_as_committed() {
  let config = LedgerConfig { store_timeout_ms: 100, ..LedgerConfig::default() };
  let faults = Faults { commit_delay: Some(Duration::from_millis(300)), ..Faults::default() };
  let f = faulty_fixture(config, faults).await;

  let created = f
    .ledger
    .create_record(f.driver, hand_entered(f.vehicle, RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap();
  assert_eq!(f.active_id().await, Some(created.record_id));

  f.ledger
    .delete_latest_record(&Principal::driver(f.driver), created.record_id)
    .await
    .unwrap();
  assert_eq!(f.active_id().await, None);
}

// ─── Retry ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn persistent_contention_exhausts_the_retry_budget() {
  let config = LedgerConfig { retry_budget: 2, ..LedgerConfig::default() };
  let f = faulty_fixture(config, Faults { contend: true, ..Faults::default() }).await;

  let err = f
    .ledger
    .create_record(f.driver, hand_entered(f.vehicle, RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap_err();
  assert!(matches!(err, LedgerError::RetriesExhausted(3)));
  assert_eq!(f.transactions(), 3);
  assert_eq!(f.active_id().await, None);
}

#[tokio::test]
async fn zero_retry_budget_makes_one_attempt() {
  let config = LedgerConfig { retry_budget: 0, ..LedgerConfig::default() };
  let f = faulty_fixture(config, Faults { contend: true, ..Faults::default() }).await;

  let err = f
    .ledger
    .create_record(f.driver, hand_entered(f.vehicle, RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap_err();
  assert!(matches!(err, LedgerError::RetriesExhausted(1)));
  assert_eq!(f.transactions(), 1);
}

#[tokio::test]
async fn timeouts_are_not_retried() {
  let config = LedgerConfig { store_timeout_ms: 100, retry_budget: 3, ..LedgerConfig::default() };
  let faults = Faults { read_delay: Some(Duration::from_secs(5)), ..Faults::default() };
  let f = faulty_fixture(config, faults).await;

  let err = f
    .ledger
    .create_record(f.driver, hand_entered(f.vehicle, RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap_err();
  assert!(matches!(err, LedgerError::Timeout));
  assert_eq!(f.active_reads(), 1);
  assert_eq!(f.transactions(), 0);
}

// ─── Sync ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_batch_is_rejected() {
  let f = fixture().await;
  let err = f.ledger.sync_records(f.driver, vec![]).await.unwrap_err();
  assert!(matches!(err, LedgerError::Validation { ref error, .. } if error.field == "records"));
}

#[tokio::test]
async fn scrambled_batch_matches_ordered_batch() {
  let ordered = fixture().await;
  let scrambled = fixture().await;

  let chain = |f: &Fixture| {
    vec![
      f.input(RecordKind::Work, 8, "A", "B"),
      f.input(RecordKind::Rest, 9, "B", "C"),
      f.input(RecordKind::Work, 10, "C", "D"),
    ]
  };

  let in_order = ordered.ledger.sync_records(ordered.driver, chain(&ordered)).await.unwrap();

  let mut shuffled = chain(&scrambled);
  shuffled.rotate_right(1);
  let out_of_order = scrambled
    .ledger
    .sync_records(scrambled.driver, shuffled)
    .await
    .unwrap();

  let shape = |records: &[Record]| {
    records
      .iter()
      .map(|r| (r.kind, r.time, r.active))
      .collect::<Vec<_>>()
  };
  assert_eq!(shape(&in_order), shape(&out_of_order));
  assert_eq!(out_of_order.last().map(|r| r.time), Some(at(10)));
  assert_eq!(scrambled.active_id().await, out_of_order.last().map(|r| r.record_id));
  scrambled.assert_chain_invariants().await;
}

#[tokio::test]
async fn batch_extends_the_active_record() {
  let f = fixture().await;
  let r1 = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap();

  let synced = f
    .ledger
    .sync_records(
      f.driver,
      vec![
        f.input(RecordKind::Work, 10, "C", "D"),
        f.input(RecordKind::Rest, 9, "B", "C"),
      ],
    )
    .await
    .unwrap();
  assert_eq!(synced.len(), 2);

  let stored_r1 = f.ledger.store().get_record(r1.record_id).await.unwrap().unwrap();
  assert!(!stored_r1.active);
  assert_eq!(f.active_id().await, Some(synced[1].record_id));
  f.assert_chain_invariants().await;
}

#[tokio::test]
async fn batch_conflict_reports_submission_index_and_writes_nothing() {
  let f = fixture().await;
  let batch = vec![
    f.input(RecordKind::Rest, 9, "B", "C"),
    f.input(RecordKind::Work, 8, "A", "B"),
    f.input(RecordKind::Rest, 10, "C", "D"),
  ];
  let err = f.ledger.sync_records(f.driver, batch).await.unwrap_err();
  assert!(matches!(
    err,
    LedgerError::Conflict { kind: ConflictKind::TypeConflict, index: Some(2) }
  ));
  assert!(f.all_records().await.is_empty());
}

#[tokio::test]
async fn batch_validation_error_reports_submission_index() {
  let f = fixture().await;
  let mut bad = f.input(RecordKind::Rest, 9, "B", "C");
  bad.start_mileage = Some(50.0);
  bad.end_mileage = Some(10.0);
  let batch = vec![f.input(RecordKind::Work, 8, "A", "B"), bad];
  let err = f.ledger.sync_records(f.driver, batch).await.unwrap_err();
  assert!(matches!(
    err,
    LedgerError::Validation { ref error, index: Some(1) } if error.field == "end_mileage"
  ));
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn only_the_latest_record_can_be_deleted() {
  let f = fixture().await;
  let chain = f
    .ledger
    .sync_records(
      f.driver,
      vec![
        f.input(RecordKind::Work, 8, "A", "B"),
        f.input(RecordKind::Rest, 9, "B", "C"),
      ],
    )
    .await
    .unwrap();
  let (r1, r2) = (&chain[0], &chain[1]);

  let err = f.ledger.delete_latest_record(&f.me(), r1.record_id).await.unwrap_err();
  assert!(matches!(err, LedgerError::Conflict { kind: ConflictKind::NotLatest, .. }));

  f.ledger.delete_latest_record(&f.me(), r2.record_id).await.unwrap();
  let tombstoned = f.ledger.store().get_record(r2.record_id).await.unwrap().unwrap();
  assert!(tombstoned.deleted_at.is_some());
  assert!(!tombstoned.active);
  assert_eq!(f.active_id().await, Some(r1.record_id));

  let err = f.ledger.delete_latest_record(&f.me(), r2.record_id).await.unwrap_err();
  assert!(matches!(err, LedgerError::Conflict { kind: ConflictKind::AlreadyDeleted, .. }));
  f.assert_chain_invariants().await;
}

#[tokio::test]
async fn deleting_the_only_record_leaves_no_active_record() {
  let f = fixture().await;
  let r1 = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap();
  f.ledger.delete_latest_record(&f.me(), r1.record_id).await.unwrap();
  assert_eq!(f.active_id().await, None);

  // The chain restarts from scratch.
  f.ledger
    .create_record(f.driver, f.input(RecordKind::Rest, 9, "X", "Y"))
    .await
    .unwrap();
}

#[tokio::test]
async fn delete_checks_ownership_and_existence() {
  let f = fixture().await;
  let r1 = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap();

  let stranger = Principal::driver(Uuid::new_v4());
  let err = f.ledger.delete_latest_record(&stranger, r1.record_id).await.unwrap_err();
  assert!(matches!(err, LedgerError::Unauthorized));

  let err = f.ledger.delete_latest_record(&f.me(), Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, LedgerError::NotFound(_)));

  let admin = Principal::new(Uuid::new_v4(), [Role::Admin]);
  f.ledger.delete_latest_record(&admin, r1.record_id).await.unwrap();
}

#[tokio::test]
async fn diverged_pointer_is_reported_not_repaired() {
  let f = fixture().await;
  let r1 = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap();

  // A later record that never received the active flag.
  let mut orphan = r1.clone();
  orphan.record_id = Uuid::new_v4();
  orphan.kind = RecordKind::Rest;
  orphan.time = at(9);
  orphan.active = false;
  f.ledger
    .store()
    .with_transaction(move |w| w.insert(&orphan))
    .await
    .unwrap();

  let err = f.ledger.get_latest_record(f.driver).await.unwrap_err();
  assert!(matches!(err, LedgerError::Inconsistent(_)));
  let err = f.ledger.delete_latest_record(&f.me(), r1.record_id).await.unwrap_err();
  assert!(matches!(err, LedgerError::Inconsistent(_)));
  assert_eq!(f.active_id().await, Some(r1.record_id));
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn latest_record_comes_with_notes() {
  let f = fixture().await;
  let err = f.ledger.get_latest_record(f.driver).await.unwrap_err();
  assert!(matches!(err, LedgerError::NotFound(_)));

  let r1 = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap();
  let payload = NotePayload { comment: "late start".into(), ..Default::default() };
  f.ledger
    .add_note(&f.me(), NoteKind::OtherWork, r1.record_id, payload)
    .await
    .unwrap();

  let latest = f.ledger.get_latest_record(f.driver).await.unwrap();
  assert_eq!(latest.record.record_id, r1.record_id);
  assert_eq!(latest.notes.len(), 1);
  assert_eq!(latest.notes[0].comment, "late start");
}

#[tokio::test]
async fn list_records_is_ascending_and_skips_deleted() {
  let f = fixture().await;
  let chain = f
    .ledger
    .sync_records(
      f.driver,
      vec![
        f.input(RecordKind::Work, 8, "A", "B"),
        f.input(RecordKind::Rest, 9, "B", "C"),
        f.input(RecordKind::Work, 10, "C", "D"),
      ],
    )
    .await
    .unwrap();
  f.ledger.delete_latest_record(&f.me(), chain[2].record_id).await.unwrap();

  let listed = f.ledger.list_records(f.driver, at(0), None).await.unwrap();
  let ids: Vec<_> = listed.iter().map(|a| a.record.record_id).collect();
  assert_eq!(ids, vec![chain[0].record_id, chain[1].record_id]);

  let window = f.ledger.list_records(f.driver, at(9), Some(at(9))).await.unwrap();
  assert_eq!(window.len(), 1);

  let err = f.ledger.list_records(f.driver, at(10), Some(at(9))).await.unwrap_err();
  assert!(matches!(err, LedgerError::Validation { ref error, .. } if error.field == "from"));
}

// ─── Notes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn notes_require_record_ownership() {
  let f = fixture().await;
  let r1 = f
    .ledger
    .create_record(f.driver, f.input(RecordKind::Work, 8, "A", "B"))
    .await
    .unwrap();

  let stranger = Principal::driver(Uuid::new_v4());
  let err = f
    .ledger
    .add_note(&stranger, NoteKind::OtherWork, r1.record_id, NotePayload::default())
    .await
    .unwrap_err();
  assert!(matches!(err, LedgerError::Unauthorized));

  let admin = Principal::new(Uuid::new_v4(), [Role::Super]);
  let note = f
    .ledger
    .add_note(&admin, NoteKind::System, r1.record_id, NotePayload::default())
    .await
    .unwrap();
  assert_eq!(note.variant, NoteVariant::System);
}

#[tokio::test]
async fn note_on_missing_record_is_not_found() {
  let f = fixture().await;
  let err = f
    .ledger
    .add_note(&f.me(), NoteKind::OtherWork, Uuid::new_v4(), NotePayload::default())
    .await
    .unwrap_err();
  assert!(matches!(err, LedgerError::NotFound(_)));
}

// ─── Vehicles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn registered_vehicle_can_be_logged_against() {
  let f = fixture().await;
  let truck = Uuid::new_v4();
  f.ledger.register_vehicle(&f.me(), truck).await.unwrap();

  let mut input = f.input(RecordKind::Work, 8, "A", "B");
  input.vehicle_id = truck;
  f.ledger.create_record(f.driver, input).await.unwrap();

  let err = f.ledger.register_vehicle(&f.me(), Uuid::nil()).await.unwrap_err();
  assert!(matches!(err, LedgerError::Validation { .. }));
}
