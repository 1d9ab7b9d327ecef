//! [`SqliteStore`], the SQLite implementation of the ledger store traits.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use logit_core::{
  external::VehicleRegistry,
  note::Note,
  record::Record,
  store::{NoteStore, RecordQuery, RecordStore, RecordWriter},
};

use crate::{
  Error, Result,
  encode::{RECORD_COLUMNS, RawNote, RawRecord, encode_dt, encode_location, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Record ids bound per `IN (...)` lookup, well under SQLite's host
/// parameter limit.
const NOTE_LOOKUP_CHUNK: usize = 500;

/// A Logit ledger store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store. Used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT` over [`RECORD_COLUMNS`] and decode every row.
  async fn select_records(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<Record>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

// ─── Transaction writer ──────────────────────────────────────────────────────

/// The [`RecordWriter`] handed to `with_transaction` closures.
struct SqliteWriter<'t> {
  tx: &'t rusqlite::Transaction<'t>,
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

impl RecordWriter for SqliteWriter<'_> {
  type Error = Error;

  fn insert(&mut self, record: &Record) -> Result<()> {
    let inserted = self.tx.execute(
      "INSERT INTO records (
         record_id, driver_id, kind, time, duration_secs,
         start_location, end_location, vehicle_id, start_mileage, end_mileage,
         client_time, created_at, deleted_at, active
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
      rusqlite::params![
        encode_uuid(record.record_id),
        encode_uuid(record.driver_id),
        record.kind.as_ref(),
        encode_dt(record.time),
        record.duration.num_seconds(),
        encode_location(&record.start_location)?,
        encode_location(&record.end_location)?,
        encode_uuid(record.vehicle_id),
        record.start_mileage,
        record.end_mileage,
        record.client_time.map(encode_dt),
        encode_dt(record.created_at),
        record.deleted_at.map(encode_dt),
        record.active,
      ],
    );

    match inserted {
      Ok(_) => Ok(()),
      Err(e) if record.active && is_unique_violation(&e) => {
        Err(Error::ActiveContention(record.record_id))
      }
      Err(e) => Err(e.into()),
    }
  }

  fn set_active(&mut self, record_id: Uuid, driver_id: Uuid, active: bool) -> Result<()> {
    let changed = self.tx.execute(
      "UPDATE records SET active = ?3
       WHERE record_id = ?1 AND driver_id = ?2
         AND active = ?4 AND deleted_at IS NULL",
      rusqlite::params![encode_uuid(record_id), encode_uuid(driver_id), active, !active],
    );

    match changed {
      Ok(1) => Ok(()),
      Ok(_) => Err(Error::ActiveContention(record_id)),
      Err(e) if is_unique_violation(&e) => Err(Error::ActiveContention(record_id)),
      Err(e) => Err(e.into()),
    }
  }

  fn soft_delete(&mut self, record_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let changed = self.tx.execute(
      "UPDATE records SET deleted_at = ?2, active = 0
       WHERE record_id = ?1 AND active = 1 AND deleted_at IS NULL",
      rusqlite::params![encode_uuid(record_id), encode_dt(at)],
    )?;

    if changed == 1 {
      Ok(())
    } else {
      Err(Error::ActiveContention(record_id))
    }
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn get_active(&self, driver_id: Uuid) -> Result<Option<Record>> {
    let records = self
      .select_records(
        format!(
          "SELECT {RECORD_COLUMNS} FROM records
           WHERE driver_id = ?1 AND active = 1 AND deleted_at IS NULL"
        ),
        vec![encode_uuid(driver_id).into()],
      )
      .await?;
    Ok(records.into_iter().next())
  }

  async fn get_record(&self, record_id: Uuid) -> Result<Option<Record>> {
    let id_str = encode_uuid(record_id);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM records WHERE record_id = ?1"),
            rusqlite::params![id_str],
            RawRecord::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn recent_records(&self, driver_id: Uuid, limit: usize) -> Result<Vec<Record>> {
    self
      .select_records(
        format!(
          "SELECT {RECORD_COLUMNS} FROM records
           WHERE driver_id = ?1 AND deleted_at IS NULL
           ORDER BY time DESC, seq DESC
           LIMIT ?2"
        ),
        vec![encode_uuid(driver_id).into(), (limit as i64).into()],
      )
      .await
  }

  async fn query_records(&self, query: &RecordQuery) -> Result<Vec<Record>> {
    let deleted_filter = if query.include_deleted { "" } else { "AND deleted_at IS NULL" };

    self
      .select_records(
        format!(
          "SELECT {RECORD_COLUMNS} FROM records
           WHERE driver_id = ?1 AND time >= ?2 AND time <= ?3 {deleted_filter}
           ORDER BY time ASC, seq ASC"
        ),
        vec![
          encode_uuid(query.driver_id).into(),
          encode_dt(query.from).into(),
          encode_dt(query.to).into(),
        ],
      )
      .await
  }

  async fn with_transaction<F, T>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut dyn RecordWriter<Error = Error>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    // The inner result carries the closure's own error; the outer one is the
    // connection's. An uncommitted transaction rolls back when dropped.
    let outcome: Result<T> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = {
          let mut writer = SqliteWriter { tx: &tx };
          f(&mut writer)
        };
        match result {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => Ok(Err(e)),
        }
      })
      .await?;
    outcome
  }
}

// ─── NoteStore impl ──────────────────────────────────────────────────────────

impl NoteStore for SqliteStore {
  type Error = Error;

  async fn insert_note(&self, note: &Note) -> Result<()> {
    let note_id_str   = encode_uuid(note.note_id);
    let record_id_str = encode_uuid(note.record_id);
    let kind          = note.variant.discriminant().to_owned();
    let comment       = note.comment.clone();
    let data_json     = note.variant.to_json()?.to_string();
    let at_str        = encode_dt(note.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notes (note_id, record_id, kind, comment, data_json, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![note_id_str, record_id_str, kind, comment, data_json, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn notes_for_records(&self, record_ids: &[Uuid]) -> Result<Vec<Note>> {
    if record_ids.is_empty() {
      return Ok(Vec::new());
    }

    let ids: Vec<String> = record_ids.iter().copied().map(encode_uuid).collect();

    let mut raws: Vec<RawNote> = self
      .conn
      .call(move |conn| {
        let mut rows = Vec::new();
        for chunk in ids.chunks(NOTE_LOOKUP_CHUNK) {
          let placeholders = vec!["?"; chunk.len()].join(", ");
          let sql = format!(
            "SELECT note_id, record_id, kind, comment, data_json, created_at
             FROM notes
             WHERE record_id IN ({placeholders})"
          );
          let mut stmt = conn.prepare(&sql)?;
          let found = stmt.query_map(rusqlite::params_from_iter(chunk), |row| {
            Ok(RawNote {
              note_id:    row.get(0)?,
              record_id:  row.get(1)?,
              kind:       row.get(2)?,
              comment:    row.get(3)?,
              data_json:  row.get(4)?,
              created_at: row.get(5)?,
            })
          })?;
          for raw in found {
            rows.push(raw?);
          }
        }
        Ok(rows)
      })
      .await?;

    // Timestamps are fixed-width, so text order is time order.
    raws.sort_by(|a, b| {
      a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.note_id.cmp(&b.note_id))
    });
    raws.into_iter().map(RawNote::into_note).collect()
  }
}

// ─── VehicleRegistry impl ────────────────────────────────────────────────────

impl VehicleRegistry for SqliteStore {
  type Error = Error;

  async fn vehicle_exists(&self, vehicle_id: Uuid, driver_id: Uuid) -> Result<bool> {
    let vehicle_str = encode_uuid(vehicle_id);
    let driver_str  = encode_uuid(driver_id);

    let exists = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM vehicles WHERE vehicle_id = ?1 AND driver_id = ?2",
            rusqlite::params![vehicle_str, driver_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;
    Ok(exists)
  }

  async fn register_vehicle(&self, vehicle_id: Uuid, driver_id: Uuid) -> Result<()> {
    let vehicle_str = encode_uuid(vehicle_id);
    let driver_str  = encode_uuid(driver_id);
    let at_str      = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO vehicles (vehicle_id, driver_id, registered_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![vehicle_str, driver_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
