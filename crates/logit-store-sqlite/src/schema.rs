//! SQL schema for the Logit SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
-- Writers wait this long (ms) for a lock before failing with SQLITE_BUSY.
PRAGMA busy_timeout = 5000;

-- Records are append-only apart from the `active` flag and the
-- `deleted_at` tombstone. No DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS records (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,  -- insertion order
    record_id      TEXT NOT NULL UNIQUE,
    driver_id      TEXT NOT NULL,
    kind           TEXT NOT NULL,      -- 'work' | 'rest'
    time           TEXT NOT NULL,      -- fixed-width RFC 3339 UTC
    duration_secs  INTEGER NOT NULL,
    start_location TEXT NOT NULL,      -- JSON Location
    end_location   TEXT NOT NULL,      -- JSON Location
    vehicle_id     TEXT NOT NULL,
    start_mileage  REAL,
    end_mileage    REAL,
    client_time    TEXT,
    created_at     TEXT NOT NULL,
    deleted_at     TEXT,
    active         INTEGER NOT NULL DEFAULT 0 CHECK (active IN (0, 1)),
    CHECK (NOT (active = 1 AND deleted_at IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS records_driver_time_idx
    ON records(driver_id, time);
CREATE INDEX IF NOT EXISTS records_driver_active_idx
    ON records(driver_id, active);

-- At most one active record per driver. A second writer racing on the same
-- predecessor trips this and rolls back.
CREATE UNIQUE INDEX IF NOT EXISTS records_one_active_idx
    ON records(driver_id) WHERE active = 1;

-- Notes are strictly append-only.
CREATE TABLE IF NOT EXISTS notes (
    note_id    TEXT PRIMARY KEY,
    record_id  TEXT NOT NULL REFERENCES records(record_id),
    kind       TEXT NOT NULL,   -- discriminant of NoteVariant
    comment    TEXT NOT NULL DEFAULT '',
    data_json  TEXT NOT NULL,   -- variant fields without the tag
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS notes_record_idx ON notes(record_id);

CREATE TABLE IF NOT EXISTS vehicles (
    vehicle_id    TEXT NOT NULL,
    driver_id     TEXT NOT NULL,
    registered_at TEXT NOT NULL,
    PRIMARY KEY (vehicle_id, driver_id)
);

PRAGMA user_version = 1;
";
