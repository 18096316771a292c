//! Database schema.
//!
//! Four tables: `files` (graph nodes, keyed by path), `relationships`
//! (typed weighted edges, unique per (source, target, kind)),
//! `system_snapshots` (whole documents, keyed by snapshot id), and
//! `file_changes` (append-only; rows are only ever inserted).

pub const SCHEMA: &str = "
  PRAGMA journal_mode = WAL;
  PRAGMA foreign_keys = ON;

  CREATE TABLE IF NOT EXISTS files (
    id            INTEGER PRIMARY KEY,
    path          TEXT UNIQUE NOT NULL,
    file_type     TEXT NOT NULL,
    size          INTEGER,
    modified_time REAL,
    created_time  TEXT NOT NULL,
    content_hash  TEXT
  );

  CREATE TABLE IF NOT EXISTS relationships (
    id                INTEGER PRIMARY KEY,
    source_file_id    INTEGER NOT NULL REFERENCES files (id),
    target_file_id    INTEGER NOT NULL REFERENCES files (id),
    relationship_type TEXT NOT NULL,
    strength          REAL NOT NULL DEFAULT 1.0,
    metadata          TEXT,
    discovered_time   TEXT NOT NULL,
    UNIQUE (source_file_id, target_file_id, relationship_type)
  );

  CREATE TABLE IF NOT EXISTS system_snapshots (
    id          INTEGER PRIMARY KEY,
    snapshot_id TEXT UNIQUE NOT NULL,
    timestamp   TEXT NOT NULL,
    hostname    TEXT NOT NULL,
    scan_type   TEXT NOT NULL,
    data_json   TEXT NOT NULL
  );

  CREATE TABLE IF NOT EXISTS file_changes (
    id          INTEGER PRIMARY KEY,
    file_id     INTEGER NOT NULL REFERENCES files (id),
    change_type TEXT NOT NULL,
    old_value   TEXT,
    new_value   TEXT,
    timestamp   TEXT NOT NULL
  );

  CREATE INDEX IF NOT EXISTS idx_file_path ON files (path);
  CREATE INDEX IF NOT EXISTS idx_relationship_source
    ON relationships (source_file_id);
  CREATE INDEX IF NOT EXISTS idx_relationship_type
    ON relationships (relationship_type);
  CREATE INDEX IF NOT EXISTS idx_changes_time ON file_changes (timestamp);

  PRAGMA user_version = 1;
";
