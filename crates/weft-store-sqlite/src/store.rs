//! `SqliteStore`: the rusqlite-backed `KnowledgeStore` implementation.

use std::{
  collections::{BTreeMap, BTreeSet},
  fs,
  path::Path,
  sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde_json::Value;
use weft_core::{
  file::{FileRecord, NewFile, file_type_for},
  relation::{NewRelation, RelationKind},
  scan::RelationshipScan,
  store::{
    ChangeEntry, ConnectionRank, FileHit, IngestReport, KnowledgeStore,
    NeighborEdge, Neighbors, ScanIngest, StoreStats, StoredSnapshot,
  },
};

use crate::{
  encode::{
    decode_epoch, encode_dt, encode_epoch, encode_metadata, RawNeighbor,
  },
  error::{Error, Result},
  ingest,
  schema::SCHEMA,
};

pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open (creating if necessary) a store at `path`, including any missing
  /// parent directories.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    if let Some(parent) = path.as_ref().parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent)?;
    }
    Self::init(Connection::open(path)?)
  }

  pub fn open_in_memory() -> Result<Self> {
    Self::init(Connection::open_in_memory()?)
  }

  fn init(conn: Connection) -> Result<Self> {
    conn.execute_batch(SCHEMA)?;
    Ok(Self { conn: Mutex::new(conn) })
  }

  fn conn(&self) -> MutexGuard<'_, Connection> {
    self.conn.lock().unwrap_or_else(PoisonError::into_inner)
  }

  // ─── Row helpers ───────────────────────────────────────────────────────────

  fn file_id(conn: &Connection, path: &str) -> Result<Option<i64>> {
    conn
      .query_row("SELECT id FROM files WHERE path = ?1", params![path], |row| {
        row.get(0)
      })
      .optional()
      .map_err(Error::from)
  }

  /// Upsert within the caller's transaction. Omitted optional fields leave
  /// any previously stored values in place; `created_time` is only ever
  /// written on first insert.
  fn upsert_file_in(conn: &Connection, input: &NewFile) -> Result<i64> {
    let file_type = input
      .file_type
      .clone()
      .unwrap_or_else(|| file_type_for(&input.path));
    let id = conn.query_row(
      "INSERT INTO files
         (path, file_type, size, modified_time, created_time, content_hash)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT (path) DO UPDATE SET
         file_type     = excluded.file_type,
         size          = COALESCE(excluded.size, files.size),
         modified_time = COALESCE(excluded.modified_time, files.modified_time),
         content_hash  = COALESCE(excluded.content_hash, files.content_hash)
       RETURNING id",
      params![
        input.path,
        file_type,
        input.size,
        input.mtime.map(encode_epoch),
        encode_dt(Utc::now()),
        input.hash,
      ],
      |row| row.get(0),
    )?;
    Ok(id)
  }

  fn upsert_relation_in(conn: &Connection, input: &NewRelation) -> Result<()> {
    let source_id = Self::upsert_file_in(conn, &NewFile::new(input.source.as_str()))?;
    let target_id = Self::upsert_file_in(conn, &NewFile::new(input.target.as_str()))?;
    conn.execute(
      "INSERT INTO relationships
         (source_file_id, target_file_id, relationship_type, strength,
          metadata, discovered_time)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT (source_file_id, target_file_id, relationship_type)
       DO UPDATE SET
         strength        = excluded.strength,
         metadata        = excluded.metadata,
         discovered_time = excluded.discovered_time",
      params![
        source_id,
        target_id,
        input.kind.as_str(),
        input.strength,
        encode_metadata(input.metadata.as_ref())?,
        encode_dt(Utc::now()),
      ],
    )?;
    Ok(())
  }

  /// Fetch a file row by path. Not part of the `KnowledgeStore` surface;
  /// mainly useful for inspection and tests.
  pub fn file(&self, path: &str) -> Result<Option<FileRecord>> {
    self
      .conn()
      .query_row(
        "SELECT id, path, file_type, size, modified_time, created_time,
                content_hash
         FROM files WHERE path = ?1",
        params![path],
        |row| {
          Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<i64>>(3)?,
            row.get::<_, Option<f64>>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, Option<String>>(6)?,
          ))
        },
      )
      .optional()?
      .map(|(id, path, file_type, size, mtime, created, hash)| {
        Ok(FileRecord {
          id,
          path,
          file_type,
          size,
          mtime: mtime.and_then(decode_epoch),
          first_seen: crate::encode::decode_dt(&created)?,
          hash,
        })
      })
      .transpose()
  }

  fn neighbor_edges(
    conn: &Connection,
    sql: &str,
    file_id: i64,
  ) -> Result<Vec<NeighborEdge>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![file_id], |row| {
      Ok(RawNeighbor {
        path:     row.get(0)?,
        kind:     row.get(1)?,
        strength: row.get(2)?,
        metadata: row.get(3)?,
      })
    })?;
    rows
      .map(|row| row.map_err(Error::from).and_then(RawNeighbor::into_edge))
      .collect()
  }
}

impl KnowledgeStore for SqliteStore {
  type Error = Error;

  // ─── Writes ────────────────────────────────────────────────────────────────

  fn upsert_file(&self, input: &NewFile) -> Result<i64> {
    let mut conn = self.conn();
    let tx = conn.transaction()?;
    let id = Self::upsert_file_in(&tx, input)?;
    tx.commit()?;
    Ok(id)
  }

  fn upsert_relation(&self, input: &NewRelation) -> Result<()> {
    let mut conn = self.conn();
    let tx = conn.transaction()?;
    Self::upsert_relation_in(&tx, input)?;
    tx.commit()?;
    Ok(())
  }

  fn record_change(
    &self,
    path: &str,
    change_type: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    at: &str,
  ) -> Result<()> {
    let mut conn = self.conn();
    let tx = conn.transaction()?;
    let file_id = Self::upsert_file_in(&tx, &NewFile::new(path))?;
    tx.execute(
      "INSERT INTO file_changes
         (file_id, change_type, old_value, new_value, timestamp)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![file_id, change_type, old_value, new_value, at],
    )?;
    tx.commit()?;
    Ok(())
  }

  fn store_snapshot(&self, document: &Value) -> Result<String> {
    let now = Utc::now();
    let snapshot_id = document
      .get("scan_id")
      .and_then(Value::as_str)
      .map(str::to_owned)
      .unwrap_or_else(|| format!("snapshot_{}", now.format("%Y%m%d_%H%M%S")));
    let timestamp = document
      .get("timestamp")
      .and_then(Value::as_str)
      .map(str::to_owned)
      .unwrap_or_else(|| encode_dt(now));
    let hostname =
      document.get("hostname").and_then(Value::as_str).unwrap_or("unknown");
    let scan_type =
      document.get("scan_type").and_then(Value::as_str).unwrap_or("unknown");

    self.conn().execute(
      "INSERT INTO system_snapshots
         (snapshot_id, timestamp, hostname, scan_type, data_json)
       VALUES (?1, ?2, ?3, ?4, ?5)
       ON CONFLICT (snapshot_id) DO UPDATE SET
         timestamp = excluded.timestamp,
         hostname  = excluded.hostname,
         scan_type = excluded.scan_type,
         data_json = excluded.data_json",
      params![
        snapshot_id,
        timestamp,
        hostname,
        scan_type,
        serde_json::to_string(document)?,
      ],
    )?;
    Ok(snapshot_id)
  }

  fn ingest_scan(&self, scan: &RelationshipScan) -> Result<ScanIngest> {
    ingest::ingest_scan(self, scan)
  }

  fn ingest_snapshot(&self, document: &Value) -> Result<IngestReport> {
    ingest::ingest_snapshot(self, document)
  }

  // ─── Reads ─────────────────────────────────────────────────────────────────

  fn snapshot(&self, snapshot_id: &str) -> Result<Option<StoredSnapshot>> {
    self
      .conn()
      .query_row(
        "SELECT snapshot_id, timestamp, hostname, scan_type, data_json
         FROM system_snapshots WHERE snapshot_id = ?1",
        params![snapshot_id],
        |row| {
          Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
          ))
        },
      )
      .optional()?
      .map(|(snapshot_id, timestamp, hostname, scan_type, data_json)| {
        Ok(StoredSnapshot {
          snapshot_id,
          timestamp,
          hostname,
          scan_type,
          payload: serde_json::from_str(&data_json)?,
        })
      })
      .transpose()
  }

  fn neighbors(&self, path: &str, _max_depth: u32) -> Result<Neighbors> {
    let conn = self.conn();
    let file_id = Self::file_id(&conn, path)?
      .ok_or_else(|| weft_core::Error::FileNotFound(path.to_owned()))?;

    let outgoing = Self::neighbor_edges(
      &conn,
      "SELECT f.path, r.relationship_type, r.strength, r.metadata
       FROM relationships r
       JOIN files f ON f.id = r.target_file_id
       WHERE r.source_file_id = ?1
       ORDER BY f.path",
      file_id,
    )?;
    let incoming = Self::neighbor_edges(
      &conn,
      "SELECT f.path, r.relationship_type, r.strength, r.metadata
       FROM relationships r
       JOIN files f ON f.id = r.source_file_id
       WHERE r.target_file_id = ?1
       ORDER BY f.path",
      file_id,
    )?;

    let related_files: Vec<String> = outgoing
      .iter()
      .chain(&incoming)
      .map(|edge| edge.path.clone())
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();

    Ok(Neighbors { path: path.to_owned(), outgoing, incoming, related_files })
  }

  fn connected_files(
    &self,
    path: &str,
    kinds: Option<&[RelationKind]>,
  ) -> Result<Vec<String>> {
    let conn = self.conn();
    let Some(file_id) = Self::file_id(&conn, path)? else {
      return Ok(Vec::new());
    };

    let mut sql = String::from(
      "SELECT DISTINCT f.path
       FROM relationships r
       JOIN files f ON f.id = r.target_file_id OR f.id = r.source_file_id
       WHERE (r.source_file_id = ?1 OR r.target_file_id = ?1)
         AND f.id != ?1",
    );
    let mut bindings: Vec<rusqlite::types::Value> = vec![file_id.into()];
    if let Some(kinds) = kinds
      && !kinds.is_empty()
    {
      let placeholders: Vec<String> =
        (0..kinds.len()).map(|i| format!("?{}", i + 2)).collect();
      sql.push_str(&format!(
        " AND r.relationship_type IN ({})",
        placeholders.join(", ")
      ));
      for kind in kinds {
        bindings.push(kind.as_str().to_owned().into());
      }
    }
    sql.push_str(" ORDER BY f.path");

    let mut stmt = conn.prepare(&sql)?;
    let rows =
      stmt.query_map(params_from_iter(bindings), |row| row.get::<_, String>(0))?;
    rows.collect::<rusqlite::Result<_>>().map_err(Error::from)
  }

  fn top_connected(&self, limit: usize) -> Result<Vec<ConnectionRank>> {
    let conn = self.conn();
    let mut stmt = conn.prepare(
      "SELECT f.path, f.file_type, COUNT(r.id) AS connection_count
       FROM files f
       LEFT JOIN relationships r
         ON f.id = r.source_file_id OR f.id = r.target_file_id
       GROUP BY f.id, f.path, f.file_type
       ORDER BY connection_count DESC, f.path ASC
       LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |row| {
      Ok(ConnectionRank {
        path:        row.get(0)?,
        file_type:   row.get(1)?,
        connections: row.get(2)?,
      })
    })?;
    rows.collect::<rusqlite::Result<_>>().map_err(Error::from)
  }

  fn search_by_pattern(
    &self,
    pattern: &str,
    file_type: Option<&str>,
  ) -> Result<Vec<FileHit>> {
    let conn = self.conn();
    let like = format!("%{pattern}%");
    let mut sql = String::from(
      "SELECT path, file_type, size, modified_time
       FROM files WHERE path LIKE ?1",
    );
    let mut bindings: Vec<rusqlite::types::Value> = vec![like.into()];
    if let Some(file_type) = file_type {
      sql.push_str(" AND file_type = ?2");
      bindings.push(file_type.to_owned().into());
    }
    sql.push_str(" ORDER BY path");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bindings), |row| {
      Ok(FileHit {
        path:      row.get(0)?,
        file_type: row.get(1)?,
        size:      row.get(2)?,
        mtime:     row.get::<_, Option<f64>>(3)?.and_then(decode_epoch),
      })
    })?;
    rows.collect::<rusqlite::Result<_>>().map_err(Error::from)
  }

  fn change_timeline(&self, path: &str, days: u32) -> Result<Vec<ChangeEntry>> {
    let conn = self.conn();
    let Some(file_id) = Self::file_id(&conn, path)? else {
      return Ok(Vec::new());
    };
    let cutoff = encode_dt(Utc::now() - chrono::Duration::days(i64::from(days)));

    let mut stmt = conn.prepare(
      "SELECT change_type, old_value, new_value, timestamp
       FROM file_changes
       WHERE file_id = ?1 AND timestamp > ?2
       ORDER BY timestamp DESC",
    )?;
    let rows = stmt.query_map(params![file_id, cutoff], |row| {
      Ok(ChangeEntry {
        change_type: row.get(0)?,
        old_value:   row.get(1)?,
        new_value:   row.get(2)?,
        timestamp:   row.get(3)?,
      })
    })?;
    rows.collect::<rusqlite::Result<_>>().map_err(Error::from)
  }

  fn stats(&self) -> Result<StoreStats> {
    let conn = self.conn();
    let count = |sql: &str| -> Result<i64> {
      conn.query_row(sql, [], |row| row.get(0)).map_err(Error::from)
    };
    let breakdown = |sql: &str| -> Result<BTreeMap<String, i64>> {
      let mut stmt = conn.prepare(sql)?;
      let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
      })?;
      rows.collect::<rusqlite::Result<_>>().map_err(Error::from)
    };

    Ok(StoreStats {
      total_files:         count("SELECT COUNT(*) FROM files")?,
      total_relationships: count("SELECT COUNT(*) FROM relationships")?,
      total_snapshots:     count("SELECT COUNT(*) FROM system_snapshots")?,
      relationship_types:  breakdown(
        "SELECT relationship_type, COUNT(*)
         FROM relationships GROUP BY relationship_type",
      )?,
      file_types:          breakdown(
        "SELECT file_type, COUNT(*) FROM files GROUP BY file_type",
      )?,
    })
  }
}
