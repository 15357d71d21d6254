//! SQLite store for track records
//!
//! Keeps the analyzed library on disk so tracks are not re-analyzed, and
//! answers the harmonic-mixing queries (by Camelot code, by compatibility).

use crate::record::TrackRecord;
use rusqlite::{params, params_from_iter, Connection, Row};
use slam_analysis::{CamelotKey, Mode};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Track store backed by SQLite
pub struct TrackStore {
    conn: Connection,
}

impl TrackStore {
    /// SQL schema for the tracks table
    ///
    /// `camelot_number` duplicates the code's number so sorting follows the
    /// wheel (2A before 10A) instead of text order.
    const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            bpm INTEGER,
            key_root TEXT,
            key_mode TEXT,
            camelot_code TEXT,
            camelot_number INTEGER,
            duration_secs INTEGER,
            filename TEXT NOT NULL,
            cue_points TEXT NOT NULL,
            waveform_color TEXT NOT NULL,
            needs_verification INTEGER NOT NULL,
            analyzed_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_camelot ON tracks(camelot_code);
        CREATE INDEX IF NOT EXISTS idx_bpm ON tracks(bpm);
    "#;

    const COLUMNS: &'static str = "id, title, artist, bpm, key_root, key_mode, camelot_code,
         duration_secs, filename, cue_points, waveform_color, needs_verification";

    const ORDER: &'static str = "
         ORDER BY
             CASE WHEN camelot_number IS NULL THEN 1 ELSE 0 END,  -- NULLs last
             camelot_number ASC,
             camelot_code ASC,
             CASE WHEN bpm IS NULL THEN 1 ELSE 0 END,  -- NULLs last
             bpm ASC,
             id ASC";

    /// Open or create a store database at the given path
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(Self::SCHEMA)?;
        info!(path = %db_path.display(), "opened track store");
        Ok(Self { conn })
    }

    /// Open an in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(Self::SCHEMA)?;
        Ok(Self { conn })
    }

    /// Store a record, replacing any existing record with the same id
    pub fn store(&self, record: &TrackRecord) -> Result<(), StoreError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let camelot_number = record.camelot().map(|c| c.number);
        let cue_points = join_cue_points(&record.cue_points);

        self.conn.execute(
            r#"INSERT OR REPLACE INTO tracks
               (id, title, artist, bpm, key_root, key_mode,
                camelot_code, camelot_number, duration_secs, filename,
                cue_points, waveform_color, needs_verification, analyzed_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
            params![
                record.id,
                record.title,
                record.artist,
                record.bpm,
                record.key,
                record.key_mode.map(|m| m.to_string()),
                record.camelot_code,
                camelot_number,
                record.duration_secs,
                record.filename,
                cue_points,
                record.waveform_color,
                record.needs_verification,
                now,
            ],
        )?;
        info!(id = %record.id, camelot = ?record.camelot_code, bpm = ?record.bpm, "stored track");
        Ok(())
    }

    /// Get a record by id
    pub fn get(&self, id: &str) -> Result<Option<TrackRecord>, StoreError> {
        let sql = format!("SELECT {} FROM tracks WHERE id = ?1", Self::COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id], read_row)?;
        match rows.next() {
            Some(row) => into_record(row?).map(Some),
            None => Ok(None),
        }
    }

    /// Get all records, sorted by Camelot code then BPM
    pub fn get_all_sorted(&self) -> Result<Vec<TrackRecord>, StoreError> {
        let sql = format!("SELECT {} FROM tracks {}", Self::COLUMNS, Self::ORDER);
        self.query(&sql, Vec::<String>::new())
    }

    /// Get all records with a specific Camelot code, sorted by BPM
    pub fn get_by_camelot(&self, code: &str) -> Result<Vec<TrackRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM tracks WHERE camelot_code = ?1 {}",
            Self::COLUMNS,
            Self::ORDER
        );
        self.query(&sql, vec![code.to_uppercase()])
    }

    /// Get all records that mix harmonically with `code`
    ///
    /// Matches the same key, its relative and both wheel neighbours. An
    /// unparseable code matches nothing.
    pub fn get_compatible(&self, code: &str) -> Result<Vec<TrackRecord>, StoreError> {
        let Some(key) = CamelotKey::parse(code) else {
            return Ok(Vec::new());
        };
        let codes: Vec<String> = key.compatible_keys().iter().map(|k| k.to_string()).collect();
        let placeholders = vec!["?"; codes.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM tracks WHERE camelot_code IN ({}) {}",
            Self::COLUMNS,
            placeholders,
            Self::ORDER
        );
        self.query(&sql, codes)
    }

    /// Get the number of stored tracks
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Remove a track from the store
    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let affected = self.conn.execute("DELETE FROM tracks WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Clear all stored tracks
    pub fn clear(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM tracks", [])?;
        Ok(())
    }

    fn query(&self, sql: &str, args: Vec<String>) -> Result<Vec<TrackRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), read_row)?;
        rows.map(|row| row.map_err(StoreError::from).and_then(into_record))
            .collect()
    }
}

/// Raw column values, before the text-encoded fields are decoded
struct RawRecord {
    id: String,
    title: String,
    artist: String,
    bpm: Option<u32>,
    key: Option<String>,
    key_mode: Option<String>,
    camelot_code: Option<String>,
    duration_secs: Option<u32>,
    filename: String,
    cue_points: String,
    waveform_color: String,
    needs_verification: bool,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        bpm: row.get(3)?,
        key: row.get(4)?,
        key_mode: row.get(5)?,
        camelot_code: row.get(6)?,
        duration_secs: row.get(7)?,
        filename: row.get(8)?,
        cue_points: row.get(9)?,
        waveform_color: row.get(10)?,
        needs_verification: row.get(11)?,
    })
}

fn into_record(raw: RawRecord) -> Result<TrackRecord, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        id: raw.id.clone(),
        reason,
    };

    let key_mode = match raw.key_mode.as_deref() {
        None => None,
        Some("major") => Some(Mode::Major),
        Some("minor") => Some(Mode::Minor),
        Some(other) => return Err(corrupt(format!("unknown key mode {other:?}"))),
    };
    let cue_points = split_cue_points(&raw.cue_points)
        .ok_or_else(|| corrupt(format!("bad cue points {:?}", raw.cue_points)))?;
    let compatible_keys = raw
        .camelot_code
        .as_deref()
        .and_then(CamelotKey::parse)
        .map(|c| c.compatible_keys().iter().map(|k| k.to_string()).collect())
        .unwrap_or_default();

    Ok(TrackRecord {
        id: raw.id,
        title: raw.title,
        artist: raw.artist,
        bpm: raw.bpm,
        key: raw.key,
        key_mode,
        camelot_code: raw.camelot_code,
        compatible_keys,
        duration_secs: raw.duration_secs,
        filename: raw.filename,
        cue_points,
        waveform_color: raw.waveform_color,
        needs_verification: raw.needs_verification,
    })
}

fn join_cue_points(points: &[u32]) -> String {
    points
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn split_cue_points(text: &str) -> Option<Vec<u32>> {
    if text.is_empty() {
        return Some(Vec::new());
    }
    text.split(',').map(|p| p.trim().parse().ok()).collect()
}
