use rusqlite::{Connection, Transaction, params};
use serde::Serialize;
use tracing::warn;

use crate::normalize::truncate;
use crate::schema::{now_rfc3339, width};

pub const DEFAULT_BATCH_LABEL: &str = "sync";

#[derive(Debug, Clone, Serialize)]
pub struct IngestionLogEntry {
    pub id: i64,
    pub league_id: Option<i64>,
    pub season_id: Option<i64>,
    pub batch_label: String,
    pub rows_inserted: i64,
    pub rows_updated: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewLogEntry<'a> {
    pub league_id: Option<i64>,
    pub season_id: Option<i64>,
    pub batch_label: &'a str,
    pub rows_inserted: usize,
    pub rows_updated: usize,
}

pub fn append(conn: &Connection, entry: &NewLogEntry<'_>) -> rusqlite::Result<i64> {
    let label = truncate(Some(entry.batch_label.to_string()), width::BATCH_LABEL)
        .unwrap_or_else(|| DEFAULT_BATCH_LABEL.to_string());
    conn.execute(
        "INSERT INTO ingestion_log
             (league_id, season_id, batch_label, rows_inserted, rows_updated, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.league_id,
            entry.season_id,
            label,
            entry.rows_inserted as i64,
            entry.rows_updated as i64,
            now_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Append inside a savepoint of the ingest transaction. A failed write rolls
/// back only the savepoint and is reported as `None`.
pub fn append_best_effort(tx: &mut Transaction<'_>, entry: &NewLogEntry<'_>) -> Option<i64> {
    let result = (|| -> rusqlite::Result<i64> {
        let sp = tx.savepoint()?;
        let id = append(&sp, entry)?;
        sp.commit()?;
        Ok(id)
    })();
    match result {
        Ok(id) => Some(id),
        Err(err) => {
            warn!(error = %err, label = entry.batch_label, "ingestion log write failed");
            None
        }
    }
}

pub fn recent(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<IngestionLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, league_id, season_id, batch_label, rows_inserted, rows_updated, created_at
         FROM ingestion_log
         ORDER BY id DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |row| {
        Ok(IngestionLogEntry {
            id: row.get(0)?,
            league_id: row.get(1)?,
            season_id: row.get(2)?,
            batch_label: row.get(3)?,
            rows_inserted: row.get(4)?,
            rows_updated: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;
    rows.collect()
}
