//! Read-side derivations over committed data.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingsSeason {
    pub league_id: i64,
    pub league_name: String,
    pub season_id: i64,
    pub season_name: String,
    pub is_current: bool,
}

/// The league's current season: the greatest season name among its
/// standings. Names compare as strings ("2024-2025" > "2023-2024"), never by id.
pub fn current_season(
    conn: &Connection,
    league_id: i64,
) -> rusqlite::Result<Option<(i64, String)>> {
    conn.query_row(
        "SELECT s.id, s.name
         FROM league_standings ls
         JOIN seasons s ON s.id = ls.season_id
         WHERE ls.league_id = ?1
         GROUP BY s.id, s.name
         ORDER BY s.name DESC
         LIMIT 1",
        params![league_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

/// Seasons that have standings, per league, newest name first. The first
/// season of each league is flagged current.
pub fn standings_seasons(
    conn: &Connection,
    league_id: Option<i64>,
) -> rusqlite::Result<Vec<StandingsSeason>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT l.id, l.name, s.id, s.name
         FROM league_standings ls
         JOIN leagues l ON l.id = ls.league_id
         JOIN seasons s ON s.id = ls.season_id
         WHERE ?1 IS NULL OR l.id = ?1
         ORDER BY l.name, l.id, s.name DESC",
    )?;
    let rows = stmt.query_map(params![league_id], |row| {
        Ok(StandingsSeason {
            league_id: row.get(0)?,
            league_name: row.get(1)?,
            season_id: row.get(2)?,
            season_name: row.get(3)?,
            is_current: false,
        })
    })?;

    let mut out = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    let mut last_league = None;
    for entry in &mut out {
        entry.is_current = last_league != Some(entry.league_id);
        last_league = Some(entry.league_id);
    }
    Ok(out)
}
