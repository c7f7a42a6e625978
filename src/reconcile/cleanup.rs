//! Removal of rows left behind by broken syncs: teams whose name is a
//! serialized link object, and leagues whose name is a bare year.

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction, params};
use serde::Serialize;
use tracing::info;

const BAD_TEAM: &str = "name LIKE '{%'";
const BAD_LEAGUE: &str = "name <> '' AND name NOT GLOB '*[^0-9]*'";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadLeague {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupPreview {
    pub bad_teams_count: usize,
    pub bad_leagues: Vec<BadLeague>,
    pub bad_league_teams_count: usize,
    pub affected_squad_stats: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BadTeamsCleanup {
    pub teams_deleted: usize,
    pub squad_stats_deleted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BadLeaguesCleanup {
    pub leagues_deleted: usize,
    pub teams_deleted: usize,
    pub squad_stats_deleted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub bad_teams: BadTeamsCleanup,
    pub bad_leagues: BadLeaguesCleanup,
}

fn count(conn: &Connection, sql: &str) -> rusqlite::Result<usize> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        .map(|n| n.max(0) as usize)
}

/// Run the detection queries in a read-only transaction.
pub fn preview(conn: &mut Connection) -> Result<CleanupPreview> {
    let tx = conn.transaction().context("begin cleanup preview")?;
    let bad_teams_count = count(&tx, &format!("SELECT COUNT(*) FROM teams WHERE {BAD_TEAM}"))
        .context("count bad teams")?;

    let bad_leagues = {
        let mut stmt = tx
            .prepare(&format!("SELECT id, name FROM leagues WHERE {BAD_LEAGUE} ORDER BY id"))
            .context("prepare bad league query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BadLeague {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .context("query bad leagues")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("read bad leagues")?
    };

    let bad_league_teams_count = count(
        &tx,
        &format!(
            "SELECT COUNT(*) FROM teams
             WHERE league_id IN (SELECT id FROM leagues WHERE {BAD_LEAGUE})
               AND NOT ({BAD_TEAM})"
        ),
    )
    .context("count teams in bad leagues")?;

    let affected_squad_stats = count(
        &tx,
        &format!(
            "SELECT COUNT(*) FROM team_squad_stats
             WHERE team_id IN (SELECT id FROM teams WHERE {BAD_TEAM})
                OR league_id IN (SELECT id FROM leagues WHERE {BAD_LEAGUE})"
        ),
    )
    .context("count affected squad stats")?;

    tx.rollback().context("end cleanup preview")?;
    Ok(CleanupPreview {
        bad_teams_count,
        bad_leagues,
        bad_league_teams_count,
        affected_squad_stats,
    })
}

fn delete_bad_teams(tx: &Transaction<'_>) -> rusqlite::Result<BadTeamsCleanup> {
    let squad_stats_deleted = tx.execute(
        &format!(
            "DELETE FROM team_squad_stats
             WHERE team_id IN (SELECT id FROM teams WHERE {BAD_TEAM})"
        ),
        [],
    )?;
    let teams_deleted = tx.execute(&format!("DELETE FROM teams WHERE {BAD_TEAM}"), [])?;
    Ok(BadTeamsCleanup {
        teams_deleted,
        squad_stats_deleted,
    })
}

fn delete_bad_leagues(tx: &Transaction<'_>) -> rusqlite::Result<BadLeaguesCleanup> {
    let bad_ids = {
        let mut stmt = tx.prepare(&format!("SELECT id FROM leagues WHERE {BAD_LEAGUE}"))?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut out = BadLeaguesCleanup::default();
    for id in bad_ids {
        out.squad_stats_deleted += tx.execute(
            "DELETE FROM team_squad_stats WHERE league_id = ?1",
            params![id],
        )?;
        out.teams_deleted += tx.execute("DELETE FROM teams WHERE league_id = ?1", params![id])?;
        out.leagues_deleted += tx.execute("DELETE FROM leagues WHERE id = ?1", params![id])?;
    }
    Ok(out)
}

pub fn cleanup_bad_teams(conn: &mut Connection) -> Result<BadTeamsCleanup> {
    let tx = conn.transaction().context("begin bad team cleanup")?;
    let out = delete_bad_teams(&tx).context("delete bad teams")?;
    tx.commit().context("commit bad team cleanup")?;
    info!(teams = out.teams_deleted, squad_stats = out.squad_stats_deleted, "removed bad teams");
    Ok(out)
}

pub fn cleanup_bad_leagues(conn: &mut Connection) -> Result<BadLeaguesCleanup> {
    let tx = conn.transaction().context("begin bad league cleanup")?;
    let out = delete_bad_leagues(&tx).context("delete bad leagues")?;
    tx.commit().context("commit bad league cleanup")?;
    info!(
        leagues = out.leagues_deleted,
        teams = out.teams_deleted,
        squad_stats = out.squad_stats_deleted,
        "removed bad leagues"
    );
    Ok(out)
}

/// Both cleanups in one transaction, teams first.
pub fn cleanup_all(conn: &mut Connection) -> Result<CleanupSummary> {
    let tx = conn.transaction().context("begin cleanup")?;
    let bad_teams = delete_bad_teams(&tx).context("delete bad teams")?;
    let bad_leagues = delete_bad_leagues(&tx).context("delete bad leagues")?;
    tx.commit().context("commit cleanup")?;
    info!(
        teams = bad_teams.teams_deleted + bad_leagues.teams_deleted,
        leagues = bad_leagues.leagues_deleted,
        squad_stats = bad_teams.squad_stats_deleted + bad_leagues.squad_stats_deleted,
        "cleanup finished"
    );
    Ok(CleanupSummary {
        bad_teams,
        bad_leagues,
    })
}

impl CleanupSummary {
    pub fn squad_stats_deleted(&self) -> usize {
        self.bad_teams.squad_stats_deleted + self.bad_leagues.squad_stats_deleted
    }

    pub fn teams_deleted(&self) -> usize {
        self.bad_teams.teams_deleted + self.bad_leagues.teams_deleted
    }
}
