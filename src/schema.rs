use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Stored column widths, in characters.
pub mod width {
    pub const LEAGUE_NAME: usize = 100;
    pub const COUNTRY: usize = 50;
    pub const SEASON_NAME: usize = 20;
    pub const TEAM_NAME: usize = 100;
    pub const PLAYER_NAME: usize = 150;
    pub const NATIONALITY: usize = 50;
    pub const POSITION: usize = 20;
    pub const VENUE: usize = 150;
    pub const REFEREE: usize = 100;
    pub const ROUND: usize = 50;
    pub const SCORE_RAW: usize = 20;
    pub const START_TIME: usize = 10;
    pub const DAY_OF_WEEK: usize = 10;
    pub const BATCH_LABEL: usize = 50;
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")
        .context("enable wal journal")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS leagues (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            name_key TEXT NOT NULL,
            country TEXT NULL,
            external_id TEXT NULL,
            created_at TEXT NOT NULL
        );
        -- Not unique: case variants can exist until the merge job folds them.
        CREATE INDEX IF NOT EXISTS idx_leagues_name_key ON leagues(name_key);

        CREATE TABLE IF NOT EXISTS seasons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            league_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (league_id, name_key)
        );
        CREATE INDEX IF NOT EXISTS idx_teams_league ON teams(league_id);

        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            league_id INTEGER NULL,
            season_id INTEGER NULL,
            home_team_id INTEGER NOT NULL,
            away_team_id INTEGER NOT NULL,
            match_date TEXT NOT NULL,
            start_time TEXT NULL,
            home_score INTEGER NULL,
            away_score INTEGER NULL,
            score_raw TEXT NULL,
            is_played INTEGER NOT NULL DEFAULT 0,
            attendance INTEGER NULL,
            venue TEXT NULL,
            referee TEXT NULL,
            round TEXT NULL,
            gameweek INTEGER NULL,
            dayofweek TEXT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (home_team_id, away_team_id, match_date)
        );
        CREATE INDEX IF NOT EXISTS idx_matches_league ON matches(league_id);
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season_id);
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(match_date);

        CREATE TABLE IF NOT EXISTS team_squad_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_id INTEGER NOT NULL,
            league_id INTEGER NULL,
            season_id INTEGER NOT NULL,
            split TEXT NOT NULL,
            players_used INTEGER NULL,
            avg_age REAL NULL,
            possession REAL NULL,
            games INTEGER NULL,
            games_starts INTEGER NULL,
            minutes INTEGER NULL,
            minutes_90s REAL NULL,
            goals INTEGER NULL,
            assists INTEGER NULL,
            standard_stats TEXT NOT NULL DEFAULT '{}',
            goalkeeping TEXT NOT NULL DEFAULT '{}',
            shooting TEXT NOT NULL DEFAULT '{}',
            playing_time TEXT NOT NULL DEFAULT '{}',
            misc_stats TEXT NOT NULL DEFAULT '{}',
            scraped_at TEXT NOT NULL,
            UNIQUE (team_id, season_id, split)
        );
        CREATE INDEX IF NOT EXISTS idx_squad_stats_league ON team_squad_stats(league_id);

        CREATE TABLE IF NOT EXISTS player_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_name TEXT NOT NULL,
            team_id INTEGER NULL,
            season_id INTEGER NOT NULL,
            nationality TEXT NULL,
            position TEXT NULL,
            age INTEGER NULL,
            birth_year INTEGER NULL,
            games INTEGER NULL,
            games_starts INTEGER NULL,
            minutes INTEGER NULL,
            minutes_90s REAL NULL,
            goals INTEGER NULL,
            assists INTEGER NULL,
            standard_stats TEXT NOT NULL DEFAULT '{}',
            scraped_at TEXT NOT NULL,
            UNIQUE (player_name, team_id, season_id)
        );
        -- NULL team ids never collide under UNIQUE, so team-less players get their own key.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_player_stats_teamless
            ON player_stats(player_name, season_id) WHERE team_id IS NULL;

        CREATE TABLE IF NOT EXISTS league_standings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_id INTEGER NOT NULL,
            league_id INTEGER NOT NULL,
            season_id INTEGER NOT NULL,
            rank INTEGER NULL,
            games INTEGER NULL,
            wins INTEGER NULL,
            ties INTEGER NULL,
            losses INTEGER NULL,
            goals_for INTEGER NULL,
            goals_against INTEGER NULL,
            goal_diff INTEGER NULL,
            points INTEGER NULL,
            points_avg REAL NULL,
            home_away_split TEXT NULL,
            scraped_at TEXT NOT NULL,
            UNIQUE (team_id, league_id, season_id)
        );
        CREATE INDEX IF NOT EXISTS idx_standings_scope ON league_standings(league_id, season_id);

        CREATE TABLE IF NOT EXISTS ingestion_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            league_id INTEGER NULL,
            season_id INTEGER NULL,
            batch_label TEXT NOT NULL,
            rows_inserted INTEGER NOT NULL,
            rows_updated INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}
