use chrono::NaiveDate;
use rusqlite::{OptionalExtension, Transaction, params};
use serde_json::{Map, Value};
use tracing::debug;

use crate::schema::{bool_to_i64, now_rfc3339};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted(i64),
    Updated(i64),
}

impl Upserted {
    fn from_lookup(existing: Option<i64>, id: i64) -> Self {
        match existing {
            Some(_) => Upserted::Updated(id),
            None => Upserted::Inserted(id),
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Upserted::Inserted(id) | Upserted::Updated(id) => id,
        }
    }

    pub fn inserted(self) -> bool {
        matches!(self, Upserted::Inserted(_))
    }
}

#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub league_id: Option<i64>,
    pub season_id: Option<i64>,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub match_date: NaiveDate,
    pub start_time: Option<String>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub score_raw: Option<String>,
    pub attendance: Option<i64>,
    pub venue: Option<String>,
    pub referee: Option<String>,
    pub round: Option<String>,
    pub gameweek: Option<i64>,
    pub dayofweek: Option<String>,
}

impl MatchRecord {
    pub fn is_played(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }
}

/// Insert-or-update keyed by (home team, away team, date). Results and
/// match-day metadata overwrite; league/season linkage only fills nulls.
pub fn upsert_match(tx: &Transaction<'_>, m: &MatchRecord) -> rusqlite::Result<Upserted> {
    let match_date = m.match_date.format("%Y-%m-%d").to_string();
    let existing = tx
        .query_row(
            "SELECT id FROM matches
             WHERE home_team_id = ?1 AND away_team_id = ?2 AND match_date = ?3",
            params![m.home_team_id, m.away_team_id, match_date],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    let now = now_rfc3339();
    let id = tx.query_row(
        r#"
        INSERT INTO matches (
            league_id, season_id, home_team_id, away_team_id, match_date, start_time,
            home_score, away_score, score_raw, is_played, attendance, venue, referee,
            round, gameweek, dayofweek, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10, ?11, ?12, ?13,
            ?14, ?15, ?16, ?17, ?17
        )
        ON CONFLICT(home_team_id, away_team_id, match_date) DO UPDATE SET
            home_score = excluded.home_score,
            away_score = excluded.away_score,
            score_raw = excluded.score_raw,
            is_played = excluded.is_played,
            attendance = excluded.attendance,
            venue = excluded.venue,
            referee = excluded.referee,
            league_id = COALESCE(matches.league_id, excluded.league_id),
            season_id = COALESCE(matches.season_id, excluded.season_id),
            updated_at = excluded.updated_at
        RETURNING id
        "#,
        params![
            m.league_id,
            m.season_id,
            m.home_team_id,
            m.away_team_id,
            match_date,
            m.start_time,
            m.home_score,
            m.away_score,
            m.score_raw,
            bool_to_i64(m.is_played()),
            m.attendance,
            m.venue,
            m.referee,
            m.round,
            m.gameweek,
            m.dayofweek,
            now,
        ],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(Upserted::from_lookup(existing, id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    For,
    Against,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::For => "for",
            Split::Against => "against",
        }
    }
}

/// "vs Arsenal" is what opponents did against Arsenal; "Arsenal" is Arsenal's own numbers.
pub fn split_team_name(raw: &str) -> (Split, &str) {
    let trimmed = raw.trim();
    match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("vs ") => {
            (Split::Against, trimmed[3..].trim())
        }
        _ => (Split::For, trimmed),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatBucket {
    #[default]
    Standard,
    Goalkeeping,
    Shooting,
    PlayingTime,
    Misc,
}

impl StatBucket {
    pub fn column(self) -> &'static str {
        match self {
            StatBucket::Standard => "standard_stats",
            StatBucket::Goalkeeping => "goalkeeping",
            StatBucket::Shooting => "shooting",
            StatBucket::PlayingTime => "playing_time",
            StatBucket::Misc => "misc_stats",
        }
    }

    /// Bucket named by a section title such as "2024-2025 Squad Shooting".
    pub fn from_title(title: &str) -> Option<Self> {
        let t = title.to_uppercase();
        if t.contains("GOALKEEPING") {
            Some(StatBucket::Goalkeeping)
        } else if t.contains("SHOOTING") {
            Some(StatBucket::Shooting)
        } else if t.contains("PLAYING TIME") {
            Some(StatBucket::PlayingTime)
        } else if t.contains("MISCELLANEOUS") || t.contains("MISC") {
            Some(StatBucket::Misc)
        } else if t.contains("STANDARD") {
            Some(StatBucket::Standard)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct SquadStatRecord {
    pub team_id: i64,
    pub league_id: Option<i64>,
    pub season_id: i64,
    pub split: Split,
    pub bucket: StatBucket,
    pub players_used: Option<i64>,
    pub avg_age: Option<f64>,
    pub possession: Option<f64>,
    pub games: Option<i64>,
    pub games_starts: Option<i64>,
    pub minutes: Option<i64>,
    pub minutes_90s: Option<f64>,
    pub goals: Option<i64>,
    pub assists: Option<i64>,
    pub payload: Map<String, Value>,
}

const SQUAD_AGGREGATES: &[&str] = &[
    "players_used",
    "avg_age",
    "possession",
    "games",
    "games_starts",
    "minutes",
    "minutes_90s",
    "goals",
    "assists",
];

/// Insert-or-update keyed by (team, season, split). Only the record's JSON
/// bucket is replaced. A standard-bucket record overwrites every aggregate
/// column, nulls included; other buckets leave stored aggregates alone.
pub fn upsert_squad_stat(
    tx: &Transaction<'_>,
    s: &SquadStatRecord,
) -> rusqlite::Result<Upserted> {
    let existing = tx
        .query_row(
            "SELECT id FROM team_squad_stats WHERE team_id = ?1 AND season_id = ?2 AND split = ?3",
            params![s.team_id, s.season_id, s.split.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    let bucket = s.bucket.column();
    let aggregates = if s.bucket == StatBucket::Standard {
        SQUAD_AGGREGATES
            .iter()
            .map(|col| format!("{col} = excluded.{col},\n"))
            .collect::<String>()
    } else {
        String::new()
    };
    let sql = format!(
        r#"
        INSERT INTO team_squad_stats (
            team_id, league_id, season_id, split, players_used, avg_age, possession,
            games, games_starts, minutes, minutes_90s, goals, assists, {bucket}, scraped_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ON CONFLICT(team_id, season_id, split) DO UPDATE SET
            league_id = COALESCE(team_squad_stats.league_id, excluded.league_id),
            {aggregates}
            {bucket} = excluded.{bucket},
            scraped_at = excluded.scraped_at
        RETURNING id
        "#
    );
    let payload = Value::Object(s.payload.clone()).to_string();
    let id = tx.query_row(
        &sql,
        params![
            s.team_id,
            s.league_id,
            s.season_id,
            s.split.as_str(),
            s.players_used,
            s.avg_age,
            s.possession,
            s.games,
            s.games_starts,
            s.minutes,
            s.minutes_90s,
            s.goals,
            s.assists,
            payload,
            now_rfc3339(),
        ],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(Upserted::from_lookup(existing, id))
}

#[derive(Debug, Clone)]
pub struct PlayerStatRecord {
    pub player_name: String,
    pub team_id: Option<i64>,
    pub season_id: i64,
    pub nationality: Option<String>,
    pub position: Option<String>,
    pub age: Option<i64>,
    pub birth_year: Option<i64>,
    pub games: Option<i64>,
    pub games_starts: Option<i64>,
    pub minutes: Option<i64>,
    pub minutes_90s: Option<f64>,
    pub goals: Option<i64>,
    pub assists: Option<i64>,
    pub payload: Map<String, Value>,
}

const PLAYER_UPDATE_SET: &str = r#"
            nationality = excluded.nationality,
            position = excluded.position,
            age = excluded.age,
            birth_year = excluded.birth_year,
            games = excluded.games,
            games_starts = excluded.games_starts,
            minutes = excluded.minutes,
            minutes_90s = excluded.minutes_90s,
            goals = excluded.goals,
            assists = excluded.assists,
            standard_stats = excluded.standard_stats,
            scraped_at = excluded.scraped_at
"#;

/// Insert-or-update keyed by (player, team, season). A player without a team
/// is keyed by (player, season) among team-less rows.
pub fn upsert_player_stat(
    tx: &Transaction<'_>,
    p: &PlayerStatRecord,
) -> rusqlite::Result<Upserted> {
    let existing = tx
        .query_row(
            "SELECT id FROM player_stats
             WHERE player_name = ?1 AND team_id IS ?2 AND season_id = ?3",
            params![p.player_name, p.team_id, p.season_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    let conflict_target = if p.team_id.is_some() {
        "(player_name, team_id, season_id)"
    } else {
        "(player_name, season_id) WHERE team_id IS NULL"
    };
    let sql = format!(
        r#"
        INSERT INTO player_stats (
            player_name, team_id, season_id, nationality, position, age, birth_year,
            games, games_starts, minutes, minutes_90s, goals, assists, standard_stats, scraped_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        ON CONFLICT{conflict_target} DO UPDATE SET {PLAYER_UPDATE_SET}
        RETURNING id
        "#
    );
    let payload = Value::Object(p.payload.clone()).to_string();
    let id = tx.query_row(
        &sql,
        params![
            p.player_name,
            p.team_id,
            p.season_id,
            p.nationality,
            p.position,
            p.age,
            p.birth_year,
            p.games,
            p.games_starts,
            p.minutes,
            p.minutes_90s,
            p.goals,
            p.assists,
            payload,
            now_rfc3339(),
        ],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(Upserted::from_lookup(existing, id))
}

#[derive(Debug, Clone)]
pub struct StandingRecord {
    pub team_id: i64,
    pub league_id: i64,
    pub season_id: i64,
    pub rank: Option<i64>,
    pub games: Option<i64>,
    pub wins: Option<i64>,
    pub ties: Option<i64>,
    pub losses: Option<i64>,
    pub goals_for: Option<i64>,
    pub goals_against: Option<i64>,
    pub goal_diff: Option<i64>,
    pub points: Option<i64>,
    pub points_avg: Option<f64>,
}

pub fn upsert_standing(tx: &Transaction<'_>, s: &StandingRecord) -> rusqlite::Result<Upserted> {
    let existing = tx
        .query_row(
            "SELECT id FROM league_standings
             WHERE team_id = ?1 AND league_id = ?2 AND season_id = ?3",
            params![s.team_id, s.league_id, s.season_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    let id = tx.query_row(
        r#"
        INSERT INTO league_standings (
            team_id, league_id, season_id, rank, games, wins, ties, losses,
            goals_for, goals_against, goal_diff, points, points_avg, scraped_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ON CONFLICT(team_id, league_id, season_id) DO UPDATE SET
            rank = excluded.rank,
            games = excluded.games,
            wins = excluded.wins,
            ties = excluded.ties,
            losses = excluded.losses,
            goals_for = excluded.goals_for,
            goals_against = excluded.goals_against,
            goal_diff = excluded.goal_diff,
            points = excluded.points,
            points_avg = excluded.points_avg,
            scraped_at = excluded.scraped_at
        RETURNING id
        "#,
        params![
            s.team_id,
            s.league_id,
            s.season_id,
            s.rank,
            s.games,
            s.wins,
            s.ties,
            s.losses,
            s.goals_for,
            s.goals_against,
            s.goal_diff,
            s.points,
            s.points_avg,
            now_rfc3339(),
        ],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(Upserted::from_lookup(existing, id))
}

#[derive(Debug, Clone)]
pub struct SplitRow {
    pub team_name: String,
    pub payload: Map<String, Value>,
}

struct ScopedStanding {
    id: i64,
    team_name: String,
    split: Map<String, Value>,
}

/// Attach home/away split payloads to standings already stored for the
/// (league, season) scope. Rows are matched to teams by case-folded name,
/// exact first, then by containment either way ("Man Utd" vs "Manchester Utd"
/// does not match; "Brighton" vs "Brighton & Hove Albion" does). Returns the
/// number of standings updated.
pub fn merge_home_away_splits(
    tx: &Transaction<'_>,
    league_id: i64,
    season_id: i64,
    rows: &[SplitRow],
) -> rusqlite::Result<usize> {
    let mut stmt = tx.prepare(
        "SELECT ls.id, t.name, ls.home_away_split
         FROM league_standings ls
         JOIN teams t ON t.id = ls.team_id
         WHERE ls.league_id = ?1 AND ls.season_id = ?2",
    )?;
    let mut scoped = stmt
        .query_map(params![league_id, season_id], |row| {
            let split: Option<String> = row.get(2)?;
            Ok(ScopedStanding {
                id: row.get(0)?,
                team_name: row.get::<_, String>(1)?.to_lowercase(),
                split: split
                    .and_then(|raw| serde_json::from_str::<Map<String, Value>>(&raw).ok())
                    .unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    drop(stmt);

    let mut touched = Vec::new();
    for row in rows {
        let wanted = row.team_name.trim().to_lowercase();
        if wanted.is_empty() {
            continue;
        }
        let Some(idx) = match_standing(&scoped, &wanted) else {
            debug!(team = %row.team_name, league_id, season_id, "no standing for home/away row");
            continue;
        };
        scoped[idx].split.extend(row.payload.clone());
        if !touched.contains(&idx) {
            touched.push(idx);
        }
    }

    let now = now_rfc3339();
    for idx in &touched {
        let standing = &scoped[*idx];
        tx.execute(
            "UPDATE league_standings SET home_away_split = ?1, scraped_at = ?2 WHERE id = ?3",
            params![
                Value::Object(standing.split.clone()).to_string(),
                now,
                standing.id
            ],
        )?;
    }
    Ok(touched.len())
}

fn match_standing(scoped: &[ScopedStanding], wanted: &str) -> Option<usize> {
    if let Some(idx) = scoped.iter().position(|s| s.team_name == wanted) {
        return Some(idx);
    }
    scoped
        .iter()
        .enumerate()
        .filter(|(_, s)| s.team_name.contains(wanted) || wanted.contains(s.team_name.as_str()))
        .min_by_key(|(_, s)| s.team_name.len().abs_diff(wanted.len()))
        .map(|(idx, _)| idx)
}
