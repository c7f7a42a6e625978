use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::classify::{TableKind, classify};
use crate::error::{IngestError, IngestResult};
use crate::ingest_log::{self, DEFAULT_BATCH_LABEL, NewLogEntry};
use crate::normalize::{as_age, as_float, as_int, extract_text, text_field, truncate};
use crate::parse::{parse_date, parse_score};
use crate::resolve::{Resolution, resolve_league, resolve_season, resolve_team};
use crate::rows::{FixtureField, PlayerField, RawRow, SquadField, StandingField};
use crate::schema::width;
use crate::upsert::{
    MatchRecord, PlayerStatRecord, SplitRow, SquadStatRecord, StandingRecord, StatBucket,
    Upserted, merge_home_away_splits, split_team_name, upsert_match, upsert_player_stat,
    upsert_squad_stat, upsert_standing,
};

/// A table as captured by the scraper: headers plus positional rows whose
/// cells are scalars or link objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    #[serde(default)]
    pub title: Option<String>,
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestRequest {
    pub league: String,
    pub season: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tables: Vec<RawTable>,
    #[serde(default)]
    pub fixtures: Vec<Map<String, Value>>,
    #[serde(default)]
    pub stats: Vec<Map<String, Value>>,
    #[serde(default, alias = "playerStats")]
    pub player_stats: Vec<Map<String, Value>>,
}

impl IngestRequest {
    pub fn from_json(raw: &str) -> IngestResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestCounts {
    pub fixtures_inserted: usize,
    pub fixtures_updated: usize,
    pub stats_inserted: usize,
    pub stats_updated: usize,
    pub players_inserted: usize,
    pub players_updated: usize,
    pub standings_inserted: usize,
    pub standings_updated: usize,
    pub standings_split_applied: usize,
    pub teams_created: usize,
    pub rows_skipped: usize,
}

impl IngestCounts {
    pub fn rows_inserted(&self) -> usize {
        self.fixtures_inserted
            + self.stats_inserted
            + self.players_inserted
            + self.standings_inserted
    }

    pub fn rows_updated(&self) -> usize {
        self.fixtures_updated + self.stats_updated + self.players_updated + self.standings_updated
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IngestResponse {
    Success {
        success: bool,
        fixtures_inserted: usize,
        stats_inserted: usize,
        players_inserted: usize,
        standings_inserted: usize,
        rows_updated: usize,
        rows_skipped: usize,
        standings_split_applied: usize,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl IngestResponse {
    pub fn from_counts(c: &IngestCounts) -> Self {
        IngestResponse::Success {
            success: true,
            fixtures_inserted: c.fixtures_inserted,
            stats_inserted: c.stats_inserted,
            players_inserted: c.players_inserted,
            standings_inserted: c.standings_inserted,
            rows_updated: c.rows_updated(),
            rows_skipped: c.rows_skipped,
            standings_split_applied: c.standings_split_applied,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        IngestResponse::Failure {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, IngestResponse::Success { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    league_id: i64,
    season_id: i64,
}

/// Run one ingestion command and shape the outcome for the caller.
pub fn ingest(conn: &mut Connection, req: &IngestRequest) -> IngestResponse {
    match ingest_request(conn, req) {
        Ok(counts) => IngestResponse::from_counts(&counts),
        Err(err) => {
            warn!(league = %req.league, season = %req.season, error = %err, "ingest rolled back");
            IngestResponse::failure(err.to_string())
        }
    }
}

/// One request, one transaction: either every row lands or none do.
pub fn ingest_request(conn: &mut Connection, req: &IngestRequest) -> IngestResult<IngestCounts> {
    let mut tx = conn.transaction()?;
    let scope = resolve_scope(&tx, req)?;
    let counts = ingest_into(&tx, scope, req)?;

    ingest_log::append_best_effort(
        &mut tx,
        &NewLogEntry {
            league_id: Some(scope.league_id),
            season_id: Some(scope.season_id),
            batch_label: req.label.as_deref().unwrap_or(DEFAULT_BATCH_LABEL),
            rows_inserted: counts.rows_inserted(),
            rows_updated: counts.rows_updated(),
        },
    );
    tx.commit()?;

    info!(
        league = %req.league,
        season = %req.season,
        inserted = counts.rows_inserted(),
        updated = counts.rows_updated(),
        skipped = counts.rows_skipped,
        "ingest committed"
    );
    Ok(counts)
}

fn resolve_scope(tx: &Transaction<'_>, req: &IngestRequest) -> IngestResult<Scope> {
    let league_id = match resolve_league(tx, &req.league, req.country.as_deref())? {
        Resolution::Rejected(reason) => {
            return Err(IngestError::InvalidLeague {
                name: req.league.clone(),
                reason,
            });
        }
        Resolution::Found(id) | Resolution::Created(id) => id,
    };
    let season_id = match resolve_season(tx, &req.season)? {
        Resolution::Rejected(reason) => {
            return Err(IngestError::InvalidSeason {
                name: req.season.clone(),
                reason,
            });
        }
        Resolution::Found(id) | Resolution::Created(id) => id,
    };
    Ok(Scope {
        league_id,
        season_id,
    })
}

fn ingest_into(
    tx: &Transaction<'_>,
    scope: Scope,
    req: &IngestRequest,
) -> IngestResult<IngestCounts> {
    let mut counts = IngestCounts::default();
    let mut split_tables = Vec::new();

    for table in &req.tables {
        let kind = classify(&table.headers);
        debug!(kind = kind.label(), rows = table.rows.len(), "classified table");
        match kind {
            TableKind::Fixtures => {
                for row in table_rows(table) {
                    let outcome = ingest_fixture(tx, scope, &row, &mut counts)?;
                    tally(
                        outcome,
                        &mut counts.fixtures_inserted,
                        &mut counts.fixtures_updated,
                        &mut counts.rows_skipped,
                    );
                }
            }
            TableKind::SquadStats => {
                let bucket = table
                    .title
                    .as_deref()
                    .and_then(StatBucket::from_title)
                    .unwrap_or_default();
                for row in table_rows(table) {
                    let outcome = ingest_squad_stat(tx, scope, &row, bucket, &mut counts)?;
                    tally(
                        outcome,
                        &mut counts.stats_inserted,
                        &mut counts.stats_updated,
                        &mut counts.rows_skipped,
                    );
                }
            }
            TableKind::PlayerStats => {
                for row in table_rows(table) {
                    let outcome = ingest_player_stat(tx, scope, &row, &mut counts)?;
                    tally(
                        outcome,
                        &mut counts.players_inserted,
                        &mut counts.players_updated,
                        &mut counts.rows_skipped,
                    );
                }
            }
            TableKind::Standings => {
                for row in table_rows(table) {
                    let outcome = ingest_standing(tx, scope, &row, &mut counts)?;
                    tally(
                        outcome,
                        &mut counts.standings_inserted,
                        &mut counts.standings_updated,
                        &mut counts.rows_skipped,
                    );
                }
            }
            // Splits attach to standings, so they wait until every standings table is in.
            TableKind::StandingsHomeAway => split_tables.push(table),
        }
    }

    for record in &req.fixtures {
        let outcome = ingest_fixture(tx, scope, &RawRow::from_record(record), &mut counts)?;
        tally(
            outcome,
            &mut counts.fixtures_inserted,
            &mut counts.fixtures_updated,
            &mut counts.rows_skipped,
        );
    }
    for record in &req.stats {
        let row = RawRow::from_record(record);
        let outcome = ingest_squad_stat(tx, scope, &row, StatBucket::Standard, &mut counts)?;
        tally(
            outcome,
            &mut counts.stats_inserted,
            &mut counts.stats_updated,
            &mut counts.rows_skipped,
        );
    }
    for record in &req.player_stats {
        let outcome = ingest_player_stat(tx, scope, &RawRow::from_record(record), &mut counts)?;
        tally(
            outcome,
            &mut counts.players_inserted,
            &mut counts.players_updated,
            &mut counts.rows_skipped,
        );
    }

    for table in split_tables {
        let rows = table_rows(table)
            .filter_map(|row| {
                let team_name = extract_text(row.get(StandingField::Team))?;
                Some(SplitRow {
                    team_name,
                    payload: row.payload_without(Some(StandingField::Team)),
                })
            })
            .collect::<Vec<_>>();
        counts.standings_split_applied +=
            merge_home_away_splits(tx, scope.league_id, scope.season_id, &rows)?;
    }

    Ok(counts)
}

fn table_rows(table: &RawTable) -> impl Iterator<Item = RawRow> + '_ {
    table
        .rows
        .iter()
        .map(|cells| RawRow::from_cells(&table.headers, cells))
        .filter(|row| !row.is_blank())
}

fn tally(
    outcome: Option<Upserted>,
    inserted: &mut usize,
    updated: &mut usize,
    skipped: &mut usize,
) {
    match outcome {
        Some(Upserted::Inserted(_)) => *inserted += 1,
        Some(Upserted::Updated(_)) => *updated += 1,
        None => *skipped += 1,
    }
}

fn team_id(
    tx: &Transaction<'_>,
    scope: Scope,
    name: &str,
    counts: &mut IngestCounts,
) -> IngestResult<Option<i64>> {
    match resolve_team(tx, scope.league_id, name)? {
        Resolution::Created(id) => {
            counts.teams_created += 1;
            Ok(Some(id))
        }
        Resolution::Found(id) => Ok(Some(id)),
        Resolution::Rejected(reason) => {
            debug!(team = name, reason = %reason, "team rejected");
            Ok(None)
        }
    }
}

fn ingest_fixture(
    tx: &Transaction<'_>,
    scope: Scope,
    row: &RawRow,
    counts: &mut IngestCounts,
) -> IngestResult<Option<Upserted>> {
    let home = extract_text(row.get(FixtureField::HomeTeam));
    let away = extract_text(row.get(FixtureField::AwayTeam));
    let (Some(home), Some(away)) = (home, away) else {
        debug!("fixture without both teams skipped");
        return Ok(None);
    };
    let date_text = extract_text(row.get(FixtureField::Date));
    let Some(match_date) = parse_date(date_text.as_deref()) else {
        debug!(home = %home, away = %away, date = ?date_text, "fixture without a date skipped");
        return Ok(None);
    };
    let Some(home_team_id) = team_id(tx, scope, &home, counts)? else {
        return Ok(None);
    };
    let Some(away_team_id) = team_id(tx, scope, &away, counts)? else {
        return Ok(None);
    };

    let score_text = extract_text(row.get(FixtureField::Score));
    let (home_score, away_score) = parse_score(score_text.as_deref());
    let record = MatchRecord {
        league_id: Some(scope.league_id),
        season_id: Some(scope.season_id),
        home_team_id,
        away_team_id,
        match_date,
        start_time: text_field(row.get(FixtureField::StartTime), width::START_TIME),
        home_score,
        away_score,
        score_raw: truncate(score_text, width::SCORE_RAW),
        attendance: as_int(row.get(FixtureField::Attendance)),
        venue: text_field(row.get(FixtureField::Venue), width::VENUE),
        referee: text_field(row.get(FixtureField::Referee), width::REFEREE),
        round: text_field(row.get(FixtureField::Round), width::ROUND),
        gameweek: as_int(row.get(FixtureField::Gameweek)),
        dayofweek: text_field(row.get(FixtureField::DayOfWeek), width::DAY_OF_WEEK),
    };
    Ok(Some(upsert_match(tx, &record)?))
}

fn ingest_squad_stat(
    tx: &Transaction<'_>,
    scope: Scope,
    row: &RawRow,
    bucket: StatBucket,
    counts: &mut IngestCounts,
) -> IngestResult<Option<Upserted>> {
    let Some(raw_team) = extract_text(row.get(SquadField::Team)) else {
        return Ok(None);
    };
    let (split, team_name) = split_team_name(&raw_team);
    let Some(team_id) = team_id(tx, scope, team_name, counts)? else {
        return Ok(None);
    };

    let record = SquadStatRecord {
        team_id,
        league_id: Some(scope.league_id),
        season_id: scope.season_id,
        split,
        bucket,
        players_used: as_int(row.get(SquadField::PlayersUsed)),
        avg_age: as_float(row.get(SquadField::AvgAge)),
        possession: as_float(row.get(SquadField::Possession)),
        games: as_int(row.get(SquadField::Games)),
        games_starts: as_int(row.get(SquadField::GamesStarts)),
        minutes: as_int(row.get(SquadField::Minutes)),
        minutes_90s: as_float(row.get(SquadField::Minutes90s)),
        goals: as_int(row.get(SquadField::Goals)),
        assists: as_int(row.get(SquadField::Assists)),
        payload: row.payload_without(Some(SquadField::Team)),
    };
    Ok(Some(upsert_squad_stat(tx, &record)?))
}

fn ingest_player_stat(
    tx: &Transaction<'_>,
    scope: Scope,
    row: &RawRow,
    counts: &mut IngestCounts,
) -> IngestResult<Option<Upserted>> {
    let Some(player_name) = text_field(row.get(PlayerField::Player), width::PLAYER_NAME) else {
        return Ok(None);
    };
    // Scraped tables repeat their header row every few dozen players.
    if player_name.eq_ignore_ascii_case("player") {
        return Ok(None);
    }
    let team_id = match extract_text(row.get(PlayerField::Team)) {
        Some(team) => team_id(tx, scope, &team, counts)?,
        None => None,
    };

    let record = PlayerStatRecord {
        player_name,
        team_id,
        season_id: scope.season_id,
        nationality: text_field(row.get(PlayerField::Nationality), width::NATIONALITY),
        position: text_field(row.get(PlayerField::Position), width::POSITION),
        age: as_age(row.get(PlayerField::Age)),
        birth_year: as_age(row.get(PlayerField::BirthYear)),
        games: as_int(row.get(PlayerField::Games)),
        games_starts: as_int(row.get(PlayerField::GamesStarts)),
        minutes: as_int(row.get(PlayerField::Minutes)),
        minutes_90s: as_float(row.get(PlayerField::Minutes90s)),
        goals: as_int(row.get(PlayerField::Goals)),
        assists: as_int(row.get(PlayerField::Assists)),
        payload: row.payload_without::<PlayerField>(None),
    };
    Ok(Some(upsert_player_stat(tx, &record)?))
}

fn ingest_standing(
    tx: &Transaction<'_>,
    scope: Scope,
    row: &RawRow,
    counts: &mut IngestCounts,
) -> IngestResult<Option<Upserted>> {
    let Some(team) = extract_text(row.get(StandingField::Team)) else {
        return Ok(None);
    };
    let Some(team_id) = team_id(tx, scope, &team, counts)? else {
        return Ok(None);
    };

    let record = StandingRecord {
        team_id,
        league_id: scope.league_id,
        season_id: scope.season_id,
        rank: as_int(row.get(StandingField::Rank)),
        games: as_int(row.get(StandingField::Games)),
        wins: as_int(row.get(StandingField::Wins)),
        ties: as_int(row.get(StandingField::Ties)),
        losses: as_int(row.get(StandingField::Losses)),
        goals_for: as_int(row.get(StandingField::GoalsFor)),
        goals_against: as_int(row.get(StandingField::GoalsAgainst)),
        goal_diff: as_int(row.get(StandingField::GoalDiff)),
        points: as_int(row.get(StandingField::Points)),
        points_avg: as_float(row.get(StandingField::PointsAvg)),
    };
    Ok(Some(upsert_standing(tx, &record)?))
}
