//! Canonical field names for each table shape, resolved from the header
//! aliases seen in scraped tables (FBref `data-stat` names) and spreadsheet
//! exports (display headers).

use serde_json::{Map, Value};

pub trait CanonicalField: Copy {
    fn aliases(self) -> &'static [&'static str];

    fn matches_header(self, header: &str) -> bool {
        self.aliases().contains(&header)
    }

    fn present_in<S: AsRef<str>>(self, headers: &[S]) -> bool {
        headers.iter().any(|h| self.matches_header(h.as_ref()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureField {
    HomeTeam,
    AwayTeam,
    Date,
    StartTime,
    Score,
    Attendance,
    Venue,
    Referee,
    Round,
    Gameweek,
    DayOfWeek,
}

impl CanonicalField for FixtureField {
    fn aliases(self) -> &'static [&'static str] {
        match self {
            FixtureField::HomeTeam => &["home_team", "home", "home team"],
            FixtureField::AwayTeam => &["away_team", "away", "away team"],
            FixtureField::Date => &["date", "match_date"],
            FixtureField::StartTime => &["start_time", "time"],
            FixtureField::Score => &["score", "result"],
            FixtureField::Attendance => &["attendance"],
            FixtureField::Venue => &["venue"],
            FixtureField::Referee => &["referee"],
            FixtureField::Round => &["round"],
            FixtureField::Gameweek => &["gameweek", "wk", "matchday"],
            FixtureField::DayOfWeek => &["dayofweek", "day"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquadField {
    Team,
    PlayersUsed,
    AvgAge,
    Possession,
    Games,
    GamesStarts,
    Minutes,
    Minutes90s,
    Goals,
    Assists,
}

impl CanonicalField for SquadField {
    fn aliases(self) -> &'static [&'static str] {
        match self {
            SquadField::Team => &["team", "squad"],
            SquadField::PlayersUsed => &["players_used", "# pl"],
            SquadField::AvgAge => &["avg_age", "age"],
            SquadField::Possession => &["possession", "poss"],
            SquadField::Games => &["games", "mp"],
            SquadField::GamesStarts => &["games_starts", "starts"],
            SquadField::Minutes => &["minutes", "min"],
            SquadField::Minutes90s => &["minutes_90s", "90s"],
            SquadField::Goals => &["goals", "gls"],
            SquadField::Assists => &["assists", "ast"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerField {
    Player,
    Nationality,
    Position,
    Team,
    Age,
    BirthYear,
    Games,
    GamesStarts,
    Minutes,
    Minutes90s,
    Goals,
    Assists,
}

impl CanonicalField for PlayerField {
    fn aliases(self) -> &'static [&'static str] {
        match self {
            PlayerField::Player => &["player", "player_name"],
            PlayerField::Nationality => &["nationality", "nation"],
            PlayerField::Position => &["position", "pos"],
            PlayerField::Team => &["team", "squad"],
            PlayerField::Age => &["age"],
            PlayerField::BirthYear => &["birth_year", "born"],
            PlayerField::Games => &["games", "mp"],
            PlayerField::GamesStarts => &["games_starts", "starts"],
            PlayerField::Minutes => &["minutes", "min"],
            PlayerField::Minutes90s => &["minutes_90s", "90s"],
            PlayerField::Goals => &["goals", "gls"],
            PlayerField::Assists => &["assists", "ast"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandingField {
    Rank,
    Team,
    Games,
    Wins,
    Ties,
    Losses,
    GoalsFor,
    GoalsAgainst,
    GoalDiff,
    Points,
    PointsAvg,
    HomeGames,
}

impl CanonicalField for StandingField {
    fn aliases(self) -> &'static [&'static str] {
        match self {
            StandingField::Rank => &["rank", "rk"],
            StandingField::Team => &["team", "squad"],
            StandingField::Games => &["games", "mp"],
            StandingField::Wins => &["wins", "w"],
            StandingField::Ties => &["ties", "draws", "d"],
            StandingField::Losses => &["losses", "l"],
            StandingField::GoalsFor => &["goals_for", "gf"],
            StandingField::GoalsAgainst => &["goals_against", "ga"],
            StandingField::GoalDiff => &["goal_diff", "gd"],
            StandingField::Points => &["points", "pts"],
            StandingField::PointsAvg => &["points_avg", "pts/mp"],
            StandingField::HomeGames => &["home_games", "home_wins"],
        }
    }
}

pub fn fold_header(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One input row keyed by case-folded header, in source column order.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: Vec<(String, Value)>,
}

impl RawRow {
    /// Zip a header row with a data row. Short rows leave trailing fields
    /// missing; extra cells without a header are dropped.
    pub fn from_cells(headers: &[String], cells: &[Value]) -> Self {
        let cells = headers
            .iter()
            .zip(cells.iter())
            .filter(|(h, _)| !h.trim().is_empty())
            .map(|(h, v)| (fold_header(h), v.clone()))
            .collect();
        Self { cells }
    }

    pub fn from_record(record: &Map<String, Value>) -> Self {
        let cells = record
            .iter()
            .map(|(k, v)| (fold_header(k), v.clone()))
            .collect();
        Self { cells }
    }

    pub fn raw(&self, header: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v)
    }

    /// First non-null cell among the field's aliases, or JSON null.
    pub fn get<F: CanonicalField>(&self, field: F) -> &Value {
        static NULL: Value = Value::Null;
        field
            .aliases()
            .iter()
            .filter_map(|alias| self.raw(alias))
            .find(|v| !v.is_null())
            .unwrap_or(&NULL)
    }

    /// All cells as a JSON payload, excluding the given field's aliases.
    pub fn payload_without<F: CanonicalField>(&self, skip: Option<F>) -> Map<String, Value> {
        self.cells
            .iter()
            .filter(|(h, _)| skip.is_none_or(|f| !f.matches_header(h)))
            .map(|(h, v)| (h.clone(), crate::normalize::payload_value(v)))
            .collect()
    }

    pub fn is_blank(&self) -> bool {
        self.cells
            .iter()
            .all(|(_, v)| crate::normalize::extract_text(v).is_none())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn aliases_resolve_in_order() {
        let headers = vec!["Squad".to_string(), "goals".to_string(), "Gls".to_string()];
        let row = RawRow::from_cells(&headers, &[json!("Arsenal"), json!(null), json!(12)]);
        assert_eq!(row.get(SquadField::Team), &json!("Arsenal"));
        // "goals" is the first alias but null, so "gls" supplies the value.
        assert_eq!(row.get(SquadField::Goals), &json!(12));

        let both = RawRow::from_cells(&headers, &[json!("Arsenal"), json!(9), json!(12)]);
        assert_eq!(both.get(SquadField::Goals), &json!(9));
        assert_eq!(row.get(SquadField::Assists), &Value::Null);
    }

    #[test]
    fn short_rows_and_payload() {
        let headers = vec!["team".to_string(), "games".to_string(), "".to_string()];
        let row = RawRow::from_cells(&headers, &[json!({"text": "Spurs"})]);
        assert_eq!(row.get(SquadField::Games), &Value::Null);
        let payload = row.payload_without(Some(SquadField::Team));
        assert!(payload.is_empty());
        let payload = row.payload_without::<SquadField>(None);
        assert_eq!(payload["team"], json!("Spurs"));
    }
}
