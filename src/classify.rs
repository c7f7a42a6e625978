use serde::{Deserialize, Serialize};

use crate::rows::{CanonicalField, FixtureField, PlayerField, StandingField, fold_header};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Fixtures,
    Standings,
    StandingsHomeAway,
    PlayerStats,
    SquadStats,
}

impl TableKind {
    pub fn label(self) -> &'static str {
        match self {
            TableKind::Fixtures => "fixtures",
            TableKind::Standings => "standings",
            TableKind::StandingsHomeAway => "standings_home_away",
            TableKind::PlayerStats => "player_stats",
            TableKind::SquadStats => "squad_stats",
        }
    }
}

/// Classify a table by its header set. Unrecognised shapes fall through to
/// squad stats, the most permissive row shape.
pub fn classify<S: AsRef<str>>(headers: &[S]) -> TableKind {
    let folded = headers
        .iter()
        .map(|h| fold_header(h.as_ref()))
        .collect::<Vec<_>>();
    let has = |field: StandingField| field.present_in(&folded);

    if has(StandingField::HomeGames) && has(StandingField::Rank) && has(StandingField::Team) {
        return TableKind::StandingsHomeAway;
    }
    if has(StandingField::Rank)
        && has(StandingField::Points)
        && has(StandingField::Team)
        && has(StandingField::Wins)
    {
        return TableKind::Standings;
    }
    if FixtureField::HomeTeam.present_in(&folded)
        || (FixtureField::Date.present_in(&folded) && FixtureField::Score.present_in(&folded))
    {
        return TableKind::Fixtures;
    }
    if PlayerField::Player.present_in(&folded) {
        return TableKind::PlayerStats;
    }
    TableKind::SquadStats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_away_split_wins_over_standings() {
        let headers = ["rank", "team", "home_games", "home_wins", "points", "wins"];
        assert_eq!(classify(&headers), TableKind::StandingsHomeAway);
    }

    #[test]
    fn standings_need_all_four_headers() {
        assert_eq!(
            classify(&["Rank", "Team", "Points", "Wins", "Ties"]),
            TableKind::Standings
        );
        // Missing wins: not a standings table; "team" alone is squad stats.
        assert_eq!(classify(&["rank", "team", "points"]), TableKind::SquadStats);
    }

    #[test]
    fn fixtures_by_home_team_or_date_and_score() {
        assert_eq!(
            classify(&["gameweek", "date", "home_team", "away_team"]),
            TableKind::Fixtures
        );
        assert_eq!(classify(&[" Date ", "Score"]), TableKind::Fixtures);
        assert_eq!(classify(&["date", "venue"]), TableKind::SquadStats);
    }

    #[test]
    fn player_and_default() {
        assert_eq!(
            classify(&["player", "nationality", "team", "goals"]),
            TableKind::PlayerStats
        );
        assert_eq!(
            classify(&["team", "players_used", "avg_age"]),
            TableKind::SquadStats
        );
        assert_eq!(classify::<&str>(&[]), TableKind::SquadStats);
    }
}
