use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::normalize::{name_key, truncate};
use crate::reconcile::merge::{LeagueRow, elect_survivor};
use crate::schema::{now_rfc3339, width};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(i64),
    Created(i64),
    Rejected(String),
}

impl Resolution {
    pub fn id(&self) -> Option<i64> {
        match self {
            Resolution::Found(id) | Resolution::Created(id) => Some(*id),
            Resolution::Rejected(_) => None,
        }
    }

    pub fn created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

/// Title-case each word: "premier league" -> "Premier League", "ligue 1" -> "Ligue 1".
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = ch != '\'';
        }
    }
    out
}

pub fn is_bare_year(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Case-insensitive get-or-create for a league. Bare numbers are rejected
/// even when a legacy row carries one; new leagues are stored title-cased.
/// `country` is only written when the league is created. When several case
/// variants already exist, the one the merge job would keep is returned.
pub fn resolve_league(
    conn: &Connection,
    raw_name: &str,
    country: Option<&str>,
) -> rusqlite::Result<Resolution> {
    let Some(name) = truncate(Some(raw_name.to_string()), width::LEAGUE_NAME) else {
        return Ok(Resolution::Rejected("league name is empty".to_string()));
    };
    if is_bare_year(&name) {
        return Ok(Resolution::Rejected(
            "league name is a bare year or number".to_string(),
        ));
    }
    let key = name_key(&name);
    if let Some(id) = find_league(conn, &key)? {
        return Ok(Resolution::Found(id));
    }

    let canonical = title_case(&name);
    let inserted = conn.execute(
        "INSERT INTO leagues (name, name_key, country, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO NOTHING",
        params![
            canonical,
            key,
            country.and_then(|c| truncate(Some(c.to_string()), width::COUNTRY)),
            now_rfc3339()
        ],
    )?;
    if inserted == 1 {
        let id = conn.last_insert_rowid();
        debug!(league = %canonical, id, "created league");
        return Ok(Resolution::Created(id));
    }
    // Lost a create race; another writer holds the row now.
    match find_league(conn, &key)? {
        Some(id) => Ok(Resolution::Found(id)),
        None => Err(rusqlite::Error::QueryReturnedNoRows),
    }
}

fn find_league(conn: &Connection, key: &str) -> rusqlite::Result<Option<i64>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, country, external_id FROM leagues WHERE name_key = ?1 ORDER BY id",
    )?;
    let variants = stmt
        .query_map(params![key], |row| {
            Ok(LeagueRow {
                id: row.get(0)?,
                name: row.get(1)?,
                country: row.get(2)?,
                external_id: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(elect_survivor(&variants).map(|league| league.id))
}

/// Case-insensitive get-or-create for a season. Names are stored verbatim.
pub fn resolve_season(conn: &Connection, raw_name: &str) -> rusqlite::Result<Resolution> {
    let Some(name) = truncate(Some(raw_name.to_string()), width::SEASON_NAME) else {
        return Ok(Resolution::Rejected("season name is empty".to_string()));
    };
    let key = name_key(&name);
    let find = || {
        conn.query_row(
            "SELECT id FROM seasons WHERE name_key = ?1",
            params![key],
            |row| row.get::<_, i64>(0),
        )
        .optional()
    };
    if let Some(id) = find()? {
        return Ok(Resolution::Found(id));
    }
    let inserted = conn.execute(
        "INSERT INTO seasons (name, name_key, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(name_key) DO NOTHING",
        params![name, key, now_rfc3339()],
    )?;
    if inserted == 1 {
        return Ok(Resolution::Created(conn.last_insert_rowid()));
    }
    match find()? {
        Some(id) => Ok(Resolution::Found(id)),
        None => Err(rusqlite::Error::QueryReturnedNoRows),
    }
}

/// Case-insensitive get-or-create for a team within one league. The name is
/// expected to be extracted display text already.
pub fn resolve_team(
    conn: &Connection,
    league_id: i64,
    display_name: &str,
) -> rusqlite::Result<Resolution> {
    let Some(name) = truncate(Some(display_name.to_string()), width::TEAM_NAME) else {
        return Ok(Resolution::Rejected("team name is empty".to_string()));
    };
    if name.starts_with('{') {
        return Ok(Resolution::Rejected(
            "team name is a serialized object".to_string(),
        ));
    }
    let key = name_key(&name);
    if let Some(id) = find_team(conn, league_id, &key)? {
        return Ok(Resolution::Found(id));
    }
    let inserted = conn.execute(
        "INSERT INTO teams (league_id, name, name_key, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(league_id, name_key) DO NOTHING",
        params![league_id, name, key, now_rfc3339()],
    )?;
    if inserted == 1 {
        let id = conn.last_insert_rowid();
        debug!(team = %name, league_id, id, "created team");
        return Ok(Resolution::Created(id));
    }
    match find_team(conn, league_id, &key)? {
        Some(id) => Ok(Resolution::Found(id)),
        None => Err(rusqlite::Error::QueryReturnedNoRows),
    }
}

fn find_team(conn: &Connection, league_id: i64, key: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM teams WHERE league_id = ?1 AND name_key = ?2",
        params![league_id, key],
        |row| row.get(0),
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::open_in_memory;

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("premier league"), "Premier League");
        assert_eq!(title_case("LA LIGA"), "La Liga");
        assert_eq!(title_case("ligue 1"), "Ligue 1");
        assert_eq!(title_case("serie-a"), "Serie-A");
        assert_eq!(title_case("o'higgins cup"), "O'higgins Cup");
    }

    #[test]
    fn league_lookup_is_case_insensitive() {
        let conn = open_in_memory().unwrap();
        let first = resolve_league(&conn, "premier league", None).unwrap();
        assert!(first.created());
        let again = resolve_league(&conn, "PREMIER LEAGUE", Some("England")).unwrap();
        assert_eq!(again, Resolution::Found(first.id().unwrap()));
        let (name, country): (String, Option<String>) = conn
            .query_row("SELECT name, country FROM leagues", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(name, "Premier League");
        // An existing league is never rewritten by a later lookup.
        assert_eq!(country, None);

        let created = resolve_league(&conn, "la liga", Some("Spain")).unwrap();
        assert!(created.created());
        let country: Option<String> = conn
            .query_row(
                "SELECT country FROM leagues WHERE id = ?1",
                params![created.id()],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(country.as_deref(), Some("Spain"));
    }

    #[test]
    fn non_ascii_names_fold_case() {
        let conn = open_in_memory().unwrap();
        let league = resolve_league(&conn, "süper lig", None).unwrap();
        assert_eq!(
            resolve_league(&conn, "SÜPER LIG", None).unwrap(),
            Resolution::Found(league.id().unwrap())
        );
        let league_id = league.id().unwrap();
        let team = resolve_team(&conn, league_id, "Atlético Madrid").unwrap();
        assert!(team.created());
        assert_eq!(
            resolve_team(&conn, league_id, "ATLÉTICO MADRID").unwrap(),
            Resolution::Found(team.id().unwrap())
        );
        let season = resolve_season(&conn, "Temporada Ñ").unwrap();
        assert_eq!(
            resolve_season(&conn, "temporada ñ").unwrap(),
            Resolution::Found(season.id().unwrap())
        );
    }

    #[test]
    fn variant_lookup_agrees_with_merge_election() {
        let conn = open_in_memory().unwrap();
        let insert = |name: &str, country: Option<&str>| {
            conn.execute(
                "INSERT INTO leagues (name, name_key, country, created_at)
                 VALUES (?1, ?2, ?3, '2025-01-01T00:00:00+00:00')",
                params![name, name_key(name), country],
            )
            .unwrap();
            conn.last_insert_rowid()
        };
        // A blank country counts as unset, so the later variant wins.
        insert("Eredivisie", Some("  "));
        let dutch = insert("EREDIVISIE", Some("Netherlands"));
        assert_eq!(
            resolve_league(&conn, "eredivisie", None).unwrap(),
            Resolution::Found(dutch)
        );
        let plans = crate::reconcile::merge::plan_merges(&conn).unwrap();
        assert_eq!(plans[0].survivor.id, dutch);
    }

    #[test]
    fn bare_year_league_rejected() {
        let conn = open_in_memory().unwrap();
        assert!(matches!(
            resolve_league(&conn, " 2024 ", None).unwrap(),
            Resolution::Rejected(_)
        ));
        assert!(matches!(
            resolve_league(&conn, "", None).unwrap(),
            Resolution::Rejected(_)
        ));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM leagues", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn seasons_verbatim_and_teams_scoped() {
        let conn = open_in_memory().unwrap();
        let season = resolve_season(&conn, "2024-2025").unwrap();
        assert!(season.created());
        assert_eq!(
            resolve_season(&conn, "2024-2025").unwrap(),
            Resolution::Found(season.id().unwrap())
        );

        let pl = resolve_league(&conn, "Premier League", None).unwrap().id().unwrap();
        let liga = resolve_league(&conn, "La Liga", None).unwrap().id().unwrap();
        let arsenal = resolve_team(&conn, pl, "Arsenal").unwrap();
        assert!(arsenal.created());
        assert_eq!(
            resolve_team(&conn, pl, "arsenal").unwrap(),
            Resolution::Found(arsenal.id().unwrap())
        );
        // Same name, different league: a separate team.
        assert!(resolve_team(&conn, liga, "Arsenal").unwrap().created());
        assert!(matches!(
            resolve_team(&conn, pl, "{'text': 'Arsenal'}").unwrap(),
            Resolution::Rejected(_)
        ));
    }
}
