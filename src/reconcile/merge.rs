use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction, params};
use serde::Serialize;
use tracing::{info, warn};

use crate::normalize::name_key;

/// Tables carrying a `league_id` that must follow a merged league.
pub const REFERENCING_TABLES: &[&str] = &[
    "teams",
    "matches",
    "team_squad_stats",
    "league_standings",
    "ingestion_log",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeagueRow {
    pub id: i64,
    pub name: String,
    pub country: Option<String>,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergePlan {
    pub folded_name: String,
    pub survivor: LeagueRow,
    pub duplicates: Vec<LeagueRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepointStep {
    pub table: &'static str,
    pub rows: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergedLeague {
    pub survivor_id: i64,
    pub duplicate_id: i64,
    pub duplicate_name: String,
    pub steps: Vec<RepointStep>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub groups: usize,
    pub leagues_deleted: usize,
    pub merged: Vec<MergedLeague>,
}

impl MergeReport {
    pub fn failed_steps(&self) -> usize {
        self.merged
            .iter()
            .flat_map(|m| m.steps.iter())
            .filter(|s| s.error.is_some())
            .count()
    }
}

/// Set means non-blank after trimming. Shared by survivor election and the
/// resolver's variant lookup.
fn is_set(v: &Option<String>) -> bool {
    v.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Country set beats unset, then external id set beats unset, then lowest id.
pub fn elect_survivor(group: &[LeagueRow]) -> Option<&LeagueRow> {
    group
        .iter()
        .min_by_key(|l| (!is_set(&l.country), !is_set(&l.external_id), l.id))
}

fn load_leagues(conn: &Connection) -> rusqlite::Result<Vec<LeagueRow>> {
    let mut stmt =
        conn.prepare("SELECT id, name, country, external_id FROM leagues ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(LeagueRow {
            id: row.get(0)?,
            name: row.get(1)?,
            country: row.get(2)?,
            external_id: row.get(3)?,
        })
    })?;
    rows.collect()
}

fn plan_from(conn: &Connection) -> rusqlite::Result<Vec<MergePlan>> {
    let mut groups: BTreeMap<String, Vec<LeagueRow>> = BTreeMap::new();
    for league in load_leagues(conn)? {
        groups
            .entry(name_key(&league.name))
            .or_default()
            .push(league);
    }

    let mut plans = Vec::new();
    for (folded_name, group) in groups {
        if group.len() < 2 {
            continue;
        }
        let Some(survivor) = elect_survivor(&group).cloned() else {
            continue;
        };
        let duplicates = group.into_iter().filter(|l| l.id != survivor.id).collect();
        plans.push(MergePlan {
            folded_name,
            survivor,
            duplicates,
        });
    }
    Ok(plans)
}

/// Duplicate groups and their elected survivors. Reads only.
pub fn plan_merges(conn: &Connection) -> Result<Vec<MergePlan>> {
    plan_from(conn).context("plan league merges")
}

fn repoint(tx: &mut Transaction<'_>, table: &'static str, from: i64, to: i64) -> RepointStep {
    let result = (|| -> rusqlite::Result<usize> {
        let sp = tx.savepoint()?;
        let rows = sp.execute(
            &format!("UPDATE {table} SET league_id = ?1 WHERE league_id = ?2"),
            params![to, from],
        )?;
        sp.commit()?;
        Ok(rows)
    })();
    match result {
        Ok(rows) => RepointStep {
            table,
            rows,
            error: None,
        },
        Err(err) => {
            warn!(table, from, to, error = %err, "league re-point failed; skipping table");
            RepointStep {
                table,
                rows: 0,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Fold every case-variant league group into its survivor. Each referencing
/// table is re-pointed under its own savepoint; a failed table is recorded and
/// skipped, and the duplicate is deleted regardless.
pub fn merge_duplicate_leagues(conn: &mut Connection) -> Result<MergeReport> {
    let mut tx = conn.transaction().context("begin merge transaction")?;
    let plans = plan_from(&tx).context("plan league merges")?;
    let mut report = MergeReport {
        groups: plans.len(),
        ..MergeReport::default()
    };

    for plan in plans {
        let survivor = &plan.survivor;
        let mut external_id = survivor
            .external_id
            .clone()
            .filter(|s| !s.trim().is_empty());
        for dup in plan.duplicates {
            let steps = REFERENCING_TABLES
                .iter()
                .map(|table| repoint(&mut tx, *table, dup.id, survivor.id))
                .collect::<Vec<_>>();

            if external_id.is_none() && is_set(&dup.external_id) {
                tx.execute(
                    "UPDATE leagues SET external_id = ?1 WHERE id = ?2",
                    params![dup.external_id, survivor.id],
                )
                .with_context(|| format!("back-fill external id on league {}", survivor.id))?;
                external_id = dup.external_id.clone();
            }
            report.leagues_deleted += tx
                .execute("DELETE FROM leagues WHERE id = ?1", params![dup.id])
                .with_context(|| format!("delete duplicate league {}", dup.id))?;

            info!(
                survivor = survivor.id,
                duplicate = dup.id,
                name = %dup.name,
                "merged duplicate league"
            );
            report.merged.push(MergedLeague {
                survivor_id: survivor.id,
                duplicate_id: dup.id,
                duplicate_name: dup.name,
                steps,
            });
        }
    }

    tx.commit().context("commit league merge")?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn league(id: i64, country: Option<&str>, external_id: Option<&str>) -> LeagueRow {
        LeagueRow {
            id,
            name: format!("league {id}"),
            country: country.map(str::to_string),
            external_id: external_id.map(str::to_string),
        }
    }

    #[test]
    fn survivor_priority() {
        let group = vec![
            league(1, None, None),
            league(2, None, Some("x")),
            league(3, Some("England"), None),
        ];
        assert_eq!(elect_survivor(&group).map(|l| l.id), Some(3));

        let group = vec![league(4, None, None), league(2, None, Some("x"))];
        assert_eq!(elect_survivor(&group).map(|l| l.id), Some(2));

        let group = vec![league(9, Some(" "), None), league(5, None, None)];
        assert_eq!(elect_survivor(&group).map(|l| l.id), Some(5));

        assert!(elect_survivor(&[]).is_none());
    }
}
