//! Spreadsheet exports carry many tables per sheet. Each table is a section:
//! a title row, a header row, then data rows until the next title.

use std::io::Read;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::ingest::{IngestRequest, RawTable};
use crate::normalize::extract_text;
use crate::upsert::StatBucket;

// First cell of the row after a title; anything else is not a header row.
const HEADER_KEYWORDS: &[&str] = &["team", "ranker", "gameweek", "rank", "round", "dayofweek"];

static SEASON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{4})").expect("season pattern is valid"));
static LEAGUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d{4}-\d{4}\s+(.+?)\s+(?:table|scores|squad|player)\b")
        .expect("league pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Fixtures,
    SquadStats(StatBucket),
    PlayerStats,
    Standings,
    Skip,
}

#[derive(Debug, Clone)]
pub struct SheetSection {
    pub title: String,
    pub kind: SectionKind,
    pub season: Option<String>,
    pub league: Option<String>,
    pub table: RawTable,
}

pub fn detect_section_kind(title: &str) -> SectionKind {
    let t = title.to_uppercase();
    const KINDS: &[(&str, SectionKind)] = &[
        ("SCORES & FIXTURES", SectionKind::Fixtures),
        ("SCORES &AMP; FIXTURES", SectionKind::Fixtures),
        ("SQUAD STANDARD STATS", SectionKind::SquadStats(StatBucket::Standard)),
        ("SQUAD GOALKEEPING", SectionKind::SquadStats(StatBucket::Goalkeeping)),
        ("SQUAD SHOOTING", SectionKind::SquadStats(StatBucket::Shooting)),
        ("SQUAD PLAYING TIME", SectionKind::SquadStats(StatBucket::PlayingTime)),
        ("SQUAD MISCELLANEOUS", SectionKind::SquadStats(StatBucket::Misc)),
        ("PLAYER STANDARD STATS", SectionKind::PlayerStats),
        ("NATIONALITIES", SectionKind::Skip),
        ("TABLE", SectionKind::Standings),
    ];
    KINDS
        .iter()
        .find(|(key, _)| t.contains(key))
        .map(|(_, kind)| *kind)
        .unwrap_or(SectionKind::Skip)
}

pub fn season_from_title(title: &str) -> Option<String> {
    SEASON_RE
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn league_from_title(title: &str) -> Option<String> {
    LEAGUE_RE
        .captures(title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_cell_text(row: &[Value]) -> Option<String> {
    row.first().and_then(|v| match v {
        Value::String(_) => extract_text(v),
        _ => None,
    })
}

/// Row indexes where a section title sits.
pub fn find_sections(rows: &[Vec<Value>]) -> Vec<usize> {
    let mut out = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if first_cell_text(row).is_none() {
            continue;
        }
        let Some(next) = rows.get(idx + 1) else {
            continue;
        };
        let Some(next_first) = first_cell_text(next) else {
            continue;
        };
        if HEADER_KEYWORDS.contains(&next_first.to_lowercase().as_str()) {
            out.push(idx);
        }
    }
    out
}

pub fn split_sections(rows: &[Vec<Value>]) -> Vec<SheetSection> {
    let starts = find_sections(rows);
    let mut out = Vec::with_capacity(starts.len());
    for (pos, &start) in starts.iter().enumerate() {
        let end = starts.get(pos + 1).copied().unwrap_or(rows.len());
        let title = first_cell_text(&rows[start]).unwrap_or_default();
        let headers = rows
            .get(start + 1)
            .map(|row| {
                row.iter()
                    .map(|cell| extract_text(cell).unwrap_or_default())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let data = rows
            .get(start + 2..end)
            .unwrap_or_default()
            .iter()
            .filter(|row| row.iter().any(|cell| extract_text(cell).is_some()))
            .cloned()
            .collect::<Vec<_>>();

        out.push(SheetSection {
            kind: detect_section_kind(&title),
            season: season_from_title(&title),
            league: league_from_title(&title),
            table: RawTable {
                title: Some(title.clone()),
                headers,
                rows: data,
            },
            title,
        });
    }
    out
}

/// Group importable sections into one ingestion request per (league, season),
/// in first-seen order. Sections without a season, or without a league when
/// no fallback is given, are dropped.
pub fn group_into_requests(
    sections: Vec<SheetSection>,
    fallback_league: Option<&str>,
    label: Option<&str>,
) -> Vec<IngestRequest> {
    let mut out: Vec<IngestRequest> = Vec::new();
    for section in sections {
        if section.kind == SectionKind::Skip {
            continue;
        }
        let Some(season) = section.season else {
            continue;
        };
        let Some(league) = section
            .league
            .or_else(|| fallback_league.map(|s| s.to_string()))
        else {
            continue;
        };
        let existing = out.iter_mut().find(|r| {
            r.league.eq_ignore_ascii_case(&league) && r.season.eq_ignore_ascii_case(&season)
        });
        match existing {
            Some(req) => req.tables.push(section.table),
            None => out.push(IngestRequest {
                league,
                season,
                label: label.map(|s| s.to_string()),
                tables: vec![section.table],
                ..IngestRequest::default()
            }),
        }
    }
    out
}

/// Read a headerless CSV sheet export into rows of cells. Empty cells are null.
pub fn rows_from_csv<R: Read>(reader: R) -> Result<Vec<Vec<Value>>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();
    for (idx, record) in csv.records().enumerate() {
        let record = record.with_context(|| format!("read csv row {}", idx + 1))?;
        rows.push(
            record
                .iter()
                .map(|cell| {
                    if cell.trim().is_empty() {
                        Value::Null
                    } else {
                        Value::String(cell.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}
