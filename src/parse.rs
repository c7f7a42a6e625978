use chrono::NaiveDate;

use crate::normalize::is_null_token;

// Preference order matters: "2–1" uses an en-dash on FBref, spreadsheets use '-'.
const SCORE_SEPARATORS: &[char] = &['–', '-', '—'];

/// Parse a raw score string into (home, away). Penalty shootout notes in
/// parentheses are dropped, so "(4) 1–1 (3)" is a 1–1 draw. Anything that
/// does not yield two integers is (None, None), which is also how unplayed
/// fixtures are represented.
pub fn parse_score(raw: Option<&str>) -> (Option<i32>, Option<i32>) {
    let Some(raw) = raw else {
        return (None, None);
    };
    if is_null_token(raw) {
        return (None, None);
    }
    let cleaned = strip_parentheticals(raw);
    let Some(sep) = SCORE_SEPARATORS.iter().find(|sep| cleaned.contains(**sep)) else {
        return (None, None);
    };
    let Some((home, away)) = cleaned.split_once(*sep) else {
        return (None, None);
    };
    match (home.trim().parse::<i32>(), away.trim().parse::<i32>()) {
        (Ok(h), Ok(a)) => (Some(h), Some(a)),
        _ => (None, None),
    }
}

fn strip_parentheticals(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for ch in raw.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Parse a raw date cell. "20250815" is compact YYYYMMDD; otherwise the first
/// ten characters are read as an ISO date ("2025-08-15T00:00" -> 2025-08-15).
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if is_null_token(raw) {
        return None;
    }
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let year = raw[0..4].parse::<i32>().ok()?;
        let month = raw[4..6].parse::<u32>().ok()?;
        let day = raw[6..8].parse::<u32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let head: String = raw.chars().take(10).collect();
    NaiveDate::parse_from_str(&head, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_split_on_dashes() {
        assert_eq!(parse_score(Some("2–1")), (Some(2), Some(1)));
        assert_eq!(parse_score(Some("2-1 (Pen)")), (Some(2), Some(1)));
        assert_eq!(parse_score(Some("0—0")), (Some(0), Some(0)));
        assert_eq!(parse_score(Some("(4) 1–1 (3)")), (Some(1), Some(1)));
        assert_eq!(parse_score(Some(" 3 – 2 ")), (Some(3), Some(2)));
    }

    #[test]
    fn empty_or_unplayed_scores_are_none() {
        assert_eq!(parse_score(None), (None, None));
        assert_eq!(parse_score(Some("")), (None, None));
        assert_eq!(parse_score(Some("nan")), (None, None));
        assert_eq!(parse_score(Some("Postponed")), (None, None));
        assert_eq!(parse_score(Some("2–")), (None, None));
    }

    #[test]
    fn dates_compact_and_iso() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 15);
        assert_eq!(parse_date(Some("20250815")), expected);
        assert_eq!(parse_date(Some("2025-08-15T00:00")), expected);
        assert_eq!(parse_date(Some("2025-08-15")), expected);
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(Some("nan")), None);
        assert_eq!(parse_date(None), None);
        assert_eq!(parse_date(Some("20251345")), None);
        assert_eq!(parse_date(Some("Sat")), None);
    }
}
