use std::iter::Peekable;
use std::str::Chars;

use serde_json::{Map, Value};

// Whole-cell tokens that scraped tables and spreadsheet exports use for "no value".
const NULL_TOKENS: &[&str] = &["", "nan", "n/a", "none", "null", "-", "—"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Numeric::Int(n) => Some(n),
            Numeric::Float(f) if f.is_finite() => Some(f.round() as i64),
            Numeric::Float(_) => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(n) => n as f64,
            Numeric::Float(f) => f,
        }
    }
}

pub fn is_null_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    NULL_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Coerce a cell to a number: "1,234" and "55.2%" parse, null tokens and junk
/// yield `None`.
pub fn coerce_number(cell: &Value) -> Option<Numeric> {
    match cell {
        Value::Null | Value::Bool(_) | Value::Array(_) => None,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Numeric::Int(i))
            } else {
                n.as_f64().map(Numeric::Float)
            }
        }
        Value::String(_) | Value::Object(_) => {
            let text = extract_text(cell)?;
            parse_numeric_str(&text)
        }
    }
}

pub fn as_int(cell: &Value) -> Option<i64> {
    coerce_number(cell).and_then(Numeric::as_i64)
}

pub fn as_float(cell: &Value) -> Option<f64> {
    coerce_number(cell)
        .map(Numeric::as_f64)
        .filter(|f| f.is_finite())
}

fn parse_numeric_str(raw: &str) -> Option<Numeric> {
    let cleaned = raw.trim().replace([',', '%'], "");
    let cleaned = cleaned.trim();
    if is_null_token(cleaned) {
        return None;
    }
    if let Ok(n) = cleaned.parse::<i64>() {
        return Some(Numeric::Int(n));
    }
    cleaned.parse::<f64>().ok().map(Numeric::Float)
}

/// Display text of a cell. Link objects (`{"text": .., "href": ..}`) give their
/// `text` (or `name`) field, and so do stringified copies of them.
pub fn extract_text(cell: &Value) -> Option<String> {
    let text = match cell {
        Value::Null => return None,
        Value::String(s) => text_from_str(s),
        Value::Object(map) => text_from_map(map)?,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) => return None,
    };
    let trimmed = text.trim();
    if is_null_token(trimmed) {
        return None;
    }
    Some(trimmed.to_string())
}

fn text_from_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if looks_like_stringified_link(trimmed)
        && let Some(map) = decode_literal_map(trimmed)
        && let Some(text) = text_from_map(&map)
    {
        return text;
    }
    trimmed.to_string()
}

fn text_from_map(map: &Map<String, Value>) -> Option<String> {
    let field = map.get("text").or_else(|| map.get("name"))?;
    match field {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(inner) => text_from_map(inner),
        _ => None,
    }
}

fn looks_like_stringified_link(raw: &str) -> bool {
    raw.starts_with('{')
        && ["'text'", "\"text\"", "'name'", "\"name\""]
            .iter()
            .any(|key| raw.contains(key))
}

/// Age and birth-year cells: "25-123" (years-days) and "1999.0" both give the
/// leading integer.
pub fn as_age(cell: &Value) -> Option<i64> {
    let text = extract_text(cell)?;
    let cleaned = text.replace(',', "");
    let head = cleaned.split(['-', '.']).next().unwrap_or_default().trim();
    if head.is_empty() {
        return None;
    }
    head.parse::<i64>().ok()
}

/// Identity key for names compared case-insensitively. Folds full Unicode,
/// which SQLite `NOCASE` does not.
pub fn name_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Cap a text value at `max_chars` characters. Empty text collapses to `None`.
pub fn truncate(value: Option<String>, max_chars: usize) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_chars).collect())
}

pub fn text_field(cell: &Value, max_chars: usize) -> Option<String> {
    truncate(extract_text(cell), max_chars)
}

/// Value stored in a JSON payload bucket: link objects flatten to their text,
/// null tokens become JSON null, everything else is kept.
pub fn payload_value(cell: &Value) -> Value {
    match cell {
        Value::Object(_) => extract_text(cell).map(Value::String).unwrap_or(Value::Null),
        Value::String(s) if is_null_token(s) => Value::Null,
        Value::String(_) => extract_text(cell).map(Value::String).unwrap_or(Value::Null),
        other => other.clone(),
    }
}

/// Decode a dict-like payload. Accepts JSON objects as well as Python-style
/// literals (`{'text': 'Arsenal', 'href': None}`).
pub fn decode_literal_map(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Some(map);
    }
    let mut parser = LiteralParser {
        chars: trimmed.chars().peekable(),
        depth: 0,
    };
    let map = parser.parse_map()?;
    parser.skip_ws();
    if parser.chars.peek().is_some() {
        return None;
    }
    Some(map)
}

/// Nesting cap for stringified literals. Deeper input is rejected.
const MAX_LITERAL_DEPTH: usize = 64;

struct LiteralParser<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl LiteralParser<'_> {
    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.chars.peek() == Some(&expected) {
            self.chars.next();
            return true;
        }
        false
    }

    fn parse_value(&mut self) -> Option<Value> {
        self.skip_ws();
        match *self.chars.peek()? {
            '{' => self.nested(|p| p.parse_map().map(Value::Object)),
            '[' => self.nested(|p| p.parse_list(']')),
            '(' => self.nested(|p| p.parse_list(')')),
            '\'' | '"' => self.parse_string().map(Value::String),
            _ => self.parse_bare(),
        }
    }

    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Option<Value>) -> Option<Value> {
        if self.depth >= MAX_LITERAL_DEPTH {
            return None;
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_map(&mut self) -> Option<Map<String, Value>> {
        if !self.eat('{') {
            return None;
        }
        let mut map = Map::new();
        if self.eat('}') {
            return Some(map);
        }
        loop {
            let key = match self.parse_value()? {
                Value::String(s) => s,
                other => other.to_string(),
            };
            if !self.eat(':') {
                return None;
            }
            let value = self.parse_value()?;
            map.insert(key, value);
            if self.eat(',') {
                if self.eat('}') {
                    return Some(map);
                }
                continue;
            }
            return self.eat('}').then_some(map);
        }
    }

    fn parse_list(&mut self, close: char) -> Option<Value> {
        self.chars.next();
        let mut items = Vec::new();
        if self.eat(close) {
            return Some(Value::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            if self.eat(',') {
                if self.eat(close) {
                    return Some(Value::Array(items));
                }
                continue;
            }
            return self.eat(close).then_some(Value::Array(items));
        }
    }

    fn parse_string(&mut self) -> Option<String> {
        let quote = self.chars.next()?;
        let mut out = String::new();
        loop {
            let ch = self.chars.next()?;
            if ch == quote {
                return Some(out);
            }
            if ch == '\\' {
                match self.chars.next()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    other => out.push(other),
                }
                continue;
            }
            out.push(ch);
        }
    }

    fn parse_bare(&mut self) -> Option<Value> {
        let mut token = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || matches!(ch, ',' | ':' | '}' | ']' | ')') {
                break;
            }
            token.push(ch);
            self.chars.next();
        }
        match token.as_str() {
            "" => None,
            "None" | "null" => Some(Value::Null),
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            _ => {
                if let Ok(n) = token.parse::<i64>() {
                    Some(Value::from(n))
                } else if let Ok(f) = token.parse::<f64>() {
                    Some(Value::from(f))
                } else {
                    Some(Value::String(token))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_strip_separators_and_percent() {
        assert_eq!(coerce_number(&json!("1,234")), Some(Numeric::Int(1234)));
        assert_eq!(coerce_number(&json!("55.2%")), Some(Numeric::Float(55.2)));
        assert_eq!(coerce_number(&json!(7)), Some(Numeric::Int(7)));
        assert_eq!(coerce_number(&json!("N/A")), None);
        assert_eq!(coerce_number(&json!("nan")), None);
        assert_eq!(coerce_number(&json!("")), None);
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&Value::Null), None);
        assert_eq!(as_int(&json!("12.0")), Some(12));
        assert_eq!(as_int(&json!({"text": "38"})), Some(38));
    }

    #[test]
    fn text_from_link_objects() {
        assert_eq!(
            extract_text(&json!({"text": "Arsenal", "href": "/en/squads/18bb7c10"})),
            Some("Arsenal".to_string())
        );
        assert_eq!(
            extract_text(&json!({"name": "Chelsea"})),
            Some("Chelsea".to_string())
        );
        assert_eq!(
            extract_text(&json!("  Liverpool ")),
            Some("Liverpool".to_string())
        );
        assert_eq!(extract_text(&json!({"href": "/x"})), None);
    }

    #[test]
    fn text_from_stringified_literals() {
        assert_eq!(
            extract_text(&json!("{'text': 'Arsenal', 'href': '/en/squads/18bb7c10'}")),
            Some("Arsenal".to_string())
        );
        assert_eq!(
            extract_text(&json!(r#"{"text": "Brighton & Hove Albion"}"#)),
            Some("Brighton & Hove Albion".to_string())
        );
        assert_eq!(
            extract_text(&json!("{'text': \"Nott'ham Forest\", 'href': None}")),
            Some("Nott'ham Forest".to_string())
        );
        // Unbalanced literal stays as-is.
        assert_eq!(
            extract_text(&json!("{'text': 'Arsenal'")),
            Some("{'text': 'Arsenal'".to_string())
        );
    }

    #[test]
    fn literal_map_handles_nesting_and_keywords() {
        let map =
            decode_literal_map("{'a': [1, 2.5, None], 'b': {'c': True}, 'd': (1,),}").unwrap();
        assert_eq!(map["a"], json!([1, 2.5, null]));
        assert_eq!(map["b"], json!({"c": true}));
        assert_eq!(map["d"], json!([1]));
        assert!(decode_literal_map("{'a': 1} trailing").is_none());
        assert!(decode_literal_map("not a map").is_none());
    }

    #[test]
    fn deeply_nested_literal_is_rejected() {
        let deep = format!("{{'text': {}", "[".repeat(100_000));
        assert!(decode_literal_map(&deep).is_none());
        assert_eq!(extract_text(&json!(deep)), Some(deep.clone()));

        let at_cap = format!("{{'a': {}{}}}", "[".repeat(64), "]".repeat(64));
        assert!(decode_literal_map(&at_cap).is_some());
        let past_cap = format!("{{'a': {}{}}}", "[".repeat(65), "]".repeat(65));
        assert!(decode_literal_map(&past_cap).is_none());
    }

    #[test]
    fn age_takes_leading_integer() {
        assert_eq!(as_age(&json!("25-123")), Some(25));
        assert_eq!(as_age(&json!("1,999")), Some(1999));
        assert_eq!(as_age(&json!("1999.0")), Some(1999));
        assert_eq!(as_age(&json!(31)), Some(31));
        assert_eq!(as_age(&json!("")), None);
        assert_eq!(as_age(&json!("unknown")), None);
    }

    #[test]
    fn truncate_caps_chars() {
        assert_eq!(truncate(Some("Wolverhampton".into()), 5), Some("Wolve".into()));
        assert_eq!(truncate(Some("Atlético".into()), 8), Some("Atlético".into()));
        assert_eq!(truncate(Some("   ".into()), 5), None);
        assert_eq!(truncate(None, 5), None);
    }

    #[test]
    fn payload_values_flatten() {
        assert_eq!(payload_value(&json!({"text": "ENG"})), json!("ENG"));
        assert_eq!(payload_value(&json!("nan")), Value::Null);
        assert_eq!(payload_value(&json!(3)), json!(3));
    }
}
