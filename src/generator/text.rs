//! Text literal and expression helpers
//!
//! Quoting, `$$NAME.` interpolation, numeric pictures, inline font switches
//! and chunking of long literals.

use regex::Regex;

/// Maximum characters per TEXT line.
pub const CHUNK_WIDTH: usize = 70;

/// Double single quotes for a DocDEF literal.
pub fn escape(text: &str) -> String {
    text.replace('\'', "''")
}

/// `'text'` with quotes escaped.
pub fn quote(text: &str) -> String {
    format!("'{}'", escape(text))
}

/// Inner text of a `(...)` VIPP string.
pub fn unparen(text: &str) -> Option<&str> {
    text.strip_prefix('(')?.strip_suffix(')')
}

/// Convert a VIPP operand to a DocDEF term: `/x` → `x`, `(s)` → `'s'`.
pub fn term(param: &str) -> String {
    if let Some(name) = param.strip_prefix('/') {
        name.to_string()
    } else if let Some(inner) = unparen(param) {
        quote(inner)
    } else {
        param.to_string()
    }
}

/// What a text output prints
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Contents of a `(...)` string
    Literal(String),
    /// A variable or field reference
    Variable(String),
}

/// Classify a text operand.
pub fn classify(source: &str) -> Option<Source> {
    let source = source.trim();
    if source.is_empty() {
        return None;
    }
    if let Some(inner) = unparen(source) {
        return Some(Source::Literal(inner.to_string()));
    }
    let name = source.trim_start_matches('/');
    (!name.is_empty()).then(|| Source::Variable(name.to_string()))
}

/// A piece of an interpolated string
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Literal(String),
    Variable(String),
}

fn vsub_pattern() -> Option<Regex> {
    Regex::new(r"\$\$([A-Za-z_][A-Za-z0-9_]*)\.").ok()
}

/// Split `text` at `$$NAME.` markers.
pub fn pieces(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let Some(pattern) = vsub_pattern() else {
        return vec![Piece::Literal(text.to_string())];
    };
    let mut last = 0;
    for captures in pattern.captures_iter(text) {
        let Some(whole) = captures.get(0) else { continue };
        if whole.start() > last {
            pieces.push(Piece::Literal(text[last..whole.start()].to_string()));
        }
        pieces.push(Piece::Variable(captures[1].to_string()));
        last = whole.end();
    }
    if last < text.len() {
        pieces.push(Piece::Literal(text[last..].to_string()));
    }
    pieces
}

/// Build a `'lit' ! VAR ! 'lit'` expression, or `None` when `text` has no markers.
pub fn interpolate(text: &str) -> Option<String> {
    let pieces = pieces(text);
    if !pieces.iter().any(|p| matches!(p, Piece::Variable(_))) {
        return None;
    }
    let parts: Vec<String> = pieces
        .into_iter()
        .map(|piece| match piece {
            Piece::Literal(lit) => quote(&lit),
            Piece::Variable(name) => name,
        })
        .collect();
    Some(parts.join(" ! "))
}

/// TEXT item list for one segment: literals quoted, variables in parentheses.
pub fn text_items(text: &str) -> String {
    pieces(text)
        .into_iter()
        .map(|piece| match piece {
            Piece::Literal(lit) => quote(&lit),
            Piece::Variable(name) => format!("({})", name),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn picture_chars(group: &str) -> String {
    group
        .chars()
        .filter_map(|c| match c {
            '@' => Some('#'),
            '#' => Some('0'),
            _ => None,
        })
        .collect()
}

/// Convert a VIPP numeric picture such as `(@@@,@@#.##)` to a quoted NUMPICTURE mask.
///
/// `@` is an optional digit (`#`), `#` a required digit (`0`). Repeated
/// thousands groups collapse to a single separator.
pub fn numpicture(pattern: &str) -> String {
    let pattern = pattern.trim_start_matches('(').trim_end_matches(')');
    let (integer, decimal) = match pattern.rsplit_once('.') {
        Some((integer, decimal)) => (integer, decimal),
        None => (pattern, ""),
    };

    let groups: Vec<&str> = integer.split(',').collect();
    let integer = match groups.as_slice() {
        [single] => picture_chars(single),
        [prev, last] => format!("{},{}", picture_chars(prev), picture_chars(last)),
        [.., last] => format!("#,{}", picture_chars(last)),
        [] => String::new(),
    };

    let decimal = picture_chars(decimal);
    if decimal.is_empty() {
        format!("'{}'", integer)
    } else {
        format!("'{}.{}'", integer, decimal)
    }
}

/// Split `text` at `~~XX` font switches into `(font, segment)` pairs.
pub fn font_segments(text: &str, default_font: &str) -> Vec<(String, String)> {
    let Ok(pattern) = Regex::new(r"~~([A-Za-z0-9]{1,2})") else {
        return vec![(default_font.to_string(), text.to_string())];
    };
    let mut segments = Vec::new();
    let mut font = default_font.to_string();
    let mut last = 0;
    for captures in pattern.captures_iter(text) {
        let Some(whole) = captures.get(0) else { continue };
        if whole.start() > last {
            segments.push((font.clone(), text[last..whole.start()].to_string()));
        }
        font = captures[1].to_string();
        last = whole.end();
    }
    if last < text.len() {
        segments.push((font, text[last..].to_string()));
    }
    segments
}

/// Split a long literal at the last space within [`CHUNK_WIDTH`] characters.
pub fn chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while remaining.chars().count() > CHUNK_WIDTH {
        let limit = remaining.char_indices().nth(CHUNK_WIDTH).map_or(remaining.len(), |(i, _)| i);
        let split = match remaining[..limit].rfind(' ') {
            Some(pos) if pos > 0 => pos,
            _ => limit,
        };
        chunks.push(remaining[..split].to_string());
        remaining = remaining[split..].trim_start();
    }
    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }
    chunks
}

/// Initial value of an `/INI` variable.
pub fn initial_value(value: &str) -> String {
    match value {
        "true" => "1".to_string(),
        "false" => "0".to_string(),
        _ => {
            if let Some(inner) = unparen(value) {
                return format!("'{}'", inner);
            }
            let digits = value.strip_prefix('-').unwrap_or(value);
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                value.to_string()
            } else {
                format!("'{}'", value)
            }
        }
    }
}
