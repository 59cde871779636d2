//! Routing tables: Markdown pipe tables mapping response triggers to skill-relative document paths.
//!
//! ```text
//! | Response                 | Load                           |
//! |--------------------------|--------------------------------|
//! | 1, "laravel", "php"      | `references/laravel/*.md`      |
//! | "debug" or "error"       | `workflows/debug-backend.md`   |
//! ```
//!
//! The first column holds triggers. In any other column, backtick spans that look like paths are targets;
//! a cell without backticks contributes its bare path-like words instead.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::skills::backtick_spans;

static OR_SPLIT: OnceLock<Regex> = OnceLock::new();

fn or_split() -> &'static Regex {
    OR_SPLIT.get_or_init(|| Regex::new(r"(?i)\s+or\s+").expect("or regex"))
}

/// What a response is compared against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// Numeric intake menu choice; matches only the bare number.
    MenuIndex(u32),
    /// Lowercased keyword or phrase.
    Keyword(String),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::MenuIndex(n) => write!(f, "{}", n),
            Trigger::Keyword(k) => write!(f, "\"{}\"", k),
        }
    }
}

/// One row of a routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingRule {
    pub triggers: Vec<Trigger>,
    /// Skill-relative paths or glob patterns, in the order written.
    pub targets: Vec<String>,
    /// 1-based line in the parsed text (or entry number in routes.json).
    pub row: usize,
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '`' | '“' | '”' | '‘' | '’')
}

/// Parse one trigger token. Quotes, backticks and emphasis are stripped.
/// Only unquoted all-digit tokens become menu indices; `"404"` stays a keyword.
pub fn parse_trigger(raw: &str) -> Option<Trigger> {
    let quoted = raw.trim().trim_start_matches('*').starts_with(is_quote);
    let t = raw
        .trim()
        .trim_matches(|c: char| is_quote(c) || c == '*')
        .trim()
        .trim_end_matches(['.', ')'])
        .trim();
    if t.is_empty() {
        return None;
    }
    if !quoted && t.chars().all(|c| c.is_ascii_digit()) {
        return t.parse().ok().map(Trigger::MenuIndex);
    }
    Some(Trigger::Keyword(t.to_lowercase()))
}

/// Split a trigger cell on commas and the word "or".
pub fn parse_trigger_cell(cell: &str) -> Vec<Trigger> {
    let mut out: Vec<Trigger> = Vec::new();
    for piece in cell.split(',') {
        for token in or_split().split(piece) {
            if let Some(t) = parse_trigger(token) {
                if !out.contains(&t) {
                    out.push(t);
                }
            }
        }
    }
    out
}

fn looks_like_target(span: &str) -> bool {
    !span.is_empty()
        && !span.contains(char::is_whitespace)
        && !span.contains("://")
        && (span.contains('/') || span.ends_with(".md"))
}

/// Targets in one non-trigger cell: backtick spans when the cell has any, bare words otherwise.
fn cell_targets(cell: &str) -> Vec<&str> {
    let spans = backtick_spans(cell);
    if !spans.is_empty() {
        return spans.into_iter().filter(|s| looks_like_target(s)).collect();
    }
    cell.split(|c: char| c.is_whitespace() || c == ',')
        .map(|w| w.trim_matches(|c: char| matches!(c, ';' | ':' | '(' | ')' | '"' | '\'')))
        .map(|w| w.trim_end_matches('.'))
        .filter(|w| looks_like_target(w))
        .collect()
}

fn split_cells(line: &str) -> Vec<&str> {
    let t = line.trim();
    let t = t.strip_prefix('|').unwrap_or(t);
    let t = t.strip_suffix('|').unwrap_or(t);
    t.split('|').map(str::trim).collect()
}

fn is_separator_row(cells: &[&str]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|c| {
            let c = c.trim_matches(':');
            !c.is_empty() && c.chars().all(|ch| ch == '-')
        })
}

/// Parse every pipe table in `text` into routing rules, in document order.
/// Tables without a header separator row are not routing tables and are skipped.
pub fn parse_routing_table(text: &str) -> Vec<RoutingRule> {
    let mut rules = Vec::new();
    let mut table: Vec<(usize, &str)> = Vec::new();

    for (i, line) in text.lines().enumerate() {
        if line.trim_start().starts_with('|') {
            table.push((i + 1, line));
        } else if !table.is_empty() {
            rules.extend(rules_from_table(&table));
            table.clear();
        }
    }
    if !table.is_empty() {
        rules.extend(rules_from_table(&table));
    }
    rules
}

fn rules_from_table(lines: &[(usize, &str)]) -> Vec<RoutingRule> {
    let Some(sep) = lines
        .iter()
        .position(|(_, l)| is_separator_row(&split_cells(l)))
    else {
        return Vec::new();
    };

    let mut rules = Vec::new();
    for &(row, line) in &lines[sep + 1..] {
        let cells = split_cells(line);
        let Some((first, rest)) = cells.split_first() else {
            continue;
        };
        let triggers = parse_trigger_cell(first);
        let mut targets: Vec<String> = Vec::new();
        for cell in rest {
            for span in cell_targets(cell) {
                if !targets.iter().any(|t| t == span) {
                    targets.push(span.to_string());
                }
            }
        }
        if triggers.is_empty() || targets.is_empty() {
            log::debug!("routing row {} has no triggers or no targets; skipped", row);
            continue;
        }
        rules.push(RoutingRule {
            triggers,
            targets,
            row,
        });
    }
    rules
}
