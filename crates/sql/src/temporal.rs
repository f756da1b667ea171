//! Date-bound detection on source-table filters.
//!
//! Detection is a pattern check over the raw predicate text, not a parse: a
//! filter qualifies when it compares a temporal column of its source table
//! against an 8-14 digit literal from below (`>=`, `>`, `=`, `BETWEEN`), or
//! when it constrains `_PARTITIONTIME`/`_PARTITIONDATE` directly. Upper bounds
//! alone never qualify, and neither does a comparison under a boolean `NOT`.

use std::collections::HashMap;
use std::ops::Range;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use quarry_common::SourceTable;
use regex::Regex;

use crate::sql_generator::SqlGenError;

struct ColumnPatterns {
    compare: Regex,
    between: Regex,
    reversed: Regex,
}

static COLUMN_PATTERNS: Lazy<HashMap<&'static str, ColumnPatterns>> = Lazy::new(|| {
    SourceTable::ALL
        .iter()
        .flat_map(|t| t.temporal_columns().iter().copied())
        .map(|col| {
            let col_re = regex::escape(col);
            let patterns = ColumnPatterns {
                compare: Regex::new(&format!(
                    r"(?i)\b{col_re}\b\s*(?:>=|>|=)\s*'?(\d{{8,14}})'?"
                ))
                .unwrap(),
                between: Regex::new(&format!(
                    r"(?i)\b{col_re}\b\s+BETWEEN\s+'?(\d{{8,14}})'?\s+AND\s+'?\d{{8,14}}'?"
                ))
                .unwrap(),
                reversed: Regex::new(&format!(
                    r"(?i)'?(\d{{8,14}})'?\s*(?:<=|<|=)\s*\b{col_re}\b"
                ))
                .unwrap(),
            };
            (col, patterns)
        })
        .collect()
});

static PARTITION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b_PARTITION(?:TIME|DATE)\b\s*(?:>=|>|=|BETWEEN\b)").unwrap()
});

static PARTITION_MENTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b_PARTITION(?:TIME|DATE)\b").unwrap());

static OR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bOR\b").unwrap());

/// Prefix `NOT` in operator position. `x NOT LIKE`, `x NOT IN` and
/// `IS NOT NULL` follow an operand and do not match.
static NEGATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|\(|\b(?:AND|OR|NOT)\b)\s*NOT\b").unwrap());

/// Whether the filter carries a qualifying lower date bound.
pub fn has_date_bound(source_table: SourceTable, where_clause: &str) -> bool {
    let negated = negated_spans(where_clause);
    PARTITION_REGEX
        .find_iter(where_clause)
        .any(|m| !within(&negated, m.start()))
        || !literal_bounds(source_table, where_clause).is_empty()
}

/// Rejects missing or unbounded filters for materialization.
pub fn require_date_bound(source_table: SourceTable, where_clause: &str) -> Result<(), SqlGenError> {
    if where_clause.trim().is_empty() {
        return Err(SqlGenError::MissingFilter { source_table });
    }
    if !has_date_bound(source_table, where_clause) {
        return Err(SqlGenError::NoDateBound {
            source_table,
            where_clause: where_clause.to_string(),
        });
    }
    Ok(())
}

/// Earliest calendar date any temporal lower bound in the filter admits.
pub fn lower_bound(source_table: SourceTable, where_clause: &str) -> Option<NaiveDate> {
    literal_bounds(source_table, where_clause)
        .iter()
        .filter_map(|digits| NaiveDate::parse_from_str(&digits[..8], "%Y%m%d").ok())
        .min()
}

/// `_PARTITIONTIME` conjunct that lets the engine prune partitions before the
/// lower bound. Skipped when the filter already constrains partitions or
/// contains an `OR`, where a conjunct could exclude rows the caller asked for.
pub fn partition_filter(source_table: SourceTable, where_clause: &str) -> Option<String> {
    if PARTITION_MENTION_REGEX.is_match(where_clause) || OR_REGEX.is_match(where_clause) {
        return None;
    }
    lower_bound(source_table, where_clause)
        .map(|d| format!("_PARTITIONTIME >= TIMESTAMP('{}')", d.format("%Y-%m-%d")))
}

fn literal_bounds(source_table: SourceTable, where_clause: &str) -> Vec<String> {
    let negated = negated_spans(where_clause);
    let mut bounds = Vec::new();
    for col in source_table.temporal_columns() {
        let Some(patterns) = COLUMN_PATTERNS.get(col) else {
            continue;
        };
        for re in [&patterns.compare, &patterns.between, &patterns.reversed] {
            bounds.extend(
                re.captures_iter(where_clause)
                    .filter(|c| c.get(0).map_or(false, |m| !within(&negated, m.start())))
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().to_string()),
            );
        }
    }
    bounds
}

fn within(spans: &[Range<usize>], pos: usize) -> bool {
    spans.iter().any(|span| span.contains(&pos))
}

/// Byte ranges governed by a boolean `NOT`. A scope runs to the next
/// top-level `AND`/`OR`, or to the parenthesis that closes around it.
fn negated_spans(where_clause: &str) -> Vec<Range<usize>> {
    let bytes = where_clause.as_bytes();
    NEGATION_REGEX
        .find_iter(where_clause)
        .map(|m| m.end()..negation_end(bytes, m.end()))
        .collect()
}

fn negation_end(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'(' => depth += 1,
                b')' if depth == 0 => return i,
                b')' => depth -= 1,
                _ if depth == 0 && is_connective_at(bytes, i) => return i,
                _ => {}
            },
        }
        i += 1;
    }
    bytes.len()
}

fn is_connective_at(bytes: &[u8], i: usize) -> bool {
    let word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    if i > 0 && word(bytes[i - 1]) {
        return false;
    }
    ["AND", "OR"].iter().any(|kw| {
        let end = i + kw.len();
        end <= bytes.len()
            && bytes[i..end].eq_ignore_ascii_case(kw.as_bytes())
            && bytes.get(end).map_or(true, |b| !word(*b))
    })
}
