// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tolerant parser for extraction-model output.
//!
//! The extraction model emits three XML-like sections: free-form memory
//! text in `<memories>`, pipe-delimited `name|type|summary` lines in
//! `<entities>`, and `source|relation|target|date?` lines in
//! `<relationships>`. Memory lines may carry a leading `[YYYY-MM-DD]`
//! event date.
//!
//! Parsing is total: malformed input yields best-effort partial results,
//! never an error.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static EVENT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{4}-\d{2}-\d{2})\]").expect("event date pattern")
});

/// Capture a leading `[YYYY-MM-DD]` prefix if it is a real calendar date.
fn leading_event_date(line: &str) -> Option<String> {
    let caps = EVENT_DATE.captures(line)?;
    let date = &caps[1];
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(date.to_string())
}

/// An entity observation from one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntity {
    pub name: String,
    pub entity_type: String,
    /// Remaining fields joined verbatim, pipes included.
    pub summary: String,
}

/// A relationship observation from one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRelationship {
    pub source: String,
    pub relation: String,
    pub target: String,
    pub date: Option<String>,
}

/// The structured content of one extraction response.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub memory_text: String,
    pub entities: Vec<ParsedEntity>,
    pub relationships: Vec<ParsedRelationship>,
    /// Memory-text line index -> event date for lines with a date prefix.
    pub event_dates: HashMap<usize, String>,
}

/// Parse an extraction response. Never fails; missing or malformed
/// sections yield empty results.
pub fn parse_extraction(raw: &str) -> Extraction {
    let memory_text = match section(raw, "memories") {
        Some(inner) => inner.trim().to_string(),
        // No explicit memories section: everything outside the tagged
        // regions is memory text.
        None => {
            let stripped = strip_section(raw, "entities");
            strip_section(&stripped, "relationships").trim().to_string()
        }
    };

    let entities = section(raw, "entities")
        .map(|body| parse_entity_lines(&body))
        .unwrap_or_default();
    let relationships = section(raw, "relationships")
        .map(|body| parse_relationship_lines(&body))
        .unwrap_or_default();

    let mut event_dates = HashMap::new();
    for (idx, line) in memory_text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(date) = leading_event_date(line) {
            event_dates.insert(idx, date);
        }
    }

    Extraction {
        memory_text,
        entities,
        relationships,
        event_dates,
    }
}

/// Earliest `[YYYY-MM-DD]` event date mentioned in a block of memory text.
///
/// ISO dates order lexicographically, so the minimum string is the
/// earliest date.
pub fn earliest_event_date(text: &str) -> Option<String> {
    text.lines().filter_map(leading_event_date).min()
}

/// Inner text of `<tag>...</tag>`; an unclosed tag runs to the end.
fn section(raw: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = raw.find(&open)? + open.len();
    match raw[start..].find(&close) {
        Some(end) => Some(raw[start..start + end].to_string()),
        None => Some(raw[start..].to_string()),
    }
}

/// Remove `<tag>...</tag>` (tags included) from the text.
fn strip_section(raw: &str, tag: &str) -> String {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let Some(start) = raw.find(&open) else {
        return raw.to_string();
    };
    match raw[start..].find(&close) {
        Some(rel_end) => {
            let end = start + rel_end + close.len();
            format!("{}{}", &raw[..start], &raw[end..])
        }
        None => raw[..start].to_string(),
    }
}

fn parse_entity_lines(body: &str) -> Vec<ParsedEntity> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || !line.contains('|') {
                return None;
            }
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() < 3 {
                return None;
            }
            let name = parts[0].trim();
            let entity_type = parts[1].trim();
            if name.is_empty() || entity_type.is_empty() || parts[2].trim().is_empty() {
                return None;
            }
            Some(ParsedEntity {
                name: name.to_string(),
                entity_type: entity_type.to_string(),
                summary: parts[2..].join("|").trim().to_string(),
            })
        })
        .collect()
}

fn parse_relationship_lines(body: &str) -> Vec<ParsedRelationship> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || !line.contains('|') {
                return None;
            }
            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() < 3 {
                return None;
            }
            let source = parts[0].trim();
            let relation = parts[1].trim();
            let target = parts[2].trim();
            if source.is_empty() || relation.is_empty() || target.is_empty() {
                return None;
            }
            let date = parts
                .get(3)
                .map(|d| d.trim())
                .filter(|d| !d.is_empty())
                .map(str::to_string);
            Some(ParsedRelationship {
                source: source.to_string(),
                relation: relation.to_string(),
                target: target.to_string(),
                date,
            })
        })
        .collect()
}
