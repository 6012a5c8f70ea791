//! Parsing of the numbered-list format requested by the continuation prompt.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static ITEM_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    // "1. text", "2) text", optionally bolded as "**1.** text"
    Regex::new(r"^\s*(?:\*\*)?(\d{1,2})[.)](?:\*\*)?\s+(.*)$").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub number: usize,
    pub text: String,
}

/// Extract the items of a numbered list. Lines before the first item are
/// ignored; unnumbered lines after an item are folded into it. Returns `None`
/// when the response contains no numbered item at all.
pub fn parse_numbered_list(response: &str) -> Option<Vec<Suggestion>> {
    let mut items: Vec<Suggestion> = Vec::new();

    for line in response.lines() {
        if let Some(caps) = ITEM_MARKER.captures(line) {
            let number = caps[1].parse().unwrap_or(items.len() + 1);
            items.push(Suggestion {
                number,
                text: clean(&caps[2]),
            });
        } else if let Some(last) = items.last_mut() {
            let extra = line.trim();
            if !extra.is_empty() {
                if !last.text.is_empty() {
                    last.text.push(' ');
                }
                last.text.push_str(extra);
            }
        }
    }

    items.retain(|s| !s.text.is_empty());
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// The first line of the first numbered item. Wrapped lines and any
/// commentary after the item are dropped.
pub fn first_item_line(response: &str) -> Option<String> {
    response
        .lines()
        .filter_map(|line| ITEM_MARKER.captures(line))
        .map(|caps| clean(&caps[2]))
        .find(|text| !text.is_empty())
}

/// Models often echo the "[...]" placeholder brackets or wrap items in quotes.
fn clean(raw: &str) -> String {
    let trimmed = raw.trim();
    let unbracketed = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    let unquoted = unbracketed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(unbracketed);
    unquoted.trim().to_string()
}
