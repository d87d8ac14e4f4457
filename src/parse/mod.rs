//! Source parsing and field extraction
//!
//! This module handles:
//! - Daily bulletin summaries (flat document records)
//! - Bulletin detail pages (procurement award fields)
//! - Commercial registry free text (per-company entries and officers)
//! - Subsidy database search pages and budgets
//!
//! Field extraction is driven by ordered tables of [`FieldRule`]s. The first
//! rule that matches wins, so table order encodes business priority.

mod bulletin;
mod detail;
mod registry;
pub mod rules;
mod subsidy;

pub use bulletin::*;
pub use detail::*;
pub use registry::*;
pub use subsidy::*;

use regex::Regex;

/// Compile a pattern that is part of a static rule table
pub(crate) fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static extraction pattern must compile")
}

/// A named extraction rule
///
/// Two shapes:
/// - **capture**: the pattern has a capture group; the value is group 1.
/// - **bounded**: the pattern is an anchor; the value runs from the end of the
///   anchor to the earliest terminator match (or `max_chars`), emulating a
///   lookahead that stops before the next field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: &'static str,
    pattern: Regex,
    terminators: Vec<Regex>,
    max_chars: usize,
}

impl FieldRule {
    /// Rule whose value is the first capture group of `pattern`
    pub fn capture(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: rx(pattern),
            terminators: Vec::new(),
            max_chars: usize::MAX,
        }
    }

    /// Rule whose value starts after `anchor` and stops at the nearest terminator
    pub fn bounded(
        name: &'static str,
        anchor: &str,
        terminators: &[&Regex],
        max_chars: usize,
    ) -> Self {
        Self {
            name,
            pattern: rx(anchor),
            terminators: terminators.iter().map(|r| (*r).clone()).collect(),
            max_chars,
        }
    }

    /// Apply the rule; `None` is an extraction miss, never an error
    pub fn extract<'t>(&self, text: &'t str) -> Option<&'t str> {
        let raw = if self.terminators.is_empty() {
            self.pattern.captures(text)?.get(1)?.as_str()
        } else {
            let anchor = self.pattern.find(text)?;
            let rest = &text[anchor.end()..];
            let end = self
                .terminators
                .iter()
                .filter_map(|t| t.find(rest).map(|m| m.start()))
                .min()
                .unwrap_or(rest.len());
            truncate_chars(&rest[..end], self.max_chars)
        };

        let value = trim_field(raw);
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Run an ordered cascade; only the first matching rule is used
pub fn first_match<'t>(rules: &[FieldRule], text: &'t str) -> Option<(&'static str, &'t str)> {
    rules
        .iter()
        .find_map(|rule| rule.extract(text).map(|value| (rule.name, value)))
}

/// Strip surrounding whitespace and trailing separator punctuation
pub fn trim_field(value: &str) -> &str {
    value
        .trim()
        .trim_end_matches(['.', ',', ';', ':'])
        .trim()
}

/// Cut `text` after at most `max_chars` characters
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_rule() {
        let rule = FieldRule::capture("n", r"Total:\s*(\d+)");
        assert_eq!(rule.extract("Total: 42 units"), Some("42"));
        assert_eq!(rule.extract("nothing here"), None);
    }

    #[test]
    fn test_bounded_rule_stops_at_terminator() {
        let next_field = rx(r"\s\d\.\d\)");
        let rule = FieldRule::bounded("name", r"1\.1\)\s*Name:\s*", &[&next_field], 200);
        let text = "1.1) Name: ACME SL. 1.2) Id: B123";
        assert_eq!(rule.extract(text), Some("ACME SL"));
    }

    #[test]
    fn test_bounded_rule_respects_max_chars() {
        let never = rx(r"\x00");
        let rule = FieldRule::bounded("long", r"Start:\s*", &[&never], 5);
        assert_eq!(rule.extract("Start: abcdefghij"), Some("abcde"));
    }

    #[test]
    fn test_first_match_uses_table_order() {
        let rules = vec![
            FieldRule::capture("primary", r"A=(\d+)"),
            FieldRule::capture("fallback", r"B=(\d+)"),
        ];
        assert_eq!(first_match(&rules, "B=2 A=1"), Some(("primary", "1")));
        assert_eq!(first_match(&rules, "B=2"), Some(("fallback", "2")));
        assert_eq!(first_match(&rules, "C=3"), None);
    }
}
