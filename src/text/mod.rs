//! Text normalization shared by every matcher
//!
//! This module provides:
//! - Accent folding with a fixed substitution table
//! - Case folding for keyword matching
//! - Locale-aware amount parsing
//! - Company name canonicalization for registry joins

mod amount;
mod company;

pub use amount::*;
pub use company::*;

/// Map a single character to its unaccented replacement, if it has one
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ā' => "a",
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' | 'Ā' => "A",
        'é' | 'è' | 'ê' | 'ë' | 'ē' => "e",
        'É' | 'È' | 'Ê' | 'Ë' | 'Ē' => "E",
        'í' | 'ì' | 'î' | 'ï' | 'ī' => "i",
        'Í' | 'Ì' | 'Î' | 'Ï' | 'Ī' => "I",
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' | 'ō' => "o",
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' | 'Ø' | 'Ō' => "O",
        'ú' | 'ù' | 'û' | 'ü' | 'ū' => "u",
        'Ú' | 'Ù' | 'Û' | 'Ü' | 'Ū' => "U",
        'ñ' => "n",
        'Ñ' => "N",
        'ç' => "c",
        'Ç' => "C",
        'ý' | 'ÿ' => "y",
        'Ý' | 'Ÿ' => "Y",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        _ => return None,
    };
    Some(folded)
}

/// Replace diacritics with their base Latin letter
///
/// Covers Spanish, French, German and Portuguese accented letters. Characters
/// outside the table pass through untouched, so folding is idempotent.
pub fn fold_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match fold_char(c) {
            Some(folded) => out.push_str(folded),
            None => out.push(c),
        }
    }
    out
}

/// Fold accents and optionally lower-case
///
/// Every keyword and substring match in the crate runs on the output of this
/// function so that accent-insensitive matching behaves the same everywhere.
pub fn normalize(text: &str, lowercase: bool) -> String {
    let folded = fold_accents(text);
    if lowercase {
        folded.to_lowercase()
    } else {
        folded
    }
}

/// Accent-folded, lower-cased form used by the keyword matchers
pub fn fold_lower(text: &str) -> String {
    normalize(text, true)
}

/// Collapse every run of whitespace into a single space and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-case a name: first letter of every word upper-case, the rest lower
///
/// A "word" starts after any non-alphanumeric character, so
/// `GARCIA-LOPEZ` becomes `Garcia-Lopez` and `O'NEILL` becomes `O'Neill`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Keywords up to this many characters must match on word boundaries
pub const SHORT_KEYWORD_MAX_CHARS: usize = 6;

/// Check whether `needle` occurs in `haystack` delimited by non-alphanumerics
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[start + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Match an already-folded keyword against already-folded text
///
/// Short keywords (≤ [`SHORT_KEYWORD_MAX_CHARS`]) need word boundaries so that
/// e.g. `mali` does not fire inside `normalizacion`; longer ones are plain
/// substring matches.
pub fn matches_keyword(folded_text: &str, folded_keyword: &str) -> bool {
    if folded_keyword.chars().count() <= SHORT_KEYWORD_MAX_CHARS {
        contains_word(folded_text, folded_keyword)
    } else {
        folded_text.contains(folded_keyword)
    }
}
