//! Commercial registry free-text parsing
//!
//! Pipeline for one province's bulletin text:
//! 1. drop page furniture and province banners line by line
//! 2. reflow the remaining lines into one whitespace-collapsed string
//! 3. split into entries at `NNNN - ` boundaries
//! 4. split each entry into company name and act text at the first act marker
//! 5. detect act types
//! 6. extract officers per role label, attributed to the enclosing act section
//! 7. extract capital, address, purpose, sole shareholder and start of operations

use super::rules::{
    canonical_role, is_province_name, marker_section, ACT_MARKER_RE, ACT_TYPES,
    BOILERPLATE_RE, ENTRY_BOUNDARY_RE, FIELD_LABEL_RE, ROLE_LABEL_RE,
};
use super::{first_match, trim_field, FieldRule};
use crate::models::{ActSection, Person, RegistryEntry};
use crate::text::{collapse_whitespace, fold_accents, fold_lower, parse_amount, title_case};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Shortest accepted officer name, in characters
const MIN_NAME_CHARS: usize = 3;

static CAPITAL_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    let amount = r"(\d[\d.]*(?:,\d+)?)\s*(?:Euros|euros|EUR|€)";
    vec![
        FieldRule::capture("resulting_subscribed", &format!(r"(?i)Resultante Suscrito:\s*{amount}")),
        FieldRule::capture("capital", &format!(r"(?i)\bCapital:\s*{amount}")),
        FieldRule::capture("subscribed", &format!(r"(?i)\bSuscrito:\s*{amount}")),
    ]
});

static ADDRESS: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::bounded(
        "address",
        r"(?i)\bDomicilio:\s*",
        &[&FIELD_LABEL_RE, &ACT_MARKER_RE, &ROLE_LABEL_RE],
        300,
    )
});

static PURPOSE: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::bounded(
        "purpose",
        r"(?i)\bObjeto social:\s*",
        &[&FIELD_LABEL_RE, &ACT_MARKER_RE, &ROLE_LABEL_RE],
        1000,
    )
});

static SOLE_SHAREHOLDER: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::bounded(
        "sole_shareholder",
        r"(?i)\bSocio [uú]nico:\s*",
        &[&FIELD_LABEL_RE, &ACT_MARKER_RE, &ROLE_LABEL_RE],
        200,
    )
});

static OPERATIONS_START: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::capture(
        "operations_start",
        r"(?i)Comienzo de operaciones:\s*(\d{1,2}\.\d{1,2}\.\d{2,4})",
    )
});

/// Parse one province's registry bulletin text into per-company entries
///
/// Entries carry no date; callers stamp it with
/// [`RegistryEntry::stamp_date`]. Malformed text yields fewer entries, never
/// an error.
pub fn parse_registry_text(text: &str, province: &str) -> Vec<RegistryEntry> {
    let body = reflow(text, province);

    let starts: Vec<(usize, &str)> = ENTRY_BOUNDARY_RE
        .captures_iter(&body)
        .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.as_str())))
        .collect();

    let mut entries = Vec::with_capacity(starts.len());
    for (i, (start, numero)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map(|(s, _)| *s).unwrap_or(body.len());
        let segment = body[*start..end].trim();
        let rest = segment
            .strip_prefix(numero)
            .map(|r| r.trim_start_matches([' ', '-']))
            .unwrap_or(segment);

        match parse_entry(numero, rest, province) {
            Some(entry) => entries.push(entry),
            None => debug!("Skipping registry entry {} without a company name", numero),
        }
    }

    debug!("Parsed {} registry entries for {}", entries.len(), province);
    entries
}

/// Steps 1 and 2: filter lines and join the rest into a single string
fn reflow(text: &str, province: &str) -> String {
    let province_key = fold_accents(province).to_uppercase();
    let kept: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !BOILERPLATE_RE.iter().any(|re| re.is_match(line)))
        .filter(|line| !is_province_banner(line, &province_key))
        .collect();
    collapse_whitespace(&kept.join(" "))
}

/// An all-caps, digit-free line naming a province (or the requested one)
fn is_province_banner(line: &str, province_key: &str) -> bool {
    let has_letters = line.chars().any(char::is_alphabetic);
    let all_caps = line
        .chars()
        .filter(|c| c.is_alphabetic())
        .all(char::is_uppercase);
    if !has_letters || !all_caps || line.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    let folded = fold_accents(line).to_uppercase();
    folded == province_key || is_province_name(&folded)
}

/// Steps 4 to 7 for one entry
fn parse_entry(numero: &str, rest: &str, province: &str) -> Option<RegistryEntry> {
    let (company, act_text) = match ACT_MARKER_RE.find(rest) {
        Some(m) => (&rest[..m.start()], &rest[m.start()..]),
        None => (rest, ""),
    };
    let company = trim_field(company);
    if company.is_empty() {
        return None;
    }

    let mut entry = RegistryEntry::new(
        numero.to_string(),
        company.to_string(),
        province.to_string(),
    );

    let folded = fold_lower(act_text);
    entry.acts = ACT_TYPES
        .iter()
        .filter(|(phrase, _)| folded.contains(phrase))
        .map(|(_, act)| *act)
        .collect();

    entry.persons = extract_persons(act_text);

    entry.capital = first_match(&CAPITAL_RULES, act_text).and_then(|(_, raw)| parse_amount(raw));
    entry.address = ADDRESS.extract(act_text).map(str::to_string);
    entry.purpose = PURPOSE.extract(act_text).map(str::to_string);
    entry.sole_shareholder = SOLE_SHAREHOLDER.extract(act_text).map(title_case);
    entry.operations_start = OPERATIONS_START.extract(act_text).map(str::to_string);

    Some(entry)
}

/// Extract officers from an entry's act text
///
/// Each role label's name list runs until the next role label, act marker or
/// field label. The section is that of the nearest act marker before the
/// label, or [`ActSection::General`] when there is none.
pub fn extract_persons(act_text: &str) -> Vec<Person> {
    let labels: Vec<(usize, usize, &'static str)> = ROLE_LABEL_RE
        .captures_iter(act_text)
        .filter_map(|caps| {
            let label = caps.name("label")?;
            let role = canonical_role(label.as_str())?;
            let full_end = caps.get(0).map(|m| m.end())?;
            Some((label.start(), full_end, role))
        })
        .collect();

    let markers: Vec<(usize, ActSection)> = ACT_MARKER_RE
        .find_iter(act_text)
        .map(|m| (m.start(), marker_section(m.as_str())))
        .collect();

    let field_starts: Vec<usize> = FIELD_LABEL_RE
        .find_iter(act_text)
        .map(|m| m.start())
        .collect();

    let mut boundaries: Vec<usize> = labels
        .iter()
        .map(|(start, _, _)| *start)
        .chain(markers.iter().map(|(start, _)| *start))
        .chain(field_starts)
        .collect();
    boundaries.sort_unstable();

    let mut seen = HashSet::new();
    let mut persons = Vec::new();

    for (label_start, list_start, role) in labels {
        let list_end = boundaries
            .iter()
            .copied()
            .find(|b| *b >= list_start)
            .unwrap_or(act_text.len());
        let section = markers
            .iter()
            .rev()
            .find(|(start, _)| *start < label_start)
            .map(|(_, section)| *section)
            .unwrap_or(ActSection::General);

        for raw in act_text[list_start..list_end].split(';') {
            let Some(name) = clean_name(raw) else {
                continue;
            };
            if seen.insert((name.clone(), role, section)) {
                persons.push(Person {
                    name,
                    role: role.to_string(),
                    section,
                    fecha: String::new(),
                });
            }
        }
    }

    persons
}

/// Trim a raw name and reject noise
fn clean_name(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '-') || c.is_whitespace());
    let significant: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if significant.chars().count() < MIN_NAME_CHARS
        || significant.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    Some(title_case(trimmed))
}
