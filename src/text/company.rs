//! Company name canonicalization
//!
//! Procurement awards and registry filings spell the same company in
//! different ways ("Construcciones Pérez, S.L.", "CONSTRUCCIONES PEREZ SL").
//! The anomaly engine joins both sources on the key produced here, so every
//! rule is listed explicitly and tested:
//!
//! 1. fold accents and upper-case
//! 2. drop dots (`S.L.U.` becomes `SLU`)
//! 3. turn any other non-alphanumeric character into a space
//! 4. collapse whitespace
//! 5. strip trailing legal-form suffixes, repeatedly

use super::{collapse_whitespace, normalize};

/// Trailing legal-form suffixes, already in canonical (dot-free, upper) form
///
/// Multi-word forms come before their shorter tails.
const LEGAL_SUFFIXES: &[&str] = &[
    "SOCIEDAD LIMITADA LABORAL",
    "SOCIEDAD LIMITADA NUEVA EMPRESA",
    "SOCIEDAD LIMITADA PROFESIONAL",
    "SOCIEDAD LIMITADA UNIPERSONAL",
    "SOCIEDAD ANONIMA UNIPERSONAL",
    "SOCIEDAD ANONIMA LABORAL",
    "SOCIEDAD COOPERATIVA",
    "SOCIEDAD LIMITADA",
    "SOCIEDAD ANONIMA",
    "SOCIEDAD CIVIL",
    "EN LIQUIDACION",
    "S COOP",
    "S L U",
    "S A U",
    "S L L",
    "S L P",
    "S L",
    "S A",
    "S C",
    "SLNE",
    "SCOOP",
    "COOP",
    "SLU",
    "SAU",
    "SLL",
    "SLP",
    "SAL",
    "UTE",
    "SL",
    "SA",
    "SC",
    "CB",
];

/// Canonical join key for a company name
pub fn canonical_company_name(name: &str) -> String {
    let upper = normalize(name, false).to_uppercase();
    let without_dots: String = upper.chars().filter(|c| *c != '.').collect();
    let spaced: String = without_dots
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let mut key = collapse_whitespace(&spaced);

    loop {
        let stripped = LEGAL_SUFFIXES.iter().find_map(|suffix| {
            if key == *suffix {
                return None;
            }
            key.strip_suffix(suffix)
                .filter(|head| head.ends_with(' '))
                .map(|head| head.trim_end().to_string())
        });
        match stripped {
            Some(shorter) => key = shorter,
            None => break,
        }
    }

    key
}

/// Canonical key for a person's name (registry officers)
pub fn canonical_person_name(name: &str) -> String {
    let upper = normalize(name, false).to_uppercase();
    let spaced: String = upper
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&spaced)
}
