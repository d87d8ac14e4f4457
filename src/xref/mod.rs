//! Cross-reference engine
//!
//! Scores candidate relationships between two independently sourced record
//! lists. Five additive signals, each capped, summed and clamped to [0, 1]:
//! shared theme categories, same canonical department, shared title words,
//! procurement-adjacent type of the first record, and the first record's
//! identifier quoted in the second's text.
//!
//! The comparison is pairwise, so both lists are capped to their most recent
//! records before scoring.

mod signals;

pub use signals::*;

use crate::models::{DocumentRecord, DocumentType, SubsidyRecord};
use crate::text::fold_lower;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

/// A record that can take part in cross-referencing
pub trait Correlatable {
    /// Stable identifier, looked for verbatim in the other side's text
    fn reference(&self) -> &str;

    /// Free text used for themes, words and identifier search
    fn text(&self) -> &str;

    fn department(&self) -> Option<&str>;

    fn doc_type(&self) -> Option<DocumentType> {
        None
    }

    fn fecha(&self) -> Option<NaiveDate>;
}

impl Correlatable for DocumentRecord {
    fn reference(&self) -> &str {
        &self.id
    }

    fn text(&self) -> &str {
        &self.title
    }

    fn department(&self) -> Option<&str> {
        Some(&self.department)
    }

    fn doc_type(&self) -> Option<DocumentType> {
        Some(self.doc_type)
    }

    fn fecha(&self) -> Option<NaiveDate> {
        Some(self.fecha)
    }
}

impl Correlatable for SubsidyRecord {
    fn reference(&self) -> &str {
        &self.id
    }

    fn text(&self) -> &str {
        &self.description
    }

    fn department(&self) -> Option<&str> {
        self.department.as_deref().or(self.awarding_body.as_deref())
    }

    fn fecha(&self) -> Option<NaiveDate> {
        self.fecha
    }
}

/// Presentation tier of a cross-reference score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceBand {
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "baja")]
    Low,
    #[serde(rename = "muy baja")]
    VeryLow,
}

impl ConfidenceBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            ConfidenceBand::High
        } else if score >= 0.4 {
            ConfidenceBand::Medium
        } else if score >= 0.2 {
            ConfidenceBand::Low
        } else {
            ConfidenceBand::VeryLow
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "alta",
            ConfidenceBand::Medium => "media",
            ConfidenceBand::Low => "baja",
            ConfidenceBand::VeryLow => "muy baja",
        }
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A scored candidate relationship between two records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    #[serde(rename = "documento_a")]
    pub source: String,

    #[serde(rename = "documento_b")]
    pub target: String,

    #[serde(rename = "confianza")]
    pub confidence: f64,

    #[serde(rename = "categoria")]
    pub band: ConfidenceBand,

    /// Contributing keywords and signal markers
    #[serde(rename = "coincidencias")]
    pub matches: Vec<String>,
}

/// Per-record features computed once before the pairwise loop
struct Features<'a> {
    reference: &'a str,
    folded_text: String,
    themes: std::collections::BTreeSet<&'static str>,
    department: Option<&'static str>,
    words: std::collections::BTreeSet<String>,
    procurement_adjacent: bool,
}

impl<'a> Features<'a> {
    fn of<T: Correlatable + ?Sized>(record: &'a T) -> Self {
        let folded_text = fold_lower(record.text());
        Features {
            reference: record.reference(),
            themes: themes_of(&folded_text),
            department: record
                .department()
                .and_then(|d| department_key(&fold_lower(d))),
            words: words_of(&folded_text),
            procurement_adjacent: record
                .doc_type()
                .is_some_and(|t| PROCUREMENT_ADJACENT_TYPES.contains(&t)),
            folded_text,
        }
    }
}

/// Score one ordered pair; returns the clamped score and contributing matches
pub fn score_pair<A, B>(a: &A, b: &B) -> (f64, Vec<String>)
where
    A: Correlatable + ?Sized,
    B: Correlatable + ?Sized,
{
    score_features(&Features::of(a), &Features::of(b), b.text())
}

fn score_features(a: &Features<'_>, b: &Features<'_>, b_text: &str) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut matches = Vec::new();

    let shared_themes: Vec<&str> = a.themes.intersection(&b.themes).copied().collect();
    score += (shared_themes.len() as f64 * THEME_WEIGHT).min(THEME_CAP);
    matches.extend(shared_themes.iter().map(|t| format!("tema:{}", t)));

    if let (Some(da), Some(db)) = (a.department, b.department) {
        if da == db {
            score += DEPARTMENT_WEIGHT;
            matches.push(format!("departamento:{}", da));
        }
    }

    let shared_words: Vec<&String> = a.words.intersection(&b.words).collect();
    score += (shared_words.len() as f64 * LEXICAL_WEIGHT).min(LEXICAL_CAP);
    matches.extend(shared_words.iter().map(|w| w.to_string()));

    // type affinity only adds to an otherwise related pair
    if a.procurement_adjacent && score > 0.0 {
        score += TYPE_AFFINITY_WEIGHT;
        matches.push("tipo".to_string());
    }

    if !a.reference.is_empty()
        && (b_text.contains(a.reference) || b.folded_text.contains(&fold_lower(a.reference)))
    {
        score += IDENTIFIER_WEIGHT;
        matches.push(format!("referencia:{}", a.reference));
    }

    (score.clamp(0.0, 1.0), matches)
}

/// The `limit` most recent records, newest first
pub fn most_recent<T: Correlatable>(records: &[T], limit: usize) -> Vec<&T> {
    let mut sorted: Vec<&T> = records.iter().collect();
    sorted.sort_by(|a, b| b.fecha().cmp(&a.fecha()));
    sorted.truncate(limit);
    sorted
}

/// Options for a correlation run
#[derive(Debug, Clone, Copy)]
pub struct CorrelateOptions {
    pub min_confidence: f64,
    pub max_results: usize,
    pub max_inputs: usize,
}

/// Correlate two record lists
///
/// Pairs below `min_confidence` (and pairs scoring 0) are never emitted.
/// Output is sorted by score descending and truncated to `max_results`.
pub fn correlate<A, B>(left: &[A], right: &[B], options: CorrelateOptions) -> Vec<CrossReference>
where
    A: Correlatable,
    B: Correlatable,
{
    let left = most_recent(left, options.max_inputs);
    let right = most_recent(right, options.max_inputs);
    debug!(
        "Correlating {} x {} records (min confidence {})",
        left.len(),
        right.len(),
        options.min_confidence
    );

    let left_features: Vec<Features<'_>> = left.iter().map(|r| Features::of(*r)).collect();
    let right_features: Vec<Features<'_>> = right.iter().map(|r| Features::of(*r)).collect();

    let mut results = Vec::new();
    for a in &left_features {
        for (b, b_record) in right_features.iter().zip(&right) {
            if a.reference == b.reference {
                continue;
            }
            let (score, matches) = score_features(a, b, b_record.text());
            if score <= 0.0 || score < options.min_confidence {
                continue;
            }
            results.push(CrossReference {
                source: a.reference.to_string(),
                target: b.reference.to_string(),
                confidence: round_score(score),
                band: ConfidenceBand::from_score(score),
                matches,
            });
        }
    }

    results.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    results.truncate(options.max_results);
    results
}

fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str, department: &str, doc_type: DocumentType) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            fecha: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            title: title.to_string(),
            doc_type,
            department: department.to_string(),
            section: "III. Otras disposiciones".to_string(),
            section_code: "3".to_string(),
            heading: None,
            url_pdf: None,
            url_html: None,
            url_xml: None,
            procurement: None,
        }
    }

    fn options() -> CorrelateOptions {
        CorrelateOptions {
            min_confidence: 0.3,
            max_results: 50,
            max_inputs: 100,
        }
    }

    #[test]
    fn test_identical_title_and_department() {
        let title = "Plan nacional de mejora de regadíos y caminos rurales";
        let a = doc("BOE-A-2024-1", title, "MINISTERIO DE AGRICULTURA, PESCA Y ALIMENTACIÓN", DocumentType::Other);
        let b = doc("BOE-A-2024-2", title, "MINISTERIO DE AGRICULTURA, PESCA Y ALIMENTACIÓN", DocumentType::Other);
        let (score, matches) = score_pair(&a, &b);
        assert!(score >= 0.5, "score was {}", score);
        assert!(matches.contains(&"departamento:agricultura".to_string()));
    }

    #[test]
    fn test_unrelated_pair_scores_zero_and_is_excluded() {
        let a = doc("BOE-A-2024-1", "Nombramiento de embajador", "MINISTERIO DE DEFENSA", DocumentType::Resolution);
        let b = doc("BOE-B-2024-9", "Subasta de bienes muebles", "MINISTERIO DE CULTURA", DocumentType::Announcement);
        let (score, _) = score_pair(&a, &b);
        assert_eq!(score, 0.0);

        let results = correlate(&[a], &[b], CorrelateOptions { min_confidence: 0.0, ..options() });
        assert!(results.is_empty());
    }

    #[test]
    fn test_identifier_match_is_strongest() {
        let a = doc("BOE-A-2024-77", "Orden de bases reguladoras", "MINISTERIO DE HACIENDA", DocumentType::Order);
        let b = doc(
            "BOE-B-2024-5",
            "Anuncio conforme a la BOE-A-2024-77",
            "AYUNTAMIENTO DE SORIA",
            DocumentType::Announcement,
        );
        let (score, matches) = score_pair(&a, &b);
        assert!(score >= IDENTIFIER_WEIGHT);
        assert!(matches.iter().any(|m| m.starts_with("referencia:")));
    }

    #[test]
    fn test_results_sorted_and_capped() {
        let left = vec![doc("A", "Suministro de vacunas para hospitales", "MINISTERIO DE SANIDAD", DocumentType::Resolution)];
        let right = vec![
            doc("B", "Suministro de vacunas para hospitales", "MINISTERIO DE SANIDAD", DocumentType::Announcement),
            doc("C", "Suministro de material", "MINISTERIO DE SANIDAD", DocumentType::Announcement),
        ];
        let results = correlate(&left, &right, CorrelateOptions { max_results: 1, ..options() });
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].target, "B");
        assert!(results[0].confidence <= 1.0);
        assert_eq!(results[0].band, ConfidenceBand::High);
    }

    #[test]
    fn test_bands() {
        assert_eq!(ConfidenceBand::from_score(0.7), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.45), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.2), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::from_score(0.1), ConfidenceBand::VeryLow);
    }
}
