//! Cross-reference command implementation

use super::DateRange;
use crate::config::Config;
use crate::error::Result;
use crate::meta::MetaDb;
use crate::xref::{correlate, CorrelateOptions, CrossReference};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Which stored records make up one side of a correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSet {
    /// Official bulletin documents
    Bulletin,
    /// Subsidy calls
    Subsidies,
}

/// Options for cross-referencing
#[derive(Debug, Clone)]
pub struct XrefOptions {
    pub left: RecordSet,
    pub right: RecordSet,
    pub range: DateRange,
    pub min_confidence: Option<f64>,
    pub max_results: Option<usize>,
}

/// Cross-reference results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrefResults {
    pub left: RecordSet,
    pub right: RecordSet,
    pub left_count: usize,
    pub right_count: usize,
    pub matches: Vec<CrossReference>,
}

/// Correlate two stored record sets over a date range
pub async fn cmd_xref(config: &Config, db: &MetaDb, options: XrefOptions) -> Result<XrefResults> {
    let range = options.range;
    let correlate_options = CorrelateOptions {
        min_confidence: options.min_confidence.unwrap_or(config.xref.min_confidence),
        max_results: options.max_results.unwrap_or(config.xref.max_results),
        max_inputs: config.xref.max_inputs,
    };

    let needs_documents = options.left == RecordSet::Bulletin || options.right == RecordSet::Bulletin;
    let needs_subsidies = options.left == RecordSet::Subsidies || options.right == RecordSet::Subsidies;

    let documents = if needs_documents {
        db.documents_between(range.from, range.to).await?
    } else {
        Vec::new()
    };
    let subsidies = if needs_subsidies {
        db.subsidies_between(range.from, range.to).await?
    } else {
        Vec::new()
    };

    info!(
        "Cross-referencing {:?} x {:?} for {}",
        options.left, options.right, range
    );

    let (left_count, right_count, matches) = match (options.left, options.right) {
        (RecordSet::Bulletin, RecordSet::Bulletin) => (
            documents.len(),
            documents.len(),
            correlate(&documents, &documents, correlate_options),
        ),
        (RecordSet::Bulletin, RecordSet::Subsidies) => (
            documents.len(),
            subsidies.len(),
            correlate(&documents, &subsidies, correlate_options),
        ),
        (RecordSet::Subsidies, RecordSet::Bulletin) => (
            subsidies.len(),
            documents.len(),
            correlate(&subsidies, &documents, correlate_options),
        ),
        (RecordSet::Subsidies, RecordSet::Subsidies) => (
            subsidies.len(),
            subsidies.len(),
            correlate(&subsidies, &subsidies, correlate_options),
        ),
    };

    Ok(XrefResults {
        left: options.left,
        right: options.right,
        left_count,
        right_count,
        matches,
    })
}

/// Print cross-reference results to console
pub fn print_xref_results(results: &XrefResults) {
    println!(
        "\n🔗 {} candidate links ({} x {} records)\n",
        results.matches.len(),
        results.left_count,
        results.right_count
    );

    for m in &results.matches {
        println!("• {} → {}  {:.3} [{}]", m.source, m.target, m.confidence, m.band);
        if !m.matches.is_empty() {
            println!("  {}", m.matches.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdministrativeLevel, DocumentRecord, DocumentType, SubsidyRecord};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn test_bulletin_against_subsidies() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.db_file = tmp.path().join("test.db");
        let db = MetaDb::open(&config).await.unwrap();

        db.upsert_documents(&[DocumentRecord {
            id: "BOE-A-2024-10".to_string(),
            fecha: day(),
            title: "Orden por la que se convocan ayudas para la digitalización de pymes".to_string(),
            doc_type: DocumentType::Order,
            department: "MINISTERIO PARA LA TRANSFORMACIÓN DIGITAL".to_string(),
            section: "III. Otras disposiciones".to_string(),
            section_code: "3".to_string(),
            heading: None,
            url_pdf: None,
            url_html: None,
            url_xml: None,
            procurement: None,
        }])
        .await
        .unwrap();
        db.upsert_subsidies(&[SubsidyRecord {
            id: "750001".to_string(),
            fecha: Some(day()),
            description: "Ayudas para la digitalización de pymes (BOE-A-2024-10)".to_string(),
            level: AdministrativeLevel::Estado,
            awarding_body: None,
            department: Some("MINISTERIO PARA LA TRANSFORMACIÓN DIGITAL".to_string()),
            mrr: true,
            budget: None,
        }])
        .await
        .unwrap();

        let results = cmd_xref(
            &config,
            &db,
            XrefOptions {
                left: RecordSet::Bulletin,
                right: RecordSet::Subsidies,
                range: DateRange::single(day()),
                min_confidence: None,
                max_results: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(results.left_count, 1);
        assert_eq!(results.right_count, 1);
        assert_eq!(results.matches.len(), 1);
        let link = &results.matches[0];
        assert_eq!(link.source, "BOE-A-2024-10");
        assert!(link.matches.iter().any(|m| m.starts_with("referencia:")));
    }
}
