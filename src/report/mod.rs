//! Aggregations over stored records
//!
//! Groupings are keyed by display label and sorted by value descending,
//! ties broken by label so output is stable.

use crate::classify::classify_subsidy;
use crate::models::{DocumentRecord, SubsidyRecord};
use crate::text::canonical_company_name;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// One row of a grouping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    #[serde(rename = "nombre")]
    pub label: String,

    #[serde(rename = "total")]
    pub count: usize,

    /// Summed amount, when the grouping carries one
    #[serde(rename = "importe", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

/// Awarded amount per counterparty
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AwardeeTotal {
    #[serde(rename = "adjudicatario")]
    pub name: String,

    #[serde(rename = "clave")]
    pub key: String,

    #[serde(rename = "contratos")]
    pub contracts: usize,

    #[serde(rename = "importe")]
    pub amount: f64,
}

/// The `n` counterparties with the largest summed award amounts
///
/// Records are grouped by canonical company name; the displayed name is the
/// first spelling seen. Awards without an amount count as contracts but add
/// nothing to the sum.
pub fn top_awardees(records: &[DocumentRecord], n: usize) -> Vec<AwardeeTotal> {
    let mut totals: HashMap<String, AwardeeTotal> = HashMap::new();
    for record in records {
        let Some(name) = record.awardee() else {
            continue;
        };
        let key = canonical_company_name(name);
        if key.is_empty() {
            continue;
        }
        let total = totals.entry(key.clone()).or_insert_with(|| AwardeeTotal {
            name: name.to_string(),
            key,
            contracts: 0,
            amount: 0.0,
        });
        total.contracts += 1;
        total.amount += record.amount().unwrap_or(0.0);
    }

    let mut totals: Vec<AwardeeTotal> = totals.into_values().collect();
    totals.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    totals.truncate(n);
    totals
}

/// Count bulletin records per document type
pub fn count_by_type(records: &[DocumentRecord]) -> Vec<Bucket> {
    count_by(records.iter().map(|r| r.doc_type.label().to_string()))
}

/// Count bulletin records per section label
pub fn count_by_section(records: &[DocumentRecord]) -> Vec<Bucket> {
    count_by(records.iter().map(|r| r.section.clone()))
}

/// Awards and summed amount per geographic scope
///
/// An award with several scopes counts once in each.
pub fn awards_by_scope(records: &[DocumentRecord]) -> Vec<Bucket> {
    sum_by(records.iter().filter_map(|r| r.procurement.as_ref()).flat_map(|p| {
        p.scopes()
            .into_iter()
            .map(move |scope| (scope, p.amount))
    }))
}

/// Subsidy calls and summed budget per sector
pub fn subsidies_by_sector(subsidies: &[SubsidyRecord]) -> Vec<Bucket> {
    sum_by(subsidies.iter().map(|s| {
        let tagged = classify_subsidy(s);
        (tagged.sector.to_string(), s.budget)
    }))
}

/// Subsidy calls and summed budget per destination
pub fn subsidies_by_destination(subsidies: &[SubsidyRecord]) -> Vec<Bucket> {
    sum_by(subsidies.iter().map(|s| {
        let tagged = classify_subsidy(s);
        (tagged.destino.to_string(), s.budget)
    }))
}

fn count_by(labels: impl Iterator<Item = String>) -> Vec<Bucket> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut buckets: Vec<Bucket> = counts
        .into_iter()
        .map(|(label, count)| Bucket {
            label,
            count,
            amount: None,
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    buckets
}

fn sum_by(rows: impl Iterator<Item = (String, Option<f64>)>) -> Vec<Bucket> {
    let mut sums: HashMap<String, (usize, f64)> = HashMap::new();
    for (label, amount) in rows {
        let slot = sums.entry(label).or_default();
        slot.0 += 1;
        slot.1 += amount.unwrap_or(0.0);
    }
    let mut buckets: Vec<Bucket> = sums
        .into_iter()
        .map(|(label, (count, amount))| Bucket {
            label,
            count,
            amount: Some(amount),
        })
        .collect();
    buckets.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.label.cmp(&b.label))
    });
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdministrativeLevel, DocumentType, ProcurementEnrichment};
    use chrono::NaiveDate;

    fn record(id: &str, doc_type: DocumentType, awardee: Option<&str>, amount: Option<f64>) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            fecha: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            title: "Anuncio".to_string(),
            doc_type,
            department: "MINISTERIO DE DEFENSA".to_string(),
            section: "V. Anuncios".to_string(),
            section_code: "5A".to_string(),
            heading: None,
            url_pdf: None,
            url_html: None,
            url_xml: None,
            procurement: awardee.map(|name| ProcurementEnrichment {
                awardee: Some(name.to_string()),
                amount,
                ..Default::default()
            }),
        }
    }

    fn subsidy(id: &str, description: &str, budget: Option<f64>) -> SubsidyRecord {
        SubsidyRecord {
            id: id.to_string(),
            fecha: None,
            description: description.to_string(),
            level: AdministrativeLevel::Estado,
            awarding_body: None,
            department: None,
            mrr: false,
            budget,
        }
    }

    #[test]
    fn test_top_awardees_groups_spellings() {
        let records = vec![
            record("1", DocumentType::Announcement, Some("Acme, S.L."), Some(100.0)),
            record("2", DocumentType::Announcement, Some("ACME SL"), Some(50.0)),
            record("3", DocumentType::Announcement, Some("Beta SA"), Some(120.0)),
            record("4", DocumentType::Announcement, Some("Gamma SA"), None),
            record("5", DocumentType::Announcement, None, None),
        ];
        let top = top_awardees(&records, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, "ACME");
        assert_eq!(top[0].contracts, 2);
        assert_eq!(top[0].amount, 150.0);
        assert_eq!(top[1].key, "BETA");
    }

    #[test]
    fn test_awards_by_scope_splits_lists() {
        let mut a = record("1", DocumentType::Announcement, Some("Acme SL"), Some(100.0));
        if let Some(p) = a.procurement.as_mut() {
            p.geographic_scope = Some("Madrid, Toledo".to_string());
        }
        let mut b = record("2", DocumentType::Announcement, Some("Beta SA"), Some(40.0));
        if let Some(p) = b.procurement.as_mut() {
            p.geographic_scope = Some("Madrid".to_string());
        }
        let c = record("3", DocumentType::Announcement, None, None);

        let buckets = awards_by_scope(&[a, b, c]);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].label, "Madrid");
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].amount, Some(140.0));
        assert_eq!(buckets[1].label, "Toledo");
    }

    #[test]
    fn test_count_by_type_ties_by_name() {
        let records = vec![
            record("1", DocumentType::Order, None, None),
            record("2", DocumentType::Announcement, None, None),
            record("3", DocumentType::Order, None, None),
            record("4", DocumentType::Edict, None, None),
        ];
        let buckets = count_by_type(&records);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Orden", "Anuncio", "Edicto"]);
        assert_eq!(buckets[0].count, 2);
    }

    #[test]
    fn test_subsidies_by_destination() {
        let subsidies = vec![
            subsidy("1", "Ayuda humanitaria para refugiados en Siria", Some(1000.0)),
            subsidy("2", "Reconstrucción de escuelas en Siria", Some(500.0)),
            subsidy("3", "Becas de investigación", None),
        ];
        let buckets = subsidies_by_destination(&subsidies);
        assert_eq!(buckets[0].label, "Siria");
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].amount, Some(1500.0));
        assert_eq!(buckets.len(), 2);
    }
}
