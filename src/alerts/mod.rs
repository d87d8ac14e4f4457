//! Anomaly / red-flag engine
//!
//! Joins enriched procurement awards against registry histories by canonical
//! company name and evaluates six independent rules. The engine is pure: the
//! caller plans registry reads with [`plan_registry_reads`], feeds each day
//! partition once through a [`ProfileCollector`] and passes the resulting
//! profiles in.

mod profile;

pub use profile::*;

use crate::config::AlertsConfig;
use crate::models::{ActSection, DocumentRecord};
use crate::text::{canonical_company_name, canonical_person_name, fold_lower};
use chrono::{Months, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// Alert rule that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CapitalMismatch,
    RecentIncorporation,
    PostAwardDissolution,
    SharedAdministrator,
    OfficerChangeNearAward,
    LowTransparencyProcedure,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::CapitalMismatch => "capital_mismatch",
            AlertKind::RecentIncorporation => "recent_incorporation",
            AlertKind::PostAwardDissolution => "post_award_dissolution",
            AlertKind::SharedAdministrator => "shared_administrator",
            AlertKind::OfficerChangeNearAward => "officer_change_near_award",
            AlertKind::LowTransparencyProcedure => "low_transparency_procedure",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity tier; `High` sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

/// Rule-specific payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlertDetail {
    CapitalMismatch {
        capital: f64,
        ratio: f64,
    },
    RecentIncorporation {
        fecha_constitucion: NaiveDate,
        dias: i64,
    },
    PostAwardDissolution {
        fecha_disolucion: NaiveDate,
        dias: i64,
    },
    SharedAdministrator {
        persona: String,
        empresas: Vec<String>,
    },
    OfficerChange {
        persona: String,
        cargo: String,
        evento: ActSection,
        fecha_evento: NaiveDate,
        dias: i64,
    },
    LowTransparency {
        procedimiento: String,
    },
}

/// A typed red flag with references to the records that raised it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "tipo")]
    pub kind: AlertKind,

    #[serde(rename = "severidad")]
    pub severity: Severity,

    /// Company name; several names joined for shared administrators
    #[serde(rename = "empresa")]
    pub company: String,

    #[serde(rename = "importe")]
    pub amount: Option<f64>,

    /// Procurement record identifiers
    #[serde(rename = "documentos")]
    pub documents: Vec<String>,

    /// Registry references (`fecha#provincia#numero`)
    #[serde(rename = "registros")]
    pub registry_refs: Vec<String>,

    #[serde(rename = "detalle")]
    pub detail: AlertDetail,
}

/// An enriched award with a counterparty
struct Award<'a> {
    record: &'a DocumentRecord,
    key: String,
    name: &'a str,
    amount: Option<f64>,
}

impl<'a> Award<'a> {
    fn from_record(record: &'a DocumentRecord) -> Option<Self> {
        let name = record.awardee()?;
        let key = canonical_company_name(name);
        if key.is_empty() {
            return None;
        }
        Some(Award {
            record,
            key,
            name,
            amount: record.amount(),
        })
    }

    fn date(&self) -> NaiveDate {
        self.record.fecha
    }
}

/// Canonical keys of the awarded counterparties in `records` that can have
/// a registry history
///
/// Counterparties whose tax id marks them as a non-mercantile entity (public
/// bodies, associations, individuals) are left out; unknown kinds are kept.
pub fn awarded_company_keys(records: &[DocumentRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter(|r| {
            r.procurement
                .as_ref()
                .and_then(|p| p.awardee_kind)
                .map_or(true, |kind| kind.is_mercantile())
        })
        .filter_map(Award::from_record)
        .map(|a| a.key)
        .collect()
}

/// Evaluate all rules and return alerts sorted by severity, then amount
pub fn detect_alerts(
    records: &[DocumentRecord],
    profiles: &HashMap<String, CompanyProfile>,
    config: &AlertsConfig,
) -> Vec<Alert> {
    let awards: Vec<Award<'_>> = records.iter().filter_map(Award::from_record).collect();
    debug!(
        "Evaluating {} awards against {} company profiles",
        awards.len(),
        profiles.len()
    );

    let mut alerts = Vec::new();
    for award in &awards {
        let Some(profile) = profiles.get(&award.key) else {
            continue;
        };
        alerts.extend(capital_mismatch(award, profile, config));
        alerts.extend(recent_incorporation(award, profile, config));
        alerts.extend(post_award_dissolution(award, profile));
        alerts.extend(officer_changes(award, profile, config));
    }
    alerts.extend(shared_administrators(&awards, profiles, config));
    alerts.extend(
        records
            .iter()
            .filter_map(|r| low_transparency(r, config)),
    );

    sort_alerts(&mut alerts);
    alerts
}

/// Severity first, then amount descending (unknown amounts last)
pub fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        a.severity.cmp(&b.severity).then_with(|| {
            let a_amount = a.amount.unwrap_or(f64::NEG_INFINITY);
            let b_amount = b.amount.unwrap_or(f64::NEG_INFINITY);
            b_amount.partial_cmp(&a_amount).unwrap_or(Ordering::Equal)
        })
    });
}

fn capital_mismatch(award: &Award<'_>, profile: &CompanyProfile, config: &AlertsConfig) -> Option<Alert> {
    let amount = award.amount?;
    let capital = profile.capital_at(award.date())?;
    if amount <= config.contract_threshold || capital >= config.capital_threshold || capital <= 0.0 {
        return None;
    }
    let ratio = ((amount / capital) * 100.0).round() / 100.0;
    Some(Alert {
        kind: AlertKind::CapitalMismatch,
        severity: Severity::High,
        company: award.name.to_string(),
        amount: Some(amount),
        documents: vec![award.record.id.clone()],
        registry_refs: profile.capital_reference(award.date()).into_iter().collect(),
        detail: AlertDetail::CapitalMismatch { capital, ratio },
    })
}

fn recent_incorporation(award: &Award<'_>, profile: &CompanyProfile, config: &AlertsConfig) -> Option<Alert> {
    let incorporated = profile.incorporated?;
    let window_start = award
        .date()
        .checked_sub_months(Months::new(config.incorporation_window_months))?;
    if incorporated >= award.date() || incorporated < window_start {
        return None;
    }
    let prefix = incorporated.format("%Y-%m-%d").to_string();
    Some(Alert {
        kind: AlertKind::RecentIncorporation,
        severity: Severity::Medium,
        company: award.name.to_string(),
        amount: award.amount,
        documents: vec![award.record.id.clone()],
        registry_refs: profile
            .references
            .iter()
            .filter(|r| r.starts_with(&prefix))
            .cloned()
            .collect(),
        detail: AlertDetail::RecentIncorporation {
            fecha_constitucion: incorporated,
            dias: (award.date() - incorporated).num_days(),
        },
    })
}

fn post_award_dissolution(award: &Award<'_>, profile: &CompanyProfile) -> Option<Alert> {
    let (dissolved, reference) = profile
        .dissolutions
        .iter()
        .find(|(fecha, _)| *fecha >= award.date())?;
    Some(Alert {
        kind: AlertKind::PostAwardDissolution,
        severity: Severity::High,
        company: award.name.to_string(),
        amount: award.amount,
        documents: vec![award.record.id.clone()],
        registry_refs: vec![reference.clone()],
        detail: AlertDetail::PostAwardDissolution {
            fecha_disolucion: *dissolved,
            dias: (*dissolved - award.date()).num_days(),
        },
    })
}

fn officer_changes(award: &Award<'_>, profile: &CompanyProfile, config: &AlertsConfig) -> Vec<Alert> {
    profile
        .officer_events
        .iter()
        .filter_map(|event| {
            let dias = (event.fecha - award.date()).num_days();
            if dias.abs() > config.officer_window_days {
                return None;
            }
            Some(Alert {
                kind: AlertKind::OfficerChangeNearAward,
                severity: Severity::Medium,
                company: award.name.to_string(),
                amount: award.amount,
                documents: vec![award.record.id.clone()],
                registry_refs: vec![event.reference.clone()],
                detail: AlertDetail::OfficerChange {
                    persona: event.person.clone(),
                    cargo: event.role.clone(),
                    evento: event.section,
                    fecha_evento: event.fecha,
                    dias,
                },
            })
        })
        .collect()
}

fn shared_administrators(
    awards: &[Award<'_>],
    profiles: &HashMap<String, CompanyProfile>,
    config: &AlertsConfig,
) -> Vec<Alert> {
    // person -> awarded company keys
    let mut by_person: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let awarded: BTreeSet<&str> = awards.iter().map(|a| a.key.as_str()).collect();
    for &key in &awarded {
        let Some(profile) = profiles.get(key) else {
            continue;
        };
        for officer in &profile.officers {
            by_person.entry(officer.as_str()).or_default().insert(key);
        }
    }

    let mut alerts = Vec::new();
    for (person, companies) in by_person {
        if companies.len() < config.shared_admin_min_companies {
            continue;
        }
        let involved: Vec<&Award<'_>> = awards
            .iter()
            .filter(|a| companies.contains(a.key.as_str()))
            .collect();
        let total: f64 = involved.iter().filter_map(|a| a.amount).sum();
        let names: Vec<String> = companies
            .iter()
            .filter_map(|k| profiles.get(*k).map(|p| p.name.clone()))
            .collect();
        let registry_refs = companies
            .iter()
            .filter_map(|k| profiles.get(*k))
            .flat_map(|p| p.references.iter().cloned())
            .collect();

        alerts.push(Alert {
            kind: AlertKind::SharedAdministrator,
            severity: if companies.len() >= config.shared_admin_high_companies {
                Severity::High
            } else {
                Severity::Medium
            },
            company: names.join(", "),
            amount: (total > 0.0).then_some(total),
            documents: involved.iter().map(|a| a.record.id.clone()).collect(),
            registry_refs,
            detail: AlertDetail::SharedAdministrator {
                persona: display_person(person, profiles, &companies),
                empresas: names,
            },
        });
    }
    alerts
}

/// Published spelling of a canonical officer name
fn display_person(
    canonical: &str,
    profiles: &HashMap<String, CompanyProfile>,
    companies: &BTreeSet<&str>,
) -> String {
    companies
        .iter()
        .filter_map(|k| profiles.get(*k))
        .flat_map(|p| p.officer_events.iter())
        .map(|e| e.person.as_str())
        .find(|name| canonical_person_name(name) == canonical)
        .unwrap_or(canonical)
        .to_string()
}

fn low_transparency(record: &DocumentRecord, config: &AlertsConfig) -> Option<Alert> {
    let procedure = record.procurement.as_ref()?.procedure.as_deref()?;
    let folded = fold_lower(procedure);
    if !config
        .low_transparency_phrases
        .iter()
        .any(|phrase| folded.contains(fold_lower(phrase).as_str()))
    {
        return None;
    }
    Some(Alert {
        kind: AlertKind::LowTransparencyProcedure,
        severity: Severity::Medium,
        company: record.awardee().unwrap_or_default().to_string(),
        amount: record.amount(),
        documents: vec![record.id.clone()],
        registry_refs: Vec::new(),
        detail: AlertDetail::LowTransparency {
            procedimiento: procedure.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActType, DocumentType, EntityKind, Person, ProcurementEnrichment, RegistryEntry};

    fn award(id: &str, fecha: &str, awardee: &str, amount: f64) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            fecha: NaiveDate::parse_from_str(fecha, "%Y-%m-%d").unwrap(),
            title: "Anuncio de formalización".to_string(),
            doc_type: DocumentType::Announcement,
            department: "MINISTERIO DE DEFENSA".to_string(),
            section: "V. Anuncios".to_string(),
            section_code: "5A".to_string(),
            heading: None,
            url_pdf: None,
            url_html: None,
            url_xml: None,
            procurement: Some(ProcurementEnrichment {
                amount: Some(amount),
                awardee: Some(awardee.to_string()),
                procedure: Some("Abierto".to_string()),
                ..Default::default()
            }),
        }
    }

    fn filing(company: &str, fecha: &str, numero: &str, acts: &[ActType]) -> RegistryEntry {
        let mut entry = RegistryEntry::new(numero.to_string(), company.to_string(), "MADRID".to_string());
        entry.acts = acts.iter().copied().collect();
        entry.stamp_date(fecha);
        entry
    }

    fn officer(name: &str, section: ActSection) -> Person {
        Person {
            name: name.to_string(),
            role: "Administrador único".to_string(),
            section,
            fecha: String::new(),
        }
    }

    fn profiles(entries: Vec<RegistryEntry>) -> HashMap<String, CompanyProfile> {
        let mut grouped: HashMap<String, Vec<RegistryEntry>> = HashMap::new();
        for entry in entries {
            grouped.entry(entry.company_key()).or_default().push(entry);
        }
        grouped
            .into_iter()
            .map(|(k, v)| {
                let p = CompanyProfile::from_entries(&k, &v);
                (k, p)
            })
            .collect()
    }

    fn of_kind(alerts: &[Alert], kind: AlertKind) -> Vec<&Alert> {
        alerts.iter().filter(|a| a.kind == kind).collect()
    }

    #[test]
    fn test_capital_mismatch_ratio() {
        let mut entry = filing("ACME SL", "2020-01-01", "1", &[]);
        entry.capital = Some(5000.0);
        let records = vec![award("BOE-B-1", "2024-03-01", "Acme, S.L.", 200_000.0)];

        let alerts = detect_alerts(&records, &profiles(vec![entry]), &AlertsConfig::default());
        let hits = of_kind(&alerts, AlertKind::CapitalMismatch);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Severity::High);
        assert_eq!(
            hits[0].detail,
            AlertDetail::CapitalMismatch { capital: 5000.0, ratio: 40.0 }
        );
        assert_eq!(hits[0].registry_refs, vec!["2020-01-01#MADRID#1"]);
    }

    #[test]
    fn test_adequate_capital_does_not_fire() {
        let mut entry = filing("ACME SL", "2020-01-01", "1", &[]);
        entry.capital = Some(50_000.0);
        let records = vec![award("BOE-B-1", "2024-03-01", "ACME SL", 200_000.0)];

        let alerts = detect_alerts(&records, &profiles(vec![entry]), &AlertsConfig::default());
        assert!(of_kind(&alerts, AlertKind::CapitalMismatch).is_empty());
    }

    #[test]
    fn test_recent_incorporation_strictly_before() {
        let config = AlertsConfig::default();
        let before = filing("ACME SL", "2024-01-15", "1", &[ActType::Incorporation]);
        let records = vec![award("BOE-B-1", "2024-03-01", "ACME SL", 50_000.0)];
        let alerts = detect_alerts(&records, &profiles(vec![before]), &config);
        let hits = of_kind(&alerts, AlertKind::RecentIncorporation);
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].detail,
            AlertDetail::RecentIncorporation {
                fecha_constitucion: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                dias: 46,
            }
        );

        let after = filing("ACME SL", "2024-03-05", "1", &[ActType::Incorporation]);
        let alerts = detect_alerts(&records, &profiles(vec![after]), &config);
        assert!(of_kind(&alerts, AlertKind::RecentIncorporation).is_empty());

        let old = filing("ACME SL", "2022-03-05", "1", &[ActType::Incorporation]);
        let alerts = detect_alerts(&records, &profiles(vec![old]), &config);
        assert!(of_kind(&alerts, AlertKind::RecentIncorporation).is_empty());
    }

    #[test]
    fn test_post_award_dissolution_days() {
        let dissolved = filing("ACME SL", "2024-03-11", "9", &[ActType::Dissolution]);
        let records = vec![award("BOE-B-1", "2024-03-01", "ACME SL", 10_000.0)];
        let alerts = detect_alerts(&records, &profiles(vec![dissolved]), &AlertsConfig::default());
        let hits = of_kind(&alerts, AlertKind::PostAwardDissolution);
        assert_eq!(hits.len(), 1);
        assert!(matches!(hits[0].detail, AlertDetail::PostAwardDissolution { dias: 10, .. }));
    }

    fn shared_officer_alerts(companies: &[&str]) -> Vec<Alert> {
        let mut entries = Vec::new();
        let mut records = Vec::new();
        for (i, company) in companies.iter().enumerate() {
            let mut entry = filing(company, "2020-01-01", &i.to_string(), &[]);
            entry.persons.push(officer("GARCIA LOPEZ JUAN", ActSection::Appointments));
            entries.push(entry);
            records.push(award(&format!("BOE-B-{}", i), "2024-03-01", company, 1000.0));
        }
        detect_alerts(&records, &profiles(entries), &AlertsConfig::default())
            .into_iter()
            .filter(|a| a.kind == AlertKind::SharedAdministrator)
            .collect()
    }

    #[test]
    fn test_shared_administrator_severity() {
        let hits = shared_officer_alerts(&["ALFA SL", "BETA SL", "GAMMA SA"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Severity::High);
        assert_eq!(hits[0].amount, Some(3000.0));
        assert_eq!(hits[0].documents.len(), 3);
    }

    #[test]
    fn test_two_companies_share_an_officer() {
        let hits = shared_officer_alerts(&["ALFA SL", "BETA SL"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].severity, Severity::Medium);
        assert_eq!(hits[0].company, "ALFA SL, BETA SL");
        assert_eq!(hits[0].documents.len(), 2);
    }

    #[test]
    fn test_single_company_is_not_shared() {
        assert!(shared_officer_alerts(&["ALFA SL"]).is_empty());
    }

    #[test]
    fn test_officer_change_window() {
        let mut near = filing("ACME SL", "2024-04-15", "1", &[ActType::Cessation]);
        near.persons.push(officer("Perez Ana", ActSection::Cessations));
        let mut far = filing("ACME SL", "2024-09-15", "2", &[ActType::Appointment]);
        far.persons.push(officer("Ruiz Eva", ActSection::Appointments));

        let records = vec![award("BOE-B-1", "2024-03-01", "ACME SL", 10_000.0)];
        let alerts = detect_alerts(&records, &profiles(vec![near, far]), &AlertsConfig::default());
        let hits = of_kind(&alerts, AlertKind::OfficerChangeNearAward);
        assert_eq!(hits.len(), 1);
        assert!(matches!(
            &hits[0].detail,
            AlertDetail::OfficerChange { evento: ActSection::Cessations, dias: 45, .. }
        ));
    }

    #[test]
    fn test_low_transparency_needs_no_registry() {
        let mut record = award("BOE-B-1", "2024-03-01", "ACME SL", 10_000.0);
        if let Some(p) = record.procurement.as_mut() {
            p.procedure = Some("Negociado sin publicidad".to_string());
        }
        let alerts = detect_alerts(&[record], &HashMap::new(), &AlertsConfig::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::LowTransparencyProcedure);
    }

    #[test]
    fn test_configured_phrases_are_folded() {
        let mut record = award("BOE-B-1", "2024-03-01", "ACME SL", 10_000.0);
        if let Some(p) = record.procurement.as_mut() {
            p.procedure = Some("ADJUDICACION DIRECTA".to_string());
        }
        let config = AlertsConfig {
            low_transparency_phrases: vec!["Adjudicación directa".to_string()],
            ..AlertsConfig::default()
        };
        let alerts = detect_alerts(&[record], &HashMap::new(), &config);
        assert_eq!(of_kind(&alerts, AlertKind::LowTransparencyProcedure).len(), 1);
    }

    #[test]
    fn test_registry_keys_skip_public_bodies() {
        let mut public = award("BOE-B-2", "2024-03-01", "Ayuntamiento de Soria", 1000.0);
        if let Some(p) = public.procurement.as_mut() {
            p.awardee_kind = Some(EntityKind::EntidadLocal);
        }
        let records = vec![award("BOE-B-1", "2024-03-01", "Acme Soluciones, S.L.", 1000.0), public];
        let keys = awarded_company_keys(&records);
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec!["ACME SOLUCIONES"]);
    }

    #[test]
    fn test_unmatched_company_is_skipped() {
        let records = vec![award("BOE-B-1", "2024-03-01", "DESCONOCIDA SL", 500_000.0)];
        let alerts = detect_alerts(&records, &HashMap::new(), &AlertsConfig::default());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_sorting() {
        let mut alerts = vec![
            Alert {
                kind: AlertKind::OfficerChangeNearAward,
                severity: Severity::Medium,
                company: "A".to_string(),
                amount: Some(900.0),
                documents: vec![],
                registry_refs: vec![],
                detail: AlertDetail::LowTransparency { procedimiento: String::new() },
            },
            Alert {
                kind: AlertKind::CapitalMismatch,
                severity: Severity::High,
                company: "B".to_string(),
                amount: Some(100.0),
                documents: vec![],
                registry_refs: vec![],
                detail: AlertDetail::LowTransparency { procedimiento: String::new() },
            },
            Alert {
                kind: AlertKind::PostAwardDissolution,
                severity: Severity::High,
                company: "C".to_string(),
                amount: Some(500.0),
                documents: vec![],
                registry_refs: vec![],
                detail: AlertDetail::LowTransparency { procedimiento: String::new() },
            },
        ];
        sort_alerts(&mut alerts);
        let order: Vec<&str> = alerts.iter().map(|a| a.company.as_str()).collect();
        assert_eq!(order, vec!["C", "B", "A"]);
    }
}
