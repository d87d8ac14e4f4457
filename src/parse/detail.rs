//! Procurement detail extraction
//!
//! Detail pages are XML documents whose announcement body is a run of
//! numbered fields ("12. Adjudicatario: 12.1) Nombre: ... 12.2) NIF: ...").
//! The page is flattened to a single line of text and each field is pulled
//! out by an ordered rule table.

use super::{first_match, rx, trim_field, FieldRule};
use crate::models::{DocumentRecord, EntityKind, ProcurementEnrichment};
use crate::text::{collapse_whitespace, fold_lower, parse_amount};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Amount as written in announcements: `1.234.567,89`
const AMOUNT: &str = r"(\d[\d.]*(?:,\d+)?)";

/// Start of the next numbered field: `12.3) ` or ` 13. Valor`
static NEXT_NUMBERED_FIELD: LazyLock<Regex> =
    LazyLock::new(|| rx(r"\s\d{1,2}\.\d{1,2}\)\s*|\s\d{1,2}\.\s+\p{Lu}"));

/// Awarded amount, highest business priority first
static AMOUNT_RULES: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    let labelled = |name, label: &str| {
        FieldRule::capture(
            name,
            &format!(r"(?i){label}[^:]{{0,60}}:(?:[^:\d]{{0,40}}:)?\s*{AMOUNT}"),
        )
    };
    vec![
        labelled("selected_bid", r"valor de la oferta seleccionada"),
        labelled("contract_value", r"valor total del contrato"),
        labelled("total_amount", r"importe total"),
        labelled("estimated_value", r"valor estimado"),
        labelled("budget", r"presupuesto base de licitaci[oó]n"),
        labelled("lowest_bid", r"valor de la oferta de menor coste"),
    ]
});

static HIGHEST_BID: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::capture(
        "highest_bid",
        &format!(r"(?i)valor de la oferta de mayor coste[^:]{{0,60}}:\s*{AMOUNT}"),
    )
});

static LOWEST_BID: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::capture(
        "lowest_bid",
        &format!(r"(?i)valor de la oferta de menor coste[^:]{{0,60}}:\s*{AMOUNT}"),
    )
});

static AWARDEE_NAME: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::bounded(
            "awardee",
            r"12\.1\)\s*Nombre\s*:\s*",
            &[&NEXT_NUMBERED_FIELD],
            300,
        ),
        FieldRule::bounded(
            "contractor",
            r"(?i)\bAdjudicatario\s*:\s*(?:[^:]{0,3}\s)?Nombre\s*:\s*",
            &[&NEXT_NUMBERED_FIELD],
            300,
        ),
    ]
});

static AWARDEE_TAX_ID: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![FieldRule::capture(
        "awardee_tax_id",
        r"12\.2\)[^:]{0,60}:\s*([A-Za-z0-9][A-Za-z0-9\-]{7,11})",
    )]
});

static PROCEDURE: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::bounded(
        "procedure",
        r"(?i)tipo de procedimiento[^:]{0,20}:\s*",
        &[&NEXT_NUMBERED_FIELD],
        120,
    )
});

static CPV_SECTION: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::bounded(
        "cpv",
        r"(?i)c[oó]digos? cpv\s*:\s*",
        &[&NEXT_NUMBERED_FIELD],
        600,
    )
});

static CPV_CODE: LazyLock<Regex> = LazyLock::new(|| rx(r"\b(\d{8})(?:-\d)?\b"));

static PLACE_OF_EXECUTION: LazyLock<FieldRule> = LazyLock::new(|| {
    FieldRule::bounded(
        "geographic_scope",
        r"(?i)lugar de ejecuci[oó]n[^:]{0,120}:\s*",
        &[&NEXT_NUMBERED_FIELD],
        300,
    )
});

static DURATION: LazyLock<Vec<FieldRule>> = LazyLock::new(|| {
    vec![
        FieldRule::bounded(
            "duration",
            r"(?i)duraci[oó]n del contrato[^:]{0,40}:\s*",
            &[&NEXT_NUMBERED_FIELD],
            120,
        ),
        FieldRule::bounded(
            "execution_period",
            r"(?i)plazo de ejecuci[oó]n[^:]{0,40}:\s*",
            &[&NEXT_NUMBERED_FIELD],
            120,
        ),
    ]
});

/// Folded phrase that marks the awardee as a small or medium enterprise
const SME_PHRASE: &str = "el adjudicatario es una pyme: si";

/// Flatten a detail XML page into whitespace-collapsed text
///
/// Malformed markup is not an error: whatever text was read before the
/// failure is kept.
pub fn flatten_markup(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = String::with_capacity(xml.len() / 2);
    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                out.push_str(&text);
                out.push(' ');
            }
            Ok(Event::CData(c)) => {
                out.push_str(&String::from_utf8_lossy(&c.into_inner()));
                out.push(' ');
            }
            Ok(Event::End(_)) | Ok(Event::Empty(_)) => out.push(' '),
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Stopping markup flatten at position {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
    }

    collapse_whitespace(&out)
}

/// Extract procurement fields from flattened detail text
pub fn extract_procurement(text: &str) -> ProcurementEnrichment {
    let amount = first_match(&AMOUNT_RULES, text).and_then(|(rule, raw)| {
        debug!("Amount taken from {}", rule);
        parse_amount(raw)
    });

    let awardee = first_match(&AWARDEE_NAME, text).map(|(_, name)| name.to_string());
    let awardee_tax_id = first_match(&AWARDEE_TAX_ID, text)
        .map(|(_, id)| id.trim_end_matches('.').to_uppercase());
    let awardee_kind = awardee_tax_id.as_deref().and_then(EntityKind::from_tax_id);

    let cpv = CPV_SECTION
        .extract(text)
        .map(|section| {
            let mut codes: Vec<String> = Vec::new();
            for caps in CPV_CODE.captures_iter(section) {
                let code = caps[1].to_string();
                if !codes.contains(&code) {
                    codes.push(code);
                }
            }
            codes
        })
        .unwrap_or_default();

    ProcurementEnrichment {
        amount,
        awardee,
        awardee_tax_id,
        awardee_kind,
        procedure: PROCEDURE.extract(text).map(normalize_procedure),
        cpv,
        geographic_scope: PLACE_OF_EXECUTION.extract(text).map(str::to_string),
        sme: fold_lower(text).contains(SME_PHRASE),
        duration: first_match(&DURATION, text).map(|(_, d)| d.to_string()),
        highest_bid: HIGHEST_BID.extract(text).and_then(parse_amount),
        lowest_bid: LOWEST_BID.extract(text).and_then(parse_amount),
    }
}

/// Capitalize the procedure label ("abierto simplificado" → "Abierto simplificado")
fn normalize_procedure(raw: &str) -> String {
    let trimmed = trim_field(raw);
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Merge extracted fields onto a record exactly once
///
/// Returns `false` (leaving the record untouched) when it already carries
/// enrichment.
pub fn enrich_document(record: &mut DocumentRecord, enrichment: ProcurementEnrichment) -> bool {
    if record.is_enriched() {
        return false;
    }
    record.procurement = Some(enrichment);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentType;
    use chrono::NaiveDate;

    const DETAIL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<documento>
  <metadatos><identificador>BOE-B-2024-1</identificador></metadatos>
  <texto>
    <p>1. Poder adjudicador: 1.1) Nombre: Junta de Contratación del Ministerio.</p>
    <p>4. Códigos CPV: 45233140 (Obras viales), 45233141-9 (Mantenimiento).</p>
    <p>5. Lugar de ejecución principal de las obras: Código NUTS: ES300.</p>
    <p>7. Tipo de procedimiento: Abierto.</p>
    <p>8. Presupuesto base de licitación: Importe neto: 7.000,00 euros.</p>
    <p>12. Adjudicatario: 12.1) Nombre: Construcciones Pérez, S.L. 12.2) Número de identificación fiscal: B12345678. 12.7) El adjudicatario es una PYME: Sí.</p>
    <p>13. Valor de la oferta: 13.1) Valor de la oferta seleccionada: 5.785,12 euros. 13.2) Valor de la oferta de mayor coste: 6.900,00 euros. 13.3) Valor de la oferta de menor coste: 5.785,12 euros.</p>
  </texto>
</documento>"#;

    fn record() -> DocumentRecord {
        DocumentRecord {
            id: "BOE-B-2024-1".to_string(),
            fecha: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            title: "Anuncio de formalización".to_string(),
            doc_type: DocumentType::Announcement,
            department: "MINISTERIO DE FOMENTO".to_string(),
            section: "V. Anuncios".to_string(),
            section_code: "5A".to_string(),
            heading: None,
            url_pdf: None,
            url_html: None,
            url_xml: None,
            procurement: None,
        }
    }

    #[test]
    fn test_flatten_markup_joins_blocks() {
        let text = flatten_markup("<a><b>uno</b><b>dos &amp; tres</b></a>");
        assert_eq!(text, "uno dos & tres");
    }

    #[test]
    fn test_flatten_tolerates_broken_markup() {
        let text = flatten_markup("<a><b>uno</b></c>");
        assert!(text.starts_with("uno"));
    }

    #[test]
    fn test_selected_bid_beats_budget() {
        let enrichment = extract_procurement(&flatten_markup(DETAIL));
        assert_eq!(enrichment.amount, Some(5785.12));
    }

    #[test]
    fn test_budget_used_when_no_bid() {
        let text = "8. Presupuesto base de licitación: Importe neto: 7.000,00 euros.";
        assert_eq!(extract_procurement(text).amount, Some(7000.0));
    }

    #[test]
    fn test_awardee_fields() {
        let enrichment = extract_procurement(&flatten_markup(DETAIL));
        assert_eq!(enrichment.awardee.as_deref(), Some("Construcciones Pérez, S.L"));
        assert_eq!(enrichment.awardee_tax_id.as_deref(), Some("B12345678"));
        assert_eq!(enrichment.awardee_kind, Some(EntityKind::SociedadLimitada));
        assert!(enrichment.sme);
        assert_eq!(enrichment.procedure.as_deref(), Some("Abierto"));
        assert_eq!(enrichment.cpv, vec!["45233140", "45233141"]);
        assert_eq!(enrichment.highest_bid, Some(6900.0));
        assert_eq!(enrichment.lowest_bid, Some(5785.12));
        assert!(enrichment
            .geographic_scope
            .as_deref()
            .is_some_and(|s| s.contains("ES300")));
    }

    #[test]
    fn test_missing_fields_stay_unknown() {
        let enrichment = extract_procurement("Texto sin campos reconocibles");
        assert_eq!(enrichment.amount, None);
        assert_eq!(enrichment.awardee, None);
        assert!(!enrichment.sme);
        assert!(enrichment.cpv.is_empty());
    }

    #[test]
    fn test_enrich_document_once() {
        let mut doc = record();
        let first = extract_procurement(&flatten_markup(DETAIL));
        assert!(enrich_document(&mut doc, first));
        assert_eq!(doc.amount(), Some(5785.12));

        let second = ProcurementEnrichment {
            amount: Some(1.0),
            ..Default::default()
        };
        assert!(!enrich_document(&mut doc, second));
        assert_eq!(doc.amount(), Some(5785.12));
    }
}
