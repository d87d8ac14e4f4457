//! Daily bulletin summary parsing
//!
//! The summary is a JSON tree `diario → seccion → departamento → (epigrafe →)
//! item`. Any level may come as a single object instead of an array, and a
//! department may list its items directly or group them under headings.

use crate::models::{parse_loose_date, DocumentRecord, DocumentType};
use crate::text::fold_lower;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

/// Section code of public-procurement announcements
pub const PROCUREMENT_SECTION_CODE: &str = "5A";

/// Section codes and their display labels
pub const SECTION_LABELS: &[(&str, &str)] = &[
    ("1", "I. Disposiciones generales"),
    ("2A", "II. Autoridades y personal. A. Nombramientos, situaciones e incidencias"),
    ("2B", "II. Autoridades y personal. B. Oposiciones y concursos"),
    ("3", "III. Otras disposiciones"),
    ("4", "IV. Administración de Justicia"),
    ("5A", "V. Anuncios. A. Contratación del Sector Público"),
    ("5B", "V. Anuncios. B. Otros anuncios oficiales"),
    ("5C", "V. Anuncios. C. Anuncios particulares"),
    ("T", "Tribunal Constitucional"),
];

/// Display label for a section code; unknown codes pass through verbatim
pub fn section_label(code: &str) -> &str {
    SECTION_LABELS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or(code)
}

/// A test applied to the folded, lower-cased title
#[derive(Debug, Clone, Copy)]
pub enum TitleTest {
    Prefix(&'static str),
    Contains(&'static str),
}

impl TitleTest {
    fn matches(&self, folded_title: &str) -> bool {
        match self {
            TitleTest::Prefix(p) => folded_title.starts_with(p),
            TitleTest::Contains(p) => folded_title.contains(p),
        }
    }
}

/// Ordered title cascade; the first passing test decides the type
pub const TITLE_CASCADE: &[(TitleTest, DocumentType)] = &[
    (TitleTest::Contains("correccion de errores"), DocumentType::Correction),
    (TitleTest::Contains("correccion de erratas"), DocumentType::Correction),
    (TitleTest::Prefix("ley organica"), DocumentType::OrganicLaw),
    (TitleTest::Prefix("real decreto-ley"), DocumentType::RoyalDecreeLaw),
    (TitleTest::Prefix("real decreto legislativo"), DocumentType::LegislativeRoyalDecree),
    (TitleTest::Prefix("real decreto"), DocumentType::RoyalDecree),
    (TitleTest::Prefix("ley "), DocumentType::Law),
    (TitleTest::Prefix("decreto"), DocumentType::Decree),
    (TitleTest::Prefix("orden "), DocumentType::Order),
    (TitleTest::Prefix("resolucion"), DocumentType::Resolution),
    (TitleTest::Prefix("acuerdo"), DocumentType::Agreement),
    (TitleTest::Prefix("circular"), DocumentType::Circular),
    (TitleTest::Prefix("instruccion"), DocumentType::Instruction),
    (TitleTest::Prefix("edicto"), DocumentType::Edict),
    (TitleTest::Contains("convenio"), DocumentType::Covenant),
    (TitleTest::Prefix("anuncio"), DocumentType::Announcement),
];

/// Infer a document's type from its title
pub fn classify_title(title: &str) -> DocumentType {
    let folded = fold_lower(title.trim());
    TITLE_CASCADE
        .iter()
        .find(|(test, _)| test.matches(&folded))
        .map(|(_, doc_type)| *doc_type)
        .unwrap_or(DocumentType::Other)
}

/// Result of parsing one day's summary
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    /// The day was published and had at least one item
    Published(Vec<DocumentRecord>),
    /// Well-formed payload with no items (holiday, Sunday)
    NoPublication,
    /// Non-success status or unusable payload
    Unavailable(String),
}

impl SummaryOutcome {
    /// Status label stored in the fetch log
    pub fn status(&self) -> &'static str {
        match self {
            SummaryOutcome::Published(_) => "published",
            SummaryOutcome::NoPublication => "empty",
            SummaryOutcome::Unavailable(_) => "failed",
        }
    }

    /// Records of the day, empty unless published
    pub fn into_records(self) -> Vec<DocumentRecord> {
        match self {
            SummaryOutcome::Published(records) => records,
            _ => Vec::new(),
        }
    }
}

/// Parse a raw summary payload
pub fn parse_summary_json(payload: &str, fecha: NaiveDate) -> SummaryOutcome {
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => parse_summary(&value, fecha),
        Err(e) => {
            warn!("Summary for {} is not valid JSON: {}", fecha, e);
            SummaryOutcome::Unavailable(format!("invalid JSON: {}", e))
        }
    }
}

/// Parse an already-decoded summary tree
///
/// `fecha` is the requested day; the payload's own publication date wins
/// when present.
pub fn parse_summary(value: &Value, fecha: NaiveDate) -> SummaryOutcome {
    let code = value.pointer("/status/code").map(status_code);
    if code.as_deref() != Some("200") {
        let text = value
            .pointer("/status/text")
            .and_then(Value::as_str)
            .unwrap_or("no status");
        return SummaryOutcome::Unavailable(format!(
            "status {}: {}",
            code.unwrap_or_else(|| "missing".to_string()),
            text
        ));
    }

    let Some(sumario) = value.pointer("/data/sumario") else {
        return SummaryOutcome::Unavailable("missing data.sumario".to_string());
    };

    let fecha = sumario
        .pointer("/metadatos/fecha_publicacion")
        .and_then(Value::as_str)
        .and_then(parse_loose_date)
        .unwrap_or(fecha);

    let mut records = Vec::new();
    for diario in as_list(sumario.get("diario")) {
        for seccion in as_list(diario.get("seccion")) {
            let section_code = str_field(seccion, "codigo").unwrap_or_default();
            for departamento in as_list(seccion.get("departamento")) {
                let department = str_field(departamento, "nombre").unwrap_or_default();
                let context = ItemContext {
                    fecha,
                    section_code: &section_code,
                    department: &department,
                };

                for epigrafe in as_list(departamento.get("epigrafe")) {
                    let heading = str_field(epigrafe, "nombre");
                    for item in as_list(epigrafe.get("item")) {
                        records.extend(context.record(item, heading.clone()));
                    }
                }
                for item in as_list(departamento.get("item")) {
                    records.extend(context.record(item, None));
                }
            }
        }
    }

    debug!("Summary {} yielded {} records", fecha, records.len());
    if records.is_empty() {
        SummaryOutcome::NoPublication
    } else {
        SummaryOutcome::Published(records)
    }
}

struct ItemContext<'a> {
    fecha: NaiveDate,
    section_code: &'a str,
    department: &'a str,
}

impl ItemContext<'_> {
    fn record(&self, item: &Value, heading: Option<String>) -> Option<DocumentRecord> {
        let id = str_field(item, "identificador");
        let title = str_field(item, "titulo");
        let (Some(id), Some(title)) = (id, title) else {
            debug!("Skipping summary item without identifier or title");
            return None;
        };

        Some(DocumentRecord {
            doc_type: classify_title(&title),
            id,
            fecha: self.fecha,
            title,
            department: self.department.to_string(),
            section: section_label(self.section_code).to_string(),
            section_code: self.section_code.to_string(),
            heading,
            url_pdf: url_field(item, "url_pdf"),
            url_html: url_field(item, "url_html"),
            url_xml: url_field(item, "url_xml"),
            procurement: None,
        })
    }
}

/// Normalize the single-object-or-array convention into a slice-like list
fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

fn status_code(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// URLs come either as plain strings or as `{"texto": url, ...}` objects
fn url_field(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::Object(obj) => obj
            .get("texto")
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_title_cascade_order() {
        assert_eq!(
            classify_title("Ley Orgánica 3/2024, de 1 de marzo, de ejemplo"),
            DocumentType::OrganicLaw
        );
        assert_eq!(classify_title("Ley 2/2024, de 1 de marzo"), DocumentType::Law);
        assert_eq!(
            classify_title("Real Decreto-ley 1/2024, de 10 de enero"),
            DocumentType::RoyalDecreeLaw
        );
        assert_eq!(
            classify_title("Real Decreto Legislativo 1/2024"),
            DocumentType::LegislativeRoyalDecree
        );
        assert_eq!(
            classify_title("Real Decreto 100/2024, por el que se regula"),
            DocumentType::RoyalDecree
        );
        assert_eq!(classify_title("Decreto 5/2024"), DocumentType::Decree);
        assert_eq!(
            classify_title("Corrección de errores de la Ley 2/2024"),
            DocumentType::Correction
        );
        assert_eq!(
            classify_title("Resolución de 2 de enero, por la que se publica el Convenio"),
            DocumentType::Resolution
        );
        assert_eq!(
            classify_title("Anuncio de la Junta de Contratación"),
            DocumentType::Announcement
        );
        assert_eq!(classify_title("Sentencia 12/2024"), DocumentType::Other);
    }

    #[test]
    fn test_both_department_shapes() {
        let payload = json!({
            "status": {"code": "200", "text": "ok"},
            "data": {"sumario": {
                "metadatos": {"fecha_publicacion": "20240301"},
                "diario": [{
                    "seccion": [
                        {
                            "codigo": "1",
                            "departamento": {
                                "nombre": "JEFATURA DEL ESTADO",
                                "epigrafe": [{
                                    "nombre": "Leyes",
                                    "item": {
                                        "identificador": "BOE-A-2024-1",
                                        "titulo": "Ley Orgánica 3/2024, de 1 de marzo",
                                        "url_pdf": {"texto": "https://example.org/a.pdf"}
                                    }
                                }]
                            }
                        },
                        {
                            "codigo": "5A",
                            "departamento": [{
                                "nombre": "MINISTERIO DE DEFENSA",
                                "item": [
                                    {"identificador": "BOE-B-2024-2", "titulo": "Anuncio de licitación"},
                                    {"titulo": "sin identificador"}
                                ]
                            }]
                        }
                    ]
                }]
            }}
        });

        let records = match parse_summary(&payload, day()) {
            SummaryOutcome::Published(records) => records,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].doc_type, DocumentType::OrganicLaw);
        assert_eq!(records[0].heading.as_deref(), Some("Leyes"));
        assert_eq!(records[0].section, "I. Disposiciones generales");
        assert_eq!(records[0].url_pdf.as_deref(), Some("https://example.org/a.pdf"));

        assert_eq!(records[1].heading, None);
        assert_eq!(records[1].department, "MINISTERIO DE DEFENSA");
        assert!(records[1].is_procurement());
    }

    #[test]
    fn test_outcomes_are_distinguishable() {
        let empty = json!({
            "status": {"code": "200"},
            "data": {"sumario": {"diario": []}}
        });
        assert_eq!(parse_summary(&empty, day()), SummaryOutcome::NoPublication);

        let missing = json!({"status": {"code": "404", "text": "No se encontraron datos"}});
        let outcome = parse_summary(&missing, day());
        assert!(matches!(outcome, SummaryOutcome::Unavailable(_)));
        assert_eq!(outcome.status(), "failed");

        let garbage = parse_summary_json("<html>", day());
        assert!(matches!(garbage, SummaryOutcome::Unavailable(_)));
        assert!(garbage.into_records().is_empty());
    }

    #[test]
    fn test_unknown_section_code_passes_through() {
        assert_eq!(section_label("9Z"), "9Z");
        assert_eq!(section_label("2B"), "II. Autoridades y personal. B. Oposiciones y concursos");
    }
}
