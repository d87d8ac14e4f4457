//! Official bulletin records and their procurement enrichment

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Document category inferred from the title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "Ley Orgánica")]
    OrganicLaw,
    #[serde(rename = "Ley")]
    Law,
    #[serde(rename = "Real Decreto-ley")]
    RoyalDecreeLaw,
    #[serde(rename = "Real Decreto Legislativo")]
    LegislativeRoyalDecree,
    #[serde(rename = "Real Decreto")]
    RoyalDecree,
    #[serde(rename = "Decreto")]
    Decree,
    #[serde(rename = "Orden")]
    Order,
    #[serde(rename = "Resolución")]
    Resolution,
    #[serde(rename = "Acuerdo")]
    Agreement,
    #[serde(rename = "Circular")]
    Circular,
    #[serde(rename = "Instrucción")]
    Instruction,
    #[serde(rename = "Edicto")]
    Edict,
    #[serde(rename = "Convenio")]
    Covenant,
    #[serde(rename = "Corrección de errores")]
    Correction,
    #[serde(rename = "Anuncio")]
    Announcement,
    #[serde(rename = "Otro")]
    Other,
}

impl DocumentType {
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::OrganicLaw => "Ley Orgánica",
            DocumentType::Law => "Ley",
            DocumentType::RoyalDecreeLaw => "Real Decreto-ley",
            DocumentType::LegislativeRoyalDecree => "Real Decreto Legislativo",
            DocumentType::RoyalDecree => "Real Decreto",
            DocumentType::Decree => "Decreto",
            DocumentType::Order => "Orden",
            DocumentType::Resolution => "Resolución",
            DocumentType::Agreement => "Acuerdo",
            DocumentType::Circular => "Circular",
            DocumentType::Instruction => "Instrucción",
            DocumentType::Edict => "Edicto",
            DocumentType::Covenant => "Convenio",
            DocumentType::Correction => "Corrección de errores",
            DocumentType::Announcement => "Anuncio",
            DocumentType::Other => "Otro",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One leaf item of a daily bulletin summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(rename = "identificador")]
    pub id: String,

    pub fecha: NaiveDate,

    #[serde(rename = "titulo")]
    pub title: String,

    #[serde(rename = "tipo")]
    pub doc_type: DocumentType,

    #[serde(rename = "departamento")]
    pub department: String,

    /// Display label of the section (the raw code when unmapped)
    #[serde(rename = "seccion")]
    pub section: String,

    #[serde(rename = "seccion_codigo")]
    pub section_code: String,

    /// Sub-heading, absent for flat departments
    #[serde(rename = "epigrafe", default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pdf: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_html: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_xml: Option<String>,

    /// Award details, merged once by the detail enricher
    #[serde(rename = "contrato", default, skip_serializing_if = "Option::is_none")]
    pub procurement: Option<ProcurementEnrichment>,
}

impl DocumentRecord {
    /// Whether the section marks this record as a procurement item
    pub fn is_procurement(&self) -> bool {
        self.section_code == crate::parse::PROCUREMENT_SECTION_CODE
    }

    pub fn is_enriched(&self) -> bool {
        self.procurement.is_some()
    }

    /// Awarded amount, if the record was enriched and an amount was found
    pub fn amount(&self) -> Option<f64> {
        self.procurement.as_ref().and_then(|p| p.amount)
    }

    /// Awardee name, if any
    pub fn awardee(&self) -> Option<&str> {
        self.procurement
            .as_ref()
            .and_then(|p| p.awardee.as_deref())
    }
}

/// Fields extracted from a procurement item's detail page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcurementEnrichment {
    #[serde(rename = "importe")]
    pub amount: Option<f64>,

    #[serde(rename = "adjudicatario")]
    pub awardee: Option<String>,

    #[serde(rename = "nif_adjudicatario")]
    pub awardee_tax_id: Option<String>,

    #[serde(rename = "tipo_adjudicatario", default)]
    pub awardee_kind: Option<EntityKind>,

    #[serde(rename = "procedimiento")]
    pub procedure: Option<String>,

    #[serde(default)]
    pub cpv: Vec<String>,

    /// Raw place-of-execution text; may hold several comma/newline separated values
    #[serde(rename = "ambito_geografico")]
    pub geographic_scope: Option<String>,

    #[serde(rename = "pyme", default)]
    pub sme: bool,

    #[serde(rename = "duracion")]
    pub duration: Option<String>,

    #[serde(rename = "oferta_mayor")]
    pub highest_bid: Option<f64>,

    #[serde(rename = "oferta_menor")]
    pub lowest_bid: Option<f64>,
}

impl ProcurementEnrichment {
    /// Individual geographic scopes
    pub fn scopes(&self) -> Vec<String> {
        self.geographic_scope
            .as_deref()
            .map(|raw| {
                raw.split(['\n', ',', ';'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Legal form implied by the first character of a Spanish tax identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    SociedadAnonima,
    SociedadLimitada,
    SociedadColectiva,
    SociedadComanditaria,
    ComunidadDeBienes,
    Cooperativa,
    AsociacionOFundacion,
    ComunidadDePropietarios,
    SociedadCivil,
    EntidadExtranjera,
    EntidadLocal,
    OrganismoPublico,
    EntidadReligiosa,
    AdministracionDelEstado,
    UnionTemporalDeEmpresas,
    OtraEntidad,
    PersonaFisica,
}

impl EntityKind {
    /// Classify a NIF/CIF by its first character
    pub fn from_tax_id(tax_id: &str) -> Option<Self> {
        let first = tax_id.trim().chars().next()?.to_ascii_uppercase();
        let kind = match first {
            'A' => EntityKind::SociedadAnonima,
            'B' => EntityKind::SociedadLimitada,
            'C' => EntityKind::SociedadColectiva,
            'D' => EntityKind::SociedadComanditaria,
            'E' => EntityKind::ComunidadDeBienes,
            'F' => EntityKind::Cooperativa,
            'G' => EntityKind::AsociacionOFundacion,
            'H' => EntityKind::ComunidadDePropietarios,
            'J' => EntityKind::SociedadCivil,
            'N' | 'W' => EntityKind::EntidadExtranjera,
            'P' => EntityKind::EntidadLocal,
            'Q' => EntityKind::OrganismoPublico,
            'R' => EntityKind::EntidadReligiosa,
            'S' => EntityKind::AdministracionDelEstado,
            'U' => EntityKind::UnionTemporalDeEmpresas,
            'V' => EntityKind::OtraEntidad,
            '0'..='9' | 'K' | 'L' | 'M' | 'X' | 'Y' | 'Z' => EntityKind::PersonaFisica,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether the counterparty is a company that can appear in the registry
    pub fn is_mercantile(&self) -> bool {
        matches!(
            self,
            EntityKind::SociedadAnonima
                | EntityKind::SociedadLimitada
                | EntityKind::SociedadColectiva
                | EntityKind::SociedadComanditaria
                | EntityKind::Cooperativa
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_from_tax_id() {
        assert_eq!(
            EntityKind::from_tax_id("B12345678"),
            Some(EntityKind::SociedadLimitada)
        );
        assert_eq!(
            EntityKind::from_tax_id("a28000000"),
            Some(EntityKind::SociedadAnonima)
        );
        assert_eq!(
            EntityKind::from_tax_id("12345678Z"),
            Some(EntityKind::PersonaFisica)
        );
        assert_eq!(
            EntityKind::from_tax_id("U87654321"),
            Some(EntityKind::UnionTemporalDeEmpresas)
        );
        assert_eq!(EntityKind::from_tax_id(""), None);
        assert!(EntityKind::SociedadLimitada.is_mercantile());
        assert!(!EntityKind::PersonaFisica.is_mercantile());
    }

    #[test]
    fn test_scopes_split() {
        let enrichment = ProcurementEnrichment {
            geographic_scope: Some("ES300 Madrid,\nES511 Barcelona".to_string()),
            ..Default::default()
        };
        assert_eq!(
            enrichment.scopes(),
            vec!["ES300 Madrid".to_string(), "ES511 Barcelona".to_string()]
        );
    }

    #[test]
    fn test_document_type_serializes_as_label() {
        let json = serde_json::to_string(&DocumentType::OrganicLaw).unwrap();
        assert_eq!(json, "\"Ley Orgánica\"");
        assert_eq!(DocumentType::Correction.to_string(), "Corrección de errores");
    }
}
