//! Commercial registry entries and the officers named in them

use super::parse_loose_date;
use crate::text::canonical_company_name;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Registry act detected in a filing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActType {
    Incorporation,
    Appointment,
    Cessation,
    Reelection,
    Revocation,
    CapitalIncrease,
    CapitalDecrease,
    AddressChange,
    Dissolution,
    Extinction,
    Transformation,
    Merger,
    Demerger,
    SoleShareholderDeclaration,
    SoleShareholderLoss,
    BylawAmendment,
    NameChange,
    PurposeChange,
    Insolvency,
}

impl ActType {
    /// Whether this act ends the company's life
    pub fn is_dissolution(&self) -> bool {
        matches!(self, ActType::Dissolution | ActType::Extinction)
    }
}

/// Act section a named officer was listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActSection {
    #[serde(rename = "Nombramientos")]
    Appointments,
    #[serde(rename = "Ceses/Dimisiones")]
    Cessations,
    #[serde(rename = "Reelecciones")]
    Reelections,
    #[serde(rename = "Revocaciones")]
    Revocations,
    #[serde(rename = "Otros")]
    General,
}

impl ActSection {
    pub fn label(&self) -> &'static str {
        match self {
            ActSection::Appointments => "Nombramientos",
            ActSection::Cessations => "Ceses/Dimisiones",
            ActSection::Reelections => "Reelecciones",
            ActSection::Revocations => "Revocaciones",
            ActSection::General => "Otros",
        }
    }

    /// Whether a person listed here holds (or keeps) the office afterwards
    pub fn holds_office(&self) -> bool {
        matches!(
            self,
            ActSection::Appointments | ActSection::Reelections | ActSection::General
        )
    }
}

impl fmt::Display for ActSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named role-holder extracted from a filing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
    #[serde(rename = "nombre")]
    pub name: String,

    /// Canonical role name ("Administrador único", "Apoderado", ...)
    #[serde(rename = "cargo")]
    pub role: String,

    #[serde(rename = "accion")]
    pub section: ActSection,

    #[serde(default)]
    pub fecha: String,
}

/// One company's filing within a registry bulletin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub numero: String,

    #[serde(rename = "empresa")]
    pub company: String,

    #[serde(rename = "provincia")]
    pub province: String,

    /// Filing batch date as published
    #[serde(default)]
    pub fecha: String,

    #[serde(rename = "actos", default)]
    pub acts: BTreeSet<ActType>,

    #[serde(rename = "personas", default)]
    pub persons: Vec<Person>,

    #[serde(default)]
    pub capital: Option<f64>,

    #[serde(rename = "domicilio", default)]
    pub address: Option<String>,

    #[serde(rename = "objeto_social", default)]
    pub purpose: Option<String>,

    #[serde(rename = "socio_unico", default)]
    pub sole_shareholder: Option<String>,

    #[serde(rename = "comienzo_operaciones", default)]
    pub operations_start: Option<String>,
}

impl RegistryEntry {
    pub fn new(numero: String, company: String, province: String) -> Self {
        Self {
            numero,
            company,
            province,
            fecha: String::new(),
            acts: BTreeSet::new(),
            persons: Vec::new(),
            capital: None,
            address: None,
            purpose: None,
            sole_shareholder: None,
            operations_start: None,
        }
    }

    /// Tie the entry and every person in it to the filing batch date
    pub fn stamp_date(&mut self, fecha: &str) {
        self.fecha = fecha.to_string();
        for person in &mut self.persons {
            person.fecha = fecha.to_string();
        }
    }

    /// Parsed filing date, if the free-text date is recognizable
    pub fn filing_date(&self) -> Option<NaiveDate> {
        parse_loose_date(&self.fecha)
    }

    /// Join key used against procurement awardees
    pub fn company_key(&self) -> String {
        canonical_company_name(&self.company)
    }

    pub fn has_act(&self, act: ActType) -> bool {
        self.acts.contains(&act)
    }

    /// Stable reference to this filing (`fecha#provincia#numero`)
    pub fn reference(&self) -> String {
        format!("{}#{}#{}", self.fecha, self.province, self.numero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_date_reaches_persons() {
        let mut entry = RegistryEntry::new(
            "123456".to_string(),
            "ACME SL".to_string(),
            "MADRID".to_string(),
        );
        entry.persons.push(Person {
            name: "Garcia Lopez Juan".to_string(),
            role: "Administrador único".to_string(),
            section: ActSection::Appointments,
            fecha: String::new(),
        });
        entry.stamp_date("2024-02-12");

        assert_eq!(entry.persons[0].fecha, "2024-02-12");
        assert_eq!(entry.filing_date(), NaiveDate::from_ymd_opt(2024, 2, 12));
        assert_eq!(entry.reference(), "2024-02-12#MADRID#123456");
        assert_eq!(entry.company_key(), "ACME");
    }

    #[test]
    fn test_section_serializes_as_label() {
        let json = serde_json::to_string(&ActSection::Cessations).unwrap();
        assert_eq!(json, "\"Ceses/Dimisiones\"");
    }
}
