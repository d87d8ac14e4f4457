//! Subsidy calls from the national subsidy database

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Administrative level of the granting body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdministrativeLevel {
    Estado,
    Autonomica,
    Local,
    #[default]
    Otros,
}

impl AdministrativeLevel {
    /// Map the API's `nivel1` text onto a level
    pub fn from_api(raw: &str) -> Self {
        let folded = crate::text::fold_lower(raw);
        if folded.contains("estado") || folded.contains("estatal") {
            AdministrativeLevel::Estado
        } else if folded.contains("autonom") {
            AdministrativeLevel::Autonomica
        } else if folded.contains("local") {
            AdministrativeLevel::Local
        } else {
            AdministrativeLevel::Otros
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdministrativeLevel::Estado => "estado",
            AdministrativeLevel::Autonomica => "autonomica",
            AdministrativeLevel::Local => "local",
            AdministrativeLevel::Otros => "otros",
        }
    }
}

impl fmt::Display for AdministrativeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdministrativeLevel {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        Ok(Self::from_api(s))
    }
}

/// A subsidy call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsidyRecord {
    pub id: String,

    #[serde(default)]
    pub fecha: Option<NaiveDate>,

    #[serde(rename = "descripcion")]
    pub description: String,

    #[serde(rename = "nivel", default)]
    pub level: AdministrativeLevel,

    #[serde(rename = "organo", default)]
    pub awarding_body: Option<String>,

    #[serde(rename = "departamento", default)]
    pub department: Option<String>,

    /// Funded by the recovery plan
    #[serde(default)]
    pub mrr: bool,

    /// Budget; `Some(0.0)` is a known zero and is never re-queried
    #[serde(rename = "presupuesto", default)]
    pub budget: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_api() {
        assert_eq!(AdministrativeLevel::from_api("ESTADO"), AdministrativeLevel::Estado);
        assert_eq!(
            AdministrativeLevel::from_api("COMUNIDAD AUTÓNOMA"),
            AdministrativeLevel::Autonomica
        );
        assert_eq!(
            AdministrativeLevel::from_api("ENTIDAD LOCAL"),
            AdministrativeLevel::Local
        );
        assert_eq!(AdministrativeLevel::from_api("UNIVERSIDAD"), AdministrativeLevel::Otros);
    }
}
