//! Subsidy classification
//!
//! Sector and destination tags are derived from a subsidy's description on
//! read and are never stored. Both classifiers are first-match over ordered
//! keyword tables, so reordering a table changes output.

mod destination;
mod sector;

pub use destination::*;
pub use sector::*;

use crate::models::SubsidyRecord;
use crate::text::fold_lower;
use serde::Serialize;

/// An ordered keyword table: label and its already-folded keywords
pub type KeywordTable = [(&'static str, &'static [&'static str])];

/// First label in `table` with any keyword accepted by `matches`
pub fn first_hit<F>(table: &KeywordTable, folded_text: &str, matches: F) -> Option<&'static str>
where
    F: Fn(&str, &str) -> bool,
{
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| matches(folded_text, k)))
        .map(|(label, _)| *label)
}

/// A subsidy together with its computed tags
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedSubsidy<'a> {
    #[serde(flatten)]
    pub record: &'a SubsidyRecord,
    pub sector: &'static str,
    pub destino: &'static str,
}

/// Compute the sector and destination of a subsidy
pub fn classify_subsidy(record: &SubsidyRecord) -> ClassifiedSubsidy<'_> {
    let folded = fold_lower(&record.description);
    ClassifiedSubsidy {
        record,
        sector: sector_of(&folded),
        destino: destination_of(&folded, record.level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdministrativeLevel;

    fn subsidy(description: &str, level: AdministrativeLevel) -> SubsidyRecord {
        SubsidyRecord {
            id: "1".to_string(),
            fecha: None,
            description: description.to_string(),
            level,
            awarding_body: None,
            department: None,
            mrr: false,
            budget: None,
        }
    }

    #[test]
    fn test_humanitarian_aid_to_syria() {
        let record = subsidy(
            "Ayuda humanitaria para refugiados en Siria",
            AdministrativeLevel::Estado,
        );
        let tags = classify_subsidy(&record);
        assert_eq!(tags.sector, "Cooperación internacional y ayuda humanitaria");
        assert_eq!(tags.destino, "Siria");
    }

    #[test]
    fn test_tags_serialize_alongside_record() {
        let record = subsidy("Becas de formación", AdministrativeLevel::Local);
        let json = serde_json::to_value(classify_subsidy(&record)).unwrap();
        assert_eq!(json["descripcion"], "Becas de formación");
        assert_eq!(json["sector"], "Educación y formación");
        assert_eq!(json["destino"], "España - Local");
    }
}
