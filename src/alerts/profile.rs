//! Company registry histories and day-partition read planning

use crate::models::{ActSection, ActType, RegistryEntry};
use crate::text::canonical_person_name;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Filing dates on which each canonical company key appears
pub type CompanyIndex = HashMap<String, BTreeSet<String>>;

/// Day partitions to read, each with the companies needed from it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadPlan {
    pub days: BTreeMap<String, BTreeSet<String>>,
}

impl ReadPlan {
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Collect the filing dates needed for `company_keys` before any read
///
/// Each date appears once however many companies need it. Companies absent
/// from the index are left out.
pub fn plan_registry_reads<'a, I>(company_keys: I, index: &CompanyIndex) -> ReadPlan
where
    I: IntoIterator<Item = &'a str>,
{
    let mut plan = ReadPlan::default();
    for key in company_keys {
        let Some(dates) = index.get(key) else {
            continue;
        };
        for fecha in dates {
            plan.days
                .entry(fecha.clone())
                .or_default()
                .insert(key.to_string());
        }
    }
    plan
}

/// Accumulates the planned companies' entries as day partitions are read
#[derive(Debug)]
pub struct ProfileCollector<'p> {
    plan: &'p ReadPlan,
    entries: HashMap<String, Vec<RegistryEntry>>,
}

impl<'p> ProfileCollector<'p> {
    pub fn new(plan: &'p ReadPlan) -> Self {
        Self {
            plan,
            entries: HashMap::new(),
        }
    }

    /// Keep only the entries of the companies planned for `fecha`
    pub fn absorb_day(&mut self, fecha: &str, day_entries: Vec<RegistryEntry>) {
        let Some(wanted) = self.plan.days.get(fecha) else {
            return;
        };
        for entry in day_entries {
            let key = entry.company_key();
            if wanted.contains(&key) {
                self.entries.entry(key).or_default().push(entry);
            }
        }
    }

    pub fn finish(self) -> HashMap<String, CompanyProfile> {
        self.entries
            .into_iter()
            .map(|(key, entries)| {
                let profile = CompanyProfile::from_entries(&key, &entries);
                (key, profile)
            })
            .collect()
    }
}

/// An appointment, cessation or revocation of an officer
#[derive(Debug, Clone, PartialEq)]
pub struct OfficerEvent {
    pub fecha: NaiveDate,
    pub person: String,
    pub role: String,
    pub section: ActSection,
    pub reference: String,
}

/// A company's registry history folded into the facts alert rules need
#[derive(Debug, Clone, Default)]
pub struct CompanyProfile {
    pub key: String,
    /// Name as first published
    pub name: String,
    /// Capital by filing date
    pub capital_history: Vec<(NaiveDate, f64)>,
    pub incorporated: Option<NaiveDate>,
    pub dissolutions: Vec<(NaiveDate, String)>,
    pub officer_events: Vec<OfficerEvent>,
    /// Canonical names of people holding office at any point
    pub officers: BTreeSet<String>,
    pub references: Vec<String>,
}

impl CompanyProfile {
    /// Fold registry entries of one company; entries without a readable
    /// date still contribute officers and references
    pub fn from_entries(key: &str, entries: &[RegistryEntry]) -> Self {
        let mut sorted: Vec<&RegistryEntry> = entries.iter().collect();
        sorted.sort_by_key(|e| e.filing_date());

        let mut profile = CompanyProfile {
            key: key.to_string(),
            name: sorted
                .first()
                .map(|e| e.company.clone())
                .unwrap_or_default(),
            ..Default::default()
        };

        for entry in sorted {
            let reference = entry.reference();
            profile.references.push(reference.clone());
            let date = entry.filing_date();

            for person in &entry.persons {
                if person.section.holds_office() {
                    profile.officers.insert(canonical_person_name(&person.name));
                }
                let is_change = matches!(
                    person.section,
                    ActSection::Appointments | ActSection::Cessations | ActSection::Revocations
                );
                if let (true, Some(fecha)) = (is_change, date) {
                    profile.officer_events.push(OfficerEvent {
                        fecha,
                        person: person.name.clone(),
                        role: person.role.clone(),
                        section: person.section,
                        reference: reference.clone(),
                    });
                }
            }

            let Some(fecha) = date else {
                continue;
            };
            if let Some(capital) = entry.capital {
                profile.capital_history.push((fecha, capital));
            }
            if entry.has_act(ActType::Incorporation) && profile.incorporated.is_none() {
                profile.incorporated = Some(fecha);
            }
            if entry.acts.iter().any(ActType::is_dissolution) {
                profile.dissolutions.push((fecha, reference));
            }
        }

        profile
    }

    /// Last capital figure filed on or before `date`
    fn capital_filing(&self, date: NaiveDate) -> Option<&(NaiveDate, f64)> {
        self.capital_history.iter().rev().find(|(fecha, _)| *fecha <= date)
    }

    /// Capital in force on `date`; `None` when nothing was filed by then
    pub fn capital_at(&self, date: NaiveDate) -> Option<f64> {
        self.capital_filing(date).map(|(_, capital)| *capital)
    }

    /// Reference of the filing that carried the capital used for `date`
    pub fn capital_reference(&self, date: NaiveDate) -> Option<String> {
        let prefix = self.capital_filing(date)?.0.format("%Y-%m-%d").to_string();
        self.references
            .iter()
            .find(|r| r.starts_with(&prefix))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Person;

    fn entry(fecha: &str, numero: &str, acts: &[ActType]) -> RegistryEntry {
        let mut e = RegistryEntry::new(numero.to_string(), "ACME SL".to_string(), "MADRID".to_string());
        e.acts = acts.iter().copied().collect();
        e.stamp_date(fecha);
        e
    }

    #[test]
    fn test_plan_reads_each_day_once() {
        let mut index = CompanyIndex::new();
        index.insert(
            "ACME".to_string(),
            ["2024-01-02", "2024-01-03"].iter().map(|s| s.to_string()).collect(),
        );
        index.insert(
            "BETA".to_string(),
            ["2024-01-03"].iter().map(|s| s.to_string()).collect(),
        );

        let plan = plan_registry_reads(["ACME", "BETA", "MISSING"], &index);
        assert_eq!(plan.day_count(), 2);
        assert_eq!(plan.days["2024-01-03"].len(), 2);
        assert!(!plan.days.values().any(|set| set.contains("MISSING")));
    }

    #[test]
    fn test_collector_keeps_only_planned_companies() {
        let mut index = CompanyIndex::new();
        index.insert("ACME".to_string(), ["2024-01-02".to_string()].into_iter().collect());
        let plan = plan_registry_reads(["ACME"], &index);

        let mut other = entry("2024-01-02", "2", &[]);
        other.company = "OTRA COSA SA".to_string();

        let mut collector = ProfileCollector::new(&plan);
        collector.absorb_day("2024-01-02", vec![entry("2024-01-02", "1", &[]), other]);
        collector.absorb_day("2024-05-05", vec![entry("2024-05-05", "3", &[])]);
        let profiles = collector.finish();

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles["ACME"].references, vec!["2024-01-02#MADRID#1"]);
    }

    #[test]
    fn test_profile_from_entries() {
        let mut incorporation = entry("2024-01-10", "1", &[ActType::Incorporation]);
        incorporation.capital = Some(3000.0);
        incorporation.persons.push(Person {
            name: "Perez Ana".to_string(),
            role: "Administrador único".to_string(),
            section: ActSection::Appointments,
            fecha: String::new(),
        });
        incorporation.stamp_date("2024-01-10");

        let mut increase = entry("2024-06-01", "2", &[ActType::CapitalIncrease]);
        increase.capital = Some(60000.0);
        let dissolution = entry("2024-09-01", "3", &[ActType::Dissolution]);

        let profile = CompanyProfile::from_entries("ACME", &[dissolution, increase, incorporation]);
        assert_eq!(profile.incorporated, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(profile.officers.len(), 1);
        assert_eq!(profile.officer_events.len(), 1);
        assert_eq!(profile.dissolutions.len(), 1);

        let march = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let july = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(profile.capital_at(march), Some(3000.0));
        assert_eq!(profile.capital_at(july), Some(60000.0));
        assert_eq!(
            profile.capital_reference(march).as_deref(),
            Some("2024-01-10#MADRID#1")
        );
    }

    #[test]
    fn test_no_capital_before_first_filing() {
        let mut increase = entry("2024-06-01", "2", &[ActType::CapitalIncrease]);
        increase.capital = Some(60000.0);
        let profile = CompanyProfile::from_entries("ACME", &[increase]);

        let march = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(profile.capital_at(march), None);
        assert_eq!(profile.capital_reference(march), None);
    }
}
