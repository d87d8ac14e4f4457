//! Report and classify commands

use super::DateRange;
use crate::classify::classify_subsidy;
use crate::error::Result;
use crate::meta::MetaDb;
use crate::models::SubsidyRecord;
use crate::report::{
    awards_by_scope, count_by_section, count_by_type, subsidies_by_destination,
    subsidies_by_sector, top_awardees, AwardeeTotal, Bucket,
};
use crate::text::fold_lower;
use serde::Serialize;
use tracing::info;

/// Aggregated view of the records stored for a date range
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub desde: String,
    pub hasta: String,
    pub documentos: usize,
    pub adjudicaciones: usize,
    pub importe_adjudicado: f64,
    pub adjudicatarios: Vec<AwardeeTotal>,
    pub por_ambito: Vec<Bucket>,
    pub por_tipo: Vec<Bucket>,
    pub por_seccion: Vec<Bucket>,
    pub subvenciones: usize,
    pub por_sector: Vec<Bucket>,
    pub por_destino: Vec<Bucket>,
}

/// Build the aggregate report for `range`
pub async fn cmd_report(db: &MetaDb, range: DateRange, top: usize) -> Result<ReportSummary> {
    info!("Building report for {}", range);

    let documents = db.documents_between(range.from, range.to).await?;
    let subsidies = db.subsidies_between(range.from, range.to).await?;

    let awards: Vec<_> = documents.iter().filter(|d| d.awardee().is_some()).collect();
    let importe_adjudicado: f64 = awards.iter().filter_map(|d| d.amount()).sum();

    Ok(ReportSummary {
        desde: range.from.to_string(),
        hasta: range.to.to_string(),
        documentos: documents.len(),
        adjudicaciones: awards.len(),
        importe_adjudicado,
        adjudicatarios: top_awardees(&documents, top),
        por_ambito: awards_by_scope(&documents),
        por_tipo: count_by_type(&documents),
        por_seccion: count_by_section(&documents),
        subvenciones: subsidies.len(),
        por_sector: subsidies_by_sector(&subsidies),
        por_destino: subsidies_by_destination(&subsidies),
    })
}

/// A stored subsidy with its computed tags
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedRow {
    #[serde(flatten)]
    pub record: SubsidyRecord,
    pub sector: &'static str,
    pub destino: &'static str,
}

/// Tag stored subsidies with sector and destination, optionally filtered by sector
pub async fn cmd_classify(
    db: &MetaDb,
    range: DateRange,
    sector: Option<&str>,
) -> Result<Vec<ClassifiedRow>> {
    let wanted = sector.map(fold_lower);
    let subsidies = db.subsidies_between(range.from, range.to).await?;
    let rows: Vec<ClassifiedRow> = subsidies
        .into_iter()
        .map(|record| {
            let tags = classify_subsidy(&record);
            let (sector, destino) = (tags.sector, tags.destino);
            ClassifiedRow {
                record,
                sector,
                destino,
            }
        })
        .filter(|row| wanted.as_deref().map_or(true, |s| fold_lower(row.sector) == s))
        .collect();
    info!("Classified {} subsidies for {}", rows.len(), range);
    Ok(rows)
}

fn print_buckets(title: &str, buckets: &[Bucket]) {
    if buckets.is_empty() {
        return;
    }
    println!("\n{}:", title);
    for bucket in buckets {
        match bucket.amount {
            Some(amount) => println!("  {:<40} {:>6}  {:>16.2} €", bucket.label, bucket.count, amount),
            None => println!("  {:<40} {:>6}", bucket.label, bucket.count),
        }
    }
}

/// Print the report to console
pub fn print_report(report: &ReportSummary) {
    println!("\n📈 Report {}..{}\n", report.desde, report.hasta);
    println!("Documents: {}", report.documentos);
    println!(
        "Awards: {} ({:.2} €)",
        report.adjudicaciones, report.importe_adjudicado
    );
    println!("Subsidy calls: {}", report.subvenciones);

    if !report.adjudicatarios.is_empty() {
        println!("\nTop awardees:");
        for (rank, awardee) in report.adjudicatarios.iter().enumerate() {
            println!(
                "  {:>2}. {:<40} {:>4} contracts  {:>16.2} €",
                rank + 1,
                awardee.name,
                awardee.contracts,
                awardee.amount
            );
        }
    }

    print_buckets("Awards by scope", &report.por_ambito);
    print_buckets("By type", &report.por_tipo);
    print_buckets("By section", &report.por_seccion);
    print_buckets("Subsidies by sector", &report.por_sector);
    print_buckets("Subsidies by destination", &report.por_destino);
}

/// Print classified subsidies to console
pub fn print_classified(rows: &[ClassifiedRow]) {
    if rows.is_empty() {
        println!("No subsidies in range.");
        return;
    }
    for row in rows {
        println!("• {} [{} / {}]", row.record.id, row.sector, row.destino);
        println!("  {}", row.record.description);
        if let Some(budget) = row.record.budget {
            println!("  Presupuesto: {:.2} €", budget);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{AdministrativeLevel, DocumentRecord, DocumentType, ProcurementEnrichment};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    async fn setup() -> (MetaDb, TempDir) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.db_file = tmp.path().join("test.db");
        let db = MetaDb::open(&config).await.unwrap();
        (db, tmp)
    }

    fn subsidy(id: &str, description: &str, budget: Option<f64>) -> SubsidyRecord {
        SubsidyRecord {
            id: id.to_string(),
            fecha: Some(day()),
            description: description.to_string(),
            level: AdministrativeLevel::Local,
            awarding_body: None,
            department: None,
            mrr: false,
            budget,
        }
    }

    #[tokio::test]
    async fn test_report_totals() {
        let (db, _tmp) = setup().await;
        let award = |id: &str, name: &str, amount: f64| DocumentRecord {
            id: id.to_string(),
            fecha: day(),
            title: "Anuncio de formalización".to_string(),
            doc_type: DocumentType::Announcement,
            department: "AYUNTAMIENTO DE SORIA".to_string(),
            section: "V. Anuncios".to_string(),
            section_code: "5A".to_string(),
            heading: None,
            url_pdf: None,
            url_html: None,
            url_xml: None,
            procurement: Some(ProcurementEnrichment {
                amount: Some(amount),
                awardee: Some(name.to_string()),
                ..Default::default()
            }),
        };
        db.upsert_documents(&[
            award("BOE-B-2024-1", "Acme, S.L.", 1000.0),
            award("BOE-B-2024-2", "ACME SL", 500.0),
            award("BOE-B-2024-3", "Beta, S.A.", 1200.0),
        ])
        .await
        .unwrap();
        db.upsert_subsidies(&[subsidy("1", "Becas de comedor escolar", Some(100.0))])
            .await
            .unwrap();

        let report = cmd_report(&db, DateRange::single(day()), 5).await.unwrap();
        assert_eq!(report.documentos, 3);
        assert_eq!(report.adjudicaciones, 3);
        assert_eq!(report.importe_adjudicado, 2700.0);
        assert_eq!(report.adjudicatarios[0].contracts, 2);
        assert_eq!(report.adjudicatarios[0].amount, 1500.0);
        assert_eq!(report.subvenciones, 1);
        assert_eq!(report.por_sector.iter().map(|b| b.count).sum::<usize>(), 1);
    }

    #[tokio::test]
    async fn test_classify_filter() {
        let (db, _tmp) = setup().await;
        db.upsert_subsidies(&[
            subsidy("1", "Becas de comedor escolar", None),
            subsidy("2", "Ayudas a la modernización de regadíos agrícolas", None),
        ])
        .await
        .unwrap();

        let all = cmd_classify(&db, DateRange::single(day()), None).await.unwrap();
        assert_eq!(all.len(), 2);

        let sector = all[0].sector;
        let filtered = cmd_classify(&db, DateRange::single(day()), Some(sector))
            .await
            .unwrap();
        assert!(!filtered.is_empty());
        assert!(filtered.iter().all(|r| r.sector == sector));
    }
}
