//! Alerts command implementation
//!
//! Loads enriched awards, plans the registry day partitions their
//! counterparties appear in, reads each partition once and runs the rules.

use super::DateRange;
use crate::alerts::{
    awarded_company_keys, detect_alerts, plan_registry_reads, Alert, ProfileCollector, Severity,
};
use crate::config::Config;
use crate::error::Result;
use crate::meta::MetaDb;
use crate::progress::StageProgress;
use serde::Serialize;
use tracing::{debug, info};

/// Alerts over a date range
#[derive(Debug, Clone, Serialize)]
pub struct AlertReport {
    pub desde: String,
    pub hasta: String,
    pub adjudicaciones: usize,
    pub empresas_con_registro: usize,
    pub alertas: Vec<Alert>,
}

/// Run the anomaly rules over awards published in `range`
pub async fn cmd_alerts(
    config: &Config,
    db: &MetaDb,
    range: DateRange,
    show_progress: bool,
) -> Result<AlertReport> {
    let records = db.enriched_between(range.from, range.to).await?;
    let keys = awarded_company_keys(&records);
    info!("{} enriched awards, {} counterparties for {}", records.len(), keys.len(), range);

    let index = db.company_index(keys.iter().map(String::as_str)).await?;
    let plan = plan_registry_reads(keys.iter().map(String::as_str), &index);
    debug!("Reading {} registry day partitions", plan.day_count());

    let mut collector = ProfileCollector::new(&plan);
    let progress = StageProgress::start(plan.day_count(), "registry days", show_progress);
    for fecha in plan.days.keys() {
        progress.advance(fecha);
        let entries = db.registry_entries_on(fecha).await?;
        collector.absorb_day(fecha, entries);
    }
    progress.finish("registry read");

    let profiles = collector.finish();
    let alertas = detect_alerts(&records, &profiles, &config.alerts);
    info!("{} alerts", alertas.len());

    Ok(AlertReport {
        desde: range.from.to_string(),
        hasta: range.to.to_string(),
        adjudicaciones: records.len(),
        empresas_con_registro: profiles.len(),
        alertas,
    })
}

/// Print alerts to console
pub fn print_alerts(report: &AlertReport) {
    println!(
        "\n🚩 {} alerts ({} awards, {} companies with registry history, {}..{})\n",
        report.alertas.len(),
        report.adjudicaciones,
        report.empresas_con_registro,
        report.desde,
        report.hasta
    );

    for alert in &report.alertas {
        let marker = match alert.severity {
            Severity::High => "‼",
            Severity::Medium => "!",
        };
        print!("{} [{}] {}", marker, alert.kind, alert.company);
        match alert.amount {
            Some(amount) => println!("  {:.2} €", amount),
            None => println!(),
        }
        if !alert.documents.is_empty() {
            println!("  Documentos: {}", alert.documents.join(", "));
        }
        if !alert.registry_refs.is_empty() {
            println!("  Registros: {}", alert.registry_refs.join(", "));
        }
        if let Ok(detail) = serde_json::to_string(&alert.detail) {
            println!("  {}", detail);
        }
    }
}
