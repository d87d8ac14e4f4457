//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::meta::{FetchLogEntry, MetaDb, StoreStats};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub stats: StoreStats,
    pub recent_fetches: Vec<FetchLogEntry>,
}

/// Get store status and the latest fetch outcomes
pub async fn cmd_status(config: &Config, db: &MetaDb, recent: usize) -> Result<StatusInfo> {
    info!("Getting status");

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        stats: db.get_stats().await?,
        recent_fetches: db.recent_fetches(recent).await?,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    let stats = &status.stats;
    println!("\n📊 transparencia Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);

    println!("\nBulletin:");
    println!("  Documents: {}", stats.documents);
    println!(
        "  Procurement: {} ({} enriched)",
        stats.procurement_documents, stats.enriched_documents
    );
    if let (Some(first), Some(last)) = (&stats.first_document_date, &stats.last_document_date) {
        println!("  Dates: {} .. {}", first, last);
    }

    println!("\nSubsidies:");
    println!("  Calls: {}", stats.subsidies);
    println!("  With budget: {}", stats.subsidies_with_budget);

    println!("\nRegistry:");
    println!("  Entries: {}", stats.registry_entries);
    println!("  Days: {}", stats.registry_days);
    println!("  Companies: {}", stats.companies);

    if !status.recent_fetches.is_empty() {
        println!("\nRecent fetches:");
        for entry in &status.recent_fetches {
            let marker = match entry.status.as_str() {
                "failed" => "✗",
                "empty" | "unchanged" => "·",
                _ => "✓",
            };
            print!(
                "  {} {:<9} {} {} ({} records)",
                marker, entry.source, entry.fecha, entry.status, entry.records
            );
            match &entry.detail {
                Some(detail) => println!(" - {}", detail),
                None => println!(),
            }
        }
    }
}
