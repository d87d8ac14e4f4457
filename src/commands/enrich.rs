//! Enrichment passes: procurement details and subsidy budgets
//!
//! Both passes are paced and keep going past individual failures.

use super::DateRange;
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{BulletinClient, SubsidyClient};
use crate::meta::{FetchLogEntry, FetchSource, FetchStatus, MetaDb};
use crate::parse::{enrich_document, extract_procurement, flatten_markup};
use crate::progress::StageProgress;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Statistics from an enrichment pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichStats {
    pub attempted: usize,
    pub enriched: usize,
    pub without_data: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Fetch and merge detail pages for unenriched procurement records in `range`
pub async fn cmd_enrich_bulletin(
    config: &Config,
    db: &MetaDb,
    range: DateRange,
    limit: usize,
    show_progress: bool,
) -> Result<EnrichStats> {
    let client = BulletinClient::from_config(config)?;
    enrich_pending_documents(db, &client, range, limit, show_progress).await
}

pub(crate) async fn enrich_pending_documents(
    db: &MetaDb,
    client: &BulletinClient,
    range: DateRange,
    limit: usize,
    show_progress: bool,
) -> Result<EnrichStats> {
    let pending = db.pending_enrichment(range.from, range.to, limit).await?;
    info!("Enriching {} procurement records for {}", pending.len(), range);

    let mut stats = EnrichStats::default();
    let progress = StageProgress::start(pending.len(), "details", show_progress);

    for mut record in pending {
        stats.attempted += 1;
        progress.advance(&record.id);

        let xml = match client.fetch_detail(&record.id).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!("{}: detail fetch failed: {}", record.id, e);
                stats.failed += 1;
                stats.errors.push(format!("{}: {}", record.id, e));
                db.log_fetch(
                    &FetchLogEntry::new(FetchSource::Detail, &record.fecha.to_string(), FetchStatus::Failed, 0)
                        .with_detail(format!("{}: {}", record.id, e)),
                )
                .await?;
                continue;
            }
        };

        let extracted = extract_procurement(&flatten_markup(&xml));
        if extracted.amount.is_none() && extracted.awardee.is_none() {
            debug!("{}: no award fields found", record.id);
            stats.without_data += 1;
        }

        if !enrich_document(&mut record, extracted) {
            continue;
        }
        if let Some(enrichment) = &record.procurement {
            if db.set_enrichment(&record.id, enrichment).await? {
                stats.enriched += 1;
            }
        }
    }

    progress.finish("details done");
    Ok(stats)
}

/// Fetch budgets for subsidy calls that have none yet
pub async fn cmd_enrich_subsidies(
    config: &Config,
    db: &MetaDb,
    limit: usize,
    show_progress: bool,
) -> Result<EnrichStats> {
    let pending = db.pending_budgets(limit).await?;
    info!("Fetching budgets for {} subsidy calls", pending.len());

    let mut client = SubsidyClient::from_config(config)?;
    let mut stats = EnrichStats::default();
    let progress = StageProgress::start(pending.len(), "budgets", show_progress);

    for subsidy in pending {
        stats.attempted += 1;
        progress.advance(&subsidy.id);

        match client.fetch_budget(&subsidy.id).await {
            Ok(Some(budget)) => {
                if db.set_budget(&subsidy.id, budget).await? {
                    stats.enriched += 1;
                }
            }
            Ok(None) => {
                debug!("{}: no budget in payload", subsidy.id);
                stats.without_data += 1;
            }
            Err(e) => {
                warn!("{}: budget fetch failed: {}", subsidy.id, e);
                stats.failed += 1;
                stats.errors.push(format!("{}: {}", subsidy.id, e));
            }
        }
    }

    progress.finish("budgets done");
    Ok(stats)
}

/// Print enrichment statistics
pub fn print_enrich_stats(label: &str, stats: &EnrichStats) {
    println!("\n✓ {} enrichment complete", label);
    println!("  Attempted: {}", stats.attempted);
    println!("  Enriched: {}", stats.enriched);
    println!("  Without data: {}", stats.without_data);
    println!("  Failed: {}", stats.failed);
    for error in &stats.errors {
        println!("  ⚠ {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdministrativeLevel, DocumentRecord, DocumentType, SubsidyRecord};
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DETAIL: &str = "<documento><texto>\
        <p>7. Tipo de procedimiento: Abierto.</p>\
        <p>12. Adjudicatario: 12.1) Nombre: Acme Soluciones, S.L. 12.2) Número de identificación fiscal: B12345678.</p>\
        <p>13. Valor de la oferta: 13.1) Valor de la oferta seleccionada: 5.785,12 euros.</p>\
        </texto></documento>";

    async fn setup(server: &MockServer) -> (Config, MetaDb, TempDir) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.db_file = tmp.path().join("test.db");
        config.bulletin.base_url = server.uri();
        config.subsidies.base_url = server.uri();
        config.fetch.delay_ms = 0;
        config.fetch.timeout_secs = 5;
        let db = MetaDb::connect(&config).await.unwrap();
        db.init_schema().await.unwrap();
        (config, db, tmp)
    }

    fn procurement(id: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.to_string(),
            fecha: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            title: "Anuncio de formalización".to_string(),
            doc_type: DocumentType::Announcement,
            department: "MINISTERIO DE DEFENSA".to_string(),
            section: "V. Anuncios".to_string(),
            section_code: "5A".to_string(),
            heading: None,
            url_pdf: None,
            url_html: None,
            url_xml: None,
            procurement: None,
        }
    }

    #[tokio::test]
    async fn test_failed_detail_does_not_stop_batch() {
        let server = MockServer::start().await;
        let (config, db, _tmp) = setup(&server).await;
        Mock::given(method("GET"))
            .and(path("/diario_boe/xml.php"))
            .and(query_param("id", "BOE-B-2024-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/diario_boe/xml.php"))
            .and(query_param("id", "BOE-B-2024-2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        db.upsert_documents(&[procurement("BOE-B-2024-1"), procurement("BOE-B-2024-2")])
            .await
            .unwrap();
        let range = DateRange::single(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let stats = cmd_enrich_bulletin(&config, &db, range, 10, false).await.unwrap();

        assert_eq!(stats.attempted, 2);
        assert_eq!(stats.enriched, 1);
        assert_eq!(stats.failed, 1);

        let enriched = db.get_document("BOE-B-2024-1").await.unwrap().unwrap();
        assert_eq!(enriched.amount(), Some(5785.12));
        assert_eq!(enriched.procurement.unwrap().awardee_tax_id.as_deref(), Some("B12345678"));

        // a second pass only retries the failure
        let again = cmd_enrich_bulletin(&config, &db, range, 10, false).await.unwrap();
        assert_eq!(again.attempted, 1);
    }

    #[tokio::test]
    async fn test_pending_documents_respect_limit() {
        let server = MockServer::start().await;
        let (config, db, _tmp) = setup(&server).await;
        Mock::given(method("GET"))
            .and(path("/diario_boe/xml.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL))
            .mount(&server)
            .await;

        db.upsert_documents(&[procurement("BOE-B-2024-1"), procurement("BOE-B-2024-2")])
            .await
            .unwrap();
        let client = BulletinClient::from_config(&config).unwrap();
        let range = DateRange::single(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let first = enrich_pending_documents(&db, &client, range, 1, false).await.unwrap();
        assert_eq!(first.attempted, 1);
        assert_eq!(first.enriched, 1);

        let rest = enrich_pending_documents(&db, &client, range, 10, false).await.unwrap();
        assert_eq!(rest.attempted, 1);
    }

    #[tokio::test]
    async fn test_budget_pass() {
        let server = MockServer::start().await;
        let (config, db, _tmp) = setup(&server).await;
        Mock::given(method("GET"))
            .and(path("/sesion"))
            .respond_with(ResponseTemplate::new(200).append_header("set-cookie", "SESSION=s"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/convocatorias"))
            .and(query_param("numConv", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"presupuestoTotal": 0})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/convocatorias"))
            .and(query_param("numConv", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let subsidy = |id: &str| SubsidyRecord {
            id: id.to_string(),
            fecha: NaiveDate::from_ymd_opt(2024, 3, 1),
            description: "Becas".to_string(),
            level: AdministrativeLevel::Local,
            awarding_body: None,
            department: None,
            mrr: false,
            budget: None,
        };
        db.upsert_subsidies(&[subsidy("1"), subsidy("2")]).await.unwrap();

        let stats = cmd_enrich_subsidies(&config, &db, 10, false).await.unwrap();
        assert_eq!(stats.enriched, 1);
        assert_eq!(stats.without_data, 1);
        assert_eq!(db.get_subsidy("1").await.unwrap().unwrap().budget, Some(0.0));
        assert_eq!(db.pending_budgets(10).await.unwrap().len(), 1);
    }
}
