//! Record storage using SQLite
//!
//! This module handles all local storage including:
//! - Bulletin records and their one-time procurement enrichment
//! - Subsidy calls and their budgets
//! - Registry entries, partitioned by filing date and province
//! - The company index used to plan registry reads
//! - The fetch log (per-day outcome of every upstream fetch)
//!
//! Writes are last-write-wins by identifier. Enrichment and known budgets
//! are never overwritten by a later plain ingest.

mod schema;

pub use schema::*;

use crate::alerts::CompanyIndex;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{DocumentRecord, ProcurementEnrichment, RegistryEntry, SubsidyRecord};
use crate::parse::PROCUREMENT_SECTION_CODE;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Upstream a fetch went to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    Bulletin,
    Detail,
    Subsidies,
    Registry,
}

impl std::fmt::Display for FetchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchSource::Bulletin => write!(f, "bulletin"),
            FetchSource::Detail => write!(f, "detail"),
            FetchSource::Subsidies => write!(f, "subsidies"),
            FetchSource::Registry => write!(f, "registry"),
        }
    }
}

impl FromStr for FetchSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bulletin" => Ok(FetchSource::Bulletin),
            "detail" => Ok(FetchSource::Detail),
            "subsidies" => Ok(FetchSource::Subsidies),
            "registry" => Ok(FetchSource::Registry),
            _ => Err(Error::Config(format!("Unknown fetch source: {}", s))),
        }
    }
}

/// Fetch outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    /// Records were stored
    Published,
    /// Well-formed answer with nothing in it (weekend, holiday)
    Empty,
    /// Input identical to what is already stored
    Unchanged,
    Failed,
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchStatus::Published => write!(f, "published"),
            FetchStatus::Empty => write!(f, "empty"),
            FetchStatus::Unchanged => write!(f, "unchanged"),
            FetchStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for FetchStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "published" => Ok(FetchStatus::Published),
            "empty" => Ok(FetchStatus::Empty),
            "unchanged" => Ok(FetchStatus::Unchanged),
            "failed" => Ok(FetchStatus::Failed),
            _ => Err(Error::Config(format!("Unknown fetch status: {}", s))),
        }
    }
}

/// A fetch log row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub id: String,
    pub source: String,
    pub fecha: String,
    pub status: String,
    pub records: i64,
    pub detail: Option<String>,
    pub fetched_at: String,
}

impl FetchLogEntry {
    pub fn new(source: FetchSource, fecha: &str, status: FetchStatus, records: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            fecha: fecha.to_string(),
            status: status.to_string(),
            records: records as i64,
            detail: None,
            fetched_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn get_status(&self) -> Result<FetchStatus> {
        self.status.parse()
    }
}

/// Row counts across the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub documents: usize,
    pub procurement_documents: usize,
    pub enriched_documents: usize,
    pub subsidies: usize,
    pub subsidies_with_budget: usize,
    pub registry_entries: usize,
    pub registry_days: usize,
    pub companies: usize,
    pub first_document_date: Option<String>,
    pub last_document_date: Option<String>,
}

/// Record store handle
#[derive(Clone)]
pub struct MetaDb {
    pool: SqlitePool,
}

impl MetaDb {
    /// Connect to the database configured in `config`
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::connect_path(&config.paths.db_file).await
    }

    /// Connect to a database file, creating it if missing
    pub async fn connect_path(db_path: &Path) -> Result<Self> {
        // Create parent directory if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Connect and create the schema when the file is new
    pub async fn open(config: &Config) -> Result<Self> {
        let db = Self::connect(config).await?;
        if !db.is_initialized().await? {
            db.init_schema().await?;
        }
        Ok(db)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='documents'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    // ===== Bulletin Records =====

    /// Insert or replace bulletin records by identifier
    ///
    /// An existing enrichment is kept; an incoming one is stored only when
    /// the record had none.
    pub async fn upsert_documents(&self, records: &[DocumentRecord]) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let mut plain = record.clone();
            let contrato = plain.procurement.take();
            let contrato_json = contrato.as_ref().map(serde_json::to_string).transpose()?;

            sqlx::query(
                r#"
                INSERT INTO documents (identificador, fecha, seccion_codigo, tipo, departamento,
                                       record_json, contrato_json, ingested_at, enriched_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(identificador) DO UPDATE SET
                    fecha = excluded.fecha,
                    seccion_codigo = excluded.seccion_codigo,
                    tipo = excluded.tipo,
                    departamento = excluded.departamento,
                    record_json = excluded.record_json,
                    contrato_json = COALESCE(documents.contrato_json, excluded.contrato_json),
                    enriched_at = COALESCE(documents.enriched_at, excluded.enriched_at),
                    ingested_at = excluded.ingested_at
                "#,
            )
            .bind(&plain.id)
            .bind(plain.fecha.to_string())
            .bind(&plain.section_code)
            .bind(plain.doc_type.label())
            .bind(&plain.department)
            .bind(serde_json::to_string(&plain)?)
            .bind(contrato_json.as_deref())
            .bind(&now)
            .bind(contrato.as_ref().map(|_| now.clone()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    /// Store the enrichment of one record unless it already has one
    ///
    /// Returns `false` when the record is unknown or was already enriched.
    pub async fn set_enrichment(&self, id: &str, enrichment: &ProcurementEnrichment) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET contrato_json = ?, enriched_at = ?
            WHERE identificador = ? AND contrato_json IS NULL
            "#,
        )
        .bind(serde_json::to_string(enrichment)?)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Get one bulletin record by identifier
    pub async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let row: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT record_json, contrato_json FROM documents WHERE identificador = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(assemble_document).transpose()
    }

    /// Bulletin records published between `from` and `to` inclusive
    pub async fn documents_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DocumentRecord>> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT record_json, contrato_json FROM documents
            WHERE fecha BETWEEN ? AND ?
            ORDER BY fecha DESC, identificador
            "#,
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(assemble_document).collect()
    }

    /// Procurement records in range that still lack an enrichment
    pub async fn pending_enrichment(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        limit: usize,
    ) -> Result<Vec<DocumentRecord>> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT record_json, contrato_json FROM documents
            WHERE seccion_codigo = ? AND contrato_json IS NULL AND fecha BETWEEN ? AND ?
            ORDER BY fecha DESC, identificador
            LIMIT ?
            "#,
        )
        .bind(PROCUREMENT_SECTION_CODE)
        .bind(from.to_string())
        .bind(to.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(assemble_document).collect()
    }

    /// Enriched procurement records in range
    pub async fn enriched_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DocumentRecord>> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT record_json, contrato_json FROM documents
            WHERE contrato_json IS NOT NULL AND fecha BETWEEN ? AND ?
            ORDER BY fecha DESC, identificador
            "#,
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(assemble_document).collect()
    }

    // ===== Subsidies =====

    /// Insert or replace subsidy calls; a known budget survives a null one
    pub async fn upsert_subsidies(&self, records: &[SubsidyRecord]) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO subsidies (id, fecha, nivel, record_json, presupuesto, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    fecha = excluded.fecha,
                    nivel = excluded.nivel,
                    record_json = excluded.record_json,
                    presupuesto = COALESCE(excluded.presupuesto, subsidies.presupuesto),
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&record.id)
            .bind(record.fecha.map(|f| f.to_string()))
            .bind(record.level.as_str())
            .bind(serde_json::to_string(record)?)
            .bind(record.budget)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len())
    }

    /// Record a subsidy's budget (zero included)
    pub async fn set_budget(&self, id: &str, budget: f64) -> Result<bool> {
        let result = sqlx::query("UPDATE subsidies SET presupuesto = ?, updated_at = ? WHERE id = ?")
            .bind(budget)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Subsidy calls whose budget was never fetched, newest first
    pub async fn pending_budgets(&self, limit: usize) -> Result<Vec<SubsidyRecord>> {
        let rows: Vec<(String, Option<f64>)> = sqlx::query_as(
            r#"
            SELECT record_json, presupuesto FROM subsidies
            WHERE presupuesto IS NULL
            ORDER BY fecha DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(assemble_subsidy).collect()
    }

    /// Subsidy calls received between `from` and `to` inclusive
    pub async fn subsidies_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<SubsidyRecord>> {
        let rows: Vec<(String, Option<f64>)> = sqlx::query_as(
            r#"
            SELECT record_json, presupuesto FROM subsidies
            WHERE fecha BETWEEN ? AND ?
            ORDER BY fecha DESC, id DESC
            "#,
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(assemble_subsidy).collect()
    }

    /// Get one subsidy call by identifier
    pub async fn get_subsidy(&self, id: &str) -> Result<Option<SubsidyRecord>> {
        let row: Option<(String, Option<f64>)> =
            sqlx::query_as("SELECT record_json, presupuesto FROM subsidies WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(assemble_subsidy).transpose()
    }

    // ===== Registry =====

    /// Hash of the registry text last ingested for a day and province
    pub async fn registry_source_hash(&self, fecha: &str, provincia: &str) -> Result<Option<String>> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT content_hash FROM registry_sources WHERE fecha = ? AND provincia = ?",
        )
        .bind(fecha)
        .bind(provincia)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hash)
    }

    /// Replace a day/province partition with freshly parsed entries
    ///
    /// Entries must already carry their filing date. The company index is
    /// updated in the same transaction.
    pub async fn replace_registry_day(
        &self,
        fecha: &str,
        provincia: &str,
        content_hash: &str,
        entries: &[RegistryEntry],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM registry_entries WHERE fecha = ? AND provincia = ?")
            .bind(fecha)
            .bind(provincia)
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            let company_key = entry.company_key();
            sqlx::query(
                r#"
                INSERT INTO registry_entries (fecha, provincia, numero, empresa, company_key, entry_json)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(fecha, provincia, numero) DO UPDATE SET
                    empresa = excluded.empresa,
                    company_key = excluded.company_key,
                    entry_json = excluded.entry_json
                "#,
            )
            .bind(fecha)
            .bind(provincia)
            .bind(&entry.numero)
            .bind(&entry.company)
            .bind(&company_key)
            .bind(serde_json::to_string(entry)?)
            .execute(&mut *tx)
            .await?;
        }

        // The index for a day is derived from that day's entries, all provinces
        sqlx::query("DELETE FROM company_index WHERE fecha = ?")
            .bind(fecha)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO company_index (company_key, fecha)
            SELECT DISTINCT company_key, fecha FROM registry_entries
            WHERE fecha = ? AND company_key != ''
            "#,
        )
        .bind(fecha)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO registry_sources (fecha, provincia, content_hash, entries, ingested_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(fecha, provincia) DO UPDATE SET
                content_hash = excluded.content_hash,
                entries = excluded.entries,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(fecha)
        .bind(provincia)
        .bind(content_hash)
        .bind(entries.len() as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(entries.len())
    }

    /// Every registry entry filed on `fecha`, all provinces
    pub async fn registry_entries_on(&self, fecha: &str) -> Result<Vec<RegistryEntry>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT entry_json FROM registry_entries WHERE fecha = ? ORDER BY provincia, numero",
        )
        .bind(fecha)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(Error::from))
            .collect()
    }

    /// Filing dates of the given companies
    pub async fn company_index<'a, I>(&self, company_keys: I) -> Result<CompanyIndex>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index = CompanyIndex::new();
        for key in company_keys {
            let dates: Vec<String> =
                sqlx::query_scalar("SELECT fecha FROM company_index WHERE company_key = ?")
                    .bind(key)
                    .fetch_all(&self.pool)
                    .await?;
            if !dates.is_empty() {
                index.insert(key.to_string(), dates.into_iter().collect());
            }
        }
        Ok(index)
    }

    // ===== Fetch Log =====

    /// Record a fetch outcome
    pub async fn log_fetch(&self, entry: &FetchLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fetch_log (id, source, fecha, status, records, detail, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.source)
        .bind(&entry.fecha)
        .bind(&entry.status)
        .bind(entry.records)
        .bind(&entry.detail)
        .bind(&entry.fetched_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Latest outcome recorded for a source and day
    pub async fn latest_fetch(&self, source: FetchSource, fecha: &str) -> Result<Option<FetchLogEntry>> {
        let entry = sqlx::query_as::<_, FetchLogEntry>(
            r#"
            SELECT * FROM fetch_log WHERE source = ? AND fecha = ?
            ORDER BY fetched_at DESC LIMIT 1
            "#,
        )
        .bind(source.to_string())
        .bind(fecha)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    /// Most recent fetch log rows
    pub async fn recent_fetches(&self, limit: usize) -> Result<Vec<FetchLogEntry>> {
        let entries = sqlx::query_as::<_, FetchLogEntry>(
            "SELECT * FROM fetch_log ORDER BY fetched_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    // ===== Statistics =====

    /// Row counts across the store
    pub async fn get_stats(&self) -> Result<StoreStats> {
        let documents = self.count("SELECT COUNT(*) FROM documents").await?;
        let enriched_documents = self
            .count("SELECT COUNT(*) FROM documents WHERE contrato_json IS NOT NULL")
            .await?;
        let procurement_documents: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE seccion_codigo = ?")
                .bind(PROCUREMENT_SECTION_CODE)
                .fetch_one(&self.pool)
                .await?;
        let subsidies = self.count("SELECT COUNT(*) FROM subsidies").await?;
        let subsidies_with_budget = self
            .count("SELECT COUNT(*) FROM subsidies WHERE presupuesto IS NOT NULL")
            .await?;
        let registry_entries = self.count("SELECT COUNT(*) FROM registry_entries").await?;
        let registry_days = self
            .count("SELECT COUNT(DISTINCT fecha) FROM registry_entries")
            .await?;
        let companies = self
            .count("SELECT COUNT(DISTINCT company_key) FROM company_index")
            .await?;
        let (first_document_date, last_document_date): (Option<String>, Option<String>) =
            sqlx::query_as("SELECT MIN(fecha), MAX(fecha) FROM documents")
                .fetch_one(&self.pool)
                .await?;

        Ok(StoreStats {
            documents,
            procurement_documents: procurement_documents as usize,
            enriched_documents,
            subsidies,
            subsidies_with_budget,
            registry_entries,
            registry_days,
            companies,
            first_document_date,
            last_document_date,
        })
    }

    async fn count(&self, sql: &str) -> Result<usize> {
        let n: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(n as usize)
    }
}

fn assemble_document((record_json, contrato_json): (String, Option<String>)) -> Result<DocumentRecord> {
    let mut record: DocumentRecord = serde_json::from_str(&record_json)?;
    record.procurement = contrato_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?;
    Ok(record)
}

fn assemble_subsidy((record_json, presupuesto): (String, Option<f64>)) -> Result<SubsidyRecord> {
    let mut record: SubsidyRecord = serde_json::from_str(&record_json)?;
    record.budget = presupuesto;
    Ok(record)
}
