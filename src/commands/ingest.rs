//! Ingest command implementation
//!
//! Bulletin days and subsidy searches come from the upstream APIs; registry
//! bulletins come from local text (or PDF) files.

use super::enrich::enrich_pending_documents;
use super::DateRange;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{BulletinClient, SubsidyClient};
use crate::meta::{FetchLogEntry, FetchSource, FetchStatus, MetaDb};
use crate::models::RegistryEntry;
use crate::parse::{parse_registry_text, rules::is_province_name, SummaryOutcome};
use crate::progress::StageProgress;
use crate::text::fold_accents;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    pub days_published: usize,
    pub days_empty: usize,
    pub days_failed: usize,
    pub records_stored: usize,
    pub records_enriched: usize,
    pub files_unchanged: usize,
    pub errors: Vec<String>,
}

/// Ingest bulletin summaries for every day in `range`
///
/// A failed day is logged, recorded in the fetch log and skipped.
pub async fn cmd_ingest_bulletin(
    config: &Config,
    db: &MetaDb,
    range: DateRange,
    enrich: bool,
    show_progress: bool,
) -> Result<IngestStats> {
    info!("Ingesting bulletin summaries for {}", range);
    let client = BulletinClient::from_config(config)?;
    let mut stats = IngestStats::default();

    let progress = StageProgress::start(range.len(), "summaries", show_progress);
    for date in range.days() {
        let fecha = date.to_string();
        progress.advance(&fecha);

        let outcome = client.fetch_summary(date).await;
        let entry = match outcome {
            SummaryOutcome::Published(records) => {
                let stored = db.upsert_documents(&records).await?;
                info!("{}: stored {} records", fecha, stored);
                stats.days_published += 1;
                stats.records_stored += stored;
                FetchLogEntry::new(FetchSource::Bulletin, &fecha, FetchStatus::Published, stored)
            }
            SummaryOutcome::NoPublication => {
                info!("{}: no bulletin published", fecha);
                stats.days_empty += 1;
                FetchLogEntry::new(FetchSource::Bulletin, &fecha, FetchStatus::Empty, 0)
            }
            SummaryOutcome::Unavailable(reason) => {
                warn!("{}: summary unavailable ({})", fecha, reason);
                stats.days_failed += 1;
                stats.errors.push(format!("{}: {}", fecha, reason));
                FetchLogEntry::new(FetchSource::Bulletin, &fecha, FetchStatus::Failed, 0)
                    .with_detail(reason)
            }
        };
        db.log_fetch(&entry).await?;
    }
    progress.finish("summaries done");

    if enrich || config.bulletin.enrich_on_ingest {
        let enriched = enrich_pending_documents(db, &client, range, usize::MAX, show_progress).await?;
        stats.records_enriched = enriched.enriched;
        stats.errors.extend(enriched.errors);
    }

    Ok(stats)
}

/// Ingest subsidy calls received in `range`
pub async fn cmd_ingest_subsidies(config: &Config, db: &MetaDb, range: DateRange) -> Result<IngestStats> {
    info!("Ingesting subsidy calls for {}", range);
    let mut client = SubsidyClient::from_config(config)?;
    let mut stats = IngestStats::default();
    let fecha = range.to_string();

    match client.search(range.from, range.to).await {
        Ok(records) => {
            let stored = db.upsert_subsidies(&records).await?;
            let status = if stored == 0 {
                FetchStatus::Empty
            } else {
                FetchStatus::Published
            };
            stats.records_stored = stored;
            db.log_fetch(&FetchLogEntry::new(FetchSource::Subsidies, &fecha, status, stored))
                .await?;
        }
        Err(e) => {
            warn!("Subsidy search failed: {}", e);
            stats.errors.push(e.to_string());
            db.log_fetch(
                &FetchLogEntry::new(FetchSource::Subsidies, &fecha, FetchStatus::Failed, 0)
                    .with_detail(e.to_string()),
            )
            .await?;
        }
    }

    Ok(stats)
}

/// A registry bulletin file and the partition it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryFile {
    pub path: PathBuf,
    pub fecha: NaiveDate,
    pub province: String,
}

impl RegistryFile {
    /// Describe a single file; the province defaults to the file stem
    pub fn single(path: &Path, fecha: NaiveDate, province: Option<String>) -> Result<Self> {
        let province = match province {
            Some(p) => p,
            None => province_from_stem(path)
                .ok_or_else(|| Error::InvalidPath(format!("no province in {}", path.display())))?,
        };
        Ok(Self {
            path: path.to_path_buf(),
            fecha,
            province: normalize_province(&province),
        })
    }
}

/// Find `<dir>/<YYYY-MM-DD>/<PROVINCE>.txt` files (and `.pdf` with the `pdf` feature)
pub fn discover_registry_files(dir: &Path) -> Result<Vec<RegistryFile>> {
    if !dir.is_dir() {
        return Err(Error::InvalidPath(format!("not a directory: {}", dir.display())));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(2).max_depth(2).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_registry_extension(path) {
            continue;
        }

        let fecha = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .and_then(crate::models::parse_loose_date);
        let (Some(fecha), Some(province)) = (fecha, province_from_stem(path)) else {
            debug!("Skipping {} (not <date>/<province>)", path.display());
            continue;
        };

        files.push(RegistryFile {
            path: path.to_path_buf(),
            fecha,
            province: normalize_province(&province),
        });
    }
    Ok(files)
}

fn is_registry_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase) {
        Some(ext) if ext == "txt" => true,
        Some(ext) if ext == "pdf" => cfg!(feature = "pdf"),
        _ => false,
    }
}

pub(crate) fn province_from_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.replace('_', " "))
        .filter(|s| !s.trim().is_empty())
}

pub(crate) fn normalize_province(raw: &str) -> String {
    fold_accents(raw.trim()).to_uppercase()
}

/// Read a registry bulletin as text
pub fn read_registry_text(path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        return read_pdf_text(path);
    }
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(feature = "pdf")]
fn read_pdf_text(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))
}

#[cfg(not(feature = "pdf"))]
fn read_pdf_text(path: &Path) -> Result<String> {
    Err(Error::Parse(format!(
        "{}: PDF input needs the 'pdf' feature",
        path.display()
    )))
}

struct LoadedFile {
    file: RegistryFile,
    hash: String,
    text: String,
}

/// Ingest registry bulletin files
///
/// Files are read and hashed concurrently; texts whose hash matches the
/// stored one are skipped. The rest are parsed concurrently and written one
/// partition at a time.
pub async fn cmd_ingest_registry(
    config: &Config,
    db: &MetaDb,
    files: Vec<RegistryFile>,
    force: bool,
    show_progress: bool,
) -> Result<IngestStats> {
    info!("Ingesting {} registry files", files.len());
    let concurrency = config.fetch.parse_concurrency.max(1);
    let mut stats = IngestStats::default();

    let loaded: Vec<(RegistryFile, Result<(String, String)>)> = stream::iter(files)
        .map(|file| async move {
            let path = file.path.clone();
            let read = tokio::task::spawn_blocking(move || {
                let text = read_registry_text(&path)?;
                let hash = blake3::hash(text.as_bytes()).to_hex().to_string();
                Ok::<_, Error>((hash, text))
            })
            .await
            .map_err(Error::from)
            .and_then(|r| r);
            (file, read)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut changed = Vec::new();
    for (file, read) in loaded {
        let fecha = file.fecha.to_string();
        match read {
            Ok((hash, text)) => {
                let stored = db.registry_source_hash(&fecha, &file.province).await?;
                if !force && stored.as_deref() == Some(hash.as_str()) {
                    debug!("{} {} unchanged", fecha, file.province);
                    stats.files_unchanged += 1;
                    db.log_fetch(&FetchLogEntry::new(
                        FetchSource::Registry,
                        &fecha,
                        FetchStatus::Unchanged,
                        0,
                    ))
                    .await?;
                    continue;
                }
                if !is_province_name(&file.province) {
                    warn!("{}: unknown province {}", file.path.display(), file.province);
                }
                changed.push(LoadedFile { file, hash, text });
            }
            Err(e) => {
                warn!("Failed to read {}: {}", file.path.display(), e);
                stats.days_failed += 1;
                stats.errors.push(format!("{}: {}", file.path.display(), e));
                db.log_fetch(
                    &FetchLogEntry::new(FetchSource::Registry, &fecha, FetchStatus::Failed, 0)
                        .with_detail(e.to_string()),
                )
                .await?;
            }
        }
    }

    let progress = StageProgress::start(changed.len(), "registry files", show_progress);
    let mut parsed = stream::iter(changed)
        .map(|loaded| async move {
            let LoadedFile { file, hash, text } = loaded;
            let province = file.province.clone();
            let fecha = file.fecha.to_string();
            let entries = tokio::task::spawn_blocking(move || {
                let mut entries = parse_registry_text(&text, &province);
                for entry in &mut entries {
                    entry.stamp_date(&fecha);
                }
                entries
            })
            .await;
            (file, hash, entries)
        })
        .buffer_unordered(concurrency);

    while let Some((file, hash, entries)) = parsed.next().await {
        let fecha = file.fecha.to_string();
        progress.advance(&format!("{} {}", fecha, file.province));
        let entries: Vec<RegistryEntry> = entries?;

        let stored = db
            .replace_registry_day(&fecha, &file.province, &hash, &entries)
            .await?;
        info!("{} {}: {} entries", fecha, file.province, stored);
        stats.records_stored += stored;
        let status = if stored == 0 {
            stats.days_empty += 1;
            FetchStatus::Empty
        } else {
            stats.days_published += 1;
            FetchStatus::Published
        };
        db.log_fetch(
            &FetchLogEntry::new(FetchSource::Registry, &fecha, status, stored)
                .with_detail(file.province.clone()),
        )
        .await?;
    }
    progress.finish("registry done");

    Ok(stats)
}

/// Print ingestion statistics
pub fn print_ingest_stats(label: &str, stats: &IngestStats) {
    println!("\n✓ {} ingestion complete", label);
    println!("  Published: {}", stats.days_published);
    println!("  Empty: {}", stats.days_empty);
    println!("  Failed: {}", stats.days_failed);
    println!("  Records stored: {}", stats.records_stored);
    if stats.records_enriched > 0 {
        println!("  Records enriched: {}", stats.records_enriched);
    }
    if stats.files_unchanged > 0 {
        println!("  Unchanged files skipped: {}", stats.files_unchanged);
    }
    for error in &stats.errors {
        println!("  ⚠ {}", error);
    }
}
