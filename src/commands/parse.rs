//! Offline parse command
//!
//! Runs one parser over a saved source file and returns its output as JSON.
//! Nothing is fetched or stored.

use super::ingest::{normalize_province, province_from_stem};
use super::read_registry_text;
use crate::error::{Error, Result};
use crate::parse::{
    extract_procurement, flatten_markup, parse_registry_text, parse_subsidy_page, parse_summary_json,
};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

/// Kind of saved source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ParseKind {
    /// Daily bulletin summary JSON
    Summary,
    /// Bulletin detail XML
    Detail,
    /// Registry day text (or PDF with the `pdf` feature)
    Registry,
    /// Subsidy search page JSON
    Subsidies,
}

/// Parse a saved file into its JSON representation
pub fn cmd_parse(
    kind: ParseKind,
    path: &Path,
    fecha: Option<NaiveDate>,
    province: Option<&str>,
) -> Result<Value> {
    info!("Parsing {:?} file {:?}", kind, path);

    let value = match kind {
        ParseKind::Summary => {
            let fecha = fecha.ok_or_else(|| {
                Error::InvalidDate("--date is required to parse a summary".to_string())
            })?;
            let payload = std::fs::read_to_string(path)?;
            let outcome = parse_summary_json(&payload, fecha);
            let estado = outcome.status();
            json!({
                "fecha": fecha.to_string(),
                "estado": estado,
                "documentos": outcome.into_records(),
            })
        }
        ParseKind::Detail => {
            let xml = std::fs::read_to_string(path)?;
            serde_json::to_value(extract_procurement(&flatten_markup(&xml)))?
        }
        ParseKind::Registry => {
            let text = read_registry_text(path)?;
            let province = province
                .map(str::to_string)
                .or_else(|| province_from_stem(path))
                .map(|p| normalize_province(&p))
                .unwrap_or_default();
            let mut entries = parse_registry_text(&text, &province);
            if let Some(fecha) = fecha {
                let fecha = fecha.to_string();
                for entry in &mut entries {
                    entry.stamp_date(&fecha);
                }
            }
            serde_json::to_value(entries)?
        }
        ParseKind::Subsidies => {
            let payload: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            let page = parse_subsidy_page(&payload);
            json!({
                "total_paginas": page.total_pages,
                "convocatorias": page.records,
            })
        }
    };

    Ok(value)
}
