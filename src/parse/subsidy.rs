//! Subsidy database search and detail payloads

use crate::models::{parse_loose_date, AdministrativeLevel, SubsidyRecord};
use crate::text::parse_amount;
use serde_json::Value;

/// One page of a subsidy search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubsidyPage {
    pub records: Vec<SubsidyRecord>,
    pub total_pages: u32,
}

/// Parse a search page (`content[]` plus `totalPages`)
///
/// Rows without an identifier or description are skipped. The search never
/// carries a budget, so `presupuesto` stays unknown until the budget pass.
pub fn parse_subsidy_page(payload: &Value) -> SubsidyPage {
    let records = payload
        .get("content")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().filter_map(parse_subsidy_row).collect())
        .unwrap_or_default();
    let total_pages = payload
        .get("totalPages")
        .and_then(Value::as_u64)
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(0);
    SubsidyPage {
        records,
        total_pages,
    }
}

fn parse_subsidy_row(row: &Value) -> Option<SubsidyRecord> {
    let id = text_or_number(row.get("numeroConvocatoria"))
        .or_else(|| text_or_number(row.get("id")))?;
    let description = row
        .get("descripcion")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())?
        .to_string();

    Some(SubsidyRecord {
        id,
        fecha: row
            .get("fechaRecepcion")
            .and_then(Value::as_str)
            .and_then(parse_loose_date),
        description,
        level: row
            .get("nivel1")
            .and_then(Value::as_str)
            .map(AdministrativeLevel::from_api)
            .unwrap_or_default(),
        awarding_body: non_empty(row.get("nivel3")),
        department: non_empty(row.get("nivel2")),
        mrr: row.get("mrr").and_then(Value::as_bool).unwrap_or(false),
        budget: None,
    })
}

/// Total budget from a call detail payload
///
/// A numeric zero is a real zero. Text budgets go through the amount parser.
pub fn parse_subsidy_budget(payload: &Value) -> Option<f64> {
    match payload.get("presupuestoTotal")? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

fn text_or_number(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
