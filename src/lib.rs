//! transparencia - ingest and cross-reference Spanish public-sector disclosures
//!
//! This crate provides:
//! - Ingestion of the daily official bulletin, the subsidy database and
//!   commercial registry texts into a local SQLite store
//! - Procurement detail enrichment and subsidy budget lookups
//! - Subsidy classification, cross-referencing and aggregate reports
//! - Red-flag alerts joining procurement awards with registry histories

pub mod alerts;
pub mod classify;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetch;
pub mod meta;
pub mod models;
pub mod parse;
pub mod progress;
pub mod report;
pub mod text;
pub mod xref;

pub use config::Config;
pub use error::{Error, Result};
