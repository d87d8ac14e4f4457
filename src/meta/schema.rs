//! SQLite schema definition

/// SQL schema for the record store
pub const SCHEMA_SQL: &str = r#"
-- Bulletin records; the award details live apart so re-ingesting a day
-- never drops an enrichment
CREATE TABLE IF NOT EXISTS documents (
    identificador TEXT PRIMARY KEY,
    fecha TEXT NOT NULL,
    seccion_codigo TEXT NOT NULL,
    tipo TEXT NOT NULL,
    departamento TEXT NOT NULL,
    record_json TEXT NOT NULL,
    contrato_json TEXT,
    ingested_at TEXT NOT NULL,
    enriched_at TEXT
);

-- Subsidy calls; presupuesto is NULL until the budget pass fills it
CREATE TABLE IF NOT EXISTS subsidies (
    id TEXT PRIMARY KEY,
    fecha TEXT,
    nivel TEXT NOT NULL,
    record_json TEXT NOT NULL,
    presupuesto REAL,
    updated_at TEXT NOT NULL
);

-- Registry filings, partitioned by filing date and province
CREATE TABLE IF NOT EXISTS registry_entries (
    fecha TEXT NOT NULL,
    provincia TEXT NOT NULL,
    numero TEXT NOT NULL,
    empresa TEXT NOT NULL,
    company_key TEXT NOT NULL,
    entry_json TEXT NOT NULL,
    PRIMARY KEY (fecha, provincia, numero)
);

-- One row per ingested registry text, hashed to skip unchanged input
CREATE TABLE IF NOT EXISTS registry_sources (
    fecha TEXT NOT NULL,
    provincia TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    entries INTEGER NOT NULL DEFAULT 0,
    ingested_at TEXT NOT NULL,
    PRIMARY KEY (fecha, provincia)
);

-- Dates on which each canonical company name was filed
CREATE TABLE IF NOT EXISTS company_index (
    company_key TEXT NOT NULL,
    fecha TEXT NOT NULL,
    PRIMARY KEY (company_key, fecha)
);

-- Outcome of every upstream fetch
CREATE TABLE IF NOT EXISTS fetch_log (
    id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    fecha TEXT NOT NULL,
    status TEXT NOT NULL,
    records INTEGER NOT NULL DEFAULT 0,
    detail TEXT,
    fetched_at TEXT NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_documents_fecha ON documents(fecha);
CREATE INDEX IF NOT EXISTS idx_documents_section ON documents(seccion_codigo, fecha);
CREATE INDEX IF NOT EXISTS idx_subsidies_fecha ON subsidies(fecha);
CREATE INDEX IF NOT EXISTS idx_registry_fecha ON registry_entries(fecha);
CREATE INDEX IF NOT EXISTS idx_registry_company ON registry_entries(company_key);
CREATE INDEX IF NOT EXISTS idx_fetch_log_source ON fetch_log(source, fecha);
"#;
