//! Default values for configuration

/// Default official bulletin base URL
pub fn default_bulletin_base_url() -> String {
    std::env::var("TRANSPARENCIA_BOE_URL").unwrap_or_else(|_| "https://www.boe.es".to_string())
}

/// Default: enrich procurement items right after ingesting a day
pub fn default_bulletin_enrich_on_ingest() -> bool {
    false
}

/// Default subsidy database API base URL
pub fn default_subsidies_base_url() -> String {
    std::env::var("TRANSPARENCIA_BDNS_URL").unwrap_or_else(|_| {
        "https://www.infosubvenciones.es/bdnstrans/api".to_string()
    })
}

/// Default page size for subsidy searches
pub fn default_subsidies_page_size() -> u32 {
    50
}

/// Default maximum pages fetched per subsidy search
pub fn default_subsidies_max_pages() -> u32 {
    20
}

/// Default session lifetime before re-acquiring (seconds)
pub fn default_subsidies_session_ttl() -> u64 {
    900
}

/// Default delay between enrichment requests (milliseconds)
pub fn default_fetch_delay_ms() -> u64 {
    500
}

/// Default user agent
pub fn default_fetch_user_agent() -> String {
    format!(
        "transparencia/{} (Public Disclosure Indexer)",
        env!("CARGO_PKG_VERSION")
    )
}

/// Default request timeout in seconds
pub fn default_fetch_timeout() -> u64 {
    30
}

/// Default maximum concurrently parsed registry files
pub fn default_fetch_parse_concurrency() -> usize {
    4
}

/// Default minimum cross-reference confidence
pub fn default_xref_min_confidence() -> f64 {
    0.3
}

/// Default maximum cross-references returned
pub fn default_xref_max_results() -> usize {
    100
}

/// Default maximum records per side before pairwise scoring
pub fn default_xref_max_inputs() -> usize {
    500
}

/// Default capital below which a company counts as thinly capitalized
pub fn default_alerts_capital_threshold() -> f64 {
    10_000.0
}

/// Default contract amount above which capital is checked
pub fn default_alerts_contract_threshold() -> f64 {
    100_000.0
}

/// Default incorporation window before an award (months)
pub fn default_alerts_incorporation_window_months() -> u32 {
    6
}

/// Default officer-change window around an award (days)
pub fn default_alerts_officer_window_days() -> i64 {
    60
}

/// Default minimum companies for a shared-administrator alert
pub fn default_alerts_shared_admin_min() -> usize {
    2
}

/// Default company count at which a shared administrator is high severity
pub fn default_alerts_shared_admin_high() -> usize {
    3
}

/// Default folded phrases marking a low-transparency procedure
pub fn default_alerts_low_transparency_phrases() -> Vec<String> {
    vec![
        "negociado sin publicidad".to_string(),
        "sin publicidad".to_string(),
        "adjudicacion directa".to_string(),
    ]
}

/// Default look-back window for alert detection (days)
pub fn default_alerts_window_days() -> i64 {
    90
}
