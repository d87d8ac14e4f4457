//! Configuration management for transparencia
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Official bulletin source
    #[serde(default)]
    pub bulletin: BulletinConfig,

    /// Subsidy database source
    #[serde(default)]
    pub subsidies: SubsidiesConfig,

    /// HTTP fetching and pacing
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Cross-reference engine
    #[serde(default)]
    pub xref: XrefConfig,

    /// Anomaly engine thresholds
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Official bulletin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletinConfig {
    /// Base URL; summaries and detail pages are resolved against it
    #[serde(default = "default_bulletin_base_url")]
    pub base_url: String,

    /// Fetch detail pages for procurement items during ingest
    #[serde(default = "default_bulletin_enrich_on_ingest")]
    pub enrich_on_ingest: bool,
}

/// Subsidy database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsidiesConfig {
    #[serde(default = "default_subsidies_base_url")]
    pub base_url: String,

    #[serde(default = "default_subsidies_page_size")]
    pub page_size: u32,

    #[serde(default = "default_subsidies_max_pages")]
    pub max_pages: u32,

    /// Seconds a session cookie is trusted before it is re-acquired
    #[serde(default = "default_subsidies_session_ttl")]
    pub session_ttl_secs: u64,
}

/// HTTP fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Fixed delay between enrichment requests (milliseconds)
    #[serde(default = "default_fetch_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "default_fetch_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Registry files parsed at once when ingesting a directory
    #[serde(default = "default_fetch_parse_concurrency")]
    pub parse_concurrency: usize,
}

/// Cross-reference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrefConfig {
    /// Minimum confidence (0.0 - 1.0)
    #[serde(default = "default_xref_min_confidence")]
    pub min_confidence: f64,

    #[serde(default = "default_xref_max_results")]
    pub max_results: usize,

    /// Most recent records kept per side before scoring
    #[serde(default = "default_xref_max_inputs")]
    pub max_inputs: usize,
}

/// Anomaly engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_alerts_capital_threshold")]
    pub capital_threshold: f64,

    #[serde(default = "default_alerts_contract_threshold")]
    pub contract_threshold: f64,

    #[serde(default = "default_alerts_incorporation_window_months")]
    pub incorporation_window_months: u32,

    #[serde(default = "default_alerts_officer_window_days")]
    pub officer_window_days: i64,

    #[serde(default = "default_alerts_shared_admin_min")]
    pub shared_admin_min_companies: usize,

    #[serde(default = "default_alerts_shared_admin_high")]
    pub shared_admin_high_companies: usize,

    /// Folded phrases matched against the procedure type
    #[serde(default = "default_alerts_low_transparency_phrases")]
    pub low_transparency_phrases: Vec<String>,

    /// Default time window for `alerts` when no dates are given
    #[serde(default = "default_alerts_window_days")]
    pub window_days: i64,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for transparencia data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for BulletinConfig {
    fn default() -> Self {
        Self {
            base_url: default_bulletin_base_url(),
            enrich_on_ingest: default_bulletin_enrich_on_ingest(),
        }
    }
}

impl Default for SubsidiesConfig {
    fn default() -> Self {
        Self {
            base_url: default_subsidies_base_url(),
            page_size: default_subsidies_page_size(),
            max_pages: default_subsidies_max_pages(),
            session_ttl_secs: default_subsidies_session_ttl(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_fetch_delay_ms(),
            user_agent: default_fetch_user_agent(),
            timeout_secs: default_fetch_timeout(),
            parse_concurrency: default_fetch_parse_concurrency(),
        }
    }
}

impl Default for XrefConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_xref_min_confidence(),
            max_results: default_xref_max_results(),
            max_inputs: default_xref_max_inputs(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            capital_threshold: default_alerts_capital_threshold(),
            contract_threshold: default_alerts_contract_threshold(),
            incorporation_window_months: default_alerts_incorporation_window_months(),
            officer_window_days: default_alerts_officer_window_days(),
            shared_admin_min_companies: default_alerts_shared_admin_min(),
            shared_admin_high_companies: default_alerts_shared_admin_high(),
            low_transparency_phrases: default_alerts_low_transparency_phrases(),
            window_days: default_alerts_window_days(),
        }
    }
}

impl Config {
    /// Get the default base directory for transparencia (~/.transparencia)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".transparencia")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("transparencia.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("transparencia.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
            config.validate()?;
        } else {
            debug!("No config file found, using defaults");
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Check if transparencia is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.xref.min_confidence) {
            return Err(Error::Config(
                "xref.min_confidence must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.xref.max_inputs == 0 || self.xref.max_results == 0 {
            return Err(Error::Config(
                "xref.max_inputs and xref.max_results must be positive".to_string(),
            ));
        }

        if self.alerts.capital_threshold <= 0.0 || self.alerts.contract_threshold <= 0.0 {
            return Err(Error::Config(
                "alerts thresholds must be positive".to_string(),
            ));
        }

        if self.alerts.shared_admin_min_companies < 2 {
            return Err(Error::Config(
                "alerts.shared_admin_min_companies must be >= 2".to_string(),
            ));
        }

        if self.alerts.shared_admin_high_companies < self.alerts.shared_admin_min_companies {
            return Err(Error::Config(
                "alerts.shared_admin_high_companies must be >= alerts.shared_admin_min_companies"
                    .to_string(),
            ));
        }

        if self.alerts.officer_window_days < 0 || self.alerts.window_days <= 0 {
            return Err(Error::Config(
                "alerts windows must be positive".to_string(),
            ));
        }

        if self.subsidies.page_size == 0 {
            return Err(Error::Config(
                "subsidies.page_size must be positive".to_string(),
            ));
        }

        if self.fetch.parse_concurrency == 0 {
            return Err(Error::Config(
                "fetch.parse_concurrency must be positive".to_string(),
            ));
        }

        for (name, url) in [
            ("bulletin.base_url", &self.bulletin.base_url),
            ("subsidies.base_url", &self.subsidies.base_url),
        ] {
            url::Url::parse(url)
                .map_err(|e| Error::Config(format!("{} is not a valid URL: {}", name, e)))?;
        }

        Ok(())
    }
}

/// Get the database URL for sqlx
pub fn database_url(config: &Config) -> String {
    format!("sqlite://{}?mode=rwc", config.paths.db_file.display())
}
