//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::meta::MetaDb;
use std::path::PathBuf;
use tracing::info;

/// Write a default config and create the record store schema
///
/// An existing config is kept unless `force` is set. The schema is created
/// idempotently either way.
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<Config> {
    let mut config = Config::load_from(base_dir.clone())?;

    if config.paths.config_file.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config.paths.config_file.display()
        )));
    }

    if force {
        let paths = config.paths.clone();
        config = Config::default();
        config.paths = paths;
    }

    std::fs::create_dir_all(&config.paths.base_dir)?;
    config.save()?;

    let db = MetaDb::connect(&config).await?;
    db.init_schema().await?;
    info!("Initialized store at {:?}", config.paths.db_file);

    Ok(config)
}
