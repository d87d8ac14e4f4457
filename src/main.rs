//! transparencia CLI entry point

use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use transparencia::{
    commands::{
        cmd_alerts, cmd_classify, cmd_enrich_bulletin, cmd_enrich_subsidies, cmd_ingest_bulletin,
        cmd_ingest_registry, cmd_ingest_subsidies, cmd_init, cmd_parse, cmd_report, cmd_status,
        cmd_xref, discover_registry_files, parse_cli_date, print_alerts, print_classified,
        print_enrich_stats, print_ingest_stats, print_report, print_status, print_xref_results,
        DateRange, ParseKind, RecordSet, RegistryFile, XrefOptions,
    },
    config::Config,
    error::{Error, Result},
    meta::MetaDb,
    progress::LogWriterFactory,
};

/// Days covered by read-only commands when no range is given
const DEFAULT_QUERY_DAYS: i64 = 30;

/// Rows shown in the status fetch log
const STATUS_RECENT_FETCHES: usize = 10;

#[derive(Parser)]
#[command(name = "transparencia")]
#[command(version, about = "Ingest and cross-reference Spanish public-sector disclosures", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Inclusive date range flags
#[derive(Args, Clone, Copy)]
struct RangeArgs {
    /// First day (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, value_parser = parse_cli_date)]
    from: Option<NaiveDate>,

    /// Last day, defaults to today
    #[arg(long, value_parser = parse_cli_date)]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    fn resolve(self, default_days: i64) -> Result<DateRange> {
        DateRange::resolve(self.from, self.to, default_days)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize transparencia configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Fetch and store records from a source
    Ingest {
        #[command(subcommand)]
        source: IngestSource,
    },

    /// Fetch missing details for stored records
    Enrich {
        #[command(subcommand)]
        target: EnrichTarget,
    },

    /// Score candidate links between two stored record sets
    Xref {
        /// Left-hand records
        #[arg(long, value_enum, default_value = "bulletin")]
        left: RecordSet,

        /// Right-hand records
        #[arg(long, value_enum, default_value = "subsidies")]
        right: RecordSet,

        #[command(flatten)]
        range: RangeArgs,

        /// Minimum confidence (0-1)
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Maximum number of links
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run red-flag rules over enriched procurement awards
    Alerts {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Aggregate stored records
    Report {
        #[command(flatten)]
        range: RangeArgs,

        /// Number of awardees listed
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Tag stored subsidies with sector and destination
    Classify {
        #[command(flatten)]
        range: RangeArgs,

        /// Only list this sector
        #[arg(long)]
        sector: Option<String>,
    },

    /// Parse a saved source file and print it as JSON
    Parse {
        /// Kind of file
        #[arg(value_enum)]
        kind: ParseKind,

        /// Path to the file
        path: PathBuf,

        /// Publication date of the file
        #[arg(long, value_parser = parse_cli_date)]
        date: Option<NaiveDate>,

        /// Province of a registry file (defaults to the file name)
        #[arg(long)]
        province: Option<String>,
    },

    /// Show store status and recent fetches
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum IngestSource {
    /// Daily bulletin summaries
    Bulletin {
        #[command(flatten)]
        range: RangeArgs,

        /// Also fetch detail pages for procurement items
        #[arg(long)]
        enrich: bool,
    },

    /// Subsidy calls received in a date range
    Subsidies {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Registry texts: one file, or a directory of <date>/<PROVINCE>.txt
    Registry {
        /// File or directory
        path: PathBuf,

        /// Filing date of a single file
        #[arg(long, value_parser = parse_cli_date)]
        date: Option<NaiveDate>,

        /// Province of a single file (defaults to the file name)
        #[arg(long)]
        province: Option<String>,

        /// Re-ingest files whose content is unchanged
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum EnrichTarget {
    /// Procurement detail pages
    Bulletin {
        #[command(flatten)]
        range: RangeArgs,

        /// Maximum records fetched
        #[arg(short, long, default_value = "200")]
        limit: usize,
    },

    /// Subsidy budgets
    Subsidies {
        /// Maximum calls fetched
        #[arg(short, long, default_value = "200")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Commands that need no config or store
    match &cli.command {
        Commands::Init { force } => return handle_init(cli.config.clone(), *force).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "transparencia", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Parse {
            kind,
            path,
            date,
            province,
        } => {
            let value = cmd_parse(*kind, path, *date, province.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(cli.config.as_deref())?;
    let db = MetaDb::open(&config).await?;
    let show_progress = !cli.json;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } | Commands::Parse { .. } => {
            unreachable!()
        }

        Commands::Ingest { source } => {
            handle_ingest(&config, &db, source, cli.json).await?;
        }

        Commands::Enrich { target } => {
            let (label, stats) = match target {
                EnrichTarget::Bulletin { range, limit } => {
                    let range = range.resolve(1)?;
                    (
                        "Bulletin detail",
                        cmd_enrich_bulletin(&config, &db, range, limit, show_progress).await?,
                    )
                }
                EnrichTarget::Subsidies { limit } => (
                    "Subsidy budget",
                    cmd_enrich_subsidies(&config, &db, limit, show_progress).await?,
                ),
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_enrich_stats(label, &stats);
            }
        }

        Commands::Xref {
            left,
            right,
            range,
            min_confidence,
            limit,
        } => {
            let options = XrefOptions {
                left,
                right,
                range: range.resolve(DEFAULT_QUERY_DAYS)?,
                min_confidence,
                max_results: limit,
            };
            if let Some(min) = options.min_confidence {
                if !(0.0..=1.0).contains(&min) {
                    return Err(Error::Config(
                        "--min-confidence must be between 0.0 and 1.0".to_string(),
                    ));
                }
            }

            let results = cmd_xref(&config, &db, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_xref_results(&results);
            }
        }

        Commands::Alerts { range } => {
            let range = range.resolve(config.alerts.window_days)?;
            let report = cmd_alerts(&config, &db, range, show_progress).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_alerts(&report);
            }
        }

        Commands::Report { range, top } => {
            let report = cmd_report(&db, range.resolve(DEFAULT_QUERY_DAYS)?, top).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::Classify { range, sector } => {
            let rows = cmd_classify(&db, range.resolve(DEFAULT_QUERY_DAYS)?, sector.as_deref()).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_classified(&rows);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &db, STATUS_RECENT_FETCHES).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

async fn handle_init(path: Option<PathBuf>, force: bool) -> Result<()> {
    // A config path selects its parent directory; a directory is used as is
    let base_dir = match path {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => Some(
            path.parent()
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_base_dir),
        ),
        Some(path) => Some(path),
        None => None,
    };

    let config = cmd_init(base_dir, force).await?;

    println!("✓ transparencia initialized successfully");
    println!("  Config: {}", config.paths.config_file.display());
    println!("  Database: {}", config.paths.db_file.display());
    println!("\nNext steps:");
    println!("  1. Edit the config file to adjust thresholds and endpoints");
    println!("  2. Ingest a day: transparencia ingest bulletin --enrich");
    println!("  3. Load registry texts: transparencia ingest registry /path/to/borme");

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        return Err(Error::NotInitialized);
    }

    Config::load(&config_path)
}

async fn handle_ingest(config: &Config, db: &MetaDb, source: IngestSource, json: bool) -> Result<()> {
    let show_progress = !json;
    let (label, stats) = match source {
        IngestSource::Bulletin { range, enrich } => (
            "Bulletin",
            cmd_ingest_bulletin(config, db, range.resolve(1)?, enrich, show_progress).await?,
        ),

        IngestSource::Subsidies { range } => (
            "Subsidy",
            cmd_ingest_subsidies(config, db, range.resolve(1)?).await?,
        ),

        IngestSource::Registry {
            path,
            date,
            province,
            force,
        } => {
            let files = if path.is_dir() {
                discover_registry_files(&path)?
            } else {
                let date = date.ok_or_else(|| {
                    Error::InvalidDate("--date is required for a single registry file".to_string())
                })?;
                vec![RegistryFile::single(&path, date, province)?]
            };
            (
                "Registry",
                cmd_ingest_registry(config, db, files, force, show_progress).await?,
            )
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_ingest_stats(label, &stats);
    }

    Ok(())
}
