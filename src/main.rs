use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use vitals_query::config;
use vitals_query::db::import_records;
use vitals_query::models::HealthRecord;
use vitals_query::{PresetQuery, QueryEngine, SqliteRecordStore};

#[derive(Parser, Debug)]
#[command(
    name = "vitals-query",
    version,
    about = "Ask questions about longitudinal health records"
)]
struct Cli {
    /// SQLite record store (defaults to the user data directory)
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a free-text question
    Query {
        /// Owner identity (name, MRN, ...)
        owner: String,
        /// The question, e.g. "What was my average blood glucose last year?"
        text: String,
    },
    /// Numeric trend for one attribute
    Trend {
        owner: String,
        attribute: String,
        /// Lookback window in days
        #[arg(short, long, default_value_t = config::DEFAULT_TREND_DAYS)]
        days: u32,
    },
    /// Run a fixed record listing
    Preset {
        owner: String,
        #[command(subcommand)]
        listing: PresetCommand,
    },
    /// Import a JSON array of health records
    Import {
        owner: String,
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum PresetCommand {
    /// Every record, newest first
    AllRecords,
    /// Most recent lab results
    LabsRecent {
        #[arg(short, long, default_value_t = config::DEFAULT_PRESET_LIMIT)]
        limit: u32,
    },
    /// Medications marked active
    MedicationsActive,
    /// Vitals whose `vital_type` matches exactly
    VitalsByType { vital_type: String },
    /// Labs carrying an abnormal flag
    AbnormalLabs,
}

impl From<PresetCommand> for PresetQuery {
    fn from(command: PresetCommand) -> Self {
        match command {
            PresetCommand::AllRecords => PresetQuery::AllRecords,
            PresetCommand::LabsRecent { limit } => PresetQuery::LabsRecent { limit },
            PresetCommand::MedicationsActive => PresetQuery::MedicationsActive,
            PresetCommand::VitalsByType { vital_type } => PresetQuery::VitalsByType { vital_type },
            PresetCommand::AbnormalLabs => PresetQuery::AbnormalLabs,
        }
    }
}

fn main() -> Result<()> {
    vitals_query::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    let cli = Cli::parse();

    let db_path = cli.db.unwrap_or_else(config::default_database_path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    let store = SqliteRecordStore::open(&db_path)
        .with_context(|| format!("Could not open record store at {}", db_path.display()))?;

    match cli.command {
        Commands::Query { owner, text } => {
            let engine = QueryEngine::new(store);
            print_json(&engine.query(&owner, &text))
        }
        Commands::Trend {
            owner,
            attribute,
            days,
        } => {
            let engine = QueryEngine::new(store);
            print_json(&engine.get_trend(&owner, &attribute, days))
        }
        Commands::Preset { owner, listing } => {
            let engine = QueryEngine::new(store);
            print_json(&engine.preset(&owner, &listing.into()))
        }
        Commands::Import { owner, file } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Could not read {}", file.display()))?;
            let records: Vec<HealthRecord> = serde_json::from_str(&content)
                .with_context(|| format!("Invalid records in {}", file.display()))?;
            let summary = import_records(store.connection(), &owner, &records)?;
            print_json(&summary)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
