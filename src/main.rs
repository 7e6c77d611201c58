use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use front_desk::{
    config::DEFAULT_CONFIG_FILE, logging, AppConfig, PersonStore, RegistryService,
    SpreadsheetImporter,
};

#[derive(Parser)]
#[command(name = "front-desk")]
#[command(about = "Front-desk guest registry", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge spreadsheet rows into the record file
    Import {
        /// Spreadsheet to merge (defaults to import.spreadsheet)
        source: Option<PathBuf>,
    },

    /// Look a guest up, registering them on first hit
    Lookup { first_name: String, last_name: String },

    /// Print every record with its registration number
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    if let Err(msg) = config.validate() {
        bail!("Invalid configuration: {msg}");
    }
    logging::init(&config.log_level);

    match cli.command {
        Commands::Import { source } => run_import(&config, source),
        Commands::Lookup {
            first_name,
            last_name,
        } => run_lookup(&config, &first_name, &last_name),
        Commands::List => run_list(&config),
    }
}

fn run_import(config: &AppConfig, source: Option<PathBuf>) -> Result<()> {
    let Some(source) = source.or_else(|| config.import.spreadsheet.clone()) else {
        bail!("No spreadsheet given and import.spreadsheet is not configured");
    };

    println!("📥 Importing {}", source.display());
    let importer = SpreadsheetImporter::from(&config.import);
    let report = importer
        .import(&source, &config.storage.record_file)
        .with_context(|| format!("Import of {} failed", source.display()))?;

    match report {
        None => println!("⚠️  {} does not exist, nothing imported", source.display()),
        Some(report) => {
            println!("✓ Rows read:     {}", report.rows_read);
            println!("✓ Added:         {}", report.added);
            println!("✓ Duplicates:    {}", report.duplicates);
            println!("✓ Skipped:       {}", report.skipped);
            println!("✓ Total records: {}", report.total_records);
        }
    }

    Ok(())
}

fn run_lookup(config: &AppConfig, first: &str, last: &str) -> Result<()> {
    let store = PersonStore::load(&config.storage.record_file)?;
    let registry = RegistryService::new(store);

    let outcome = registry.lookup(first, last)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn run_list(config: &AppConfig) -> Result<()> {
    let store = PersonStore::load(&config.storage.record_file)?;

    for person in store.people() {
        let count = person
            .register_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:>5}  {:<30} {}", count, person.full_name(), person.bank);
    }
    println!("\n{} records, last registration number {}", store.len(), store.counter());
    Ok(())
}
