use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use yardbook::{
    Config, DeletePolicy, Filter, ImportMode, RecordKind, RecordStore, export, import_into, low_stock, overdue,
    record, report, schema, summarize,
};

#[derive(Parser)]
#[command(name = "yardbook")]
#[command(about = "Yardbook - quotes, inventory and jobs kept in one local file")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the store file (default: from config)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Fail when deleting a record that does not exist
    #[arg(long, global = true)]
    strict: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import rows from a CSV file
    Import {
        file: PathBuf,
        #[arg(short, long)]
        kind: RecordKind,
        /// Replace records whose identifier already exists
        #[arg(long)]
        upsert: bool,
        /// Drop existing records of this kind before importing
        #[arg(long, conflicts_with = "upsert")]
        replace: bool,
    },

    /// Export one kind of record to a CSV file
    Export {
        file: PathBuf,
        #[arg(short, long)]
        kind: RecordKind,
    },

    /// Count and aggregate records grouped by a field
    Summarize {
        #[arg(short, long)]
        by: String,
        #[arg(short, long)]
        kind: Option<RecordKind>,
        #[arg(long)]
        json: bool,
    },

    /// Inventory totals per item name with reorder alerts
    Stock {
        #[arg(long)]
        json: bool,
    },

    /// Open quotes past valid_until and open jobs past their end date
    Overdue {
        /// Date to check against (default: today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },

    /// Show one record
    Get { kind: RecordKind, id: String },

    /// List records of a kind, optionally filtered (e.g. --where "qty<10")
    List {
        kind: RecordKind,
        #[arg(short = 'w', long = "where")]
        filters: Vec<Filter>,
    },

    /// Set a field on a record
    Set {
        kind: RecordKind,
        id: String,
        field: String,
        value: String,
    },

    /// Remove a field from a record
    Unset { kind: RecordKind, id: String, field: String },

    /// Delete a record
    Delete { kind: RecordKind, id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.strict {
        config.delete_policy = DeletePolicy::Strict;
    }

    // Setup tracing
    tracing_subscriber::fmt()
        .with_max_level(config.log_level.raised(cli.verbose).as_tracing())
        .with_writer(std::io::stderr)
        .init();

    match Config::locate(cli.config.as_deref()) {
        Some(path) => info!(file = ?path, "Loaded config"),
        None => debug!("No config file found, using defaults"),
    }

    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path.clone());
    let mut store = RecordStore::load(&store_path)
        .with_context(|| format!("Failed to load store {}", store_path.display()))?
        .with_delete_policy(config.delete_policy);

    match cli.command {
        Commands::Import {
            file,
            kind,
            upsert,
            replace,
        } => {
            if replace {
                let ids: Vec<String> = store.list(kind, &[]).iter().map(|r| r.id().to_string()).collect();
                for id in ids {
                    store.delete(kind, &id)?;
                }
            }
            let mode = if upsert { ImportMode::Upsert } else { ImportMode::Create };
            let count = import_into(&mut store, &file, kind, mode)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            save(&store, &store_path)?;
            println!("Imported {} {} record(s) from {}", count, kind, file.display());
        }
        Commands::Export { file, kind } => {
            let count = export(&store, kind, &file).with_context(|| format!("Failed to export {}", file.display()))?;
            println!("Exported {} {} record(s) to {}", count, kind, file.display());
        }
        Commands::Summarize { by, kind, json } => {
            let summary = summarize(&store, &by, kind);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", report::render_table(&summary));
            }
        }
        Commands::Stock { json } => {
            let levels = low_stock(&store);
            if json {
                println!("{}", serde_json::to_string_pretty(&levels)?);
            } else {
                print!("{}", report::render_stock(&levels));
            }
        }
        Commands::Overdue { as_of, json } => {
            let items = overdue(&store, as_of.unwrap_or_else(record::today));
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print!("{}", report::render_overdue(&items));
            }
        }
        Commands::Get { kind, id } => {
            let record = store.get(kind, &id)?;
            println!("{} {}", kind.to_string().bold(), record.id());
            for (field, value) in record.fields() {
                println!("  {}: {}", field, value);
            }
            if let (Some(created), Some(updated)) = (record.created(), record.updated()) {
                println!("  {}", format!("created {}, updated {}", created, updated).dimmed());
            }
        }
        Commands::List { kind, filters } => {
            let records = store.list(kind, &filters);
            // Second schema column is the human-readable name (customer, name, site)
            let name_field = schema::columns(kind).get(1).map(|c| c.name).unwrap_or("id");
            for record in &records {
                println!(
                    "{}  {}",
                    record.id().bold(),
                    record.text(name_field).unwrap_or_default()
                );
            }
            println!("{} record(s)", records.len());
        }
        Commands::Set { kind, id, field, value } => {
            let value = schema::parse_input(kind, &field, &value)?;
            store.set_field(kind, &id, &field, value)?;
            save(&store, &store_path)?;
            println!("Updated {} {}", kind, id);
        }
        Commands::Unset { kind, id, field } => {
            store.remove_field(kind, &id, &field)?;
            save(&store, &store_path)?;
            println!("Updated {} {}", kind, id);
        }
        Commands::Delete { kind, id } => {
            if store.delete(kind, &id)? {
                save(&store, &store_path)?;
                println!("Deleted {} {}", kind, id);
            } else {
                println!("{} {} not found, nothing deleted", kind, id);
            }
        }
    }

    Ok(())
}

fn save(store: &RecordStore, path: &Path) -> Result<()> {
    store
        .save(path)
        .with_context(|| format!("Failed to save store {}", path.display()))
}
