//! File Registry CLI - search, import and maintain file records
//!
//! Records live in a SQLite database (`--db`, or `FILE_REGISTRY_DB`).
//! Set `RUST_LOG=info` to see import progress.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use file_registry::pipeline;
use file_registry::{
    FileRecord, FileStore, ImportOutcome, QueryState, RemarkFilter, SortOrder, SqliteStore,
    StatusFilters,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "file-registry")]
#[command(about = "Search and maintain a registry of project files and sub-files")]
struct Cli {
    /// SQLite database holding the registry
    #[arg(long, global = true, env = "FILE_REGISTRY_DB", default_value = "file_registry.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search records by file number, file name or sub-file name
    Search {
        /// Case-insensitive text to look for (empty matches everything)
        #[arg(short, long, default_value = "")]
        query: String,

        /// Only records with a CURRENT value set
        #[arg(long)]
        current: bool,

        /// Only records with a RECORD value set
        #[arg(long)]
        record: bool,

        /// Only records with a COMPLETED value set
        #[arg(long)]
        completed: bool,

        /// Remark filter
        #[arg(long, value_enum, default_value_t = RemarkFilter::All)]
        remark: RemarkFilter,

        /// Sort direction for file names
        #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
        order: SortOrder,

        /// Print results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List every record in id order
    List,

    /// Import a CSV file (FILE NO, FILE NAME, CURRENT, RECORD, COMPLETED, REMARK).
    ///
    /// Rows with a FILE NO start a new parent; following rows with only a
    /// FILE NAME become its sub-files. Parents whose (FILE NO, FILE NAME)
    /// pair already exists are skipped along with their sub-file rows.
    Import {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export all records to CSV in the same layout the importer reads
    Export {
        /// Output CSV file (default: file_data_export_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Add a record from a JSON object
    Add {
        /// e.g. '{"file_no":"A1","file_name":"Roof Plan","sub_files":[{"name":"Sheet 1"}]}'
        #[arg(long)]
        json: String,
    },

    /// Replace every field of a record, sub-files included
    Edit {
        #[arg(long)]
        id: i64,

        /// Full replacement record as a JSON object
        #[arg(long)]
        json: String,
    },

    /// Delete a record permanently
    Delete {
        #[arg(long)]
        id: i64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut store = SqliteStore::open(&cli.db)?;

    match cli.command {
        Commands::Search {
            query,
            current,
            record,
            completed,
            remark,
            order,
            json,
        } => {
            let state = QueryState {
                query,
                status: StatusFilters {
                    current,
                    record,
                    completed,
                },
                remark,
                order,
            };
            search(&store, &state, json)?;
        }
        Commands::List => {
            let records = store.list()?;
            let all: Vec<&FileRecord> = records.iter().collect();
            print!("{}", pipeline::render_results(&all));
        }
        Commands::Import { input, json } => {
            import(&mut store, &input, json)?;
        }
        Commands::Export { output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(pipeline::default_export_name()));
            println!("{}", pipeline::export_csv_file(&store, &output)?);
        }
        Commands::Add { json } => {
            let record = parse_record_json(&json)?;
            let id = store.insert(&record)?;
            println!("File \"{}\" created with id {}", record.file_no.trim(), id);
        }
        Commands::Edit { id, json } => {
            let record = parse_record_json(&json)?;
            store.update(id, &record)?;
            println!("File \"{}\" (id {}) updated", record.file_no.trim(), id);
        }
        Commands::Delete { id } => {
            store.delete(id)?;
            println!("File id {} deleted", id);
        }
    }

    Ok(())
}

// ============================================================================
// Subcommands
// ============================================================================

fn search(store: &SqliteStore, state: &QueryState, json: bool) -> Result<()> {
    let records = store.list()?;
    let results = state.apply(&records);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if state.active_filter_count() > 0 {
        eprintln!("Active filters: {}", state.active_filter_count());
    }
    print!("{}", pipeline::render_results(&results));
    Ok(())
}

fn import(store: &mut SqliteStore, input: &Path, json: bool) -> Result<()> {
    let report = pipeline::import_csv_file(input, store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
        for error in &report.errors {
            println!("  {}", error);
        }
    }

    if report.outcome() == ImportOutcome::Failure {
        return Err(anyhow::anyhow!(
            "Import failed: none of {} new records could be inserted",
            report.accepted_parents
        ));
    }
    Ok(())
}

/// Parse a record from loosely-typed JSON and prepare it for saving.
fn parse_record_json(text: &str) -> Result<FileRecord> {
    let value: serde_json::Value = serde_json::from_str(text).context("Invalid record JSON")?;
    if !value.is_object() {
        return Err(anyhow::anyhow!("Record JSON must be an object"));
    }
    Ok(FileRecord::from_value(&value).sanitized())
}
